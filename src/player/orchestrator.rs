use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::common::errors::PlaybackError;
use crate::configs::Config;
use crate::engine::{EngineAdapter, EngineEvent, MediaSink, StreamEngine};
use crate::player::session::EpisodeSession;
use crate::protocol::episode::{AudioTrack, DeliveryCandidate, EpisodeRef};
use crate::protocol::events::PlayerEvent;
use crate::protocol::manifest::{ManifestDescriptor, QualitySelection};
use crate::protocol::state::{PlaybackPhase, PlayerStateSnapshot};
use crate::resolver::SourceResolver;
use crate::store::{PlayerSettings, ProgressStore, ResumePoint, SettingsStore};

/// Everything the orchestrator composes.
pub struct PlayerOptions {
    pub config: Config,
    pub resolver: Arc<dyn SourceResolver>,
    pub engine: Arc<dyn StreamEngine>,
    pub sink: MediaSink,
    pub progress: Arc<dyn ProgressStore>,
    pub settings: Arc<dyn SettingsStore>,
}

/// Handle to a running playback orchestrator.
///
/// Commands are fire-and-forget; outcomes arrive on [`Player::events`].
/// Dropping the handle shuts the orchestrator down (with a final progress
/// save).
pub struct Player {
    commands: flume::Sender<Command>,
    events: flume::Receiver<PlayerEvent>,
    snapshot: Arc<RwLock<PlayerStateSnapshot>>,
}

impl Player {
    /// Spawn the orchestrator actor.
    ///
    /// Fails with `UnsupportedPlayback` when the engine cannot run in this
    /// runtime at all; that is the only error not delivered as an event.
    pub fn spawn(options: PlayerOptions) -> Result<Self, PlaybackError> {
        if !options.engine.supported() {
            return Err(PlaybackError::UnsupportedPlayback);
        }

        let (command_tx, command_rx) = flume::unbounded();
        let (event_tx, event_rx) = flume::unbounded();
        let (engine_tx, engine_rx) = flume::unbounded();
        let (internal_tx, internal_rx) = flume::unbounded();

        let settings = options.settings.get();
        let snapshot = Arc::new(RwLock::new(PlayerStateSnapshot {
            playback_rate: settings.playback_rate,
            ..PlayerStateSnapshot::default()
        }));

        let mut adapter = EngineAdapter::new(options.engine, options.sink, engine_tx);
        // Session-start preferences ride along on the first attach.
        adapter.set_volume(settings.volume);
        adapter.set_muted(settings.muted);
        adapter.set_rate(settings.playback_rate);

        let orchestrator = Orchestrator {
            config: options.config,
            resolver: options.resolver,
            adapter,
            progress: options.progress,
            settings_store: options.settings,
            settings,
            events: event_tx,
            commands: command_rx,
            engine_rx,
            internal_tx,
            internal_rx,
            snapshot: snapshot.clone(),
            phase: PlaybackPhase::Idle,
            epoch: 0,
            session: None,
            resolve_task: None,
            deadline_task: None,
            verify_task: None,
            overlay_seq: 0,
            overlay_visible: false,
            return_phase_after_seek: None,
        };

        tokio::spawn(orchestrator.run());

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            snapshot,
        })
    }

    /// The caller-facing event stream. Single consumer.
    pub fn events(&self) -> &flume::Receiver<PlayerEvent> {
        &self.events
    }

    /// Point-in-time state, readable without waiting on the actor.
    pub fn state(&self) -> PlayerStateSnapshot {
        self.snapshot.read().clone()
    }

    /// Start (or switch to) an episode. `resume_from` skips the resume
    /// prompt and seeks straight there once the stream is up.
    pub fn load_episode(&self, episode: EpisodeRef, resume_from: Option<f64>, has_next: bool) {
        self.send(Command::Load {
            episode,
            resume_from,
            has_next,
        });
    }

    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn seek(&self, position: f64) {
        self.send(Command::Seek(position));
    }

    pub fn set_volume(&self, volume: f32) {
        self.send(Command::SetVolume(volume));
    }

    pub fn set_muted(&self, muted: bool) {
        self.send(Command::SetMuted(muted));
    }

    pub fn set_rate(&self, rate: f64) {
        self.send(Command::SetRate(rate));
    }

    /// Select a subtitle track by id, or `None` for off.
    pub fn set_subtitle(&self, track: Option<String>) {
        self.send(Command::SetSubtitle(track));
    }

    pub fn set_quality(&self, quality: QualitySelection) {
        self.send(Command::SetQuality(quality));
    }

    pub fn set_subtitle_style(&self, size: f32, background: bool) {
        self.send(Command::SetSubtitleStyle { size, background });
    }

    /// Manually pin one server/audio pair, bypassing the search.
    pub fn force_candidate(&self, server: usize, audio: AudioTrack) {
        self.send(Command::ForceCandidate { server, audio });
    }

    /// Start the search over from the first candidate (or re-attach the
    /// forced one, if any).
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Answer a `ResumeDecisionNeeded` with "continue where I left off".
    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    /// Answer a `ResumeDecisionNeeded` with "start over".
    pub fn restart(&self) {
        self.send(Command::Restart);
    }

    pub fn skip_intro(&self) {
        self.send(Command::SkipIntro);
    }

    pub fn skip_outro(&self) {
        self.send(Command::SkipOutro);
    }

    /// Report user activity (pointer movement); keeps the control overlay
    /// visible and re-arms its idle timer.
    pub fn activity(&self) {
        self.send(Command::Activity);
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        let _ = self.commands.send(command);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

#[derive(Debug)]
enum Command {
    Load {
        episode: EpisodeRef,
        resume_from: Option<f64>,
        has_next: bool,
    },
    Play,
    Pause,
    Seek(f64),
    SetVolume(f32),
    SetMuted(bool),
    SetRate(f64),
    SetSubtitle(Option<String>),
    SetQuality(QualitySelection),
    SetSubtitleStyle { size: f32, background: bool },
    ForceCandidate { server: usize, audio: AudioTrack },
    Retry,
    Resume,
    Restart,
    SkipIntro,
    SkipOutro,
    Activity,
    Shutdown,
}

/// Results of spawned work, stamped with the epoch that started it. The
/// actor drops anything whose stamp no longer matches: a slow response from
/// a superseded candidate must never mutate the current attempt.
enum InternalEvent {
    Resolved {
        epoch: u64,
        candidate: DeliveryCandidate,
        result: Result<ManifestDescriptor, PlaybackError>,
    },
    CandidateDeadline {
        epoch: u64,
    },
    VerifyElapsed {
        epoch: u64,
    },
    OverlayIdle {
        seq: u64,
    },
}

struct Orchestrator {
    config: Config,
    resolver: Arc<dyn SourceResolver>,
    adapter: EngineAdapter,
    progress: Arc<dyn ProgressStore>,
    settings_store: Arc<dyn SettingsStore>,
    settings: PlayerSettings,
    events: flume::Sender<PlayerEvent>,
    commands: flume::Receiver<Command>,
    engine_rx: flume::Receiver<(u64, EngineEvent)>,
    internal_tx: flume::Sender<InternalEvent>,
    internal_rx: flume::Receiver<InternalEvent>,
    snapshot: Arc<RwLock<PlayerStateSnapshot>>,
    phase: PlaybackPhase,
    /// Bumped on every candidate switch and teardown; the stamp checked by
    /// every timer and network callback.
    epoch: u64,
    session: Option<EpisodeSession>,
    resolve_task: Option<JoinHandle<()>>,
    deadline_task: Option<JoinHandle<()>>,
    verify_task: Option<JoinHandle<()>>,
    overlay_seq: u64,
    overlay_visible: bool,
    return_phase_after_seek: Option<PlaybackPhase>,
}

impl Orchestrator {
    async fn run(mut self) {
        let mut save_timer = tokio::time::interval(Duration::from_secs(
            self.config.player.progress_save_interval_secs.max(1),
        ));
        save_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv_async() => match command {
                    Ok(Command::Shutdown) | Err(_) => break,
                    Ok(command) => self.handle_command(command),
                },
                Ok((epoch, event)) = self.engine_rx.recv_async() => {
                    self.handle_engine_event(epoch, event);
                }
                Ok(event) = self.internal_rx.recv_async() => {
                    self.handle_internal(event);
                }
                _ = save_timer.tick() => {
                    if self.phase == PlaybackPhase::Playing {
                        self.save_progress();
                    }
                }
            }
        }

        self.teardown_session(true);
        self.set_phase(PlaybackPhase::Idle);
        debug!("Playback orchestrator stopped");
    }

    // -- Commands ----------------------------------------------------------

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Load {
                episode,
                resume_from,
                has_next,
            } => self.load(episode, resume_from, has_next),
            Command::Play => {
                if matches!(self.phase, PlaybackPhase::Ready | PlaybackPhase::Paused) {
                    if let Some(session) = self.session.as_mut() {
                        session.pending_resume = None;
                    }
                    self.adapter.play();
                    self.set_phase(PlaybackPhase::Playing);
                }
            }
            Command::Pause => {
                if matches!(self.phase, PlaybackPhase::Playing | PlaybackPhase::Seeking) {
                    self.adapter.pause();
                    self.set_phase(PlaybackPhase::Paused);
                    // One write so a pause-then-quit still resumes.
                    self.save_progress();
                }
            }
            Command::Seek(position) => self.seek(position),
            Command::SetVolume(volume) => {
                let volume = volume.clamp(0.0, 1.0);
                self.adapter.set_volume(volume);
                self.settings.volume = volume;
                self.persist_settings();
            }
            Command::SetMuted(muted) => {
                self.adapter.set_muted(muted);
                self.settings.muted = muted;
                self.persist_settings();
            }
            Command::SetRate(rate) => {
                self.adapter.set_rate(rate);
                self.settings.playback_rate = rate;
                self.snapshot.write().playback_rate = rate;
                self.persist_settings();
            }
            Command::SetSubtitle(track) => {
                self.adapter.set_subtitle(track.clone());
                self.snapshot.write().subtitle = track;
            }
            Command::SetQuality(quality) => {
                self.adapter.set_quality(quality);
                self.snapshot.write().quality = quality;
            }
            Command::SetSubtitleStyle { size, background } => {
                self.settings.subtitle_size = size;
                self.settings.subtitle_background = background;
                self.persist_settings();
            }
            Command::ForceCandidate { server, audio } => self.force_candidate(server, audio),
            Command::Retry => self.retry(),
            Command::Resume => {
                let pending = self
                    .session
                    .as_mut()
                    .and_then(|session| session.pending_resume.take());
                if let Some(position) = pending {
                    self.adapter.seek(position);
                    if let Some(session) = self.session.as_mut() {
                        session.position = position;
                    }
                    self.snapshot.write().position = position;
                    self.adapter.play();
                    self.set_phase(PlaybackPhase::Playing);
                }
            }
            Command::Restart => {
                let pending = self
                    .session
                    .as_mut()
                    .and_then(|session| session.pending_resume.take());
                if pending.is_some() {
                    self.adapter.seek(0.0);
                    self.adapter.play();
                    self.set_phase(PlaybackPhase::Playing);
                }
            }
            Command::SkipIntro => self.skip_intro(),
            Command::SkipOutro => self.skip_outro(),
            Command::Activity => self.touch_overlay(),
            Command::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    fn load(&mut self, episode: EpisodeRef, resume_from: Option<f64>, has_next: bool) {
        self.teardown_session(true);

        let session = EpisodeSession::new(
            episode,
            has_next,
            self.config.upstream.servers.len(),
            resume_from,
        );
        info!(
            "[{}] Loading {} ({} audio)",
            session.id, session.episode.episode_id, session.episode.audio
        );

        let first = session.candidates.next(session.audio);
        self.session = Some(session);

        match first {
            Some(candidate) => self.start_candidate(candidate),
            None => self.fail(PlaybackError::NoDeliveryAvailable { tried: 0 }),
        }
    }

    fn seek(&mut self, position: f64) {
        if !matches!(
            self.phase,
            PlaybackPhase::Playing | PlaybackPhase::Paused | PlaybackPhase::Ended
        ) {
            return;
        }

        self.adapter.seek(position);
        if let Some(session) = self.session.as_mut() {
            session.position = position;
        }
        self.snapshot.write().position = position;

        self.return_phase_after_seek = Some(match self.phase {
            PlaybackPhase::Playing => PlaybackPhase::Playing,
            _ => PlaybackPhase::Paused,
        });
        self.set_phase(PlaybackPhase::Seeking);
    }

    fn force_candidate(&mut self, server: usize, audio: AudioTrack) {
        if server >= self.config.upstream.servers.len() {
            warn!("Ignoring forced candidate with unknown server index {}", server);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            debug!("Ignoring forced candidate with no episode loaded");
            return;
        };

        let candidate = DeliveryCandidate::new(server, audio);
        info!("[{}] User forced {}", session.id, candidate);

        session.forced = Some(candidate);
        session.candidates.reset();
        session.retries = 0;
        self.cancel_attempt_tasks();
        self.adapter.destroy();
        self.start_candidate(candidate);
    }

    fn retry(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let target = match session.forced {
            // A forced pair is retried as-is, no searching around it.
            Some(candidate) => Some(candidate),
            None => {
                session.candidates.reset();
                session.retries = 0;
                session.audio = session.episode.audio;
                session.candidates.next(session.episode.audio)
            }
        };

        let Some(target) = target else {
            self.fail(PlaybackError::NoDeliveryAvailable { tried: 0 });
            return;
        };

        info!("[{}] Retry requested, starting at {}", session.id, target);
        self.cancel_attempt_tasks();
        self.adapter.destroy();
        self.start_candidate(target);
    }

    fn skip_intro(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(intro) = session.manifest.as_ref().and_then(|m| m.intro) else {
            return;
        };
        if !session.intro_visible {
            return;
        }

        session.intro_visible = false;
        session.position = intro.end;
        self.adapter.seek(intro.end);
        self.snapshot.write().position = intro.end;
        self.emit(PlayerEvent::SkipIntroAvailable { available: false });
    }

    fn skip_outro(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(outro) = session.manifest.as_ref().and_then(|m| m.outro) else {
            return;
        };
        if !session.outro_visible {
            return;
        }

        session.outro_visible = false;
        let has_next = session.has_next;

        if has_next {
            self.emit(PlayerEvent::SkipOutroAvailable {
                available: false,
                has_next,
            });
            self.emit(PlayerEvent::NextEpisodeRequested);
        } else {
            session.position = outro.end;
            self.adapter.seek(outro.end);
            self.snapshot.write().position = outro.end;
            self.emit(PlayerEvent::SkipOutroAvailable {
                available: false,
                has_next,
            });
        }
    }

    fn touch_overlay(&mut self) {
        if !self.overlay_visible {
            self.overlay_visible = true;
            self.emit(PlayerEvent::OverlayVisibility { visible: true });
        }

        self.overlay_seq += 1;
        let seq = self.overlay_seq;
        let idle = Duration::from_millis(self.config.player.controls_idle_ms);
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            let _ = tx.send(InternalEvent::OverlayIdle { seq });
        });
    }

    // -- Candidate search --------------------------------------------------

    fn start_candidate(&mut self, candidate: DeliveryCandidate) {
        self.epoch += 1;
        let epoch = self.epoch;

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.active = Some(candidate);
        session.audio = candidate.audio;
        session.manifest = None;
        session.quality_levels.clear();

        let server_name = self.config.upstream.servers[candidate.server].clone();
        let episode = session.episode.clone();
        let session_id = session.id.clone();

        {
            let mut snapshot = self.snapshot.write();
            snapshot.candidate = Some(candidate);
            snapshot.audio = candidate.audio;
        }

        self.set_phase(PlaybackPhase::Resolving);
        self.emit(PlayerEvent::CandidateChanged {
            candidate,
            server_name: server_name.clone(),
            audio: candidate.audio,
        });

        info!(
            "[{}] Resolving {} via {} ({})",
            session_id, episode.episode_id, server_name, candidate.audio
        );

        if let Some(task) = self.resolve_task.take() {
            task.abort();
        }
        let resolver = self.resolver.clone();
        let tx = self.internal_tx.clone();
        self.resolve_task = Some(tokio::spawn(async move {
            let result = resolver
                .resolve(&episode, &server_name, candidate.audio)
                .await;
            let _ = tx.send(InternalEvent::Resolved {
                epoch,
                candidate,
                result,
            });
        }));

        if let Some(task) = self.deadline_task.take() {
            task.abort();
        }
        let deadline = Duration::from_millis(self.config.player.load_timeout_ms);
        let tx = self.internal_tx.clone();
        self.deadline_task = Some(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let _ = tx.send(InternalEvent::CandidateDeadline { epoch });
        }));
    }

    /// Fail the active candidate and move the search along.
    fn advance_search(&mut self, error: PlaybackError) {
        self.cancel_attempt_tasks();
        self.adapter.destroy();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(active) = session.active.take() else {
            return;
        };

        warn!("[{}] {} failed: {}", session.id, active, error);
        session.candidates.mark_tried(active);

        // If playback already ran, the replacement candidate picks up from
        // where this one died instead of re-prompting.
        if session.position > self.config.player.resume_threshold_secs {
            session.resume_override = Some(session.position);
        }

        if session.forced.is_some() {
            let tried = session.candidates.tried_count();
            self.fail_with(error, tried);
            return;
        }

        if session.retries >= self.config.player.max_retries {
            let tried = session.candidates.tried_count();
            info!("[{}] Retry budget exhausted", session.id);
            self.fail(PlaybackError::NoDeliveryAvailable { tried });
            return;
        }

        match session.candidates.next(session.audio) {
            Some(next) => {
                session.retries += 1;
                self.start_candidate(next);
            }
            None => {
                let tried = session.candidates.tried_count();
                self.fail(PlaybackError::NoDeliveryAvailable { tried });
            }
        }
    }

    fn fail(&mut self, error: PlaybackError) {
        let tried = self
            .session
            .as_ref()
            .map(|s| s.candidates.tried_count())
            .unwrap_or(0);
        self.fail_with(error, tried);
    }

    fn fail_with(&mut self, error: PlaybackError, tried: usize) {
        self.cancel_attempt_tasks();
        self.adapter.destroy();
        self.set_phase(PlaybackPhase::Error);
        self.emit(PlayerEvent::Error {
            kind: error.kind(),
            message: error.to_string(),
            tried: Some(tried),
        });
    }

    // -- Internal events (epoch-stamped) -----------------------------------

    fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::Resolved {
                epoch,
                candidate,
                result,
            } => {
                if epoch != self.epoch {
                    debug!("Discarding stale resolution result for {}", candidate);
                    return;
                }
                if self.phase != PlaybackPhase::Resolving {
                    return;
                }
                match result {
                    Ok(manifest) => self.attach_manifest(manifest),
                    Err(error) => self.advance_search(error),
                }
            }
            InternalEvent::CandidateDeadline { epoch } => {
                if epoch != self.epoch || !self.phase.is_acquiring() {
                    return;
                }
                let timeout = Duration::from_millis(self.config.player.load_timeout_ms);
                self.advance_search(PlaybackError::ResolutionTimeout(timeout));
            }
            InternalEvent::VerifyElapsed { epoch } => {
                if epoch != self.epoch || self.phase != PlaybackPhase::Loading {
                    return;
                }
                self.enter_ready();
            }
            InternalEvent::OverlayIdle { seq } => {
                if seq == self.overlay_seq && self.overlay_visible {
                    self.overlay_visible = false;
                    self.emit(PlayerEvent::OverlayVisibility { visible: false });
                }
            }
        }
    }

    fn attach_manifest(&mut self, manifest: ManifestDescriptor) {
        let epoch = self.epoch;
        let Some(url) = manifest.primary_source().map(|s| s.url.clone()) else {
            self.advance_search(PlaybackError::ResolutionFailed(
                "resolved manifest carries no sources".into(),
            ));
            return;
        };

        if let Some(session) = self.session.as_mut() {
            session.manifest = Some(manifest);
        }

        self.set_phase(PlaybackPhase::Loading);
        if let Err(error) = self.adapter.attach(&url, epoch) {
            self.advance_search(error);
        }
    }

    // -- Engine events -----------------------------------------------------

    fn handle_engine_event(&mut self, epoch: u64, event: EngineEvent) {
        if epoch != self.epoch {
            debug!("Discarding stale engine event from epoch {}", epoch);
            return;
        }

        match event {
            EngineEvent::Ready { quality_levels } => {
                if self.phase != PlaybackPhase::Loading || self.verify_task.is_some() {
                    return;
                }
                if let Some(session) = self.session.as_mut() {
                    session.quality_levels = quality_levels;
                }

                let delay = self.config.player.verify_delay_ms;
                if delay == 0 {
                    self.enter_ready();
                } else {
                    // Hold in Loading briefly; a manifest that dies right
                    // after parse still fails this candidate.
                    let tx = self.internal_tx.clone();
                    self.verify_task = Some(tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                        let _ = tx.send(InternalEvent::VerifyElapsed { epoch });
                    }));
                }
            }
            EngineEvent::FatalError { detail } => {
                if matches!(self.phase, PlaybackPhase::Idle | PlaybackPhase::Error) {
                    return;
                }
                self.advance_search(PlaybackError::EngineFatal(detail));
            }
            EngineEvent::TimeUpdate { position, duration } => {
                self.handle_time_update(position, duration);
            }
            EngineEvent::Ended => {
                if self.session.is_none() {
                    return;
                }
                self.finish_episode();
            }
            // Absorbed by the adapter; never forwarded to the orchestrator.
            EngineEvent::NonFatal { .. } => {}
        }
    }

    fn enter_ready(&mut self) {
        if let Some(task) = self.verify_task.take() {
            task.abort();
        }
        if let Some(task) = self.deadline_task.take() {
            task.abort();
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let ready = PlayerEvent::Ready {
            quality_levels: session.quality_levels.clone(),
            subtitles: session
                .manifest
                .as_ref()
                .map(|m| m.subtitles.clone())
                .unwrap_or_default(),
            candidate: session.active.unwrap_or(DeliveryCandidate::new(0, session.audio)),
        };
        let session_id = session.id.clone();

        self.set_phase(PlaybackPhase::Ready);
        self.emit(ready);
        info!("[{}] Stream verified playable", session_id);

        // Resume decision: explicit override wins, then the stored point.
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some(position) = session.resume_override.take() {
            if position > 0.0 {
                session.position = position;
                self.adapter.seek(position);
                self.snapshot.write().position = position;
            }
            self.adapter.play();
            self.set_phase(PlaybackPhase::Playing);
            return;
        }

        let saved = self
            .progress
            .get(&session.episode.title_id)
            .filter(|point| point.episode_id == session.episode.episode_id)
            .map(|point| point.position)
            .filter(|position| *position > self.config.player.resume_threshold_secs);

        match saved {
            Some(position) => {
                // Hold in Ready until the caller answers.
                session.pending_resume = Some(position);
                self.emit(PlayerEvent::ResumeDecisionNeeded {
                    saved_position: position,
                });
            }
            None => {
                self.adapter.play();
                self.set_phase(PlaybackPhase::Playing);
            }
        }
    }

    fn handle_time_update(&mut self, position: f64, duration: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.position = position;
        if duration > 0.0 {
            session.duration = duration;
        }

        {
            let mut snapshot = self.snapshot.write();
            snapshot.position = position;
            snapshot.duration = session.duration;
        }

        self.emit(PlayerEvent::TimeUpdate { position, duration });

        if self.phase == PlaybackPhase::Seeking {
            let back_to = self
                .return_phase_after_seek
                .take()
                .unwrap_or(PlaybackPhase::Playing);
            self.set_phase(back_to);
        }

        if !matches!(self.phase, PlaybackPhase::Playing | PlaybackPhase::Paused) {
            return;
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        let intro_now = session
            .manifest
            .as_ref()
            .and_then(|m| m.intro)
            .is_some_and(|w| w.contains(position));
        let outro_now = session
            .manifest
            .as_ref()
            .and_then(|m| m.outro)
            .is_some_and(|w| w.contains(position));
        let has_next = session.has_next;
        let intro_changed = intro_now != session.intro_visible;
        let outro_changed = outro_now != session.outro_visible;
        session.intro_visible = intro_now;
        session.outro_visible = outro_now;

        if intro_changed {
            self.emit(PlayerEvent::SkipIntroAvailable {
                available: intro_now,
            });
        }
        if outro_changed {
            self.emit(PlayerEvent::SkipOutroAvailable {
                available: outro_now,
                has_next,
            });
        }
    }

    fn finish_episode(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let title = session.episode.title_id.clone();
        let has_next = session.has_next;
        let session_id = session.id.clone();

        // A finished episode is not a resume point.
        if let Err(error) = self.progress.clear(&title) {
            warn!("[{}] Progress clear failed (ignored): {}", session_id, error);
        }

        info!("[{}] Episode ended (has_next: {})", session_id, has_next);
        self.set_phase(PlaybackPhase::Ended);
        self.emit(PlayerEvent::Ended { has_next });
    }

    // -- Persistence -------------------------------------------------------

    fn save_progress(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.duration <= 0.0 {
            return;
        }

        let position = session.position;
        let player = &self.config.player;
        if position < player.min_watched_secs {
            return;
        }
        // Near the end a save would make resume indistinguishable from
        // rewatch; skip it.
        if position > session.duration - player.end_margin_secs {
            return;
        }

        let point = ResumePoint::new(
            session.episode.episode_id.clone(),
            position,
            session.duration,
        );
        if let Err(error) = self.progress.put(&session.episode.title_id, point) {
            warn!("[{}] Progress save failed (ignored): {}", session.id, error);
        }
    }

    fn persist_settings(&mut self) {
        if let Err(error) = self.settings_store.put(&self.settings) {
            warn!("Settings save failed (ignored): {}", error);
        }
    }

    // -- Teardown ----------------------------------------------------------

    fn cancel_attempt_tasks(&mut self) {
        self.epoch += 1;
        for task in [
            self.resolve_task.take(),
            self.deadline_task.take(),
            self.verify_task.take(),
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }

    /// Release everything the current attempt owns: pending timers, the
    /// in-flight resolution, the engine binding.
    fn teardown_session(&mut self, save: bool) {
        if self.session.is_none() {
            return;
        }
        if save && matches!(self.phase, PlaybackPhase::Playing | PlaybackPhase::Paused | PlaybackPhase::Seeking)
        {
            self.save_progress();
        }

        self.cancel_attempt_tasks();
        self.adapter.destroy();
        self.session = None;
        self.return_phase_after_seek = None;

        let mut snapshot = self.snapshot.write();
        snapshot.candidate = None;
        snapshot.position = 0.0;
        snapshot.duration = 0.0;
    }

    fn set_phase(&mut self, phase: PlaybackPhase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        self.snapshot.write().phase = phase;
        self.emit(PlayerEvent::PhaseChanged { phase });
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }
}
