use std::sync::Arc;

use tracing::{debug, trace};

use crate::common::errors::PlaybackError;
use crate::engine::{EngineCommand, EngineEvent, MediaSink, StreamEngine};
use crate::protocol::manifest::QualitySelection;

/// Owns the single live engine binding and the controls around it.
///
/// Invariants enforced here rather than in every engine implementation:
/// the previous binding is destroyed before a new manifest is attached,
/// non-fatal engine noise never escapes to the orchestrator, and control
/// values set while detached are replayed on the next attach.
pub struct EngineAdapter {
    engine: Arc<dyn StreamEngine>,
    sink: MediaSink,
    forward_tx: flume::Sender<(u64, EngineEvent)>,
    attachment: Option<ActiveAttachment>,
    controls: ControlState,
}

struct ActiveAttachment {
    commands: flume::Sender<EngineCommand>,
    forward_task: tokio::task::JoinHandle<()>,
}

/// Last requested control values. Doubles as the replay buffer for the next
/// attach, so a candidate switch keeps the user's volume/rate/quality.
#[derive(Default)]
struct ControlState {
    volume: Option<f32>,
    muted: Option<bool>,
    rate: Option<f64>,
    quality: Option<QualitySelection>,
    subtitle: Option<Option<String>>,
}

impl EngineAdapter {
    pub fn new(
        engine: Arc<dyn StreamEngine>,
        sink: MediaSink,
        forward_tx: flume::Sender<(u64, EngineEvent)>,
    ) -> Self {
        Self {
            engine,
            sink,
            forward_tx,
            attachment: None,
            controls: ControlState::default(),
        }
    }

    pub fn supported(&self) -> bool {
        self.engine.supported()
    }

    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Bind a new manifest. Tears down any previous binding first, replays
    /// buffered controls, and forwards engine events stamped with `epoch`.
    pub fn attach(&mut self, manifest_url: &str, epoch: u64) -> Result<(), PlaybackError> {
        self.destroy();

        trace!(
            "Attaching {} to sink {} (engine: {})",
            manifest_url,
            self.sink.id(),
            self.engine.name()
        );

        let attachment = self
            .engine
            .attach(manifest_url, &self.sink)
            .map_err(|e| PlaybackError::EngineFatal(format!("attach failed: {e}")))?;

        let commands = attachment.commands;
        for cmd in self.controls.replay() {
            let _ = commands.send(cmd);
        }

        let events = attachment.events;
        let tx = self.forward_tx.clone();
        let engine_name = self.engine.name().to_string();
        let forward_task = tokio::spawn(async move {
            while let Ok(event) = events.recv_async().await {
                match event {
                    EngineEvent::NonFatal { detail } => {
                        // Recoverable by the engine itself; not a retry signal.
                        debug!("[{}] absorbed non-fatal engine error: {}", engine_name, detail);
                    }
                    other => {
                        if tx.send((epoch, other)).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.attachment = Some(ActiveAttachment {
            commands,
            forward_task,
        });
        Ok(())
    }

    /// Idempotent teardown of the current binding.
    pub fn destroy(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            let _ = attachment.commands.send(EngineCommand::Destroy);
            attachment.forward_task.abort();
            trace!("Destroyed engine binding on sink {}", self.sink.id());
        }
    }

    pub fn play(&self) {
        self.send_transport(EngineCommand::Play);
    }

    pub fn pause(&self) {
        self.send_transport(EngineCommand::Pause);
    }

    pub fn seek(&self, position: f64) {
        self.send_transport(EngineCommand::Seek(position));
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.controls.volume = Some(volume);
        self.send_control(EngineCommand::SetVolume(volume));
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.controls.muted = Some(muted);
        self.send_control(EngineCommand::SetMuted(muted));
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.controls.rate = Some(rate);
        self.send_control(EngineCommand::SetRate(rate));
    }

    pub fn set_quality(&mut self, quality: QualitySelection) {
        self.controls.quality = Some(quality);
        self.send_control(EngineCommand::SetQuality(quality));
    }

    pub fn set_subtitle(&mut self, track: Option<String>) {
        self.controls.subtitle = Some(track.clone());
        self.send_control(EngineCommand::SetSubtitle(track));
    }

    fn send_transport(&self, cmd: EngineCommand) {
        match &self.attachment {
            Some(attachment) => {
                let _ = attachment.commands.send(cmd);
            }
            None => debug!("Dropping transport command with no engine attached: {:?}", cmd),
        }
    }

    fn send_control(&self, cmd: EngineCommand) {
        // Buffered in `controls` either way; only forwarded when live.
        if let Some(attachment) = &self.attachment {
            let _ = attachment.commands.send(cmd);
        }
    }
}

impl ControlState {
    fn replay(&self) -> Vec<EngineCommand> {
        let mut cmds = Vec::new();
        if let Some(v) = self.volume {
            cmds.push(EngineCommand::SetVolume(v));
        }
        if let Some(m) = self.muted {
            cmds.push(EngineCommand::SetMuted(m));
        }
        if let Some(r) = self.rate {
            cmds.push(EngineCommand::SetRate(r));
        }
        if let Some(q) = self.quality {
            cmds.push(EngineCommand::SetQuality(q));
        }
        if let Some(s) = &self.subtitle {
            cmds.push(EngineCommand::SetSubtitle(s.clone()));
        }
        cmds
    }
}

impl Drop for EngineAdapter {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::AnyResult;
    use crate::engine::EngineAttachment;
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Engine that hands the test the other ends of the channels.
    struct LoopbackEngine {
        ends: Mutex<Vec<(flume::Sender<EngineEvent>, flume::Receiver<EngineCommand>)>>,
    }

    impl LoopbackEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ends: Mutex::new(Vec::new()),
            })
        }

        fn last_binding(&self) -> (flume::Sender<EngineEvent>, flume::Receiver<EngineCommand>) {
            self.ends.lock().last().cloned().expect("no binding yet")
        }
    }

    impl StreamEngine for LoopbackEngine {
        fn name(&self) -> &str {
            "loopback"
        }

        fn attach(&self, _manifest_url: &str, _sink: &MediaSink) -> AnyResult<EngineAttachment> {
            let (event_tx, event_rx) = flume::unbounded();
            let (cmd_tx, cmd_rx) = flume::unbounded();
            self.ends.lock().push((event_tx, cmd_rx));
            Ok(EngineAttachment {
                events: event_rx,
                commands: cmd_tx,
            })
        }
    }

    fn adapter_with(
        engine: Arc<LoopbackEngine>,
    ) -> (EngineAdapter, flume::Receiver<(u64, EngineEvent)>) {
        let (tx, rx) = flume::unbounded();
        (
            EngineAdapter::new(engine, MediaSink::new("video-0"), tx),
            rx,
        )
    }

    #[tokio::test]
    async fn test_controls_buffered_until_attach() {
        let engine = LoopbackEngine::new();
        let (mut adapter, _events) = adapter_with(engine.clone());

        adapter.set_volume(0.4);
        adapter.set_rate(1.5);
        adapter.set_quality(QualitySelection::Level(2));

        adapter.attach("https://cdn.example/master.m3u8", 1).unwrap();
        let (_tx, cmd_rx) = engine.last_binding();

        let replayed: Vec<_> = cmd_rx.try_iter().collect();
        assert!(replayed.contains(&EngineCommand::SetVolume(0.4)));
        assert!(replayed.contains(&EngineCommand::SetRate(1.5)));
        assert!(replayed.contains(&EngineCommand::SetQuality(QualitySelection::Level(2))));
    }

    #[tokio::test]
    async fn test_controls_survive_candidate_switch() {
        let engine = LoopbackEngine::new();
        let (mut adapter, _events) = adapter_with(engine.clone());

        adapter.attach("https://cdn.example/a.m3u8", 1).unwrap();
        adapter.set_muted(true);

        adapter.attach("https://cdn.example/b.m3u8", 2).unwrap();
        let (_tx, cmd_rx) = engine.last_binding();
        let replayed: Vec<_> = cmd_rx.try_iter().collect();
        assert!(replayed.contains(&EngineCommand::SetMuted(true)));
    }

    #[tokio::test]
    async fn test_non_fatal_events_absorbed() {
        let engine = LoopbackEngine::new();
        let (mut adapter, events) = adapter_with(engine.clone());
        adapter.attach("https://cdn.example/a.m3u8", 7).unwrap();

        let (event_tx, _cmd_rx) = engine.last_binding();
        event_tx
            .send(EngineEvent::NonFatal {
                detail: "buffer stall".into(),
            })
            .unwrap();
        event_tx
            .send(EngineEvent::Ready {
                quality_levels: vec![],
            })
            .unwrap();

        let (epoch, event) = tokio::time::timeout(Duration::from_secs(2), events.recv_async())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(epoch, 7);
        assert!(matches!(event, EngineEvent::Ready { .. }));
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent_and_sends_destroy() {
        let engine = LoopbackEngine::new();
        let (mut adapter, _events) = adapter_with(engine.clone());
        adapter.attach("https://cdn.example/a.m3u8", 1).unwrap();
        let (_tx, cmd_rx) = engine.last_binding();

        adapter.destroy();
        adapter.destroy();

        let cmds: Vec<_> = cmd_rx.try_iter().collect();
        assert_eq!(
            cmds.iter().filter(|c| **c == EngineCommand::Destroy).count(),
            1
        );
        assert!(!adapter.is_attached());
    }

    #[tokio::test]
    async fn test_attach_tears_down_previous_binding() {
        let engine = LoopbackEngine::new();
        let (mut adapter, _events) = adapter_with(engine.clone());

        adapter.attach("https://cdn.example/a.m3u8", 1).unwrap();
        let (_tx, first_cmd_rx) = engine.last_binding();

        adapter.attach("https://cdn.example/b.m3u8", 2).unwrap();
        let first_cmds: Vec<_> = first_cmd_rx.try_iter().collect();
        assert!(first_cmds.contains(&EngineCommand::Destroy));
    }
}
