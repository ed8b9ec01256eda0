use std::collections::HashSet;

use crate::protocol::episode::{AudioTrack, DeliveryCandidate};

/// The finite search space of delivery options for one playback attempt.
///
/// Bounded by `servers × {sub, dub}`. The tried-set only grows within an
/// attempt and is dropped wholesale when the episode or requested audio
/// changes.
#[derive(Debug)]
pub struct CandidateSpace {
    server_count: usize,
    tried: HashSet<DeliveryCandidate>,
}

impl CandidateSpace {
    pub fn new(server_count: usize) -> Self {
        Self {
            server_count,
            tried: HashSet::new(),
        }
    }

    pub fn mark_tried(&mut self, candidate: DeliveryCandidate) {
        self.tried.insert(candidate);
    }

    pub fn tried_count(&self) -> usize {
        self.tried.len()
    }

    /// Next untried pair, or `None` when the space is exhausted.
    ///
    /// Servers are walked in index order with the current audio track
    /// first; only when every server failed with it does the search flip to
    /// the alternate track. A server failure is far more likely than a
    /// whole audio track being absent, so this ordering minimizes unwanted
    /// audio switches.
    pub fn next(&self, current_audio: AudioTrack) -> Option<DeliveryCandidate> {
        for audio in [current_audio, current_audio.alternate()] {
            for server in 0..self.server_count {
                let candidate = DeliveryCandidate::new(server, audio);
                if !self.tried.contains(&candidate) {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Forget everything tried; the next search starts from the first
    /// candidate again. Only explicit user action triggers this.
    pub fn reset(&mut self) {
        self.tried.clear();
    }
}
