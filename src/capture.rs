//! The OCR side of the engine: a request/outcome protocol with an external
//! capture service, and the gate that keeps at most one pass in flight.
//!
//! The engine never blocks on the service. It hands over a
//! [`CaptureRequest`] together with a reply [`Sender`] and later drains
//! [`CaptureOutcome`]s from the other end of the channel on its own tick.

use crate::geometry::Seconds;
use crate::region_merger::{CameraFrame, RawTextSample};
use log::{debug, warn};
use std::sync::mpsc::Sender;

/// Identifies one capture pass.
pub type CaptureId = u64;

/// How long a capture may stay in flight before the gate gives up on it.
pub const DEFAULT_CAPTURE_TIMEOUT: Seconds = 10.0;

/// What the engine hands the capture service.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    #[allow(missing_docs)]
    pub id: CaptureId,
    /// Camera pose and intrinsics at the moment the frame was taken
    pub camera: CameraFrame,
}

/// What the capture service sends back. An `Err` carries the service's own
/// description of the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureOutcome {
    #[allow(missing_docs)]
    pub id: CaptureId,
    #[allow(missing_docs)]
    pub result: Result<Vec<RawTextSample>, String>,
}

/// `CaptureService`
///
/// Takes a photo, runs OCR and eventually sends exactly one
/// [`CaptureOutcome`] on `reply`. `submit` must return promptly.
pub trait CaptureService {
    #[allow(missing_docs)]
    fn submit(&mut self, request: CaptureRequest, reply: Sender<CaptureOutcome>);
}

/// In-flight bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateState {
    #[allow(missing_docs)]
    Idle,
    /// A pass is running
    InFlight {
        #[allow(missing_docs)]
        id: CaptureId,
        /// Tick time since the pass was submitted
        elapsed: Seconds,
    },
}

/// Mutual exclusion for capture passes. Requests are rejected, never
/// queued, while a pass is in flight.
#[derive(Debug, Clone)]
pub struct CaptureGate {
    state: GateState,
    next_id: CaptureId,
    timeout: Seconds,
}

impl CaptureGate {
    #[allow(missing_docs)]
    pub fn new(timeout: Seconds) -> Self {
        CaptureGate {
            state: GateState::Idle,
            next_id: 1,
            timeout,
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> GateState {
        self.state
    }

    #[allow(missing_docs)]
    pub fn in_flight(&self) -> bool {
        self.state != GateState::Idle
    }

    /// Claims the gate for a new pass. `None` when one is already running.
    pub fn try_begin(&mut self) -> Option<CaptureId> {
        if self.in_flight() {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.state = GateState::InFlight { id, elapsed: 0.0 };
        Some(id)
    }

    /// Releases the gate if `id` is the pass in flight. Returns `false` for
    /// stale outcomes, which the caller should drop.
    pub fn complete(&mut self, id: CaptureId) -> bool {
        match self.state {
            GateState::InFlight { id: current, .. } if current == id => {
                self.state = GateState::Idle;
                true
            }
            _ => {
                warn!("dropping stale capture outcome {}", id);
                false
            }
        }
    }

    /// Advances the in-flight timer. Returns `true` when the pass just timed
    /// out and the gate was released.
    pub fn tick(&mut self, dt: Seconds) -> bool {
        if let GateState::InFlight { id, elapsed } = &mut self.state {
            *elapsed += dt;
            if *elapsed >= self.timeout {
                debug!("capture {} timed out after {:.1}s", id, elapsed);
                self.state = GateState::Idle;
                return true;
            }
        }
        false
    }
}

impl Default for CaptureGate {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_is_rejected_until_completion() {
        let mut gate = CaptureGate::default();
        let first = gate.try_begin().unwrap();
        assert!(gate.try_begin().is_none());
        assert!(gate.complete(first));
        assert!(!gate.in_flight());
        let second = gate.try_begin().unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn timeout_releases_and_late_outcome_is_stale() {
        let mut gate = CaptureGate::new(1.0);
        let id = gate.try_begin().unwrap();
        assert!(!gate.tick(0.5));
        assert!(gate.tick(0.5));
        assert!(!gate.in_flight());
        assert!(!gate.complete(id));
    }

    #[test]
    fn unknown_outcome_does_not_release() {
        let mut gate = CaptureGate::default();
        let id = gate.try_begin().unwrap();
        assert!(!gate.complete(id + 7));
        assert!(gate.in_flight());
    }
}
