//! Decides when the beacon set has gone stale.
//!
//! The scheduler never touches annotations itself; [`RefreshScheduler::tick`]
//! answers "regenerate now?" and the caller does the clearing and sampling
//! inside the same `&mut` call, so nobody ever observes a half-refreshed set.

use crate::error::EngineError;
use crate::geometry::{Meters, Point, Seconds};
use serde::{Deserialize, Serialize};

/// What counts as "stale".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RefreshTrigger {
    /// The user has walked `distance_threshold` meters from the anchor
    #[default]
    Distance,
    /// `time_threshold` seconds have passed
    Time,
}

/// Trigger selection and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    #[allow(missing_docs)]
    pub trigger: RefreshTrigger,
    #[allow(missing_docs)]
    pub distance_threshold: Meters,
    #[allow(missing_docs)]
    pub time_threshold: Seconds,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            trigger: RefreshTrigger::Distance,
            distance_threshold: 2.0,
            time_threshold: 8.0,
        }
    }
}

/// Where the scheduler is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RefreshState {
    /// Obstacle mode is off
    Idle,
    /// Regenerate once the user is far enough from `anchor`
    ActiveDistance {
        #[allow(missing_docs)]
        anchor: Point,
    },
    /// Regenerate once `elapsed` reaches the time threshold
    ActiveTime {
        #[allow(missing_docs)]
        elapsed: Seconds,
    },
}

/// The refresh state machine.
#[derive(Debug, Clone)]
pub struct RefreshScheduler {
    config: RefreshConfig,
    state: RefreshState,
}

impl RefreshScheduler {
    #[allow(missing_docs)]
    pub fn new(config: RefreshConfig) -> Self {
        RefreshScheduler {
            config,
            state: RefreshState::Idle,
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> RefreshState {
        self.state
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    #[allow(missing_docs)]
    pub fn is_active(&self) -> bool {
        self.state != RefreshState::Idle
    }

    fn armed(&self, position: Point) -> RefreshState {
        match self.config.trigger {
            RefreshTrigger::Distance => RefreshState::ActiveDistance { anchor: position },
            RefreshTrigger::Time => RefreshState::ActiveTime { elapsed: 0.0 },
        }
    }

    /// Leaves `Idle`. Returns `true` when the caller should run a placement
    /// pass right away; activating twice is a no-op.
    pub fn activate(&mut self, position: Point) -> bool {
        if self.is_active() {
            return false;
        }
        self.state = self.armed(position);
        true
    }

    /// Returns to `Idle`. Returns `true` when the caller should clear the
    /// beacons, i.e. when the scheduler was active.
    pub fn deactivate(&mut self) -> bool {
        let was_active = self.is_active();
        self.state = RefreshState::Idle;
        was_active
    }

    /// Advances the clock. Returns `true` when the beacon set should be
    /// regenerated now; the anchor has already been reset when it does.
    pub fn tick(&mut self, position: Point, dt: Seconds) -> bool {
        match &mut self.state {
            RefreshState::Idle => false,
            RefreshState::ActiveDistance { anchor } => {
                if position.abs_dist(anchor) >= self.config.distance_threshold {
                    *anchor = position;
                    true
                } else {
                    false
                }
            }
            RefreshState::ActiveTime { elapsed } => {
                *elapsed += dt;
                if *elapsed >= self.config.time_threshold {
                    *elapsed = 0.0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Selects a trigger and its threshold. When active, the new trigger is
    /// re-anchored at `position`.
    ///
    /// The threshold must be finite and positive: zero would regenerate on
    /// every tick and NaN would never fire. A rejected call changes nothing.
    pub fn set_trigger(
        &mut self,
        trigger: RefreshTrigger,
        threshold: f64,
        position: Point,
    ) -> Result<(), EngineError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(EngineError::InvalidThreshold(threshold));
        }
        self.config.trigger = trigger;
        match trigger {
            RefreshTrigger::Distance => self.config.distance_threshold = threshold,
            RefreshTrigger::Time => self.config.time_threshold = threshold,
        }
        if self.is_active() {
            self.state = self.armed(position);
        }
        Ok(())
    }

    /// Resets the anchor without changing mode, after a regeneration the
    /// caller forced on its own.
    pub fn reanchor(&mut self, position: Point) {
        if self.is_active() {
            self.state = self.armed(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_never_fires() {
        let mut s = RefreshScheduler::new(RefreshConfig::default());
        assert!(!s.tick(Point::new(100.0, 0.0, 0.0), 100.0));
        assert!(!s.deactivate());
    }

    #[test]
    fn distance_trigger_fires_once_per_threshold() {
        let mut s = RefreshScheduler::new(RefreshConfig::default());
        assert!(s.activate(Point::ZERO));
        assert!(!s.activate(Point::ZERO));

        let mut fired = 0;
        for i in 1..=25 {
            if s.tick(Point::new(0.0, 0.0, i as f64 * 0.1), 0.1) {
                fired += 1;
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(
            s.state(),
            RefreshState::ActiveDistance {
                anchor: Point::new(0.0, 0.0, 2.0)
            }
        );
    }

    #[test]
    fn time_trigger_accumulates_and_resets() {
        let mut s = RefreshScheduler::new(RefreshConfig {
            trigger: RefreshTrigger::Time,
            ..RefreshConfig::default()
        });
        s.activate(Point::ZERO);
        let fires: Vec<bool> = (0..20).map(|_| s.tick(Point::ZERO, 1.0)).collect();
        assert_eq!(fires.iter().filter(|f| **f).count(), 2);
        assert!(fires[7]);
        assert!(fires[15]);
    }

    #[test]
    fn switching_trigger_reanchors() {
        let mut s = RefreshScheduler::new(RefreshConfig::default());
        s.activate(Point::ZERO);
        s.tick(Point::new(1.5, 0.0, 0.0), 0.1);

        s.set_trigger(RefreshTrigger::Time, 3.0, Point::new(1.5, 0.0, 0.0)).unwrap();
        assert_eq!(s.state(), RefreshState::ActiveTime { elapsed: 0.0 });

        s.set_trigger(RefreshTrigger::Distance, 1.0, Point::new(1.5, 0.0, 0.0)).unwrap();
        assert!(!s.tick(Point::new(2.0, 0.0, 0.0), 0.1));
        assert!(s.tick(Point::new(2.5, 0.0, 0.0), 0.1));
    }

    #[test]
    fn setting_trigger_while_idle_stays_idle() {
        let mut s = RefreshScheduler::new(RefreshConfig::default());
        s.set_trigger(RefreshTrigger::Time, 4.0, Point::ZERO).unwrap();
        assert_eq!(s.state(), RefreshState::Idle);
        assert_eq!(s.config().time_threshold, 4.0);
        s.activate(Point::ZERO);
        assert_eq!(s.state(), RefreshState::ActiveTime { elapsed: 0.0 });
        assert!(s.deactivate());
        assert!(!s.is_active());
    }

    #[test]
    fn non_positive_or_non_finite_thresholds_are_rejected() {
        let mut s = RefreshScheduler::new(RefreshConfig::default());
        s.activate(Point::ZERO);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                s.set_trigger(RefreshTrigger::Time, bad, Point::ZERO),
                Err(EngineError::InvalidThreshold(_))
            ));
        }
        assert_eq!(*s.config(), RefreshConfig::default());
        assert_eq!(s.state(), RefreshState::ActiveDistance { anchor: Point::ZERO });
        assert!(!s.tick(Point::ZERO, 1.0));
    }
}
