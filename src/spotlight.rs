//! Gaze-gated muting: while the spotlight is on, only the beacons the user
//! is looking toward make a sound.

use crate::annotation::AnnotationId;
use crate::geometry::{Meters, Pose, Radian};
use crate::probe::SpatialProbe;
use crate::registry::AnnotationRegistry;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Shape of the gaze cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlightConfig {
    /// Radius of the swept sphere
    pub radius: Meters,
    /// Half-angle of the cone, in degrees
    pub angle_degrees: f64,
    /// How far the cone reaches
    pub depth: Meters,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        SpotlightConfig {
            radius: 1.0,
            angle_degrees: 30.0,
            depth: 10.0,
        }
    }
}

impl SpotlightConfig {
    #[allow(missing_docs)]
    pub fn angle(&self) -> Radian {
        self.angle_degrees.to_radians()
    }
}

/// The on/off switch plus the cone it applies.
#[derive(Debug, Clone)]
pub struct SpotlightGate {
    enabled: bool,
    config: SpotlightConfig,
}

impl SpotlightGate {
    #[allow(missing_docs)]
    pub fn new(config: SpotlightConfig) -> Self {
        SpotlightGate {
            enabled: false,
            config,
        }
    }

    #[allow(missing_docs)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turns the gate on or off. Turning it off un-mutes everything at once.
    pub fn set_enabled(&mut self, enabled: bool, registry: &mut AnnotationRegistry) {
        self.enabled = enabled;
        if !enabled {
            registry.iter_mut().for_each(|a| a.set_muted(false));
        }
    }

    /// One tick of gating. Mutes every beacon, then un-mutes exactly the
    /// ones the cone query hits. Returns the identities left audible.
    pub fn apply<P>(&self, registry: &mut AnnotationRegistry, probe: &P, pose: &Pose) -> Vec<AnnotationId>
    where
        P: SpatialProbe + ?Sized,
    {
        if !self.enabled {
            return Vec::new();
        }

        let lit: HashSet<AnnotationId> = probe
            .cone_probe_all(
                pose.position,
                pose.forward,
                self.config.radius,
                self.config.depth,
                self.config.angle(),
            )
            .into_iter()
            .filter_map(|hit| hit.annotation)
            .collect();

        let mut audible = Vec::new();
        for annotation in registry.iter_mut() {
            if !annotation.kind().is_beacon() {
                annotation.set_muted(false);
                continue;
            }
            let on = lit.contains(&annotation.id());
            annotation.set_muted(!on);
            if on {
                audible.push(annotation.id());
            }
        }
        debug!("spotlight: {} beacon(s) in view", audible.len());
        audible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, MarkerColor, Placement};
    use crate::geometry::Point;
    use crate::probe::{ProbeHit, SurfaceTag};

    /// Hits a fixed list of annotations regardless of the query.
    struct Lit(Vec<AnnotationId>);

    impl SpatialProbe for Lit {
        fn probe(&self, _: Point, _: Point, _: f64, _: f64) -> Option<ProbeHit> {
            None
        }

        fn cone_probe_all(&self, _: Point, _: Point, _: f64, _: f64, _: f64) -> Vec<ProbeHit> {
            self.0
                .iter()
                .map(|id| ProbeHit {
                    point: Point::ZERO,
                    normal: Point::UP,
                    tag: SurfaceTag::ObstacleAnnotation,
                    annotation: Some(*id),
                })
                .collect()
        }
    }

    fn setup() -> (AnnotationRegistry, Vec<AnnotationId>) {
        let mut reg = AnnotationRegistry::new(30);
        let n = Point::new(0.0, 0.0, -1.0);
        let ids = vec![
            reg.create(Placement::beacon(AnnotationKind::Obstacle, Point::new(0.0, 1.0, 3.0), n), 0.0).id,
            reg.create(Placement::beacon(AnnotationKind::Wall, Point::new(3.0, 1.0, 0.0), n), 0.0).id,
            reg.create(Placement::region("EXIT", Point::new(-3.0, 2.0, 0.0), n, 0.12), 0.0).id,
        ];
        (reg, ids)
    }

    #[test]
    fn only_lit_beacons_stay_audible() {
        let (mut reg, ids) = setup();
        let mut gate = SpotlightGate::new(SpotlightConfig::default());
        gate.set_enabled(true, &mut reg);

        let audible = gate.apply(&mut reg, &Lit(vec![ids[0]]), &Pose::default());

        assert_eq!(audible, vec![ids[0]]);
        assert!(!reg.get(ids[0]).unwrap().is_muted());
        assert!(reg.get(ids[1]).unwrap().is_muted());
        assert_eq!(reg.get(ids[1]).unwrap().color(), MarkerColor::Gray);
        assert!(!reg.get(ids[2]).unwrap().is_muted());
    }

    #[test]
    fn disabling_unmutes_everything() {
        let (mut reg, ids) = setup();
        let mut gate = SpotlightGate::new(SpotlightConfig::default());
        gate.set_enabled(true, &mut reg);
        gate.apply(&mut reg, &Lit(Vec::new()), &Pose::default());
        assert!(reg.get(ids[0]).unwrap().is_muted());

        gate.set_enabled(false, &mut reg);
        assert!(reg.iter().all(|a| !a.is_muted()));
        assert_eq!(reg.get(ids[0]).unwrap().color(), MarkerColor::Red);
        assert_eq!(reg.get(ids[1]).unwrap().color(), MarkerColor::Orange);
        assert_eq!(reg.get(ids[2]).unwrap().color(), MarkerColor::Cyan);
    }

    #[test]
    fn disabled_gate_does_nothing() {
        let (mut reg, _) = setup();
        let gate = SpotlightGate::new(SpotlightConfig::default());
        assert!(gate.apply(&mut reg, &Lit(Vec::new()), &Pose::default()).is_empty());
        assert!(reg.iter().all(|a| !a.is_muted()));
    }
}
