//! Sprays probes in a jittered cone around the gaze direction and turns the
//! hits into placement requests.
//!
//! Too few samples miss obstacles; too many flood the room with beacons. The
//! sample count and the spread are therefore live-tunable, taking effect on
//! the next pass.

use crate::annotation::{AnnotationKind, Placement};
use crate::geometry::{Meters, Point};
use crate::probe::{ProbeHit, SpatialProbe, SurfaceTag};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Radius of the sphere swept by each probe.
pub const SPHERE_RADIUS: Meters = 0.1;

/// Range of a single straight-ahead shot.
pub const SINGLE_SHOT_RANGE: Meters = 30.0;

/// Most probes a single pass may fire.
pub const MAX_SAMPLES: usize = 640;

/// Widest perturbation the spread may be tuned to. Past this the gaze
/// direction no longer matters.
pub const MAX_DEVIATION: f64 = 5.0;

/// Tunable parameters of a sampling pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Probes per pass
    pub max_samples: usize,
    /// Length of the random perturbation added to the gaze direction
    pub deviation: f64,
    /// Maximum probe distance
    pub max_range: Meters,
    /// Radius of the swept sphere
    pub sphere_radius: Meters,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            max_samples: 20,
            deviation: 0.2,
            max_range: 10.0,
            sphere_radius: SPHERE_RADIUS,
        }
    }
}

/// What happened to one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleResult {
    /// Nothing within range
    Miss,
    /// Hit something that should not get a beacon
    Discarded(SurfaceTag),
    /// Hit something that should
    Placement(Placement),
}

/// Maps a hit to the beacon it warrants, if any.
pub fn classify(hit: &ProbeHit) -> SampleResult {
    match hit.tag {
        SurfaceTag::Floor
        | SurfaceTag::Ceiling
        | SurfaceTag::ObstacleAnnotation
        | SurfaceTag::WallAnnotation => SampleResult::Discarded(hit.tag),
        SurfaceTag::Wall => {
            SampleResult::Placement(Placement::beacon(AnnotationKind::Wall, hit.point, hit.normal))
        }
        SurfaceTag::Unclassified => SampleResult::Placement(Placement::beacon(
            AnnotationKind::Obstacle,
            hit.point,
            hit.normal,
        )),
    }
}

/// Drives the cone passes.
#[derive(Debug, Clone)]
pub struct ConeSampler {
    config: SamplerConfig,
}

impl ConeSampler {
    #[allow(missing_docs)]
    pub fn new(config: SamplerConfig) -> Self {
        ConeSampler {
            config: SamplerConfig {
                max_samples: config.max_samples.clamp(1, MAX_SAMPLES),
                deviation: config.deviation.min(MAX_DEVIATION),
                ..config
            },
        }
    }

    #[allow(missing_docs)]
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// One pass of `max_samples` probes. Each probe direction is the gaze
    /// plus a point on the unit sphere scaled by `deviation`.
    pub fn sample<P, R>(
        &self,
        probe: &P,
        rng: &mut R,
        origin: Point,
        direction: Point,
    ) -> Vec<SampleResult>
    where
        P: SpatialProbe + ?Sized,
        R: Rng + ?Sized,
    {
        let SamplerConfig {
            max_samples,
            deviation,
            max_range,
            sphere_radius,
        } = self.config;

        (0..max_samples)
            .map(|_| {
                let jitter = Point::random_on_unit_sphere(rng) * deviation;
                match probe.probe(origin, direction + jitter, sphere_radius, max_range) {
                    Some(hit) => {
                        let result = classify(&hit);
                        if let SampleResult::Discarded(tag) = result {
                            debug!("discarding probe hit on {:?} at {}", tag, hit.point);
                        }
                        result
                    }
                    None => SampleResult::Miss,
                }
            })
            .collect()
    }

    /// A single straight ray along the gaze.
    pub fn single_shot<P>(&self, probe: &P, origin: Point, direction: Point) -> SampleResult
    where
        P: SpatialProbe + ?Sized,
    {
        match probe.probe(origin, direction, 0.0, SINGLE_SHOT_RANGE) {
            Some(hit) => classify(&hit),
            None => SampleResult::Miss,
        }
    }

    /// Doubles the number of probes per pass, never above [`MAX_SAMPLES`].
    pub fn more_samples(&mut self) {
        self.config.max_samples = self.config.max_samples.saturating_mul(2).min(MAX_SAMPLES);
    }

    /// Halves the number of probes per pass, never below one.
    pub fn fewer_samples(&mut self) {
        self.config.max_samples = (self.config.max_samples / 2).max(1);
    }

    /// Multiplies the spread by five, never above [`MAX_DEVIATION`].
    pub fn wider_spread(&mut self) {
        self.config.deviation = (self.config.deviation * 5.0).min(MAX_DEVIATION);
    }

    /// Divides the spread by five.
    pub fn narrower_spread(&mut self) {
        self.config.deviation /= 5.0;
    }
}
