//! Maps where an annotation sits relative to the listener onto the pitch and
//! volume of its audio cue.
//!
//! Pitch encodes height: cues above the listener's head sound high, cues
//! near the floor sound low. Volume encodes distance. Both mappings are pure,
//! continuous and clamped.

use crate::geometry::Meters;
use serde::{Deserialize, Serialize};

/// How volume falls off with distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Falloff {
    /// `min_distance / distance`; loud up close, quickly quieter
    #[default]
    Logarithmic,
    /// Full volume inside `min_distance`, a straight ramp to silence at
    /// `max_distance`
    Linear,
}

/// Tuning for the audio mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Height of the band the pitch ramp spans
    pub box_size: Meters,
    #[allow(missing_docs)]
    pub min_pitch: f64,
    #[allow(missing_docs)]
    pub max_pitch: f64,
    /// Distance inside which cues play at full volume
    pub min_distance: Meters,
    /// Distance beyond which cues are silent
    pub max_distance: Meters,
    #[allow(missing_docs)]
    pub falloff: Falloff,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            box_size: 2.0,
            min_pitch: 0.5,
            max_pitch: 1.0,
            min_distance: 1.0,
            max_distance: 10.0,
            falloff: Falloff::Logarithmic,
        }
    }
}

/// The parameters handed to the audio device for one cue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AudioParams {
    pub pitch: f64,
    pub volume: f64,
}

/// Pitch for a cue `height_difference` meters above (positive) or below
/// (negative) the listener.
///
/// The ramp is anchored so that a quarter of the box lies above the
/// listener: `max_pitch` from `+0.25 * box_size` up, `min_pitch` from
/// `-0.75 * box_size` down, linear in between.
pub fn pitch_for(height_difference: Meters, box_size: Meters, min_pitch: f64, max_pitch: f64) -> f64 {
    if height_difference >= 0.25 * box_size {
        max_pitch
    } else if height_difference <= -0.75 * box_size {
        min_pitch
    } else {
        min_pitch + (max_pitch - min_pitch) * (height_difference + 0.75 * box_size) / box_size
    }
}

/// Volume for a cue `distance` meters away.
pub fn volume_for(distance: Meters, falloff: Falloff, min_distance: Meters, max_distance: Meters) -> f64 {
    if distance > max_distance {
        return 0.0;
    }
    match falloff {
        Falloff::Logarithmic => {
            if distance <= 0.0 {
                1.0
            } else {
                (min_distance / distance).clamp(0.0, 1.0)
            }
        }
        Falloff::Linear => {
            if distance <= min_distance {
                1.0
            } else if max_distance <= min_distance {
                0.0
            } else {
                ((max_distance - distance) / (max_distance - min_distance)).clamp(0.0, 1.0)
            }
        }
    }
}

impl AudioConfig {
    /// Pitch and volume for a cue. Muted cues keep their pitch but are
    /// silent.
    pub fn params(&self, height_difference: Meters, distance: Meters, muted: bool) -> AudioParams {
        AudioParams {
            pitch: pitch_for(height_difference, self.box_size, self.min_pitch, self.max_pitch),
            volume: if muted {
                0.0
            } else {
                volume_for(distance, self.falloff, self.min_distance, self.max_distance)
            },
        }
    }
}
