//! EchoBeacon turns noisy spatial sensing into a small, stable set of
//! persistent spatial annotations that a blind or low-vision user can hear.
//!
//! Two streams feed it. Directional probes, sprayed in a cone around where
//! the user is looking, become *beacons* on obstacles and walls. OCR results
//! from a head-mounted camera become *regions* carrying the text of signs.
//! Both pass through an approximate-match cache so re-sampling the same
//! thing does not pile up duplicates, beacons are regenerated as the user
//! walks, and every annotation maps to a pitch and volume for its audio cue.
//!
//! The whole core runs on the caller's thread inside [`engine::Engine`]:
//!
//! - [`cone_sampler`] sprays probes and classifies the hits
//! - [`registry`] owns the live annotations
//! - [`dedup`] recognizes the same real-world thing seen twice
//! - [`scheduler`] decides when the beacon set has gone stale
//! - [`spotlight`] mutes whatever the user is not looking toward
//! - [`proximity_audio`] maps relative position to pitch and volume
//! - [`region_merger`] merges OCR word boxes into sign-level regions
//! - [`capture`] gates the asynchronous OCR pass
//! - [`announcer`] queues spoken feedback
//!
//! The scene and the OCR and speech services are collaborators behind the
//! [`probe::SpatialProbe`], [`capture::CaptureService`] and
//! [`announcer::Speaker`] traits. [`room`] and [`ocr_sim`] provide synthetic
//! versions for the binaries and the tests.

#![warn(missing_docs)]
pub mod annotation;
pub mod announcer;
pub mod args;
pub mod capture;
pub mod command;
pub mod cone_sampler;
pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod ocr_sim;
pub mod probe;
pub mod proximity_audio;
pub mod region_merger;
pub mod registry;
pub mod room;
pub mod scheduler;
pub mod spotlight;

pub use geometry::{Point, Pose};
