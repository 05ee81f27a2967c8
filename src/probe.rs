//! The seam between the engine and whatever knows the shape of the room.
//!
//! On a headset this is the spatial-mapping mesh plus the colliders of the
//! markers the renderer has placed; in the binaries and tests it is a
//! [`SyntheticRoom`](crate::room::SyntheticRoom).

use crate::annotation::AnnotationId;
use crate::geometry::{Meters, Point, Radian};
use crate::registry::Marker;

/// Classification of the surface a probe hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceTag {
    #[allow(missing_docs)]
    Floor,
    #[allow(missing_docs)]
    Ceiling,
    #[allow(missing_docs)]
    Wall,
    /// The collider of an existing obstacle beacon
    ObstacleAnnotation,
    /// The collider of an existing wall beacon
    WallAnnotation,
    /// Anything else the mesh contains
    Unclassified,
}

/// One probe result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    #[allow(missing_docs)]
    pub point: Point,
    /// Outward surface normal at the hit point.
    pub normal: Point,
    #[allow(missing_docs)]
    pub tag: SurfaceTag,
    /// Set when the hit collider belongs to an annotation.
    pub annotation: Option<AnnotationId>,
}

/// `SpatialProbe`
///
/// Ray and cone queries against the scene. Implementations are expected to
/// behave like pure functions of the scene state.
pub trait SpatialProbe {
    /// Sweeps a sphere of `radius` from `origin` along `direction` and
    /// reports the nearest hit within `range`.
    fn probe(
        &self,
        origin: Point,
        direction: Point,
        radius: Meters,
        range: Meters,
    ) -> Option<ProbeHit>;

    /// Every annotation collider within a swept sphere of `radius` along
    /// `direction` that also lies within `angle` of it.
    fn cone_probe_all(
        &self,
        origin: Point,
        direction: Point,
        radius: Meters,
        range: Meters,
        angle: Radian,
    ) -> Vec<ProbeHit>;

    /// Called after the set of live annotations changes so the scene can
    /// keep marker colliders in step. Scenes that track markers themselves
    /// can ignore it.
    fn sync_markers(&mut self, _markers: &[Marker]) {}
}
