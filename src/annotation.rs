//! The unit of state the engine hands to renderers and the audio device: a
//! persistent marker pinned to a point in the room.
//!
//! Beacons (obstacles and walls) are short-lived and regenerated as the user
//! moves. Regions carry the text read off a sign and persist until the user
//! clears them.

use crate::geometry::{Point, Seconds};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque handle for a live [`Annotation`]. Handles are never reused within
/// a session, so a stale handle simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnotationId(pub(crate) u64);

impl Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What real-world thing an annotation stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    /// Something the user could walk into
    Obstacle,
    /// A wall of the room
    Wall,
    /// A merged block of OCR text
    TextRegion,
}

impl AnnotationKind {
    /// Human-readable name, also used as the dedup payload for beacons.
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationKind::Obstacle => "Obstacle",
            AnnotationKind::Wall => "Wall",
            AnnotationKind::TextRegion => "Text",
        }
    }

    /// Obstacles and walls are beacons: the refresh scheduler and the
    /// spotlight only ever touch these.
    pub fn is_beacon(&self) -> bool {
        matches!(self, AnnotationKind::Obstacle | AnnotationKind::Wall)
    }

    /// Colour the renderer should use for an un-muted annotation of this kind.
    pub fn color(&self) -> MarkerColor {
        match self {
            AnnotationKind::Obstacle => MarkerColor::Red,
            AnnotationKind::Wall => MarkerColor::Orange,
            AnnotationKind::TextRegion => MarkerColor::Cyan,
        }
    }
}

/// The small palette the renderer realizes annotations with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum MarkerColor {
    Red,
    Orange,
    Cyan,
    Gray,
}

/// A persistent spatial marker. Position, kind and payload are fixed at
/// creation; only the mute flag changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    id: AnnotationId,
    kind: AnnotationKind,
    position: Point,
    facing: Point,
    text: Option<String>,
    scale: f64,
    created_at: Seconds,
    muted: bool,
}

impl Annotation {
    pub(crate) fn new(id: AnnotationId, placement: Placement, created_at: Seconds) -> Self {
        Annotation {
            id,
            kind: placement.kind,
            position: placement.position,
            facing: placement.facing,
            text: placement.text,
            scale: placement.scale,
            created_at,
            muted: false,
        }
    }

    #[allow(missing_docs)]
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    #[allow(missing_docs)]
    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    #[allow(missing_docs)]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Unit vector the marker faces, i.e. into the surface it sits on.
    pub fn facing(&self) -> Point {
        self.facing
    }

    /// Normalized text for regions, `None` for beacons.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Marker radius in meters.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Engine clock reading when the annotation was created.
    pub fn created_at(&self) -> Seconds {
        self.created_at
    }

    #[allow(missing_docs)]
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Muted beacons are drawn gray; everything else uses its kind colour.
    pub fn color(&self) -> MarkerColor {
        if self.muted {
            MarkerColor::Gray
        } else {
            self.kind.color()
        }
    }
}

/// Everything needed to create an annotation, before it has an identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    #[allow(missing_docs)]
    pub kind: AnnotationKind,
    #[allow(missing_docs)]
    pub position: Point,
    /// Facing direction, the negated surface normal at the hit point.
    pub facing: Point,
    #[allow(missing_docs)]
    pub text: Option<String>,
    #[allow(missing_docs)]
    pub scale: f64,
}

/// Default radius of a beacon marker.
pub const BEACON_SCALE: f64 = 0.1;

impl Placement {
    /// A beacon sitting on a surface with the given normal.
    pub fn beacon(kind: AnnotationKind, position: Point, normal: Point) -> Self {
        Placement {
            kind,
            position,
            facing: (-normal).normalized(),
            text: None,
            scale: BEACON_SCALE,
        }
    }

    /// A text region. The text is normalized: trimmed, with runs of
    /// whitespace collapsed to a single space.
    pub fn region(text: &str, position: Point, normal: Point, scale: f64) -> Self {
        Placement {
            kind: AnnotationKind::TextRegion,
            position,
            facing: (-normal).normalized(),
            text: Some(normalize_text(text)),
            scale,
        }
    }

    /// The string the dedup index compares: region text, or the kind label
    /// for beacons.
    pub fn dedup_payload(&self) -> &str {
        self.text.as_deref().unwrap_or(self.kind.label())
    }
}

/// Trims and collapses whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_text_is_normalized() {
        let p = Placement::region("  EXIT \t  ONLY ", Point::ZERO, Point::UP, 0.12);
        assert_eq!(p.text.as_deref(), Some("EXIT ONLY"));
        assert_eq!(p.dedup_payload(), "EXIT ONLY");
        assert_eq!(p.facing, Point::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn beacon_payload_is_kind_label() {
        let p = Placement::beacon(AnnotationKind::Wall, Point::ZERO, Point::UP);
        assert_eq!(p.dedup_payload(), "Wall");
        assert!(p.text.is_none());
    }

    #[test]
    fn muted_annotations_are_gray() {
        let p = Placement::beacon(AnnotationKind::Obstacle, Point::ZERO, Point::UP);
        let mut a = Annotation::new(AnnotationId(1), p, 0.0);
        assert_eq!(a.color(), MarkerColor::Red);
        a.set_muted(true);
        assert_eq!(a.color(), MarkerColor::Gray);
    }
}
