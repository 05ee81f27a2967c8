//! The arena that owns every live [`Annotation`].
//!
//! Nothing else in the crate holds an annotation past the call that created
//! it; other components refer to annotations by [`AnnotationId`] only.

use crate::annotation::{Annotation, AnnotationId, AnnotationKind, Placement};
use crate::geometry::{Point, Seconds};
use log::{debug, warn};
use std::collections::BTreeMap;

/// Result of a successful [`AnnotationRegistry::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created {
    #[allow(missing_docs)]
    pub id: AnnotationId,
    /// `Some(live_count)` when the registry is now above its configured
    /// maximum. The annotation is still created.
    pub over_capacity: Option<usize>,
}

/// Owns all annotations, keyed by identity.
#[derive(Debug)]
pub struct AnnotationRegistry {
    annotations: BTreeMap<AnnotationId, Annotation>,
    next_id: u64,
    max_annotations: usize,
}

impl AnnotationRegistry {
    /// An empty registry that warns once more than `max_annotations` are live.
    pub fn new(max_annotations: usize) -> Self {
        AnnotationRegistry {
            annotations: BTreeMap::new(),
            next_id: 1,
            max_annotations,
        }
    }

    /// Creates an annotation and hands back its new identity.
    pub fn create(&mut self, placement: Placement, now: Seconds) -> Created {
        let id = AnnotationId(self.next_id);
        self.next_id += 1;

        debug!("creating {:?} {} at {}", placement.kind, id, placement.position);
        self.annotations
            .insert(id, Annotation::new(id, placement, now));

        let live = self.annotations.len();
        let over_capacity = if live > self.max_annotations {
            warn!(
                "{} annotations live, above the maximum of {}",
                live, self.max_annotations
            );
            Some(live)
        } else {
            None
        };

        Created { id, over_capacity }
    }

    /// Removes one annotation. Returns it if it was live.
    pub fn destroy(&mut self, id: AnnotationId) -> Option<Annotation> {
        self.annotations.remove(&id)
    }

    /// Removes every annotation matching `pred`, returning their identities.
    pub fn clear_where<F>(&mut self, mut pred: F) -> Vec<AnnotationId>
    where
        F: FnMut(&Annotation) -> bool,
    {
        let doomed: Vec<AnnotationId> = self
            .annotations
            .values()
            .filter(|a| pred(a))
            .map(|a| a.id())
            .collect();
        for id in &doomed {
            self.annotations.remove(id);
        }
        doomed
    }

    /// Removes all obstacle and wall beacons.
    pub fn clear_beacons(&mut self) -> Vec<AnnotationId> {
        self.clear_where(|a| a.kind().is_beacon())
    }

    /// Removes all text regions.
    pub fn clear_text(&mut self) -> Vec<AnnotationId> {
        self.clear_where(|a| a.kind() == AnnotationKind::TextRegion)
    }

    #[allow(missing_docs)]
    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    /// Live annotations in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Annotation> {
        self.annotations.values_mut()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Number of live annotations of one kind.
    pub fn count_kind(&self, kind: AnnotationKind) -> usize {
        self.annotations.values().filter(|a| a.kind() == kind).count()
    }

    /// Identity, kind, position and radius of every live annotation, the
    /// view a scene layer needs to keep its colliders in step.
    pub fn markers(&self) -> Vec<Marker> {
        self.annotations
            .values()
            .map(|a| Marker {
                id: a.id(),
                kind: a.kind(),
                position: a.position(),
                radius: a.scale(),
            })
            .collect()
    }

    #[allow(missing_docs)]
    pub fn max_annotations(&self) -> usize {
        self.max_annotations
    }
}

/// A lightweight copy of an annotation's physical footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct Marker {
    pub id: AnnotationId,
    pub kind: AnnotationKind,
    pub position: Point,
    pub radius: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon(kind: AnnotationKind, x: f64) -> Placement {
        Placement::beacon(kind, Point::new(x, 1.0, 3.0), Point::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn identities_are_unique_and_never_reused() {
        let mut reg = AnnotationRegistry::new(30);
        let a = reg.create(beacon(AnnotationKind::Wall, 0.0), 0.0).id;
        let b = reg.create(beacon(AnnotationKind::Wall, 1.0), 0.0).id;
        assert_ne!(a, b);
        reg.destroy(b);
        let c = reg.create(beacon(AnnotationKind::Wall, 2.0), 0.0).id;
        assert_ne!(b, c);
        assert!(reg.get(b).is_none());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn clearing_beacons_leaves_text() {
        let mut reg = AnnotationRegistry::new(30);
        reg.create(beacon(AnnotationKind::Wall, 0.0), 0.0);
        reg.create(beacon(AnnotationKind::Obstacle, 1.0), 0.0);
        let text = reg
            .create(
                Placement::region("EXIT", Point::new(0.0, 2.0, 4.0), Point::UP, 0.12),
                0.0,
            )
            .id;

        let removed = reg.clear_beacons();
        assert_eq!(removed.len(), 2);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(text).is_some());

        reg.clear_text();
        assert!(reg.is_empty());
    }

    #[test]
    fn capacity_is_a_warning_not_a_refusal() {
        let mut reg = AnnotationRegistry::new(2);
        assert_eq!(reg.create(beacon(AnnotationKind::Wall, 0.0), 0.0).over_capacity, None);
        assert_eq!(reg.create(beacon(AnnotationKind::Wall, 1.0), 0.0).over_capacity, None);
        let third = reg.create(beacon(AnnotationKind::Wall, 2.0), 0.0);
        assert_eq!(third.over_capacity, Some(3));
        assert_eq!(reg.len(), 3);
    }
}
