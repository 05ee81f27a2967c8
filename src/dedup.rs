//! Approximate-match cache that recognizes "the same real-world thing" seen
//! twice.
//!
//! Entries are bucketed by their edit distance to a fixed, meaningless
//! reference string divided by the tolerance, so near-identical payloads land
//! in the same bucket and only that bucket is scanned. A candidate is a
//! duplicate only when it is *both* textually similar and spatially close to
//! an entry, so two identical signs on opposite walls both survive.
//!
//! The bucket divisor and the pairwise threshold are the same number; the
//! index stores a single `tolerance` so the two cannot drift apart.

use crate::annotation::AnnotationId;
use crate::geometry::{Meters, Point};
use log::debug;
use std::collections::HashMap;

/// The string every payload is measured against to derive its bucket key.
pub const REFERENCE: &str = "2l9f2o0l25m4205Gc0353m58c75nc29057n245cnrn290nD0v45";

/// Maximum edit distance still considered "the same text".
pub const DEFAULT_TOLERANCE: usize = 7;

/// Maximum distance between two detections of the same thing.
pub const DEFAULT_PROXIMITY_RADIUS: Meters = 0.135;

/// Levenshtein distance between two strings, counted in `char`s.
pub fn edit_distance(s: &str, t: &str) -> usize {
    let s: Vec<char> = s.chars().collect();
    let t: Vec<char> = t.chars().collect();
    if s.is_empty() {
        return t.len();
    }
    if t.is_empty() {
        return s.len();
    }

    // Two rolling rows of the full DP table.
    let mut prev: Vec<usize> = (0..=t.len()).collect();
    let mut curr = vec![0; t.len() + 1];
    for (i, sc) in s.iter().enumerate() {
        curr[0] = i + 1;
        for (j, tc) in t.iter().enumerate() {
            let cost = usize::from(sc != tc);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[t.len()]
}

/// Which family of annotations an entry belongs to. Namespaces never see
/// each other's entries and are cleared independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Obstacle and wall beacons
    Beacon,
    /// OCR text regions
    Text,
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    owner: AnnotationId,
    payload: String,
    position: Point,
}

/// The bucketed cache itself.
#[derive(Debug)]
pub struct DedupIndex {
    tolerance: usize,
    proximity_radius: Meters,
    buckets: HashMap<(Namespace, usize), Vec<Entry>>,
}

impl Default for DedupIndex {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE, DEFAULT_PROXIMITY_RADIUS)
    }
}

impl DedupIndex {
    /// A tolerance of zero would make every candidate novel and the bucket
    /// key undefined, so it is raised to one.
    pub fn new(tolerance: usize, proximity_radius: Meters) -> Self {
        DedupIndex {
            tolerance: tolerance.max(1),
            proximity_radius,
            buckets: HashMap::new(),
        }
    }

    #[allow(missing_docs)]
    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    #[allow(missing_docs)]
    pub fn proximity_radius(&self) -> Meters {
        self.proximity_radius
    }

    /// Coarse similarity hash of a payload.
    pub fn bucket_key(&self, payload: &str) -> usize {
        edit_distance(payload, REFERENCE) / self.tolerance
    }

    /// True when an entry in the payload's bucket is both within tolerance
    /// textually and within the proximity radius spatially.
    pub fn is_duplicate(&self, ns: Namespace, payload: &str, position: Point) -> bool {
        let key = self.bucket_key(payload);
        self.buckets
            .get(&(ns, key))
            .map(|bucket| {
                bucket.iter().any(|e| {
                    edit_distance(payload, &e.payload) < self.tolerance
                        && position.abs_dist(&e.position) < self.proximity_radius
                })
            })
            .unwrap_or(false)
    }

    /// Records a novel entry under its bucket. The bucket is computed here,
    /// once, and never revisited.
    pub fn insert(&mut self, ns: Namespace, owner: AnnotationId, payload: &str, position: Point) {
        let key = self.bucket_key(payload);
        self.buckets.entry((ns, key)).or_default().push(Entry {
            owner,
            payload: payload.to_owned(),
            position,
        });
    }

    /// Checks a candidate and, when it is novel, lets `create` make the
    /// annotation and records the new entry. Returns `true` when the
    /// candidate was a duplicate and was suppressed.
    pub fn check_and_maybe_reject<F>(
        &mut self,
        ns: Namespace,
        payload: &str,
        position: Point,
        create: F,
    ) -> bool
    where
        F: FnOnce() -> AnnotationId,
    {
        if self.is_duplicate(ns, payload, position) {
            debug!("suppressing duplicate {:?} '{}' at {}", ns, payload, position);
            return true;
        }
        let owner = create();
        self.insert(ns, owner, payload, position);
        false
    }

    /// Drops the entry owned by one annotation, if any.
    pub fn remove(&mut self, owner: AnnotationId) {
        for bucket in self.buckets.values_mut() {
            bucket.retain(|e| e.owner != owner);
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
    }

    /// Drops every entry of one namespace, from every bucket.
    pub fn purge(&mut self, ns: Namespace) {
        self.buckets.retain(|(bucket_ns, _), _| *bucket_ns != ns);
    }

    /// Changes the tolerance, which moves the bucket boundaries. Every entry
    /// is re-inserted so true duplicates keep sharing a bucket.
    pub fn set_tolerance(&mut self, tolerance: usize) {
        let old = std::mem::take(&mut self.buckets);
        self.tolerance = tolerance.max(1);
        for ((ns, _), bucket) in old {
            for e in bucket {
                self.insert(ns, e.owner, &e.payload, e.position);
            }
        }
    }

    /// Number of entries in one namespace.
    pub fn len(&self, ns: Namespace) -> usize {
        self.buckets
            .iter()
            .filter(|((bucket_ns, _), _)| *bucket_ns == ns)
            .map(|(_, b)| b.len())
            .sum()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> AnnotationId {
        AnnotationId(n)
    }

    #[test]
    fn levenshtein_classics() {
        assert_eq!(edit_distance("", ""), 0);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", ""), 3);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("flaw", "lawn"), 2);
        assert_eq!(edit_distance("EXIT", "EXIT"), 0);
        assert_eq!(edit_distance("café", "cafe"), 1);
    }

    #[test]
    fn same_text_same_place_is_inserted_once() {
        let mut index = DedupIndex::default();
        let p = Point::new(1.0, 1.5, 3.0);
        let mut created = 0;

        let first = index.check_and_maybe_reject(Namespace::Text, "ROOM 204", p, || {
            created += 1;
            id(1)
        });
        let second = index.check_and_maybe_reject(Namespace::Text, "ROOM 204", p, || {
            created += 1;
            id(2)
        });

        assert!(!first);
        assert!(second);
        assert_eq!(created, 1);
        assert_eq!(index.len(Namespace::Text), 1);
    }

    #[test]
    fn small_misreads_nearby_are_duplicates() {
        let mut index = DedupIndex::default();
        index.insert(Namespace::Text, id(1), "ROOM 204", Point::new(1.0, 1.5, 3.0));
        assert!(index.is_duplicate(Namespace::Text, "ROOM 204", Point::new(1.05, 1.5, 3.05)));
    }

    #[test]
    fn far_apart_copies_are_both_kept() {
        let mut index = DedupIndex::default();
        index.insert(Namespace::Text, id(1), "EXIT", Point::new(0.0, 2.0, 0.0));
        assert!(!index.is_duplicate(Namespace::Text, "EXIT", Point::new(0.0, 2.0, 0.135)));
        assert!(!index.is_duplicate(Namespace::Text, "EXIT", Point::new(5.0, 2.0, 0.0)));
    }

    #[test]
    fn dissimilar_text_at_same_place_is_kept() {
        let mut index = DedupIndex::default();
        let p = Point::new(0.0, 2.0, 0.0);
        index.insert(Namespace::Text, id(1), "EMERGENCY EXIT", p);
        let other = "STAFF ONLY AREA";
        assert!(edit_distance("EMERGENCY EXIT", other) >= DEFAULT_TOLERANCE);
        assert!(!index.is_duplicate(Namespace::Text, other, p));
    }

    #[test]
    fn namespaces_are_independent() {
        let mut index = DedupIndex::default();
        let p = Point::new(0.0, 1.0, 2.0);
        index.insert(Namespace::Beacon, id(1), "Wall", p);
        index.insert(Namespace::Text, id(2), "Wall", p);

        assert!(index.is_duplicate(Namespace::Beacon, "Wall", p));
        index.purge(Namespace::Beacon);
        assert!(!index.is_duplicate(Namespace::Beacon, "Wall", p));
        assert!(index.is_duplicate(Namespace::Text, "Wall", p));
        assert_eq!(index.len(Namespace::Beacon), 0);
        assert_eq!(index.len(Namespace::Text), 1);
    }

    #[test]
    fn removing_an_owner_frees_its_spot() {
        let mut index = DedupIndex::default();
        let p = Point::new(0.0, 1.0, 2.0);
        index.insert(Namespace::Beacon, id(4), "Obstacle", p);
        index.remove(id(4));
        assert!(!index.is_duplicate(Namespace::Beacon, "Obstacle", p));
        assert!(index.is_empty());
    }

    #[test]
    fn retuning_keeps_existing_entries_findable() {
        let mut index = DedupIndex::default();
        let p = Point::new(0.0, 1.0, 2.0);
        index.insert(Namespace::Text, id(1), "LIBRARY", p);
        index.set_tolerance(3);
        assert_eq!(index.tolerance(), 3);
        assert!(index.is_duplicate(Namespace::Text, "LIBRARY", p));
        assert!(!index.is_duplicate(Namespace::Text, "LIBRARIAN", p));
        index.set_tolerance(0);
        assert_eq!(index.tolerance(), 1);
    }
}
