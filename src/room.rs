//! A [`SpatialProbe`] over a made-up room, for the binaries and the tests.
//!
//! The room is an axis-aligned box: floor at `y = 0`, ceiling at
//! `y = height`, walls at `x = ±width / 2` and `z = ±depth / 2`. Inside it sit
//! box-shaped obstacles, signs on the walls, and a spherical collider for
//! every live beacon the engine has told us about.

use crate::annotation::{AnnotationKind, BEACON_SCALE};
use crate::geometry::{Meters, Point, Radian};
use crate::probe::{ProbeHit, SpatialProbe, SurfaceTag};
use crate::registry::Marker;
use serde::{Deserialize, Serialize};

/// A solid box standing in the room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    #[allow(missing_docs)]
    pub min: Point,
    #[allow(missing_docs)]
    pub max: Point,
}

impl Obstacle {
    /// A box resting on the floor, centred on `(x, z)`.
    pub fn standing(x: f64, z: f64, width: Meters, height: Meters, depth: Meters) -> Self {
        Obstacle {
            min: Point::new(x - width / 2.0, 0.0, z - depth / 2.0),
            max: Point::new(x + width / 2.0, height, z + depth / 2.0),
        }
    }
}

/// Flat text mounted on a wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sign {
    #[allow(missing_docs)]
    pub text: String,
    #[allow(missing_docs)]
    pub center: Point,
    /// Points into the room, toward whoever can read the sign
    pub normal: Point,
    #[allow(missing_docs)]
    pub width: Meters,
    #[allow(missing_docs)]
    pub height: Meters,
}

/// The room itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRoom {
    width: Meters,
    depth: Meters,
    height: Meters,
    obstacles: Vec<Obstacle>,
    signs: Vec<Sign>,
    markers: Vec<Marker>,
}

/// Builds a [`SyntheticRoom`].
#[derive(Debug, Clone)]
pub struct SyntheticRoomBuilder {
    width: Meters,
    depth: Meters,
    height: Meters,
    obstacles: Vec<Obstacle>,
    signs: Vec<Sign>,
}

impl Default for SyntheticRoomBuilder {
    fn default() -> Self {
        SyntheticRoomBuilder {
            width: 8.0,
            depth: 12.0,
            height: 3.0,
            obstacles: Vec::new(),
            signs: Vec::new(),
        }
    }
}

impl SyntheticRoomBuilder {
    /// Sets the floor plan and ceiling height.
    pub fn size(mut self, width: Meters, depth: Meters, height: Meters) -> Self {
        self.width = width;
        self.depth = depth;
        self.height = height;
        self
    }

    #[allow(missing_docs)]
    pub fn obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    /// Mounts a sign on the far wall (`z = +depth / 2`), centred on `x` at
    /// height `y`.
    pub fn sign_on_far_wall(mut self, text: &str, x: f64, y: f64, width: Meters) -> Self {
        self.signs.push(Sign {
            text: text.to_owned(),
            center: Point::new(x, y, self.depth / 2.0),
            normal: Point::new(0.0, 0.0, -1.0),
            width,
            height: width / text.chars().count().max(1) as f64 * 1.4,
        });
        self
    }

    #[allow(missing_docs)]
    pub fn build(self) -> SyntheticRoom {
        SyntheticRoom {
            width: self.width,
            depth: self.depth,
            height: self.height,
            obstacles: self.obstacles,
            signs: self.signs,
            markers: Vec::new(),
        }
    }
}

/// Candidate hit along the ray: distance, surface normal, tag, owner.
type Candidate = (f64, Point, SurfaceTag, Option<Marker>);

impl SyntheticRoom {
    #[allow(missing_docs)]
    pub fn builder() -> SyntheticRoomBuilder {
        SyntheticRoomBuilder::default()
    }

    /// An 8 m by 12 m room with a few obstacles and two signs on the far
    /// wall; what the binaries walk through.
    pub fn demo() -> Self {
        Self::builder()
            .obstacle(Obstacle::standing(-1.5, 2.0, 0.8, 0.9, 0.8))
            .obstacle(Obstacle::standing(1.8, -1.0, 1.2, 0.75, 0.6))
            .obstacle(Obstacle::standing(0.5, 4.0, 0.4, 1.8, 0.4))
            .sign_on_far_wall("EMERGENCY EXIT", -2.0, 2.1, 1.4)
            .sign_on_far_wall("ROOM 204", 2.0, 1.6, 0.8)
            .build()
    }

    #[allow(missing_docs)]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    #[allow(missing_docs)]
    pub fn signs(&self) -> &[Sign] {
        &self.signs
    }

    /// Beacon colliders currently in the room.
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Half-extents of the floor plan, `(x, z)`.
    pub fn half_extents(&self) -> (Meters, Meters) {
        (self.width / 2.0, self.depth / 2.0)
    }

    /// Nearest contact of a sphere of `radius` swept from `origin` along
    /// the unit vector `dir` with the room shell.
    fn shell(&self, origin: Point, dir: Point, radius: Meters) -> Option<Candidate> {
        let (hx, hz) = self.half_extents();
        let planes = [
            (dir.y < 0.0, (radius - origin.y) / dir.y, Point::UP, SurfaceTag::Floor),
            (
                dir.y > 0.0,
                (self.height - radius - origin.y) / dir.y,
                Point::new(0.0, -1.0, 0.0),
                SurfaceTag::Ceiling,
            ),
            (dir.x > 0.0, (hx - radius - origin.x) / dir.x, Point::new(-1.0, 0.0, 0.0), SurfaceTag::Wall),
            (dir.x < 0.0, (-hx + radius - origin.x) / dir.x, Point::new(1.0, 0.0, 0.0), SurfaceTag::Wall),
            (dir.z > 0.0, (hz - radius - origin.z) / dir.z, Point::new(0.0, 0.0, -1.0), SurfaceTag::Wall),
            (dir.z < 0.0, (-hz + radius - origin.z) / dir.z, Point::new(0.0, 0.0, 1.0), SurfaceTag::Wall),
        ];
        planes
            .into_iter()
            .filter(|(facing, t, _, _)| *facing && *t >= 0.0)
            .map(|(_, t, normal, tag)| (t, normal, tag, None))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn obstacle_hit(obstacle: &Obstacle, origin: Point, dir: Point, radius: Meters) -> Option<Candidate> {
        let min = [obstacle.min.x - radius, obstacle.min.y - radius, obstacle.min.z - radius];
        let max = [obstacle.max.x + radius, obstacle.max.y + radius, obstacle.max.z + radius];
        let o = [origin.x, origin.y, origin.z];
        let d = [dir.x, dir.y, dir.z];

        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;
        let mut axis = 0;
        for i in 0..3 {
            if d[i].abs() < f64::EPSILON {
                if o[i] < min[i] || o[i] > max[i] {
                    return None;
                }
                continue;
            }
            let (mut t0, mut t1) = ((min[i] - o[i]) / d[i], (max[i] - o[i]) / d[i]);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_enter {
                t_enter = t0;
                axis = i;
            }
            t_exit = t_exit.min(t1);
        }
        if t_enter > t_exit || t_enter < 0.0 {
            return None;
        }

        let mut normal = [0.0; 3];
        normal[axis] = -d[axis].signum();
        Some((
            t_enter,
            Point::new(normal[0], normal[1], normal[2]),
            SurfaceTag::Unclassified,
            None,
        ))
    }

    fn marker_hit(marker: &Marker, origin: Point, dir: Point, radius: Meters) -> Option<Candidate> {
        let reach = marker.radius + radius;
        let to_center = marker.position - origin;
        let along = to_center.dot(&dir);
        let perp2 = to_center.dot(&to_center) - along * along;
        if along < 0.0 || perp2 > reach * reach {
            return None;
        }
        let t = along - (reach * reach - perp2).sqrt();
        let normal = (origin + dir * t - marker.position).normalized();
        let tag = match marker.kind {
            AnnotationKind::Wall => SurfaceTag::WallAnnotation,
            _ => SurfaceTag::ObstacleAnnotation,
        };
        Some((t.max(0.0), normal, tag, Some(*marker)))
    }
}

impl SpatialProbe for SyntheticRoom {
    fn probe(&self, origin: Point, direction: Point, radius: Meters, range: Meters) -> Option<ProbeHit> {
        let dir = direction.normalized();
        if dir == Point::ZERO {
            return None;
        }

        let nearest = self
            .obstacles
            .iter()
            .filter_map(|o| Self::obstacle_hit(o, origin, dir, radius))
            .chain(
                self.markers
                    .iter()
                    .filter_map(|m| Self::marker_hit(m, origin, dir, radius)),
            )
            .chain(self.shell(origin, dir, radius))
            .min_by(|a, b| a.0.total_cmp(&b.0))?;

        let (t, normal, tag, marker) = nearest;
        if t > range {
            return None;
        }
        // The sweep stops with the sphere touching the surface; report the
        // contact point, not the sphere's centre.
        let point = match marker {
            Some(m) => m.position + normal * m.radius,
            None => origin + dir * t - normal * radius,
        };
        Some(ProbeHit {
            point,
            normal,
            tag,
            annotation: marker.map(|m| m.id),
        })
    }

    fn cone_probe_all(
        &self,
        origin: Point,
        direction: Point,
        radius: Meters,
        range: Meters,
        angle: Radian,
    ) -> Vec<ProbeHit> {
        let dir = direction.normalized();
        self.markers
            .iter()
            .filter(|m| {
                let to_marker = m.position - origin;
                let along = to_marker.dot(&dir);
                let perp = (to_marker - dir * along).length();
                (0.0..=range).contains(&along)
                    && perp <= radius + m.radius
                    && dir.angle_to(&to_marker) <= angle
            })
            .map(|m| ProbeHit {
                point: m.position,
                normal: (origin - m.position).normalized(),
                tag: match m.kind {
                    AnnotationKind::Wall => SurfaceTag::WallAnnotation,
                    _ => SurfaceTag::ObstacleAnnotation,
                },
                annotation: Some(m.id),
            })
            .collect()
    }

    fn sync_markers(&mut self, markers: &[Marker]) {
        self.markers = markers
            .iter()
            .filter(|m| m.kind.is_beacon())
            .map(|m| Marker {
                radius: m.radius.max(BEACON_SCALE),
                ..*m
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationId;

    fn empty() -> SyntheticRoom {
        SyntheticRoom::builder().size(8.0, 12.0, 3.0).build()
    }

    #[test]
    fn shell_surfaces_are_classified() {
        let room = empty();
        let eye = Point::new(0.0, 1.6, 0.0);

        let floor = room.probe(eye, Point::new(0.0, -1.0, 0.0), 0.1, 10.0).unwrap();
        assert_eq!(floor.tag, SurfaceTag::Floor);
        assert!(floor.point.y.abs() < 1e-9);

        let ceiling = room.probe(eye, Point::UP, 0.1, 10.0).unwrap();
        assert_eq!(ceiling.tag, SurfaceTag::Ceiling);

        let wall = room.probe(eye, Point::new(0.0, 0.0, 1.0), 0.1, 10.0).unwrap();
        assert_eq!(wall.tag, SurfaceTag::Wall);
        assert!((wall.point.z - 6.0).abs() < 1e-9);
        assert_eq!(wall.normal, Point::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn range_limits_hits() {
        let room = empty();
        let eye = Point::new(0.0, 1.6, 0.0);
        assert!(room.probe(eye, Point::new(0.0, 0.0, 1.0), 0.0, 5.0).is_none());
        assert!(room.probe(eye, Point::new(0.0, 0.0, 1.0), 0.0, 6.5).is_some());
    }

    #[test]
    fn obstacles_are_unclassified_and_block_the_wall() {
        let room = SyntheticRoom::builder()
            .obstacle(Obstacle::standing(0.0, 3.0, 1.0, 2.0, 1.0))
            .build();
        let hit = room
            .probe(Point::new(0.0, 1.0, 0.0), Point::new(0.0, 0.0, 1.0), 0.1, 10.0)
            .unwrap();
        assert_eq!(hit.tag, SurfaceTag::Unclassified);
        assert!((hit.point.z - 2.5).abs() < 1e-9);
        assert_eq!(hit.normal, Point::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn synced_markers_are_hit_and_lit() {
        let mut room = empty();
        let beacon = Marker {
            id: AnnotationId(9),
            kind: AnnotationKind::Wall,
            position: Point::new(0.0, 1.6, 3.0),
            radius: 0.1,
        };
        let text = Marker {
            id: AnnotationId(10),
            kind: AnnotationKind::TextRegion,
            position: Point::new(0.0, 1.6, 2.0),
            radius: 0.2,
        };
        room.sync_markers(&[beacon, text]);
        assert_eq!(room.markers().len(), 1);

        let eye = Point::new(0.0, 1.6, 0.0);
        let hit = room.probe(eye, Point::new(0.0, 0.0, 1.0), 0.1, 10.0).unwrap();
        assert_eq!(hit.tag, SurfaceTag::WallAnnotation);
        assert_eq!(hit.annotation, Some(AnnotationId(9)));

        let lit = room.cone_probe_all(eye, Point::new(0.0, 0.0, 1.0), 1.0, 10.0, 30f64.to_radians());
        assert_eq!(lit.len(), 1);
        let dark = room.cone_probe_all(eye, Point::new(1.0, 0.0, 0.0), 1.0, 10.0, 30f64.to_radians());
        assert!(dark.is_empty());
    }
}
