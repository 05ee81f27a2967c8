//! Turns the word-level boxes an OCR service returns into sign-level text
//! regions, and pins each region to a point in the room.
//!
//! Merging follows the order the OCR service reported the boxes in, not a
//! spatial sort: OCR engines already emit words in reading order, and a new
//! region starts whenever the next word is too far from the previous one.

use crate::geometry::{Meters, Point, Radian};
use crate::probe::SpatialProbe;
use serde::{Deserialize, Serialize};

/// Pixel gap below which two boxes belong to the same region.
pub const COMBINE_THRESHOLD: f64 = 31.0;

/// How far a projected ray may travel before we give up on the region.
pub const PROJECTION_RANGE: Meters = 15.0;

const ICON_SCALE: f64 = 0.9;
const MIN_ICON_RADIUS: f64 = 0.12;
const MAX_ICON_RADIUS: f64 = 0.25;

/// A point in image space: pixels, origin top-left, `y` growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    #[allow(missing_docs)]
    pub const fn new(x: f64, y: f64) -> Self {
        ImagePoint { x, y }
    }
}

/// A bounding quadrilateral, corners in the order OCR services report them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct Quad {
    pub top_left: ImagePoint,
    pub top_right: ImagePoint,
    pub bottom_right: ImagePoint,
    pub bottom_left: ImagePoint,
}

impl Quad {
    /// Axis-aligned box from its top-left corner and size.
    pub fn from_rect(left: f64, top: f64, width: f64, height: f64) -> Self {
        Quad {
            top_left: ImagePoint::new(left, top),
            top_right: ImagePoint::new(left + width, top),
            bottom_right: ImagePoint::new(left + width, top + height),
            bottom_left: ImagePoint::new(left, top + height),
        }
    }

    /// Taller than it is wide: rotated text we cannot place sensibly.
    pub fn is_vertical(&self) -> bool {
        (self.bottom_left.y - self.top_left.y) > (self.top_right.x - self.top_left.x)
    }

    /// Smallest of the horizontal and vertical separations between `prev`
    /// and `self`, in pixels.
    pub fn gap_after(&self, prev: &Quad) -> f64 {
        let min_width = self.top_left.x.min(self.bottom_left.x)
            - prev.top_right.x.max(prev.bottom_right.x);
        let min_height = self.top_left.y.min(self.top_right.y)
            - prev.bottom_left.y.max(prev.bottom_right.y);
        min_width.abs().min(min_height.abs())
    }

    /// Corner-wise union: each corner moves outward to cover `other`.
    pub fn union(&self, other: &Quad) -> Quad {
        Quad {
            top_left: ImagePoint::new(
                self.top_left.x.min(other.top_left.x),
                self.top_left.y.min(other.top_left.y),
            ),
            top_right: ImagePoint::new(
                self.top_right.x.max(other.top_right.x),
                self.top_right.y.min(other.top_right.y),
            ),
            bottom_right: ImagePoint::new(
                self.bottom_right.x.max(other.bottom_right.x),
                self.bottom_right.y.max(other.bottom_right.y),
            ),
            bottom_left: ImagePoint::new(
                self.bottom_left.x.min(other.bottom_left.x),
                self.bottom_left.y.max(other.bottom_left.y),
            ),
        }
    }

    #[allow(missing_docs)]
    pub fn center(&self) -> ImagePoint {
        ImagePoint::new(
            (self.top_left.x + self.top_right.x + self.bottom_right.x + self.bottom_left.x) / 4.0,
            (self.top_left.y + self.top_right.y + self.bottom_right.y + self.bottom_left.y) / 4.0,
        )
    }
}

/// One word (or line) as reported by the OCR service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTextSample {
    #[allow(missing_docs)]
    pub quad: Quad,
    #[allow(missing_docs)]
    pub text: String,
}

impl RawTextSample {
    #[allow(missing_docs)]
    pub fn new(quad: Quad, text: impl Into<String>) -> Self {
        RawTextSample {
            quad,
            text: text.into(),
        }
    }

    /// Compound results (several lines in one box) and rotated text are
    /// skipped without complaint.
    pub fn is_malformed(&self) -> bool {
        self.text.contains(|c| c == '\n' || c == '\r') || self.quad.is_vertical()
    }
}

/// A run of adjacent samples merged into one logical region.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRegion {
    /// Sample texts joined with single spaces
    pub text: String,
    /// Union of the samples' boxes
    pub bounds: Quad,
}

impl MergedRegion {
    fn open(sample: &RawTextSample) -> Self {
        MergedRegion {
            text: sample.text.clone(),
            bounds: sample.quad,
        }
    }

    fn absorb(&mut self, sample: &RawTextSample) {
        if self.text.is_empty() {
            self.text = sample.text.clone();
        } else {
            self.text.push(' ');
            self.text.push_str(&sample.text);
        }
        self.bounds = self.bounds.union(&sample.quad);
    }
}

/// Merges an ordered batch of OCR samples with the given pixel threshold.
///
/// A region that is closed because the next sample is too far away is only
/// kept when its text has more than one character; the region still open
/// at the end of the batch is always kept.
pub fn merge_regions(samples: &[RawTextSample], combine_threshold: f64) -> Vec<MergedRegion> {
    let mut regions = Vec::new();
    let mut open: Option<MergedRegion> = None;
    let mut prev: Option<Quad> = None;

    for sample in samples.iter().filter(|s| !s.is_malformed()) {
        let adjacent = prev
            .map(|p| sample.quad.gap_after(&p) < combine_threshold)
            .unwrap_or(true);

        match open.as_mut() {
            Some(region) if adjacent => region.absorb(sample),
            _ => {
                if let Some(done) = open.take() {
                    if done.text.chars().count() > 1 {
                        regions.push(done);
                    }
                }
                open = Some(MergedRegion::open(sample));
            }
        }
        prev = Some(sample.quad);
    }

    regions.extend(open);
    regions
}

/// The camera pose and intrinsics valid when a frame was captured; enough
/// to turn a pixel back into a ray through the room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraFrame {
    #[allow(missing_docs)]
    pub position: Point,
    /// Optical axis
    pub forward: Point,
    /// Approximate up; re-orthogonalized against `forward`
    pub up: Point,
    /// Horizontal field of view
    pub horizontal_fov: Radian,
    /// Image width in pixels
    pub width: f64,
    /// Image height in pixels
    pub height: f64,
}

impl CameraFrame {
    /// A 1280x720 camera with a 64° horizontal field of view, the
    /// resolution low-resolution captures use.
    pub fn looking(position: Point, forward: Point) -> Self {
        CameraFrame {
            position,
            forward,
            up: Point::UP,
            horizontal_fov: 64f64.to_radians(),
            width: 1280.0,
            height: 720.0,
        }
    }

    /// World-space direction of the ray through an image point.
    pub fn ray_through(&self, pixel: ImagePoint) -> Point {
        let forward = self.forward.normalized();
        let right = self.up.cross(&forward).normalized();
        let up = forward.cross(&right);

        let tan_h = (self.horizontal_fov / 2.0).tan();
        let tan_v = tan_h * self.height / self.width;
        let ndc_x = pixel.x / self.width * 2.0 - 1.0;
        let ndc_y = 1.0 - pixel.y / self.height * 2.0;

        (forward + right * (ndc_x * tan_h) + up * (ndc_y * tan_v)).normalized()
    }

    /// Where a world point lands in the image, or `None` when it is behind
    /// the camera. Points outside the frame map to pixels outside
    /// `[0, width] x [0, height]`.
    pub fn project(&self, world: Point) -> Option<ImagePoint> {
        let forward = self.forward.normalized();
        let right = self.up.cross(&forward).normalized();
        let up = forward.cross(&right);

        let local = world - self.position;
        let depth = local.dot(&forward);
        if depth <= f64::EPSILON {
            return None;
        }
        let tan_h = (self.horizontal_fov / 2.0).tan();
        let tan_v = tan_h * self.height / self.width;
        let ndc_x = local.dot(&right) / (depth * tan_h);
        let ndc_y = local.dot(&up) / (depth * tan_v);

        Some(ImagePoint::new(
            (ndc_x + 1.0) / 2.0 * self.width,
            (1.0 - ndc_y) / 2.0 * self.height,
        ))
    }

    /// True when the pixel lies inside the frame.
    pub fn contains(&self, pixel: ImagePoint) -> bool {
        (0.0..=self.width).contains(&pixel.x) && (0.0..=self.height).contains(&pixel.y)
    }
}

/// Where a merged region lands in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAnchor {
    #[allow(missing_docs)]
    pub text: String,
    #[allow(missing_docs)]
    pub point: Point,
    /// Outward normal of the surface the text sits on
    pub normal: Point,
    /// Icon radius derived from the region's apparent size
    pub radius: f64,
}

/// Projects a merged region into the room by probing along the ray through
/// its centre. Returns `None` when the ray hits nothing.
pub fn project_region<P>(probe: &P, camera: &CameraFrame, region: &MergedRegion) -> Option<RegionAnchor>
where
    P: SpatialProbe + ?Sized,
{
    let center = probe.probe(
        camera.position,
        camera.ray_through(region.bounds.center()),
        0.0,
        PROJECTION_RANGE,
    )?;

    let width = corner_span(probe, camera, region.bounds.top_left, region.bounds.top_right);
    let height = corner_span(probe, camera, region.bounds.top_left, region.bounds.bottom_left);
    let radius = (width.max(height) * ICON_SCALE).clamp(MIN_ICON_RADIUS, MAX_ICON_RADIUS);

    Some(RegionAnchor {
        text: region.text.clone(),
        point: center.point,
        normal: center.normal,
        radius,
    })
}

/// Twice the world distance between the hits of two corner rays, or -1 when
/// either ray misses.
fn corner_span<P>(probe: &P, camera: &CameraFrame, a: ImagePoint, b: ImagePoint) -> f64
where
    P: SpatialProbe + ?Sized,
{
    let hit_a = probe.probe(camera.position, camera.ray_through(a), 0.0, PROJECTION_RANGE);
    let hit_b = probe.probe(camera.position, camera.ray_through(b), 0.0, PROJECTION_RANGE);
    match (hit_a, hit_b) {
        (Some(a), Some(b)) => a.point.abs_dist(&b.point) * 2.0,
        _ => -1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeHit, SurfaceTag};

    fn word(left: f64, top: f64, text: &str) -> RawTextSample {
        RawTextSample::new(Quad::from_rect(left, top, 20.0, 10.0), text)
    }

    #[test]
    fn close_words_merge_and_far_words_split() {
        // A→B: 10 px apart; B→C: 50 px right and 50 px down.
        let samples = vec![word(0.0, 0.0, "A"), word(30.0, 0.0, "B"), word(100.0, 60.0, "C")];
        assert_eq!(samples[1].quad.gap_after(&samples[0].quad), 10.0);
        assert_eq!(samples[2].quad.gap_after(&samples[1].quad), 50.0);

        let regions = merge_regions(&samples, COMBINE_THRESHOLD);

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].text, "A B");
        assert_eq!(regions[0].bounds.top_left, ImagePoint::new(0.0, 0.0));
        assert_eq!(regions[0].bounds.bottom_right, ImagePoint::new(50.0, 10.0));
        assert_eq!(regions[1].text, "C");
        assert_eq!(regions[1].bounds, samples[2].quad);
    }

    #[test]
    fn single_character_regions_are_dropped_unless_last() {
        let samples = vec![word(0.0, 0.0, "X"), word(200.0, 200.0, "Y")];
        let regions = merge_regions(&samples, COMBINE_THRESHOLD);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "Y");
    }

    #[test]
    fn line_breaks_and_vertical_text_are_skipped() {
        let tall = RawTextSample::new(Quad::from_rect(25.0, 0.0, 5.0, 40.0), "TALL");
        let samples = vec![
            word(0.0, 0.0, "EXIT\nONLY"),
            word(0.0, 0.0, "EXIT"),
            tall,
            word(30.0, 0.0, "ONLY"),
        ];
        let regions = merge_regions(&samples, COMBINE_THRESHOLD);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].text, "EXIT ONLY");
    }

    #[test]
    fn nothing_in_nothing_out() {
        assert!(merge_regions(&[], COMBINE_THRESHOLD).is_empty());
        assert!(merge_regions(&[word(0.0, 0.0, "a\nb")], COMBINE_THRESHOLD).is_empty());
    }

    #[test]
    fn center_pixel_maps_to_optical_axis() {
        let cam = CameraFrame::looking(Point::ZERO, Point::new(0.0, 0.0, 1.0));
        let ray = cam.ray_through(ImagePoint::new(640.0, 360.0));
        assert!((ray - Point::new(0.0, 0.0, 1.0)).length() < 1e-12);

        let right_edge = cam.ray_through(ImagePoint::new(1280.0, 360.0));
        assert!(right_edge.x > 0.0);
        let top_edge = cam.ray_through(ImagePoint::new(640.0, 0.0));
        assert!(top_edge.y > 0.0);
    }

    #[test]
    fn projection_inverts_ray_through() {
        let cam = CameraFrame::looking(Point::new(0.5, 1.6, -2.0), Point::new(0.2, -0.1, 1.0));
        let pixel = ImagePoint::new(300.0, 500.0);
        let world = cam.position + cam.ray_through(pixel) * 4.0;
        let back = cam.project(world).unwrap();
        assert!((back.x - pixel.x).abs() < 1e-6);
        assert!((back.y - pixel.y).abs() < 1e-6);
        assert!(cam.contains(back));
        assert!(cam.project(cam.position - cam.forward).is_none());
    }

    /// A flat wall at z = 2.
    struct FlatWall;

    impl SpatialProbe for FlatWall {
        fn probe(&self, origin: Point, direction: Point, _: f64, range: f64) -> Option<ProbeHit> {
            let d = direction.normalized();
            if d.z <= 0.0 {
                return None;
            }
            let t = (2.0 - origin.z) / d.z;
            (t <= range).then(|| ProbeHit {
                point: origin + d * t,
                normal: Point::new(0.0, 0.0, -1.0),
                tag: SurfaceTag::Wall,
                annotation: None,
            })
        }

        fn cone_probe_all(&self, _: Point, _: Point, _: f64, _: f64, _: f64) -> Vec<ProbeHit> {
            Vec::new()
        }
    }

    #[test]
    fn regions_project_onto_the_wall_with_clamped_radius() {
        let cam = CameraFrame::looking(Point::ZERO, Point::new(0.0, 0.0, 1.0));
        let tiny = MergedRegion {
            text: "EXIT".to_owned(),
            bounds: Quad::from_rect(630.0, 355.0, 20.0, 10.0),
        };
        let anchor = project_region(&FlatWall, &cam, &tiny).unwrap();
        assert!((anchor.point.z - 2.0).abs() < 1e-9);
        assert_eq!(anchor.normal, Point::new(0.0, 0.0, -1.0));
        assert_eq!(anchor.radius, 0.12);

        let huge = MergedRegion {
            text: "BIG".to_owned(),
            bounds: Quad::from_rect(0.0, 0.0, 1280.0, 360.0),
        };
        assert_eq!(project_region(&FlatWall, &cam, &huge).unwrap().radius, 0.25);

        let behind = CameraFrame::looking(Point::ZERO, Point::new(0.0, 0.0, -1.0));
        assert!(project_region(&FlatWall, &behind, &tiny).is_none());
    }
}
