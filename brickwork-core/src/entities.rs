use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

pub type BlockId = u32;
pub type PageID = usize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    #[inline(always)]
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn try_new(x0: f64, y0: f64, x1: f64, y1: f64) -> Result<Self, GeometryError> {
        let bbox = Self::new(x0, y0, x1, y1);
        if bbox.is_valid() {
            Ok(bbox)
        } else {
            Err(GeometryError::Inverted { x0, y0, x1, y1 })
        }
    }

    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.x0.is_finite()
            && self.y0.is_finite()
            && self.x1.is_finite()
            && self.y1.is_finite()
            && self.x0 <= self.x1
            && self.y0 <= self.y1
    }

    #[inline(always)]
    pub fn center(&self) -> (f64, f64) {
        (self.x0 + self.width() / 2f64, self.y0 + self.height() / 2f64)
    }

    #[inline(always)]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
    #[inline(always)]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }
    #[inline(always)]
    pub fn area(&self) -> f64 {
        self.height() * self.width()
    }

    #[inline(always)]
    pub fn size(&self) -> (f64, f64) {
        (self.width(), self.height())
    }
    #[inline(always)]
    pub(crate) fn merge(&mut self, other: &Self) {
        self.x0 = self.x0.min(other.x0);
        self.y0 = self.y0.min(other.y0);
        self.x1 = self.x1.max(other.x1);
        self.y1 = self.y1.max(other.y1);
    }
    #[inline(always)]
    fn overlap_x(&self, other: &Self) -> f64 {
        f64::max(
            0f64,
            f64::min(self.x1, other.x1) - f64::max(self.x0, other.x0),
        )
    }
    #[inline(always)]
    fn overlap_y(&self, other: &Self) -> f64 {
        f64::max(
            0f64,
            f64::min(self.y1, other.y1) - f64::max(self.y0, other.y0),
        )
    }

    /// Open-interval intersection test: boxes that only touch do not overlap.
    #[inline(always)]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    #[inline(always)]
    pub fn contains(&self, other: &Self) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let bbox = Self::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (bbox.x0 <= bbox.x1 && bbox.y0 <= bbox.y1).then_some(bbox)
    }

    #[inline(always)]
    pub fn iou(&self, other: &Self) -> f64 {
        let union = self.union_area(other);
        if union <= 0f64 {
            0f64
        } else {
            self.intersection(other) / union
        }
    }

    #[inline(always)]
    pub fn intersection(&self, other: &Self) -> f64 {
        self.overlap_x(other) * self.overlap_y(other)
    }

    #[inline(always)]
    fn union_area(&self, other: &Self) -> f64 {
        other.area() + self.area() - self.intersection(other)
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut bbox = *self;
        bbox.merge(other);
        bbox
    }

    pub fn union_all<'a, I>(boxes: I) -> Result<Self, GeometryError>
    where
        I: IntoIterator<Item = &'a BBox>,
    {
        let mut boxes = boxes.into_iter();
        let first = boxes.next().ok_or(GeometryError::EmptyUnion)?;
        Ok(boxes.fold(*first, |acc, b| acc.union(b)))
    }

    /// Grows the box by `margin` on every side. Negative margins shrink it and fail once
    /// the box would turn inside out.
    pub fn expand(&self, margin: f64) -> Result<Self, GeometryError> {
        Self::try_new(
            self.x0 - margin,
            self.y0 - margin,
            self.x1 + margin,
            self.y1 + margin,
        )
    }

    /// Clamps every edge into `bounds`. A box fully outside collapses to a zero-area box on
    /// the nearest edge or corner of `bounds`.
    pub fn clip_to(&self, bounds: &Self) -> Self {
        let clamp_x = |v: f64| v.clamp(bounds.x0, bounds.x1);
        let clamp_y = |v: f64| v.clamp(bounds.y0, bounds.y1);
        let (x0, x1) = (clamp_x(self.x0), clamp_x(self.x1));
        let (y0, y1) = (clamp_y(self.y0), clamp_y(self.y1));
        Self::new(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    pub fn similar(&self, other: &Self, tolerance: f64) -> bool {
        (self.x0 - other.x0).abs() <= tolerance
            && (self.y0 - other.y0).abs() <= tolerance
            && (self.x1 - other.x1).abs() <= tolerance
            && (self.y1 - other.y1).abs() <= tolerance
    }

    /// Edge-to-edge gap between the boxes, 0 when they overlap or touch.
    pub fn min_distance(&self, other: &Self) -> f64 {
        let dx = f64::max(0f64, f64::max(self.x0 - other.x1, other.x0 - self.x1));
        let dy = f64::max(0f64, f64::max(self.y0 - other.y1, other.y0 - self.y1));
        dx.hypot(dy)
    }

    pub fn scale(&self, factor: f64) -> Result<Self, GeometryError> {
        if !(factor > 0f64) {
            return Err(GeometryError::NonPositiveScale(factor));
        }
        Ok(Self::new(
            self.x0 * factor,
            self.y0 * factor,
            self.x1 * factor,
            self.y1 * factor,
        ))
    }

    #[inline(always)]
    pub fn center_distance(&self, other: &Self) -> f64 {
        let (ax, ay) = self.center();
        let (bx, by) = other.center();
        (ax - bx).hypot(ay - by)
    }

    /// Whether the segment `from -> to` passes through the (closed) box.
    pub fn intersects_segment(&self, from: (f64, f64), to: (f64, f64)) -> bool {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let mut t_enter = 0f64;
        let mut t_exit = 1f64;
        for (p, q) in [
            (-dx, from.0 - self.x0),
            (dx, self.x1 - from.0),
            (-dy, from.1 - self.y0),
            (dy, self.y1 - from.1),
        ] {
            if p == 0f64 {
                if q < 0f64 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0f64 {
                if r > t_exit {
                    return false;
                }
                t_enter = t_enter.max(r);
            } else {
                if r < t_enter {
                    return false;
                }
                t_exit = t_exit.min(r);
            }
        }
        t_enter <= t_exit
    }
}

impl fmt::Display for BBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.1}, {:.1}, {:.1}, {:.1})",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BBox {
        BBox { x0, y0, x1, y1 }
    }

    #[test]
    fn test_overlaps_is_open() {
        let a = bbox(0.0, 0.0, 2.0, 2.0);
        assert!(a.overlaps(&bbox(1.0, 1.0, 3.0, 3.0)));
        // touching edges
        assert!(!a.overlaps(&bbox(2.0, 0.0, 4.0, 2.0)));
        assert!(a.intersect(&bbox(2.0, 0.0, 4.0, 2.0)).is_some());
        assert!(a.intersect(&bbox(3.0, 0.0, 4.0, 2.0)).is_none());
    }

    #[test]
    fn test_union() {
        let bbox1 = bbox(0.0, 0.0, 2.0, 2.0);
        let bbox2 = bbox(1.0, 1.0, 3.0, 3.0);
        let bbox4 = bbox(3.0, 3.0, 5.0, 5.0);

        assert_eq!(bbox1.union_area(&bbox4), 8.0);
        assert_eq!(bbox1.union_area(&bbox2), 7.0);
        assert_eq!(bbox1.union(&bbox4), bbox(0.0, 0.0, 5.0, 5.0));

        for (a, b) in [(bbox1, bbox2), (bbox2, bbox4), (bbox4, bbox1)] {
            let u = a.union(&b);
            assert!(u.contains(&a));
            assert!(u.contains(&b));
        }

        assert_eq!(
            BBox::union_all(&[bbox1, bbox2, bbox4]),
            Ok(bbox(0.0, 0.0, 5.0, 5.0))
        );
        assert_eq!(
            BBox::union_all(&Vec::<BBox>::new()),
            Err(GeometryError::EmptyUnion)
        );
    }

    #[test]
    fn test_iou() {
        let bbox1 = bbox(0.0, 0.0, 2.0, 2.0);
        let bbox2 = bbox(1.0, 1.0, 3.0, 3.0);
        let bbox3 = bbox(2.0, 2.0, 4.0, 4.0);
        let bbox6 = bbox(0.5, 0.5, 1.5, 1.5);

        assert_eq!(bbox1.iou(&bbox1), 1.0);
        assert_eq!(bbox1.iou(&bbox3), 0.0);
        assert_eq!(bbox1.iou(&bbox2), 1.0 / 7.0);
        assert_eq!(bbox1.iou(&bbox6), bbox6.area() / bbox1.area());

        for (a, b) in [(bbox1, bbox2), (bbox2, bbox3), (bbox6, bbox1)] {
            assert_eq!(a.iou(&b), b.iou(&a));
            assert!((0.0..=1.0).contains(&a.iou(&b)));
        }

        let point = bbox(1.0, 1.0, 1.0, 1.0);
        assert_eq!(point.iou(&point), 0.0);
    }

    #[test]
    fn test_gap_and_center_distances() {
        let bbox1 = bbox(0.0, 0.0, 2.0, 2.0);
        let bbox2 = bbox(3.0, 3.0, 5.0, 5.0);
        let bbox3 = bbox(0.0, 2.0, 2.0, 4.0);

        assert_eq!(bbox1.center_distance(&bbox3), 2.0);
        assert_eq!(bbox1.center_distance(&bbox1), 0.0);
        assert_eq!(bbox1.center_distance(&bbox2), 18f64.sqrt());

        assert_eq!(bbox1.min_distance(&bbox3), 0.0);
        assert_eq!(bbox1.min_distance(&bbox(5.0, 0.0, 6.0, 1.0)), 3.0);
        assert_eq!(bbox1.min_distance(&bbox2), 2f64.sqrt());
    }

    #[test]
    fn test_clip_to() {
        let page = bbox(0.0, 0.0, 100.0, 100.0);
        assert_eq!(
            bbox(-10.0, 50.0, 20.0, 120.0).clip_to(&page),
            bbox(0.0, 50.0, 20.0, 100.0)
        );
        // fully outside: degenerate box at the nearest corner
        let clipped = bbox(150.0, 150.0, 200.0, 220.0).clip_to(&page);
        assert_eq!(clipped, bbox(100.0, 100.0, 100.0, 100.0));
        assert!(clipped.is_valid());
        assert_eq!(clipped.area(), 0.0);
    }

    #[test]
    fn test_expand_and_scale() {
        let b = bbox(10.0, 10.0, 20.0, 14.0);
        assert_eq!(b.expand(2.0), Ok(bbox(8.0, 8.0, 22.0, 16.0)));
        assert_eq!(b.expand(-2.0), Ok(bbox(12.0, 12.0, 18.0, 12.0)));
        assert!(b.expand(-3.0).is_err());

        assert_eq!(b.scale(2.0), Ok(bbox(20.0, 20.0, 40.0, 28.0)));
        assert_eq!(b.scale(0.0), Err(GeometryError::NonPositiveScale(0.0)));
        assert!(b.scale(-1.0).is_err());
    }

    #[test]
    fn test_similar() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(0.5, -0.5, 10.5, 9.5);
        assert!(a.similar(&b, 0.5));
        assert!(b.similar(&a, 0.5));
        assert!(!a.similar(&b, 0.4));
    }

    #[test]
    fn test_segment_intersection() {
        let divider = bbox(50.0, 0.0, 51.0, 100.0);
        assert!(divider.intersects_segment((10.0, 50.0), (90.0, 50.0)));
        assert!(!divider.intersects_segment((10.0, 50.0), (40.0, 80.0)));
        // zero-width line
        let line = bbox(0.0, 40.0, 100.0, 40.0);
        assert!(line.intersects_segment((20.0, 10.0), (20.0, 90.0)));
        assert!(!line.intersects_segment((20.0, 10.0), (20.0, 30.0)));
    }
}
