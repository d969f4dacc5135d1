use crate::{Interval, Vec3};

/// Axis-aligned bounding box, used to frame preview geometry.
///
/// Unlike a collision box this one may be degenerate (a single plane or
/// point); callers that need a non-zero extent use [`Aabb::diagonal`] with a
/// fallback.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create an AABB from two corner points, in any order.
    #[cfg(test)]
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            x: Interval::new(a.x.min(b.x), a.x.max(b.x)),
            y: Interval::new(a.y.min(b.y), a.y.max(b.y)),
            z: Interval::new(a.z.min(b.z), a.z.max(b.z)),
        }
    }

    /// Smallest box containing every point, or [`Aabb::EMPTY`].
    pub fn enclosing<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points.into_iter().fold(Self::EMPTY, |aabb, p| aabb.include(p))
    }

    /// Grow the box so it contains `p`.
    pub fn include(&self, p: Vec3) -> Aabb {
        Aabb {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(self.x.center(), self.y.center(), self.z.center())
    }

    /// Length of the min-max diagonal; zero for empty boxes.
    pub fn diagonal(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        Vec3::new(self.x.size(), self.y.size(), self.z.size()).length()
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}
