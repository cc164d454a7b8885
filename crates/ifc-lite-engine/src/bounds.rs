// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bounding volumes used for model positioning and camera framing

use nalgebra::{Point3, Vector3};

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self { min, max }
    }

    /// Inverted box that any point expands
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Box enclosing all points (empty if there are none)
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.expand(p);
        }
        bbox
    }

    /// A box is empty when max < min on any axis
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    pub fn expand(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        BoundingBox {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> BoundingBox {
        BoundingBox {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    pub fn diagonal(&self) -> f64 {
        self.size().norm()
    }

    /// Smallest sphere centered on the box that encloses it
    pub fn bounding_sphere(&self) -> Sphere {
        if self.is_empty() {
            return Sphere::new(Point3::origin(), -1.0);
        }
        Sphere::new(self.center(), self.diagonal() * 0.5)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

/// Bounding sphere used for camera fitting
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Negative radius marks an empty sphere
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    pub fn translated(&self, offset: &Vector3<f64>) -> Sphere {
        Sphere::new(self.center + offset, self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box() {
        let bbox = BoundingBox::empty();
        assert!(bbox.is_empty());
        assert!(bbox.bounding_sphere().is_empty());

        // A single point is a degenerate but non-empty box
        let point = BoundingBox::from_points(&[Point3::new(1.0, 2.0, 3.0)]);
        assert!(!point.is_empty());
        assert_eq!(point.bounding_sphere().radius, 0.0);
    }

    #[test]
    fn test_union_skips_empty() {
        let a = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = BoundingBox::new(Point3::new(-1.0, 2.0, 0.5), Point3::new(0.5, 3.0, 4.0));

        assert_eq!(a.union(&BoundingBox::empty()), a);
        assert_eq!(BoundingBox::empty().union(&b), b);

        let u = a.union(&b);
        assert_eq!(u.min, Point3::new(-1.0, 0.0, 0.0));
        assert_eq!(u.max, Point3::new(1.0, 3.0, 4.0));
    }

    #[test]
    fn test_bounding_sphere() {
        let bbox = BoundingBox::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 2.0, 1.0));
        let sphere = bbox.bounding_sphere();
        assert_eq!(sphere.center, Point3::new(1.0, 1.0, 0.5));
        assert!((sphere.radius - 1.5).abs() < 1e-12);

        let moved = sphere.translated(&Vector3::new(0.0, 3.0, 0.0));
        assert_eq!(moved.center.y, 4.0);
    }
}
