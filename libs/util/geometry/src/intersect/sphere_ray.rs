// This file is part of Nitrogen.
//
// Nitrogen is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Nitrogen is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Nitrogen.  If not, see <http://www.gnu.org/licenses/>.
use crate::{Ray, Sphere};
use nalgebra::{Point3, Vector3};

/// Parametric distances along a ray at which it crosses a sphere. Both
/// crossings are reported, even when one or both lie behind the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereRayHit {
    near: f64,
    far: f64,
}

impl SphereRayHit {
    pub fn near(&self) -> f64 {
        self.near
    }

    pub fn far(&self) -> f64 {
        self.far
    }

    /// The first crossing in front of the ray origin, if any.
    pub fn first_ahead(&self) -> Option<f64> {
        if self.near >= 0. {
            Some(self.near)
        } else if self.far >= 0. {
            Some(self.far)
        } else {
            None
        }
    }

    pub fn first_point_ahead(&self, ray: &Ray) -> Option<Point3<f64>> {
        self.first_ahead().map(|t| ray.point_at(t))
    }
}

pub fn sphere_vs_ray(sphere: &Sphere, ray: &Ray) -> Option<SphereRayHit> {
    let ray2sphere: Vector3<f64> = ray.origin() - sphere.center();
    let a = ray.direction().dot(ray.direction());
    let b = 2. * ray.direction().dot(&ray2sphere);
    let c = ray2sphere.dot(&ray2sphere) - sphere.radius() * sphere.radius();
    if a == 0. {
        return None;
    }

    let discriminant = b * b - 4. * a * c;
    if discriminant < 0. {
        return None;
    }
    let (x0, x1) = if discriminant == 0. {
        let x = -0.5 * b / a;
        (x, x)
    } else {
        // Avoid cancellation by never subtracting nearly equal terms.
        let q = if b > 0. {
            -0.5 * (b + discriminant.sqrt())
        } else {
            -0.5 * (b - discriminant.sqrt())
        };
        if q == 0. {
            // Only reachable with b == 0 and c == 0: a grazing origin on the surface.
            (0., 0.)
        } else {
            (q / a, c / q)
        }
    };
    Some(SphereRayHit {
        near: x0.min(x1),
        far: x0.max(x1),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_sphere_basic() {
        let sphere = Sphere::from_center_and_radius(&Point3::new(0., 0., 10.), 1.);
        let ray = Ray::new(Point3::origin(), Vector3::z_axis().into_inner());
        let hit = sphere_vs_ray(&sphere, &ray).unwrap();
        assert_relative_eq!(hit.near(), 9.);
        assert_relative_eq!(hit.far(), 11.);
        let pt = hit.first_point_ahead(&ray).unwrap();
        assert_relative_eq!(pt.x, 0.);
        assert_relative_eq!(pt.y, 0.);
        assert_relative_eq!(pt.z, 9.);
    }

    #[test]
    fn test_ray_inside_sphere() {
        let sphere = Sphere::from_radius(10.);
        let ray = Ray::new(Point3::new(0., 0., 5.), Vector3::new(0., 0., 1.));
        let hit = sphere_vs_ray(&sphere, &ray).unwrap();
        assert_relative_eq!(hit.near(), -15.);
        assert_relative_eq!(hit.far(), 5.);
        assert_relative_eq!(hit.first_ahead().unwrap(), 5.);
    }

    #[test]
    fn test_ray_misses_sphere() {
        let sphere = Sphere::from_radius(1.);
        let ray = Ray::new(Point3::new(0., 2., 0.), Vector3::new(1., 0., 0.));
        assert!(sphere_vs_ray(&sphere, &ray).is_none());
    }

    #[test]
    fn test_sphere_behind_ray() {
        let sphere = Sphere::from_radius(1.);
        let ray = Ray::new(Point3::new(0., 0., 5.), Vector3::new(0., 0., 1.));
        let hit = sphere_vs_ray(&sphere, &ray).unwrap();
        assert!(hit.first_ahead().is_none());
    }
}
