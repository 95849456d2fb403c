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
use nalgebra::Point3;

#[derive(Clone, Copy, Debug)]
pub struct Sphere {
    center: Point3<f64>,
    radius: f64,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            center: Point3::origin(),
            radius: 1_f64,
        }
    }
}

impl Sphere {
    pub fn from_center_and_radius(center: &Point3<f64>, radius: f64) -> Self {
        Self {
            center: *center,
            radius,
        }
    }

    /// A sphere around the origin, e.g. a planet or atmosphere shell
    /// in a planet-centered frame.
    pub fn from_radius(radius: f64) -> Self {
        Self::from_center_and_radius(&Point3::origin(), radius)
    }

    pub fn center(&self) -> &Point3<f64> {
        &self.center
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }
}
