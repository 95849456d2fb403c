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
use crate::{
    math::{clamp_distance, safe_sqrt},
    parameters::AtmosphereParameters,
};

/// Which boundary a ray starting inside the atmosphere exits through.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RayTarget {
    TopOfAtmosphere,
    Ground,
}

impl RayTarget {
    pub fn from_ground_hit(intersects_ground: bool) -> Self {
        if intersects_ground {
            Self::Ground
        } else {
            Self::TopOfAtmosphere
        }
    }

    pub fn hits_ground(self) -> bool {
        self == Self::Ground
    }
}

impl AtmosphereParameters {
    pub fn clamp_radius(&self, r: f64) -> f64 {
        r.clamp(self.bottom_radius, self.top_radius)
    }

    /// Distance to the top atmosphere boundary for a ray leaving radius `r`
    /// with view zenith cosine `mu`; `r` must not exceed the top radius.
    pub fn distance_to_top_atmosphere_boundary(&self, r: f64, mu: f64) -> f64 {
        let discriminant = r * r * (mu * mu - 1.) + self.top_radius * self.top_radius;
        clamp_distance(-r * mu + safe_sqrt(discriminant))
    }

    pub fn distance_to_bottom_atmosphere_boundary(&self, r: f64, mu: f64) -> f64 {
        let discriminant = r * r * (mu * mu - 1.) + self.bottom_radius * self.bottom_radius;
        clamp_distance(-r * mu - safe_sqrt(discriminant))
    }

    pub fn ray_intersects_ground(&self, r: f64, mu: f64) -> bool {
        mu < 0. && r * r * (mu * mu - 1.) + self.bottom_radius * self.bottom_radius >= 0.
    }

    pub fn ray_target(&self, r: f64, mu: f64) -> RayTarget {
        RayTarget::from_ground_hit(self.ray_intersects_ground(r, mu))
    }

    pub fn distance_to_nearest_atmosphere_boundary(
        &self,
        r: f64,
        mu: f64,
        target: RayTarget,
    ) -> f64 {
        match target {
            RayTarget::Ground => self.distance_to_bottom_atmosphere_boundary(r, mu),
            RayTarget::TopOfAtmosphere => self.distance_to_top_atmosphere_boundary(r, mu),
        }
    }

    /// Distance from the ground to the top of the atmosphere along the horizon.
    pub fn horizon_distance_at_ground(&self) -> f64 {
        (self.top_radius * self.top_radius - self.bottom_radius * self.bottom_radius).sqrt()
    }

    /// Distance from radius `r` to the horizon.
    pub fn horizon_distance(&self, r: f64) -> f64 {
        safe_sqrt(r * r - self.bottom_radius * self.bottom_radius)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_up_and_down() {
        let params = AtmosphereParameters::earth();
        let r = params.bottom_radius + 10.;
        assert_relative_eq!(
            params.distance_to_top_atmosphere_boundary(r, 1.),
            params.top_radius - r,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            params.distance_to_bottom_atmosphere_boundary(r, -1.),
            10.,
            epsilon = 1e-9
        );
        assert_eq!(params.ray_target(r, -1.), RayTarget::Ground);
        assert_eq!(params.ray_target(r, 1.), RayTarget::TopOfAtmosphere);
    }

    #[test]
    fn test_horizon_separates_targets() {
        let params = AtmosphereParameters::earth();
        let r = params.bottom_radius + 5.;
        let mu_horizon = -params.horizon_distance(r) / r;
        assert_eq!(params.ray_target(r, mu_horizon - 1e-6), RayTarget::Ground);
        assert_eq!(
            params.ray_target(r, mu_horizon + 1e-6),
            RayTarget::TopOfAtmosphere
        );
        assert_relative_eq!(
            params.distance_to_top_atmosphere_boundary(params.bottom_radius, 0.),
            params.horizon_distance_at_ground(),
            epsilon = 1e-9
        );
    }
}
