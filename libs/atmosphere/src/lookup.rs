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
    boundary::RayTarget,
    mapping::ViewGeometry,
    math::{clamp_cosine, smoothstep},
    parameters::AtmosphereParameters,
    table::Table,
};
use nalgebra::{Vector3, Vector4};

// Table reads shared by the builders and the renderer. Every lookup is a
// filtered sample at the coordinate produced by the parameterization.
impl AtmosphereParameters {
    pub fn transmittance_to_top_atmosphere_boundary(
        &self,
        transmittance: &Table,
        r: f64,
        mu: f64,
    ) -> Vector3<f64> {
        let (u, v) = self.transmittance_uv_from_r_mu(r, mu);
        transmittance.sample_2d(u, v).xyz()
    }

    /// Transmittance between the point at radius `r` and the point a
    /// distance `d` along the ray (r, mu). Computed as a ratio of two
    /// boundary transmittances; rays that reach the ground use the reversed
    /// direction so that neither lookup passes through the planet.
    pub fn transmittance(
        &self,
        transmittance: &Table,
        r: f64,
        mu: f64,
        d: f64,
        target: RayTarget,
    ) -> Vector3<f64> {
        let r_d = self.clamp_radius((d * d + 2. * r * mu * d + r * r).sqrt());
        let mu_d = clamp_cosine((r * mu + d) / r_d);
        let (numerator, denominator) = match target {
            RayTarget::Ground => (
                self.transmittance_to_top_atmosphere_boundary(transmittance, r_d, -mu_d),
                self.transmittance_to_top_atmosphere_boundary(transmittance, r, -mu),
            ),
            RayTarget::TopOfAtmosphere => (
                self.transmittance_to_top_atmosphere_boundary(transmittance, r, mu),
                self.transmittance_to_top_atmosphere_boundary(transmittance, r_d, mu_d),
            ),
        };
        numerator.zip_map(&denominator, |n, d| {
            if d <= 0. {
                0.
            } else {
                (n / d).min(1.)
            }
        })
    }

    /// Transmittance towards the sun, faded out as the solar disc sinks
    /// below the horizon.
    pub fn transmittance_to_sun(&self, transmittance: &Table, r: f64, mu_s: f64) -> Vector3<f64> {
        let sin_theta_h = self.bottom_radius / r;
        let cos_theta_h = -(1. - sin_theta_h * sin_theta_h).max(0.).sqrt();
        let visible = smoothstep(
            -sin_theta_h * self.sun_angular_radius,
            sin_theta_h * self.sun_angular_radius,
            mu_s - cos_theta_h,
        );
        self.transmittance_to_top_atmosphere_boundary(transmittance, r, mu_s) * visible
    }

    /// Sample a scattering table, blending the two nu bins that bracket nu.
    pub fn scattering(&self, scattering: &Table, geometry: &ViewGeometry) -> Vector4<f64> {
        let uvwz = self.scattering_uvwz_from_geometry(geometry);
        let nu_size = self.scattering_nu_size as f64;
        let tex_coord_x = uvwz.x * (nu_size - 1.);
        let tex_x = tex_coord_x.floor();
        let lerp = tex_coord_x - tex_x;
        let lower = scattering.sample_3d((tex_x + uvwz.y) / nu_size, uvwz.z, uvwz.w);
        let upper = scattering.sample_3d((tex_x + 1. + uvwz.y) / nu_size, uvwz.z, uvwz.w);
        lower.lerp(&upper, lerp)
    }

    pub fn irradiance(&self, irradiance: &Table, r: f64, mu_s: f64) -> Vector3<f64> {
        let (u, v) = self.irradiance_uv_from_r_mu_s(r, mu_s);
        irradiance.sample_2d(u, v).xyz()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn constant_table(params: &AtmosphereParameters, value: f64) -> Table {
        let mut table = Table::new_2d("constant", params.transmittance_extent());
        table.dispatch(|_| Vector4::repeat(value));
        table
    }

    #[test]
    fn test_uniform_transmittance_ratio_is_one() {
        let params = AtmosphereParameters::earth();
        let table = constant_table(&params, 0.5);
        let r = params.bottom_radius + 3.;
        let t = params.transmittance(&table, r, 0.3, 10., RayTarget::TopOfAtmosphere);
        assert_relative_eq!(t, Vector3::repeat(1.), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_denominator_is_opaque() {
        let params = AtmosphereParameters::earth();
        let table = constant_table(&params, 0.);
        let r = params.bottom_radius + 3.;
        let t = params.transmittance(&table, r, -0.5, 2., RayTarget::Ground);
        assert_eq!(t, Vector3::zeros());
    }

    #[test]
    fn test_sun_below_horizon_is_dark() {
        let params = AtmosphereParameters::earth();
        let table = constant_table(&params, 1.);
        let r = params.bottom_radius;
        assert_relative_eq!(params.transmittance_to_sun(&table, r, 1.), Vector3::repeat(1.));
        assert_eq!(params.transmittance_to_sun(&table, r, -0.1), Vector3::zeros());
        // Half the disc is up when its center sits on the horizon.
        assert_relative_eq!(
            params.transmittance_to_sun(&table, r, 0.).x,
            0.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_scattering_blends_neighbouring_nu_bins() {
        let params = AtmosphereParameters {
            scattering_nu_size: 3,
            scattering_mu_s_size: 4,
            scattering_mu_size: 8,
            scattering_r_size: 4,
            ..AtmosphereParameters::earth()
        };
        let mut table = Table::new_3d("nu-bins", params.scattering_extent());
        let mu_s_size = params.scattering_mu_s_size;
        table.dispatch(|c| Vector4::repeat((c.x / mu_s_size) as f64));
        let r = params.bottom_radius + 10.;
        for &(nu, expect) in &[
            (-1., 0.),
            (-0.5, 0.5),
            (0., 1.),
            (0.25, 1.25),
            (0.5, 1.5),
            (1., 2.),
        ] {
            let geometry = ViewGeometry {
                r,
                mu: 0.5,
                mu_s: 0.3,
                nu,
                target: params.ray_target(r, 0.5),
            };
            assert_relative_eq!(
                params.scattering(&table, &geometry),
                Vector4::repeat(expect),
                epsilon = 1e-9
            );
        }
    }
}
