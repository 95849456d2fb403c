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
    math::{mie_phase_function, rayleigh_phase_function},
    parameters::AtmosphereParameters,
    precompute::DeltaScattering,
    table::Table,
};
use nalgebra::Vector3;
use std::f64::consts::PI;

const SAMPLE_COUNT: usize = 16;

/// Radiance scattered towards the view direction at a point, from light
/// that has already scattered once less. Incident light arrives from every
/// direction on the sphere: the previous order's sky radiance, plus light
/// bounced off the ground where the incident direction hits it.
pub fn compute_scattering_density(
    params: &AtmosphereParameters,
    transmittance: &Table,
    previous_scattering: &DeltaScattering,
    previous_irradiance: &Table,
    geometry: &ViewGeometry,
) -> Vector3<f64> {
    let ViewGeometry { r, mu, mu_s, nu, .. } = *geometry;

    // Local frame: zenith is z, the view direction lies in the x-z plane
    // and the sun direction is placed to honor mu_s and nu.
    let zenith = Vector3::z();
    let omega = Vector3::new((1. - mu * mu).max(0.).sqrt(), 0., mu);
    let sun_dir_x = if omega.x == 0. {
        0.
    } else {
        (nu - mu * mu_s) / omega.x
    };
    let sun_dir_y = (1. - sun_dir_x * sun_dir_x - mu_s * mu_s).max(0.).sqrt();
    let omega_s = Vector3::new(sun_dir_x, sun_dir_y, mu_s);

    let d_phi = PI / SAMPLE_COUNT as f64;
    let d_theta = PI / SAMPLE_COUNT as f64;
    let rayleigh_density = params.rayleigh_density_at(r);
    let mie_density = params.mie_density_at(r);
    let mut rayleigh_mie = Vector3::zeros();

    for l in 0..SAMPLE_COUNT {
        let theta = (l as f64 + 0.5) * d_theta;
        let (sin_theta, cos_theta) = theta.sin_cos();
        let target = params.ray_target(r, cos_theta);

        // Ground reflection only contributes along rays that reach the ground.
        let (distance_to_ground, transmittance_to_ground, ground_albedo) = match target {
            RayTarget::Ground => {
                let distance = params.distance_to_bottom_atmosphere_boundary(r, cos_theta);
                (
                    distance,
                    params.transmittance(transmittance, r, cos_theta, distance, target),
                    params.ground_albedo,
                )
            }
            RayTarget::TopOfAtmosphere => (0., Vector3::zeros(), Vector3::zeros()),
        };

        for m in 0..2 * SAMPLE_COUNT {
            let phi = (m as f64 + 0.5) * d_phi;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let omega_i = Vector3::new(cos_phi * sin_theta, sin_phi * sin_theta, cos_theta);
            let d_omega_i = d_theta * d_phi * sin_theta;

            let nu1 = omega_s.dot(&omega_i);
            let mut incident_radiance = previous_scattering.radiance(
                params,
                &ViewGeometry {
                    r,
                    mu: omega_i.z,
                    mu_s,
                    nu: nu1,
                    target,
                },
            );

            if target.hits_ground() {
                let ground_normal = (zenith * r + omega_i * distance_to_ground).normalize();
                let ground_irradiance = params.irradiance(
                    previous_irradiance,
                    params.bottom_radius,
                    ground_normal.dot(&omega_s),
                );
                incident_radiance += transmittance_to_ground
                    .component_mul(&ground_albedo)
                    .component_mul(&ground_irradiance)
                    / PI;
            }

            let nu2 = omega.dot(&omega_i);
            let scattering = params.rayleigh_scattering
                * (rayleigh_density * rayleigh_phase_function(nu2))
                + params.mie_scattering
                    * (mie_density * mie_phase_function(params.mie_phase_function_g, nu2));
            rayleigh_mie += incident_radiance.component_mul(&scattering) * d_omega_i;
        }
    }
    rayleigh_mie
}

pub(crate) fn build_scattering_density(
    params: &AtmosphereParameters,
    transmittance: &Table,
    previous_scattering: &DeltaScattering,
    previous_irradiance: &Table,
    density: &mut Table,
) {
    density.dispatch(|coord| {
        let geometry = params.geometry_from_scattering_texel(coord);
        compute_scattering_density(
            params,
            transmittance,
            previous_scattering,
            previous_irradiance,
            &geometry,
        )
        .push(1.)
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    fn filled_2d(extent: (usize, usize), value: f64) -> Table {
        let mut table = Table::new_2d("filled", extent);
        table.dispatch(|_| Vector4::repeat(value));
        table
    }

    fn filled_3d(extent: (usize, usize, usize), value: f64) -> Table {
        let mut table = Table::new_3d("filled", extent);
        table.dispatch(|_| Vector4::repeat(value));
        table
    }

    #[test]
    fn test_dark_sky_has_no_density() {
        let params = AtmosphereParameters::earth();
        let transmittance = filled_2d(params.transmittance_extent(), 1.);
        let irradiance = filled_2d(params.irradiance_extent(), 0.);
        let previous = DeltaScattering::Multiple(filled_3d(params.scattering_extent(), 0.));
        let r = params.bottom_radius + 1.;
        let density = compute_scattering_density(
            &params,
            &transmittance,
            &previous,
            &irradiance,
            &ViewGeometry {
                r,
                mu: 0.2,
                mu_s: 0.4,
                nu: 0.1,
                target: params.ray_target(r, 0.2),
            },
        );
        assert_eq!(density, Vector3::zeros());
    }

    #[test]
    fn test_uniform_radiance_integrates_phase_functions() {
        // With a black ground and isotropic incident radiance, the normalized
        // phase functions integrate to one over the sphere.
        let params = AtmosphereParameters {
            mie_phase_function_g: 0.,
            ground_albedo: Vector3::zeros(),
            ..AtmosphereParameters::earth()
        };
        let radiance = 2.;
        let transmittance = filled_2d(params.transmittance_extent(), 1.);
        let irradiance = filled_2d(params.irradiance_extent(), 1.);
        let previous = DeltaScattering::Multiple(filled_3d(params.scattering_extent(), radiance));
        let r = params.bottom_radius + 3.;
        let density = compute_scattering_density(
            &params,
            &transmittance,
            &previous,
            &irradiance,
            &ViewGeometry {
                r,
                mu: 0.3,
                mu_s: 0.5,
                nu: 0.4,
                target: params.ray_target(r, 0.3),
            },
        );
        let expect = (params.rayleigh_scattering * params.rayleigh_density_at(r)
            + params.mie_scattering * params.mie_density_at(r))
            * radiance;
        assert_relative_eq!(density, expect, max_relative = 1e-2);
    }
}
