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
    boundary::RayTarget, mapping::ViewGeometry, parameters::AtmosphereParameters,
    precompute::DeltaScattering, table::Table,
};
use nalgebra::Vector3;
use std::f64::consts::PI;

const SAMPLE_COUNT: usize = 32;

/// Sky irradiance on a horizontal surface at radius `r`, from light that
/// has scattered the number of times held in `previous_scattering`.
pub fn compute_indirect_irradiance(
    params: &AtmosphereParameters,
    previous_scattering: &DeltaScattering,
    r: f64,
    mu_s: f64,
) -> Vector3<f64> {
    let d_phi = PI / SAMPLE_COUNT as f64;
    let d_theta = PI / SAMPLE_COUNT as f64;

    let omega_s = Vector3::new((1. - mu_s * mu_s).max(0.).sqrt(), 0., mu_s);
    let mut result = Vector3::zeros();
    // Upper hemisphere only.
    for j in 0..SAMPLE_COUNT / 2 {
        let theta = (j as f64 + 0.5) * d_theta;
        let (sin_theta, cos_theta) = theta.sin_cos();
        for i in 0..2 * SAMPLE_COUNT {
            let phi = (i as f64 + 0.5) * d_phi;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let omega = Vector3::new(cos_phi * sin_theta, sin_phi * sin_theta, cos_theta);
            let d_omega = d_theta * d_phi * sin_theta;
            let nu = omega.dot(&omega_s);
            let radiance = previous_scattering.radiance(
                params,
                &ViewGeometry {
                    r,
                    mu: omega.z,
                    mu_s,
                    nu,
                    target: RayTarget::TopOfAtmosphere,
                },
            );
            result += radiance * (omega.z * d_omega);
        }
    }
    result
}

/// Write this order's delta irradiance and add it to the accumulated
/// irradiance table.
pub(crate) fn build_indirect_irradiance(
    params: &AtmosphereParameters,
    previous_scattering: &DeltaScattering,
    delta_irradiance: &mut Table,
    irradiance: &mut Table,
) {
    delta_irradiance.dispatch(|coord| {
        let (r, mu_s) = params.r_mu_s_from_irradiance_texel(coord);
        compute_indirect_irradiance(params, previous_scattering, r, mu_s).push(1.)
    });
    let delta_irradiance = &*delta_irradiance;
    irradiance.dispatch_update(|coord, prior| {
        prior + delta_irradiance.texel(coord).xyz().push(0.)
    });
}
