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
    mapping::ViewGeometry,
    math::{clamp_cosine, rayleigh_phase_function},
    parameters::AtmosphereParameters,
    table::Table,
};
use nalgebra::Vector3;

const SAMPLE_COUNT: usize = 50;

/// Integrate the scattering density along the view ray to the nearest
/// atmosphere boundary, attenuated back to the ray origin.
pub fn compute_multiple_scattering(
    params: &AtmosphereParameters,
    transmittance: &Table,
    density: &Table,
    geometry: &ViewGeometry,
) -> Vector3<f64> {
    let ViewGeometry {
        r,
        mu,
        mu_s,
        nu,
        target,
    } = *geometry;
    let dx = params.distance_to_nearest_atmosphere_boundary(r, mu, target) / SAMPLE_COUNT as f64;
    let mut rayleigh_mie_sum = Vector3::zeros();
    for i in 0..=SAMPLE_COUNT {
        let d_i = i as f64 * dx;

        // The r, mu and mu_s parameters at the current integration point.
        let r_i = params.clamp_radius((d_i * d_i + 2. * r * mu * d_i + r * r).sqrt());
        let mu_i = clamp_cosine((r * mu + d_i) / r_i);
        let mu_s_i = clamp_cosine((r * mu_s + d_i * nu) / r_i);

        let sample = ViewGeometry {
            r: r_i,
            mu: mu_i,
            mu_s: mu_s_i,
            nu,
            target,
        };
        let rayleigh_mie_i = params
            .scattering(density, &sample)
            .xyz()
            .component_mul(&params.transmittance(transmittance, r, mu, d_i, target))
            * dx;
        let weight_i = if i == 0 || i == SAMPLE_COUNT { 0.5 } else { 1. };
        rayleigh_mie_sum += rayleigh_mie_i * weight_i;
    }
    rayleigh_mie_sum
}

/// Write this order's delta into `delta_multiple` and fold it into the
/// accumulated scattering table. The accumulated table keeps the Rayleigh
/// phase function factored out, so the delta is divided by it here.
pub(crate) fn build_multiple_scattering(
    params: &AtmosphereParameters,
    transmittance: &Table,
    density: &Table,
    delta_multiple: &mut Table,
    scattering: &mut Table,
) {
    delta_multiple.dispatch(|coord| {
        let geometry = params.geometry_from_scattering_texel(coord);
        compute_multiple_scattering(params, transmittance, density, &geometry).push(1.)
    });
    let delta_multiple = &*delta_multiple;
    scattering.dispatch_update(|coord, prior| {
        let geometry = params.geometry_from_scattering_texel(coord);
        let delta = delta_multiple.texel(coord).xyz() / rayleigh_phase_function(geometry.nu);
        prior + delta.push(0.)
    });
}
