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
    mapping::ViewGeometry, math::clamp_cosine, parameters::AtmosphereParameters, table::Table,
};
use nalgebra::Vector3;

const SAMPLE_COUNT: usize = 50;

/// Rayleigh and Mie single scattering, each split into its spectral parts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SingleScattering {
    pub rayleigh: Vector3<f64>,
    pub mie: Vector3<f64>,
}

/// Light reaching the point a distance `d` along the ray (r, mu) from the
/// sun, attenuated on its way back to the ray origin, per unit density.
pub fn compute_single_scattering_integrand(
    params: &AtmosphereParameters,
    transmittance: &Table,
    geometry: &ViewGeometry,
    d: f64,
) -> SingleScattering {
    let ViewGeometry {
        r,
        mu,
        mu_s,
        nu,
        target,
    } = *geometry;
    let r_d = params.clamp_radius((d * d + 2. * r * mu * d + r * r).sqrt());
    let mu_s_d = clamp_cosine((r * mu_s + d * nu) / r_d);
    let t = params
        .transmittance(transmittance, r, mu, d, target)
        .component_mul(&params.transmittance_to_sun(transmittance, r_d, mu_s_d));
    SingleScattering {
        rayleigh: t * params.rayleigh_density_at(r_d),
        mie: t * params.mie_density_at(r_d),
    }
}

/// Trapezoidal integral of the single scattering integrand to the nearest
/// atmosphere boundary. Phase functions are left out; they are applied at
/// lookup time.
pub fn compute_single_scattering(
    params: &AtmosphereParameters,
    transmittance: &Table,
    geometry: &ViewGeometry,
) -> SingleScattering {
    let dx = params.distance_to_nearest_atmosphere_boundary(geometry.r, geometry.mu, geometry.target)
        / SAMPLE_COUNT as f64;
    let mut rayleigh_sum = Vector3::zeros();
    let mut mie_sum = Vector3::zeros();
    for i in 0..=SAMPLE_COUNT {
        let d_i = i as f64 * dx;
        let SingleScattering { rayleigh, mie } =
            compute_single_scattering_integrand(params, transmittance, geometry, d_i);
        let weight_i = if i == 0 || i == SAMPLE_COUNT { 0.5 } else { 1. };
        rayleigh_sum += rayleigh * weight_i;
        mie_sum += mie * weight_i;
    }
    SingleScattering {
        rayleigh: rayleigh_sum
            .component_mul(&params.solar_irradiance)
            .component_mul(&params.rayleigh_scattering)
            * dx,
        mie: mie_sum
            .component_mul(&params.solar_irradiance)
            .component_mul(&params.mie_scattering)
            * dx,
    }
}

/// Fill the Rayleigh and Mie delta tables, then pack their sum into the
/// accumulated scattering table as (rayleigh.rgb, mie.r).
pub(crate) fn build_single_scattering(
    params: &AtmosphereParameters,
    transmittance: &Table,
    delta_rayleigh: &mut Table,
    delta_mie: &mut Table,
    scattering: &mut Table,
) {
    delta_rayleigh.dispatch_pair(delta_mie, |coord| {
        let geometry = params.geometry_from_scattering_texel(coord);
        let SingleScattering { rayleigh, mie } =
            compute_single_scattering(params, transmittance, &geometry);
        (rayleigh.push(1.), mie.push(1.))
    });
    let (delta_rayleigh, delta_mie) = (&*delta_rayleigh, &*delta_mie);
    scattering.dispatch(|coord| {
        let rayleigh = delta_rayleigh.texel(coord);
        let mie = delta_mie.texel(coord);
        rayleigh.xyz().push(mie.x)
    });
}
