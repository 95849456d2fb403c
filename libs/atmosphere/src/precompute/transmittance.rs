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
    parameters::{AtmosphereParameters, DensityProfile},
    table::Table,
};
use nalgebra::Vector3;

const SAMPLE_COUNT: usize = 500;

/// Integrate `profile` along the ray (r, mu) to the top of the atmosphere
/// with the trapezoidal rule.
pub fn compute_optical_length_to_top_atmosphere_boundary(
    params: &AtmosphereParameters,
    profile: &DensityProfile,
    r: f64,
    mu: f64,
) -> f64 {
    let dx = params.distance_to_top_atmosphere_boundary(r, mu) / SAMPLE_COUNT as f64;
    (0..=SAMPLE_COUNT)
        .map(|i| {
            let d_i = i as f64 * dx;
            let r_i = (d_i * d_i + 2. * r * mu * d_i + r * r).sqrt();
            let y_i = profile.density(params.altitude(r_i));
            let weight_i = if i == 0 || i == SAMPLE_COUNT { 0.5 } else { 1. };
            y_i * weight_i * dx
        })
        .sum()
}

pub fn compute_transmittance_to_top_atmosphere_boundary(
    params: &AtmosphereParameters,
    r: f64,
    mu: f64,
) -> Vector3<f64> {
    let optical_depth = params.rayleigh_scattering
        * compute_optical_length_to_top_atmosphere_boundary(params, &params.rayleigh_density, r, mu)
        + params.mie_extinction
            * compute_optical_length_to_top_atmosphere_boundary(params, &params.mie_density, r, mu)
        + params.absorption_extinction
            * compute_optical_length_to_top_atmosphere_boundary(
                params,
                &params.absorption_density,
                r,
                mu,
            );
    optical_depth.map(|tau| (-tau).exp())
}

pub(crate) fn build_transmittance(params: &AtmosphereParameters, transmittance: &mut Table) {
    transmittance.dispatch(|coord| {
        let (r, mu) = params.r_mu_from_transmittance_texel(coord);
        compute_transmittance_to_top_atmosphere_boundary(params, r, mu).push(1.)
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::earth_consts::{MIE_SCALE_HEIGHT_KM, RAYLEIGH_SCALE_HEIGHT_KM};
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_optical_length_matches_closed_form() {
        let params = AtmosphereParameters::earth();
        let height = params.top_radius - params.bottom_radius;
        let expect = RAYLEIGH_SCALE_HEIGHT_KM * (1. - (-height / RAYLEIGH_SCALE_HEIGHT_KM).exp());
        let length = compute_optical_length_to_top_atmosphere_boundary(
            &params,
            &params.rayleigh_density,
            params.bottom_radius,
            1.,
        );
        // Trapezoid error on a 500 step path is around 2e-5 relative.
        assert_relative_eq!(length, expect, max_relative = 5e-5);
    }

    #[test]
    fn test_zenith_transmittance_from_ground() {
        let params = AtmosphereParameters::earth();
        let height = params.top_radius - params.bottom_radius;
        let rayleigh = RAYLEIGH_SCALE_HEIGHT_KM * (1. - (-height / RAYLEIGH_SCALE_HEIGHT_KM).exp());
        let mie = MIE_SCALE_HEIGHT_KM * (1. - (-height / MIE_SCALE_HEIGHT_KM).exp());
        // The ozone tent spans 10km to 40km with a peak of 1.
        let ozone = 15.;
        let expect = (params.rayleigh_scattering * rayleigh
            + params.mie_extinction * mie
            + params.absorption_extinction * ozone)
            .map(|tau| (-tau).exp());
        let t = compute_transmittance_to_top_atmosphere_boundary(&params, params.bottom_radius, 1.);
        assert_relative_eq!(t, expect, epsilon = 1e-4);
        assert!(t.x > t.z);
        assert!(t.iter().all(|&c| c > 0. && c <= 1.));
    }

    #[test]
    fn test_longer_paths_transmit_less() {
        let params = AtmosphereParameters::earth();
        let r = params.bottom_radius + 1.;
        let horizon = -params.horizon_distance(r) / r;
        let mut prior = Vector3::repeat(1.);
        for i in 0..=20 {
            let mu = 1. - (1. - horizon) * i as f64 / 20.;
            let t = compute_transmittance_to_top_atmosphere_boundary(&params, r, mu);
            for c in 0..3 {
                assert!(t[c] <= prior[c] + 1e-12, "mu {} channel {}", mu, c);
            }
            prior = t;
        }
    }

    #[test]
    fn test_table_is_a_fraction() {
        let params = AtmosphereParameters {
            transmittance_mu_size: 16,
            transmittance_r_size: 4,
            ..AtmosphereParameters::earth()
        };
        let mut table = Table::new_2d("transmittance", params.transmittance_extent());
        build_transmittance(&params, &mut table);
        for texel in table.texels() {
            for c in &texel[..3] {
                assert!(*c > 0. && *c <= 1.);
            }
            assert_eq!(texel[3], 1.);
        }
    }
}
