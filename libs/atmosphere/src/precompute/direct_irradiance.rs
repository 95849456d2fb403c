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
use crate::{parameters::AtmosphereParameters, table::Table};
use nalgebra::Vector3;

/// Irradiance from the unscattered sun on a horizontal surface at radius
/// `r`. The cosine factor is averaged over the solar disc, so it ramps in
/// smoothly while the disc crosses the horizon.
pub fn compute_direct_irradiance(
    params: &AtmosphereParameters,
    transmittance: &Table,
    r: f64,
    mu_s: f64,
) -> Vector3<f64> {
    let alpha_s = params.sun_angular_radius;
    let average_cosine_factor = if mu_s < -alpha_s {
        0.
    } else if mu_s > alpha_s {
        mu_s
    } else {
        (mu_s + alpha_s) * (mu_s + alpha_s) / (4. * alpha_s)
    };
    if average_cosine_factor == 0. {
        return Vector3::zeros();
    }
    params.solar_irradiance.component_mul(
        &params.transmittance_to_top_atmosphere_boundary(transmittance, r, mu_s),
    ) * average_cosine_factor
}

pub(crate) fn build_direct_irradiance(
    params: &AtmosphereParameters,
    transmittance: &Table,
    delta_irradiance: &mut Table,
) {
    delta_irradiance.dispatch(|coord| {
        let (r, mu_s) = params.r_mu_s_from_irradiance_texel(coord);
        compute_direct_irradiance(params, transmittance, r, mu_s).push(1.)
    });
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector4;

    fn clear_sky(params: &AtmosphereParameters) -> Table {
        let mut table = Table::new_2d("transmittance", params.transmittance_extent());
        table.dispatch(|_| Vector4::repeat(1.));
        table
    }

    #[test]
    fn test_sun_below_horizon_is_exactly_zero() {
        let params = AtmosphereParameters::earth();
        let transmittance = clear_sky(&params);
        let mu_s = -params.sun_angular_radius - 1e-6;
        for &r in &[params.bottom_radius, params.bottom_radius + 30.] {
            assert_eq!(
                compute_direct_irradiance(&params, &transmittance, r, mu_s),
                Vector3::zeros()
            );
            assert_eq!(
                compute_direct_irradiance(&params, &transmittance, r, -1.),
                Vector3::zeros()
            );
        }
    }

    #[test]
    fn test_cosine_factor() {
        let params = AtmosphereParameters::earth();
        let transmittance = clear_sky(&params);
        let r = params.bottom_radius;
        assert_relative_eq!(
            compute_direct_irradiance(&params, &transmittance, r, 1.),
            params.solar_irradiance
        );
        assert_relative_eq!(
            compute_direct_irradiance(&params, &transmittance, r, 0.5),
            params.solar_irradiance * 0.5
        );
        // Half the disc is up.
        assert_relative_eq!(
            compute_direct_irradiance(&params, &transmittance, r, 0.),
            params.solar_irradiance * params.sun_angular_radius / 4.
        );
    }
}
