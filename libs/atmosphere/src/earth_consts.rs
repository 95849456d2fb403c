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
use crate::parameters::{AtmosphereParameters, DensityProfile, DensityProfileLayer};
use nalgebra::Vector3;

// Values are from Bruneton's reference Earth model, sampled at the red,
// green and blue reference wavelengths (680nm, 550nm and 440nm).
pub const EARTH_BOTTOM_RADIUS_KM: f64 = 6_360.;
pub const EARTH_TOP_RADIUS_KM: f64 = 6_420.;
pub const RAYLEIGH_SCALE_HEIGHT_KM: f64 = 8.;
pub const MIE_SCALE_HEIGHT_KM: f64 = 1.2;
pub const SUN_ANGULAR_RADIUS: f64 = 0.004_675;
// cos(102 degrees)
pub const MAX_SUN_ZENITH_COSINE: f64 = -0.207_912;

const SOLAR_IRRADIANCE: [f64; 3] = [1.474, 1.850, 1.911_98];
const RAYLEIGH_SCATTERING: [f64; 3] = [0.005_802, 0.013_558, 0.033_100];
const MIE_SCATTERING: f64 = 0.003_996;
const MIE_EXTINCTION: f64 = 0.004_440;
const MIE_PHASE_FUNCTION_G: f64 = 0.8;
const OZONE_EXTINCTION: [f64; 3] = [6.5e-4, 1.881e-3, 8.5e-5];
const GROUND_ALBEDO: f64 = 0.1;

// Ozone is a tent centered at 25km, 30km wide.
const OZONE_PEAK_ALTITUDE_KM: f64 = 25.;
const OZONE_HALF_WIDTH_KM: f64 = 15.;

pub const NUM_SCATTERING_ORDERS: usize = 4;

impl AtmosphereParameters {
    pub fn earth() -> Self {
        Self {
            solar_irradiance: Vector3::from(SOLAR_IRRADIANCE),
            sun_angular_radius: SUN_ANGULAR_RADIUS,
            bottom_radius: EARTH_BOTTOM_RADIUS_KM,
            top_radius: EARTH_TOP_RADIUS_KM,
            rayleigh_density: DensityProfile::exponential(RAYLEIGH_SCALE_HEIGHT_KM),
            rayleigh_scattering: Vector3::from(RAYLEIGH_SCATTERING),
            mie_density: DensityProfile::exponential(MIE_SCALE_HEIGHT_KM),
            mie_scattering: Vector3::repeat(MIE_SCATTERING),
            mie_extinction: Vector3::repeat(MIE_EXTINCTION),
            mie_phase_function_g: MIE_PHASE_FUNCTION_G,
            absorption_density: DensityProfile {
                layers: [
                    DensityProfileLayer {
                        width: OZONE_PEAK_ALTITUDE_KM,
                        linear_term: 1. / OZONE_HALF_WIDTH_KM,
                        constant_term: -2. / 3.,
                        ..DensityProfileLayer::EMPTY
                    },
                    DensityProfileLayer {
                        linear_term: -1. / OZONE_HALF_WIDTH_KM,
                        constant_term: 8. / 3.,
                        ..DensityProfileLayer::EMPTY
                    },
                ],
            },
            absorption_extinction: Vector3::from(OZONE_EXTINCTION),
            ground_albedo: Vector3::repeat(GROUND_ALBEDO),
            mu_s_min: MAX_SUN_ZENITH_COSINE,
            scattering_orders: NUM_SCATTERING_ORDERS,

            transmittance_mu_size: 256,
            transmittance_r_size: 64,
            scattering_r_size: 32,
            scattering_mu_size: 128,
            scattering_mu_s_size: 32,
            scattering_nu_size: 8,
            irradiance_mu_s_size: 64,
            irradiance_r_size: 16,
        }
    }
}
