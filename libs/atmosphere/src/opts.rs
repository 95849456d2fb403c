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
use crate::parameters::AtmosphereParameters;
use anyhow::Result;
use nalgebra::Vector3;
use structopt::StructOpt;

/// Command line overrides for the Earth atmosphere defaults.
#[derive(Clone, Debug, Default, StructOpt)]
pub struct PrecomputeOpts {
    /// Number of scattering orders to simulate (1 is single scattering only)
    #[structopt(long)]
    scattering_orders: Option<usize>,

    /// Transmittance table size along the view zenith angle
    #[structopt(long)]
    transmittance_mu_size: Option<usize>,

    /// Transmittance table size along altitude
    #[structopt(long)]
    transmittance_r_size: Option<usize>,

    /// Scattering table size along altitude
    #[structopt(long)]
    scattering_r_size: Option<usize>,

    /// Scattering table size along the view zenith angle; must be even
    #[structopt(long)]
    scattering_mu_size: Option<usize>,

    /// Scattering table size along the sun zenith angle
    #[structopt(long)]
    scattering_mu_s_size: Option<usize>,

    /// Scattering table size along the view-sun angle
    #[structopt(long)]
    scattering_nu_size: Option<usize>,

    /// Irradiance table size along the sun zenith angle
    #[structopt(long)]
    irradiance_mu_s_size: Option<usize>,

    /// Irradiance table size along altitude
    #[structopt(long)]
    irradiance_r_size: Option<usize>,

    /// Average ground albedo, applied to every band
    #[structopt(long)]
    ground_albedo: Option<f64>,

    /// Asymmetry of the aerosol phase function
    #[structopt(long)]
    mie_phase_function_g: Option<f64>,
}

impl PrecomputeOpts {
    pub fn parameters(&self) -> Result<AtmosphereParameters> {
        let mut params = AtmosphereParameters::earth();
        for (value, target) in [
            (self.scattering_orders, &mut params.scattering_orders),
            (self.transmittance_mu_size, &mut params.transmittance_mu_size),
            (self.transmittance_r_size, &mut params.transmittance_r_size),
            (self.scattering_r_size, &mut params.scattering_r_size),
            (self.scattering_mu_size, &mut params.scattering_mu_size),
            (self.scattering_mu_s_size, &mut params.scattering_mu_s_size),
            (self.scattering_nu_size, &mut params.scattering_nu_size),
            (self.irradiance_mu_s_size, &mut params.irradiance_mu_s_size),
            (self.irradiance_r_size, &mut params.irradiance_r_size),
        ] {
            if let Some(value) = value {
                *target = value;
            }
        }
        if let Some(albedo) = self.ground_albedo {
            params.ground_albedo = Vector3::repeat(albedo);
        }
        if let Some(g) = self.mie_phase_function_g {
            params.mie_phase_function_g = g;
        }
        params.validate()?;
        Ok(params)
    }
}
