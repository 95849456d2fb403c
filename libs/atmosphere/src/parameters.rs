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
use anyhow::{ensure, Result};
use nalgebra::Vector3;

/// An atmosphere layer of width `width`, whose density is defined as
///   `exp_term * exp(exp_scale * h) + linear_term * h + constant_term`,
/// clamped to [0,1], where h is the altitude.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DensityProfileLayer {
    pub width: f64,
    pub exp_term: f64,
    pub exp_scale: f64,
    pub linear_term: f64,
    pub constant_term: f64,
}

impl DensityProfileLayer {
    pub const EMPTY: Self = Self {
        width: 0.,
        exp_term: 0.,
        exp_scale: 0.,
        linear_term: 0.,
        constant_term: 0.,
    };

    /// A layer that decays exponentially with the given scale height.
    pub fn exponential(scale_height: f64) -> Self {
        Self {
            exp_term: 1.,
            exp_scale: -1. / scale_height,
            ..Self::EMPTY
        }
    }

    pub fn density(&self, altitude: f64) -> f64 {
        let density = self.exp_term * (self.exp_scale * altitude).exp()
            + self.linear_term * altitude
            + self.constant_term;
        density.clamp(0., 1.)
    }
}

/// Two layers stacked bottom to top. The width of the upper layer is
/// ignored; it always extends to the top of the atmosphere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DensityProfile {
    pub layers: [DensityProfileLayer; 2],
}

impl DensityProfile {
    pub fn exponential(scale_height: f64) -> Self {
        Self {
            layers: [
                DensityProfileLayer::EMPTY,
                DensityProfileLayer::exponential(scale_height),
            ],
        }
    }

    pub fn density(&self, altitude: f64) -> f64 {
        if altitude < self.layers[0].width {
            self.layers[0].density(altitude)
        } else {
            self.layers[1].density(altitude)
        }
    }
}

/// Everything the precompute passes and the runtime lookups need to know
/// about a planet's atmosphere. Lengths are in kilometers; scattering and
/// extinction coefficients are per kilometer, one value per RGB band.
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereParameters {
    /// The solar irradiance at the top of the atmosphere.
    pub solar_irradiance: Vector3<f64>,
    /// The sun's angular radius, in radians. The approximations used are
    /// only valid below 0.1 radians.
    pub sun_angular_radius: f64,
    /// The distance between the planet center and the bottom of the atmosphere.
    pub bottom_radius: f64,
    /// The distance between the planet center and the top of the atmosphere.
    pub top_radius: f64,
    /// The density profile of air molecules, from 0 (null) to 1 (maximum).
    pub rayleigh_density: DensityProfile,
    /// Scattering coefficient of air molecules where their density is maximal.
    pub rayleigh_scattering: Vector3<f64>,
    /// The density profile of aerosols.
    pub mie_density: DensityProfile,
    /// Scattering coefficient of aerosols where their density is maximal.
    pub mie_scattering: Vector3<f64>,
    /// Extinction coefficient of aerosols where their density is maximal.
    pub mie_extinction: Vector3<f64>,
    /// Asymmetry parameter of the Cornette-Shanks phase function.
    pub mie_phase_function_g: f64,
    /// The density profile of molecules that absorb light (e.g. ozone).
    pub absorption_density: DensityProfile,
    /// Extinction coefficient of absorbing molecules where their density is maximal.
    pub absorption_extinction: Vector3<f64>,
    /// The average albedo of the ground.
    pub ground_albedo: Vector3<f64>,
    /// The cosine of the maximum sun zenith angle for which scattering is
    /// precomputed. Use the smallest angle that still yields negligible sky
    /// radiance; 102 degrees for Earth, i.e. -0.2.
    pub mu_s_min: f64,
    /// Number of scattering orders to simulate; 1 is single scattering only.
    pub scattering_orders: usize,

    pub transmittance_mu_size: usize,
    pub transmittance_r_size: usize,
    pub scattering_r_size: usize,
    pub scattering_mu_size: usize,
    pub scattering_mu_s_size: usize,
    pub scattering_nu_size: usize,
    pub irradiance_mu_s_size: usize,
    pub irradiance_r_size: usize,
}

impl Default for AtmosphereParameters {
    fn default() -> Self {
        Self::earth()
    }
}

impl AtmosphereParameters {
    /// Every size ends up as a `size - 1` divisor somewhere in the mappings,
    /// so all of this must hold before anything is built.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.bottom_radius > 0.,
            "atmosphere bottom radius must be positive, got {}",
            self.bottom_radius
        );
        ensure!(
            self.bottom_radius < self.top_radius,
            "atmosphere bottom radius {} must be below top radius {}",
            self.bottom_radius,
            self.top_radius
        );
        for (name, size) in [
            ("transmittance mu", self.transmittance_mu_size),
            ("transmittance r", self.transmittance_r_size),
            ("scattering r", self.scattering_r_size),
            ("scattering mu", self.scattering_mu_size),
            ("scattering mu_s", self.scattering_mu_s_size),
            ("scattering nu", self.scattering_nu_size),
            ("irradiance mu_s", self.irradiance_mu_s_size),
            ("irradiance r", self.irradiance_r_size),
        ] {
            ensure!(size >= 2, "{} table size must be at least 2, got {}", name, size);
        }
        // Each half of the mu axis must itself be a valid table size.
        ensure!(
            self.scattering_mu_size % 2 == 0 && self.scattering_mu_size >= 4,
            "scattering mu table size must be even and at least 4, got {}",
            self.scattering_mu_size
        );
        // The mu_s warp divides by mu_s_min.
        ensure!(
            (-1.0..0.0).contains(&self.mu_s_min),
            "minimum sun zenith cosine must be in [-1, 0), got {}",
            self.mu_s_min
        );
        ensure!(
            self.scattering_orders >= 1,
            "at least one scattering order is required"
        );
        ensure!(
            self.sun_angular_radius > 0.,
            "sun angular radius must be positive, got {}",
            self.sun_angular_radius
        );
        Ok(())
    }

    pub fn transmittance_extent(&self) -> (usize, usize) {
        (self.transmittance_mu_size, self.transmittance_r_size)
    }

    pub fn irradiance_extent(&self) -> (usize, usize) {
        (self.irradiance_mu_s_size, self.irradiance_r_size)
    }

    pub fn scattering_extent(&self) -> (usize, usize, usize) {
        (
            self.scattering_nu_size * self.scattering_mu_s_size,
            self.scattering_mu_size,
            self.scattering_r_size,
        )
    }

    pub fn altitude(&self, r: f64) -> f64 {
        r - self.bottom_radius
    }

    pub fn rayleigh_density_at(&self, r: f64) -> f64 {
        self.rayleigh_density.density(self.altitude(r))
    }

    pub fn mie_density_at(&self, r: f64) -> f64 {
        self.mie_density.density(self.altitude(r))
    }
}
