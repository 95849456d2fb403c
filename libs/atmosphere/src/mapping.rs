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
    math::{
        clamp_cosine, safe_sqrt, texture_coord_from_unit_range, unit_range_from_texture_coord,
    },
    parameters::AtmosphereParameters,
    table::TexelCoord,
};
use nalgebra::Vector4;

/// The physical variables a scattering table coordinate stands for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewGeometry {
    pub r: f64,
    pub mu: f64,
    pub mu_s: f64,
    pub nu: f64,
    pub target: RayTarget,
}

impl AtmosphereParameters {
    /// Returns (u, v) for the transmittance table; u follows the distance to
    /// the top boundary, v the distance to the horizon.
    pub fn transmittance_uv_from_r_mu(&self, r: f64, mu: f64) -> (f64, f64) {
        let h = self.horizon_distance_at_ground();
        let rho = self.horizon_distance(r);
        let d = self.distance_to_top_atmosphere_boundary(r, mu);
        let d_min = self.top_radius - r;
        let d_max = rho + h;
        let x_mu = (d - d_min) / (d_max - d_min);
        let x_r = rho / h;
        (
            texture_coord_from_unit_range(x_mu, self.transmittance_mu_size),
            texture_coord_from_unit_range(x_r, self.transmittance_r_size),
        )
    }

    pub fn r_mu_from_transmittance_uv(&self, u: f64, v: f64) -> (f64, f64) {
        let x_mu = unit_range_from_texture_coord(u, self.transmittance_mu_size);
        let x_r = unit_range_from_texture_coord(v, self.transmittance_r_size);
        let h = self.horizon_distance_at_ground();
        let rho = h * x_r;
        let r = (rho * rho + self.bottom_radius * self.bottom_radius).sqrt();
        let d_min = self.top_radius - r;
        let d_max = rho + h;
        let d = d_min + x_mu * (d_max - d_min);
        let mu = if d == 0. {
            1.
        } else {
            clamp_cosine((h * h - rho * rho - d * d) / (2. * r * d))
        };
        (r, mu)
    }

    pub fn r_mu_from_transmittance_texel(&self, coord: TexelCoord) -> (f64, f64) {
        let frag = coord.frag_coord();
        self.r_mu_from_transmittance_uv(
            frag.x / self.transmittance_mu_size as f64,
            frag.y / self.transmittance_r_size as f64,
        )
    }

    /// Returns (u, v) for the irradiance table: u is mu_s, v is altitude, both linear.
    pub fn irradiance_uv_from_r_mu_s(&self, r: f64, mu_s: f64) -> (f64, f64) {
        let x_r = (r - self.bottom_radius) / (self.top_radius - self.bottom_radius);
        let x_mu_s = mu_s * 0.5 + 0.5;
        (
            texture_coord_from_unit_range(x_mu_s, self.irradiance_mu_s_size),
            texture_coord_from_unit_range(x_r, self.irradiance_r_size),
        )
    }

    pub fn r_mu_s_from_irradiance_uv(&self, u: f64, v: f64) -> (f64, f64) {
        let x_mu_s = unit_range_from_texture_coord(u, self.irradiance_mu_s_size);
        let x_r = unit_range_from_texture_coord(v, self.irradiance_r_size);
        let r = self.bottom_radius + x_r * (self.top_radius - self.bottom_radius);
        let mu_s = clamp_cosine(2. * x_mu_s - 1.);
        (r, mu_s)
    }

    pub fn r_mu_s_from_irradiance_texel(&self, coord: TexelCoord) -> (f64, f64) {
        let frag = coord.frag_coord();
        self.r_mu_s_from_irradiance_uv(
            frag.x / self.irradiance_mu_s_size as f64,
            frag.y / self.irradiance_r_size as f64,
        )
    }

    // Warp constant that packs sun zeniths below mu_s_min out of the table.
    fn mu_s_warp(&self) -> f64 {
        let d_min = self.top_radius - self.bottom_radius;
        let d_max = self.horizon_distance_at_ground();
        -2. * self.mu_s_min * self.bottom_radius / (d_max - d_min)
    }

    /// Map physical variables to the four scattering coordinates
    /// (u_nu, u_mu_s, u_mu, u_r). The mu coordinate is split at 0.5: rays
    /// that reach the ground occupy the lower half, rays that escape to
    /// space the upper half.
    pub fn scattering_uvwz_from_geometry(&self, geometry: &ViewGeometry) -> Vector4<f64> {
        let ViewGeometry {
            r,
            mu,
            mu_s,
            nu,
            target,
        } = *geometry;
        let h = self.horizon_distance_at_ground();
        let rho = self.horizon_distance(r);
        let u_r = texture_coord_from_unit_range(rho / h, self.scattering_r_size);

        let r_mu = r * mu;
        let discriminant = r_mu * r_mu - r * r + self.bottom_radius * self.bottom_radius;
        let half_mu_size = self.scattering_mu_size / 2;
        let u_mu = match target {
            RayTarget::Ground => {
                let d = -r_mu - safe_sqrt(discriminant);
                let d_min = r - self.bottom_radius;
                let d_max = rho;
                let x_mu = if d_max == d_min {
                    0.
                } else {
                    (d - d_min) / (d_max - d_min)
                };
                0.5 - 0.5 * texture_coord_from_unit_range(x_mu, half_mu_size)
            }
            RayTarget::TopOfAtmosphere => {
                let d = -r_mu + safe_sqrt(discriminant + h * h);
                let d_min = self.top_radius - r;
                let d_max = rho + h;
                0.5 + 0.5 * texture_coord_from_unit_range((d - d_min) / (d_max - d_min), half_mu_size)
            }
        };

        let d = self.distance_to_top_atmosphere_boundary(self.bottom_radius, mu_s);
        let d_min = self.top_radius - self.bottom_radius;
        let d_max = h;
        let a = (d - d_min) / (d_max - d_min);
        let big_a = self.mu_s_warp();
        let u_mu_s = texture_coord_from_unit_range(
            (1. - a / big_a).max(0.) / (1. + a),
            self.scattering_mu_s_size,
        );

        let u_nu = (nu + 1.) / 2.;
        Vector4::new(u_nu, u_mu_s, u_mu, u_r)
    }

    pub fn geometry_from_scattering_uvwz(&self, uvwz: &Vector4<f64>) -> ViewGeometry {
        let h = self.horizon_distance_at_ground();
        let rho = h * unit_range_from_texture_coord(uvwz.w, self.scattering_r_size);
        let r = (rho * rho + self.bottom_radius * self.bottom_radius).sqrt();

        let half_mu_size = self.scattering_mu_size / 2;
        let (mu, target) = if uvwz.z < 0.5 {
            let d_min = r - self.bottom_radius;
            let d_max = rho;
            let d = d_min
                + (d_max - d_min) * unit_range_from_texture_coord(1. - 2. * uvwz.z, half_mu_size);
            let mu = if d == 0. {
                -1.
            } else {
                clamp_cosine(-(rho * rho + d * d) / (2. * r * d))
            };
            (mu, RayTarget::Ground)
        } else {
            let d_min = self.top_radius - r;
            let d_max = rho + h;
            let d = d_min
                + (d_max - d_min) * unit_range_from_texture_coord(2. * uvwz.z - 1., half_mu_size);
            let mu = if d == 0. {
                1.
            } else {
                clamp_cosine((h * h - rho * rho - d * d) / (2. * r * d))
            };
            (mu, RayTarget::TopOfAtmosphere)
        };

        let x_mu_s = unit_range_from_texture_coord(uvwz.y, self.scattering_mu_s_size);
        let d_min = self.top_radius - self.bottom_radius;
        let d_max = h;
        let big_a = self.mu_s_warp();
        let a = (big_a - x_mu_s * big_a) / (1. + x_mu_s * big_a);
        let d = d_min + a.min(big_a) * (d_max - d_min);
        let mu_s = if d == 0. {
            1.
        } else {
            clamp_cosine((h * h - d * d) / (2. * self.bottom_radius * d))
        };

        let nu = clamp_cosine(uvwz.x * 2. - 1.);
        ViewGeometry {
            r,
            mu,
            mu_s,
            nu,
            target,
        }
    }

    /// Recover the geometry for a scattering texel. The x axis interleaves
    /// nu bins with full mu_s ranges; nu is then clamped to the values that
    /// are geometrically possible for the recovered mu and mu_s.
    pub fn geometry_from_scattering_texel(&self, coord: TexelCoord) -> ViewGeometry {
        let frag = coord.frag_coord();
        let mu_s_size = self.scattering_mu_s_size as f64;
        let frag_nu = (frag.x / mu_s_size).floor();
        let frag_mu_s = frag.x % mu_s_size;
        let uvwz = Vector4::new(
            frag_nu / (self.scattering_nu_size - 1) as f64,
            frag_mu_s / mu_s_size,
            frag.y / self.scattering_mu_size as f64,
            frag.z / self.scattering_r_size as f64,
        );
        let mut geometry = self.geometry_from_scattering_uvwz(&uvwz);
        let ViewGeometry { mu, mu_s, .. } = geometry;
        let spread = ((1. - mu * mu) * (1. - mu_s * mu_s)).max(0.).sqrt();
        geometry.nu = geometry.nu.clamp(mu * mu_s - spread, mu * mu_s + spread);
        geometry
    }
}
