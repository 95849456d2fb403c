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
use std::f64::consts::PI;

pub fn clamp_cosine(mu: f64) -> f64 {
    mu.clamp(-1., 1.)
}

pub fn clamp_distance(d: f64) -> f64 {
    d.max(0.)
}

pub fn safe_sqrt(area: f64) -> f64 {
    area.max(0.).sqrt()
}

pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0., 1.);
    t * t * (3. - 2. * t)
}

/// Map [0,1] onto the texel centers of a table of `size` texels, so that
/// the end points are sampled exactly rather than blended with the border.
pub fn texture_coord_from_unit_range(x: f64, size: usize) -> f64 {
    let size = size as f64;
    0.5 / size + x * (1. - 1. / size)
}

pub fn unit_range_from_texture_coord(u: f64, size: usize) -> f64 {
    let size = size as f64;
    (u - 0.5 / size) / (1. - 1. / size)
}

pub fn rayleigh_phase_function(nu: f64) -> f64 {
    let k = 3. / (16. * PI);
    k * (1. + nu * nu)
}

/// Cornette-Shanks phase function.
pub fn mie_phase_function(g: f64, nu: f64) -> f64 {
    let k = 3. / (8. * PI) * (1. - g * g) / (2. + g * g);
    k * (1. + nu * nu) / (1. + g * g - 2. * g * nu).powf(1.5)
}
