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

// All code in this module is heavily inspired by -- and all too
// frequently directly copied from -- the most excellent:
//     https://ebruneton.github.io/precomputed_atmospheric_scattering/
// Which is:
//     Copyright (c) 2017 Eric Bruneton
// All errors and omissions below were introduced in transcription
// to Rust and are not reflective of the high quality of the
// original work in any way.
mod boundary;
mod dump;
mod earth_consts;
mod lookup;
mod mapping;
mod math;
mod opts;
mod parameters;
mod precompute;
mod render;
mod table;
mod table_helpers;

pub use crate::{
    boundary::RayTarget,
    dump::TableDumper,
    earth_consts::*,
    mapping::ViewGeometry,
    math::{mie_phase_function, rayleigh_phase_function},
    opts::PrecomputeOpts,
    parameters::{AtmosphereParameters, DensityProfile, DensityProfileLayer},
    precompute::*,
    render::{DrawParameters, SkyRadiance, SkyRenderer, SunAndSkyIrradiance},
    table::{Extent, Table, Texel, TexelCoord, BLOCK_SIZE},
    table_helpers::TableHelpers,
};
