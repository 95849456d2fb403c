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
use crate::table::{Extent, Table};
use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, Luma, Rgb};
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};

const WHITE_POINT_R: f32 = 1.082_414;
const WHITE_POINT_G: f32 = 0.967_556;
const WHITE_POINT_B: f32 = 0.950_030;
const WHITE_POINT_A: f32 = 1.0;
const EXPOSURE: f32 = 683. * 0.0001;

/// Writes tone mapped previews of tables: one RGB and one alpha PNG per
/// z-layer, named after the table's label.
pub struct TableDumper {
    directory: PathBuf,
}

impl TableDumper {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_owned(),
        }
    }

    pub fn dump(&self, table: &Table) -> Result<()> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!("creating dump directory {}", self.directory.display())
        })?;
        let (minf, maxf) = table.range();
        info!("RANGE: {} -> {} in {}", minf, maxf, table.label());

        let (rgb, alpha) = split_pixels(table);
        let prefix = self.directory.join(table.label());
        save_layered(&rgb, 3, table.extent(), &prefix)?;
        save_layered(&alpha, 1, table.extent(), &prefix.with_extension("alpha"))?;
        Ok(())
    }
}

fn tonemap(value: f32, white_point: f32) -> u8 {
    let mapped = (1.0 - (-value / white_point * EXPOSURE).exp()).powf(1.0 / 2.2);
    // Negative inputs map to NaN.
    if mapped.is_nan() {
        return 0;
    }
    (mapped.clamp(0., 1.) * 255.) as u8
}

/// Tone map a table into separate RGB and alpha byte planes.
pub fn split_pixels(table: &Table) -> (Vec<u8>, Vec<u8>) {
    let texels = table.texels();
    let mut rgb = Vec::with_capacity(texels.len() * 3);
    let mut alpha = Vec::with_capacity(texels.len());
    for [r, g, b, a] in texels.iter().copied() {
        rgb.push(tonemap(r, WHITE_POINT_R));
        rgb.push(tonemap(g, WHITE_POINT_G));
        rgb.push(tonemap(b, WHITE_POINT_B));
        alpha.push(tonemap(a, WHITE_POINT_A));
    }
    (rgb, alpha)
}

fn save_layered(data: &[u8], px_size: usize, extent: Extent, prefix: &Path) -> Result<()> {
    let layer_size = extent.width * extent.height * px_size;
    if layer_size == 0 {
        return Ok(());
    }
    let (width, height) = (extent.width as u32, extent.height as u32);
    for (layer_num, layer) in data.chunks(layer_size).enumerate() {
        let name = PathBuf::from(format!("{}-layer{:02}.png", prefix.display(), layer_num));
        if px_size == 3 {
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, layer)
                .ok_or_else(|| anyhow!("layer {} does not fit {}x{}", layer_num, width, height))?
                .save(&name)
                .with_context(|| format!("saving {}", name.display()))?;
        } else {
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, layer)
                .ok_or_else(|| anyhow!("layer {} does not fit {}x{}", layer_num, width, height))?
                .save(&name)
                .with_context(|| format!("saving {}", name.display()))?;
        }
    }
    Ok(())
}
