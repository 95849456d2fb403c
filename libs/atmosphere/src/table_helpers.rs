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
    parameters::AtmosphereParameters,
    precompute::AtmosphereTables,
    table::{Extent, Table},
};
use anyhow::{anyhow, ensure, Context, Result};
use json::JsonValue;
use log::info;
use std::{fs, mem, path::Path};

const TRANSMITTANCE_FILE: &str = "transmittance.bin";
const IRRADIANCE_FILE: &str = "irradiance.bin";
const SCATTERING_FILE: &str = "scattering.bin";
const INDEX_FILE: &str = "parameters.json";

const TEXEL_SIZE: usize = 4 * mem::size_of::<f32>();
const PARAMETER_TOLERANCE: f64 = 1e-9;

/// Saves and restores finished tables as raw little-endian RGBA f32 texels,
/// with a json index recording each table's extent.
pub struct TableHelpers;

impl TableHelpers {
    pub fn write_tables(
        directory: &Path,
        params: &AtmosphereParameters,
        tables: &AtmosphereTables,
    ) -> Result<()> {
        fs::create_dir_all(directory)
            .with_context(|| format!("creating table directory {}", directory.display()))?;
        for (file, table) in [
            (TRANSMITTANCE_FILE, &tables.transmittance),
            (IRRADIANCE_FILE, &tables.irradiance),
            (SCATTERING_FILE, &tables.scattering),
        ] {
            let path = directory.join(file);
            fs::write(&path, Self::table_to_bytes(table))
                .with_context(|| format!("writing {}", path.display()))?;
        }
        let path = directory.join(INDEX_FILE);
        fs::write(&path, Self::index_json(params, tables)?.pretty(2))
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote atmosphere tables to {}", directory.display());
        Ok(())
    }

    /// Reload tables written by `write_tables`. The stored atmosphere and
    /// extents must match `params`: tables built for another atmosphere
    /// would be looked up through the wrong geometry.
    pub fn read_tables(
        directory: &Path,
        params: &AtmosphereParameters,
    ) -> Result<AtmosphereTables> {
        let index_path = directory.join(INDEX_FILE);
        let index_data = fs::read_to_string(&index_path)
            .with_context(|| format!("reading {}", index_path.display()))?;
        let index = json::parse(&index_data)
            .with_context(|| format!("parsing {}", index_path.display()))?;
        Self::check_atmosphere(&index["atmosphere"], params)
            .with_context(|| format!("atmosphere in {}", index_path.display()))?;

        let (width, height) = params.transmittance_extent();
        let (mu_s_width, r_height) = params.irradiance_extent();
        let (nu_mu_s, mu, r) = params.scattering_extent();
        let read = |name: &str, file: &str, expect: Extent| -> Result<Table> {
            let extent = Self::extent_from_json(&index[name])
                .with_context(|| format!("{} extent in {}", name, index_path.display()))?;
            ensure!(
                extent == expect,
                "{} table is {}x{}x{}, but {}x{}x{} was requested",
                name,
                extent.width,
                extent.height,
                extent.depth,
                expect.width,
                expect.height,
                expect.depth
            );
            let path = directory.join(file);
            let data = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
            Self::table_from_bytes(name, extent, &data)
                .with_context(|| format!("loading {}", path.display()))
        };
        Ok(AtmosphereTables {
            transmittance: read(
                "transmittance",
                TRANSMITTANCE_FILE,
                Extent::new_2d(width, height),
            )?,
            irradiance: read(
                "irradiance",
                IRRADIANCE_FILE,
                Extent::new_2d(mu_s_width, r_height),
            )?,
            scattering: read("scattering", SCATTERING_FILE, Extent::new_3d(nu_mu_s, mu, r))?,
        })
    }

    fn check_atmosphere(stored: &JsonValue, params: &AtmosphereParameters) -> Result<()> {
        for (name, expect) in [
            ("bottom_radius", params.bottom_radius),
            ("top_radius", params.top_radius),
            ("sun_angular_radius", params.sun_angular_radius),
            ("mie_phase_function_g", params.mie_phase_function_g),
            ("mu_s_min", params.mu_s_min),
        ] {
            let found = stored[name]
                .as_f64()
                .ok_or_else(|| anyhow!("missing or invalid {}", name))?;
            ensure!(
                (found - expect).abs() <= PARAMETER_TOLERANCE * expect.abs().max(1.),
                "tables were built with {} = {}, but {} was requested",
                name,
                found,
                expect
            );
        }
        let orders = stored["scattering_orders"]
            .as_usize()
            .ok_or_else(|| anyhow!("missing or invalid scattering_orders"))?;
        ensure!(
            orders == params.scattering_orders,
            "tables were built with {} scattering orders, but {} were requested",
            orders,
            params.scattering_orders
        );
        Ok(())
    }

    pub fn table_to_bytes(table: &Table) -> Vec<u8> {
        table
            .texels()
            .iter()
            .flatten()
            .flat_map(|v| v.to_le_bytes())
            .collect()
    }

    pub fn table_from_bytes(label: &str, extent: Extent, data: &[u8]) -> Result<Table> {
        ensure!(
            data.len() == extent.texel_count() * TEXEL_SIZE,
            "expected {} bytes for a {}x{}x{} table, found {}",
            extent.texel_count() * TEXEL_SIZE,
            extent.width,
            extent.height,
            extent.depth,
            data.len()
        );
        let texels = data
            .chunks_exact(TEXEL_SIZE)
            .map(|texel| {
                let mut out = [0f32; 4];
                for (channel, bytes) in out.iter_mut().zip(texel.chunks_exact(4)) {
                    *channel = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                }
                out
            })
            .collect();
        Table::from_texels(label, extent, texels)
            .ok_or_else(|| anyhow!("texel count does not match extent"))
    }

    fn extent_json(extent: Extent) -> Result<JsonValue> {
        let mut obj = JsonValue::new_object();
        obj.insert("width", extent.width)?;
        obj.insert("height", extent.height)?;
        obj.insert("depth", extent.depth)?;
        Ok(obj)
    }

    fn extent_from_json(value: &JsonValue) -> Result<Extent> {
        let field = |name: &str| {
            value[name]
                .as_usize()
                .ok_or_else(|| anyhow!("missing or invalid {}", name))
        };
        Ok(Extent::new_3d(
            field("width")?,
            field("height")?,
            field("depth")?,
        ))
    }

    fn index_json(params: &AtmosphereParameters, tables: &AtmosphereTables) -> Result<JsonValue> {
        let mut atmosphere = JsonValue::new_object();
        atmosphere.insert("bottom_radius", params.bottom_radius)?;
        atmosphere.insert("top_radius", params.top_radius)?;
        atmosphere.insert("sun_angular_radius", params.sun_angular_radius)?;
        atmosphere.insert("mie_phase_function_g", params.mie_phase_function_g)?;
        atmosphere.insert("mu_s_min", params.mu_s_min)?;
        atmosphere.insert("scattering_orders", params.scattering_orders)?;

        let mut obj = JsonValue::new_object();
        obj.insert("atmosphere", atmosphere)?;
        obj.insert("transmittance", Self::extent_json(tables.transmittance.extent())?)?;
        obj.insert("irradiance", Self::extent_json(tables.irradiance.extent())?)?;
        obj.insert("scattering", Self::extent_json(tables.scattering.extent())?)?;
        Ok(obj)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector4;

    fn ramp(label: &str, extent: Extent) -> Table {
        let mut table = Table::new(label, extent);
        table.dispatch(|c| Vector4::new(c.x as f64, c.y as f64, c.z as f64, 0.5));
        table
    }

    fn small_params() -> AtmosphereParameters {
        AtmosphereParameters {
            transmittance_mu_size: 5,
            transmittance_r_size: 3,
            irradiance_mu_s_size: 4,
            irradiance_r_size: 2,
            scattering_nu_size: 2,
            scattering_mu_s_size: 3,
            scattering_mu_size: 4,
            scattering_r_size: 2,
            ..AtmosphereParameters::earth()
        }
    }

    fn small_tables(params: &AtmosphereParameters) -> AtmosphereTables {
        let (width, height) = params.transmittance_extent();
        let (mu_s, r) = params.irradiance_extent();
        let (nu_mu_s, mu, r3) = params.scattering_extent();
        AtmosphereTables {
            transmittance: ramp("transmittance", Extent::new_2d(width, height)),
            irradiance: ramp("irradiance", Extent::new_2d(mu_s, r)),
            scattering: ramp("scattering", Extent::new_3d(nu_mu_s, mu, r3)),
        }
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let directory = std::env::temp_dir().join("atmosphere-table-helpers-round-trip");
        let params = small_params();
        let tables = small_tables(&params);
        TableHelpers::write_tables(&directory, &params, &tables)?;
        let loaded = TableHelpers::read_tables(&directory, &params)?;
        assert_eq!(loaded, tables);
        Ok(())
    }

    #[test]
    fn test_read_rejects_other_atmospheres() -> Result<()> {
        let directory = std::env::temp_dir().join("atmosphere-table-helpers-mismatch");
        let written = AtmosphereParameters {
            top_radius: 6_500.,
            mie_phase_function_g: 0.3,
            ..small_params()
        };
        TableHelpers::write_tables(&directory, &written, &small_tables(&written))?;
        assert!(TableHelpers::read_tables(&directory, &written).is_ok());

        assert!(TableHelpers::read_tables(&directory, &small_params()).is_err());
        for requested in [
            AtmosphereParameters {
                mie_phase_function_g: 0.8,
                ..written.clone()
            },
            AtmosphereParameters {
                bottom_radius: 6_300.,
                ..written.clone()
            },
            AtmosphereParameters {
                mu_s_min: -0.5,
                ..written.clone()
            },
            AtmosphereParameters {
                scattering_orders: written.scattering_orders + 1,
                ..written.clone()
            },
            AtmosphereParameters {
                scattering_mu_size: 6,
                ..written.clone()
            },
        ] {
            assert!(TableHelpers::read_tables(&directory, &requested).is_err());
        }
        Ok(())
    }

    #[test]
    fn test_rejects_truncated_data() {
        let table = ramp("short", Extent::new_2d(3, 3));
        let mut data = TableHelpers::table_to_bytes(&table);
        data.pop();
        assert!(TableHelpers::table_from_bytes("short", table.extent(), &data).is_err());
    }
}
