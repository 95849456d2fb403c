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
mod direct_irradiance;
mod indirect_irradiance;
mod multiple_scattering;
mod scattering_density;
mod single_scattering;
mod transmittance;

pub use crate::precompute::{
    direct_irradiance::compute_direct_irradiance,
    indirect_irradiance::compute_indirect_irradiance,
    multiple_scattering::compute_multiple_scattering,
    scattering_density::compute_scattering_density,
    single_scattering::{
        compute_single_scattering, compute_single_scattering_integrand, SingleScattering,
    },
    transmittance::{
        compute_optical_length_to_top_atmosphere_boundary,
        compute_transmittance_to_top_atmosphere_boundary,
    },
};

use crate::{
    dump::TableDumper,
    mapping::ViewGeometry,
    math::{mie_phase_function, rayleigh_phase_function},
    parameters::AtmosphereParameters,
    table::Table,
};
use anyhow::Result;
use log::{debug, info, trace};
use nalgebra::Vector3;
use std::{mem, path::PathBuf, time::Instant};
use tracing::info_span;

/// The finished tables: everything the renderer needs.
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereTables {
    /// Transmittance to the top of the atmosphere, indexed by (mu, r).
    pub transmittance: Table,
    /// Sky irradiance on the ground, indexed by (mu_s, r).
    pub irradiance: Table,
    /// Rayleigh plus multiple scattering in rgb, single Mie red in alpha,
    /// indexed by (nu * mu_s, mu, r).
    pub scattering: Table,
}

/// Radiance of one scattering order, as consumed by the next order.
#[derive(Debug)]
pub enum DeltaScattering {
    /// First order: Rayleigh and Mie kept apart, phase functions not applied.
    Single { rayleigh: Table, mie: Table },
    /// Higher orders: phase functions already applied.
    Multiple(Table),
}

impl DeltaScattering {
    pub fn radiance(&self, params: &AtmosphereParameters, geometry: &ViewGeometry) -> Vector3<f64> {
        match self {
            Self::Single { rayleigh, mie } => {
                let rayleigh = params.scattering(rayleigh, geometry).xyz();
                let mie = params.scattering(mie, geometry).xyz();
                rayleigh * rayleigh_phase_function(geometry.nu)
                    + mie * mie_phase_function(params.mie_phase_function_g, geometry.nu)
            }
            Self::Multiple(multiple) => params.scattering(multiple, geometry).xyz(),
        }
    }

    // Reuse a spent order's storage for the next multiple scattering delta.
    fn into_multiple_table(self) -> Table {
        match self {
            Self::Single { rayleigh, .. } => rayleigh,
            Self::Multiple(multiple) => multiple,
        }
    }
}

// The previous order's side of the per-order double buffer.
struct OrderTables {
    scattering: DeltaScattering,
    irradiance: Table,
}

/// Builds every table for one set of atmosphere parameters.
#[derive(Clone, Debug)]
pub struct Precompute {
    params: AtmosphereParameters,
    dump_directory: Option<PathBuf>,
}

impl Precompute {
    pub fn new(params: AtmosphereParameters) -> Result<Self> {
        params.validate()?;
        trace!("Precompute::new");
        Ok(Self {
            params,
            dump_directory: None,
        })
    }

    /// Write PNG previews of every intermediate table into `directory`.
    pub fn with_dump_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.dump_directory = Some(directory.into());
        self
    }

    pub fn params(&self) -> &AtmosphereParameters {
        &self.params
    }

    fn dump(&self, table: &Table) -> Result<()> {
        if let Some(directory) = &self.dump_directory {
            TableDumper::new(directory).dump(table)?;
        }
        Ok(())
    }

    fn timed<T>(&self, pass: &str, f: impl FnOnce() -> T) -> T {
        let _span = info_span!("atmosphere-precompute", pass).entered();
        let start = Instant::now();
        let out = f();
        debug!("{:<24}: {:?}", pass, start.elapsed());
        out
    }

    pub fn build_tables(&self) -> Result<AtmosphereTables> {
        let precompute_start = Instant::now();
        let params = &self.params;

        let mut transmittance = Table::new_2d("transmittance", params.transmittance_extent());
        self.timed("transmittance", || {
            transmittance::build_transmittance(params, &mut transmittance)
        });
        self.dump(&transmittance)?;

        let mut direct_irradiance = Table::new_2d("direct-irradiance", params.irradiance_extent());
        self.timed("direct-irradiance", || {
            direct_irradiance::build_direct_irradiance(
                params,
                &transmittance,
                &mut direct_irradiance,
            )
        });
        self.dump(&direct_irradiance)?;

        let mut delta_rayleigh = Table::new_3d("delta-rayleigh", params.scattering_extent());
        let mut delta_mie = Table::new_3d("delta-mie", params.scattering_extent());
        let mut scattering = Table::new_3d("scattering", params.scattering_extent());
        self.timed("single-scattering", || {
            single_scattering::build_single_scattering(
                params,
                &transmittance,
                &mut delta_rayleigh,
                &mut delta_mie,
                &mut scattering,
            )
        });
        self.dump(&delta_rayleigh)?;
        self.dump(&delta_mie)?;

        // Direct irradiance only seeds the ground bounce of the second order.
        let mut irradiance = Table::new_2d("irradiance", params.irradiance_extent());
        let mut previous = OrderTables {
            scattering: DeltaScattering::Single {
                rayleigh: delta_rayleigh,
                mie: delta_mie,
            },
            irradiance: direct_irradiance,
        };
        let mut current_scattering =
            Table::new_3d("delta-multiple-scattering", params.scattering_extent());
        let mut current_irradiance = Table::new_2d("delta-irradiance", params.irradiance_extent());
        let mut density = Table::new_3d("scattering-density", params.scattering_extent());

        for scattering_order in 2..=params.scattering_orders {
            self.timed("scattering-density", || {
                scattering_density::build_scattering_density(
                    params,
                    &transmittance,
                    &previous.scattering,
                    &previous.irradiance,
                    &mut density,
                )
            });
            self.dump_order(&density, scattering_order)?;

            self.timed("multiple-scattering", || {
                multiple_scattering::build_multiple_scattering(
                    params,
                    &transmittance,
                    &density,
                    &mut current_scattering,
                    &mut scattering,
                )
            });
            self.dump_order(&current_scattering, scattering_order)?;

            // The sky lit by the previous order lights the ground.
            self.timed("indirect-irradiance", || {
                indirect_irradiance::build_indirect_irradiance(
                    params,
                    &previous.scattering,
                    &mut current_irradiance,
                    &mut irradiance,
                )
            });
            self.dump_order(&current_irradiance, scattering_order - 1)?;

            // Swap: this order becomes the previous one and the spent
            // previous order's storage is recycled for the next.
            let spent = mem::replace(
                &mut previous,
                OrderTables {
                    scattering: DeltaScattering::Multiple(current_scattering),
                    irradiance: current_irradiance,
                },
            );
            current_scattering = spent.scattering.into_multiple_table();
            current_scattering.set_label("delta-multiple-scattering");
            current_irradiance = spent.irradiance;
            current_irradiance.set_label("delta-irradiance");
        }

        self.dump(&scattering)?;
        self.dump(&irradiance)?;
        info!(
            "atmosphere precompute with {} scattering orders: {:?}",
            params.scattering_orders,
            precompute_start.elapsed()
        );
        Ok(AtmosphereTables {
            transmittance,
            irradiance,
            scattering,
        })
    }

    fn dump_order(&self, table: &Table, order: usize) -> Result<()> {
        if self.dump_directory.is_some() {
            let mut table = table.clone();
            table.set_label(&format!("{}-order{}", table.label(), order));
            self.dump(&table)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tiny_params(scattering_orders: usize) -> AtmosphereParameters {
        AtmosphereParameters {
            scattering_orders,
            transmittance_mu_size: 32,
            transmittance_r_size: 8,
            scattering_r_size: 4,
            scattering_mu_size: 8,
            scattering_mu_s_size: 4,
            scattering_nu_size: 2,
            irradiance_mu_s_size: 8,
            irradiance_r_size: 4,
            ..AtmosphereParameters::earth()
        }
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let params = AtmosphereParameters {
            scattering_mu_s_size: 1,
            ..AtmosphereParameters::earth()
        };
        assert!(Precompute::new(params).is_err());
    }

    #[test]
    fn test_single_order_has_no_sky_irradiance() -> Result<()> {
        let tables = Precompute::new(tiny_params(1))?.build_tables()?;
        assert!(tables.irradiance.texels().iter().all(|t| *t == [0f32; 4]));
        assert!(tables.scattering.range().1 > 0.);
        Ok(())
    }

    #[test]
    fn test_higher_orders_add_light() -> Result<()> {
        let single = Precompute::new(tiny_params(1))?.build_tables()?;
        let multiple = Precompute::new(tiny_params(3))?.build_tables()?;
        assert_eq!(single.transmittance, multiple.transmittance);
        for (one, three) in single
            .scattering
            .texels()
            .iter()
            .zip(multiple.scattering.texels())
        {
            for c in 0..3 {
                assert!(three[c] >= one[c]);
            }
            // Mie is only tracked for the first order.
            assert_eq!(three[3], one[3]);
        }
        assert!(multiple.irradiance.range().1 > 0.);
        Ok(())
    }
}
