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
use anyhow::Result;
use atmosphere::{Precompute, PrecomputeOpts, TableHelpers};
use log::info;
use std::{path::PathBuf, time::Instant};
use structopt::StructOpt;
use tracelog::{TraceLog, TraceLogOpts};

/// Precompute the atmosphere tables and write them to disk
#[derive(Debug, StructOpt)]
struct Opt {
    /// Directory to write the finished tables into
    #[structopt(short, long)]
    output: PathBuf,

    /// Also write a tone-mapped png of every intermediate table here
    #[structopt(long)]
    dump: Option<PathBuf>,

    #[structopt(flatten)]
    precompute: PrecomputeOpts,

    #[structopt(flatten)]
    tracelog: TraceLogOpts,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let _trace = TraceLog::init(&opt.tracelog)?;

    let mut precompute = Precompute::new(opt.precompute.parameters()?)?;
    if let Some(directory) = opt.dump {
        precompute = precompute.with_dump_directory(directory);
    }

    let precompute_start = Instant::now();
    let tables = precompute.build_tables()?;
    info!("Precompute time: {:?}", precompute_start.elapsed());

    let write_start = Instant::now();
    TableHelpers::write_tables(&opt.output, precompute.params(), &tables)?;
    info!("Write time: {:?}", write_start.elapsed());

    Ok(())
}
