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
use anyhow::{anyhow, Result};
use atmosphere::{
    AtmosphereParameters, AtmosphereTables, DrawParameters, Precompute, PrecomputeOpts,
    SkyRenderer, TableHelpers,
};
use geometry::{intersect::sphere_vs_ray, Ray, Sphere};
use log::info;
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use rayon::prelude::*;
use std::{f64::consts::PI, path::PathBuf, time::Instant};
use structopt::StructOpt;
use tracelog::{TraceLog, TraceLogOpts};

/// Render a view of the sky from precomputed atmosphere tables
#[derive(Debug, StructOpt)]
struct Opt {
    /// The png file to write
    #[structopt(short, long, default_value = "sky.png")]
    output: PathBuf,

    /// Load tables written by dump-atmosphere-tables instead of building
    /// them; the precompute options must match the ones they were built with
    #[structopt(long)]
    tables: Option<PathBuf>,

    #[structopt(long, default_value = "640")]
    width: u32,

    #[structopt(long, default_value = "360")]
    height: u32,

    /// Vertical field of view, in degrees
    #[structopt(long, default_value = "90")]
    fov: f64,

    /// Camera height above the ground, in kilometers
    #[structopt(long, default_value = "0.5")]
    altitude: f64,

    /// Camera pitch above the horizon, in degrees
    #[structopt(long, default_value = "20")]
    pitch: f64,

    /// Sun elevation above the horizon, in degrees
    #[structopt(long, default_value = "10")]
    sun_elevation: f64,

    /// Sun azimuth relative to the view direction, in degrees
    #[structopt(long, default_value = "0")]
    sun_azimuth: f64,

    #[structopt(long, default_value = "10")]
    exposure: f64,

    #[structopt(flatten)]
    precompute: PrecomputeOpts,

    #[structopt(flatten)]
    tracelog: TraceLogOpts,
}

const WHITE_POINT: [f64; 3] = [1., 1., 1.];

fn load_tables(opt: &Opt, params: &AtmosphereParameters) -> Result<AtmosphereTables> {
    match &opt.tables {
        Some(directory) => TableHelpers::read_tables(directory, params),
        None => Precompute::new(params.to_owned())?.build_tables(),
    }
}

fn draw_parameters(opt: &Opt, params: &AtmosphereParameters) -> Result<DrawParameters> {
    let camera = Point3::new(0., 0., params.bottom_radius + opt.altitude);
    let pitch = opt.pitch.to_radians();
    let target = camera + Vector3::new(pitch.cos(), 0., pitch.sin());
    let view = Matrix4::look_at_rh(&camera, &target, &Vector3::z());
    let aspect = opt.width as f64 / opt.height as f64;
    let projection = Perspective3::new(aspect, opt.fov.to_radians(), 0.001, 100.).to_homogeneous();
    let inverse_viewproj = (projection * view)
        .try_inverse()
        .ok_or_else(|| anyhow!("degenerate camera"))?;
    let (elevation, azimuth) = (opt.sun_elevation.to_radians(), opt.sun_azimuth.to_radians());
    let sun_direction = Vector3::new(
        elevation.cos() * azimuth.cos(),
        elevation.cos() * azimuth.sin(),
        elevation.sin(),
    );
    Ok(DrawParameters::new(
        params,
        camera,
        inverse_viewproj,
        sun_direction,
    ))
}

// Radiance along one view ray: the lit ground seen through the atmosphere
// if the ray hits it, otherwise the sky and the sun disk.
fn shade(
    renderer: &SkyRenderer,
    params: &AtmosphereParameters,
    draw: &DrawParameters,
    view_ray: &Vector3<f64>,
) -> Vector3<f64> {
    let camera = &draw.camera_position;
    let sun = &draw.sun_direction;
    let ground = Ray::new(*camera, *view_ray);
    let ground_hit = sphere_vs_ray(&Sphere::from_radius(params.bottom_radius), &ground)
        .and_then(|hit| hit.first_point_ahead(&ground));
    if let Some(point) = ground_hit {
        let normal = point.coords.normalize();
        let irradiance = renderer.sun_and_sky_irradiance(&point, &normal, sun);
        let reflected = params
            .ground_albedo
            .component_mul(&(irradiance.sun + irradiance.sky))
            / PI;
        let aerial = renderer.sky_radiance_to_point(camera, view_ray, &point, sun);
        return reflected.component_mul(&aerial.transmittance) + aerial.radiance;
    }

    let sky = renderer.sky_radiance(camera, view_ray, sun);
    let mut radiance = sky.radiance;
    if view_ray.dot(sun) > params.sun_angular_radius.cos() {
        let sun_radiance = draw.solar_irradiance / (PI * params.sun_angular_radius.powi(2));
        radiance += sun_radiance.component_mul(&sky.transmittance);
    }
    radiance
}

fn tonemap(radiance: &Vector3<f64>, exposure: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for (i, channel) in out.iter_mut().enumerate() {
        let mapped = (1. - (-radiance[i] / WHITE_POINT[i] * exposure).exp()).powf(1. / 2.2);
        *channel = if mapped.is_nan() {
            0
        } else {
            (mapped.clamp(0., 1.) * 255.) as u8
        };
    }
    out
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let _trace = TraceLog::init(&opt.tracelog)?;

    let params = opt.precompute.parameters()?;
    let tables = load_tables(&opt, &params)?;
    let draw = draw_parameters(&opt, &params)?;
    let renderer = SkyRenderer::new(&params, &tables).with_draw_parameters(&draw);

    let render_start = Instant::now();
    let (width, height) = (opt.width as usize, opt.height as usize);
    let mut pixels = vec![0u8; width * height * 3];
    pixels
        .par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            let ndc_y = 1. - 2. * (y as f64 + 0.5) / height as f64;
            for (x, pixel) in row.chunks_mut(3).enumerate() {
                let ndc_x = 2. * (x as f64 + 0.5) / width as f64 - 1.;
                let view_ray = draw.view_ray(ndc_x, ndc_y);
                let radiance = shade(&renderer, &params, &draw, &view_ray);
                pixel.copy_from_slice(&tonemap(&radiance, opt.exposure));
            }
        });
    info!("Render time: {:?}", render_start.elapsed());

    image::RgbImage::from_raw(opt.width, opt.height, pixels)
        .ok_or_else(|| anyhow!("image buffer does not match {}x{}", width, height))?
        .save(&opt.output)?;
    info!("wrote {}", opt.output.display());
    Ok(())
}
