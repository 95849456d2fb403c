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
use approx::assert_relative_eq;
use atmosphere::{
    compute_direct_irradiance, AtmosphereParameters, AtmosphereTables, Precompute, SkyRenderer,
    MIE_SCALE_HEIGHT_KM, RAYLEIGH_SCALE_HEIGHT_KM,
};
use nalgebra::{Point3, Vector3};

// Simplified for speed.
fn reduced_params(scattering_orders: usize) -> AtmosphereParameters {
    AtmosphereParameters {
        scattering_orders,
        transmittance_mu_size: 64,
        transmittance_r_size: 16,
        scattering_r_size: 8,
        scattering_mu_size: 32,
        scattering_mu_s_size: 8,
        scattering_nu_size: 2,
        irradiance_mu_s_size: 16,
        irradiance_r_size: 8,
        ..AtmosphereParameters::earth()
    }
}

fn build(params: &AtmosphereParameters) -> Result<AtmosphereTables> {
    Precompute::new(params.to_owned())?.build_tables()
}

#[test]
fn test_rebuild_is_identical() -> Result<()> {
    let params = reduced_params(2);
    let first = build(&params)?;
    let second = build(&params)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_pipeline() -> Result<()> {
    let params = reduced_params(4);
    let tables = build(&params)?;
    let renderer = SkyRenderer::new(&params, &tables);
    let ground = params.bottom_radius;

    // Earth's zenith transmittance against the closed form optical depth.
    let height = params.top_radius - params.bottom_radius;
    let column = |scale: f64| scale * (1. - (-height / scale).exp());
    let expect = (params.rayleigh_scattering * column(RAYLEIGH_SCALE_HEIGHT_KM)
        + params.mie_extinction * column(MIE_SCALE_HEIGHT_KM)
        + params.absorption_extinction * 15.)
        .map(|tau| (-tau).exp());
    let zenith =
        params.transmittance_to_top_atmosphere_boundary(&tables.transmittance, ground, 1.);
    assert_relative_eq!(zenith, expect, epsilon = 1e-3);
    assert!(zenith.x > zenith.z);
    assert!(zenith.z > 0.7 && zenith.z < 0.8);

    // Transmittance never grows with path length.
    let mut prior = Vector3::repeat(1.);
    for i in 0..=50 {
        let mu = 1. - i as f64 / 50.;
        let t = params.transmittance_to_top_atmosphere_boundary(&tables.transmittance, ground, mu);
        for c in 0..3 {
            assert!(t[c] <= prior[c] + 1e-6);
        }
        prior = t;
    }
    let mut prior = Vector3::repeat(1.);
    for d in [0., 5., 10., 20., 40., 59.] {
        let t = params.transmittance(
            &tables.transmittance,
            ground,
            1.,
            d,
            params.ray_target(ground, 1.),
        );
        for c in 0..3 {
            assert!(t[c] <= prior[c] + 1e-6);
        }
        prior = t;
    }

    // A sun fully below the horizon contributes nothing directly.
    for r in [ground, ground + 10., params.top_radius] {
        let below = -params.sun_angular_radius - 1e-4;
        assert_eq!(
            compute_direct_irradiance(&params, &tables.transmittance, r, below),
            Vector3::zeros()
        );
    }

    // Looking away from the planet from far out in space.
    let camera = Point3::new(0., 0., 2. * params.top_radius);
    let sky = renderer.sky_radiance(&camera, &Vector3::z(), &Vector3::y());
    assert_eq!(sky.radiance, Vector3::zeros());
    assert_eq!(sky.transmittance, Vector3::repeat(1.));

    // A morning sky is blue and lets the red through best.
    let camera = Point3::new(0., 0., ground + 0.1);
    let morning = Vector3::new(1., 0., 1.).normalize();
    let sky = renderer.sky_radiance(&camera, &Vector3::z(), &morning);
    assert!(sky.radiance.z > sky.radiance.x);
    assert!(sky.radiance.x > 0.);
    assert!(sky.transmittance.x > sky.transmittance.z);

    // A ray into the ground is opaque.
    let sky = renderer.sky_radiance(&camera, &-Vector3::z(), &Vector3::z());
    assert_eq!(sky.transmittance, Vector3::zeros());

    // Aerial perspective to a nearby point is weaker than the whole sky.
    let view = Vector3::new(1., 0., 0.1).normalize();
    let point = camera + view * 2.;
    let near = renderer.sky_radiance_to_point(&camera, &view, &point, &Vector3::z());
    let far = renderer.sky_radiance(&camera, &view, &Vector3::z());
    assert!(near.radiance.z < far.radiance.z);
    assert!(near.transmittance.z > far.transmittance.z);

    // Noon lights the ground from the sun and the sky; midnight does not.
    let surface = Point3::new(0., 0., ground);
    let noon = renderer.sun_and_sky_irradiance(&surface, &Vector3::z(), &Vector3::z());
    assert!(noon.sun.x > noon.sky.x);
    assert!(noon.sky.z > 0.);
    let midnight = renderer.sun_and_sky_irradiance(&surface, &Vector3::z(), &-Vector3::z());
    assert_eq!(midnight.sun, Vector3::zeros());
    Ok(())
}
