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
    mapping::ViewGeometry,
    math::{clamp_cosine, mie_phase_function, rayleigh_phase_function, smoothstep},
    parameters::AtmosphereParameters,
    precompute::AtmosphereTables,
};
use geometry::{intersect::sphere_vs_ray, Ray, Sphere};
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// The per-frame inputs to sky reconstruction. Positions are in kilometers
/// in a planet-centered frame.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawParameters {
    pub camera_position: Point3<f64>,
    pub inverse_viewproj: Matrix4<f64>,
    pub sun_direction: Vector3<f64>,
    pub mie_phase_function_g: f64,
    pub solar_irradiance: Vector3<f64>,
}

impl DrawParameters {
    pub fn new(
        params: &AtmosphereParameters,
        camera_position: Point3<f64>,
        inverse_viewproj: Matrix4<f64>,
        sun_direction: Vector3<f64>,
    ) -> Self {
        Self {
            camera_position,
            inverse_viewproj,
            sun_direction: sun_direction.normalize(),
            mie_phase_function_g: params.mie_phase_function_g,
            solar_irradiance: params.solar_irradiance,
        }
    }

    /// World space direction through the given normalized device
    /// coordinate, found by un-projecting a point on the far plane.
    pub fn view_ray(&self, ndc_x: f64, ndc_y: f64) -> Vector3<f64> {
        let far = self.inverse_viewproj * Vector4::new(ndc_x, ndc_y, 1., 1.);
        let far = Point3::from(far.xyz() / far.w);
        (far - self.camera_position).normalize()
    }
}

/// Radiance arriving at the camera along a view ray, and the fraction of
/// light from behind the ray's end that still gets through.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyRadiance {
    pub radiance: Vector3<f64>,
    pub transmittance: Vector3<f64>,
}

impl SkyRadiance {
    fn empty_space() -> Self {
        Self {
            radiance: Vector3::zeros(),
            transmittance: Vector3::repeat(1.),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunAndSkyIrradiance {
    pub sun: Vector3<f64>,
    pub sky: Vector3<f64>,
}

// The view variables shared by both radiance queries, with a camera in
// space already moved onto the top of the atmosphere.
struct ViewSetup {
    camera: Point3<f64>,
    geometry: ViewGeometry,
}

/// Reconstructs sky radiance and ground irradiance from finished tables.
/// Holds no mutable state, so one renderer serves any number of threads.
#[derive(Clone, Copy, Debug)]
pub struct SkyRenderer<'a> {
    params: &'a AtmosphereParameters,
    tables: &'a AtmosphereTables,
    mie_phase_function_g: f64,
    solar_irradiance: Vector3<f64>,
}

impl<'a> SkyRenderer<'a> {
    pub fn new(params: &'a AtmosphereParameters, tables: &'a AtmosphereTables) -> Self {
        Self {
            params,
            tables,
            mie_phase_function_g: params.mie_phase_function_g,
            solar_irradiance: params.solar_irradiance,
        }
    }

    /// Take the per-draw phase asymmetry and solar irradiance.
    pub fn with_draw_parameters(mut self, draw: &DrawParameters) -> Self {
        self.mie_phase_function_g = draw.mie_phase_function_g;
        self.solar_irradiance = draw.solar_irradiance;
        self
    }

    fn view_setup(
        &self,
        camera: &Point3<f64>,
        view_ray: &Vector3<f64>,
        sun_direction: &Vector3<f64>,
    ) -> Option<ViewSetup> {
        let top_radius = self.params.top_radius;
        let mut camera = *camera;
        let mut r = camera.coords.norm();
        if r > top_radius {
            let ray = Ray::new(camera, *view_ray);
            let hit = sphere_vs_ray(&Sphere::from_radius(top_radius), &ray)?;
            if hit.near() <= 0. {
                return None;
            }
            camera = ray.point_at(hit.near());
            r = top_radius;
        }
        let mu = clamp_cosine(camera.coords.dot(view_ray) / r);
        Some(ViewSetup {
            camera,
            geometry: ViewGeometry {
                r,
                mu,
                mu_s: clamp_cosine(camera.coords.dot(sun_direction) / r),
                nu: clamp_cosine(view_ray.dot(sun_direction)),
                target: self.params.ray_target(r, mu),
            },
        })
    }

    /// Rayleigh (plus multiple) scattering and the Mie spectrum rebuilt from
    /// its stored red channel.
    fn combined_scattering(&self, geometry: &ViewGeometry) -> (Vector3<f64>, Vector3<f64>) {
        let combined = self.params.scattering(&self.tables.scattering, geometry);
        (combined.xyz(), self.extrapolated_single_mie_scattering(&combined))
    }

    /// Mie scattering is assumed proportional to Rayleigh across bands, so
    /// its full spectrum follows from the red channel.
    pub fn extrapolated_single_mie_scattering(&self, scattering: &Vector4<f64>) -> Vector3<f64> {
        // Rounding can drive very short rays slightly negative.
        if scattering.x <= 0. {
            return Vector3::zeros();
        }
        let params = self.params;
        let ratio = params
            .mie_scattering
            .component_div(&params.rayleigh_scattering);
        (scattering.xyz() * scattering.w / scattering.x
            * (params.rayleigh_scattering.x / params.mie_scattering.x))
            .component_mul(&ratio)
    }

    fn phased(&self, nu: f64, scattering: &Vector3<f64>, single_mie: &Vector3<f64>) -> Vector3<f64> {
        scattering * rayleigh_phase_function(nu)
            + single_mie * mie_phase_function(self.mie_phase_function_g, nu)
    }

    /// Radiance along a view ray that runs out of the atmosphere or into the
    /// ground, with the transmittance of the full ray.
    pub fn sky_radiance(
        &self,
        camera: &Point3<f64>,
        view_ray: &Vector3<f64>,
        sun_direction: &Vector3<f64>,
    ) -> SkyRadiance {
        let view_ray = view_ray.normalize();
        let sun_direction = sun_direction.normalize();
        let ViewSetup { geometry, .. } = match self.view_setup(camera, &view_ray, &sun_direction) {
            Some(setup) => setup,
            None => return SkyRadiance::empty_space(),
        };
        let transmittance = if geometry.target.hits_ground() {
            Vector3::zeros()
        } else {
            self.params.transmittance_to_top_atmosphere_boundary(
                &self.tables.transmittance,
                geometry.r,
                geometry.mu,
            )
        };
        // Light shafts are not supported: the shadow length is always zero.
        let (scattering, single_mie) = self.combined_scattering(&geometry);
        SkyRadiance {
            radiance: self.phased(geometry.nu, &scattering, &single_mie),
            transmittance,
        }
    }

    /// Radiance scattered between the camera and `point`, found as the
    /// difference between the scattering of the ray from the camera and
    /// the attenuated scattering of the same ray continued from `point`.
    pub fn sky_radiance_to_point(
        &self,
        camera: &Point3<f64>,
        view_ray: &Vector3<f64>,
        point: &Point3<f64>,
        sun_direction: &Vector3<f64>,
    ) -> SkyRadiance {
        let view_ray = view_ray.normalize();
        let sun_direction = sun_direction.normalize();
        let ViewSetup { camera, geometry } =
            match self.view_setup(camera, &view_ray, &sun_direction) {
                Some(setup) => setup,
                None => return SkyRadiance::empty_space(),
            };
        let ViewGeometry {
            r,
            mu,
            mu_s,
            nu,
            target,
        } = geometry;
        let d = (point - camera).norm();
        let transmittance =
            self.params
                .transmittance(&self.tables.transmittance, r, mu, d, target);
        let (mut scattering, mut single_mie) = self.combined_scattering(&geometry);

        if d.is_finite() {
            let r_p = self
                .params
                .clamp_radius((d * d + 2. * r * mu * d + r * r).sqrt());
            let point_geometry = ViewGeometry {
                r: r_p,
                mu: clamp_cosine((r * mu + d) / r_p),
                mu_s: clamp_cosine((r * mu_s + d * nu) / r_p),
                nu,
                target,
            };
            let (scattering_p, single_mie_p) = self.combined_scattering(&point_geometry);
            let shadow_transmittance = transmittance;
            scattering -= shadow_transmittance.component_mul(&scattering_p);
            single_mie -= shadow_transmittance.component_mul(&single_mie_p);
            single_mie = self.extrapolated_single_mie_scattering(&scattering.push(single_mie.x));
            // Suppress Mie artifacts while the sun is below the horizon.
            single_mie *= smoothstep(0., 0.01, mu_s);
        }

        SkyRadiance {
            radiance: self.phased(nu, &scattering, &single_mie),
            transmittance,
        }
    }

    /// Irradiance on a surface at `point` facing `normal`: direct sunlight,
    /// and skylight approximated from the horizontal-surface table.
    pub fn sun_and_sky_irradiance(
        &self,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        sun_direction: &Vector3<f64>,
    ) -> SunAndSkyIrradiance {
        let params = self.params;
        let r = point.coords.norm();
        let mu_s = clamp_cosine(point.coords.dot(sun_direction) / r);
        let sky = params.irradiance(&self.tables.irradiance, params.clamp_radius(r), mu_s)
            * ((1. + normal.dot(&point.coords) / r) * 0.5);
        let sun = self.solar_irradiance.component_mul(&params.transmittance_to_sun(
            &self.tables.transmittance,
            params.clamp_radius(r),
            mu_s,
        )) * normal.dot(sun_direction).max(0.);
        SunAndSkyIrradiance { sun, sky }
    }
}
