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
use nalgebra::{Vector3, Vector4};
use log::error;
use rayon::prelude::*;

// Invocations are grouped the same way a compute dispatch would group them.
pub const BLOCK_SIZE: usize = 8;

pub type Texel = [f32; 4];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Extent {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Extent {
    pub fn new_2d(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            depth: 1,
        }
    }

    pub fn new_3d(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    pub fn texel_count(&self) -> usize {
        self.width * self.height * self.depth
    }

    /// Number of workgroups along x and y needed to cover the extent.
    pub fn workgroups(&self) -> (usize, usize) {
        (
            (self.width + BLOCK_SIZE - 1) / BLOCK_SIZE,
            (self.height + BLOCK_SIZE - 1) / BLOCK_SIZE,
        )
    }

    pub fn contains(&self, coord: TexelCoord) -> bool {
        coord.x < self.width && coord.y < self.height && coord.z < self.depth
    }

    // Texels per parallel task: a row of workgroups for flat tables, a
    // whole z-slice for volumes.
    fn band_len(&self) -> usize {
        if self.depth == 1 {
            self.width * BLOCK_SIZE.min(self.height)
        } else {
            self.width * self.height
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct TexelCoord {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl TexelCoord {
    /// The fragment coordinate at the center of this texel.
    pub fn frag_coord(&self) -> Vector3<f64> {
        Vector3::new(
            self.x as f64 + 0.5,
            self.y as f64 + 0.5,
            self.z as f64 + 0.5,
        )
    }
}

/// An RGBA f32 grid, stored x-fastest, that behaves like a float texture:
/// written by exactly one pass and sampled with linear filtering and
/// clamp-to-edge addressing.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    label: String,
    extent: Extent,
    texels: Vec<Texel>,
}

impl Table {
    pub fn new(label: &str, extent: Extent) -> Self {
        Self {
            label: label.to_owned(),
            extent,
            texels: vec![[0f32; 4]; extent.texel_count()],
        }
    }

    pub fn new_2d(label: &str, (width, height): (usize, usize)) -> Self {
        Self::new(label, Extent::new_2d(width, height))
    }

    pub fn new_3d(label: &str, (width, height, depth): (usize, usize, usize)) -> Self {
        Self::new(label, Extent::new_3d(width, height, depth))
    }

    pub fn from_texels(label: &str, extent: Extent, texels: Vec<Texel>) -> Option<Self> {
        if texels.len() != extent.texel_count() {
            return None;
        }
        Some(Self {
            label: label.to_owned(),
            extent,
            texels,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: &str) {
        self.label = label.to_owned();
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.extent.height + y) * self.extent.width + x
    }

    pub fn texel(&self, coord: TexelCoord) -> Vector4<f64> {
        widen(&self.texels[self.index(coord.x, coord.y, coord.z)])
    }

    /// Run `kernel` once for every texel, replacing its contents. Every
    /// invocation is independent, so bands of texels are spread across the
    /// thread pool; the call returns only once every texel has been written.
    pub fn dispatch<F>(&mut self, kernel: F)
    where
        F: Fn(TexelCoord) -> Vector4<f64> + Sync,
    {
        self.dispatch_update(|coord, _| kernel(coord));
    }

    /// As `dispatch`, but the kernel also receives the texel's prior
    /// contents, for passes that accumulate.
    pub fn dispatch_update<F>(&mut self, kernel: F)
    where
        F: Fn(TexelCoord, Vector4<f64>) -> Vector4<f64> + Sync,
    {
        let extent = self.extent;
        let band_len = extent.band_len();
        if band_len == 0 {
            return;
        }
        self.texels
            .par_chunks_mut(band_len)
            .enumerate()
            .for_each(|(band, texels)| {
                for_each_invocation(extent, band, |coord, offset| {
                    let texel = &mut texels[offset];
                    *texel = narrow(&kernel(coord, widen(texel)));
                });
            });
    }

    /// Run a kernel that produces two outputs per texel, writing the first
    /// into `self` and the second into `other`. Both tables must share an
    /// extent.
    pub fn dispatch_pair<F>(&mut self, other: &mut Table, kernel: F)
    where
        F: Fn(TexelCoord) -> (Vector4<f64>, Vector4<f64>) + Sync,
    {
        let extent = self.extent;
        debug_assert_eq!(
            other.extent, extent,
            "paired dispatch over {} and {}",
            self.label, other.label
        );
        if other.extent != extent {
            error!(
                "skipped paired dispatch: {} is {:?} but {} is {:?}",
                self.label, extent, other.label, other.extent
            );
            return;
        }
        let band_len = extent.band_len();
        if band_len == 0 {
            return;
        }
        self.texels
            .par_chunks_mut(band_len)
            .zip(other.texels.par_chunks_mut(band_len))
            .enumerate()
            .for_each(|(band, (first, second))| {
                for_each_invocation(extent, band, |coord, offset| {
                    let (a, b) = kernel(coord);
                    first[offset] = narrow(&a);
                    second[offset] = narrow(&b);
                });
            });
    }

    pub fn sample_2d(&self, u: f64, v: f64) -> Vector4<f64> {
        let (x0, x1, fx) = linear_taps(u, self.extent.width);
        let (y0, y1, fy) = linear_taps(v, self.extent.height);
        let row0 = self.lerp_x(x0, x1, fx, y0, 0);
        let row1 = self.lerp_x(x0, x1, fx, y1, 0);
        row0.lerp(&row1, fy)
    }

    /// Trilinear sample at normalized coordinates.
    pub fn sample_3d(&self, u: f64, v: f64, w: f64) -> Vector4<f64> {
        let (x0, x1, fx) = linear_taps(u, self.extent.width);
        let (y0, y1, fy) = linear_taps(v, self.extent.height);
        let (z0, z1, fz) = linear_taps(w, self.extent.depth);
        let slice0 = self
            .lerp_x(x0, x1, fx, y0, z0)
            .lerp(&self.lerp_x(x0, x1, fx, y1, z0), fy);
        let slice1 = self
            .lerp_x(x0, x1, fx, y0, z1)
            .lerp(&self.lerp_x(x0, x1, fx, y1, z1), fy);
        slice0.lerp(&slice1, fz)
    }

    fn lerp_x(&self, x0: usize, x1: usize, fx: f64, y: usize, z: usize) -> Vector4<f64> {
        let a = widen(&self.texels[self.index(x0, y, z)]);
        let b = widen(&self.texels[self.index(x1, y, z)]);
        a.lerp(&b, fx)
    }

    /// Smallest and largest component value across all texels.
    pub fn range(&self) -> (f32, f32) {
        self.texels
            .iter()
            .flatten()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

// Walk one z-slice in BLOCK_SIZE x BLOCK_SIZE workgroups, handing each
// in-extent invocation its coordinate and offset within the slice.
// Invocations of one band, in workgroup order. `offset` is relative to the
// start of the band.
fn for_each_invocation(
    extent: Extent,
    band: usize,
    mut invocation: impl FnMut(TexelCoord, usize),
) {
    let (groups_x, groups_y) = extent.workgroups();
    let (z, group_rows) = if extent.depth == 1 {
        (0, band..band + 1)
    } else {
        (band, 0..groups_y)
    };
    let first_row = group_rows.start * BLOCK_SIZE;
    for group_y in group_rows {
        for group_x in 0..groups_x {
            for local_y in 0..BLOCK_SIZE {
                for local_x in 0..BLOCK_SIZE {
                    let coord = TexelCoord {
                        x: group_x * BLOCK_SIZE + local_x,
                        y: group_y * BLOCK_SIZE + local_y,
                        z,
                    };
                    // Padding invocations past the edge do nothing.
                    if !extent.contains(coord) {
                        continue;
                    }
                    invocation(coord, (coord.y - first_row) * extent.width + coord.x);
                }
            }
        }
    }
}

// Texel centers sit at (i + 0.5) / size; the two taps bracketing `coord`
// are clamped to the edge like a clamp-to-edge sampler.
fn linear_taps(coord: f64, size: usize) -> (usize, usize, f64) {
    let x = coord * size as f64 - 0.5;
    let x_floor = x.floor();
    let frac = x - x_floor;
    let last = size as i64 - 1;
    let i = x_floor as i64;
    (
        i.clamp(0, last) as usize,
        (i + 1).clamp(0, last) as usize,
        frac,
    )
}

fn widen(texel: &Texel) -> Vector4<f64> {
    Vector4::new(
        f64::from(texel[0]),
        f64::from(texel[1]),
        f64::from(texel[2]),
        f64::from(texel[3]),
    )
}

fn narrow(value: &Vector4<f64>) -> Texel {
    [
        value.x as f32,
        value.y as f32,
        value.z as f32,
        value.w as f32,
    ]
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ramp(label: &str, extent: Extent) -> Table {
        let mut table = Table::new(label, extent);
        table.dispatch(|c| Vector4::new(c.x as f64, c.y as f64, c.z as f64, 1.));
        table
    }

    #[test]
    fn test_dispatch_covers_extent_exactly_once() {
        // Deliberately not a multiple of the block size.
        let extent = Extent::new_3d(13, 9, 3);
        let invocations = AtomicUsize::new(0);
        let mut table = Table::new("test", extent);
        table.dispatch(|_| {
            invocations.fetch_add(1, Ordering::Relaxed);
            Vector4::repeat(1.)
        });
        assert_eq!(invocations.load(Ordering::Relaxed), extent.texel_count());
        assert!(table.texels().iter().all(|t| *t == [1f32; 4]));
    }

    #[test]
    fn test_padding_is_outside_extent() {
        let extent = Extent::new_2d(10, 3);
        assert_eq!(extent.workgroups(), (2, 1));
        assert!(extent.contains(TexelCoord { x: 9, y: 2, z: 0 }));
        assert!(!extent.contains(TexelCoord { x: 10, y: 0, z: 0 }));
        assert!(!extent.contains(TexelCoord { x: 0, y: 3, z: 0 }));
        assert!(!extent.contains(TexelCoord { x: 0, y: 0, z: 1 }));
    }

    #[test]
    fn test_dispatch_update_accumulates() {
        let mut table = ramp("ramp", Extent::new_2d(4, 4));
        table.dispatch_update(|_, prior| prior * 2.);
        let t = table.texel(TexelCoord { x: 3, y: 2, z: 0 });
        assert_relative_eq!(t.x, 6.);
        assert_relative_eq!(t.y, 4.);
        assert_relative_eq!(t.w, 2.);
    }

    #[test]
    fn test_dispatch_pair_writes_both() {
        let extent = Extent::new_3d(9, 3, 2);
        let mut first = Table::new("first", extent);
        let mut second = Table::new("second", extent);
        first.dispatch_pair(&mut second, |c| {
            (Vector4::repeat(c.x as f64), Vector4::repeat(c.z as f64))
        });
        let coord = TexelCoord { x: 8, y: 2, z: 1 };
        assert_relative_eq!(first.texel(coord).x, 8.);
        assert_relative_eq!(second.texel(coord).w, 1.);
    }

    #[test]
    fn test_flat_tables_split_into_workgroup_rows() {
        // Three bands of rows, the last one short.
        let extent = Extent::new_2d(13, 20);
        assert_eq!(extent.band_len(), 13 * BLOCK_SIZE);
        let invocations = AtomicUsize::new(0);
        let mut table = Table::new("flat", extent);
        table.dispatch(|c| {
            invocations.fetch_add(1, Ordering::Relaxed);
            Vector4::new(c.x as f64, c.y as f64, c.z as f64, 1.)
        });
        assert_eq!(invocations.load(Ordering::Relaxed), extent.texel_count());
        for y in 0..extent.height {
            for x in 0..extent.width {
                let t = table.texel(TexelCoord { x, y, z: 0 });
                assert_eq!(t, Vector4::new(x as f64, y as f64, 0., 1.));
            }
        }
        // Shorter than one workgroup still makes a single band.
        assert_eq!(Extent::new_2d(5, 3).band_len(), 15);
        assert_eq!(Extent::new_3d(5, 3, 2).band_len(), 15);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn test_dispatch_pair_rejects_mismatched_extents() {
        let mut first = Table::new("first", Extent::new_3d(4, 4, 2));
        let mut second = Table::new("second", Extent::new_3d(4, 4, 3));
        first.dispatch_pair(&mut second, |_| (Vector4::zeros(), Vector4::zeros()));
    }

    #[test]
    fn test_sample_hits_texel_centers() {
        let table = ramp("ramp", Extent::new_2d(4, 2));
        let t = table.sample_2d(2.5 / 4., 0.5 / 2.);
        assert_relative_eq!(t.x, 2.);
        assert_relative_eq!(t.y, 0.);
        // Halfway between texel 1 and 2.
        let t = table.sample_2d(2. / 4., 0.5 / 2.);
        assert_relative_eq!(t.x, 1.5);
    }

    #[test]
    fn test_sample_clamps_to_edge() {
        let table = ramp("ramp", Extent::new_3d(4, 4, 4));
        let t = table.sample_3d(-1., 2., 0.);
        assert_relative_eq!(t.x, 0.);
        assert_relative_eq!(t.y, 3.);
        assert_relative_eq!(t.z, 0.);
        let t = table.sample_3d(0.5, 0.5, 0.5);
        assert_relative_eq!(t.x, 1.5);
        assert_relative_eq!(t.y, 1.5);
        assert_relative_eq!(t.z, 1.5);
    }

    #[test]
    fn test_range() {
        let table = ramp("ramp", Extent::new_2d(3, 2));
        assert_eq!(table.range(), (0., 2.));
    }
}
