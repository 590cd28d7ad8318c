//! CPU Reference Bloom
//!
//! Float-precision mirror of the WGSL filters and of the GPU executor. It
//! runs the same [`BloomPlan`] over in-memory images, sampling with the same
//! clamp-to-edge bilinear rule at texel centers, so filter properties can be
//! checked without a device.

use glam::{UVec2, Vec2, Vec3};

use crate::context::RenderState;

use super::mip_chain::mip_chain_extents;
use super::plan::{BlendMode, BloomPlan, StepKind, StepSource};

const LUMA: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

#[inline]
#[must_use]
pub fn luminance(c: Vec3) -> f32 {
    c.dot(LUMA)
}

/// Linear RGB image, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    width: u32,
    height: u32,
    pixels: Vec<Vec3>,
}

impl HdrImage {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Vec3::ZERO)
    }

    #[must_use]
    pub fn filled(width: u32, height: u32, color: Vec3) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Vec3) -> Self {
        let mut image = Self::new(width, height);
        for y in 0..image.height {
            for x in 0..image.width {
                image.set(x, y, f(x, y));
            }
        }
        image
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[Vec3] {
        &self.pixels
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Vec3 {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, color: Vec3) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    /// Bilinear sample at `uv` with clamp-to-edge addressing.
    #[must_use]
    pub fn sample_bilinear(&self, uv: Vec2) -> Vec3 {
        let p = uv * self.size().as_vec2() - Vec2::splat(0.5);
        let base = p.floor();
        let frac = p - base;
        let max = self.size().as_ivec2() - 1;
        let x0 = (base.x as i32).clamp(0, max.x) as u32;
        let y0 = (base.y as i32).clamp(0, max.y) as u32;
        let x1 = (base.x as i32 + 1).clamp(0, max.x) as u32;
        let y1 = (base.y as i32 + 1).clamp(0, max.y) as u32;

        let top = self.get(x0, y0).lerp(self.get(x1, y0), frac.x);
        let bottom = self.get(x0, y1).lerp(self.get(x1, y1), frac.x);
        top.lerp(bottom, frac.y)
    }

    /// `self += other`. Images must have the same size.
    pub fn add_assign(&mut self, other: &HdrImage) {
        debug_assert_eq!(self.size(), other.size());
        for (dst, src) in self.pixels.iter_mut().zip(&other.pixels) {
            *dst += *src;
        }
    }

    #[must_use]
    pub fn scaled(&self, factor: f32) -> HdrImage {
        HdrImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|p| *p * factor).collect(),
        }
    }

    /// Largest per-channel deviation from `color`.
    #[must_use]
    pub fn max_abs_diff(&self, color: Vec3) -> f32 {
        self.pixels
            .iter()
            .map(|p| (*p - color).abs().max_element())
            .fold(0.0, f32::max)
    }

    #[must_use]
    pub fn max_luminance(&self) -> f32 {
        self.pixels.iter().map(|p| luminance(*p)).fold(0.0, f32::max)
    }

    /// Luminance-weighted spatial variance in UV units, a measure of spread.
    #[must_use]
    pub fn spatial_variance(&self) -> f32 {
        let size = self.size().as_vec2();
        let uv_of = |i: usize| {
            let x = (i as u32 % self.width) as f32;
            let y = (i as u32 / self.width) as f32;
            (Vec2::new(x, y) + 0.5) / size
        };

        let mut total = 0.0;
        let mut centroid = Vec2::ZERO;
        for (i, p) in self.pixels.iter().enumerate() {
            let w = luminance(*p).max(0.0);
            total += w;
            centroid += uv_of(i) * w;
        }
        if total <= 0.0 {
            return 0.0;
        }
        centroid /= total;

        self.pixels
            .iter()
            .enumerate()
            .map(|(i, p)| luminance(*p).max(0.0) * uv_of(i).distance_squared(centroid))
            .sum::<f32>()
            / total
    }
}

/// 13-tap downsample of `src` into an image of `dst_size`.
#[must_use]
pub fn downsample_13tap(src: &HdrImage, dst_size: UVec2, karis: bool) -> HdrImage {
    let texel = Vec2::ONE / src.size().as_vec2();
    let dst = dst_size.max(UVec2::ONE);
    HdrImage::from_fn(dst.x, dst.y, |x, y| {
        let uv = (Vec2::new(x as f32, y as f32) + 0.5) / dst.as_vec2();
        let tap = |ox: f32, oy: f32| src.sample_bilinear(uv + Vec2::new(ox, oy) * texel);

        let a = tap(-2.0, 2.0);
        let b = tap(0.0, 2.0);
        let c = tap(2.0, 2.0);
        let d = tap(-2.0, 0.0);
        let e = tap(0.0, 0.0);
        let f = tap(2.0, 0.0);
        let g = tap(-2.0, -2.0);
        let h = tap(0.0, -2.0);
        let i = tap(2.0, -2.0);
        let j = tap(-1.0, 1.0);
        let k = tap(1.0, 1.0);
        let l = tap(-1.0, -1.0);
        let m = tap(1.0, -1.0);

        let result = if karis {
            let groups = [
                ((a + b + d + e) * 0.25, 0.125),
                ((b + c + e + f) * 0.25, 0.125),
                ((d + e + g + h) * 0.25, 0.125),
                ((e + f + h + i) * 0.25, 0.125),
                ((j + k + l + m) * 0.25, 0.5),
            ];
            let mut sum = Vec3::ZERO;
            let mut weight = 0.0;
            for (group, base) in groups {
                let w = base / (1.0 + luminance(group));
                sum += group * w;
                weight += w;
            }
            sum / weight
        } else {
            e * 0.125 + (a + c + g + i) * 0.03125 + (b + d + f + h) * 0.0625 + (j + k + l + m) * 0.125
        };
        result.max(Vec3::ZERO)
    })
}

/// 3x3 tent upsample of `src` into an image of `dst_size`; offsets are `radius` in UV.
#[must_use]
pub fn upsample_tent(src: &HdrImage, dst_size: UVec2, radius: f32) -> HdrImage {
    let dst = dst_size.max(UVec2::ONE);
    HdrImage::from_fn(dst.x, dst.y, |x, y| {
        let uv = (Vec2::new(x as f32, y as f32) + 0.5) / dst.as_vec2();
        let tap = |ox: f32, oy: f32| src.sample_bilinear(uv + Vec2::new(ox, oy));
        let r = radius;

        let a = tap(-r, r);
        let b = tap(0.0, r);
        let c = tap(r, r);
        let d = tap(-r, 0.0);
        let e = tap(0.0, 0.0);
        let f = tap(r, 0.0);
        let g = tap(-r, -r);
        let h = tap(0.0, -r);
        let i = tap(r, -r);

        (e * 4.0 + (b + d + f + h) * 2.0 + (a + c + g + i)) / 16.0
    })
}

/// In-memory mip chain driven by a [`BloomPlan`].
#[derive(Debug, Clone)]
pub struct ReferenceBloom {
    levels: Vec<HdrImage>,
}

impl ReferenceBloom {
    #[must_use]
    pub fn new(width: u32, height: u32, mip_count: u32) -> Self {
        let levels = mip_chain_extents(width, height, mip_count)
            .iter()
            .map(|extent| HdrImage::new(extent.int_size.x, extent.int_size.y))
            .collect();
        Self { levels }
    }

    /// Plan matching this chain's level sizes.
    #[must_use]
    pub fn plan(&self, karis_average: bool) -> BloomPlan {
        let sizes: Vec<UVec2> = self.levels.iter().map(HdrImage::size).collect();
        BloomPlan::new(&sizes, karis_average)
    }

    /// Executes `plan` with `source` as the external input.
    pub fn run(
        &mut self,
        plan: &BloomPlan,
        source: &HdrImage,
        filter_radius: f32,
        state: &mut RenderState,
    ) {
        let levels = &mut self.levels;
        plan.execute(state, |step| {
            let size = step.viewport.size();
            match step.kind {
                StepKind::Downsample { karis } => {
                    let input = match step.source {
                        StepSource::External => source,
                        StepSource::Mip(i) => &levels[i],
                    };
                    let output = downsample_13tap(input, size, karis);
                    levels[step.target] = output;
                }
                StepKind::Upsample => {
                    let StepSource::Mip(i) = step.source else {
                        return;
                    };
                    let output = upsample_tent(&levels[i], size, filter_radius);
                    let target = &mut levels[step.target];
                    target.add_assign(&output);
                    if let BlendMode::Normalize { weight } = step.blend {
                        *target = target.scaled(weight);
                    }
                }
            }
        });
    }

    #[must_use]
    pub fn mip_count(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn level(&self, index: usize) -> Option<&HdrImage> {
        self.levels.get(index)
    }

    /// Final bloom image (mip 0).
    #[must_use]
    pub fn bloom(&self) -> Option<&HdrImage> {
        self.levels.first()
    }
}
