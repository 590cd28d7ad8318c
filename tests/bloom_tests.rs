//! Bloom Chain Tests
//!
//! Tests for:
//! - Mip chain level extents
//! - Step plan ordering, Karis placement and blend modes
//! - Render-state restoration after a plan runs
//! - Filter properties on the CPU reference (energy, footprint, fireflies)

use glam::{UVec2, Vec2, Vec3};

use glowcast::bloom::{
    BlendMode, BloomPlan, HdrImage, ReferenceBloom, StepKind, StepSource, accumulation_weight,
    downsample_13tap, luminance, mip_chain_extents, upsample_tent,
};
use glowcast::context::{RenderState, TargetBinding, Viewport};

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn run_reference(source: &HdrImage, mip_count: u32, radius: f32, karis: bool) -> ReferenceBloom {
    let mut bloom = ReferenceBloom::new(source.width(), source.height(), mip_count);
    let plan = bloom.plan(karis);
    let mut state = RenderState::new(Viewport::from_size(source.size()));
    bloom.run(&plan, source, radius, &mut state);
    bloom
}

fn point_source(size: u32, value: f32) -> HdrImage {
    let center = size / 2;
    HdrImage::from_fn(size, size, |x, y| {
        if x == center && y == center {
            Vec3::splat(value)
        } else {
            Vec3::ZERO
        }
    })
}

// ============================================================================
// Mip Chain Extents
// ============================================================================

#[test]
fn extents_match_1280x720_layout() {
    let extents = mip_chain_extents(1280, 720, 12);
    assert_eq!(extents.len(), 12);
    assert_eq!(extents[0].int_size, UVec2::new(1280, 720));
    assert_eq!(extents[5].int_size, UVec2::new(40, 22));
    assert_eq!(extents[11].int_size, UVec2::new(1, 1));
}

#[test]
fn extents_halve_and_never_reach_zero() {
    let sizes = [(1, 1), (3, 5), (17, 2), (640, 480), (1920, 1080), (4096, 7)];
    for (w, h) in sizes {
        for n in 1..=16 {
            let extents = mip_chain_extents(w, h, n);
            assert_eq!(extents.len(), n as usize, "{w}x{h} with {n} levels");
            for (i, extent) in extents.iter().enumerate() {
                let expected = UVec2::new((w >> i).max(1), (h >> i).max(1));
                assert_eq!(
                    extent.int_size, expected,
                    "{w}x{h} level {i}: expected {expected}, got {}",
                    extent.int_size
                );
                assert!(extent.size.x >= 1.0 && extent.size.y >= 1.0);
            }
        }
    }
}

#[test]
fn zero_sized_viewport_is_treated_as_one_texel() {
    let extents = mip_chain_extents(0, 0, 3);
    assert!(extents.iter().all(|e| e.int_size == UVec2::ONE));
}

// ============================================================================
// Step Plan
// ============================================================================

fn plan_for(w: u32, h: u32, n: u32, karis: bool) -> BloomPlan {
    BloomPlan::from_extents(&mip_chain_extents(w, h, n), karis)
}

#[test]
fn plan_downsamples_then_upsamples() {
    let plan = plan_for(256, 128, 5, true);
    assert_eq!(plan.level_count(), 5);
    assert_eq!(plan.steps().len(), 9);

    let downs: Vec<_> = plan.downsample_steps().collect();
    assert_eq!(downs.len(), 5);
    for (i, step) in downs.iter().enumerate() {
        assert_eq!(step.target, i);
        assert_eq!(step.blend, BlendMode::Replace);
        let expected_source = if i == 0 {
            StepSource::External
        } else {
            StepSource::Mip(i - 1)
        };
        assert_eq!(step.source, expected_source, "downsample {i}");
    }

    let ups: Vec<_> = plan.upsample_steps().collect();
    let targets: Vec<usize> = ups.iter().map(|s| s.target).collect();
    assert_eq!(targets, vec![3, 2, 1, 0]);
    for step in &ups {
        assert_eq!(step.source, StepSource::Mip(step.target + 1));
    }
    for step in &ups[..3] {
        assert_eq!(step.blend, BlendMode::Additive);
    }
    assert_eq!(ups[3].blend, BlendMode::Normalize { weight: 0.2 });

    // Every downsample precedes every upsample.
    let first_up = plan
        .steps()
        .iter()
        .position(|s| s.kind == StepKind::Upsample)
        .unwrap();
    assert_eq!(first_up, 5);
}

#[test]
fn karis_only_on_first_downsample() {
    let with = plan_for(256, 256, 6, true);
    let karis: Vec<bool> = with.steps().iter().map(|s| s.karis()).collect();
    assert!(karis[0]);
    assert!(karis[1..].iter().all(|k| !k));

    let without = plan_for(256, 256, 6, false);
    assert!(without.steps().iter().all(|s| !s.karis()));
}

#[test]
fn step_viewports_match_target_level() {
    let extents = mip_chain_extents(300, 200, 6);
    let plan = BloomPlan::from_extents(&extents, false);
    for step in plan.steps() {
        assert_eq!(
            step.viewport.size(),
            extents[step.target].int_size,
            "step writing mip {} has the wrong viewport",
            step.target
        );
    }
}

#[test]
fn single_level_plan_has_no_upsamples() {
    let plan = plan_for(64, 64, 1, true);
    assert_eq!(plan.steps().len(), 1);
    assert_eq!(plan.upsample_steps().count(), 0);
}

#[test]
fn execute_restores_viewport_and_unbinds() {
    let plan = plan_for(512, 256, 4, true);
    let caller = Viewport::new(1280, 720);
    let mut state = RenderState::new(caller);
    state.bind_target(TargetBinding::SceneHdr, caller);

    let mut visited = Vec::new();
    plan.execute(&mut state, |step| visited.push(step.target));

    assert_eq!(visited, vec![0, 1, 2, 3, 2, 1, 0]);
    assert_eq!(state.binding, TargetBinding::Unbound);
    assert_eq!(state.viewport, caller);
}

#[test]
fn empty_plan_leaves_viewport_alone() {
    let plan = BloomPlan::default();
    assert!(plan.is_empty());
    let caller = Viewport::new(10, 20);
    let mut state = RenderState::new(caller);
    plan.execute(&mut state, |_| panic!("empty plan recorded a step"));
    assert_eq!(state.viewport, caller);
}

// ============================================================================
// Energy
// ============================================================================

#[test]
fn accumulation_weight_is_inverse_level_count() {
    assert!(approx(accumulation_weight(1), 1.0));
    assert!(approx(accumulation_weight(4), 0.25));
    assert!(approx(accumulation_weight(12), 1.0 / 12.0));
    assert!(approx(accumulation_weight(0), 1.0));
    assert!(approx(plan_for(64, 64, 6, true).accumulation_weight(), 1.0 / 6.0));
}

#[test]
fn flat_color_blooms_to_itself_in_mip0() {
    let color = Vec3::new(2.0, 1.0, 0.5);
    let source = HdrImage::filled(64, 64, color);
    for mip_count in [1, 2, 4, 6] {
        for karis in [false, true] {
            let bloom = run_reference(&source, mip_count, 0.005, karis);
            let diff = bloom.level(0).unwrap().max_abs_diff(color);
            assert!(
                diff < 1e-3,
                "flat input should bloom to itself (N={mip_count}, karis={karis}), max deviation {diff}"
            );
        }
    }
}

#[test]
fn intermediate_levels_hold_the_running_sum() {
    let color = Vec3::splat(0.75);
    let source = HdrImage::filled(32, 32, color);
    let bloom = run_reference(&source, 5, 0.01, false);
    // Mip i collects itself plus every coarser level: N - i copies of C.
    for i in 1..5 {
        let expected = color * (5 - i) as f32;
        assert!(bloom.level(i).unwrap().max_abs_diff(expected) < 1e-3, "mip {i}");
    }
    assert!(bloom.level(0).unwrap().max_abs_diff(color) < 1e-3);
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn zero_radius_tent_equals_bilinear_upsample() {
    let src = HdrImage::from_fn(8, 8, |x, y| Vec3::new(x as f32, y as f32, (x * y) as f32));
    let dst_size = UVec2::new(16, 16);
    let tent = upsample_tent(&src, dst_size, 0.0);
    for y in 0..16 {
        for x in 0..16 {
            let uv = (Vec2::new(x as f32, y as f32) + 0.5) / 16.0;
            let bilinear = src.sample_bilinear(uv);
            assert!(
                (tent.get(x, y) - bilinear).abs().max_element() < 1e-4,
                "texel ({x}, {y}): tent {} vs bilinear {bilinear}",
                tent.get(x, y)
            );
        }
    }
}

#[test]
fn larger_radius_spreads_further() {
    let source = point_source(64, 100.0);
    let narrow = run_reference(&source, 4, 0.002, false)
        .bloom()
        .unwrap()
        .spatial_variance();
    let wide = run_reference(&source, 4, 0.03, false)
        .bloom()
        .unwrap()
        .spatial_variance();
    assert!(
        wide > narrow,
        "radius 0.03 should spread more than 0.002: {wide} <= {narrow}"
    );
}

#[test]
fn downsample_never_goes_negative() {
    let src = HdrImage::from_fn(16, 16, |x, _| Vec3::splat(if x % 2 == 0 { 4.0 } else { 0.0 }));
    let out = downsample_13tap(&src, UVec2::new(8, 8), true);
    assert!(out.pixels().iter().all(|p| p.min_element() >= 0.0));
}

#[test]
fn karis_average_suppresses_fireflies() {
    let background = Vec3::splat(0.1);
    let mut source = HdrImage::filled(64, 64, background);
    source.set(33, 33, Vec3::splat(1000.0));

    let dst = UVec2::new(32, 32);
    let plain = downsample_13tap(&source, dst, false);
    let karis = downsample_13tap(&source, dst, true);

    // Luminance-weighted averaging can only pull a texel down.
    for y in 0..dst.y {
        for x in 0..dst.x {
            let (k, p) = (luminance(karis.get(x, y)), luminance(plain.get(x, y)));
            assert!(k <= p + 1e-3, "texel ({x}, {y}): karis {k} > plain {p}");
        }
    }

    // (15, 15) sees the firefly only through its corner tap.
    let k = luminance(karis.get(15, 15));
    let p = luminance(plain.get(15, 15));
    assert!(k < p * 0.1, "corner-tap firefly not damped: karis {k}, plain {p}");

    let total = |image: &HdrImage| image.pixels().iter().map(|c| luminance(*c)).sum::<f32>();
    assert!(total(&karis) < total(&plain));
}

#[test]
fn karis_leaves_flat_regions_unchanged() {
    let source = HdrImage::filled(32, 32, Vec3::new(3.0, 0.2, 1.0));
    let out = downsample_13tap(&source, UVec2::new(16, 16), true);
    assert!(out.max_abs_diff(Vec3::new(3.0, 0.2, 1.0)) < 1e-4);
}
