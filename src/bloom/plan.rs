//! Bloom Step Plan
//!
//! The ordered list of render steps for one bloom evaluation. The GPU
//! pipeline and the CPU reference both walk the same [`BloomPlan`], so the
//! ordering rules hold by construction:
//!
//! 1. Downsample into mip `0..N`, reading the external source first and the
//!    previous mip afterwards. Only step 0 may use the Karis average.
//! 2. Upsample from mip `N-1` down to mip `1`, each additively blended into
//!    the next larger level. The last step, into mip 0, also divides the sum
//!    by `N` so a flat source comes back at its own brightness.

use glam::UVec2;

use crate::context::{RenderState, TargetBinding, Viewport};

use super::mip_chain::MipExtent;

/// Texture read by a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepSource {
    /// The caller's full-resolution source image.
    External,
    Mip(usize),
}

/// How a step's output combines with the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlendMode {
    Replace,
    /// `dst += src`.
    Additive,
    /// `dst = (dst + src) * weight`. Closes the chain in mip 0.
    Normalize { weight: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Downsample { karis: bool },
    Upsample,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomStep {
    pub kind: StepKind,
    pub source: StepSource,
    /// Destination mip index.
    pub target: usize,
    pub viewport: Viewport,
    pub blend: BlendMode,
}

impl BloomStep {
    #[inline]
    #[must_use]
    pub fn karis(&self) -> bool {
        matches!(self.kind, StepKind::Downsample { karis: true })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BloomPlan {
    steps: Vec<BloomStep>,
    level_count: usize,
}

impl BloomPlan {
    /// Builds the plan for a chain with the given level sizes.
    #[must_use]
    pub fn new(level_sizes: &[UVec2], karis_average: bool) -> Self {
        let n = level_sizes.len();
        let mut steps = Vec::with_capacity(n * 2);

        for (i, size) in level_sizes.iter().enumerate() {
            steps.push(BloomStep {
                kind: StepKind::Downsample {
                    karis: karis_average && i == 0,
                },
                source: if i == 0 {
                    StepSource::External
                } else {
                    StepSource::Mip(i - 1)
                },
                target: i,
                viewport: Viewport::from_size(*size),
                blend: BlendMode::Replace,
            });
        }

        for i in (1..n).rev() {
            steps.push(BloomStep {
                kind: StepKind::Upsample,
                source: StepSource::Mip(i),
                target: i - 1,
                viewport: Viewport::from_size(level_sizes[i - 1]),
                blend: if i == 1 {
                    BlendMode::Normalize {
                        weight: accumulation_weight(n),
                    }
                } else {
                    BlendMode::Additive
                },
            });
        }

        Self {
            steps,
            level_count: n,
        }
    }

    #[must_use]
    pub fn from_extents(extents: &[MipExtent], karis_average: bool) -> Self {
        let sizes: Vec<UVec2> = extents.iter().map(|e| e.int_size).collect();
        Self::new(&sizes, karis_average)
    }

    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[BloomStep] {
        &self.steps
    }

    #[inline]
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.level_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn downsample_steps(&self) -> impl Iterator<Item = &BloomStep> {
        self.steps
            .iter()
            .filter(|s| matches!(s.kind, StepKind::Downsample { .. }))
    }

    pub fn upsample_steps(&self) -> impl Iterator<Item = &BloomStep> {
        self.steps.iter().filter(|s| s.kind == StepKind::Upsample)
    }

    /// Weight of the closing [`BlendMode::Normalize`] step.
    #[must_use]
    pub fn accumulation_weight(&self) -> f32 {
        accumulation_weight(self.level_count)
    }

    /// Runs every step in order against `state`.
    ///
    /// Each step's mip is bound with its own viewport before `record` is
    /// called. Afterwards the destination is unbound and the caller's
    /// viewport restored.
    pub fn execute(&self, state: &mut RenderState, mut record: impl FnMut(&BloomStep)) {
        let saved_viewport = state.viewport;
        for step in &self.steps {
            state.bind_target(TargetBinding::BloomMip(step.target), step.viewport);
            record(step);
        }
        state.unbind();
        state.viewport = saved_viewport;
    }
}

/// `1 / level_count`, or `1` for an empty chain.
///
/// A flat source reaches mip 0 as `level_count` stacked copies, one per level.
#[must_use]
pub fn accumulation_weight(level_count: usize) -> f32 {
    1.0 / level_count.max(1) as f32
}
