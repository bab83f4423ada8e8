//! Clip strategy selection and the compositor that owns the derived geometry.
//!
//! A [`ClipStrategy`] says how a shape must be applied: as a pure vector clip
//! or through a rasterized alpha mask. The [`ClipCompositor`] caches the clip
//! path and its inversion per (generation, size) pair and recomputes only when
//! either changes, so redraw requests arriving mid-recompute never re-enter.

use kurbo::{BezPath, Shape};

use crate::geometry::{ShapeConfig, identity_path};

/// How a shape's clip is produced. Selected once per shape kind; swapped
/// wholesale, never mutated per instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipStrategy {
    /// The shape clips with its vector path alone.
    PathOnly(ShapeConfig),
    /// The shape mandates an offscreen alpha mask.
    RasterRequired(ShapeConfig),
}

impl ClipStrategy {
    pub fn config(&self) -> &ShapeConfig {
        match self {
            Self::PathOnly(config) | Self::RasterRequired(config) => config,
        }
    }

    pub fn build_path(&self, width: f64, height: f64) -> BezPath {
        self.config().build_path(width, height)
    }

    pub fn requires_bitmap(&self) -> bool {
        matches!(self, Self::RasterRequired(_))
    }
}

/// Owns the current clip path and the surface-size-derived geometry.
#[derive(Clone, Debug)]
pub struct ClipCompositor {
    strategy: ClipStrategy,
    preview_mode: bool,
    clip_path: BezPath,
    inverted_path: BezPath,
    generation: u64,
    computed: Option<Computed>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Computed {
    generation: u64,
    width: f64,
    height: f64,
}

impl ClipCompositor {
    pub fn new(strategy: ClipStrategy) -> Self {
        Self {
            strategy,
            preview_mode: false,
            clip_path: BezPath::new(),
            inverted_path: BezPath::new(),
            generation: 0,
            computed: None,
        }
    }

    pub fn strategy(&self) -> &ClipStrategy {
        &self.strategy
    }

    /// Replaces the strategy wholesale and marks the geometry stale.
    pub fn set_strategy(&mut self, strategy: ClipStrategy) {
        self.strategy = strategy;
        self.mark_dirty();
    }

    /// In preview mode live rendering is unavailable: everything rasterizes
    /// and no shadow outline is offered.
    pub fn set_preview_mode(&mut self, preview: bool) {
        if self.preview_mode != preview {
            self.preview_mode = preview;
            self.mark_dirty();
        }
    }

    pub fn mark_dirty(&mut self) {
        self.generation += 1;
    }

    pub fn is_dirty(&self, width: f64, height: f64) -> bool {
        self.computed
            != Some(Computed {
                generation: self.generation,
                width,
                height,
            })
    }

    /// Recomputes the clip path and its inversion for the given size.
    /// Non-positive dimensions mean "not yet measured": the prior geometry is
    /// retained untouched. Idempotent for unchanged inputs.
    pub fn setup_clip_layout(&mut self, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            tracing::trace!(width, height, "skipping clip layout for non-positive size");
            return;
        }
        if !self.is_dirty(width, height) {
            return;
        }

        self.clip_path = self.strategy.build_path(width, height);

        // Full rectangle minus the shape: the shape wound opposite to the
        // rectangle subtracts its area under nonzero winding.
        let mut inverted = identity_path(width, height);
        let mut inner = self.clip_path.clone();
        if inner.area().signum() == inverted.area().signum() {
            inner = inner.reverse_subpaths();
        }
        for &el in inner.elements() {
            inverted.push(el);
        }
        self.inverted_path = inverted;

        self.computed = Some(Computed {
            generation: self.generation,
            width,
            height,
        });
        tracing::debug!(width, height, generation = self.generation, "clip layout recomputed");
    }

    /// The cached clip region in surface-local coordinates.
    pub fn mask_path(&self) -> &BezPath {
        &self.clip_path
    }

    /// The cached "full rectangle minus shape" path for DstOut masking.
    pub fn inverted_mask(&self) -> &BezPath {
        &self.inverted_path
    }

    /// Convex outline for drop-shadow computation. `None` means no shadow
    /// outline is available (e.g. preview mode or nothing computed yet).
    pub fn shadow_convex_path(&self) -> Option<&BezPath> {
        if self.preview_mode || self.computed.is_none() {
            return None;
        }
        Some(&self.clip_path)
    }

    pub fn requires_bitmap(&self) -> bool {
        self.preview_mode || self.strategy.requires_bitmap()
    }
}
