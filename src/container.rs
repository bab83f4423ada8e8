//! Shaped surfaces: dirty-tracked containers that render exclusively through
//! their clip pipeline.
//!
//! A [`ShapeContainer`] owns its [`ClipCompositor`] and decides the masking
//! technique per draw: a rasterized alpha mask composited with DstIn when a
//! bitmap is required, the precomputed "rectangle minus shape" path with
//! DstOut when the tier supports path-difference masking, and a direct DstIn
//! path fill otherwise. A failed frame degrades (no mask, no shadow) instead
//! of aborting the host's render loop.

use kurbo::BezPath;

use crate::{
    clip::{ClipCompositor, ClipStrategy},
    geometry::{ArchPosition, CropDirection, Density, DisabledEdge, ShapeConfig},
    paint::{BlendMode, FillImage, FillSource, MaskBitmap, Paint, Rgba8},
    raster::{self, DrawSurface},
};

/// Capability tier of the rendering backend underneath the surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderTier {
    /// No efficient nested vector-path clipping and no outline shadows:
    /// the shape path itself is filled with DstIn.
    Legacy,
    /// Path-difference masking and outline-based shadows are available.
    Modern,
}

impl RenderTier {
    pub fn supports_path_difference(self) -> bool {
        matches!(self, Self::Modern)
    }

    pub fn supports_outline_shadows(self) -> bool {
        matches!(self, Self::Modern)
    }
}

pub struct ShapeContainer {
    compositor: ClipCompositor,
    tier: RenderTier,
    density: Density,
    fill: FillSource,
    mask_bitmap: Option<MaskBitmap>,
    width: f64,
    height: f64,
    elevation: f64,
    redraw_requests: u64,
}

impl ShapeContainer {
    pub fn new(strategy: ClipStrategy, tier: RenderTier) -> Self {
        Self {
            compositor: ClipCompositor::new(strategy),
            tier,
            density: Density::default(),
            fill: FillSource::default(),
            mask_bitmap: None,
            width: 0.0,
            height: 0.0,
            elevation: 0.0,
            redraw_requests: 0,
        }
    }

    pub fn with_density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    pub fn set_density(&mut self, density: Density) {
        self.density = density;
    }

    pub fn density(&self) -> Density {
        self.density
    }

    pub fn tier(&self) -> RenderTier {
        self.tier
    }

    pub fn compositor(&self) -> &ClipCompositor {
        &self.compositor
    }

    pub fn redraw_requests(&self) -> u64 {
        self.redraw_requests
    }

    /// Installs a new clip strategy and schedules a geometry refresh.
    pub fn set_clip_strategy(&mut self, strategy: ClipStrategy) {
        self.compositor.set_strategy(strategy);
        self.request_redraw();
    }

    pub fn set_preview_mode(&mut self, preview: bool) {
        self.compositor.set_preview_mode(preview);
        self.request_redraw();
    }

    pub fn set_elevation(&mut self, elevation: f64) {
        self.elevation = elevation;
    }

    /// What gets drawn through the clip path when the raster technique is
    /// active. An image fill forces rasterization.
    pub fn set_fill_source(&mut self, fill: FillSource) {
        self.fill = fill;
        self.mask_bitmap = None;
        self.request_geometry_refresh();
    }

    pub fn set_fill_image(&mut self, image: FillImage) {
        self.set_fill_source(FillSource::Image(image));
    }

    /// A shaped surface renders exclusively through its clip pipeline;
    /// a plain background would bypass masking, so this is inert.
    pub fn set_background_color(&mut self, _color: Rgba8) {
        tracing::debug!("background ignored on a shaped surface; set it on a child instead");
    }

    /// Inert for the same reason as [`Self::set_background_color`].
    pub fn set_background_image(&mut self, _image: FillImage) {
        tracing::debug!("background ignored on a shaped surface; set it on a child instead");
    }

    pub fn on_size_changed(&mut self, width: f64, height: f64) {
        if (self.width, self.height) == (width, height) {
            return;
        }
        self.width = width;
        self.height = height;
        // Never retain a mask sized for the old surface.
        self.mask_bitmap = None;
        self.request_geometry_refresh();
    }

    /// Marks geometry dirty and schedules a redraw; the recompute itself is
    /// deferred to the next draw and runs exactly once.
    pub fn request_geometry_refresh(&mut self) {
        self.compositor.mark_dirty();
        self.request_redraw();
    }

    pub fn requires_bitmap(&self) -> bool {
        self.compositor.requires_bitmap() || matches!(self.fill, FillSource::Image(_))
    }

    /// Convex outline for the platform's elevation-shadow renderer, when the
    /// tier accepts one. Absence is normal, never an error.
    pub fn shadow_outline(&self) -> Option<&BezPath> {
        if self.elevation <= 0.0 || !self.tier.supports_outline_shadows() {
            return None;
        }
        self.compositor.shadow_convex_path()
    }

    /// Applies the clip to already-drawn surface content. Recomputes the
    /// geometry first if it is stale; masking failures degrade to an
    /// unclipped frame rather than failing the draw.
    pub fn compose_onto(&mut self, surface: &mut dyn DrawSurface) {
        let (w, h) = (f64::from(surface.width()), f64::from(surface.height()));
        if self.compositor.is_dirty(w, h) {
            // Recomputing stores the generation it computed against, so
            // redraw requests landing mid-recompute never re-enter it.
            self.compositor.setup_clip_layout(w, h);
            if self.requires_bitmap() {
                match raster::build_mask(
                    self.compositor.mask_path(),
                    &self.fill,
                    surface.width(),
                    surface.height(),
                ) {
                    Ok(mask) => self.mask_bitmap = Some(mask),
                    Err(err) => {
                        tracing::warn!(%err, "mask rebuild failed; frame drawn unclipped");
                        self.mask_bitmap = None;
                    }
                }
            }
            self.request_redraw();
        }

        let result = if self.requires_bitmap() {
            match &self.mask_bitmap {
                Some(mask) => surface.draw_bitmap(mask, BlendMode::DstIn),
                None => {
                    tracing::debug!("no mask bitmap available; drawing nothing this frame");
                    Ok(())
                }
            }
        } else if self.tier.supports_path_difference() {
            surface.fill_path(
                self.compositor.inverted_mask(),
                &Paint::Solid(Rgba8::BLACK),
                BlendMode::DstOut,
            )
        } else {
            surface.fill_path(
                self.compositor.mask_path(),
                &Paint::Solid(Rgba8::BLACK),
                BlendMode::DstIn,
            )
        };

        if let Err(err) = result {
            tracing::warn!(%err, "clip composite failed; frame left unmasked");
        }
    }

    fn request_redraw(&mut self) {
        self.redraw_requests += 1;
    }
}

/// Surface clipped by an arch along one edge.
pub struct ArchContainer {
    base: ShapeContainer,
    position: ArchPosition,
    arch_height_px: f64,
}

impl ArchContainer {
    pub fn new(tier: RenderTier) -> Self {
        let position = ArchPosition::default();
        let arch_height_px = 0.0;
        Self {
            base: ShapeContainer::new(
                ClipStrategy::PathOnly(ShapeConfig::Arch {
                    position,
                    arch_height_px,
                }),
                tier,
            ),
            position,
            arch_height_px,
        }
    }

    pub fn base(&self) -> &ShapeContainer {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ShapeContainer {
        &mut self.base
    }

    pub fn arch_position(&self) -> ArchPosition {
        self.position
    }

    pub fn set_arch_position(&mut self, position: ArchPosition) {
        self.position = position;
        self.reinstall();
    }

    pub fn arch_height_px(&self) -> f64 {
        self.arch_height_px
    }

    pub fn set_arch_height_px(&mut self, height_px: f64) {
        self.arch_height_px = height_px;
        self.reinstall();
    }

    pub fn arch_height_dp(&self) -> f64 {
        self.base.density().px_to_dp(self.arch_height_px)
    }

    pub fn set_arch_height_dp(&mut self, height_dp: f64) {
        self.set_arch_height_px(self.base.density().dp_to_px(height_dp));
    }

    pub fn crop_direction(&self) -> CropDirection {
        self.config().crop_direction()
    }

    fn config(&self) -> ShapeConfig {
        ShapeConfig::Arch {
            position: self.position,
            arch_height_px: self.arch_height_px,
        }
    }

    fn reinstall(&mut self) {
        self.base.set_clip_strategy(ClipStrategy::PathOnly(self.config()));
    }
}

/// Surface clipped to a parallelogram silhouette.
pub struct ParallelogramContainer {
    base: ShapeContainer,
    height_projection_px: f64,
    disabled_edge: DisabledEdge,
}

impl ParallelogramContainer {
    pub fn new(tier: RenderTier) -> Self {
        let height_projection_px = 0.0;
        let disabled_edge = DisabledEdge::default();
        Self {
            base: ShapeContainer::new(
                ClipStrategy::PathOnly(ShapeConfig::Parallelogram {
                    height_projection_px,
                    disabled_edge,
                }),
                tier,
            ),
            height_projection_px,
            disabled_edge,
        }
    }

    pub fn base(&self) -> &ShapeContainer {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ShapeContainer {
        &mut self.base
    }

    pub fn height_projection_px(&self) -> f64 {
        self.height_projection_px
    }

    pub fn set_height_projection_px(&mut self, projection_px: f64) {
        self.height_projection_px = projection_px;
        self.reinstall();
    }

    pub fn height_projection_dp(&self) -> f64 {
        self.base.density().px_to_dp(self.height_projection_px)
    }

    pub fn set_height_projection_dp(&mut self, projection_dp: f64) {
        self.set_height_projection_px(self.base.density().dp_to_px(projection_dp));
    }

    pub fn disabled_edge(&self) -> DisabledEdge {
        self.disabled_edge
    }

    pub fn set_disabled_edge(&mut self, edge: DisabledEdge) {
        self.disabled_edge = edge;
        self.reinstall();
    }

    fn reinstall(&mut self) {
        self.base
            .set_clip_strategy(ClipStrategy::PathOnly(ShapeConfig::Parallelogram {
                height_projection_px: self.height_projection_px,
                disabled_edge: self.disabled_edge,
            }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::CpuSurface;

    #[test]
    fn setters_mark_dirty_and_request_redraw() {
        let mut arch = ArchContainer::new(RenderTier::Modern);
        let before = arch.base().redraw_requests();
        arch.set_arch_height_px(-12.0);
        assert!(arch.base().redraw_requests() > before);
        assert!(arch.base().compositor().is_dirty(100.0, 100.0));
    }

    #[test]
    fn crop_direction_reflects_current_height() {
        let mut arch = ArchContainer::new(RenderTier::Modern);
        arch.set_arch_height_px(10.0);
        assert_eq!(arch.crop_direction(), CropDirection::Outside);
        arch.set_arch_height_px(-10.0);
        assert_eq!(arch.crop_direction(), CropDirection::Inside);
        arch.set_arch_height_px(0.0);
        assert_eq!(arch.crop_direction(), CropDirection::Inside);
    }

    #[test]
    fn height_projection_dp_round_trips_under_density() {
        for scale in [1.0, 2.0, 2.625] {
            let mut para = ParallelogramContainer::new(RenderTier::Modern);
            para.base_mut().set_density(Density::new(scale));
            para.set_height_projection_dp(13.5);
            assert!((para.height_projection_dp() - 13.5).abs() < 1e-9);
        }
    }

    #[test]
    fn compose_recomputes_exactly_once_per_dirty_cycle() {
        let mut para = ParallelogramContainer::new(RenderTier::Modern);
        para.set_height_projection_px(20.0);
        para.base_mut().on_size_changed(200.0, 100.0);

        let mut surface = CpuSurface::new(200, 100).unwrap();
        surface.clear(Rgba8::new(50, 50, 50, 255));
        para.base_mut().compose_onto(&mut surface);
        assert!(!para.base().compositor().is_dirty(200.0, 100.0));

        let requests = para.base().redraw_requests();
        let mut surface2 = CpuSurface::new(200, 100).unwrap();
        surface2.clear(Rgba8::new(50, 50, 50, 255));
        para.base_mut().compose_onto(&mut surface2);
        // Clean geometry: no further recompute, no extra redraw request.
        assert_eq!(para.base().redraw_requests(), requests);
    }

    #[test]
    fn modern_tier_masks_via_inverted_path() {
        let mut para = ParallelogramContainer::new(RenderTier::Modern);
        para.set_height_projection_px(20.0);

        let mut surface = CpuSurface::new(200, 100).unwrap();
        surface.clear(Rgba8::new(80, 10, 10, 255));
        para.base_mut().compose_onto(&mut surface);

        // Above the slant at the left edge: outside the parallelogram.
        assert_eq!(surface.pixel(4, 4)[3], 0);
        // Deep inside the quadrilateral.
        assert_eq!(surface.pixel(100, 50)[3], 255);
    }

    #[test]
    fn legacy_tier_masks_via_direct_path() {
        let mut para = ParallelogramContainer::new(RenderTier::Legacy);
        para.set_height_projection_px(20.0);

        let mut surface = CpuSurface::new(200, 100).unwrap();
        surface.clear(Rgba8::new(80, 10, 10, 255));
        para.base_mut().compose_onto(&mut surface);

        assert_eq!(surface.pixel(4, 4)[3], 0);
        assert_eq!(surface.pixel(100, 50)[3], 255);
    }

    #[test]
    fn image_fill_forces_bitmap_technique() {
        let mut arch = ArchContainer::new(RenderTier::Modern);
        assert!(!arch.base().requires_bitmap());
        arch.base_mut().set_fill_image(FillImage {
            width: 1,
            height: 1,
            rgba8_premul: vec![0, 0, 0, 255],
        });
        assert!(arch.base().requires_bitmap());
    }

    #[test]
    fn shadow_outline_requires_elevation_and_tier() {
        let mut arch = ArchContainer::new(RenderTier::Modern);
        arch.set_arch_height_px(-10.0);
        let mut surface = CpuSurface::new(100, 100).unwrap();
        arch.base_mut().compose_onto(&mut surface);

        assert!(arch.base().shadow_outline().is_none());
        arch.base_mut().set_elevation(4.0);
        assert!(arch.base().shadow_outline().is_some());

        let mut legacy = ArchContainer::new(RenderTier::Legacy);
        legacy.base_mut().set_elevation(4.0);
        assert!(legacy.base().shadow_outline().is_none());
    }

    #[test]
    fn background_setters_are_inert() {
        let mut arch = ArchContainer::new(RenderTier::Modern);
        let requests = arch.base().redraw_requests();
        arch.base_mut().set_background_color(Rgba8::new(1, 2, 3, 255));
        assert_eq!(arch.base().redraw_requests(), requests);
    }
}
