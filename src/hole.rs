//! Animated hole cutouts over a full-screen overlay.
//!
//! The engine is a time-driven state machine: `Idle -> AnimatingForward ->
//! Settled -> AnimatingReverse -> Idle`. Each tick is a pure function of the
//! eased elapsed fraction and the stored request, so the engine holds nothing
//! between ticks beyond the request and its start timestamp. A new request
//! supersedes whatever is in flight, restarting from the neutral start value.

use kurbo::{BezPath, Rect, RoundedRect, Shape};

use crate::{
    ease::Ease,
    error::{SilhouetteError, SilhouetteResult},
    geometry::identity_path,
    paint::{BlendMode, Paint, Rgba8},
    raster::DrawSurface,
};

/// Overlay-level attributes, normally deserialized from host markup.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HoleDefaults {
    pub fill_color: Rgba8,
    pub size_offset_ratio: f64,
    pub switch_threshold: f64,
    pub duration_ms: u64,
}

impl Default for HoleDefaults {
    fn default() -> Self {
        Self {
            fill_color: Rgba8::BLACK,
            size_offset_ratio: 1.0,
            switch_threshold: 1.0,
            duration_ms: 300,
        }
    }
}

/// Geometric family used for the cutout, chosen from target aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoleMode {
    Circle,
    RoundedRect,
}

/// `RoundedRect` when the target is elongated past the threshold, `Circle`
/// otherwise.
pub fn mode_for_target(target: Rect, switch_threshold: f64) -> HoleMode {
    let max = target.width().max(target.height());
    let min = target.width().min(target.height());
    if max > 0.0 && (min / max) < switch_threshold {
        HoleMode::RoundedRect
    } else {
        HoleMode::Circle
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoleRequest {
    /// Target bounds in screen coordinates.
    pub target: Rect,
    pub size_offset_ratio: f64,
    pub switch_threshold: f64,
    pub duration_ms: u64,
    pub reversed: bool,
}

impl HoleRequest {
    fn clamped(mut self) -> Self {
        self.size_offset_ratio = self.size_offset_ratio.max(0.0);
        self.switch_threshold = self.switch_threshold.clamp(0.0, 1.0);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HolePhase {
    Idle,
    AnimatingForward,
    Settled,
    AnimatingReverse,
}

/// What the overlay should draw for one tick.
#[derive(Clone, Debug, PartialEq)]
pub enum HoleFrame {
    /// Fully opaque, hole-free overlay.
    Opaque,
    /// Radial-gradient paint across the whole overlay.
    Circle { paint: Paint },
    /// Overlay rectangle with the rounded rectangle subtracted, solid fill.
    RoundedRect { path: BezPath, paint: Paint },
}

#[derive(Clone, Copy, Debug)]
struct ActiveRun {
    request: HoleRequest,
    mode: HoleMode,
    started_at_ms: u64,
}

impl ActiveRun {
    fn fraction_at(&self, now_ms: u64) -> f64 {
        if self.request.duration_ms == 0 {
            return 1.0;
        }
        let elapsed = now_ms.saturating_sub(self.started_at_ms) as f64;
        (elapsed / self.request.duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// One engine per overlay surface; at most one active hole at a time.
#[derive(Clone, Debug)]
pub struct HoleAnimationEngine {
    overlay_width: f64,
    overlay_height: f64,
    defaults: HoleDefaults,
    ease: Ease,
    active: Option<ActiveRun>,
    phase: HolePhase,
    redraw_requests: u64,
}

impl HoleAnimationEngine {
    pub fn new(overlay_width: f64, overlay_height: f64, defaults: HoleDefaults) -> Self {
        Self {
            overlay_width,
            overlay_height,
            defaults,
            ease: Ease::DEFAULT_OVERSHOOT,
            active: None,
            phase: HolePhase::Idle,
            redraw_requests: 0,
        }
    }

    pub fn phase(&self) -> HolePhase {
        self.phase
    }

    pub fn has_hole(&self) -> bool {
        self.active.is_some()
    }

    /// Total redraw requests fired toward the host scheduler. The host is
    /// expected to coalesce these into frames.
    pub fn redraw_requests(&self) -> u64 {
        self.redraw_requests
    }

    pub fn on_size_changed(&mut self, width: f64, height: f64) {
        self.overlay_width = width;
        self.overlay_height = height;
    }

    /// Starts a forward run around `target` with the overlay defaults.
    pub fn animate_hole(&mut self, target: Rect, now_ms: u64) -> SilhouetteResult<()> {
        let d = self.defaults;
        self.animate_hole_with(
            HoleRequest {
                target,
                size_offset_ratio: d.size_offset_ratio,
                switch_threshold: d.switch_threshold,
                duration_ms: d.duration_ms,
                reversed: false,
            },
            now_ms,
        )
    }

    /// Starts a run with explicit parameters, superseding any run in flight.
    /// A zero-area target is rejected and leaves the engine untouched.
    pub fn animate_hole_with(&mut self, request: HoleRequest, now_ms: u64) -> SilhouetteResult<()> {
        if request.target.width() <= 0.0 || request.target.height() <= 0.0 {
            return Err(SilhouetteError::geometry("hole target has no area"));
        }
        let request = request.clamped();
        let mode = mode_for_target(request.target, request.switch_threshold);

        if self.active.is_some() {
            tracing::debug!(?mode, "superseding in-flight hole run");
        } else {
            tracing::debug!(?mode, reversed = request.reversed, "starting hole run");
        }

        self.phase = if request.reversed {
            HolePhase::AnimatingReverse
        } else {
            HolePhase::AnimatingForward
        };
        self.active = Some(ActiveRun {
            request,
            mode,
            started_at_ms: now_ms,
        });
        self.request_redraw();
        Ok(())
    }

    /// Replays the held request in reverse; with no hole active this only
    /// triggers a redraw.
    pub fn remove_all_hole(&mut self, now_ms: u64) {
        match self.active {
            Some(run) => {
                let mut request = run.request;
                request.reversed = true;
                if let Err(err) = self.animate_hole_with(request, now_ms) {
                    tracing::warn!(%err, "stored hole request no longer replayable");
                    self.request_redraw();
                }
            }
            None => self.request_redraw(),
        }
    }

    /// Computes the frame for `now_ms` and advances the state machine.
    /// Reaching the reverse endpoint clears all held state and fires one
    /// final redraw so the overlay returns to a hole-free fill.
    pub fn sample(&mut self, now_ms: u64) -> HoleFrame {
        let Some(run) = self.active else {
            return HoleFrame::Opaque;
        };

        let fraction = run.fraction_at(now_ms);
        let eased = self.ease.apply(fraction);
        // Overshoot may push the value past either endpoint; past zero on a
        // reverse run means the hole is gone for good.
        let value = if run.request.reversed {
            1.0 - eased
        } else {
            eased
        };

        if run.request.reversed && value <= 0.0 {
            self.active = None;
            self.phase = HolePhase::Idle;
            self.request_redraw();
            tracing::debug!("hole reverse run completed; state cleared");
            return HoleFrame::Opaque;
        }

        if fraction >= 1.0 {
            if self.phase == HolePhase::AnimatingForward {
                self.phase = HolePhase::Settled;
                tracing::debug!("hole settled fully open");
            }
        } else {
            self.request_redraw();
        }

        if value <= 0.0 {
            return HoleFrame::Opaque;
        }

        match run.mode {
            HoleMode::Circle => self.circle_frame(&run.request, value),
            HoleMode::RoundedRect => self.rounded_rect_frame(&run.request, value),
        }
    }

    /// Samples and draws one tick onto the overlay surface.
    pub fn render_tick(
        &mut self,
        now_ms: u64,
        surface: &mut dyn DrawSurface,
    ) -> SilhouetteResult<()> {
        let overlay = self.overlay_rect();
        let fill = Paint::Solid(self.defaults.fill_color);
        match self.sample(now_ms) {
            HoleFrame::Opaque => surface.fill_rect(overlay, &fill, BlendMode::SrcOver),
            HoleFrame::Circle { paint } => surface.fill_rect(overlay, &paint, BlendMode::SrcOver),
            HoleFrame::RoundedRect { path, paint } => {
                surface.fill_path(&path, &paint, BlendMode::SrcOver)
            }
        }
    }

    fn overlay_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.overlay_width, self.overlay_height)
    }

    fn circle_frame(&self, request: &HoleRequest, value: f64) -> HoleFrame {
        let full_radius =
            request.target.width().max(request.target.height()) * request.size_offset_ratio;
        let radius = full_radius * value;
        if radius <= 0.0 {
            return HoleFrame::Opaque;
        }
        HoleFrame::Circle {
            paint: Paint::hole_gradient(request.target.center(), radius, self.defaults.fill_color),
        }
    }

    fn rounded_rect_frame(&self, request: &HoleRequest, value: f64) -> HoleFrame {
        let center = request.target.center();
        let half_x = request.target.width() / 2.0;
        let half_y = request.target.height() / 2.0;
        let corner_radius = half_x.min(half_y);

        let cutout = RoundedRect::new(
            center.x - half_x * value,
            center.y - half_y * value,
            center.x + half_x * value,
            center.y + half_y * value,
            corner_radius,
        );

        // Overlay rect one way, cutout wound the other way: nonzero winding
        // leaves the cutout region empty.
        let mut path = identity_path(self.overlay_width, self.overlay_height);
        let mut inner = cutout.to_path(0.1);
        if inner.area().signum() == path.area().signum() {
            inner = inner.reverse_subpaths();
        }
        for &el in inner.elements() {
            path.push(el);
        }

        HoleFrame::RoundedRect {
            path,
            paint: Paint::Solid(self.defaults.fill_color),
        }
    }

    fn request_redraw(&mut self) {
        self.redraw_requests += 1;
        tracing::trace!(total = self.redraw_requests, "redraw requested");
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Point;

    use super::*;

    fn engine() -> HoleAnimationEngine {
        HoleAnimationEngine::new(800.0, 600.0, HoleDefaults::default())
    }

    fn request(target: Rect, reversed: bool) -> HoleRequest {
        HoleRequest {
            target,
            size_offset_ratio: 1.0,
            switch_threshold: 0.5,
            duration_ms: 300,
            reversed,
        }
    }

    #[test]
    fn mode_selection_follows_aspect_ratio() {
        let square = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert_eq!(mode_for_target(square, 0.5), HoleMode::Circle);

        let elongated = Rect::new(0.0, 0.0, 20.0, 100.0);
        assert_eq!(mode_for_target(elongated, 0.5), HoleMode::RoundedRect);
    }

    #[test]
    fn zero_area_target_is_a_no_op() {
        let mut engine = engine();
        let err = engine
            .animate_hole(Rect::new(10.0, 10.0, 10.0, 50.0), 0)
            .unwrap_err();
        assert!(err.to_string().contains("no area"));
        assert_eq!(engine.phase(), HolePhase::Idle);
        assert!(!engine.has_hole());
        assert_eq!(engine.redraw_requests(), 0);
    }

    #[test]
    fn remove_all_hole_without_hole_requests_one_redraw() {
        let mut engine = engine();
        engine.remove_all_hole(0);
        assert_eq!(engine.redraw_requests(), 1);
        assert_eq!(engine.phase(), HolePhase::Idle);
        assert!(!engine.has_hole());
    }

    #[test]
    fn forward_run_settles_then_reverse_returns_to_idle() {
        let mut engine = engine();
        let target = Rect::new(100.0, 100.0, 200.0, 200.0);
        engine
            .animate_hole_with(request(target, false), 0)
            .unwrap();
        assert_eq!(engine.phase(), HolePhase::AnimatingForward);

        let mid = engine.sample(150);
        assert!(matches!(mid, HoleFrame::Circle { .. }));

        engine.sample(300);
        assert_eq!(engine.phase(), HolePhase::Settled);
        assert!(engine.has_hole());

        engine.remove_all_hole(1000);
        assert_eq!(engine.phase(), HolePhase::AnimatingReverse);

        assert_eq!(engine.sample(1300), HoleFrame::Opaque);
        assert_eq!(engine.phase(), HolePhase::Idle);
        assert!(!engine.has_hole());
        // Equivalent to never having animated.
        assert_eq!(engine.sample(2000), HoleFrame::Opaque);
    }

    #[test]
    fn reverse_start_shows_fully_open_hole() {
        let mut engine = engine();
        let target = Rect::new(0.0, 0.0, 100.0, 100.0);
        engine.animate_hole_with(request(target, true), 0).unwrap();
        let HoleFrame::Circle { paint } = engine.sample(0) else {
            panic!("expected a circle frame at reverse start");
        };
        let Paint::Radial { radius, .. } = paint else {
            panic!("expected radial paint");
        };
        assert_eq!(radius, 100.0);
    }

    #[test]
    fn new_request_supersedes_in_flight_run() {
        let mut engine = engine();
        let first = Rect::new(0.0, 0.0, 100.0, 100.0);
        let second = Rect::new(0.0, 0.0, 20.0, 100.0);
        engine.animate_hole_with(request(first, false), 0).unwrap();
        engine.sample(100);

        engine
            .animate_hole_with(request(second, false), 100)
            .unwrap();
        assert_eq!(engine.phase(), HolePhase::AnimatingForward);
        // Restarted from the neutral value: right at start the hole is closed.
        assert_eq!(engine.sample(100), HoleFrame::Opaque);
        // And it now runs in rounded-rect mode for the elongated target.
        assert!(matches!(
            engine.sample(250),
            HoleFrame::RoundedRect { .. }
        ));
    }

    #[test]
    fn rounded_rect_path_has_zero_winding_inside_cutout() {
        let mut engine = engine();
        let target = Rect::new(300.0, 200.0, 420.0, 240.0);
        engine
            .animate_hole_with(request(target, false), 0)
            .unwrap();
        let HoleFrame::RoundedRect { path, .. } = engine.sample(300) else {
            panic!("expected rounded-rect frame");
        };
        assert_eq!(path.winding(target.center()), 0);
        assert_ne!(path.winding(Point::new(10.0, 10.0)), 0);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut engine = engine();
        let target = Rect::new(0.0, 0.0, 50.0, 50.0);
        let mut req = request(target, false);
        req.duration_ms = 0;
        engine.animate_hole_with(req, 42).unwrap();
        assert!(matches!(engine.sample(42), HoleFrame::Circle { .. }));
        assert_eq!(engine.phase(), HolePhase::Settled);
    }

    #[test]
    fn circle_gradient_radius_exceeds_target_during_overshoot() {
        let mut engine = engine();
        let target = Rect::new(0.0, 0.0, 100.0, 100.0);
        engine
            .animate_hole_with(request(target, false), 0)
            .unwrap();
        let mut peak = 0.0f64;
        for t in (0..=300).step_by(10) {
            if let HoleFrame::Circle { paint: Paint::Radial { radius, .. } } = engine.sample(t) {
                peak = peak.max(radius);
            }
        }
        assert!(peak > 100.0);
    }

    #[test]
    fn defaults_json_round_trip_with_missing_fields() {
        let de: HoleDefaults = serde_json::from_str("{}").unwrap();
        assert_eq!(de, HoleDefaults::default());

        let de: HoleDefaults =
            serde_json::from_str(r#"{"duration_ms": 500, "switch_threshold": 0.5}"#).unwrap();
        assert_eq!(de.duration_ms, 500);
        assert_eq!(de.switch_threshold, 0.5);
        assert_eq!(de.fill_color, Rgba8::BLACK);
    }
}
