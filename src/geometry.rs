//! Declarative shape parameters and the pure path builders behind them.
//!
//! Every builder maps `(config, width, height)` to a closed [`BezPath`] in
//! surface-local pixel coordinates. Builders are deterministic and have no
//! side effects; non-positive dimensions yield the identity path (the full
//! surface rectangle, i.e. no clipping).

use kurbo::{BezPath, Point, Rect, Shape};

/// Which edge of the surface an arch curve is attached to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArchPosition {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

/// Whether a curved or slanted edge bows into or away from the nominal
/// rectangular bounds. Derived from the sign of the arch height, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropDirection {
    Inside,
    Outside,
}

/// Which parallelogram edge keeps a vertical slant instead of the projection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DisabledEdge {
    #[default]
    None,
    Left,
    Right,
}

/// Immutable-per-frame parameter set for one shape kind.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ShapeConfig {
    Arch {
        position: ArchPosition,
        /// Signed distance in px. Sign encodes the crop direction: `<= 0`
        /// crops inside the bounds, `> 0` bulges outside them.
        arch_height_px: f64,
    },
    Parallelogram {
        height_projection_px: f64,
        disabled_edge: DisabledEdge,
    },
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self::Arch {
            position: ArchPosition::Top,
            arch_height_px: 0.0,
        }
    }
}

impl ShapeConfig {
    pub fn crop_direction(&self) -> CropDirection {
        match self {
            Self::Arch { arch_height_px, .. } if *arch_height_px > 0.0 => CropDirection::Outside,
            _ => CropDirection::Inside,
        }
    }

    /// Largest distance by which the built path may extend past the nominal
    /// `[0,width] x [0,height]` rectangle.
    pub fn outset(&self) -> f64 {
        match self {
            Self::Arch { arch_height_px, .. } => arch_height_px.abs(),
            Self::Parallelogram {
                height_projection_px,
                ..
            } => height_projection_px.abs(),
        }
    }

    /// Builds the closed clip path for this shape at the given surface size.
    pub fn build_path(&self, width: f64, height: f64) -> BezPath {
        if width <= 0.0 || height <= 0.0 {
            return identity_path(width, height);
        }
        match *self {
            Self::Arch {
                position,
                arch_height_px,
            } => arch_path(position, arch_height_px, width, height),
            Self::Parallelogram {
                height_projection_px,
                disabled_edge,
            } => parallelogram_path(height_projection_px, disabled_edge, width, height),
        }
    }
}

/// Full-rectangle path: clipping against it is a no-op.
pub fn identity_path(width: f64, height: f64) -> BezPath {
    Rect::new(0.0, 0.0, width.max(0.0), height.max(0.0)).to_path(0.1)
}

fn arch_path(position: ArchPosition, height_px: f64, w: f64, h: f64) -> BezPath {
    let inside = height_px <= 0.0;
    let a = height_px.abs();
    let mut path = BezPath::new();

    match position {
        ArchPosition::Top => {
            if inside {
                path.move_to(Point::new(0.0, h));
                path.line_to(Point::new(0.0, 0.0));
                path.quad_to(Point::new(w / 2.0, 2.0 * a), Point::new(w, 0.0));
                path.line_to(Point::new(w, h));
            } else {
                path.move_to(Point::new(0.0, a));
                path.quad_to(Point::new(w / 2.0, -a), Point::new(w, a));
                path.line_to(Point::new(w, h));
                path.line_to(Point::new(0.0, h));
            }
        }
        ArchPosition::Bottom => {
            if inside {
                path.move_to(Point::new(0.0, 0.0));
                path.line_to(Point::new(0.0, h));
                path.quad_to(Point::new(w / 2.0, h - 2.0 * a), Point::new(w, h));
                path.line_to(Point::new(w, 0.0));
            } else {
                path.move_to(Point::new(0.0, 0.0));
                path.line_to(Point::new(0.0, h - a));
                path.quad_to(Point::new(w / 2.0, h + a), Point::new(w, h - a));
                path.line_to(Point::new(w, 0.0));
            }
        }
        ArchPosition::Left => {
            if inside {
                path.move_to(Point::new(w, 0.0));
                path.line_to(Point::new(0.0, 0.0));
                path.quad_to(Point::new(2.0 * a, h / 2.0), Point::new(0.0, h));
                path.line_to(Point::new(w, h));
            } else {
                path.move_to(Point::new(w, 0.0));
                path.line_to(Point::new(a, 0.0));
                path.quad_to(Point::new(-a, h / 2.0), Point::new(a, h));
                path.line_to(Point::new(w, h));
            }
        }
        ArchPosition::Right => {
            if inside {
                path.move_to(Point::new(0.0, 0.0));
                path.line_to(Point::new(w, 0.0));
                path.quad_to(Point::new(w - 2.0 * a, h / 2.0), Point::new(w, h));
                path.line_to(Point::new(0.0, h));
            } else {
                path.move_to(Point::new(0.0, 0.0));
                path.line_to(Point::new(w - a, 0.0));
                path.quad_to(Point::new(w + a, h / 2.0), Point::new(w - a, h));
                path.line_to(Point::new(0.0, h));
            }
        }
    }

    path.close_path();
    path
}

fn parallelogram_path(projection_px: f64, disabled: DisabledEdge, w: f64, h: f64) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(Point::new(0.0, h));
    if disabled == DisabledEdge::Left {
        path.line_to(Point::new(0.0, 0.0));
    } else {
        path.line_to(Point::new(projection_px, 0.0));
    }
    path.line_to(Point::new(w, 0.0));
    if disabled == DisabledEdge::Right {
        path.line_to(Point::new(w, h));
    } else {
        path.line_to(Point::new(w - projection_px, h));
    }
    path.close_path();
    path
}

/// Display density scale for dp <-> px conversion at the host boundary.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Density {
    pub scale: f64,
}

impl Default for Density {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl Density {
    pub fn new(scale: f64) -> Self {
        Self { scale }
    }

    pub fn dp_to_px(&self, dp: f64) -> f64 {
        dp * self.scale
    }

    pub fn px_to_dp(&self, px: f64) -> f64 {
        px / self.scale
    }
}
