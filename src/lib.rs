#![forbid(unsafe_code)]

pub mod clip;
pub mod composite;
pub mod container;
pub mod ease;
pub mod error;
pub mod geometry;
pub mod hole;
pub mod paint;
pub mod raster;

pub use clip::{ClipCompositor, ClipStrategy};
pub use container::{ArchContainer, ParallelogramContainer, RenderTier, ShapeContainer};
pub use ease::Ease;
pub use error::{SilhouetteError, SilhouetteResult};
pub use geometry::{ArchPosition, CropDirection, Density, DisabledEdge, ShapeConfig};
pub use hole::{
    HoleAnimationEngine, HoleDefaults, HoleFrame, HoleMode, HolePhase, HoleRequest,
    mode_for_target,
};
pub use paint::{BlendMode, FillImage, FillSource, MaskBitmap, Paint, Rgba8};
pub use raster::{CpuSurface, DrawSurface};
