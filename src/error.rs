pub type SilhouetteResult<T> = Result<T, SilhouetteError>;

#[derive(thiserror::Error, Debug)]
pub enum SilhouetteError {
    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("shadow outline error: {0}")]
    Shadow(String),

    #[error("fill error: {0}")]
    Fill(String),

    #[error("raster error: {0}")]
    Raster(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SilhouetteError {
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn shadow(msg: impl Into<String>) -> Self {
        Self::Shadow(msg.into())
    }

    pub fn fill(msg: impl Into<String>) -> Self {
        Self::Fill(msg.into())
    }

    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }
}
