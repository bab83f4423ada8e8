use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    OutQuad,
    InOutQuad,
    /// Passes beyond 1.0 before settling, for a "pop" effect. Tension 2.0
    /// gives the classic overshoot feel.
    Overshoot { tension: f64 },
}

impl Ease {
    pub const DEFAULT_OVERSHOOT: Self = Self::Overshoot { tension: 2.0 };

    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::Overshoot { tension } => {
                let t = t - 1.0;
                t * t * ((tension + 1.0) * t + tension) + 1.0
            }
        }
    }
}
