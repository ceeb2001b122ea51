//! Triangular norms combining insertion penalties.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TNorm {
    /// min(a, b)
    Min,
    /// min(a, b) if a + b > 1, else 0
    Nilpotent,
    /// a * b
    #[default]
    Product,
    /// max(0, a + b - 1)
    Lukasiewicz,
    /// a * b / (a + b - a * b)
    Hamacher,
}

impl TNorm {
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            TNorm::Min => a.min(b),
            TNorm::Nilpotent => {
                if a + b <= 1.0 {
                    0.0
                } else {
                    a.min(b)
                }
            }
            TNorm::Product => a * b,
            TNorm::Lukasiewicz => (a + b - 1.0).max(0.0),
            TNorm::Hamacher => {
                let s = a + b - a * b;
                if s > 0.0 {
                    a * b / s
                } else {
                    0.0
                }
            }
        }
    }
}

impl FromStr for TNorm {
    type Err = MineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "m" | "min" | "minimum" => Ok(TNorm::Min),
            "n" | "nilp" | "nilpotent" => Ok(TNorm::Nilpotent),
            "p" | "prod" | "product" => Ok(TNorm::Product),
            "l" | "luka" | "lukasiewicz" => Ok(TNorm::Lukasiewicz),
            "h" | "hama" | "hamacher" => Ok(TNorm::Hamacher),
            _ => Err(MineError::Config(format!("unknown t-norm '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [TNorm; 5] =
        [TNorm::Min, TNorm::Nilpotent, TNorm::Product, TNorm::Lukasiewicz, TNorm::Hamacher];

    #[test]
    fn test_identity_and_zero() {
        for t in ALL {
            for &a in &[0.0, 0.25, 0.5, 1.0] {
                assert!((t.apply(a, 1.0) - a).abs() < 1e-12, "{:?} identity at {}", t, a);
                assert_eq!(t.apply(a, 0.0), 0.0, "{:?} annihilator at {}", t, a);
            }
        }
    }

    #[test]
    fn test_values() {
        assert_eq!(TNorm::Min.apply(0.3, 0.6), 0.3);
        assert_eq!(TNorm::Nilpotent.apply(0.3, 0.6), 0.0);
        assert_eq!(TNorm::Nilpotent.apply(0.5, 0.6), 0.5);
        assert!((TNorm::Product.apply(0.5, 0.6) - 0.3).abs() < 1e-12);
        assert!((TNorm::Lukasiewicz.apply(0.5, 0.6) - 0.1).abs() < 1e-12);
        assert!((TNorm::Hamacher.apply(0.5, 0.5) - 1.0 / 3.0).abs() < 1e-12);
    }
}
