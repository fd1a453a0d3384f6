//! Log-space probabilities.
//!
//! [`LogProb`] keeps `ln(p)` so that products of many small factors, such as
//! the `p_i^{f_i}` terms of a multinomial mass, never underflow before the
//! final exponentiation.

use crate::{Result, SurveyError};

/// A probability stored as its natural logarithm.
///
/// Values are `<= 0`; `0.0` is certainty and negative infinity is an
/// impossible event.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct LogProb(pub f64);

impl LogProb {
    /// Build from a raw probability in `[0, 1]`. Zero maps to
    /// [`LogProb::impossible`].
    ///
    /// # Errors
    ///
    /// Returns an error if `p` is outside `[0, 1]` or not finite.
    pub fn from_prob(p: f64) -> Result<Self> {
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(SurveyError::invalid(format!(
                "LogProb::from_prob: p must be in [0, 1], got {p}"
            )));
        }
        Ok(Self(p.ln()))
    }

    /// Wrap an already-computed log value.
    pub const fn from_ln(ln_p: f64) -> Self {
        Self(ln_p)
    }

    /// Convert back to a raw probability.
    pub fn to_prob(self) -> f64 {
        self.0.exp()
    }

    /// `p^k` in log space. `0^0` is taken as 1, matching the convention for
    /// empty categories in a multinomial product.
    pub fn ln_pow(self, k: u64) -> Self {
        if k == 0 {
            return Self::certain();
        }
        if self.is_impossible() {
            return self;
        }
        Self(self.0 * k as f64)
    }

    /// Multiply two probabilities (add their logs).
    pub fn ln_mul(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    /// Whether this is the impossible event.
    pub fn is_impossible(self) -> bool {
        self.0 == f64::NEG_INFINITY
    }

    /// Certain event: `ln(1) = 0`.
    pub const fn certain() -> Self {
        Self(0.0)
    }

    /// Impossible event: `ln(0) = -inf`.
    pub const fn impossible() -> Self {
        Self(f64::NEG_INFINITY)
    }
}
