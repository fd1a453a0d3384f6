//! Shared primitives for the surveykit workspace.
//!
//! - **Error types** — [`SurveyError`] and [`Result`]
//! - **Traits** — [`Scored`] and [`Summarizable`] for test results
//! - **Log-space probabilities** — [`LogProb`] for products of many small terms

pub mod error;
pub mod prob;
pub mod traits;

pub use error::{Result, SurveyError};
pub use prob::LogProb;
pub use traits::*;
