//! Exact small-sample inference for survey analysis.
//!
//! - **Combinatorics** — lazy [`compositions`] and [`permutations`] enumerators
//! - **Exact multinomial** — [`multinomial_pmf`] and the "at least as extreme"
//!   tail mass [`multinomial_cdf`]
//! - **Kendall's tau** — exact null distribution via [`ConcordanceTable`]
//! - **Hypothesis tests** — exact and asymptotic goodness of fit, Kendall and
//!   Spearman rank association
//!
//! # Quick start
//!
//! ```
//! use surveykit_stats::{multinomial_cdf, ExactOptions};
//!
//! // Eight heads in eight fair tosses, two-sided.
//! let p = multinomial_cdf(&[8, 0], &[0.5, 0.5], &ExactOptions::default()).unwrap();
//! assert!((p - 0.0078125).abs() < 1e-12);
//! ```

pub mod combinatorics;
pub mod kendall;
pub mod multinomial;
pub mod rank;
pub mod testing;

pub use combinatorics::{
    compositions, compositions_bounded, permutations, Compositions, Permutations,
};
pub use kendall::{kendall_exact_p, ConcordanceTable};
pub use multinomial::{multinomial_cdf, multinomial_pmf, ExactOptions, PmfMethod};
pub use testing::TestResult;
