//! Traits shared by result types across surveykit crates.

/// A type that carries a single headline number (a p-value for test results).
pub trait Scored {
    /// The score value.
    fn score(&self) -> f64;
}

/// A type that can produce a one-line summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
