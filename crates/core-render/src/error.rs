//! Error taxonomy for measurement, hit-testing and pagination.
//!
//! A missed hit-test is not an error: the mapper answers `Ok(None)` and the
//! caller keeps its previous state. Unsplittable tokens are recovered inside
//! the engine and surface only as `Fragment::hard_split`.

use crate::probe::FragmentRef;
use thiserror::Error;

/// A probe could not answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("{probe} probe unavailable")]
    Unavailable { probe: &'static str },
    #[error("fragment {0} is not part of the current render")]
    FragmentNotRendered(FragmentRef),
}

/// Pagination or estimation failed; the displayed window must be left as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaginateError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("invalid metrics: avg char width {avg_char_width}, line height {line_height}")]
    InvalidMetrics {
        avg_char_width: f32,
        line_height: f32,
    },
    #[error("viewport has no drawable area ({width}x{height})")]
    EmptyViewport { width: f32, height: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_errors_convert() {
        let err: PaginateError = ProbeError::Unavailable { probe: "hit-test" }.into();
        assert_eq!(err.to_string(), "hit-test probe unavailable");
    }

    #[test]
    fn fragment_ref_in_message() {
        let err = ProbeError::FragmentNotRendered(FragmentRef::new(2, 1));
        assert_eq!(
            err.to_string(),
            "fragment block 2/fragment 1 is not part of the current render"
        );
    }
}
