//! Metrics estimator: coarse average glyph width and line height.
//!
//! The estimate only seeds character budgets; real line breaks always come
//! from measured layout. It must never be zero, so a probe that cannot answer
//! or that reports a non-positive width fails the estimate.

use crate::error::PaginateError;
use crate::probe::{FontSpec, MeasureProbe, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub avg_char_width: f32,
    pub line_height: f32,
}

impl Metrics {
    /// Whole-pixel glyph width used for per-line division (at least 1px).
    pub fn glyph_width(&self) -> f32 {
        self.avg_char_width.floor().max(1.0)
    }

    pub fn chars_per_line(&self, width_px: f32) -> f32 {
        (width_px / self.glyph_width()).max(0.0)
    }

    /// Rough ceiling on how many characters a viewport could show.
    pub fn char_budget(&self, viewport: Size) -> usize {
        let lines = (viewport.height / self.line_height).max(0.0);
        (lines * self.chars_per_line(viewport.width)).floor() as usize
    }

    pub(crate) fn validate(self) -> Result<Self, PaginateError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.avg_char_width) && ok(self.line_height) {
            Ok(self)
        } else {
            Err(PaginateError::InvalidMetrics {
                avg_char_width: self.avg_char_width,
                line_height: self.line_height,
            })
        }
    }
}

pub fn estimate<P: MeasureProbe + ?Sized>(
    probe: &P,
    sample: &str,
    font: &FontSpec,
) -> Result<Metrics, PaginateError> {
    let chars = sample.chars().count();
    if chars == 0 {
        return Err(PaginateError::InvalidMetrics {
            avg_char_width: 0.0,
            line_height: font.line_height(),
        });
    }
    let width = probe.measure_text_width(sample, font)?;
    let metrics = Metrics {
        avg_char_width: width / chars as f32,
        line_height: font.line_height(),
    }
    .validate()?;
    tracing::debug!(
        target: "render.metrics",
        font = %font,
        avg_char_width = metrics.avg_char_width,
        line_height = metrics.line_height,
        "estimated"
    );
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;

    struct Fixed(f32);
    impl MeasureProbe for Fixed {
        fn measure_text_width(&self, text: &str, _font: &FontSpec) -> Result<f32, ProbeError> {
            Ok(self.0 * text.chars().count() as f32)
        }
    }

    struct Broken;
    impl MeasureProbe for Broken {
        fn measure_text_width(&self, _text: &str, _font: &FontSpec) -> Result<f32, ProbeError> {
            Err(ProbeError::Unavailable { probe: "measure" })
        }
    }

    fn font() -> FontSpec {
        FontSpec::new("Times", 18.0, 1.25)
    }

    #[test]
    fn divides_sample_width_by_length() {
        let m = estimate(&Fixed(9.5), "abcdefghi jklmnopqrstuvwxyz", &font()).unwrap();
        assert!((m.avg_char_width - 9.5).abs() < 1e-4);
        assert_eq!(m.line_height, 23.0);
        assert_eq!(m.glyph_width(), 9.0);
    }

    #[test]
    fn unavailable_probe_fails_loudly() {
        let err = estimate(&Broken, "abc", &font()).unwrap_err();
        assert!(matches!(err, PaginateError::Probe(_)));
    }

    #[test]
    fn zero_width_is_rejected() {
        let err = estimate(&Fixed(0.0), "abc", &font()).unwrap_err();
        assert!(matches!(err, PaginateError::InvalidMetrics { .. }));
    }

    #[test]
    fn budget_from_viewport() {
        let m = Metrics {
            avg_char_width: 10.0,
            line_height: 20.0,
        };
        assert_eq!(m.chars_per_line(100.0), 10.0);
        assert_eq!(m.char_budget(Size::new(100.0, 200.0)), 100);
    }
}
