//! Document loading: normalize and split a plain document into paragraph runs.
//!
//! Contract:
//! - Input is NFC normalized and CRLF / lone CR line endings become LF.
//! - Output runs each end with their `\n` terminator (except possibly the last).
//! - Concatenating the runs reproduces the normalized document exactly.
//! - Does not log content.

use unicode_normalization::UnicodeNormalization;

pub fn load_segments(body: &str) -> Vec<String> {
    let normalized: String = body.replace("\r\n", "\n").replace('\r', "\n").nfc().collect();
    let runs: Vec<String> = normalized
        .split_inclusive('\n')
        .map(str::to_string)
        .collect();
    tracing::debug!(
        target: "text.load",
        size_bytes = normalized.len(),
        segments = runs.len(),
        "document_segmented"
    );
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_keeping_terminators() {
        let runs = load_segments("a\nb\n\nc");
        assert_eq!(runs, vec!["a\n", "b\n", "\n", "c"]);
    }

    #[test]
    fn normalizes_line_endings_and_nfc() {
        let runs = load_segments("e\u{0301}\r\nx\ry");
        assert_eq!(runs, vec!["\u{00E9}\n", "x\n", "y"]);
    }

    #[test]
    fn empty_document_has_no_runs() {
        assert!(load_segments("").is_empty());
    }
}
