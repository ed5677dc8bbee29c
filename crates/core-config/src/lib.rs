//! Configuration loading and parsing.
//!
//! Parses `folio.toml` (or an override path provided by the binary). Every
//! field has a default and unknown keys are ignored, so a partial or missing
//! file yields a usable configuration. A file that fails to parse falls back
//! to defaults with a warning rather than aborting startup.
//!
//! Raw parsed values are retained in `Config::file`; `Config::apply_context`
//! derives the clamped `Effective` values against the current viewport so a
//! later resize can re-clamp from the raw numbers.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf, time::Duration};
use tracing::{info, warn};

/// Current viewport geometry the configuration is clamped against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfigContext {
    pub viewport_width_px: f32,
    pub viewport_height_px: f32,
}

impl ConfigContext {
    pub fn new(viewport_width_px: f32, viewport_height_px: f32) -> Self {
        Self {
            viewport_width_px,
            viewport_height_px,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FontConfig {
    #[serde(default = "FontConfig::default_family")]
    pub family: String,
    #[serde(default = "FontConfig::default_size_px")]
    pub size_px: f32,
    /// Line height as a multiple of the font size (CSS `line-height: 125%`).
    #[serde(default = "FontConfig::default_line_spacing")]
    pub line_spacing: f32,
    /// Fixed alphabet rendered once to estimate the average glyph width.
    #[serde(default = "FontConfig::default_sample")]
    pub sample: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            family: Self::default_family(),
            size_px: Self::default_size_px(),
            line_spacing: Self::default_line_spacing(),
            sample: Self::default_sample(),
        }
    }
}

impl FontConfig {
    fn default_family() -> String {
        "Times".to_string()
    }
    const fn default_size_px() -> f32 {
        18.0
    }
    const fn default_line_spacing() -> f32 {
        1.25
    }
    fn default_sample() -> String {
        "abcdefghi jklmnopqrstuvwxyz".to_string()
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Fraction of the viewport height the rendered blocks may occupy.
    #[serde(default = "LayoutConfig::default_fit_ratio")]
    pub fit_ratio: f32,
    #[serde(default = "LayoutConfig::default_margin_left_pct")]
    pub margin_left_pct: u8,
    #[serde(default = "LayoutConfig::default_margin_right_pct")]
    pub margin_right_pct: u8,
    #[serde(default = "LayoutConfig::default_margin_top_pct")]
    pub margin_top_pct: u8,
    /// Upper bound on trial layouts per pagination pass.
    #[serde(default = "LayoutConfig::default_max_trial_passes")]
    pub max_trial_passes: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            fit_ratio: Self::default_fit_ratio(),
            margin_left_pct: Self::default_margin_left_pct(),
            margin_right_pct: Self::default_margin_right_pct(),
            margin_top_pct: Self::default_margin_top_pct(),
            max_trial_passes: Self::default_max_trial_passes(),
        }
    }
}

impl LayoutConfig {
    const fn default_fit_ratio() -> f32 {
        0.95
    }
    const fn default_margin_left_pct() -> u8 {
        5
    }
    const fn default_margin_right_pct() -> u8 {
        8
    }
    const fn default_margin_top_pct() -> u8 {
        5
    }
    const fn default_max_trial_passes() -> u32 {
        64
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScrollConfig {
    #[serde(default = "ScrollConfig::default_wheel_delay_ms")]
    pub wheel_delay_ms: u64,
    #[serde(default = "ScrollConfig::default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Raw wheel delta reported for one detent.
    #[serde(default = "ScrollConfig::default_wheel_notch")]
    pub wheel_notch: i32,
    /// Divisor applied to a single detent before scaling by the lines factor.
    #[serde(default = "ScrollConfig::default_notch_divisor")]
    pub notch_divisor: i32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            wheel_delay_ms: Self::default_wheel_delay_ms(),
            page_delay_ms: Self::default_page_delay_ms(),
            wheel_notch: Self::default_wheel_notch(),
            notch_divisor: Self::default_notch_divisor(),
        }
    }
}

impl ScrollConfig {
    const fn default_wheel_delay_ms() -> u64 {
        20
    }
    const fn default_page_delay_ms() -> u64 {
        20
    }
    const fn default_wheel_notch() -> i32 {
        120
    }
    const fn default_notch_divisor() -> i32 {
        6
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CursorConfig {
    #[serde(default = "CursorConfig::default_blink_interval_ms")]
    pub blink_interval_ms: u64,
    /// Number of visibility toggles before the caret settles visible.
    #[serde(default = "CursorConfig::default_blink_toggles")]
    pub blink_toggles: u32,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            blink_interval_ms: Self::default_blink_interval_ms(),
            blink_toggles: Self::default_blink_toggles(),
        }
    }
}

impl CursorConfig {
    const fn default_blink_interval_ms() -> u64 {
        500
    }
    const fn default_blink_toggles() -> u32 {
        30
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StyleConfig {
    /// Fragments containing this marker render in heading style.
    #[serde(default = "StyleConfig::default_heading_marker")]
    pub heading_marker: String,
    #[serde(default = "StyleConfig::default_heading_scale")]
    pub heading_scale: f32,
    #[serde(default = "StyleConfig::default_heading_line_scale")]
    pub heading_line_scale: f32,
    /// Render `_word_` runs as emphasized child nodes.
    #[serde(default = "StyleConfig::default_emphasis")]
    pub emphasis: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            heading_marker: Self::default_heading_marker(),
            heading_scale: Self::default_heading_scale(),
            heading_line_scale: Self::default_heading_line_scale(),
            emphasis: Self::default_emphasis(),
        }
    }
}

impl StyleConfig {
    fn default_heading_marker() -> String {
        "Chapter".to_string()
    }
    const fn default_heading_scale() -> f32 {
        1.4
    }
    const fn default_heading_line_scale() -> f32 {
        1.5
    }
    const fn default_emphasis() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub font: FontConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub style: StyleConfig,
}

/// Values after clamping against a `ConfigContext`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effective {
    pub fit_ratio: f32,
    pub margin_left_pct: u8,
    pub margin_right_pct: u8,
    pub margin_top_pct: u8,
    pub notch_divisor: i32,
    pub line_spacing: f32,
}

impl Default for Effective {
    fn default() -> Self {
        Self {
            fit_ratio: LayoutConfig::default_fit_ratio(),
            margin_left_pct: LayoutConfig::default_margin_left_pct(),
            margin_right_pct: LayoutConfig::default_margin_right_pct(),
            margin_top_pct: LayoutConfig::default_margin_top_pct(),
            notch_divisor: ScrollConfig::default_notch_divisor(),
            line_spacing: FontConfig::default_line_spacing(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub effective: Effective,
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("folio.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("folio").join("folio.toml");
    }
    PathBuf::from("folio.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Ok(Config {
            raw: Some(content),
            file,
            effective: Effective::default(),
        }),
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn wheel_delay(&self) -> Duration {
        Duration::from_millis(self.file.scroll.wheel_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.file.scroll.page_delay_ms)
    }

    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.file.cursor.blink_interval_ms)
    }

    /// Clamp raw values against the viewport. Returns the effective values.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> Effective {
        let layout = &self.file.layout;

        let raw_ratio = layout.fit_ratio;
        let fit_ratio = if raw_ratio.is_finite() && raw_ratio > 0.0 {
            raw_ratio.min(1.0)
        } else {
            LayoutConfig::default_fit_ratio()
        };
        if fit_ratio != raw_ratio {
            info!(target: "config", raw = raw_ratio, clamped = fit_ratio, "fit_ratio_clamped");
        }

        // Leave at least a tenth of the width for text.
        let (left, right) = (layout.margin_left_pct, layout.margin_right_pct);
        let (margin_left_pct, margin_right_pct) = if u16::from(left) + u16::from(right) > 90 {
            let scale = 90.0 / (f32::from(left) + f32::from(right));
            let l = (f32::from(left) * scale).floor() as u8;
            let r = (f32::from(right) * scale).floor() as u8;
            info!(
                target: "config",
                raw_left = left,
                raw_right = right,
                clamped_left = l,
                clamped_right = r,
                viewport_width_px = ctx.viewport_width_px,
                "horizontal_margins_clamped"
            );
            (l, r)
        } else {
            (left, right)
        };

        let margin_top_pct = layout.margin_top_pct.min(50);
        if margin_top_pct != layout.margin_top_pct {
            info!(
                target: "config",
                raw = layout.margin_top_pct,
                clamped = margin_top_pct,
                viewport_height_px = ctx.viewport_height_px,
                "top_margin_clamped"
            );
        }

        let notch_divisor = self.file.scroll.notch_divisor.max(1);
        if notch_divisor != self.file.scroll.notch_divisor {
            info!(target: "config", raw = self.file.scroll.notch_divisor, clamped = notch_divisor, "notch_divisor_clamped");
        }

        let raw_spacing = self.file.font.line_spacing;
        let line_spacing = if raw_spacing.is_finite() && raw_spacing > 0.0 {
            raw_spacing
        } else {
            FontConfig::default_line_spacing()
        };
        if line_spacing != raw_spacing {
            info!(target: "config", raw = raw_spacing, clamped = line_spacing, "line_spacing_clamped");
        }

        self.effective = Effective {
            fit_ratio,
            margin_left_pct,
            margin_right_pct,
            margin_top_pct,
            notch_divisor,
            line_spacing,
        };
        self.effective
    }

    /// Re-clamp after a resize. Returns `Some(new)` when the effective values changed.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<Effective> {
        let prev = self.effective;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    fn ctx() -> ConfigContext {
        ConfigContext::new(800.0, 600.0)
    }

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file.font.size_px, 18.0);
        assert_eq!(cfg.file.font.line_spacing, 1.25);
        assert_eq!(cfg.file.font.sample.chars().count(), 27);
        assert_eq!(cfg.file.layout.fit_ratio, 0.95);
        assert_eq!(cfg.file.cursor.blink_interval_ms, 500);
        assert_eq!(cfg.file.cursor.blink_toggles, 30);
        assert_eq!(cfg.file.scroll.wheel_delay_ms, 20);
        assert_eq!(cfg.file.style.heading_marker, "Chapter");
    }

    #[test]
    fn parses_partial_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[font]\nsize_px = 14.0\n[cursor]\nblink_toggles = 4\n[scroll]\nwheel_delay_ms = 5\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.font.size_px, 14.0);
        assert_eq!(cfg.file.font.family, "Times", "unset keys keep defaults");
        assert_eq!(cfg.file.cursor.blink_toggles, 4);
        assert_eq!(cfg.wheel_delay(), Duration::from_millis(5));
        assert!(cfg.raw.is_some());
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[font\nsize_px = ").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file, ConfigFile::default());
    }

    #[test]
    fn clamps_out_of_range_fit_ratio() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[layout]\nfit_ratio = 1.7\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let eff = cfg.apply_context(ctx());
        assert_eq!(eff.fit_ratio, 1.0);

        cfg.file.layout.fit_ratio = -2.0;
        let eff = cfg.apply_context(ctx());
        assert_eq!(eff.fit_ratio, 0.95);
    }

    #[test]
    fn clamps_margins_leaving_text_width() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[layout]\nmargin_left_pct = 60\nmargin_right_pct = 60\nmargin_top_pct = 80\n",
        )
        .unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let eff = cfg.apply_context(ctx());
        assert!(u16::from(eff.margin_left_pct) + u16::from(eff.margin_right_pct) <= 90);
        assert_eq!(eff.margin_top_pct, 50);
    }

    #[test]
    fn recompute_reports_change_only_once() {
        let mut cfg = Config::default();
        assert_eq!(cfg.recompute_with_context(ctx()), None);
        cfg.file.scroll.notch_divisor = 0;
        let changed = cfg.recompute_with_context(ctx());
        assert_eq!(changed.map(|e| e.notch_divisor), Some(1));
        assert_eq!(cfg.recompute_with_context(ctx()), None);
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let mut cfg = Config::default();
        cfg.file.layout.fit_ratio = 3.0;
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            cfg.apply_context(ctx());
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("fit_ratio_clamped"));
        assert_eq!(cfg.effective.fit_ratio, 1.0);
    }
}
