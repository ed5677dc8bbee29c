//! Folio entrypoint: a paginated, read-only terminal document viewer.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, ConfigContext, load_from};
use core_events::{CommandEvent, Event, HostScheduler, InputEvent, TaskQueue};
use core_model::ViewController;
use core_render::grid::Margins;
use core_render::paint::paint_frame;
use core_render::probe::{FontSpec, Size};
use core_render::writer::Writer;
use core_render::{GridSurface, LineBlock, Metrics, estimate};
use core_terminal::{CellGeometry, CrosstermBackend, TerminalBackend, translate};
use core_text::{SegmentStore, TextSequence};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// Longest wait for terminal input when no task is due.
const IDLE_POLL: Duration = Duration::from_millis(250);

type Controller = ViewController<SegmentStore, GridSurface>;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Folio paginated document viewer")]
struct Args {
    /// Document to open (UTF-8 text). If omitted an empty document is shown.
    pub path: Option<PathBuf>,
    /// Optional configuration file path (overrides discovery of `folio.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Print the first page as line blocks and exit without entering the terminal.
    #[arg(long = "dump")]
    pub dump: bool,
    /// Columns of the headless grid used by `--dump`.
    #[arg(long = "cols", default_value_t = 80)]
    pub cols: u16,
    /// Rows of the headless grid used by `--dump`.
    #[arg(long = "rows", default_value_t = 24)]
    pub rows: u16,
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("folio.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "folio.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; drop the guard so the writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Read and segment the document. A missing or unreadable file opens empty.
fn load_document(path: Option<&Path>) -> SegmentStore {
    let Some(path) = path else {
        return SegmentStore::new();
    };
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let store = SegmentStore::from_document(&content);
            tracing::debug!(
                target: "io",
                file = %path.display(),
                size_bytes = content.len(),
                segments = store.segment_count(),
                "file_read_ok"
            );
            store
        }
        Err(e) => {
            error!(target: "io", file = %path.display(), ?e, "file_open_error");
            SegmentStore::new()
        }
    }
}

/// Pixel box of one terminal cell derived from the configured font.
fn cell_size(config: &Config) -> Size {
    let font = font_spec(config);
    Size::new((font.size_px / 2.0).max(1.0), font.line_height().max(1.0))
}

fn font_spec(config: &Config) -> FontSpec {
    let font = &config.file.font;
    FontSpec::new(
        font.family.clone(),
        font.size_px,
        config.effective.line_spacing,
    )
}

fn viewport_px(cell: Size, cols: u16, rows: u16) -> Size {
    Size::new(
        f32::from(cols) * cell.width,
        f32::from(rows) * cell.height,
    )
}

/// Build a controller over a grid of `cols` x `rows` cells.
fn build_controller(config: &mut Config, seq: SegmentStore, cols: u16, rows: u16) -> Result<Controller> {
    let cell = cell_size(config);
    let viewport = viewport_px(cell, cols, rows);
    config.apply_context(ConfigContext::new(viewport.width, viewport.height));
    let surface = GridSurface::from_config(config, viewport, cell);
    let metrics: Metrics = estimate(&surface, &config.file.font.sample, &font_spec(config))
        .context("estimating font metrics")?;
    Ok(ViewController::from_config(config, seq, surface, metrics))
}

/// Like `build_controller`, but re-renders whenever the document changes.
fn build_watched(
    config: &mut Config,
    mut seq: SegmentStore,
    cols: u16,
    rows: u16,
) -> Result<Controller> {
    let changes = seq.subscribe();
    let mut ctrl = build_controller(config, seq, cols, rows)?;
    ctrl.watch(changes);
    Ok(ctrl)
}

/// One line per block: index, offset range, escaped text.
fn dump_page<W: Write>(ctrl: &Controller, out: &mut W) -> Result<()> {
    let page = ctrl.page();
    writeln!(
        out,
        "# top={} first={} end={} blocks={} height={} pruned={}",
        page.requested_offset,
        page.first_offset,
        page.end_offset,
        page.blocks.len(),
        page.height,
        page.pruned
    )?;
    for (i, block) in page.blocks.iter().enumerate() {
        let (start, end) = block_range(block);
        writeln!(out, "{i:>4} {start}..{end} {:?}", block.text())?;
    }
    Ok(())
}

fn block_range(block: &LineBlock) -> (usize, usize) {
    let start = block.fragments.first().map_or(0, |f| f.abs_start);
    let end = block.fragments.last().map_or(start, |f| f.abs_end());
    (start, end)
}

fn run_dump(config: &mut Config, seq: SegmentStore, cols: u16, rows: u16) -> Result<()> {
    let mut queue = TaskQueue::new();
    let mut ctrl = build_controller(config, seq, cols, rows)?;
    if !ctrl.attach(&mut queue) {
        warn!(target: "runtime", "dump_render_failed");
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    dump_page(&ctrl, &mut out)
}

/// Terminal session state for the interactive loop.
struct Session {
    ctrl: Controller,
    queue: TaskQueue,
    config: Config,
    geometry: CellGeometry,
    cols: u16,
    rows: u16,
}

impl Session {
    fn paint(&self) -> Result<()> {
        let cell = self.ctrl.surface().cell();
        let overlay = self.ctrl.overlay(Some(cell.width));
        let frame = paint_frame(self.ctrl.surface(), self.cols, self.rows, &overlay);
        Writer::from_frame(&frame).flush()
    }

    fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
        let viewport = viewport_px(self.ctrl.surface().cell(), cols, rows);
        let eff = self
            .config
            .apply_context(ConfigContext::new(viewport.width, viewport.height));
        let margins = Margins::from_percent(
            viewport,
            eff.margin_left_pct,
            eff.margin_right_pct,
            eff.margin_top_pct,
        );
        let surface = self.ctrl.surface_mut();
        surface.resize(viewport);
        surface.set_margins(margins);
        info!(target: "runtime", cols, rows, "resize");
    }

    /// Run frame callbacks and due timers. Returns true if anything changed.
    fn run_due(&mut self) -> bool {
        let mut changed = false;
        for task in self.queue.take_frame() {
            changed |= self.ctrl.run_task(task, &mut self.queue);
        }
        while let Some(task) = self.queue.pop_due() {
            changed |= self.ctrl.run_task(task, &mut self.queue);
        }
        changed
    }

    fn run(&mut self, clock: Instant) -> Result<()> {
        self.paint()?;
        loop {
            self.queue.advance_to(clock.elapsed());
            self.ctrl.poll_changes(&mut self.queue);
            if self.run_due() {
                self.paint()?;
            }
            let timeout = self
                .queue
                .time_to_next()
                .map_or(IDLE_POLL, |d| d.min(IDLE_POLL));
            if !crossterm::event::poll(timeout)? {
                continue;
            }
            let raw = crossterm::event::read()?;
            if let crossterm::event::Event::Resize(cols, rows) = raw {
                self.resize(cols, rows);
            }
            match translate(raw, self.geometry) {
                Some(Event::Command(CommandEvent::Quit)) | Some(Event::Shutdown) => {
                    info!(target: "runtime", "quit");
                    return Ok(());
                }
                Some(Event::Input(input)) => {
                    self.ctrl.handle_input(input, &mut self.queue);
                    if !matches!(input, InputEvent::Wheel { .. }) {
                        self.paint()?;
                    }
                }
                Some(Event::Task(task)) => self.queue.request_frame(task),
                None => {}
            }
        }
    }
}

fn run_terminal(config: Config, seq: SegmentStore, title: &str) -> Result<()> {
    let mut config = config;
    let mut backend = CrosstermBackend::new();
    backend.set_title(title)?;
    let mut guard = backend.enter_guard()?;
    let (cols, rows) = guard.backend().size()?;
    let ctrl = build_watched(&mut config, seq, cols, rows)?;
    let cell = ctrl.surface().cell();
    let mut session = Session {
        ctrl,
        queue: TaskQueue::new(),
        config,
        geometry: CellGeometry::new(cell.width, cell.height),
        cols,
        rows,
    };
    session.ctrl.attach(&mut session.queue);
    info!(
        target: "runtime.startup",
        cols,
        rows,
        len = session.ctrl.sequence().len(),
        "bootstrap_complete"
    );
    session.run(Instant::now())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let mut config = load_from(args.config.clone())?;
    let seq = load_document(args.path.as_deref());
    if args.dump {
        return run_dump(&mut config, seq, args.cols, args.rows);
    }
    let title = args
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map_or_else(|| "folio".to_string(), |n| format!("folio: {}", n.to_string_lossy()));
    run_terminal(config, seq, &title)
}
