//! Viewport pagination and windowing engine.
//!
//! Given a start offset into a segmented text sequence and a pixel-bounded
//! viewport, the engine decides which run of text fits, groups it into line
//! blocks, trims it to the available height by trial layout and pruning, and
//! maps between screen points and sequence offsets.
//!
//! Exposed Components:
//! - `probe`: host interfaces (measurement, hit-test, display surface) and
//!   geometry types.
//! - `metrics`: coarse glyph metrics estimate seeding character budgets.
//! - `mapper`: point ↔ offset conversion through the hit-test probe.
//! - `block`: fragments, line blocks, pages and fragment markup.
//! - `paginate`: the pagination engine (walk, trial layout, pruning).
//! - `grid`: `GridSurface`, a deterministic cell-grid surface implementing
//!   all three probes; painted by the terminal host and used in tests.
//! - `viewport`: `ViewportState` and the top-offset clamp.
//! - `gate`: re-entrancy gate for render passes.
//! - `indicator`: scroll lozenge geometry.
//! - `paint` / `writer`: `GridSurface` → `Frame` → terminal commands.
//! - `frame`: the terminal cell grid painted from a `GridSurface`.
//! - `timing`: last pagination duration.

pub mod block;
pub mod error;
pub mod frame;
pub mod gate;
pub mod grid;
pub mod indicator;
pub mod mapper;
pub mod metrics;
pub mod paginate;
pub mod paint;
pub mod probe;
pub mod timing;
pub mod viewport;
pub mod writer;

pub use block::{Fragment, FragmentStyle, LineBlock, Markup, NodeSpan, Page};
pub use error::{PaginateError, ProbeError};
pub use frame::{Cell, CellFlags, Frame};
pub use grid::GridSurface;
pub use metrics::{Metrics, estimate};
pub use paginate::{PaginateSettings, Paginator};
pub use probe::{
    DisplaySurface, FontSpec, FragmentRef, HitTestProbe, MeasureProbe, Point, Rect, Size,
};
pub use viewport::ViewportState;
