//! Translate crossterm events into folio events.
//!
//! The view engine works in surface pixels. A terminal cell is treated as a
//! fixed `cell_width` x `cell_height` pixel box, so clicks map to the centre
//! of the clicked cell and resizes report the pixel size of the new grid.
//! Wheel notches are reported as one standard detent (120), positive toward
//! the start of the document.

use core_events::{CommandEvent, Event, InputEvent, NavKey};
use crossterm::event::{
    Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

const WHEEL_DETENT: i32 = 120;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGeometry {
    pub cell_width: f32,
    pub cell_height: f32,
}

impl CellGeometry {
    pub fn new(cell_width: f32, cell_height: f32) -> Self {
        Self {
            cell_width,
            cell_height,
        }
    }

    /// Pixel size of a `cols` x `rows` grid.
    pub fn grid_px(&self, cols: u16, rows: u16) -> (f32, f32) {
        (
            f32::from(cols) * self.cell_width,
            f32::from(rows) * self.cell_height,
        )
    }

    pub fn cell_centre(&self, col: u16, row: u16) -> (f32, f32) {
        (
            (f32::from(col) + 0.5) * self.cell_width,
            (f32::from(row) + 0.5) * self.cell_height,
        )
    }
}

/// Map one terminal event. Events the viewer has no use for yield `None`.
pub fn translate(ev: CEvent, geometry: CellGeometry) -> Option<Event> {
    match ev {
        CEvent::Key(key) => translate_key(key),
        CEvent::Mouse(mouse) => translate_mouse(mouse, geometry),
        CEvent::Resize(cols, rows) => {
            let (width, height) = geometry.grid_px(cols, rows);
            Some(Event::Input(InputEvent::Resize { width, height }))
        }
        other => {
            tracing::trace!(target: "runtime.input", event = ?other, "ignored");
            None
        }
    }
}

fn translate_key(key: KeyEvent) -> Option<Event> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let nav = |k| Some(Event::Input(InputEvent::Key(k)));
    match key.code {
        KeyCode::PageUp => nav(NavKey::PageUp),
        KeyCode::PageDown | KeyCode::Char(' ') => nav(NavKey::PageDown),
        KeyCode::Home => nav(NavKey::Home),
        KeyCode::End => nav(NavKey::End),
        KeyCode::Esc | KeyCode::Char('q') => Some(Event::Command(CommandEvent::Quit)),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Event::Command(CommandEvent::Quit))
        }
        _ => None,
    }
}

fn translate_mouse(mouse: MouseEvent, geometry: CellGeometry) -> Option<Event> {
    let input = match mouse.kind {
        MouseEventKind::ScrollUp => InputEvent::Wheel {
            delta: WHEEL_DETENT,
        },
        MouseEventKind::ScrollDown => InputEvent::Wheel {
            delta: -WHEEL_DETENT,
        },
        MouseEventKind::Down(MouseButton::Left) => {
            let (x, y) = geometry.cell_centre(mouse.column, mouse.row);
            InputEvent::Click { x, y }
        }
        _ => return None,
    };
    Some(Event::Input(input))
}
