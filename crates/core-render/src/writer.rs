//! Terminal writer: translates a painted `Frame` into queued terminal commands.
//!
//! Design invariants:
//! * Commands preserve ordering; nothing is flushed mid-frame.
//! * All positions are absolute with a (0,0) origin.
//! * Every row is cleared before it is repainted, so shorter content never
//!   leaves stale cells behind.
//! * Styling is emitted only when it changes along a row and is reset at the
//!   end of each styled row.
//! * The writer owns no global state; it is a short-lived object per frame.

use crate::{CellFlags, Frame};
use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType},
};
use std::io::{Write, stdout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveTo(u16, u16),
    ClearLine(u16, u16),
    Style(CellFlags),
    Print(String),
}

#[derive(Debug, Default)]
pub struct Writer {
    cmds: Vec<Command>,
}

impl Writer {
    pub fn new() -> Self {
        Self { cmds: Vec::new() }
    }

    /// Full repaint of `frame`, row by row.
    pub fn from_frame(frame: &Frame) -> Self {
        let mut w = Self::new();
        for y in 0..frame.height {
            w.move_to(0, y);
            w.clear_line(0, y);
            let mut current = CellFlags::empty();
            let mut run = String::new();
            for (cluster, _width, flags, _x) in frame.row_leaders(y) {
                if flags != current {
                    w.print(std::mem::take(&mut run));
                    w.style(flags);
                    current = flags;
                }
                run.push_str(cluster);
            }
            w.print(run);
            if !current.is_empty() {
                w.style(CellFlags::empty());
            }
        }
        w
    }

    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cmds.push(Command::MoveTo(x, y));
    }

    pub fn clear_line(&mut self, x: u16, y: u16) {
        self.cmds.push(Command::ClearLine(x, y));
    }

    pub fn style(&mut self, flags: CellFlags) {
        self.cmds.push(Command::Style(flags));
    }

    pub fn print<S: Into<String>>(&mut self, s: S) {
        let s: String = s.into();
        if !s.is_empty() {
            self.cmds.push(Command::Print(s));
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.cmds
    }

    pub fn flush(self) -> Result<()> {
        let mut out = stdout();
        self.flush_to(&mut out)
    }

    pub fn flush_to<W: Write>(self, out: &mut W) -> Result<()> {
        for c in self.cmds {
            match c {
                Command::MoveTo(x, y) => {
                    queue!(out, MoveTo(x, y))?;
                }
                Command::ClearLine(_, _) => {
                    // Preceded by MoveTo(0, y); clears the whole current line.
                    queue!(out, Clear(ClearType::CurrentLine))?;
                }
                Command::Style(flags) => {
                    queue!(out, SetAttribute(Attribute::Reset))?;
                    if flags.intersects(CellFlags::REVERSE | CellFlags::INDICATOR) {
                        queue!(out, SetAttribute(Attribute::Reverse))?;
                    }
                    if flags.contains(CellFlags::BOLD) {
                        queue!(out, SetAttribute(Attribute::Bold))?;
                    }
                    if flags.contains(CellFlags::ITALIC) {
                        queue!(out, SetAttribute(Attribute::Italic))?;
                    }
                }
                Command::Print(s) => {
                    queue!(out, Print(s))?;
                }
            }
        }
        out.flush()?;
        Ok(())
    }
}
