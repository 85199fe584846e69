//! Terminal surface the renderer draws against.
//!
//! The renderer only knows the `Surface` contract, so tests draw into an
//! in-memory grid and assert on its lines. The real implementation queues
//! crossterm commands against stdout and flushes once per frame.

use std::io::{self, Write};
use std::panic;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::QueueableCommand;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::execute;
use crossterm::style::Print;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};

/// Character grid with curses-style addressing: `(row, col)`, origin top
/// left. Writes past the edges are clamped, never errors.
pub trait Surface {
    /// Current `(rows, cols)` extent.
    fn size(&self) -> (u16, u16);
    fn clear(&mut self);
    fn write_at(&mut self, row: u16, col: u16, text: &str);
    /// Makes everything written since the last refresh visible.
    fn refresh(&mut self);
}

/// `Surface` over the real terminal.
pub struct TermSurface {
    out: io::Stdout,
}

impl Surface for TermSurface {
    fn size(&self) -> (u16, u16) {
        let (cols, rows) = terminal::size().unwrap_or((80, 24));
        (rows, cols)
    }

    fn clear(&mut self) {
        let _ = self.out.queue(Clear(ClearType::All));
    }

    fn write_at(&mut self, row: u16, col: u16, text: &str) {
        let (rows, cols) = self.size();
        if row >= rows || col >= cols {
            return;
        }
        let budget = (cols - col) as usize;
        let clipped: String = text.chars().take(budget).collect();
        let _ = self
            .out
            .queue(MoveTo(col, row))
            .and_then(|o| o.queue(Print(clipped)));
    }

    fn refresh(&mut self) {
        let _ = self.out.flush();
    }
}

static RAW_ACTIVE: AtomicBool = AtomicBool::new(false);
static PANIC_HOOK: Once = Once::new();

fn restore_terminal() {
    if RAW_ACTIVE.swap(false, Ordering::SeqCst) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

/// Puts the terminal into raw alternate-screen mode and guarantees it is
/// restored on drop and on panic. The panic hook matters in release builds
/// where aborting skips destructors; without it a crash leaves the shell
/// in raw mode.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> io::Result<(Self, TermSurface)> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        RAW_ACTIVE.store(true, Ordering::SeqCst);
        PANIC_HOOK.call_once(|| {
            let prev = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                restore_terminal();
                prev(info);
            }));
        });
        Ok((Self, TermSurface { out: io::stdout() }))
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Fixed-size in-memory `Surface` used by the renderer and monitor tests.
pub struct GridSurface {
    rows: u16,
    cols: u16,
    cells: Vec<Vec<char>>,
    refreshes: usize,
}

impl GridSurface {
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            cells: vec![vec![' '; cols as usize]; rows as usize],
            refreshes: 0,
        }
    }

    /// One grid row as a string, trailing blanks stripped.
    pub fn line(&self, row: u16) -> String {
        self.cells
            .get(row as usize)
            .map(|r| r.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl Surface for GridSurface {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn clear(&mut self) {
        for row in &mut self.cells {
            row.fill(' ');
        }
    }

    fn write_at(&mut self, row: u16, col: u16, text: &str) {
        if row >= self.rows || col >= self.cols {
            return;
        }
        let line = &mut self.cells[row as usize];
        for (i, ch) in text.chars().enumerate() {
            let x = col as usize + i;
            if x >= line.len() {
                break;
            }
            line[x] = ch;
        }
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_clamps_out_of_bounds_writes() {
        let mut g = GridSurface::new(2, 10);
        g.write_at(5, 0, "below");
        g.write_at(0, 20, "right");
        g.write_at(1, 7, "overflow");
        assert_eq!(g.line(0), "");
        assert_eq!(g.line(1), "       ove");
    }

    #[test]
    fn grid_clear_blanks_everything() {
        let mut g = GridSurface::new(2, 8);
        g.write_at(0, 0, "visible");
        g.clear();
        assert_eq!(g.line(0), "");
    }

    #[test]
    fn grid_counts_refreshes() {
        let mut g = GridSurface::new(1, 1);
        g.refresh();
        g.refresh();
        assert_eq!(g.refreshes(), 2);
    }
}
