//! Main monitor application and its two loops of control.
//!
//! A background thread runs the periodic fetch cycle; the foreground
//! thread blocks on keyboard input. Both take one coarse lock for the
//! full fetch, derive, sort and draw pass, so database I/O and drawing
//! are never interleaved with another render. The input loop may block
//! behind an in-flight refresh for the length of one database round
//! trip, which is acceptable at human key-press rates.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::collector::DataSource;
use crate::engine::{MetricEngine, Row};
use crate::view::{ViewState, sort_rows};

use super::input::{KeyAction, decode_key, read_key};
use super::render;
use super::surface::{Surface, TerminalGuard};

/// Delay between the first frame and the baseline fetch.
const SETTLE: Duration = Duration::from_millis(300);
/// Foreground poll timeout, also the terminate-flag latency for the
/// input loop.
const KEY_POLL: Duration = Duration::from_millis(250);
/// Granularity at which the refresh loop re-checks the terminate flag
/// while sleeping.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// All monitor state guarded by the cycle lock.
pub struct Monitor<S: Surface> {
    catalog: Catalog,
    data: DataSource,
    engine: MetricEngine,
    state: ViewState,
    /// Last derived row set, kept across paused ticks and failed fetches.
    view: Option<Vec<Row>>,
    surface: S,
}

impl<S: Surface> Monitor<S> {
    pub fn new(
        catalog: Catalog,
        data: DataSource,
        surface: S,
        sorted_col: usize,
        absolute: bool,
    ) -> Self {
        Self {
            catalog,
            data,
            engine: MetricEngine::new(absolute),
            state: ViewState::new(sorted_col, absolute),
            view: None,
            surface,
        }
    }

    pub fn draw(&mut self) {
        render::draw(
            &mut self.surface,
            &self.catalog,
            &self.state,
            self.view.as_deref(),
        );
    }

    fn resort(&mut self) {
        if let Some(rows) = &mut self.view {
            sort_rows(rows, &self.catalog, self.state.sorted_col);
        }
    }

    /// One full fetch, derive, sort and draw pass. A failed fetch keeps
    /// the prior rows and surfaces the error in the title line.
    pub fn cycle(&mut self) {
        match self.data.fetch(&self.catalog) {
            Ok(snapshot) => {
                self.state.last_error = None;
                self.state.last_update = Some(Local::now());
                if let Some(mut rows) = self.engine.update(&self.catalog, snapshot, Instant::now())
                {
                    sort_rows(&mut rows, &self.catalog, self.state.sorted_col);
                    self.view = Some(rows);
                }
            }
            Err(e) => {
                warn!("fetch cycle failed: {e}");
                self.state.last_error = Some(e.to_string());
            }
        }
        self.draw();
    }

    /// Scheduled tick: a full cycle unless paused.
    pub fn on_tick(&mut self) {
        if !self.state.paused {
            self.cycle();
        }
    }

    /// Applies one key action, redrawing for every recognized key.
    /// Returns true when the monitor should terminate.
    pub fn handle_key(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::Quit => return true,
            KeyAction::SortLeft => {
                self.state.shift_sorted(-1, self.catalog.len());
                self.resort();
            }
            KeyAction::SortRight => {
                self.state.shift_sorted(1, self.catalog.len());
                self.resort();
            }
            KeyAction::TogglePause => self.state.paused = !self.state.paused,
            KeyAction::Resume => self.state.paused = false,
            KeyAction::None => return false,
        }
        self.draw();
        false
    }
}

fn sleep_unless(terminate: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while !terminate.load(Ordering::Relaxed) && remaining > Duration::ZERO {
        let nap = remaining.min(SLEEP_SLICE);
        thread::sleep(nap);
        remaining = remaining.saturating_sub(nap);
    }
}

fn refresh_loop<S: Surface>(shared: &Mutex<Monitor<S>>, terminate: &AtomicBool, interval: Duration) {
    match shared.lock() {
        Ok(mut app) => app.draw(),
        Err(_) => return,
    }
    sleep_unless(terminate, SETTLE);
    while !terminate.load(Ordering::Relaxed) {
        {
            let Ok(mut app) = shared.lock() else { break };
            app.on_tick();
        }
        sleep_unless(terminate, interval);
    }
    debug!("refresh loop stopped");
}

fn event_loop<S: Surface + Send + 'static>(
    monitor: Monitor<S>,
    interval: Duration,
) -> io::Result<()> {
    let shared = Arc::new(Mutex::new(monitor));
    let terminate = Arc::new(AtomicBool::new(false));

    {
        let terminate = Arc::clone(&terminate);
        if let Err(e) = ctrlc::set_handler(move || terminate.store(true, Ordering::Relaxed)) {
            warn!("failed to install interrupt handler: {e}");
        }
    }

    let refresher = {
        let shared = Arc::clone(&shared);
        let terminate = Arc::clone(&terminate);
        thread::spawn(move || refresh_loop(&shared, &terminate, interval))
    };

    let result = loop {
        if terminate.load(Ordering::Relaxed) {
            break Ok(());
        }
        match read_key(KEY_POLL) {
            Ok(Some(key)) => {
                let Ok(mut app) = shared.lock() else {
                    break Ok(());
                };
                if app.handle_key(decode_key(key)) {
                    break Ok(());
                }
            }
            Ok(None) => {}
            Err(e) => break Err(e),
        }
    };
    terminate.store(true, Ordering::Relaxed);
    if refresher.join().is_err() {
        warn!("refresh thread panicked");
    }
    result
}

/// Runs the monitor until `q` or an interrupt. The terminal is restored
/// to cooked mode on every exit path, including panics.
pub fn run(
    catalog: Catalog,
    data: DataSource,
    sorted_col: usize,
    absolute: bool,
    interval: Duration,
) -> io::Result<()> {
    let (guard, surface) = TerminalGuard::enter()?;
    let monitor = Monitor::new(catalog, data, surface, sorted_col, absolute);
    let result = event_loop(monitor, interval);
    drop(guard);
    result
}
