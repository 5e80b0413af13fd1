//! The `Backend` trait (§6) and its `crossterm`-based implementation.

use crossterm::{
    cursor::Hide,
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode, size},
};
use rezi_events::{EventBatch, TimestampTracker};

use crate::caps::TerminalCaps;
use crate::error::TerminalError;
use crate::grid::Grid;
use crate::input::CrosstermInputEventSource;
use crate::writer::BatchWriter;

/// Backend abstraction (§6): prepares/tears down the sink, applies drawlist
/// buffers, and surfaces parsed input events plus sink capabilities.
pub trait Backend {
    fn start(&mut self) -> Result<(), TerminalError>;
    fn stop(&mut self) -> Result<(), TerminalError>;
    fn dispose(&mut self);
    fn request_frame(&mut self, bytes: &[u8]) -> Result<(), TerminalError>;
    fn poll_events(&mut self) -> Result<EventBatch, TerminalError>;
    fn get_caps(&self) -> TerminalCaps;
    fn post_user_event(&mut self, tag: u32, payload: Vec<u8>) -> Result<(), TerminalError>;
}

/// RAII guard ensuring terminal state restoration even if the caller
/// early-returns or panics mid-session.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.stop();
        }
    }
}

enum PollSource {
    NotStarted,
    Running {
        rx: crossbeam_channel::Receiver<Vec<u8>>,
        tx: crossbeam_channel::Sender<Vec<u8>>,
        /// Tripped (by being dropped) to tell the event-loop thread to wind
        /// down its spawned sources and return.
        shutdown: crossbeam_channel::Sender<()>,
        /// Flips to request the blocking input-reader task return at its
        /// next poll interval instead of staying parked in `event::read`.
        input_stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
        /// The dedicated OS thread driving the `current_thread` runtime.
        /// A `current_thread` runtime only progresses spawned tasks (the
        /// tick timer, the blocking input reader's completion) while
        /// something is parked inside it — owning it on its own thread for
        /// the whole session, rather than re-entering `block_on` once per
        /// poll, is what keeps the tick source firing between polls.
        thread: std::thread::JoinHandle<()>,
    },
    Stopped,
}

pub struct CrosstermBackend {
    entered: bool,
    grid: Grid,
    caps: TerminalCaps,
    timestamp_tracker: TimestampTracker,
    poll: PollSource,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        let (cols, rows) = size().map(|(c, r)| (c as i32, r as i32)).unwrap_or((80, 24));
        Self { entered: false, grid: Grid::new(cols, rows), caps: TerminalCaps::detect(), timestamp_tracker: TimestampTracker::new(), poll: PollSource::NotStarted }
    }

    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>, TerminalError> {
        self.start()?;
        Ok(TerminalGuard { backend: self, active: true })
    }
}

impl Backend for CrosstermBackend {
    fn start(&mut self) -> Result<(), TerminalError> {
        if self.entered {
            return Ok(());
        }
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen, Hide, EnableMouseCapture, EnableBracketedPaste)?;
        self.entered = true;

        let (tx, rx) = rezi_events::channel();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
        let input_stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let input_stop_for_thread = input_stop.clone();
        let tx_for_thread = tx.clone();
        let thread = std::thread::Builder::new()
            .name("rezi-events".into())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_time().build() {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!(target: "rezi_terminal", error = %e, "failed to start event-loop runtime");
                        return;
                    }
                };
                let mut registry = rezi_events::EventSourceRegistry::new();
                registry.register(rezi_events::TickEventSource::new(std::time::Duration::from_millis(250)));
                registry.register(CrosstermInputEventSource::new(input_stop_for_thread));
                runtime.block_on(async move {
                    let handles = registry.spawn_all(&tx_for_thread);
                    // Blocks this runtime's only worker thread, which is exactly
                    // what keeps the timer/IO drivers running between polls;
                    // `shutdown_rx` closing (the sender dropped in `stop`) is
                    // the wakeup, via a blocking recv on tokio's blocking pool.
                    let _ = tokio::task::spawn_blocking(move || shutdown_rx.recv()).await;
                    drop(tx_for_thread);
                    for h in handles {
                        let _ = h.await;
                    }
                });
            })
            .map_err(|e| TerminalError::backend(e.to_string()))?;
        self.poll = PollSource::Running { rx, tx, shutdown: shutdown_tx, input_stop, thread };
        Ok(())
    }

    fn stop(&mut self) -> Result<(), TerminalError> {
        if let PollSource::Running { tx, shutdown, input_stop, thread, .. } = std::mem::replace(&mut self.poll, PollSource::Stopped) {
            input_stop.store(true, std::sync::atomic::Ordering::Relaxed);
            drop(tx);
            drop(shutdown);
            let _ = thread.join();
        }
        if self.entered {
            execute!(std::io::stdout(), LeaveAlternateScreen, Clear(ClearType::All), DisableMouseCapture, DisableBracketedPaste)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn dispose(&mut self) {
        let _ = self.stop();
    }

    fn request_frame(&mut self, bytes: &[u8]) -> Result<(), TerminalError> {
        let parsed = rezi_drawlist::parse(bytes)?;
        let mut next = self.grid.clone();
        next.apply(&parsed)?;

        let mut writer = BatchWriter::new(std::io::stdout());
        for (x, y, cell) in next.diff(&self.grid) {
            writer.put_cell(x, y, cell)?;
        }
        writer.set_real_cursor(next.cursor.x, next.cursor.y, next.cursor.visible)?;
        writer.finish()?;

        self.grid = next;
        Ok(())
    }

    fn poll_events(&mut self) -> Result<EventBatch, TerminalError> {
        match &self.poll {
            PollSource::Running { rx, .. } => Ok(rezi_events::drain_batches(rx, &mut self.timestamp_tracker)),
            PollSource::NotStarted | PollSource::Stopped => Err(TerminalError::backend("pollEvents called before start() or after stop()")),
        }
    }

    fn get_caps(&self) -> TerminalCaps {
        self.caps
    }

    fn post_user_event(&mut self, tag: u32, payload: Vec<u8>) -> Result<(), TerminalError> {
        match &self.poll {
            PollSource::Running { tx, .. } => {
                let bytes = rezi_events::encode(&[rezi_events::Event::User { tag, payload }], 0, false);
                tx.try_send(bytes).map_err(|_| TerminalError::backend("user event channel full or closed"))
            }
            PollSource::NotStarted | PollSource::Stopped => Err(TerminalError::backend("postUserEvent called before start() or after stop()")),
        }
    }
}

impl CrosstermBackend {
    pub fn set_title(&mut self, title: &str) -> Result<(), TerminalError> {
        execute!(std::io::stdout(), SetTitle(title))?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        self.dispose();
    }
}
