//! Demo entrypoint: a small counter/menu view driven end to end through the
//! commit, layout, render and drawlist stages onto a real terminal.
use std::path::PathBuf;
use std::sync::Once;

use anyhow::Result;
use clap::Parser;
use rezi_commit::{InstanceRegistry, commit};
use rezi_drawlist::DrawlistBuilder;
use rezi_events::{Event, KeyCode};
use rezi_layout::layout;
use rezi_render::{FocusState, RenderCache, RenderInputs, RenderPathMetrics, RenderPlan, render};
use rezi_terminal::{Backend, CrosstermBackend};
use rezi_view::{ConstrainedValue, Props, VNode, column, row, text};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "rezi-demo", version, about = "Retained-mode terminal UI engine demo")]
struct Args {
    /// Optional configuration file path (overrides discovery of `rezi.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) {
        let log_dir = std::path::Path::new(".");
        let log_path = log_dir.join("rezi-demo.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }

        let file_appender = tracing_appender::rolling::never(log_dir, "rezi-demo.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_) => {
                // Global subscriber already installed (e.g. under a test harness); drop the
                // guard immediately so its background writer thread shuts down.
            }
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
}

/// Demo application state: just enough for the sample view to exercise
/// flex/box/text and keyboard-driven focus movement.
struct DemoState {
    counter: i64,
    menu: Vec<&'static str>,
    selected: usize,
    ticks: u64,
    quit: bool,
}

impl DemoState {
    fn new() -> Self {
        Self { counter: 0, menu: vec!["Increment", "Decrement", "Reset"], selected: 0, ticks: 0, quit: false }
    }

    fn apply(&mut self, event: &Event) {
        match event {
            Event::Key { code: KeyCode::Char('q'), .. } | Event::Key { code: KeyCode::Esc, .. } => self.quit = true,
            Event::Key { code: KeyCode::Up, .. } => {
                self.selected = self.selected.checked_sub(1).unwrap_or(self.menu.len() - 1);
            }
            Event::Key { code: KeyCode::Down, .. } => {
                self.selected = (self.selected + 1) % self.menu.len();
            }
            Event::Key { code: KeyCode::Enter, .. } => match self.menu[self.selected] {
                "Increment" => self.counter += 1,
                "Decrement" => self.counter -= 1,
                "Reset" => self.counter = 0,
                _ => {}
            },
            Event::Tick { .. } => self.ticks += 1,
            _ => {}
        }
    }
}

/// Builds the frame's view tree from the current demo state.
fn view(state: &DemoState) -> VNode {
    let header = text(format!("rezi demo — ticks: {}", state.ticks), Props::new().with("id", "header"));
    let counter_line = text(format!("counter: {}", state.counter), Props::new().with("id", "counter"));

    let menu_items: Vec<VNode> = state
        .menu
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let marker = if i == state.selected { "> " } else { "  " };
            text(format!("{marker}{label}"), Props::new().with("id", format!("menu-{i}")))
        })
        .collect();
    let menu = column(Props::new().with("id", "menu"), menu_items);

    let body = row(Props::new().with("id", "body").with_constrained("gap", ConstrainedValue::Int(1)), vec![menu, counter_line]);

    column(Props::new().with("id", "root"), vec![header, body])
}

/// Per-frame pipeline state that must survive across iterations of the
/// event loop so a frame that produces no change can skip straight to
/// render-only mode.
struct FrameState {
    registry: InstanceRegistry,
    root_id: Option<u32>,
    layout: Option<rezi_layout::LayoutTree>,
    cache: RenderCache,
    metrics: RenderPathMetrics,
}

impl FrameState {
    fn new() -> Self {
        Self { registry: InstanceRegistry::new(), root_id: None, layout: None, cache: RenderCache::new(), metrics: RenderPathMetrics::default() }
    }
}

/// Runs one frame: commit the view, lay it out, render it into `builder`,
/// and hand the finished drawlist to `backend`. A failure at any stage
/// leaves `frame`'s previously committed tree untouched so the next frame
/// can retry from where it left off, per the engine's propagation policy —
/// no stage panics into the caller, and a frame-level error never corrupts
/// what is already on screen.
fn run_frame(frame: &mut FrameState, state: &DemoState, viewport_w: i32, viewport_h: i32, backend: &mut CrosstermBackend, config: &rezi_config::EngineConfig) -> Result<()> {
    let next_vnode = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| view(state))) {
        Ok(vnode) => vnode,
        Err(payload) => {
            let detail = payload.downcast_ref::<&str>().copied().unwrap_or("view() panicked");
            tracing::error!(target: "demo.view", detail, "ZRUI_USER_CODE_THROW: keeping previous frame");
            return Ok(());
        }
    };
    let new_root = match commit(frame.root_id, next_vnode, &mut frame.registry) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(target: "demo.commit", error = %e, "commit failed, keeping previous frame");
            return Ok(());
        }
    };
    frame.root_id = Some(new_root);

    let new_layout = match layout(&frame.registry, new_root, viewport_w, viewport_h) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::error!(target: "demo.layout", error = %e, "layout failed, keeping previous frame");
            return Ok(());
        }
    };

    let mut builder = DrawlistBuilder::new(config.builder_config());
    let inputs = RenderInputs {
        registry: &frame.registry,
        layout: &new_layout,
        prev_layout: frame.layout.as_ref(),
        viewport_w,
        viewport_h,
        focus: FocusState::default(),
        plan: RenderPlan { commit: true, layout: true, check_layout_stability: frame.layout.is_some() },
    };
    if let Err(e) = render(&inputs, &mut builder, &mut frame.cache, &frame.metrics) {
        tracing::error!(target: "demo.render", error = %e, "render failed, keeping previous frame");
        return Ok(());
    }
    frame.layout = Some(new_layout);

    let bytes = match builder.build() {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(target: "demo.drawlist", code = e.code(), error = %e, "drawlist build failed, keeping previous frame");
            return Ok(());
        }
    };
    backend.request_frame(bytes)?;
    Ok(())
}

fn main() -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging();
    AppStartup::install_panic_hook();

    let args = Args::parse();
    let config = rezi_config::load_from(args.config)?;
    let (default_cols, default_rows) = config.default_viewport();

    let mut backend = CrosstermBackend::new();
    let caps = backend.get_caps();
    tracing::info!(target: "demo.startup", ?caps, "terminal_capabilities_detected");
    backend.start()?;

    let mut state = DemoState::new();
    let mut frame = FrameState::new();
    let (mut viewport_w, mut viewport_h) = (default_cols as i32, default_rows as i32);

    loop {
        let batch = backend.poll_events()?;
        if batch.dropped_batches > 0 {
            tracing::warn!(target: "demo.events", dropped = batch.dropped_batches, "event batches dropped under backpressure");
        }
        for event in &batch.events {
            if let Event::Resize { cols, rows } = event {
                viewport_w = *cols as i32;
                viewport_h = *rows as i32;
            }
            state.apply(event);
        }
        if state.quit {
            break;
        }

        run_frame(&mut frame, &state, viewport_w, viewport_h, &mut backend, &config)?;

        std::thread::sleep(std::time::Duration::from_millis(16));
    }

    backend.stop()?;
    drop(startup.log_guard.take());
    Ok(())
}
