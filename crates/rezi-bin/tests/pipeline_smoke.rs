//! End-to-end smoke test of the stages the demo binary wires together:
//! commit, layout, render, and drawlist build/parse, across two frames so
//! the partial-commit path and its sticky-cache invalidation both run.

use rezi_commit::{InstanceRegistry, commit};
use rezi_config::EngineConfig;
use rezi_drawlist::{DrawlistBuilder, parse};
use rezi_layout::layout;
use rezi_render::{FocusState, RenderCache, RenderInputs, RenderPathMetrics, RenderPlan, render};
use rezi_view::{ConstrainedValue, Props, VNode, column, row, text};

fn menu(selected: usize, counter: i64) -> VNode {
    let items: Vec<VNode> = ["Increment", "Decrement", "Reset"]
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let marker = if i == selected { "> " } else { "  " };
            text(format!("{marker}{label}"), Props::new())
        })
        .collect();
    let menu = column(Props::new(), items);
    let counter_line = text(format!("counter: {counter}"), Props::new());
    row(Props::new().with_constrained("gap", ConstrainedValue::Int(1)), vec![menu, counter_line])
}

struct Harness {
    registry: InstanceRegistry,
    root_id: Option<u32>,
    layout: Option<rezi_layout::LayoutTree>,
    cache: RenderCache,
    metrics: RenderPathMetrics,
    config: EngineConfig,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: InstanceRegistry::new(),
            root_id: None,
            layout: None,
            cache: RenderCache::new(),
            metrics: RenderPathMetrics::default(),
            config: EngineConfig::default(),
        }
    }

    fn frame(&mut self, vnode: VNode, viewport_w: i32, viewport_h: i32) -> Vec<u8> {
        let root = commit(self.root_id, vnode, &mut self.registry).expect("commit succeeds");
        self.root_id = Some(root);

        let new_layout = layout(&self.registry, root, viewport_w, viewport_h).expect("layout succeeds");

        let mut builder = DrawlistBuilder::new(self.config.builder_config());
        let inputs = RenderInputs {
            registry: &self.registry,
            layout: &new_layout,
            prev_layout: self.layout.as_ref(),
            viewport_w,
            viewport_h,
            focus: FocusState::default(),
            plan: RenderPlan { commit: true, layout: true, check_layout_stability: self.layout.is_some() },
        };
        render(&inputs, &mut builder, &mut self.cache, &self.metrics).expect("render succeeds");
        self.layout = Some(new_layout);

        builder.build().expect("build succeeds").to_vec()
    }
}

#[test]
fn first_frame_is_a_full_repaint_with_a_parseable_drawlist() {
    let mut harness = Harness::new();
    let bytes = harness.frame(menu(0, 0), 40, 10);

    let parsed = parse(&bytes).expect("well-formed drawlist");
    assert!(!parsed.cmds.is_empty(), "a populated tree draws at least one command");
    assert_eq!(harness.metrics.full_frames.load(std::sync::atomic::Ordering::Relaxed), 1);
}

#[test]
fn unchanged_frame_after_a_selection_move_takes_the_partial_path() {
    let mut harness = Harness::new();
    harness.frame(menu(0, 0), 40, 10);
    let bytes = harness.frame(menu(1, 0), 40, 10);

    parse(&bytes).expect("well-formed drawlist");
    assert_eq!(harness.metrics.partial_frames.load(std::sync::atomic::Ordering::Relaxed), 1);
}

#[test]
fn resizing_the_viewport_forces_a_full_repaint() {
    let mut harness = Harness::new();
    harness.frame(menu(0, 0), 40, 10);
    harness.frame(menu(0, 1), 80, 24);

    assert_eq!(harness.metrics.full_frames.load(std::sync::atomic::Ordering::Relaxed), 2, "a wider/taller viewport moves every rect");
}

#[test]
fn engine_config_defaults_cap_the_builder_the_same_way_everywhere() {
    let cfg = EngineConfig::default();
    let builder = DrawlistBuilder::new(cfg.builder_config());
    assert_eq!(builder.config().max_drawlist_bytes, 1 << 20);
}
