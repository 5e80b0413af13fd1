use ahash::AHashMap;
use std::rc::Rc;

use crate::expr::{BinaryOp, Expr, Func, Metric, Scope};
use crate::graph::ConstraintGraph;
use crate::node::ConstraintProp;

/// Supplies the per-frame context a constraint expression can read: viewport
/// size, each instance's parent rect, and fallbacks (baseline layout values,
/// intrinsic measurement) for metrics that are not themselves constrained.
/// Implemented by the layout engine; this crate has no tree of its own.
pub trait ResolveContext {
    fn viewport(&self) -> (f64, f64);
    /// The top-level parent rect for this resolve pass — used only as part of
    /// the resolver cache key, mirroring the spec's `(fingerprint, viewport.w,
    /// viewport.h, parent.w, parent.h)` key.
    fn root_parent(&self) -> (f64, f64);
    fn parent_metrics(&self, instance_id: u32) -> (f64, f64);
    fn baseline(&self, instance_id: u32, prop: ConstraintProp) -> Option<f64>;
    fn intrinsic(&self, instance_id: u32, metric: Metric) -> Option<f64>;
}

pub type ResolvedValues = AHashMap<(u32, ConstraintProp), f64>;

fn sanitize(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 { 0.0 } else { sanitize(a / b) }
}

fn metric_to_prop(metric: Metric) -> ConstraintProp {
    match metric {
        Metric::W => ConstraintProp::Width,
        Metric::H => ConstraintProp::Height,
        Metric::MinW => ConstraintProp::MinWidth,
        Metric::MinH => ConstraintProp::MinHeight,
    }
}

struct Eval<'a> {
    graph: &'a ConstraintGraph,
    ctx: &'a dyn ResolveContext,
    resolved: &'a ResolvedValues,
    agg_cache: &'a mut AHashMap<(Func, String), f64>,
}

impl<'a> Eval<'a> {
    fn lookup(&self, instance_id: u32, metric: Metric) -> f64 {
        if self.is_hidden(instance_id) {
            return 0.0;
        }
        let prop = metric_to_prop(metric);
        if let Some(&v) = self.resolved.get(&(instance_id, prop)) {
            return v;
        }
        if let Some(v) = self.ctx.baseline(instance_id, prop) {
            return v;
        }
        if let Some(v) = self.ctx.intrinsic(instance_id, metric) {
            return v;
        }
        0.0
    }

    fn is_hidden(&self, instance_id: u32) -> bool {
        if let Some(&v) = self.resolved.get(&(instance_id, ConstraintProp::Display)) {
            return v <= 0.0;
        }
        if let Some(v) = self.ctx.baseline(instance_id, ConstraintProp::Display) {
            return v <= 0.0;
        }
        false
    }

    fn widget_instance(&self, widget_id: &str) -> Option<u32> {
        self.graph.widget_id_to_instances.get(widget_id).and_then(|v| v.first().copied())
    }

    fn eval(&mut self, expr: &Expr, instance_id: u32, parent_instance_id: Option<u32>) -> f64 {
        match expr {
            Expr::Number(n) => sanitize(*n),
            Expr::Reference { scope, metric } => match scope {
                Scope::Viewport => {
                    let (w, h) = self.ctx.viewport();
                    match metric {
                        Metric::W | Metric::MinW => w,
                        Metric::H | Metric::MinH => h,
                    }
                }
                Scope::Parent => {
                    let (w, h) = parent_instance_id
                        .map(|p| self.ctx.parent_metrics(p))
                        .unwrap_or_else(|| self.ctx.root_parent());
                    match metric {
                        Metric::W | Metric::MinW => w,
                        Metric::H | Metric::MinH => h,
                    }
                }
                Scope::Intrinsic => self.ctx.intrinsic(instance_id, *metric).unwrap_or(0.0),
                Scope::Widget(id) => match self.widget_instance(id) {
                    Some(target) => self.lookup(target, *metric),
                    None => 0.0,
                },
            },
            Expr::Negate(inner) => -self.eval(inner, instance_id, parent_instance_id),
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval(lhs, instance_id, parent_instance_id);
                let b = self.eval(rhs, instance_id, parent_instance_id);
                sanitize(match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => safe_div(a, b),
                    BinaryOp::Gt => bool_to_f64(a > b),
                    BinaryOp::Ge => bool_to_f64(a >= b),
                    BinaryOp::Lt => bool_to_f64(a < b),
                    BinaryOp::Le => bool_to_f64(a <= b),
                    BinaryOp::Eq => bool_to_f64(a == b),
                    BinaryOp::Ne => bool_to_f64(a != b),
                })
            }
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.eval(cond, instance_id, parent_instance_id);
                if c > 0.0 {
                    self.eval(then_branch, instance_id, parent_instance_id)
                } else {
                    self.eval(else_branch, instance_id, parent_instance_id)
                }
            }
            Expr::Call { func, args } => self.eval_call(*func, args, instance_id, parent_instance_id),
        }
    }

    fn eval_call(&mut self, func: Func, args: &[Expr], instance_id: u32, parent_instance_id: Option<u32>) -> f64 {
        match func {
            Func::Clamp => {
                let lo = self.eval(&args[0], instance_id, parent_instance_id);
                let v = self.eval(&args[1], instance_id, parent_instance_id);
                let hi = self.eval(&args[2], instance_id, parent_instance_id);
                sanitize(v.max(lo).min(hi))
            }
            Func::Min => {
                let a = self.eval(&args[0], instance_id, parent_instance_id);
                let b = self.eval(&args[1], instance_id, parent_instance_id);
                a.min(b)
            }
            Func::Max => {
                let a = self.eval(&args[0], instance_id, parent_instance_id);
                let b = self.eval(&args[1], instance_id, parent_instance_id);
                a.max(b)
            }
            Func::Floor => sanitize(self.eval(&args[0], instance_id, parent_instance_id).floor()),
            Func::Ceil => sanitize(self.eval(&args[0], instance_id, parent_instance_id).ceil()),
            Func::Round => sanitize(self.eval(&args[0], instance_id, parent_instance_id).round()),
            Func::Abs => sanitize(self.eval(&args[0], instance_id, parent_instance_id).abs()),
            Func::If => {
                let c = self.eval(&args[0], instance_id, parent_instance_id);
                if c > 0.0 {
                    self.eval(&args[1], instance_id, parent_instance_id)
                } else {
                    self.eval(&args[2], instance_id, parent_instance_id)
                }
            }
            Func::Steps => {
                let value = self.eval(&args[0], instance_id, parent_instance_id);
                let pairs = &args[1..args.len() - 1];
                let default = self.eval(&args[args.len() - 1], instance_id, parent_instance_id);
                let mut i = 0;
                while i + 1 < pairs.len() {
                    let threshold = self.eval(&pairs[i], instance_id, parent_instance_id);
                    let result = self.eval(&pairs[i + 1], instance_id, parent_instance_id);
                    if value < threshold {
                        return result;
                    }
                    i += 2;
                }
                default
            }
            Func::MaxSibling | Func::SumSibling => {
                let widget_id = match &args[0] {
                    Expr::Reference { scope: Scope::Widget(id), .. } => id.clone(),
                    _ => return 0.0,
                };
                let cache_key = (func, widget_id.clone());
                if let Some(&v) = self.agg_cache.get(&cache_key) {
                    return v;
                }
                let instances = self
                    .graph
                    .widget_id_to_instances
                    .get(&widget_id)
                    .cloned()
                    .unwrap_or_default();
                let values: Vec<f64> = instances.iter().map(|&id| self.lookup(id, Metric::W)).collect();
                let result = match func {
                    Func::MaxSibling => values.iter().cloned().fold(0.0, f64::max),
                    Func::SumSibling => values.iter().sum(),
                    _ => unreachable!(),
                };
                self.agg_cache.insert(cache_key, result);
                result
            }
        }
    }
}

fn bool_to_f64(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Walks `graph.order` once, evaluating each node's AST and writing into the
/// result map so subsequent nodes see already-resolved values.
pub fn resolve(graph: &ConstraintGraph, ctx: &dyn ResolveContext) -> ResolvedValues {
    let mut resolved: ResolvedValues = AHashMap::default();
    let mut agg_cache: AHashMap<(Func, String), f64> = AHashMap::default();
    for &idx in &graph.order {
        let node = &graph.nodes[idx];
        let value = {
            let mut eval = Eval {
                graph,
                ctx,
                resolved: &resolved,
                agg_cache: &mut agg_cache,
            };
            eval.eval(&node.expr, node.instance_id, node.parent_instance_id)
        };
        resolved.insert((node.instance_id, node.prop), sanitize(value));
    }
    resolved
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: u32,
    viewport_w: i32,
    viewport_h: i32,
    parent_w: i32,
    parent_h: i32,
}

/// LRU cache over whole resolved-value maps, keyed by
/// `(graph.fingerprint, viewport.w, viewport.h, parent.w, parent.h)`.
/// Default capacity 8, matching the spec.
pub struct ResolveCache {
    capacity: usize,
    // most-recently-used at the back
    entries: Vec<(CacheKey, Rc<ResolvedValues>)>,
}

impl Default for ResolveCache {
    fn default() -> Self {
        Self::with_capacity(8)
    }
}

impl ResolveCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    pub fn resolve(&mut self, graph: &ConstraintGraph, ctx: &dyn ResolveContext) -> Rc<ResolvedValues> {
        let (vw, vh) = ctx.viewport();
        let (pw, ph) = ctx.root_parent();
        let key = CacheKey {
            fingerprint: graph.fingerprint,
            viewport_w: vw as i32,
            viewport_h: vh as i32,
            parent_w: pw as i32,
            parent_h: ph as i32,
        };
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            let entry = self.entries.remove(pos);
            let value = entry.1.clone();
            self.entries.push(entry);
            return value;
        }
        let fresh = Rc::new(resolve(graph, ctx));
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push((key, fresh.clone()));
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConstraintGraph;
    use crate::node::ConstraintNodeInput;
    use crate::parse::parse;

    struct FixedCtx {
        viewport: (f64, f64),
    }
    impl ResolveContext for FixedCtx {
        fn viewport(&self) -> (f64, f64) {
            self.viewport
        }
        fn root_parent(&self) -> (f64, f64) {
            self.viewport
        }
        fn parent_metrics(&self, _instance_id: u32) -> (f64, f64) {
            self.viewport
        }
        fn baseline(&self, _instance_id: u32, _prop: ConstraintProp) -> Option<f64> {
            None
        }
        fn intrinsic(&self, _instance_id: u32, _metric: Metric) -> Option<f64> {
            None
        }
    }

    fn node(instance_id: u32, widget_id: Option<&str>, prop: ConstraintProp, source: &str) -> ConstraintNodeInput {
        ConstraintNodeInput {
            instance_id,
            parent_instance_id: None,
            widget_id: widget_id.map(|s| s.to_string()),
            prop,
            expr: parse(source).unwrap(),
            source: source.to_string(),
        }
    }

    #[test]
    fn division_by_zero_sanitizes_to_zero() {
        let nodes = vec![node(1, None, ConstraintProp::Width, "10 / 0")];
        let graph = ConstraintGraph::build(nodes).unwrap();
        let ctx = FixedCtx { viewport: (80.0, 24.0) };
        let resolved = resolve(&graph, &ctx);
        assert_eq!(resolved[&(1, ConstraintProp::Width)], 0.0);
    }

    #[test]
    fn viewport_reference_reads_viewport_size() {
        let nodes = vec![node(1, None, ConstraintProp::Width, "viewport.w")];
        let graph = ConstraintGraph::build(nodes).unwrap();
        let ctx = FixedCtx { viewport: (80.0, 24.0) };
        let resolved = resolve(&graph, &ctx);
        assert_eq!(resolved[&(1, ConstraintProp::Width)], 80.0);
    }

    #[test]
    fn dependent_node_sees_resolved_dependency() {
        let nodes = vec![
            node(1, Some("a"), ConstraintProp::Width, "40"),
            node(2, None, ConstraintProp::Width, "#a.w + 2"),
        ];
        let graph = ConstraintGraph::build(nodes).unwrap();
        let ctx = FixedCtx { viewport: (80.0, 24.0) };
        let resolved = resolve(&graph, &ctx);
        assert_eq!(resolved[&(2, ConstraintProp::Width)], 42.0);
    }

    #[test]
    fn hidden_widget_contributes_zero_to_sibling_aggregation() {
        let nodes = vec![
            node(1, Some("a"), ConstraintProp::Display, "0"),
            node(1, Some("a"), ConstraintProp::Width, "40"),
            node(2, Some("b"), ConstraintProp::Width, "40"),
            node(3, None, ConstraintProp::Width, "max_sibling(#a) + max_sibling(#b)"),
        ];
        let graph = ConstraintGraph::build(nodes).unwrap();
        let ctx = FixedCtx { viewport: (80.0, 24.0) };
        let resolved = resolve(&graph, &ctx);
        // `a` is hidden so its width contributes 0; only `b`'s 40 survives.
        assert_eq!(resolved[&(3, ConstraintProp::Width)], 40.0);
    }

    #[test]
    fn lru_cache_reuses_identical_keys() {
        let nodes = vec![node(1, None, ConstraintProp::Width, "viewport.w")];
        let graph = ConstraintGraph::build(nodes).unwrap();
        let ctx = FixedCtx { viewport: (80.0, 24.0) };
        let mut cache = ResolveCache::default();
        let a = cache.resolve(&graph, &ctx);
        let b = cache.resolve(&graph, &ctx);
        assert!(Rc::ptr_eq(&a, &b));
    }
}
