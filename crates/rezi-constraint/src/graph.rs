use ahash::AHashMap;
use std::collections::BTreeSet;

use crate::error::ConstraintError;
use crate::expr::Metric;
use crate::node::{ConstraintNodeInput, ConstraintProp, node_key};

fn metric_to_prop(metric: Metric) -> ConstraintProp {
    match metric {
        Metric::W => ConstraintProp::Width,
        Metric::H => ConstraintProp::Height,
        Metric::MinW => ConstraintProp::MinWidth,
        Metric::MinH => ConstraintProp::MinHeight,
    }
}

/// A directed acyclic graph of constrained props, topologically sorted so
/// dependencies resolve before dependents.
#[derive(Debug)]
pub struct ConstraintGraph {
    pub nodes: Vec<ConstraintNodeInput>,
    /// node index -> indices of nodes it depends on.
    pub edges: Vec<Vec<usize>>,
    /// topological order: dependency before dependent.
    pub order: Vec<usize>,
    pub fingerprint: u32,
    pub requires_commit_relayout: bool,
    pub has_display_constraints: bool,
    pub widget_id_to_instances: AHashMap<String, Vec<u32>>,
    pub instance_to_widget_id: AHashMap<u32, String>,
    key_to_index: AHashMap<String, usize>,
}

impl ConstraintGraph {
    pub fn node_index_for(&self, instance_id: u32, prop: ConstraintProp) -> Option<usize> {
        self.key_to_index.get(&node_key(instance_id, prop)).copied()
    }

    pub fn build(nodes: Vec<ConstraintNodeInput>) -> Result<ConstraintGraph, ConstraintError> {
        let mut key_to_index = AHashMap::default();
        for (i, n) in nodes.iter().enumerate() {
            key_to_index.insert(node_key(n.instance_id, n.prop), i);
        }

        let mut widget_id_to_instances: AHashMap<String, Vec<u32>> = AHashMap::default();
        let mut instance_to_widget_id: AHashMap<u32, String> = AHashMap::default();
        for n in &nodes {
            if let Some(wid) = &n.widget_id {
                let list = widget_id_to_instances.entry(wid.clone()).or_default();
                if !list.contains(&n.instance_id) {
                    list.push(n.instance_id);
                }
                instance_to_widget_id.insert(n.instance_id, wid.clone());
            }
        }

        let has_display_constraints = nodes.iter().any(|n| n.prop == ConstraintProp::Display);
        let mut requires_commit_relayout = false;
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

        for (idx, n) in nodes.iter().enumerate() {
            let mut add_edge = |target_instance: u32, target_prop: ConstraintProp| {
                if let Some(dep_idx) = key_to_index.get(&node_key(target_instance, target_prop)) {
                    if !edges[idx].contains(dep_idx) {
                        edges[idx].push(*dep_idx);
                    }
                } else {
                    requires_commit_relayout = true;
                }
            };

            let mut unresolved: Option<ConstraintError> = None;
            n.expr.for_each_widget_ref(|widget_id, is_aggregation| {
                if unresolved.is_some() {
                    return;
                }
                let Some(instances) = widget_id_to_instances.get(widget_id) else {
                    unresolved = Some(ConstraintError::invalid(
                        &n.source,
                        format!("unknown widget id '{widget_id}'"),
                    ));
                    return;
                };
                if is_aggregation {
                    for &inst in instances {
                        // aggregation functions read width by convention (no metric is
                        // carried in call syntax); see DESIGN.md for this decision.
                        add_edge(inst, ConstraintProp::Width);
                        add_edge(inst, ConstraintProp::Display);
                    }
                } else {
                    if instances.len() > 1 {
                        unresolved = Some(ConstraintError::invalid(
                            &n.source,
                            format!("ambiguous widget reference '#{widget_id}' matches {} instances", instances.len()),
                        ));
                        return;
                    }
                    let inst = instances[0];
                    // the specific metric-derived prop is added by the caller loop below,
                    // using the reference's own metric; here we only add the implicit
                    // display edge shared by every non-aggregation widget reference.
                    add_edge(inst, ConstraintProp::Display);
                }
            });
            if let Some(err) = unresolved {
                return Err(err);
            }

            // second pass: direct (non-aggregation) references also depend on the
            // exact metric-mapped prop of their target, which for_each_widget_ref's
            // callback signature (id, is_aggregation) doesn't carry; walk again with
            // full reference detail.
            collect_direct_metric_edges(&n.expr, &widget_id_to_instances, &key_to_index, idx, &mut edges, &mut requires_commit_relayout);
        }

        let order = match topological_order(&edges) {
            Ok(order) => order,
            Err(remaining) => {
                let cycle = extract_cycle(&edges, &remaining);
                let labeled: Vec<String> = cycle.iter().map(|&i| nodes_label(&nodes, i)).collect();
                return Err(ConstraintError::circular(labeled));
            }
        };

        let fingerprint = fingerprint_of(&nodes);

        Ok(ConstraintGraph {
            nodes,
            edges,
            order,
            fingerprint,
            requires_commit_relayout,
            has_display_constraints,
            widget_id_to_instances,
            instance_to_widget_id,
            key_to_index,
        })
    }
}

fn nodes_label(nodes: &[ConstraintNodeInput], idx: usize) -> String {
    let n = &nodes[idx];
    match &n.widget_id {
        Some(id) => id.clone(),
        None => format!("#{}", n.instance_id),
    }
}

fn collect_direct_metric_edges(
    expr: &crate::expr::Expr,
    widget_id_to_instances: &AHashMap<String, Vec<u32>>,
    key_to_index: &AHashMap<String, usize>,
    idx: usize,
    edges: &mut [Vec<usize>],
    requires_commit_relayout: &mut bool,
) {
    use crate::expr::{Expr, Scope};
    fn walk(
        e: &Expr,
        widget_id_to_instances: &AHashMap<String, Vec<u32>>,
        key_to_index: &AHashMap<String, usize>,
        idx: usize,
        edges: &mut [Vec<usize>],
        requires_commit_relayout: &mut bool,
    ) {
        match e {
            Expr::Number(_) => {}
            Expr::Reference {
                scope: Scope::Widget(widget_id),
                metric,
            } => {
                if let Some(instances) = widget_id_to_instances.get(widget_id) {
                    if instances.len() == 1 {
                        let prop = metric_to_prop(*metric);
                        if let Some(dep_idx) = key_to_index.get(&node_key(instances[0], prop)) {
                            if !edges[idx].contains(dep_idx) {
                                edges[idx].push(*dep_idx);
                            }
                        } else {
                            *requires_commit_relayout = true;
                        }
                    }
                }
            }
            Expr::Reference { .. } => {}
            Expr::Negate(inner) => walk(inner, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout),
            Expr::Binary { lhs, rhs, .. } => {
                walk(lhs, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
                walk(rhs, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
            }
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                walk(cond, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
                walk(then_branch, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
                walk(else_branch, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
            }
            Expr::Call { func, args } => {
                if !func.is_aggregation() {
                    for a in args {
                        walk(a, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
                    }
                }
            }
        }
    }
    walk(expr, widget_id_to_instances, key_to_index, idx, edges, requires_commit_relayout);
}

/// Kahn's algorithm. Ties among ready nodes are broken by ascending index
/// (document order) for determinism. Returns `Err(remaining)` — the set of
/// node indices that never reached in-degree 0 — when a cycle exists.
fn topological_order(edges: &[Vec<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let n = edges.len();
    let mut in_degree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (a, deps) in edges.iter().enumerate() {
        in_degree[a] = deps.len();
        for &b in deps {
            dependents[b].push(a);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(&next) = ready.iter().next() {
        ready.remove(&next);
        order.push(next);
        for &dependent in &dependents[next] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        let remaining: Vec<usize> = (0..n).filter(|i| in_degree[*i] > 0 || !order.contains(i)).collect();
        Err(remaining)
    }
}

/// DFS-based cycle extraction restricted to the nodes that failed to sort.
fn extract_cycle(edges: &[Vec<usize>], remaining: &[usize]) -> Vec<usize> {
    let remaining_set: std::collections::HashSet<usize> = remaining.iter().copied().collect();
    let mut visiting: Vec<usize> = Vec::new();
    let mut on_stack = vec![false; edges.len()];
    let mut visited = vec![false; edges.len()];

    fn dfs(
        node: usize,
        edges: &[Vec<usize>],
        remaining_set: &std::collections::HashSet<usize>,
        visiting: &mut Vec<usize>,
        on_stack: &mut [bool],
        visited: &mut [bool],
    ) -> Option<Vec<usize>> {
        visited[node] = true;
        on_stack[node] = true;
        visiting.push(node);
        for &dep in &edges[node] {
            if !remaining_set.contains(&dep) {
                continue;
            }
            if on_stack[dep] {
                let start = visiting.iter().position(|&x| x == dep).unwrap();
                let mut cycle = visiting[start..].to_vec();
                cycle.push(dep);
                return Some(cycle);
            }
            if !visited[dep] {
                if let Some(cycle) = dfs(dep, edges, remaining_set, visiting, on_stack, visited) {
                    return Some(cycle);
                }
            }
        }
        visiting.pop();
        on_stack[node] = false;
        None
    }

    for &start in remaining {
        if visited[start] {
            continue;
        }
        if let Some(cycle) = dfs(start, edges, &remaining_set, &mut visiting, &mut on_stack, &mut visited) {
            return cycle;
        }
    }
    remaining.to_vec()
}

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

fn fnv1a32_update(mut hash: u32, bytes: &[u8]) -> u32 {
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fingerprint_of(nodes: &[ConstraintNodeInput]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for n in nodes {
        hash = fnv1a32_update(hash, &n.instance_id.to_le_bytes());
        hash = fnv1a32_update(hash, &[0]);
        hash = fnv1a32_update(hash, n.prop.as_str().as_bytes());
        hash = fnv1a32_update(hash, &[0]);
        hash = fnv1a32_update(hash, n.source.as_bytes());
        hash = fnv1a32_update(hash, &[0]);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

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
    fn topological_order_respects_dependency_edges() {
        let nodes = vec![
            node(1, Some("a"), ConstraintProp::Width, "40"),
            node(2, Some("b"), ConstraintProp::Width, "#a.w + 2"),
        ];
        let graph = ConstraintGraph::build(nodes).unwrap();
        let pos_a = graph.order.iter().position(|&i| i == 0).unwrap();
        let pos_b = graph.order.iter().position(|&i| i == 1).unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn detects_two_node_cycle() {
        let nodes = vec![
            node(1, Some("a"), ConstraintProp::Width, "#b.w"),
            node(2, Some("b"), ConstraintProp::Width, "#a.w"),
        ];
        let err = ConstraintGraph::build(nodes).unwrap_err();
        match err {
            ConstraintError::Circular { cycle } => {
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected circular error, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_widget_reference_is_fatal() {
        let nodes = vec![
            node(1, Some("x"), ConstraintProp::Width, "40"),
            node(2, Some("x"), ConstraintProp::Width, "40"),
            node(3, None, ConstraintProp::Width, "#x.w"),
        ];
        let err = ConstraintGraph::build(nodes).unwrap_err();
        assert_eq!(err.code(), "ZRUI_INVALID_CONSTRAINT");
    }

    #[test]
    fn unknown_widget_id_is_fatal() {
        let nodes = vec![node(1, None, ConstraintProp::Width, "#missing.w")];
        let err = ConstraintGraph::build(nodes).unwrap_err();
        assert_eq!(err.code(), "ZRUI_INVALID_CONSTRAINT");
    }

    #[test]
    fn fingerprint_is_deterministic_over_structurally_equal_inputs() {
        let a = vec![node(1, Some("a"), ConstraintProp::Width, "40")];
        let b = vec![node(1, Some("a"), ConstraintProp::Width, "40")];
        let ga = ConstraintGraph::build(a).unwrap();
        let gb = ConstraintGraph::build(b).unwrap();
        assert_eq!(ga.fingerprint, gb.fingerprint);
    }

    #[test]
    fn fingerprint_changes_with_source_text() {
        let a = vec![node(1, Some("a"), ConstraintProp::Width, "40")];
        let b = vec![node(1, Some("a"), ConstraintProp::Width, "41")];
        let ga = ConstraintGraph::build(a).unwrap();
        let gb = ConstraintGraph::build(b).unwrap();
        assert_ne!(ga.fingerprint, gb.fingerprint);
    }
}
