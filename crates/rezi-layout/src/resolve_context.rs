use ahash::AHashMap;
use rezi_commit::InstanceRegistry;
use rezi_constraint::{ConstraintProp, Metric, ResolveContext};

use crate::tree::LayoutTree;

/// Maps each instance to its parent, so a [`ResolveContext`] can answer
/// `parent_metrics` without the constraint crate knowing about trees at all.
pub fn build_parent_map(registry: &InstanceRegistry, root_id: u32) -> AHashMap<u32, u32> {
    let mut map = AHashMap::default();
    let mut stack = vec![root_id];
    while let Some(id) = stack.pop() {
        let Some(instance) = registry.get(id) else {
            continue;
        };
        for &child in &instance.children {
            map.insert(child, id);
            stack.push(child);
        }
    }
    map
}

/// A [`ResolveContext`] backed by a baseline layout pass: the baseline rect
/// for an instance serves both as the resolver's "baseline layout value"
/// fallback and as its "intrinsic" fallback, per §4.C's read-preference
/// chain (resolved, then baseline, then intrinsic, then zero) collapsing the
/// latter two when no separate intrinsic measurement is tracked.
pub struct BaselineResolveContext<'a> {
    pub baseline: &'a LayoutTree,
    pub parent_of: &'a AHashMap<u32, u32>,
    pub viewport_w: f64,
    pub viewport_h: f64,
}

impl ResolveContext for BaselineResolveContext<'_> {
    fn viewport(&self) -> (f64, f64) {
        (self.viewport_w, self.viewport_h)
    }

    fn root_parent(&self) -> (f64, f64) {
        let n = &self.baseline.root;
        (n.content_rect.w as f64, n.content_rect.h as f64)
    }

    fn parent_metrics(&self, instance_id: u32) -> (f64, f64) {
        match self.parent_of.get(&instance_id) {
            Some(&parent_id) => match self.baseline.find(parent_id) {
                Some(node) => (node.content_rect.w as f64, node.content_rect.h as f64),
                None => self.root_parent(),
            },
            None => self.root_parent(),
        }
    }

    fn baseline(&self, instance_id: u32, prop: ConstraintProp) -> Option<f64> {
        let node = self.baseline.find(instance_id)?;
        Some(match prop {
            ConstraintProp::Width | ConstraintProp::MaxWidth | ConstraintProp::MinWidth | ConstraintProp::FlexBasis => {
                node.rect.w as f64
            }
            ConstraintProp::Height | ConstraintProp::MaxHeight | ConstraintProp::MinHeight => node.rect.h as f64,
            ConstraintProp::Display => {
                if node.hidden {
                    0.0
                } else {
                    1.0
                }
            }
        })
    }

    fn intrinsic(&self, instance_id: u32, metric: Metric) -> Option<f64> {
        let node = self.baseline.find(instance_id)?;
        Some(match metric {
            Metric::W | Metric::MinW => node.rect.w as f64,
            Metric::H | Metric::MinH => node.rect.h as f64,
        })
    }
}
