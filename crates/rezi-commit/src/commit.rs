use ahash::AHashMap;
use std::collections::VecDeque;

use rezi_view::{Kind, VNode};

use crate::error::CommitError;
use crate::instance::{InstanceRegistry, RuntimeInstance};

/// Transforms `(previousRootInstance | none, nextRootVNode)` into
/// `nextRootInstance`, preserving identity per the pairing algorithm.
///
/// When the previous root exists but its kind no longer matches the next
/// root's kind, the whole tree is replaced: the old root is disposed and a
/// fresh instance is created.
pub fn commit(
    prev_root: Option<u32>,
    next: VNode,
    registry: &mut InstanceRegistry,
) -> Result<u32, CommitError> {
    match prev_root {
        Some(prev_id) if registry.get(prev_id).map(|i| i.vnode.kind) == Some(next.kind) => {
            update_in_place(prev_id, next, registry)
        }
        Some(prev_id) => {
            dispose(prev_id, registry);
            Ok(create_new(next, registry))
        }
        None => Ok(create_new(next, registry)),
    }
}

/// Invokes all cleanup effects depth-first (children before the node
/// itself) and removes the instance and its subtree from the registry.
pub fn dispose(id: u32, registry: &mut InstanceRegistry) {
    let children = registry.get(id).map(|i| i.children.clone()).unwrap_or_default();
    for child in children {
        dispose(child, registry);
    }
    if let Some(mut instance) = registry.remove(id) {
        for effect in instance.take_cleanup_effects() {
            effect();
        }
    }
}

fn create_new(next: VNode, registry: &mut InstanceRegistry) -> u32 {
    let id = registry.allocate_id();
    let children_vnodes = next.children.clone();
    let child_ids: Vec<u32> = children_vnodes
        .into_iter()
        .map(|c| create_new(c, registry))
        .collect();
    registry.insert(id, RuntimeInstance::new(id, next, child_ids));
    id
}

fn update_in_place(id: u32, next: VNode, registry: &mut InstanceRegistry) -> Result<u32, CommitError> {
    let prev_children_ids = registry
        .get(id)
        .ok_or(CommitError::UnknownInstance(id))?
        .children
        .clone();
    let prev_props = registry.get(id).unwrap().vnode.props.clone();
    let next_children_vnodes = next.children.clone();

    let (new_child_ids, any_child_dirty) =
        pair_children(&prev_children_ids, next_children_vnodes, registry)?;

    let props_changed = prev_props != next.props;
    let children_changed = new_child_ids != prev_children_ids;
    let dirty = props_changed || children_changed || any_child_dirty;

    let instance = registry.get_mut(id).expect("instance vanished during update");
    instance.vnode = next;
    instance.children = new_child_ids;
    instance.generation += 1;
    instance.dirty = dirty;
    Ok(id)
}

/// Order-preserving O(n) child pairing: keyed children are matched by
/// `(kind, key)`; unkeyed children are matched to the next unconsumed
/// unkeyed previous child of the same kind, in relative order.
fn pair_children(
    prev_ids: &[u32],
    next_children: Vec<VNode>,
    registry: &mut InstanceRegistry,
) -> Result<(Vec<u32>, bool), CommitError> {
    let mut keyed: AHashMap<(Kind, String), VecDeque<u32>> = AHashMap::default();
    let mut unkeyed: AHashMap<Kind, VecDeque<u32>> = AHashMap::default();

    for &prev_id in prev_ids {
        let prev = registry.get(prev_id).ok_or(CommitError::UnknownInstance(prev_id))?;
        match &prev.vnode.key {
            Some(key) => keyed
                .entry((prev.vnode.kind, key.clone()))
                .or_default()
                .push_back(prev_id),
            None => unkeyed.entry(prev.vnode.kind).or_default().push_back(prev_id),
        }
    }

    let mut result = Vec::with_capacity(next_children.len());
    for next in next_children {
        let kind = next.kind;
        let paired = match &next.key {
            Some(key) => keyed.get_mut(&(kind, key.clone())).and_then(VecDeque::pop_front),
            None => unkeyed.get_mut(&kind).and_then(VecDeque::pop_front),
        };
        let id = match paired {
            Some(prev_id) => update_in_place(prev_id, next, registry)?,
            None => create_new(next, registry),
        };
        result.push(id);
    }

    for (_, queue) in keyed {
        for prev_id in queue {
            dispose(prev_id, registry);
        }
    }
    for (_, queue) in unkeyed {
        for prev_id in queue {
            dispose(prev_id, registry);
        }
    }

    let any_child_dirty = result
        .iter()
        .any(|&id| registry.get(id).map(|i| i.dirty).unwrap_or(false));
    Ok((result, any_child_dirty))
}
