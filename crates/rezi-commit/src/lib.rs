//! The commit/reconciler stage (§4.B): turns `(previous instance tree |
//! none, next VNode tree)` into a committed [`InstanceRegistry`], preserving
//! stable identity across renders per the pairing algorithm in §3.
//!
//! Identity lives entirely on [`RuntimeInstance`]; a [`rezi_view::VNode`]
//! never carries one. A commit either returns the new root instance id or a
//! fatal [`CommitError`] — on failure the caller keeps whatever tree it had
//! before the call, since this module never mutates a registry's previously
//! committed instances on the failing path.

mod commit;
mod error;
mod instance;

pub use commit::{commit, dispose};
pub use error::CommitError;
pub use instance::{InstanceRegistry, RuntimeInstance};

#[cfg(test)]
mod tests {
    use super::*;
    use rezi_view::{Kind, Props, VNode, bx, column, row, text};

    #[test]
    fn first_commit_with_no_prev_allocates_fresh_ids() {
        let mut registry = InstanceRegistry::new();
        let root = commit(None, row(Props::new(), vec![text("hi", Props::new())]), &mut registry).unwrap();
        let instance = registry.get(root).unwrap();
        assert_eq!(instance.vnode.kind, Kind::Row);
        assert_eq!(instance.children.len(), 1);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn keyed_sibling_preserves_identity_across_reorder() {
        let mut registry = InstanceRegistry::new();
        let a = bx(Props::new(), Vec::new()).with_key("a");
        let b = bx(Props::new(), Vec::new()).with_key("b");
        let root = commit(None, row(Props::new(), vec![a.clone(), b.clone()]), &mut registry).unwrap();
        let prev_children = registry.get(root).unwrap().children.clone();

        let root2 = commit(Some(root), row(Props::new(), vec![b, a]), &mut registry).unwrap();
        assert_eq!(root2, root, "root instance is reused in place");
        let next_children = registry.get(root2).unwrap().children.clone();
        assert_eq!(next_children[0], prev_children[1], "b keeps its id");
        assert_eq!(next_children[1], prev_children[0], "a keeps its id");
    }

    #[test]
    fn unpaired_prev_child_is_disposed() {
        let mut registry = InstanceRegistry::new();
        let root = commit(
            None,
            row(Props::new(), vec![bx(Props::new(), Vec::new()), bx(Props::new(), Vec::new())]),
            &mut registry,
        )
        .unwrap();
        assert_eq!(registry.live_count(), 3);

        commit(Some(root), row(Props::new(), vec![bx(Props::new(), Vec::new())]), &mut registry).unwrap();
        assert_eq!(registry.live_count(), 2, "the dropped sibling and its subtree are gone");
    }

    #[test]
    fn root_kind_change_replaces_the_whole_tree() {
        let mut registry = InstanceRegistry::new();
        let root = commit(None, row(Props::new(), vec![text("a", Props::new())]), &mut registry).unwrap();
        let root2 = commit(Some(root), column(Props::new(), vec![text("a", Props::new())]), &mut registry).unwrap();
        assert_ne!(root2, root);
        assert!(registry.get(root).is_none());
    }

    #[test]
    fn disposal_runs_cleanup_effects_depth_first() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut registry = InstanceRegistry::new();
        let root = commit(None, row(Props::new(), vec![bx(Props::new(), Vec::new())]), &mut registry).unwrap();
        let child = registry.get(root).unwrap().children[0];

        let order = Rc::new(RefCell::new(Vec::new()));
        let child_order = order.clone();
        registry.get_mut(child).unwrap().on_dispose(move || child_order.borrow_mut().push("child"));
        let root_order = order.clone();
        registry.get_mut(root).unwrap().on_dispose(move || root_order.borrow_mut().push("root"));

        dispose(root, &mut registry);
        assert_eq!(*order.borrow(), vec!["child", "root"]);
    }

    #[test]
    fn unkeyed_siblings_pair_by_index_and_kind() {
        let mut registry = InstanceRegistry::new();
        let root = commit(
            None,
            row(Props::new(), vec![text("a", Props::new()), bx(Props::new(), Vec::new())]),
            &mut registry,
        )
        .unwrap();
        let prev_children = registry.get(root).unwrap().children.clone();

        commit(
            Some(root),
            row(Props::new(), vec![text("b", Props::new()), bx(Props::new(), Vec::new())]),
            &mut registry,
        )
        .unwrap();
        let next_children = registry.get(root).unwrap().children.clone();
        assert_eq!(next_children, prev_children, "same kinds at same slots keep their ids");

        let text_instance = registry.get(next_children[0]).unwrap();
        assert_eq!(text_instance.vnode.props.get_str("content"), Some("b"));
    }

    #[test]
    fn generation_increments_only_on_update_not_on_creation() {
        let mut registry = InstanceRegistry::new();
        let root = commit(None, bx(Props::new(), Vec::new()), &mut registry).unwrap();
        assert_eq!(registry.get(root).unwrap().generation, 0);
        commit(Some(root), bx(Props::new().with("width", 5), Vec::new()), &mut registry).unwrap();
        assert_eq!(registry.get(root).unwrap().generation, 1);
    }

    #[test]
    fn unchanged_subtree_is_not_marked_dirty_after_update() {
        let mut registry = InstanceRegistry::new();
        let root = commit(None, row(Props::new(), vec![text("same", Props::new())]), &mut registry).unwrap();
        commit(Some(root), row(Props::new(), vec![text("same", Props::new())]), &mut registry).unwrap();
        let child = registry.get(root).unwrap().children[0];
        assert!(!registry.get(child).unwrap().dirty, "identical vnode content clears dirty");
    }

    #[test]
    fn unknown_instance_in_children_list_is_a_commit_error() {
        let mut registry = InstanceRegistry::new();
        let bogus = VNode::leaf(Kind::Box, Props::new());
        // Force an inconsistent registry state: remove a child out from under
        // its parent, then try to commit through it.
        let root = commit(None, row(Props::new(), vec![bogus]), &mut registry).unwrap();
        let child = registry.get(root).unwrap().children[0];
        registry.remove(child);
        let err = commit(Some(root), row(Props::new(), vec![bx(Props::new(), Vec::new())]), &mut registry);
        assert!(matches!(err, Err(CommitError::UnknownInstance(id)) if id == child));
    }
}
