//! The view model: an immutable value type describing one frame's UI. Nodes
//! are built with helper functions and never mutated afterward — identity is
//! strictly a property of the runtime instance tree (`rezi-commit`), never of
//! a `VNode`.

mod kind;
mod props;

pub use kind::Kind;
pub use props::{ConstrainedValue, PropValue, Props, SpacingScale};

/// An immutable description of one element: a kind tag, a prop bag, an
/// ordered (possibly empty) child sequence, and an optional reconciliation
/// key used to pair this node with a previous-frame instance of the same
/// kind among its siblings.
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    pub kind: Kind,
    pub props: Props,
    pub children: Vec<VNode>,
    pub key: Option<String>,
}

impl VNode {
    pub fn new(kind: Kind, props: Props, children: Vec<VNode>) -> Self {
        Self {
            kind,
            props,
            children,
            key: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn leaf(kind: Kind, props: Props) -> Self {
        Self::new(kind, props, Vec::new())
    }
}

pub fn row(props: Props, children: Vec<VNode>) -> VNode {
    VNode::new(Kind::Row, props, children)
}

pub fn column(props: Props, children: Vec<VNode>) -> VNode {
    VNode::new(Kind::Column, props, children)
}

pub fn bx(props: Props, children: Vec<VNode>) -> VNode {
    VNode::new(Kind::Box, props, children)
}

pub fn text(content: impl Into<String>, props: Props) -> VNode {
    VNode::leaf(Kind::Text, props.with("content", content.into()))
}

pub fn spacer(props: Props) -> VNode {
    VNode::leaf(Kind::Spacer, props)
}

pub fn divider(props: Props) -> VNode {
    VNode::leaf(Kind::Divider, props)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vnodes_carry_no_identity_and_compare_by_value() {
        let a = row(Props::new(), vec![text("hi", Props::new())]);
        let b = row(Props::new(), vec![text("hi", Props::new())]);
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_attached_without_mutating_children() {
        let node = bx(Props::new(), Vec::new()).with_key("sidebar");
        assert_eq!(node.key.as_deref(), Some("sidebar"));
    }

    #[test]
    fn widget_id_prop_is_readable_via_props_helper() {
        let props = Props::new().with("id", "sidebar");
        assert_eq!(props.widget_id(), Some("sidebar"));
    }
}
