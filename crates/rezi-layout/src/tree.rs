use crate::rect::Rect;

/// Scroll-container geometry: content vs viewport extents plus current
/// offsets, carried alongside a node's rect so the hit-tester and renderer
/// can clip and reserve scrollbar cells without re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetadata {
    pub scroll_x: i32,
    pub scroll_y: i32,
    pub content_width: i32,
    pub content_height: i32,
    pub viewport_width: i32,
    pub viewport_height: i32,
}

impl ScrollMetadata {
    pub fn overflows_x(&self) -> bool {
        self.content_width > self.viewport_width
    }

    pub fn overflows_y(&self) -> bool {
        self.content_height > self.viewport_height
    }
}

/// One node of the layout tree, parallel to the committed instance tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    pub instance_id: u32,
    pub rect: Rect,
    /// The rect available to children after padding/border is subtracted
    /// (and, for scroll containers, after scrollbar reservation).
    pub content_rect: Rect,
    pub scroll: Option<ScrollMetadata>,
    pub hidden: bool,
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn find(&self, instance_id: u32) -> Option<&LayoutNode> {
        if self.instance_id == instance_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(instance_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    pub root: LayoutNode,
}

impl LayoutTree {
    pub fn find(&self, instance_id: u32) -> Option<&LayoutNode> {
        self.root.find(instance_id)
    }
}
