/// The structural/semantic tag of a [`crate::VNode`]. The widget catalog is
/// deliberately open-ended (see `rezi-constraint`/layout's generic
/// measurement+draw contract); this enum fixes the minimal set needed to
/// exercise every pipeline stage plus common container kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    // structural
    Row,
    Column,
    Box,
    Text,
    Spacer,
    Divider,
    // focusable leaves
    Button,
    Input,
    Select,
    Checkbox,
    Slider,
    // containers
    FocusZone,
    FocusTrap,
    Layers,
    Modal,
    VirtualList,
    Table,
    Tree,
}

impl Kind {
    pub fn is_focusable_leaf(self) -> bool {
        matches!(
            self,
            Kind::Button | Kind::Input | Kind::Select | Kind::Checkbox | Kind::Slider
        )
    }

    pub fn is_stack(self) -> bool {
        matches!(self, Kind::Row | Kind::Column)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Row => "row",
            Kind::Column => "column",
            Kind::Box => "box",
            Kind::Text => "text",
            Kind::Spacer => "spacer",
            Kind::Divider => "divider",
            Kind::Button => "button",
            Kind::Input => "input",
            Kind::Select => "select",
            Kind::Checkbox => "checkbox",
            Kind::Slider => "slider",
            Kind::FocusZone => "focusZone",
            Kind::FocusTrap => "focusTrap",
            Kind::Layers => "layers",
            Kind::Modal => "modal",
            Kind::VirtualList => "virtualList",
            Kind::Table => "table",
            Kind::Tree => "tree",
        }
    }
}
