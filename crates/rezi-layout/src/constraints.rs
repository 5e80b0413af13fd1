use rezi_commit::InstanceRegistry;
use rezi_constraint::{ConstraintNodeInput, ConstraintProp};
use rezi_view::{ConstrainedValue, Props};

fn push_if_expr(
    out: &mut Vec<ConstraintNodeInput>,
    instance_id: u32,
    parent_instance_id: Option<u32>,
    widget_id: Option<&str>,
    prop: ConstraintProp,
    props: &Props,
) {
    if let Some(ConstrainedValue::Expr(expr)) = props.get_constrained(prop.as_str()) {
        out.push(ConstraintNodeInput {
            instance_id,
            parent_instance_id,
            widget_id: widget_id.map(str::to_string),
            prop,
            expr: expr.clone(),
            source: format!("{}:{}", instance_id, prop.as_str()),
        });
    }
}

/// Walks the committed instance tree (depth-first, iterative) collecting one
/// [`ConstraintNodeInput`] per (instance, constrained-prop) pair whose prop
/// value is a parsed expression — the input the constraint graph builder
/// consumes. Plain int/percent/auto/full/spacing values never produce a
/// graph node; the layout engine resolves those itself.
pub fn collect_constraint_inputs(registry: &InstanceRegistry, root_id: u32) -> Vec<ConstraintNodeInput> {
    const PROPS: [ConstraintProp; 8] = [
        ConstraintProp::Width,
        ConstraintProp::Height,
        ConstraintProp::MinWidth,
        ConstraintProp::MaxWidth,
        ConstraintProp::MinHeight,
        ConstraintProp::MaxHeight,
        ConstraintProp::FlexBasis,
        ConstraintProp::Display,
    ];

    let mut out = Vec::new();
    let mut stack = vec![(root_id, None::<u32>)];
    while let Some((id, parent)) = stack.pop() {
        let Some(instance) = registry.get(id) else {
            continue;
        };
        let props = &instance.vnode.props;
        let widget_id = props.widget_id();
        for &prop in &PROPS {
            push_if_expr(&mut out, id, parent, widget_id, prop, props);
        }
        for &child in instance.children.iter().rev() {
            stack.push((child, Some(id)));
        }
    }
    out
}
