use crate::node::NodeKind;

/// Binding strength of the notation of a node kind; `None` for atoms, which
/// never take parentheses.
pub fn precedence(kind: NodeKind) -> Option<usize> {
    use NodeKind::*;
    let prec = match kind {
        ForAll | Exists | ExistsUnique | Lambda => 5,
        Iff => 10,
        Implies => 20,
        Or => 30,
        And => 40,
        Not => 50,
        Equal | NotEqual | Less | LessEq | Greater | GreaterEq | Belongs | Included => 60,
        Union | SetDiff => 70,
        Inter => 75,
        Sum | Diff => 80,
        Mult | Div => 90,
        Minus => 95,
        Power | SetComplement => 100,
        Function | Sequence | SetFamily => 100,
        Composite => 105,
        Application | SetImage | SetInverse => 110,
        LocalConstant | Constant | BoundVar | MetaVar | Number | Type | Prop | True | False
        | SetEmpty | Set | SetIntension | SetExtension => return None,
    };
    Some(prec)
}

fn is_associative(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::And | NodeKind::Or | NodeKind::Sum | NodeKind::Mult | NodeKind::Inter | NodeKind::Union
    )
}

fn is_left_associative(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Sum | NodeKind::Diff | NodeKind::Mult | NodeKind::Div)
}

/// Whether the child at `index` of a `parent` node needs parentheses when
/// rendered inside the parent's notation.
pub fn needs_paren(parent: NodeKind, child: NodeKind, index: usize) -> bool {
    let Some(child_prec) = precedence(child) else {
        return false;
    };
    if parent.is_quantifier() || parent == NodeKind::SetIntension {
        return false;
    }
    match parent {
        // only the function position is at risk
        NodeKind::Application => return index == 0 && child_prec < 110,
        NodeKind::Not => return child != NodeKind::Application,
        NodeKind::Lambda => return false,
        NodeKind::SetImage | NodeKind::SetInverse => return index == 0 && child_prec < 110,
        _ => {}
    }
    if child.is_quantifier() || child == NodeKind::Lambda {
        return true;
    }
    let Some(parent_prec) = precedence(parent) else {
        return false;
    };
    if child_prec != parent_prec {
        return child_prec < parent_prec;
    }
    if parent == child && is_associative(parent) {
        return false;
    }
    // a - b - c is (a - b) - c
    !(index == 0 && is_left_associative(parent) && is_left_associative(child))
}

/// In Lean source every compound argument is parenthesised, except in binder
/// positions.
pub fn lean_needs_paren(parent: NodeKind, child: NodeKind, index: usize) -> bool {
    if precedence(child).is_none() {
        return false;
    }
    if parent.is_binder() {
        return index == 0 && child.is_binary_operator();
    }
    true
}
