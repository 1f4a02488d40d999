//! Shapes: how each node kind is laid out, as a sequence of macros, literal
//! strings and references to subexpressions.

use crate::expr::{Expr, Info};
use crate::node::NodeKind;

pub type Shape = Vec<ShapeItem>;

#[derive(Debug, Clone)]
pub enum ShapeItem {
    /// A latex-like macro, translated by the format pass.
    Macro(&'static str),
    Text(String),
    Child(usize),
    Descendant(Vec<usize>),
    Callable(fn(&Expr) -> Shape),
    /// The expression matched by the n-th metavariable of a pattern shape.
    Meta(usize),
    Name,
    Value,
    Sub(Shape),
    Sup(Shape),
}

use ShapeItem::*;

fn text(s: &str) -> ShapeItem {
    Text(s.to_owned())
}

/// A notation that overrides the generic shape of the subtrees matching
/// `pattern`. `kind` stands for the notation when deciding parentheses.
#[derive(Debug, Clone)]
pub struct PatternShape {
    pub pattern: Expr,
    pub metavars: Vec<Expr>,
    pub shape: Shape,
    pub kind: NodeKind,
    pub bounded: bool,
}

pub(crate) fn is_composition(expr: &Expr) -> bool {
    expr.kind() == NodeKind::Constant
        && matches!(expr.name(), Some("composition" | "function.comp" | "∘"))
}

pub(crate) fn is_indexed(expr: &Expr) -> bool {
    expr.math_type()
        .is_some_and(|t| matches!(t.kind(), NodeKind::Sequence | NodeKind::SetFamily))
}

fn arguments(shape: &mut Shape, range: std::ops::Range<usize>) {
    for (n, index) in range.enumerate() {
        if n > 0 {
            shape.push(Macro(r"\sep"));
        }
        shape.push(Child(index));
    }
}

fn application_shape(expr: &Expr) -> Shape {
    let len = expr.children().len();
    let Some(head) = expr.child(0) else {
        return vec![];
    };
    if is_composition(head) && len >= 3 {
        let mut shape = vec![Child(1), Macro(r"\circ"), Child(2)];
        if len > 3 {
            shape.insert(0, Macro(r"\lparen"));
            shape.push(Macro(r"\rparen"));
            shape.push(Macro(r"\lparen"));
            arguments(&mut shape, 3..len);
            shape.push(Macro(r"\rparen"));
        }
        return shape;
    }
    if is_indexed(head) && len == 2 {
        return vec![Child(0), Sub(vec![Child(1)])];
    }
    let mut shape = vec![Child(0), Macro(r"\lparen")];
    arguments(&mut shape, 1..len);
    shape.push(Macro(r"\rparen"));
    shape
}

fn quantifier_macro(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::ForAll => r"\forall",
        NodeKind::Exists => r"\exists",
        _ => r"\exists_unique",
    }
}

fn quantifier_shape(expr: &Expr) -> Shape {
    let mut shape = vec![Macro(quantifier_macro(expr.kind())), Child(1)];
    match expr.child(0).map(Expr::kind) {
        Some(NodeKind::Set) => shape.extend([Macro(r"\subset"), Descendant(vec![0, 0])]),
        Some(NodeKind::LocalConstant | NodeKind::Constant) => {
            shape.extend([Macro(r"\in"), Child(0)])
        }
        _ => shape.extend([Macro(r"\colon"), Child(0)]),
    }
    shape.extend([Macro(r"\comma"), Child(2)]);
    shape
}

fn lambda_shape(expr: &Expr) -> Shape {
    if !is_indexed(expr) {
        return vec![Child(1), Macro(r"\mapsto"), Child(2)];
    }
    // (u_n)_{n ∈ ℕ}
    let var = expr.child(1);
    let direct = expr.child(2).is_some_and(|body| {
        body.kind() == NodeKind::Application
            && body.children().len() == 2
            && var.is_some_and(|var| body.children()[1].is_same_bound_var(var))
    });
    let term = if direct {
        vec![Descendant(vec![2, 0]), Sub(vec![Child(1)])]
    } else {
        vec![Child(2)]
    };
    let mut shape = vec![Macro(r"\lparen")];
    shape.extend(term);
    shape.push(Macro(r"\rparen"));
    shape.push(Sub(vec![Child(1), Macro(r"\in"), Child(0)]));
    shape
}

fn complement_shape(expr: &Expr) -> Shape {
    let last = expr.children().len().saturating_sub(1);
    vec![Child(last), Macro(r"\complement")]
}

fn extension_shape(expr: &Expr) -> Shape {
    let mut shape = vec![Macro(r"\lbrace")];
    arguments(&mut shape, 0..expr.children().len());
    shape.push(Macro(r"\rbrace"));
    shape
}

/// The generic shape of a node, keyed by its kind.
pub fn latex_shape(expr: &Expr) -> Shape {
    use NodeKind::*;
    let infix = |op: &'static str| vec![ShapeItem::Child(0), Macro(op), ShapeItem::Child(1)];
    match expr.kind() {
        And => infix(r"\and"),
        Or => infix(r"\or"),
        Not => vec![Macro(r"\not"), Child(0)],
        Implies => infix(r"\implies"),
        Iff => infix(r"\iff"),
        True => vec![Macro(r"\true")],
        False => vec![Macro(r"\false")],
        ForAll | Exists | ExistsUnique => vec![Callable(quantifier_shape)],
        Belongs => infix(r"\in"),
        Included => infix(r"\subset"),
        Inter => infix(r"\cap"),
        Union => infix(r"\cup"),
        SetDiff => infix(r"\setminus"),
        SetComplement => vec![Callable(complement_shape)],
        SetEmpty => vec![Macro(r"\emptyset")],
        SetImage => vec![Child(0), Macro(r"\lparen"), Child(1), Macro(r"\rparen")],
        SetInverse => vec![
            Child(0),
            Macro(r"\inverse"),
            Macro(r"\lparen"),
            Child(1),
            Macro(r"\rparen"),
        ],
        SetIntension => vec![
            Macro(r"\lbrace"),
            Child(1),
            Macro(r"\in"),
            Child(0),
            Macro(r"\such_that"),
            Child(2),
            Macro(r"\rbrace"),
        ],
        SetExtension => vec![Callable(extension_shape)],
        Sum => infix(r"\plus"),
        Diff => infix(r"\minus"),
        Mult => infix(r"\mult"),
        Div => infix(r"\div"),
        Power => vec![Child(0), Sup(vec![Child(1)])],
        Minus => vec![Macro(r"\neg"), Child(0)],
        Number => vec![Value],
        Equal => infix(r"\equal"),
        NotEqual => infix(r"\neq"),
        Less => infix(r"\lt"),
        LessEq => infix(r"\leq"),
        Greater => infix(r"\gt"),
        GreaterEq => infix(r"\geq"),
        Set => vec![Macro(r"\powerset"), Macro(r"\lparen"), Child(0), Macro(r"\rparen")],
        Function | Sequence | SetFamily => infix(r"\to"),
        Type => vec![Macro(r"\type")],
        Prop => vec![Macro(r"\prop")],
        Composite => infix(r"\circ"),
        Lambda => vec![Callable(lambda_shape)],
        Application => vec![Callable(application_shape)],
        LocalConstant | Constant | BoundVar => vec![Name],
        MetaVar => vec![Macro(r"\metavar")],
    }
}

/// Natural-language shapes, used near the root when a text depth is requested.
pub fn text_shape(expr: &Expr) -> Option<Shape> {
    use NodeKind::*;
    let infix = |op: &'static str| vec![ShapeItem::Child(0), Macro(op), ShapeItem::Child(1)];
    let shape = match expr.kind() {
        ForAll | Exists
            if expr
                .child(0)
                .is_some_and(|t| matches!(t.kind(), LocalConstant | Constant)) =>
        {
            let (quantifier, separator) = match expr.kind() {
                ForAll => (r"\text_forall", r"\comma"),
                _ => (r"\text_exists", r"\text_such_that"),
            };
            vec![
                Macro(quantifier),
                Child(1),
                Macro(r"\text_in"),
                Child(0),
                Macro(separator),
                Child(2),
            ]
        }
        Implies => vec![Macro(r"\text_if"), Child(0), Macro(r"\text_then"), Child(1)],
        And => infix(r"\text_and"),
        Or => infix(r"\text_or"),
        Iff => infix(r"\text_iff"),
        Not => vec![Macro(r"\text_not"), Child(0)],
        Belongs => infix(r"\text_belongs"),
        Included => infix(r"\text_included"),
        _ => return None,
    };
    Some(shape)
}

/// Natural-language description of a type: "a subset of X".
pub fn type_text_shape(ty: &Expr) -> Option<Shape> {
    use NodeKind::*;
    let shape = match ty.kind() {
        Set => vec![Macro(r"\text_subset_of"), Child(0)],
        Function => vec![
            Macro(r"\text_function_from"),
            Child(0),
            Macro(r"\text_to"),
            Child(1),
        ],
        Sequence => vec![Macro(r"\text_sequence_in"), Child(1)],
        Prop => vec![Macro(r"\text_proposition")],
        Type => vec![Macro(r"\text_set")],
        LocalConstant | Constant => vec![Macro(r"\text_element_of"), Name],
        _ => return None,
    };
    Some(shape)
}

/// Shapes producing Lean source. Kinds with no Lean notation have no shape.
pub fn lean_shape(expr: &Expr) -> Option<Shape> {
    use NodeKind::*;
    let infix = |op: &str| vec![ShapeItem::Child(0), text(op), ShapeItem::Child(1)];
    let binder = |q: &str| {
        vec![
            text(q),
            ShapeItem::Child(1),
            text(" : "),
            ShapeItem::Child(0),
            text(", "),
            ShapeItem::Child(2),
        ]
    };
    let shape = match expr.kind() {
        And => infix(" ∧ "),
        Or => infix(" ∨ "),
        Not => vec![text("¬"), Child(0)],
        Implies => infix(" → "),
        Iff => infix(" ↔ "),
        True => vec![text("true")],
        False => vec![text("false")],
        ForAll => binder("∀ "),
        Exists => binder("∃ "),
        ExistsUnique => binder("∃! "),
        Lambda => vec![
            text("λ "),
            Child(1),
            text(" : "),
            Child(0),
            text(", "),
            Child(2),
        ],
        SetIntension => vec![
            text("{"),
            Child(1),
            text(" : "),
            Child(0),
            text(" | "),
            Child(2),
            text("}"),
        ],
        Belongs => infix(" ∈ "),
        Included => infix(" ⊆ "),
        Inter => infix(" ∩ "),
        Union => infix(" ∪ "),
        SetDiff => infix(" \\ "),
        SetComplement => {
            let last = expr.children().len().saturating_sub(1);
            vec![text("set.compl "), Child(last)]
        }
        SetEmpty => vec![text("∅")],
        SetImage => infix(" '' "),
        SetInverse => infix(" ⁻¹' "),
        Sum => infix(" + "),
        Diff => infix(" - "),
        Mult => infix(" * "),
        Div => infix(" / "),
        Power => infix(" ^ "),
        Minus => vec![text("-"), Child(0)],
        Number => vec![Value],
        Equal => infix(" = "),
        NotEqual => infix(" ≠ "),
        Less => infix(" < "),
        LessEq => infix(" ≤ "),
        Greater => infix(" > "),
        GreaterEq => infix(" ≥ "),
        Set => vec![text("set "), Child(0)],
        Function => infix(" → "),
        Type => vec![text("Type")],
        Prop => vec![text("Prop")],
        Composite => infix(" ∘ "),
        Application => {
            let mut shape = vec![];
            for index in 0..expr.children().len() {
                if index > 0 {
                    shape.push(text(" "));
                }
                shape.push(Child(index));
            }
            shape
        }
        LocalConstant | Constant | BoundVar => vec![Name],
        MetaVar => vec![text("_")],
        SetExtension | Sequence | SetFamily => return None,
    };
    Some(shape)
}

fn application(head: &Expr, var: &Expr) -> Expr {
    Expr::new(
        NodeKind::Application,
        Info::default(),
        vec![head.clone(), var.clone()],
        Some(Expr::prop()),
    )
}

/// `∀x ∈ X, x ∈ A ⇒ P(x)` shown as `∀x ∈ A, P(x)`, and the same for `∃` with `∧`.
fn bounded_quantifier(kind: NodeKind, connective: NodeKind) -> PatternShape {
    let ty = Expr::metavar(Some(Expr::universe()));
    let set = Expr::metavar(None);
    let pred = Expr::metavar(Some(Expr::function_type(ty.clone(), Expr::prop())));
    let var = Expr::bound_var("x", Some(ty.clone()));
    let guard = Expr::proposition(NodeKind::Belongs, vec![var.clone(), set.clone()]);
    let body = Expr::proposition(connective, vec![guard, application(&pred, &var)]);
    let pattern = Expr::binder(kind, &var, &body, Some(Expr::prop()));
    PatternShape {
        pattern,
        metavars: vec![ty, set, pred],
        shape: vec![
            Macro(quantifier_macro(kind)),
            Child(1),
            Macro(r"\in"),
            Descendant(vec![2, 0, 1]),
            Macro(r"\comma"),
            Descendant(vec![2, 1]),
        ],
        kind,
        bounded: true,
    }
}

fn negated(kind: NodeKind, op: &'static str, by_metavar: bool) -> PatternShape {
    let (a, b) = (Expr::metavar(None), Expr::metavar(None));
    let inner = Expr::proposition(kind, vec![a.clone(), b.clone()]);
    let pattern = Expr::proposition(NodeKind::Not, vec![inner]);
    let shape = if by_metavar {
        vec![Meta(0), Macro(op), Meta(1)]
    } else {
        vec![Descendant(vec![0, 0]), Macro(op), Descendant(vec![0, 1])]
    };
    PatternShape {
        pattern,
        metavars: vec![a, b],
        shape,
        kind,
        bounded: false,
    }
}

/// Notations recognised by pattern, tried before the generic shapes.
pub fn default_pattern_shapes() -> Vec<PatternShape> {
    vec![
        bounded_quantifier(NodeKind::ForAll, NodeKind::Implies),
        bounded_quantifier(NodeKind::Exists, NodeKind::And),
        negated(NodeKind::Belongs, r"\notin", true),
        negated(NodeKind::Equal, r"\neq", false),
    ]
}
