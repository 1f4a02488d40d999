use thiserror::Error;

use crate::expr::{Expr, Info};
use crate::node::NodeKind;
use crate::pattern::MatchContext;
use crate::session::Session;

/// Rewrites applied at a single node before giving up.
const MAX_UNFOLDINGS: usize = 64;

#[derive(Debug, Clone, Error)]
pub enum DefinitionError {
    #[error("definition {name} is not an equivalence or an equality: {statement}")]
    NotAnEquivalence { name: String, statement: String },
}

/// A definition `∀x₁…xₙ, A ⇔ B` read as the pair of patterns `(A, B)` over the
/// metavariables `x₁…xₙ`.
#[derive(Debug, Clone)]
pub struct ImplicitDefinition {
    name: String,
    metavars: Vec<Expr>,
    lhs: Expr,
    rhs: Expr,
}

impl ImplicitDefinition {
    pub fn new(name: impl Into<String>, metavars: Vec<Expr>, lhs: Expr, rhs: Expr) -> Self {
        Self {
            name: name.into(),
            metavars,
            lhs,
            rhs,
        }
    }

    pub fn from_statement(name: impl Into<String>, statement: &Expr) -> Result<Self, DefinitionError> {
        let name = name.into();
        let mut metavars = vec![];
        let mut current = statement.clone();
        while current.kind() == NodeKind::ForAll && current.children().len() == 3 {
            let var = current.children()[1].clone();
            let metavar = Expr::metavar(Some(current.children()[0].clone()));
            current = current.children()[2].substitute_everywhere(&var, &metavar);
            metavars.push(metavar);
        }
        match current.kind() {
            NodeKind::Iff | NodeKind::Equal if current.children().len() == 2 => Ok(Self {
                name,
                metavars,
                lhs: current.children()[0].clone(),
                rhs: current.children()[1].clone(),
            }),
            _ => Err(DefinitionError::NotAnEquivalence {
                name,
                statement: current.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metavars(&self) -> &[Expr] {
        &self.metavars
    }

    pub fn lhs(&self) -> &Expr {
        &self.lhs
    }

    pub fn rhs(&self) -> &Expr {
        &self.rhs
    }

    /// The instantiated right-hand side if `expr` is an instance of the left one.
    pub fn unfold(&self, expr: &Expr) -> Option<Expr> {
        let mut ctx = MatchContext::new();
        ctx.match_pattern(&self.lhs, expr)
            .then(|| ctx.instantiate(&self.rhs))
    }
}

/// The most recent successful implicit use of a definition.
#[derive(Debug, Clone)]
pub struct ImplicitUse {
    pub definition: String,
    pub rhs: Expr,
}

/// Outcome of a test run through implicit definitions. `rhs` is set when the
/// test succeeded on an unfolded form rather than on the expression itself.
#[derive(Debug, Clone)]
pub struct ImplicitTest {
    pub matched: bool,
    pub rhs: Option<Expr>,
    pub definition: Option<String>,
}

impl ImplicitTest {
    fn literal(matched: bool) -> Self {
        Self {
            matched,
            rhs: None,
            definition: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NegationPush {
    /// Bodies of negations that a negation-pushing definition could rewrite.
    pub simplifiable: Vec<Expr>,
    pub result: Expr,
}

macro_rules! kind_tests {
    ($($(#[$attr:meta])* $name:ident => $($kind:ident)|+;)*) => {
        impl Session {
            $(
                $(#[$attr])*
                pub fn $name(&self, expr: &Expr) -> ImplicitTest {
                    self.test_implicitly(expr, |e| matches!(e.kind(), $(NodeKind::$kind)|+))
                }
            )*
        }
    };
}

kind_tests! {
    is_and => And;
    is_or => Or;
    is_not => Not;
    is_implication => Implies;
    is_iff => Iff;
    is_for_all => ForAll;
    is_exists => Exists | ExistsUnique;
    is_exists_unique => ExistsUnique;
    is_equality => Equal;
    is_belongs => Belongs;
    is_included => Included;
    /// `<`, `≤`, `>`, `≥` and `≠`.
    is_inequality => Less | LessEq | Greater | GreaterEq | NotEqual;
}

impl Session {
    /// Runs `test` on `expr`, then, if allowed, on the unfolding of `expr` by
    /// each registered definition in turn.
    pub fn test_implicitly(&self, expr: &Expr, test: impl Fn(&Expr) -> bool) -> ImplicitTest {
        if test(expr) {
            return ImplicitTest::literal(true);
        }
        if !self.config().allow_implicit_use_of_definitions {
            return ImplicitTest::literal(false);
        }
        for definition in self.definitions() {
            let Some(rhs) = definition.unfold(expr) else {
                continue;
            };
            if test(&rhs) {
                log::debug!("implicit use of {} on {}", definition.name(), expr);
                self.record_implicit_use(ImplicitUse {
                    definition: definition.name().to_owned(),
                    rhs: rhs.clone(),
                });
                return ImplicitTest {
                    matched: true,
                    rhs: Some(rhs),
                    definition: Some(definition.name().to_owned()),
                };
            }
        }
        ImplicitTest::literal(false)
    }

    /// Unfolds registered definitions everywhere in `expr`, top-down, using the
    /// first matching definition at each node.
    pub fn unfold_implicit_definition_recursively(&self, expr: &Expr) -> Expr {
        if !self.config().allow_implicit_use_of_definitions {
            return expr.clone();
        }
        unfold_with(expr, self.definitions())
    }

    /// Pushes negations inside using the built-in negation definitions. The
    /// expression is returned unchanged when implicit use is disabled.
    pub fn push_negations(&self, expr: &Expr) -> NegationPush {
        let definitions = negation_definitions();
        let mut simplifiable = vec![];
        collect_simplifiable(expr, &definitions, &mut simplifiable);
        let result = if self.config().allow_implicit_use_of_definitions {
            unfold_with(expr, &definitions)
        } else {
            expr.clone()
        };
        NegationPush {
            simplifiable,
            result,
        }
    }
}

fn unfold_with(expr: &Expr, definitions: &[ImplicitDefinition]) -> Expr {
    let mut current = expr.clone();
    for _ in 0..MAX_UNFOLDINGS {
        let Some(next) = definitions.iter().find_map(|d| d.unfold(&current)) else {
            break;
        };
        current = next;
    }
    if current.children().is_empty() {
        return current;
    }
    let children = current
        .children()
        .iter()
        .map(|child| unfold_with(child, definitions))
        .collect();
    current.rebuild(children)
}

fn collect_simplifiable(expr: &Expr, definitions: &[ImplicitDefinition], out: &mut Vec<Expr>) {
    if expr.kind() == NodeKind::Not && definitions.iter().any(|d| d.unfold(expr).is_some()) {
        if let Some(body) = expr.child(0) {
            out.push(body.clone());
        }
    }
    for child in expr.children() {
        collect_simplifiable(child, definitions, out);
    }
}

fn prop_meta() -> Expr {
    Expr::metavar(Some(Expr::prop()))
}

fn not(p: &Expr) -> Expr {
    Expr::proposition(NodeKind::Not, vec![p.clone()])
}

fn binary(kind: NodeKind, p: &Expr, q: &Expr) -> Expr {
    Expr::proposition(kind, vec![p.clone(), q.clone()])
}

/// `Q(?P, y) ⇔ …` where `?P` is a predicate over the type `?X`.
fn quantified_negation(outer: NodeKind, inner: NodeKind) -> ImplicitDefinition {
    let ty = Expr::metavar(Some(Expr::universe()));
    let pred = Expr::metavar(Some(Expr::function_type(ty.clone(), Expr::prop())));
    let apply = |var: &Expr| {
        Expr::new(
            NodeKind::Application,
            Info::default(),
            vec![pred.clone(), var.clone()],
            Some(Expr::prop()),
        )
    };
    let y = Expr::bound_var("x", Some(ty.clone()));
    let lhs = not(&Expr::binder(outer, &y, &apply(&y), Some(Expr::prop())));
    let z = Expr::bound_var("x", Some(ty.clone()));
    let rhs = Expr::binder(inner, &z, &not(&apply(&z)), Some(Expr::prop()));
    let name = match outer {
        NodeKind::ForAll => "not_forall",
        _ => "not_exists",
    };
    ImplicitDefinition::new(name, vec![ty, pred], lhs, rhs)
}

/// The definitions pushing a negation one level down.
pub fn negation_definitions() -> Vec<ImplicitDefinition> {
    let (p, q) = (prop_meta(), prop_meta());
    vec![
        ImplicitDefinition::new("not_not", vec![p.clone()], not(&not(&p)), p.clone()),
        ImplicitDefinition::new(
            "not_and",
            vec![p.clone(), q.clone()],
            not(&binary(NodeKind::And, &p, &q)),
            binary(NodeKind::Implies, &p, &not(&q)),
        ),
        ImplicitDefinition::new(
            "not_or",
            vec![p.clone(), q.clone()],
            not(&binary(NodeKind::Or, &p, &q)),
            binary(NodeKind::And, &not(&p), &not(&q)),
        ),
        ImplicitDefinition::new(
            "not_implies",
            vec![p.clone(), q.clone()],
            not(&binary(NodeKind::Implies, &p, &q)),
            binary(NodeKind::And, &p, &not(&q)),
        ),
        quantified_negation(NodeKind::ForAll, NodeKind::Exists),
        quantified_negation(NodeKind::Exists, NodeKind::ForAll),
    ]
}
