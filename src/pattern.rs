use std::iter::zip;

use crate::expr::{BinderTags, Expr, Id, Info};
use crate::node::NodeKind;

/// Bindings of metavariables made by successive matches. The pairs are kept
/// here rather than on the metavariables, so a pattern can be shared by several
/// contexts.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    metavars: Vec<Expr>,
    matched: Vec<Expr>,
}

impl MatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metavars(&self) -> &[Expr] {
        &self.metavars
    }

    pub fn matched(&self) -> &[Expr] {
        &self.matched
    }

    pub fn len(&self) -> usize {
        self.metavars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metavars.is_empty()
    }

    pub fn get(&self, metavar: &Expr) -> Option<&Expr> {
        let id = metavar.metavar_id()?;
        self.get_by_id(id)
    }

    fn get_by_id(&self, id: Id) -> Option<&Expr> {
        zip(&self.metavars, &self.matched)
            .find(|(metavar, _)| metavar.metavar_id() == Some(id))
            .map(|(_, expr)| expr)
    }

    pub fn bind(&mut self, metavar: Expr, expr: Expr) {
        self.metavars.push(metavar);
        self.matched.push(expr);
    }

    fn truncate(&mut self, len: usize) {
        self.metavars.truncate(len);
        self.matched.truncate(len);
    }

    /// Tries to match `expr` against `pattern`. On failure every binding made
    /// by this attempt is dropped.
    pub fn match_pattern(&mut self, pattern: &Expr, expr: &Expr) -> bool {
        let checkpoint = self.len();
        let mut tags = BinderTags::default();
        if self.match_help(pattern, expr, &mut tags) {
            true
        } else {
            self.truncate(checkpoint);
            false
        }
    }

    fn match_help(&mut self, pattern: &Expr, expr: &Expr, tags: &mut BinderTags) -> bool {
        if pattern.is_metavar() {
            return self.match_metavar(pattern, expr, tags);
        }
        let flexible_head = pattern.kind() == NodeKind::Application
            && pattern.child(0).is_some_and(Expr::is_metavar);
        let checkpoint = self.len();
        if self.match_structure(pattern, expr, tags) {
            return true;
        }
        self.truncate(checkpoint);
        if !flexible_head {
            return false;
        }
        let head = &pattern.children()[0];
        let ok = if self.get(head).is_some() {
            self.transport(pattern, tags).is_some_and(|e| e == *expr)
        } else {
            self.match_higher_order(pattern, expr, tags)
        };
        if !ok {
            self.truncate(checkpoint);
        }
        ok
    }

    fn match_structure(&mut self, pattern: &Expr, expr: &Expr, tags: &mut BinderTags) -> bool {
        if pattern.kind() != expr.kind() {
            return false;
        }
        match (pattern.bound_var_id(), expr.bound_var_id()) {
            (Some(a), Some(b)) => {
                let same = match (tags.left_tag(a), tags.right_tag(b)) {
                    (Some(x), Some(y)) => x == y,
                    (None, None) => a == b,
                    _ => false,
                };
                return same && self.match_types(pattern, expr, tags);
            }
            (None, None) => {}
            _ => return false,
        }
        if let (Some(a), Some(b)) = (pattern.metavar_id(), expr.metavar_id()) {
            return a == b;
        }
        if pattern.info().name != expr.info().name || pattern.info().value != expr.info().value {
            return false;
        }
        if !self.match_types(pattern, expr, tags) {
            return false;
        }
        let (p_len, e_len) = (pattern.children().len(), expr.children().len());
        if pattern.kind() == NodeKind::Application && 2 <= p_len && p_len < e_len {
            // APPLICATION(?F, x) against APPLICATION(f, a, x): ?F := f(a)
            let split = e_len - p_len + 1;
            let head = partial_application(&expr.children()[..split]);
            return self.match_help(&pattern.children()[0], &head, tags)
                && zip(&pattern.children()[1..], &expr.children()[split..])
                    .all(|(p, e)| self.match_help(p, e, tags));
        }
        if p_len != e_len {
            return false;
        }
        let tagged = tags.tag(pattern, expr);
        let ok = zip(pattern.children(), expr.children()).all(|(p, e)| self.match_help(p, e, tags));
        if tagged {
            tags.untag(pattern, expr);
        }
        ok
    }

    fn match_types(&mut self, pattern: &Expr, expr: &Expr, tags: &mut BinderTags) -> bool {
        match (pattern.math_type(), expr.math_type()) {
            (Some(p), Some(e)) => self.match_help(p, e, tags),
            _ => true,
        }
    }

    fn match_metavar(&mut self, metavar: &Expr, expr: &Expr, tags: &BinderTags) -> bool {
        if let Some(witness) = self.get(metavar) {
            return witness == expr;
        }
        // a witness may not capture a variable bound in the pattern
        if expr.contains(&|e: &Expr| e.bound_var_id().is_some_and(|id| tags.right_tag(id).is_some())) {
            return false;
        }
        let checkpoint = self.len();
        if !self.match_types(metavar, expr, &mut BinderTags::default()) {
            self.truncate(checkpoint);
            return false;
        }
        self.bind(metavar.clone(), expr.clone());
        true
    }

    /// `APPLICATION(?F, y₁, …, yₙ)` where the `yᵢ` are bound variables of the
    /// pattern paired with bound variables `xᵢ` of the expression: binds
    /// `?F := λx₁…xₙ, expr`.
    fn match_higher_order(&mut self, pattern: &Expr, expr: &Expr, tags: &BinderTags) -> bool {
        let (head, args) = match pattern.children().split_first() {
            Some(split) => split,
            None => return false,
        };
        let mut vars = vec![];
        for arg in args {
            let Some(var) = arg
                .bound_var_id()
                .and_then(|id| tags.left_tag(id))
                .and_then(|tag| tags.right_var(tag))
            else {
                return false;
            };
            vars.push(var.clone());
        }
        let mut body = expr.clone();
        for var in vars.iter().rev() {
            let fresh = var.fresh_bound_var();
            let abstracted = body.replace(&mut |e: &Expr| e.is_same_bound_var(var).then(|| fresh.clone()));
            let ty = match (fresh.math_type(), abstracted.math_type()) {
                (Some(domain), Some(codomain)) => {
                    Some(Expr::function_type(domain.clone(), codomain.clone()))
                }
                _ => None,
            };
            body = Expr::lambda(&fresh, &abstracted, ty);
        }
        self.match_metavar(head, &body, tags)
    }

    /// The pattern with its metavariables replaced and its bound variables
    /// moved to the expression side. `None` if a metavariable is unbound.
    fn transport(&self, pattern: &Expr, tags: &BinderTags) -> Option<Expr> {
        let mut complete = true;
        let result = pattern.replace(&mut |e: &Expr| {
            if e.is_metavar() {
                let witness = self.get(e).cloned();
                complete &= witness.is_some();
                return witness;
            }
            e.bound_var_id()
                .and_then(|id| tags.left_tag(id))
                .and_then(|tag| tags.right_var(tag))
                .cloned()
        });
        complete.then(|| result.beta_normalize())
    }

    /// Substitutes the bindings of this context into `pattern`. Unbound
    /// metavariables are left in place.
    pub fn instantiate(&self, pattern: &Expr) -> Expr {
        pattern
            .replace_everywhere(&mut |e: &Expr| {
                if e.is_metavar() {
                    self.get(e).cloned()
                } else {
                    None
                }
            })
            .beta_normalize()
    }
}

/// `f(a₁)…(aₙ)`, typed whenever the types of the function allow it.
fn partial_application(children: &[Expr]) -> Expr {
    let Some((head, args)) = children.split_first() else {
        return Expr::new(NodeKind::Application, Info::default(), vec![], None);
    };
    let mut result = head.clone();
    for arg in args {
        result = match Expr::application(&result, arg) {
            Ok(applied) => applied,
            Err(_) => Expr::new(
                NodeKind::Application,
                Info::default(),
                vec![result, arg.clone()],
                None,
            ),
        };
    }
    result
}
