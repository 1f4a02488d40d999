use std::collections::HashMap;

use thiserror::Error;

use crate::expr::Expr;
use crate::goal::{is_property, Goal};
use crate::node::NodeKind;
use crate::session::{subscript, Session};

const MAX_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, Error)]
#[error("cannot find a fresh name for {variable} after {attempts} attempts")]
pub struct NameExhaustion {
    pub variable: String,
    pub attempts: usize,
}

/// Names already taken, with the type of the variable holding them.
#[derive(Debug, Default)]
struct Taken {
    names: HashMap<String, Option<Expr>>,
}

impl Taken {
    fn insert(&mut self, var: &Expr) {
        self.names
            .insert(var.display_name(), var.math_type().cloned());
    }

    fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Whether `name` is held by a variable of the same type as `var`.
    fn held_by_same_type(&self, name: &str, var: &Expr) -> bool {
        match self.names.get(name) {
            Some(Some(ty)) => var.math_type().is_some_and(|t| t == ty),
            _ => false,
        }
    }
}

fn number_hints(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "ℕ" | "ℤ" | "nat" | "int" => Some(&["n", "m", "p", "q", "k", "l"]),
        "ℚ" | "ℝ" | "rat" | "real" => Some(&["x", "y", "z", "t", "u", "v"]),
        _ => None,
    }
}

/// Names a reader expects for a variable of the given type.
fn standard_hints(math_type: Option<&Expr>) -> &'static [&'static str] {
    let Some(ty) = math_type else {
        return &["x", "y", "z"];
    };
    match ty.kind() {
        NodeKind::Set => &["A", "B", "C", "E", "F"],
        NodeKind::Function => &["f", "g", "h"],
        NodeKind::Sequence => &["u", "v", "w"],
        NodeKind::SetFamily => &["E", "F", "G"],
        NodeKind::Prop => &["P", "Q", "R"],
        NodeKind::Type => &["X", "Y", "Z"],
        NodeKind::LocalConstant | NodeKind::Constant => ty
            .name()
            .and_then(number_hints)
            .unwrap_or(&["x", "y", "z"]),
        _ => &["x", "y", "z"],
    }
}

/// Hints in order of preference: previous display name, prover name, the first
/// letter of the type, then the standard table.
fn hints(var: &Expr) -> Vec<String> {
    let mut hints: Vec<String> = vec![];
    let mut push = |hint: String| {
        if !hint.is_empty() && !hints.contains(&hint) {
            hints.push(hint);
        }
    };
    if let Some(old) = var.old_name() {
        push(old);
    }
    if let Some(lean) = var.lean_name().filter(|name| is_readable(name)) {
        push(lean.to_owned());
    }
    if let Some(letter) = var
        .math_type()
        .filter(|t| matches!(t.kind(), NodeKind::LocalConstant | NodeKind::Constant))
        .and_then(|t| t.name())
        .and_then(|name| name.chars().next())
        .filter(char::is_ascii_alphabetic)
    {
        push(letter.to_ascii_lowercase().to_string());
    }
    for hint in standard_hints(var.math_type()) {
        push((*hint).to_owned());
    }
    hints
}

/// Prover-generated names such as `_x_1` or `ᾰ` are not shown to a reader.
fn is_readable(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_') && !name.contains('.') && !name.contains('ᾰ')
}

impl Session {
    fn candidates(&self, var: &Expr, taken: &Taken) -> Vec<String> {
        let config = self.config();
        let hints = hints(var);
        let mut candidates = hints.clone();
        if config.use_primes_for_variables_names {
            for hint in &hints {
                if taken.held_by_same_type(hint, var) {
                    candidates.push(format!("{hint}'"));
                    if config.use_seconds_for_variables_names {
                        candidates.push(format!("{hint}''"));
                    }
                }
            }
        }
        let base = hints.first().cloned().unwrap_or_else(|| "x".to_owned());
        let mut index = 0;
        while candidates.len() < MAX_ATTEMPTS {
            if config.use_indices_for_dummy_variables {
                candidates.push(format!("{base}{}", subscript(index)));
            } else {
                candidates.push(format!("{base}{index}"));
            }
            index += 1;
        }
        candidates
    }

    /// Gives every bound variable of `expr` a display name. `globals` are the
    /// objects of the context; `soft` names are used only when nothing else
    /// is available.
    pub fn name_bound_vars(
        &self,
        expr: &Expr,
        globals: &[Expr],
        soft: &[String],
    ) -> Result<(), NameExhaustion> {
        let config = self.config();
        expr.mark_local_contexts();
        let mut named_here = Taken::default();
        for var in expr.bound_vars() {
            let mut taken = Taken::default();
            for outer in var.local_context() {
                taken.insert(&outer);
            }
            let body = var.parent().and_then(|binder| binder.child(2).cloned());
            for global in globals {
                let name = global.display_name();
                let occurs = body.as_ref().is_some_and(|body| {
                    body.contains(&|e: &Expr| !e.is_bound_var() && e.name() == Some(name.as_str()))
                });
                if config.do_not_name_dummy_vars_as_global_vars || occurs {
                    taken.insert(global);
                }
            }
            if config.do_not_name_dummy_vars_as_dummy_vars_in_one_prop {
                for (name, ty) in &named_here.names {
                    taken.names.entry(name.clone()).or_insert_with(|| ty.clone());
                }
            }
            let candidates = self.candidates(&var, &taken);
            let name = candidates
                .iter()
                .find(|name| !taken.contains(name) && !soft.contains(name))
                .or_else(|| candidates.iter().find(|name| !taken.contains(name)))
                .cloned()
                .ok_or_else(|| NameExhaustion {
                    variable: var.display_name(),
                    attempts: candidates.len(),
                })?;
            log::trace!("naming {} as {}", var.lean_name().unwrap_or("?"), name);
            var.set_display_name(name);
            named_here.insert(&var);
        }
        Ok(())
    }

    /// Names the bound variables of the context and of the target of `goal`.
    /// The variables the target will introduce are avoided where possible.
    pub fn name_goal(&self, goal: &Goal) -> Result<(), NameExhaustion> {
        let globals: Vec<Expr> = goal
            .context
            .iter()
            .filter(|entry| !is_property(entry))
            .cloned()
            .collect();
        let mut future_globals = vec![];
        if let Some(target) = goal.target.math_type() {
            self.name_bound_vars(target, &globals, &[])?;
            let mut current = target.clone();
            while current.kind() == NodeKind::ForAll {
                let Some(var) = current.child(1).cloned() else {
                    break;
                };
                future_globals.push(var.display_name());
                let Some(body) = current.child(2).cloned() else {
                    break;
                };
                current = body;
            }
        }
        for entry in &goal.context {
            if let Some(ty) = entry.math_type() {
                self.name_bound_vars(ty, &globals, &future_globals)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn set_x() -> Expr {
        Expr::local_constant("X", Some(Expr::universe()))
    }

    fn forall_eq(var_name: &str, inner_name: &str) -> (Expr, Expr, Expr) {
        let x = Expr::bound_var(var_name, Some(set_x()));
        let y = Expr::bound_var(inner_name, Some(set_x()));
        let body = Expr::proposition(NodeKind::Equal, vec![x.clone(), y.clone()]);
        let inner = Expr::binder(NodeKind::Exists, &y, &body, Some(Expr::prop()));
        let outer = Expr::binder(NodeKind::ForAll, &x, &inner, Some(Expr::prop()));
        (outer, x, y)
    }

    #[test]
    fn nested_variables_get_distinct_names() {
        let session = Session::default();
        let (expr, x, y) = forall_eq("_a", "_a");
        session.name_bound_vars(&expr, &[], &[]).unwrap();
        assert_eq!(x.display_name(), "x");
        assert_eq!(y.display_name(), "y");
    }

    #[test]
    fn global_names_are_avoided() {
        let session = Session::default();
        let global = Expr::local_constant("x", Some(set_x()));
        let (expr, x, y) = forall_eq("x", "y");
        session.name_bound_vars(&expr, &[global], &[]).unwrap();
        assert_ne!(x.display_name(), "x");
        assert_ne!(y.display_name(), "x");
        assert_ne!(x.display_name(), y.display_name());
    }

    #[test]
    fn primes_require_same_type() {
        let session = Session::new(Config {
            do_not_name_dummy_vars_as_dummy_vars_in_one_prop: true,
            ..Default::default()
        });
        let globals: Vec<Expr> = ["x", "y", "z"]
            .iter()
            .map(|name| Expr::local_constant(*name, Some(set_x())))
            .collect();
        let var = Expr::bound_var("x", Some(set_x()));
        let expr = Expr::binder(
            NodeKind::ForAll,
            &var,
            &Expr::proposition(NodeKind::Equal, vec![var.clone(), var.clone()]),
            Some(Expr::prop()),
        );
        session.name_bound_vars(&expr, &globals, &[]).unwrap();
        assert_eq!(var.display_name(), "x'");

        let other = Expr::local_constant("Y", Some(Expr::universe()));
        let globals: Vec<Expr> = ["x", "y", "z"]
            .iter()
            .map(|name| Expr::local_constant(*name, Some(other.clone())))
            .collect();
        session.name_bound_vars(&expr, &globals, &[]).unwrap();
        assert_eq!(var.display_name(), "x₀");
    }

    #[test]
    fn indices_can_be_plain_digits() {
        let session = Session::new(Config {
            use_primes_for_variables_names: false,
            use_indices_for_dummy_variables: false,
            ..Default::default()
        });
        let globals: Vec<Expr> = ["x", "y", "z"]
            .iter()
            .map(|name| Expr::local_constant(*name, Some(set_x())))
            .collect();
        let var = Expr::bound_var("x", Some(set_x()));
        let expr = Expr::binder(NodeKind::ForAll, &var, &var, Some(Expr::prop()));
        session.name_bound_vars(&expr, &globals, &[]).unwrap();
        assert_eq!(var.display_name(), "x0");
    }

    #[test]
    fn old_name_is_preferred() {
        let session = Session::default();
        let (expr, x, _) = forall_eq("x", "y");
        x.set_old_name(Some("t".to_owned()));
        session.name_bound_vars(&expr, &[], &[]).unwrap();
        assert_eq!(x.display_name(), "t");
    }

    #[test]
    fn soft_names_are_avoided_when_possible() {
        let session = Session::default();
        let (expr, x, _) = forall_eq("x", "y");
        session
            .name_bound_vars(&expr, &[], &["x".to_owned()])
            .unwrap();
        assert_ne!(x.display_name(), "x");
    }

    #[test]
    fn standard_hints_follow_the_type() {
        let session = Session::default();
        let nat = Expr::constant("ℕ", Some(Expr::universe()));
        let n = Expr::bound_var("_n", Some(nat));
        let f = Expr::bound_var(
            "_f",
            Some(Expr::function_type(set_x(), set_x())),
        );
        let body = Expr::proposition(NodeKind::Equal, vec![f.clone(), f.clone()]);
        let inner = Expr::binder(NodeKind::Exists, &f, &body, Some(Expr::prop()));
        let expr = Expr::binder(NodeKind::ForAll, &n, &inner, Some(Expr::prop()));
        session.name_bound_vars(&expr, &[], &[]).unwrap();
        assert_eq!(n.display_name(), "n");
        assert_eq!(f.display_name(), "f");
    }
}
