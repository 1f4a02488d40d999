use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use crate::config::Config;
use crate::display::shape::{default_pattern_shapes, PatternShape};
use crate::expr::{Expr, Info};
use crate::implicit::{ImplicitDefinition, ImplicitUse};
use crate::node::NodeKind;

/// Number sets, ordered by inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumberSet {
    Natural,
    Integer,
    Rational,
    Real,
}

impl NumberSet {
    pub const ALL: [NumberSet; 4] = [
        NumberSet::Natural,
        NumberSet::Integer,
        NumberSet::Rational,
        NumberSet::Real,
    ];

    pub fn from_name(name: &str) -> Option<NumberSet> {
        let set = match name {
            "ℕ" | "nat" | "ℕ.ℕ" => NumberSet::Natural,
            "ℤ" | "int" => NumberSet::Integer,
            "ℚ" | "rat" => NumberSet::Rational,
            "ℝ" | "real" => NumberSet::Real,
            _ => return None,
        };
        Some(set)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            NumberSet::Natural => "ℕ",
            NumberSet::Integer => "ℤ",
            NumberSet::Rational => "ℚ",
            NumberSet::Real => "ℝ",
        }
    }

    /// The smallest number set able to hold a numeral literal.
    pub fn of_literal(value: &str) -> NumberSet {
        let value = value.trim();
        if value.contains('.') || value.contains('/') {
            NumberSet::Rational
        } else if value.starts_with('-') {
            NumberSet::Integer
        } else {
            NumberSet::Natural
        }
    }
}

impl Display for NumberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Everything that lives as long as a prover session: interning tables,
/// definitions, configuration and display rules.
///
/// Expressions are built on a single thread; the session is not `Sync`.
pub struct Session {
    config: Config,
    interned: HashMap<String, Expr>,
    number_sets: BTreeSet<NumberSet>,
    number_set_types: HashMap<NumberSet, Expr>,
    definitions: Vec<ImplicitDefinition>,
    last_implicit_use: RefCell<Option<ImplicitUse>>,
    property_counter: usize,
    used_properties: HashSet<String>,
    display_rules: Vec<PatternShape>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            interned: HashMap::new(),
            number_sets: BTreeSet::new(),
            number_set_types: HashMap::new(),
            definitions: vec![],
            last_implicit_use: RefCell::new(None),
            property_counter: 0,
            used_properties: HashSet::new(),
            display_rules: default_pattern_shapes(),
        }
    }

    /// Forgets every identifier seen so far. Definitions, configuration and
    /// display rules are kept.
    pub fn reset(&mut self) {
        log::debug!("resetting session ({} interned nodes)", self.interned.len());
        self.interned.clear();
        self.number_sets.clear();
        self.number_set_types.clear();
        self.last_implicit_use.replace(None);
        self.property_counter = 0;
        self.used_properties.clear();
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn display_rules(&self) -> &[PatternShape] {
        &self.display_rules
    }

    pub fn interned(&self, identifier: &str) -> Option<&Expr> {
        self.interned.get(identifier)
    }

    pub fn number_sets(&self) -> impl Iterator<Item = NumberSet> + '_ {
        self.number_sets.iter().copied()
    }

    /// Builds a node from the output of the prover. Nodes carrying an identifier
    /// are interned: a second node with the same identifier is the first one.
    pub fn from_info_and_children(
        &mut self,
        kind: NodeKind,
        info: Info,
        children: Vec<Expr>,
        math_type: Option<Expr>,
    ) -> Expr {
        if let Some(expr) = info
            .identifier
            .as_deref()
            .and_then(|identifier| self.interned.get(identifier))
        {
            return expr.clone();
        }
        let number_set = info.name.as_deref().and_then(NumberSet::from_name);
        let expr = match kind {
            NodeKind::BoundVar => Expr::bound_var_with_info(info.clone(), math_type),
            kind if kind.is_binder() => self.binder_from_children(kind, info.clone(), children, math_type),
            kind => {
                let children = Self::rewrite_sequences(kind, children);
                Expr::new(kind, info.clone(), children, math_type)
            }
        };
        if let Some(set) = number_set {
            if self.number_sets.insert(set) {
                log::debug!("number set {set} in use");
            }
            self.number_set_types.entry(set).or_insert_with(|| expr.clone());
        }
        if let Some(identifier) = info.identifier {
            self.interned.insert(identifier, expr.clone());
        }
        expr
    }

    /// The prover emits the variable of a binder as a local constant, shared by
    /// its occurrences in the body. It becomes a bound variable here.
    fn binder_from_children(
        &mut self,
        kind: NodeKind,
        info: Info,
        children: Vec<Expr>,
        math_type: Option<Expr>,
    ) -> Expr {
        if children.len() != 3 {
            log::warn!("binder {kind} with {} children", children.len());
            return Expr::new(kind, info, children, math_type);
        }
        let (ty, var, body) = (&children[0], &children[1], &children[2]);
        // A bound variable still owned by another binder gets a copy of its own.
        if var.is_bound_var() && var.parent().is_none() {
            return Expr::new(kind, info, children, math_type);
        }
        let bound = Expr::bound_var_with_info(var.info().clone(), var.math_type().cloned());
        let body = body.replace(&mut |e: &Expr| {
            let occurs = if var.is_bound_var() { e.is_same_bound_var(var) } else { e.ptr_eq(var) };
            occurs.then(|| bound.clone())
        });
        // The scope of the variable ends here: a later node reusing the
        // identifier is another variable.
        if let Some(identifier) = &var.info().identifier {
            self.interned.remove(identifier);
        }
        Expr::new(kind, info, vec![ty.clone(), bound, body], math_type)
    }

    /// A sequence `u` appearing as an argument of anything but an application or
    /// a lambda becomes `λn, u(n)`.
    fn rewrite_sequences(kind: NodeKind, children: Vec<Expr>) -> Vec<Expr> {
        if matches!(kind, NodeKind::Application | NodeKind::Lambda) || kind.is_function_type() {
            return children;
        }
        children
            .into_iter()
            .enumerate()
            .map(|(index, child)| {
                if index == 0 && kind.is_binder() {
                    return child;
                }
                Self::sequence_as_lambda(&child).unwrap_or(child)
            })
            .collect()
    }

    fn sequence_as_lambda(child: &Expr) -> Option<Expr> {
        if child.is_bound_var() || child.kind() == NodeKind::Lambda {
            return None;
        }
        let ty = child.math_type()?;
        let var_name = match ty.kind() {
            NodeKind::Sequence => "n",
            NodeKind::SetFamily => "i",
            _ => return None,
        };
        let var = Expr::bound_var(var_name, ty.domain());
        let body = Expr::application(child, &var).ok()?;
        Some(Expr::lambda(&var, &body, Some(ty.clone())))
    }

    /// The type of a numeral: the smallest number set in use that can hold it.
    pub fn smallest_number_set(&self, value: &str) -> NumberSet {
        let needed = NumberSet::of_literal(value);
        self.number_sets
            .iter()
            .copied()
            .find(|set| *set >= needed)
            .unwrap_or(needed)
    }

    /// The expression standing for a number set, reusing the prover's node when
    /// the set was seen.
    pub fn number_set_type(&self, set: NumberSet) -> Expr {
        self.number_set_types
            .get(&set)
            .cloned()
            .unwrap_or_else(|| Expr::constant(set.symbol(), Some(Expr::universe())))
    }

    pub fn fresh_property_name(&mut self) -> String {
        self.property_counter += 1;
        format!("H{}", subscript(self.property_counter))
    }

    pub fn mark_property_used(&mut self, name: impl Into<String>) {
        self.used_properties.insert(name.into());
    }

    pub fn is_property_used(&self, name: &str) -> bool {
        self.used_properties.contains(name)
    }

    pub fn add_definition(&mut self, definition: ImplicitDefinition) {
        log::debug!("registering implicit definition {}", definition.name());
        self.definitions.push(definition);
    }

    pub fn definitions(&self) -> &[ImplicitDefinition] {
        &self.definitions
    }

    pub fn last_implicit_use(&self) -> Option<ImplicitUse> {
        self.last_implicit_use.borrow().clone()
    }

    pub(crate) fn record_implicit_use(&self, implicit_use: ImplicitUse) {
        self.last_implicit_use.replace(Some(implicit_use));
    }
}

/// `12` ~> `₁₂`
pub fn subscript(n: usize) -> String {
    n.to_string()
        .chars()
        .map(|c| match c {
            '0' => '₀',
            '1' => '₁',
            '2' => '₂',
            '3' => '₃',
            '4' => '₄',
            '5' => '₅',
            '6' => '₆',
            '7' => '₇',
            '8' => '₈',
            _ => '₉',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, identifier: &str) -> Info {
        Info::named(name).with_identifier(identifier)
    }

    #[test]
    fn identifiers_are_interned() {
        let mut session = Session::default();
        let ty = session.from_info_and_children(NodeKind::Type, Info::default(), vec![], None);
        let a = session.from_info_and_children(
            NodeKind::LocalConstant,
            info("X", "0.1"),
            vec![],
            Some(ty.clone()),
        );
        let b = session.from_info_and_children(NodeKind::LocalConstant, info("X", "0.1"), vec![], Some(ty));
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn reset_forgets_identifiers() {
        let mut session = Session::default();
        let a = session.from_info_and_children(NodeKind::LocalConstant, info("X", "0.1"), vec![], None);
        session.reset();
        let b = session.from_info_and_children(NodeKind::LocalConstant, info("X", "0.1"), vec![], None);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn number_sets_are_collected_in_order() {
        let mut session = Session::default();
        for name in ["ℝ", "ℕ", "ℝ"] {
            session.from_info_and_children(
                NodeKind::Constant,
                Info::named(name),
                vec![],
                Some(Expr::universe()),
            );
        }
        let sets: Vec<_> = session.number_sets().collect();
        assert_eq!(sets, vec![NumberSet::Natural, NumberSet::Real]);
        assert_eq!(session.smallest_number_set("3"), NumberSet::Natural);
        assert_eq!(session.smallest_number_set("-3"), NumberSet::Real);
        assert_eq!(session.smallest_number_set("0.5"), NumberSet::Real);
    }

    #[test]
    fn binder_variable_becomes_bound() {
        let mut session = Session::default();
        let x_type = session.from_info_and_children(
            NodeKind::LocalConstant,
            info("X", "0.1"),
            vec![],
            Some(Expr::universe()),
        );
        let x = session.from_info_and_children(
            NodeKind::LocalConstant,
            info("x", "0.2"),
            vec![],
            Some(x_type.clone()),
        );
        let body = session.from_info_and_children(
            NodeKind::Equal,
            Info::default(),
            vec![x.clone(), x.clone()],
            Some(Expr::prop()),
        );
        let forall = session.from_info_and_children(
            NodeKind::ForAll,
            Info::named("x"),
            vec![x_type, x, body],
            Some(Expr::prop()),
        );
        let var = &forall.children()[1];
        assert!(var.is_bound_var());
        assert!(var.parent().is_some_and(|parent| parent.ptr_eq(&forall)));
        let body = &forall.children()[2];
        assert!(body.children().iter().all(|c| c.is_same_bound_var(var)));
        assert!(session.interned("0.2").is_none());
    }

    #[test]
    fn sequence_argument_becomes_lambda() {
        let mut session = Session::default();
        let nat = Expr::constant("ℕ", Some(Expr::universe()));
        let real = Expr::constant("ℝ", Some(Expr::universe()));
        let seq_type = Expr::new(
            NodeKind::Sequence,
            Info::default(),
            vec![nat, real.clone()],
            Some(Expr::universe()),
        );
        let u = Expr::local_constant("u", Some(seq_type));
        let v = Expr::local_constant("v", Some(u.math_type().cloned().unwrap()));
        let eq = session.from_info_and_children(
            NodeKind::Equal,
            Info::default(),
            vec![u, v],
            Some(Expr::prop()),
        );
        assert_eq!(eq.children()[0].kind(), NodeKind::Lambda);
        assert_eq!(eq.children()[1].kind(), NodeKind::Lambda);
        assert_eq!(eq.children()[0].children()[2].to_string(), "APPLICATION(u, n)");
    }

    #[test]
    fn property_names_are_numbered() {
        let mut session = Session::default();
        assert_eq!(session.fresh_property_name(), "H₁");
        assert_eq!(session.fresh_property_name(), "H₂");
        session.reset();
        assert_eq!(session.fresh_property_name(), "H₁");
    }
}
