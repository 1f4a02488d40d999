use std::fmt::Display;

use easy_ext::ext;
use thiserror::Error;

use crate::expr::Expr;

/// An entry of a context is a property when its type is a proposition.
pub fn is_property(entry: &Expr) -> bool {
    entry.math_type().is_some_and(Expr::is_prop)
}

#[ext(ContextExt)]
pub impl [Expr] {
    fn display_names(&self) -> Vec<String> {
        self.iter().map(Expr::display_name).collect()
    }

    fn find_named(&self, name: &str) -> Option<&Expr> {
        self.iter().find(|entry| entry.display_name() == name)
    }

    fn objects(&self) -> Vec<Expr> {
        self.iter().filter(|e| !is_property(e)).cloned().collect()
    }

    fn properties(&self) -> Vec<Expr> {
        self.iter().filter(|e| is_property(e)).cloned().collect()
    }
}

/// A context and a target. Context entries and the target are named terms whose
/// math type is what the reader sees.
#[derive(Debug, Clone)]
pub struct Goal {
    pub context: Vec<Expr>,
    pub target: Expr,
}

impl Goal {
    pub fn new(context: Vec<Expr>, target: Expr) -> Self {
        Self { context, target }
    }

    pub fn compare(&self, old: &Goal) -> GoalDiff {
        compare(self, old)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProofStateError {
    #[error("a proof state needs at least one goal")]
    NoGoal,
}

/// Goals still to be proved. The first one is the active goal.
#[derive(Debug, Clone)]
pub struct ProofState {
    goals: Vec<Goal>,
}

impl ProofState {
    pub fn new(goals: Vec<Goal>) -> Result<Self, ProofStateError> {
        if goals.is_empty() {
            return Err(ProofStateError::NoGoal);
        }
        Ok(Self { goals })
    }

    pub fn main_goal(&self) -> &Goal {
        &self.goals[0]
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    New,
    Unchanged,
    Modified,
}

impl Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tag::New => "+",
            Tag::Unchanged => "=",
            Tag::Modified => "≠",
        };
        write!(f, "{s}")
    }
}

/// The new context reordered along the old one, with a tag per entry.
#[derive(Debug, Clone)]
pub struct GoalDiff {
    pub context: Vec<Expr>,
    pub tags: Vec<Tag>,
    pub target_tag: Tag,
}

fn same_type(new: &Expr, old: &Expr) -> bool {
    match (new.math_type(), old.math_type()) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn tag(new: &Expr, old: &Expr) -> Tag {
    if same_type(new, old) {
        Tag::Unchanged
    } else {
        Tag::Modified
    }
}

/// Entries of `new` take the slot of the old entry with the same name; the
/// others come last, tagged as new.
pub fn compare(new: &Goal, old: &Goal) -> GoalDiff {
    let mut slots: Vec<Option<(Expr, Tag)>> = vec![None; old.context.len()];
    let mut appended = vec![];
    for entry in &new.context {
        let name = entry.display_name();
        let slot = old
            .context
            .iter()
            .position(|o| o.display_name() == name)
            .filter(|&index| slots[index].is_none());
        match slot {
            Some(index) => {
                slots[index] = Some((entry.clone(), tag(entry, &old.context[index])));
            }
            None => appended.push((entry.clone(), Tag::New)),
        }
    }
    let (context, tags): (Vec<Expr>, Vec<Tag>) =
        slots.into_iter().flatten().chain(appended).unzip();
    GoalDiff {
        context,
        tags,
        target_tag: tag(&new.target, &old.target),
    }
}

/// Makes the binders of `new` remember the names their counterparts had in
/// `old`, so that the next naming pass keeps them.
pub fn transfer_names(new: &Goal, old: &Goal) {
    for entry in &new.context {
        let Some(previous) = old.context.find_named(&entry.display_name()) else {
            continue;
        };
        if let (Some(ty), Some(old_ty)) = (entry.math_type(), previous.math_type()) {
            ty.inherit_bound_var_names(old_ty);
        }
    }
    if let (Some(ty), Some(old_ty)) = (new.target.math_type(), old.target.math_type()) {
        ty.inherit_bound_var_names(old_ty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    fn set(name: &str) -> Expr {
        Expr::local_constant(name, Some(Expr::universe()))
    }

    fn entry(name: &str, ty: Expr) -> Expr {
        Expr::local_constant(name, Some(ty))
    }

    fn target() -> Expr {
        entry("target", Expr::new(NodeKind::True, Default::default(), vec![], Some(Expr::prop())))
    }

    #[test]
    fn diff_tags_new_modified_and_unchanged() {
        let (x, y) = (set("X"), set("Y"));
        let f_type = Expr::function_type(x.clone(), y.clone());
        let old = Goal::new(
            vec![entry("f", f_type.clone()), entry("A", Expr::set_of(x.clone()))],
            target(),
        );
        let new = Goal::new(
            vec![
                entry("f", f_type),
                entry("A", Expr::set_of(y)),
                entry("x", x),
            ],
            target(),
        );
        let diff = compare(&new, &old);
        assert_eq!(diff.context.display_names(), vec!["f", "A", "x"]);
        assert_eq!(diff.tags, vec![Tag::Unchanged, Tag::Modified, Tag::New]);
        assert_eq!(diff.target_tag, Tag::Unchanged);
    }

    #[test]
    fn diff_follows_old_order() {
        let x = set("X");
        let old = Goal::new(
            vec![entry("a", x.clone()), entry("b", x.clone()), entry("c", x.clone())],
            target(),
        );
        let new = Goal::new(
            vec![entry("d", x.clone()), entry("c", x.clone()), entry("a", x)],
            target(),
        );
        let diff = compare(&new, &old);
        assert_eq!(diff.context.display_names(), vec!["a", "c", "d"]);
        assert_eq!(diff.tags, vec![Tag::Unchanged, Tag::Unchanged, Tag::New]);
        assert_eq!(
            diff.tags.iter().map(ToString::to_string).collect::<String>(),
            "==+"
        );
    }

    #[test]
    fn empty_proof_state_is_rejected() {
        assert!(ProofState::new(vec![]).is_err());
        let state = ProofState::new(vec![Goal::new(vec![], target())]).unwrap();
        assert_eq!(state.goals().len(), 1);
        assert!(state.main_goal().context.is_empty());
    }

    #[test]
    fn names_are_transferred_to_matching_binders() {
        let x_set = set("X");
        let build = || {
            let x = Expr::bound_var("x", Some(x_set.clone()));
            let body = Expr::proposition(NodeKind::Equal, vec![x.clone(), x.clone()]);
            let prop = Expr::binder(NodeKind::ForAll, &x, &body, Some(Expr::prop()));
            (entry("H", prop), x)
        };
        let (old_entry, old_var) = build();
        old_var.set_display_name("t");
        let (new_entry, new_var) = build();
        let old = Goal::new(vec![old_entry], target());
        let new = Goal::new(vec![new_entry], target());
        transfer_names(&new, &old);
        assert_eq!(new_var.old_name().as_deref(), Some("t"));
    }

    #[test]
    fn properties_are_told_apart_from_objects() {
        let x = set("X");
        let context = vec![entry("a", x.clone()), entry("H", Expr::proposition(NodeKind::True, vec![]))];
        assert_eq!(context.objects().display_names(), vec!["a"]);
        assert_eq!(context.properties().display_names(), vec!["H"]);
        assert!(context.find_named("H").is_some());
    }
}
