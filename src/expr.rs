use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::iter::zip;
use std::rc::{Rc, Weak};
use std::sync::atomic::AtomicUsize;

use thiserror::Error;

use crate::node::NodeKind;

/// Identity of bound variables and metavariables.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct Id(usize);

static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Id {
    pub fn fresh() -> Self {
        let id = ID_COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Id(id)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// Scalar attributes attached to a node by the prover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    pub name: Option<String>,
    pub lean_name: Option<String>,
    pub identifier: Option<String>,
    pub value: Option<String>,
    pub binder_info: Option<String>,
    pub identifier_nb: Option<usize>,
}

impl Info {
    pub fn named(name: impl Into<String>) -> Info {
        Info {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn valued(value: impl Into<String>) -> Info {
        Info {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Info {
        self.identifier = Some(identifier.into());
        self
    }
}

#[derive(Debug, Clone, Error)]
#[error("type mismatch: {description}")]
pub struct TypeMismatch {
    pub description: String,
}

impl TypeMismatch {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// A mathematical expression: a node kind, its info, its children and its type.
///
/// Expressions are shared and immutable, with one exception: the display names of
/// bound variables, which the naming pass updates in place.
#[derive(Clone)]
pub struct Expr(Rc<ExprInner>);

struct ExprInner {
    kind: NodeKind,
    info: Info,
    children: Vec<Expr>,
    math_type: Option<Expr>,
    binding: Binding,
}

enum Binding {
    Plain,
    Bound(BoundVar),
    Meta(Id),
}

/// Display name and local context of a bound variable.
pub(crate) type NamingState = (Option<String>, Vec<Expr>);

struct BoundVar {
    id: Id,
    parent: RefCell<Weak<ExprInner>>,
    local_context: RefCell<Vec<Expr>>,
    name: RefCell<Option<String>>,
    old_name: RefCell<Option<String>>,
}

/// Pairs of binders entered simultaneously while two expressions are walked in
/// parallel. Both bound variables of a pair carry the same tag.
#[derive(Debug, Default)]
pub(crate) struct BinderTags {
    counter: usize,
    left: HashMap<Id, usize>,
    right: HashMap<Id, usize>,
    right_vars: HashMap<usize, Expr>,
}

impl BinderTags {
    pub(crate) fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// Tags the variables of two binders. Returns `false` if one of them does not
    /// bind a variable.
    pub(crate) fn tag(&mut self, left: &Expr, right: &Expr) -> bool {
        let (Some(l), Some(r)) = (left.binder_var_id(), right.binder_var_id()) else {
            return false;
        };
        self.counter += 1;
        let tag = self.counter;
        self.left.insert(l, tag);
        self.right.insert(r, tag);
        self.right_vars.insert(tag, right.children()[1].clone());
        true
    }

    pub(crate) fn untag(&mut self, left: &Expr, right: &Expr) {
        if let Some(l) = left.binder_var_id() {
            self.left.remove(&l);
        }
        if let Some(r) = right.binder_var_id() {
            if let Some(tag) = self.right.remove(&r) {
                self.right_vars.remove(&tag);
            }
        }
    }

    pub(crate) fn left_tag(&self, id: Id) -> Option<usize> {
        self.left.get(&id).copied()
    }

    pub(crate) fn right_tag(&self, id: Id) -> Option<usize> {
        self.right.get(&id).copied()
    }

    pub(crate) fn right_var(&self, tag: usize) -> Option<&Expr> {
        self.right_vars.get(&tag)
    }
}

#[inline]
fn new_bound_var(info: Info, math_type: Option<Expr>, name: Option<String>, old_name: Option<String>) -> Expr {
    let data = BoundVar {
        id: Id::fresh(),
        parent: RefCell::new(Weak::new()),
        local_context: RefCell::new(vec![]),
        name: RefCell::new(name),
        old_name: RefCell::new(old_name),
    };
    Expr::with_binding(NodeKind::BoundVar, info, vec![], math_type, Binding::Bound(data))
}

impl Expr {
    pub fn new(kind: NodeKind, info: Info, children: Vec<Expr>, math_type: Option<Expr>) -> Expr {
        Self::with_binding(kind, info, children, math_type, Binding::Plain)
    }

    fn with_binding(
        kind: NodeKind,
        info: Info,
        mut children: Vec<Expr>,
        math_type: Option<Expr>,
        binding: Binding,
    ) -> Expr {
        // APPLICATION(APPLICATION(f, x), y) ~> APPLICATION(f, x, y)
        if kind == NodeKind::Application
            && children
                .first()
                .is_some_and(|first| first.kind() == NodeKind::Application && !first.children().is_empty())
        {
            let first = children.remove(0);
            let mut flat = first.children().to_vec();
            flat.append(&mut children);
            children = flat;
        }
        let expr = Expr(Rc::new(ExprInner {
            kind,
            info,
            children,
            math_type,
            binding,
        }));
        if kind.is_binder() {
            if let Some(Binding::Bound(data)) = expr.children().get(1).map(|var| &var.0.binding) {
                *data.parent.borrow_mut() = Rc::downgrade(&expr.0);
            }
        }
        expr
    }

    pub fn bound_var(name: impl Into<String>, math_type: Option<Expr>) -> Expr {
        let name = name.into();
        let info = Info {
            name: Some(name.clone()),
            lean_name: Some(name),
            ..Default::default()
        };
        Self::bound_var_with_info(info, math_type)
    }

    pub fn bound_var_with_info(info: Info, math_type: Option<Expr>) -> Expr {
        let name = info.name.clone().or_else(|| info.lean_name.clone());
        new_bound_var(info, math_type, name, None)
    }

    pub fn metavar(math_type: Option<Expr>) -> Expr {
        let id = Id::fresh();
        let info = Info {
            identifier_nb: Some(id.0),
            ..Default::default()
        };
        Self::with_binding(NodeKind::MetaVar, info, vec![], math_type, Binding::Meta(id))
    }

    pub fn local_constant(name: impl Into<String>, math_type: Option<Expr>) -> Expr {
        Expr::new(NodeKind::LocalConstant, Info::named(name), vec![], math_type)
    }

    pub fn constant(name: impl Into<String>, math_type: Option<Expr>) -> Expr {
        Expr::new(NodeKind::Constant, Info::named(name), vec![], math_type)
    }

    pub fn number(value: impl Into<String>, math_type: Option<Expr>) -> Expr {
        Expr::new(NodeKind::Number, Info::valued(value), vec![], math_type)
    }

    pub fn prop() -> Expr {
        Expr::new(NodeKind::Prop, Info::default(), vec![], None)
    }

    pub fn universe() -> Expr {
        Expr::new(NodeKind::Type, Info::default(), vec![], None)
    }

    pub fn set_of(elements: Expr) -> Expr {
        Expr::new(NodeKind::Set, Info::default(), vec![elements], Some(Expr::universe()))
    }

    pub fn function_type(domain: Expr, codomain: Expr) -> Expr {
        Expr::new(
            NodeKind::Function,
            Info::default(),
            vec![domain, codomain],
            Some(Expr::universe()),
        )
    }

    /// A node whose value is a proposition.
    pub fn proposition(kind: NodeKind, children: Vec<Expr>) -> Expr {
        Expr::new(kind, Info::default(), children, Some(Expr::prop()))
    }

    /// `kind(type of var, var, body)`; sets the back-pointer of `var`.
    pub fn binder(kind: NodeKind, var: &Expr, body: &Expr, math_type: Option<Expr>) -> Expr {
        let var_type = var.math_type().cloned().unwrap_or_else(Expr::universe);
        Expr::new(
            kind,
            Info::default(),
            vec![var_type, var.clone(), body.clone()],
            math_type,
        )
    }

    /// Applies `fun` to `arg`, typed by the codomain of `fun`'s type.
    pub fn application(fun: &Expr, arg: &Expr) -> Result<Expr, TypeMismatch> {
        let Some(ty) = fun.math_type().and_then(Expr::codomain) else {
            return Err(TypeMismatch::new(format!(
                "{fun} has no codomain and cannot be applied to {arg}"
            )));
        };
        Ok(Expr::new(
            NodeKind::Application,
            Info::default(),
            vec![fun.clone(), arg.clone()],
            Some(ty),
        ))
    }

    pub fn lambda(var: &Expr, body: &Expr, math_type: Option<Expr>) -> Expr {
        Expr::binder(NodeKind::Lambda, var, body, math_type)
    }

    /// `∀ y, body[old_var ↦ y]` for a fresh bound variable `y`.
    pub fn forall(old_var: &Expr, body: &Expr) -> Expr {
        let var = Expr::bound_var(old_var.display_name(), old_var.math_type().cloned());
        let body = body.substitute_everywhere(old_var, &var);
        Expr::binder(NodeKind::ForAll, &var, &body, Some(Expr::prop()))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    pub fn info(&self) -> &Info {
        &self.0.info
    }

    pub fn children(&self) -> &[Expr] {
        &self.0.children
    }

    pub fn child(&self, index: usize) -> Option<&Expr> {
        self.0.children.get(index)
    }

    /// `None` stands for the absence of a type, which compares equal to anything.
    pub fn math_type(&self) -> Option<&Expr> {
        self.0.math_type.as_ref()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.info.name.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.0.info.value.as_deref()
    }

    pub fn lean_name(&self) -> Option<&str> {
        self.0
            .info
            .lean_name
            .as_deref()
            .or(self.0.info.name.as_deref())
    }

    pub fn is_bound_var(&self) -> bool {
        matches!(self.0.binding, Binding::Bound(_))
    }

    pub fn bound_var_id(&self) -> Option<Id> {
        match &self.0.binding {
            Binding::Bound(data) => Some(data.id),
            _ => None,
        }
    }

    pub fn is_metavar(&self) -> bool {
        matches!(self.0.binding, Binding::Meta(_))
    }

    pub fn metavar_id(&self) -> Option<Id> {
        match &self.0.binding {
            Binding::Meta(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_same_bound_var(&self, other: &Expr) -> bool {
        matches!((self.bound_var_id(), other.bound_var_id()), (Some(a), Some(b)) if a == b)
    }

    fn binder_var_id(&self) -> Option<Id> {
        if !self.kind().is_binder() {
            return None;
        }
        self.child(1).and_then(Expr::bound_var_id)
    }

    /// The name shown to the user.
    pub fn display_name(&self) -> String {
        if let Binding::Bound(data) = &self.0.binding {
            if let Some(name) = data.name.borrow().as_ref() {
                return name.clone();
            }
        }
        self.lean_name()
            .or(self.value())
            .map(str::to_owned)
            .unwrap_or_else(|| self.kind().as_str().to_owned())
    }

    /// Sets the current display name of a bound variable. No effect on other nodes.
    pub fn set_display_name(&self, name: impl Into<String>) {
        if let Binding::Bound(data) = &self.0.binding {
            *data.name.borrow_mut() = Some(name.into());
        }
    }

    pub fn old_name(&self) -> Option<String> {
        match &self.0.binding {
            Binding::Bound(data) => data.old_name.borrow().clone(),
            _ => None,
        }
    }

    pub fn set_old_name(&self, name: Option<String>) {
        if let Binding::Bound(data) = &self.0.binding {
            *data.old_name.borrow_mut() = name;
        }
    }

    /// What naming writes into a bound variable: its display name and local
    /// context. Other nodes give an empty state.
    pub(crate) fn naming_state(&self) -> NamingState {
        match &self.0.binding {
            Binding::Bound(data) => {
                let name = data.name.borrow().clone();
                (name, data.local_context.borrow().clone())
            }
            _ => (None, vec![]),
        }
    }

    pub(crate) fn restore_naming_state(&self, (name, local_context): NamingState) {
        if let Binding::Bound(data) = &self.0.binding {
            *data.name.borrow_mut() = name;
            *data.local_context.borrow_mut() = local_context;
        }
    }

    /// The binder introducing this bound variable, if it is still alive.
    pub fn parent(&self) -> Option<Expr> {
        match &self.0.binding {
            Binding::Bound(data) => data.parent.borrow().upgrade().map(Expr),
            _ => None,
        }
    }

    pub fn local_context(&self) -> Vec<Expr> {
        match &self.0.binding {
            Binding::Bound(data) => data.local_context.borrow().clone(),
            _ => vec![],
        }
    }

    pub fn is_prop(&self) -> bool {
        self.math_type().is_some_and(|t| t.kind() == NodeKind::Prop)
    }

    pub fn is_function(&self) -> bool {
        self.math_type().is_some_and(|t| t.kind().is_function_type())
    }

    /// For a function-like type, the type of its values.
    pub fn codomain(&self) -> Option<Expr> {
        match self.kind() {
            NodeKind::Function | NodeKind::Sequence => self.child(1).cloned(),
            NodeKind::SetFamily => self.child(1).map(|x| Expr::set_of(x.clone())),
            _ => None,
        }
    }

    pub fn domain(&self) -> Option<Expr> {
        if self.kind().is_function_type() {
            self.child(0).cloned()
        } else {
            None
        }
    }

    pub fn descendant(&self, path: &[usize]) -> Option<&Expr> {
        let mut current = self;
        for &index in path {
            current = current.child(index)?;
        }
        Some(current)
    }

    /// Path of child indices leading to the first occurrence of `target`.
    pub fn path_to(&self, target: &Expr) -> Option<Vec<usize>> {
        if self.ptr_eq(target) {
            return Some(vec![]);
        }
        for (index, child) in self.children().iter().enumerate() {
            if let Some(mut path) = child.path_to(target) {
                path.insert(0, index);
                return Some(path);
            }
        }
        None
    }

    pub fn contains(&self, pred: &impl Fn(&Expr) -> bool) -> bool {
        pred(self) || self.children().iter().any(|child| child.contains(pred))
    }

    pub fn contains_bound_var(&self, var: &Expr) -> bool {
        self.contains(&|e: &Expr| e.is_same_bound_var(var))
    }

    /// Variables introduced by binders, in preorder.
    pub fn bound_vars(&self) -> Vec<Expr> {
        let mut vars = vec![];
        self.collect_bound_vars(&mut vars);
        vars
    }

    fn collect_bound_vars(&self, vars: &mut Vec<Expr>) {
        if let Some(var) = self.child(1).filter(|_| self.binder_var_id().is_some()) {
            vars.push(var.clone());
        }
        for child in self.children() {
            child.collect_bound_vars(vars);
        }
    }

    /// Records in each bound variable the variables in scope at its binder.
    pub fn mark_local_contexts(&self) {
        let mut scope = vec![];
        self.mark_local_contexts_help(&mut scope);
    }

    fn mark_local_contexts_help(&self, scope: &mut Vec<Expr>) {
        if self.binder_var_id().is_some() && self.children().len() == 3 {
            let var = &self.children()[1];
            self.children()[0].mark_local_contexts_help(scope);
            if let Binding::Bound(data) = &var.0.binding {
                *data.local_context.borrow_mut() = scope.clone();
            }
            scope.push(var.clone());
            self.children()[2].mark_local_contexts_help(scope);
            scope.pop();
            return;
        }
        for child in self.children() {
            child.mark_local_contexts_help(scope);
        }
    }

    /// A fresh bound variable with the same names and type as `self`.
    pub fn fresh_bound_var(&self) -> Expr {
        self.fresh_bound_var_with_type(self.math_type().cloned())
    }

    fn fresh_bound_var_with_type(&self, math_type: Option<Expr>) -> Expr {
        let (name, old_name) = match &self.0.binding {
            Binding::Bound(data) => (data.name.borrow().clone(), data.old_name.borrow().clone()),
            _ => (self.name().map(str::to_owned), None),
        };
        new_bound_var(self.info().clone(), math_type, name, old_name)
    }

    /// Rebuilds `self` with new children. A binder whose children changed gets a
    /// fresh bound variable, so that binder identity stays object identity.
    pub fn rebuild(&self, children: Vec<Expr>) -> Expr {
        if children.len() == self.children().len()
            && zip(&children, self.children()).all(|(a, b)| a.ptr_eq(b))
        {
            return self.clone();
        }
        if let Some(old_var) = self.child(1).filter(|_| self.binder_var_id().is_some()) {
            if children.len() == 3 && children[1].ptr_eq(old_var) {
                let fresh = old_var.fresh_bound_var();
                let body = children[2].replace(&mut |e: &Expr| {
                    e.is_same_bound_var(old_var).then(|| fresh.clone())
                });
                return Expr::new(
                    self.kind(),
                    self.info().clone(),
                    vec![children[0].clone(), fresh, body],
                    self.math_type().cloned(),
                );
            }
        }
        Expr::new(
            self.kind(),
            self.info().clone(),
            children,
            self.math_type().cloned(),
        )
    }

    /// Rewrites every subexpression for which `f` returns a replacement. Math
    /// types are left untouched.
    pub fn replace(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        if let Some(new) = f(self) {
            return new;
        }
        if self.children().is_empty() {
            return self.clone();
        }
        let mut children = Vec::with_capacity(self.children().len());
        for child in self.children() {
            children.push(child.replace(f));
        }
        self.rebuild(children)
    }

    /// Replaces all occurrences of `old` by `new`. `self` is not modified.
    pub fn substitute(&self, old: &Expr, new: &Expr) -> Expr {
        self.replace(&mut |e: &Expr| e.is_occurrence_of(old).then(|| new.clone()))
    }

    fn is_occurrence_of(&self, old: &Expr) -> bool {
        if old.is_bound_var() {
            self.is_same_bound_var(old)
        } else {
            self == old
        }
    }

    /// Like `replace`, but math types are rewritten too. A bound variable whose
    /// type changes is replaced, everywhere, by a single fresh one.
    pub fn replace_everywhere(&self, f: &mut impl FnMut(&Expr) -> Option<Expr>) -> Expr {
        let mut memo = HashMap::new();
        self.replace_everywhere_help(f, &mut memo)
    }

    fn replace_everywhere_help(
        &self,
        f: &mut impl FnMut(&Expr) -> Option<Expr>,
        memo: &mut HashMap<Id, Expr>,
    ) -> Expr {
        if let Some(new) = f(self) {
            return new;
        }
        if let Some(id) = self.bound_var_id() {
            if let Some(copy) = memo.get(&id) {
                return copy.clone();
            }
            let Some(ty) = self.math_type() else {
                return self.clone();
            };
            let new_ty = ty.replace_everywhere_help(f, memo);
            if new_ty.ptr_eq(ty) {
                return self.clone();
            }
            let copy = self.fresh_bound_var_with_type(Some(new_ty));
            memo.insert(id, copy.clone());
            return copy;
        }
        if self.is_metavar() {
            return self.clone();
        }
        let math_type = self.math_type().map(|t| t.replace_everywhere_help(f, memo));
        let children = self
            .children()
            .iter()
            .map(|child| child.replace_everywhere_help(f, memo))
            .collect();
        let rebuilt = self.rebuild(children);
        let same_type = match (&math_type, self.math_type()) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => true,
        };
        if same_type {
            return rebuilt;
        }
        Expr::new(
            rebuilt.kind(),
            rebuilt.info().clone(),
            rebuilt.children().to_vec(),
            math_type,
        )
    }

    /// `substitute`, extended to math types.
    pub fn substitute_everywhere(&self, old: &Expr, new: &Expr) -> Expr {
        self.replace_everywhere(&mut |e: &Expr| e.is_occurrence_of(old).then(|| new.clone()))
    }

    /// Replaces the descendant at `path` by `new`.
    pub fn replace_at(&self, path: &[usize], new: Expr) -> Option<Expr> {
        let Some((&index, rest)) = path.split_first() else {
            return Some(new);
        };
        let child = self.child(index)?.replace_at(rest, new)?;
        let mut children = self.children().to_vec();
        children[index] = child;
        Some(self.rebuild(children))
    }

    /// Beta-reduces every redex, innermost first.
    pub fn beta_normalize(&self) -> Expr {
        if self.children().is_empty() {
            return self.clone();
        }
        let children = self.children().iter().map(Expr::beta_normalize).collect();
        self.rebuild(children).beta_reduce()
    }

    /// `(λx, body) a b` ~> `body[x ↦ a] b`
    pub fn beta_reduce(&self) -> Expr {
        if self.kind() != NodeKind::Application {
            return self.clone();
        }
        let Some((head, args)) = self.children().split_first() else {
            return self.clone();
        };
        if head.kind() != NodeKind::Lambda || head.children().len() != 3 || args.is_empty() {
            return self.clone();
        }
        let var = &head.children()[1];
        let body = head.children()[2]
            .replace(&mut |e: &Expr| e.is_same_bound_var(var).then(|| args[0].clone()));
        if args.len() == 1 {
            return body;
        }
        let mut children = vec![body];
        children.extend(args[1..].iter().cloned());
        Expr::new(
            NodeKind::Application,
            Info::default(),
            children,
            self.math_type().cloned(),
        )
        .beta_reduce()
    }

    /// Structural copy in which every bound variable and metavariable is
    /// duplicated exactly once.
    pub fn deep_copy(&self) -> Expr {
        let mut memo = HashMap::new();
        self.deep_copy_help(&mut memo)
    }

    fn deep_copy_help(&self, memo: &mut HashMap<Id, Expr>) -> Expr {
        match &self.0.binding {
            Binding::Bound(data) => {
                if let Some(copy) = memo.get(&data.id) {
                    return copy.clone();
                }
                let math_type = self.math_type().map(|t| t.deep_copy_help(memo));
                let copy = self.fresh_bound_var_with_type(math_type);
                memo.insert(data.id, copy.clone());
                copy
            }
            Binding::Meta(id) => {
                if let Some(copy) = memo.get(id) {
                    return copy.clone();
                }
                let math_type = self.math_type().map(|t| t.deep_copy_help(memo));
                let copy = Expr::metavar(math_type);
                memo.insert(*id, copy.clone());
                copy
            }
            Binding::Plain => {
                if self.children().is_empty() {
                    return self.clone();
                }
                let children = self
                    .children()
                    .iter()
                    .map(|child| child.deep_copy_help(memo))
                    .collect();
                let math_type = self.math_type().map(|t| t.deep_copy_help(memo));
                Expr::new(self.kind(), self.info().clone(), children, math_type)
            }
        }
    }

    /// Copies the display names of the binders of `old` into the `old_name` of
    /// the corresponding binders of `self`, when the prover names agree.
    pub fn inherit_bound_var_names(&self, old: &Expr) {
        if self.kind() != old.kind() || self.children().len() != old.children().len() {
            return;
        }
        if let (Binding::Bound(_), Binding::Bound(prev)) = (&self.0.binding, &old.0.binding) {
            if self.lean_name() == old.lean_name() {
                let name = prev.name.borrow().clone();
                if name.is_some() {
                    self.set_old_name(name);
                }
            }
            return;
        }
        for (new, old) in zip(self.children(), old.children()) {
            new.inherit_bound_var_names(old);
        }
    }

    pub(crate) fn eq_with(&self, other: &Expr, tags: &mut BinderTags) -> bool {
        if tags.is_empty() && self.ptr_eq(other) {
            return true;
        }
        if self.kind() != other.kind() {
            return false;
        }
        match (self.bound_var_id(), other.bound_var_id()) {
            (Some(a), Some(b)) => {
                let same = match (tags.left_tag(a), tags.right_tag(b)) {
                    (Some(x), Some(y)) => x == y,
                    (None, None) => a == b,
                    _ => false,
                };
                return same && self.types_agree(other, tags);
            }
            (None, None) => {}
            _ => return false,
        }
        if let (Some(a), Some(b)) = (self.metavar_id(), other.metavar_id()) {
            return a == b;
        }
        if self.info().name != other.info().name || self.info().value != other.info().value {
            return false;
        }
        if !self.types_agree(other, tags) {
            return false;
        }
        if self.children().len() != other.children().len() {
            return false;
        }
        let tagged = tags.tag(self, other);
        let result = zip(self.children(), other.children()).all(|(a, b)| a.eq_with(b, tags));
        if tagged {
            tags.untag(self, other);
        }
        result
    }

    fn types_agree(&self, other: &Expr, tags: &mut BinderTags) -> bool {
        match (self.math_type(), other.math_type()) {
            (Some(a), Some(b)) => a.eq_with(b, tags),
            _ => true,
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut BinderTags::default())
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            NodeKind::LocalConstant | NodeKind::Constant | NodeKind::BoundVar => {
                write!(f, "{}", self.display_name())
            }
            NodeKind::MetaVar => match self.metavar_id() {
                Some(id) => write!(f, "?{id}"),
                None => write!(f, "?"),
            },
            NodeKind::Number => write!(f, "{}", self.value().unwrap_or("?")),
            kind => {
                write!(f, "{kind}")?;
                if self.children().is_empty() {
                    return Ok(());
                }
                write!(f, "(")?;
                let mut first = true;
                for child in self.children() {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_x() -> Expr {
        Expr::local_constant("X", Some(Expr::universe()))
    }

    fn pred(name: &str) -> Expr {
        Expr::local_constant(name, Some(Expr::function_type(set_x(), Expr::prop())))
    }

    fn forall_p(var_name: &str) -> Expr {
        let x = Expr::bound_var(var_name, Some(set_x()));
        let body = Expr::application(&pred("P"), &x).expect("P is a function");
        Expr::binder(NodeKind::ForAll, &x, &body, Some(Expr::prop()))
    }

    #[test]
    fn application_is_left_associative() {
        let y = Expr::local_constant("Y", Some(Expr::universe()));
        let f = Expr::local_constant(
            "f",
            Some(Expr::function_type(set_x(), Expr::function_type(set_x(), y))),
        );
        let a = Expr::local_constant("a", Some(set_x()));
        let b = Expr::local_constant("b", Some(set_x()));
        let fa = Expr::application(&f, &a).unwrap();
        let fab = Expr::application(&fa, &b).unwrap();
        assert_eq!(fab.kind(), NodeKind::Application);
        assert_eq!(fab.children().len(), 3);
        assert!(fab.children()[0].ptr_eq(&f));
        assert_eq!(fab.math_type().unwrap().name(), Some("Y"));
    }

    #[test]
    fn application_of_non_function_fails() {
        let a = Expr::local_constant("a", Some(set_x()));
        let err = Expr::application(&a, &a).unwrap_err();
        assert!(err.to_string().contains("type mismatch"));
        assert!(err.description.contains('a'));
    }

    #[test]
    fn alpha_equivalent_quantifiers_are_equal() {
        assert_eq!(forall_p("x"), forall_p("y"));
        let other = {
            let x = Expr::bound_var("x", Some(set_x()));
            let body = Expr::application(&pred("Q"), &x).unwrap();
            Expr::binder(NodeKind::ForAll, &x, &body, Some(Expr::prop()))
        };
        assert_ne!(forall_p("x"), other);
    }

    #[test]
    fn binder_sets_parent_of_its_variable() {
        let expr = forall_p("x");
        let var = &expr.children()[1];
        assert!(var.parent().is_some_and(|parent| parent.ptr_eq(&expr)));
    }

    #[test]
    fn missing_type_matches_anything() {
        let a = Expr::local_constant("a", None);
        let b = Expr::local_constant("a", Some(set_x()));
        assert_eq!(a, b);
    }

    #[test]
    fn bound_variables_are_not_interchangeable_across_binders() {
        // ∀x, ∀y, R(x, y) vs ∀x, ∀y, R(y, x)
        let r = Expr::local_constant(
            "R",
            Some(Expr::function_type(
                set_x(),
                Expr::function_type(set_x(), Expr::prop()),
            )),
        );
        let build = |swap: bool| {
            let x = Expr::bound_var("x", Some(set_x()));
            let y = Expr::bound_var("y", Some(set_x()));
            let (a, b) = if swap { (&y, &x) } else { (&x, &y) };
            let body = Expr::application(&Expr::application(&r, a).unwrap(), b).unwrap();
            let inner = Expr::binder(NodeKind::ForAll, &y, &body, Some(Expr::prop()));
            Expr::binder(NodeKind::ForAll, &x, &inner, Some(Expr::prop()))
        };
        assert_eq!(build(false), build(false));
        assert_ne!(build(false), build(true));
    }

    #[test]
    fn substitute_has_no_side_effect() {
        let a = Expr::local_constant("a", Some(set_x()));
        let b = Expr::local_constant("b", Some(set_x()));
        let pa = Expr::application(&pred("P"), &a).unwrap();
        let pb = pa.substitute(&a, &b);
        assert_eq!(pa.to_string(), "APPLICATION(P, a)");
        assert_eq!(pb.to_string(), "APPLICATION(P, b)");
    }

    #[test]
    fn substitute_under_binder_refreshes_the_bound_variable() {
        let expr = forall_p("x");
        let q = pred("Q");
        let replaced = expr.substitute(&pred("P"), &q);
        let old_var = &expr.children()[1];
        let new_var = &replaced.children()[1];
        assert!(!old_var.is_same_bound_var(new_var));
        assert!(new_var.parent().is_some_and(|parent| parent.ptr_eq(&replaced)));
        assert!(old_var.parent().is_some_and(|parent| parent.ptr_eq(&expr)));
        assert!(replaced.children()[2].contains_bound_var(new_var));
    }

    #[test]
    fn forall_abstracts_a_local_constant() {
        let a = Expr::local_constant("a", Some(set_x()));
        let pa = Expr::application(&pred("P"), &a).unwrap();
        let quantified = Expr::forall(&a, &pa);
        assert_eq!(quantified, forall_p("z"));
        assert_eq!(quantified.children()[1].display_name(), "a");
    }

    #[test]
    fn deep_copy_duplicates_each_variable_once() {
        let expr = forall_p("x");
        let copy = expr.deep_copy();
        assert_eq!(copy, expr);
        let var = &copy.children()[1];
        assert!(!var.is_same_bound_var(&expr.children()[1]));
        let occurrence = &copy.children()[2].children()[1];
        assert!(occurrence.ptr_eq(var));
        assert!(var.parent().is_some_and(|parent| parent.ptr_eq(&copy)));
    }

    #[test]
    fn beta_reduction_substitutes_the_argument() {
        let x = Expr::bound_var("x", Some(set_x()));
        let body = Expr::application(&pred("P"), &x).unwrap();
        let lambda = Expr::lambda(
            &x,
            &body,
            Some(Expr::function_type(set_x(), Expr::prop())),
        );
        let a = Expr::local_constant("a", Some(set_x()));
        let applied = Expr::application(&lambda, &a).unwrap();
        assert_eq!(applied.beta_reduce().to_string(), "APPLICATION(P, a)");
    }

    #[test]
    fn local_contexts_list_outer_variables() {
        let y = Expr::bound_var("y", Some(set_x()));
        let inner = Expr::binder(
            NodeKind::Exists,
            &y,
            &Expr::application(&pred("P"), &y).unwrap(),
            Some(Expr::prop()),
        );
        let x = Expr::bound_var("x", Some(set_x()));
        let outer = Expr::binder(NodeKind::ForAll, &x, &inner, Some(Expr::prop()));
        outer.mark_local_contexts();
        assert!(x.local_context().is_empty());
        let context = y.local_context();
        assert_eq!(context.len(), 1);
        assert!(context[0].ptr_eq(&x));
    }
}
