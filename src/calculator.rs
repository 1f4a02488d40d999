//! Structural editing of an expression: symbols are inserted at a cursor into
//! a tree whose holes are metavariables.

use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::display::cursor::Side;
use crate::display::paren::precedence;
use crate::display::Displayer;
use crate::expr::{Expr, Info};
use crate::naming::NameExhaustion;
use crate::node::NodeKind;
use crate::pattern::MatchContext;
use crate::session::Session;

static NUMERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").unwrap());
static PARTIAL_NUMERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]*)?$").unwrap());

#[derive(Debug, Clone)]
pub enum Symbol {
    Number(String),
    Atom(Expr),
    Operator(NodeKind),
    /// A quantifier over the given type.
    Quantifier(NodeKind, Expr),
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Number(value) => write!(f, "{value}"),
            Symbol::Atom(expr) => write!(f, "{}", expr.display_name()),
            Symbol::Operator(kind) => write!(f, "{kind}"),
            Symbol::Quantifier(kind, ty) => write!(f, "{kind} over {}", ty.display_name()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum InsertionError {
    #[error("cannot insert {symbol} here")]
    Rejected { symbol: String },
    #[error(transparent)]
    Naming(#[from] NameExhaustion),
}

fn hole(math_type: Option<Expr>) -> Expr {
    Expr::metavar(math_type)
}

/// Paths to the unassigned metavariables of `expr`, in preorder.
pub fn holes(expr: &Expr) -> Vec<Vec<usize>> {
    let mut paths = vec![];
    collect_holes(expr, &mut vec![], &mut paths);
    paths
}

fn collect_holes(expr: &Expr, prefix: &mut Vec<usize>, paths: &mut Vec<Vec<usize>>) {
    if expr.is_metavar() {
        paths.push(prefix.clone());
        return;
    }
    for (index, child) in expr.children().iter().enumerate() {
        prefix.push(index);
        collect_holes(child, prefix, paths);
        prefix.pop();
    }
}

impl Symbol {
    /// The pattern inserted for this symbol; its holes are fresh metavariables.
    fn template(&self, session: &Session) -> Option<Expr> {
        use NodeKind::*;
        let template = match self {
            Symbol::Number(value) => {
                if !NUMERAL.is_match(value) {
                    return None;
                }
                let set = session.smallest_number_set(value);
                Expr::number(value.as_str(), Some(session.number_set_type(set)))
            }
            Symbol::Atom(expr) => expr.clone(),
            Symbol::Quantifier(kind, ty) if kind.is_quantifier() => {
                let var = Expr::bound_var("x", Some(ty.clone()));
                let body = hole(Some(Expr::prop()));
                Expr::binder(*kind, &var, &body, Some(Expr::prop()))
            }
            Symbol::Quantifier(..) => return None,
            Symbol::Operator(kind) => {
                let arity = match kind {
                    And | Or | Implies | Iff => 2,
                    Equal | NotEqual | Less | LessEq | Greater | GreaterEq | Belongs | Included => 2,
                    Sum | Diff | Mult | Div | Power | Inter | Union | SetDiff | Composite => 2,
                    Not | Minus | SetComplement => 1,
                    _ => return None,
                };
                // connectives take propositions, relations take terms
                let hole_type = matches!(kind, And | Or | Implies | Iff | Not).then(Expr::prop);
                let math_type = kind.is_proposition().then(Expr::prop);
                let children = (0..arity).map(|_| hole(hole_type.clone())).collect();
                Expr::new(*kind, Info::default(), children, math_type)
            }
        };
        Some(template)
    }
}

/// An expression under construction with a focused subterm. The cursor
/// stands before or after the focus.
#[derive(Debug, Clone)]
pub struct Calculator {
    root: Expr,
    focus: Vec<usize>,
    side: Side,
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl Calculator {
    pub fn new() -> Self {
        Self::with_type(None)
    }

    /// A calculator whose result must have type `math_type`.
    pub fn with_type(math_type: Option<Expr>) -> Self {
        Self {
            root: hole(math_type),
            focus: vec![],
            side: Side::Before,
        }
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn focus(&self) -> &[usize] {
        &self.focus
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn holes(&self) -> Vec<Vec<usize>> {
        holes(&self.root)
    }

    pub fn is_complete(&self) -> bool {
        self.holes().is_empty()
    }

    /// Inserts `symbol` at the cursor. On failure nothing changes.
    pub fn insert(&mut self, session: &Session, symbol: &Symbol) -> Result<(), InsertionError> {
        let rejected = || InsertionError::Rejected {
            symbol: symbol.to_string(),
        };
        // "3" then "." only makes sense as a partial numeral, so a symbol
        // without a template may still merge.
        let template = symbol.template(session);
        let next = template
            .as_ref()
            .and_then(|template| self.fill_hole(template))
            .or_else(|| template.as_ref().and_then(|t| self.reparent(t)))
            .or_else(|| self.merge_numerals(session, symbol))
            .or_else(|| template.as_ref().and_then(|t| self.apply(t)))
            .ok_or_else(rejected)?;
        // Bound vars are shared with the current tree, so naming must not leak
        // into it when it fails.
        let saved: Vec<_> = next
            .root
            .bound_vars()
            .into_iter()
            .map(|var| (var.naming_state(), var))
            .collect();
        if let Err(err) = session.name_bound_vars(&next.root, &[], &[]) {
            for (state, var) in saved {
                var.restore_naming_state(state);
            }
            return Err(err.into());
        }
        log::debug!("inserted {symbol}: {}", next.root);
        *self = next;
        Ok(())
    }

    fn focused(&self) -> Option<&Expr> {
        self.root.descendant(&self.focus)
    }

    /// The cursor after `inserted` was placed at `at`: its first hole, else the
    /// next hole of the tree, else right after it.
    fn landing(root: Expr, at: &[usize], inserted: &Expr) -> Calculator {
        if let Some(first) = holes(inserted).into_iter().next() {
            let mut focus = at.to_vec();
            focus.extend(first);
            return Calculator {
                root,
                focus,
                side: Side::Before,
            };
        }
        let next = holes(&root).into_iter().find(|path| path.as_slice() > at);
        match next {
            Some(focus) => Calculator {
                root,
                focus,
                side: Side::Before,
            },
            None => Calculator {
                root,
                focus: at.to_vec(),
                side: Side::After,
            },
        }
    }

    fn fill_hole(&self, template: &Expr) -> Option<Calculator> {
        let focused = self.focused()?;
        if !focused.is_metavar() {
            return None;
        }
        let mut ctx = MatchContext::new();
        if !ctx.match_pattern(focused, template) {
            return None;
        }
        let root = self.root.replace_at(&self.focus, template.clone())?;
        Some(Self::landing(root, &self.focus, template))
    }

    /// Puts the subterm around the cursor into a hole of `template` and
    /// `template` in its place. The subterm grows while its parent binds at
    /// least as tightly as the inserted operator.
    fn reparent(&self, template: &Expr) -> Option<Calculator> {
        let focused = self.focused()?;
        if focused.is_metavar() {
            return None;
        }
        let kind = template.kind();
        let template_holes = holes(template);
        let hole_path = match self.side {
            Side::After if kind.is_unary_operator() || kind.is_binder() => return None,
            Side::After => template_holes.first()?,
            Side::Before => template_holes.last()?,
        };
        let prec = precedence(kind).unwrap_or(usize::MAX);
        let mut target = self.focus.clone();
        while let Some((&index, parent_path)) = target.split_last() {
            let parent = self.root.descendant(parent_path)?;
            let parent_prec = precedence(parent.kind()).unwrap_or(0);
            let climb = match self.side {
                Side::After => index + 1 == parent.children().len() && parent_prec >= prec,
                Side::Before => index == 0 && parent_prec > prec,
            };
            if !climb {
                break;
            }
            target.pop();
        }
        let existing = self.root.descendant(&target)?;
        let slot = template.descendant(hole_path)?;
        let mut ctx = MatchContext::new();
        if !ctx.match_pattern(slot, existing) {
            return None;
        }
        let filled = template.replace_at(hole_path, existing.clone())?;
        let root = self.root.replace_at(&target, filled.clone())?;
        Some(Self::landing(root, &target, &filled))
    }

    /// Digits typed next to a number extend it.
    fn merge_numerals(&self, session: &Session, symbol: &Symbol) -> Option<Calculator> {
        let Symbol::Number(digits) = symbol else {
            return None;
        };
        let focused = self.focused()?;
        let value = focused.value().filter(|_| focused.kind() == NodeKind::Number)?;
        let merged = match self.side {
            Side::After => format!("{value}{digits}"),
            Side::Before => format!("{digits}{value}"),
        };
        if !PARTIAL_NUMERAL.is_match(&merged) {
            return None;
        }
        let set = session.smallest_number_set(&merged);
        let number = Expr::number(merged, Some(session.number_set_type(set)));
        let root = self.root.replace_at(&self.focus, number)?;
        Some(Calculator {
            root,
            focus: self.focus.clone(),
            side: self.side,
        })
    }

    /// A function followed by an argument is applied to it.
    fn apply(&self, template: &Expr) -> Option<Calculator> {
        let focused = self.focused()?;
        if self.side != Side::After || !focused.is_function() {
            return None;
        }
        if let (Some(domain), Some(arg_type)) =
            (focused.math_type().and_then(Expr::domain), template.math_type())
        {
            if domain != *arg_type {
                return None;
            }
        }
        let applied = Expr::application(focused, template).ok()?;
        let root = self.root.replace_at(&self.focus, applied.clone())?;
        Some(Self::landing(root, &self.focus, &applied))
    }

    /// Moves the cursor one step. Returns whether it moved.
    pub fn move_cursor(&mut self, session: &Session, forward: bool) -> bool {
        let displayer = Displayer::new(session);
        let mut cursor = displayer.cursor(&self.root);
        cursor.go_to_descent(&self.focus, self.side);
        let moved = if forward {
            cursor.increase_pos()
        } else {
            cursor.decrease_pos()
        };
        if moved {
            self.focus = cursor.descent();
            self.side = cursor.side();
        }
        moved
    }

    /// The utf8 rendering with a caret, and the character offset of the caret.
    pub fn render(&self, session: &Session) -> (String, usize) {
        let displayer = Displayer::new(session);
        let mut cursor = displayer.cursor(&self.root);
        cursor.go_to_descent(&self.focus, self.side);
        let (text, offset) = displayer.render_cursor(&cursor);
        let offset = offset.unwrap_or_else(|| text.chars().count());
        (text, offset)
    }
}
