use crate::expr::Expr;

use super::math_list::{MathItem, MathList, MathString, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

/// A position in a math list: a leaf and a side of it.
///
/// The positions a cursor can take are the start of the first visible leaf
/// and the end of every visible leaf, so "after a" and "before b" are the
/// same position. Parentheses and the cursor mark itself are not visible.
#[derive(Debug, Clone)]
pub struct MathCursor {
    list: MathList,
    address: Vec<usize>,
    side: Side,
    sentinel: Option<Vec<usize>>,
}

impl MathCursor {
    pub fn new(list: MathList) -> Self {
        let mut cursor = Self {
            list,
            address: vec![],
            side: Side::Before,
            sentinel: None,
        };
        cursor.go_to_beginning();
        cursor
    }

    pub fn list(&self) -> &MathList {
        &self.list
    }

    pub fn address(&self) -> &[usize] {
        &self.address
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_shown(&self) -> bool {
        self.sentinel.is_some()
    }

    fn visible_leaves(&self) -> Vec<Vec<usize>> {
        self.list
            .leaf_addresses()
            .into_iter()
            .filter(|address| {
                self.list
                    .leaf(address)
                    .is_some_and(|leaf| !leaf.token.is_cosmetic() && !leaf.text.is_empty())
            })
            .collect()
    }

    fn positions(&self) -> Vec<(Vec<usize>, Side)> {
        let leaves = self.visible_leaves();
        let Some(first) = leaves.first() else {
            return vec![];
        };
        let mut positions = vec![(first.clone(), Side::Before)];
        positions.extend(leaves.into_iter().map(|address| (address, Side::After)));
        positions
    }

    fn index(&self) -> Option<usize> {
        self.positions()
            .iter()
            .position(|(address, side)| *address == self.address && *side == self.side)
    }

    /// Moves to `address`, a visible leaf; the start of a leaf other than the
    /// first is the end of the previous one.
    fn set(&mut self, address: Vec<usize>, side: Side) {
        let shown = self.is_shown();
        self.hide_cursor();
        let (address, side) = if side == Side::Before {
            let leaves = self.visible_leaves();
            match leaves.iter().position(|leaf| *leaf == address) {
                Some(index) if index > 0 => (leaves[index - 1].clone(), Side::After),
                _ => (address, side),
            }
        } else {
            (address, side)
        };
        self.address = address;
        self.side = side;
        if shown {
            self.show_cursor();
        }
    }

    fn set_index(&mut self, index: usize) -> bool {
        match self.positions().get(index).cloned() {
            Some((address, side)) => {
                self.set(address, side);
                true
            }
            None => false,
        }
    }

    pub fn go_to_beginning(&mut self) {
        self.set_index(0);
    }

    pub fn go_to_end(&mut self) {
        let len = self.positions().len();
        if len > 0 {
            self.set_index(len - 1);
        }
    }

    pub fn increase_pos(&mut self) -> bool {
        let hidden = self.with_hidden(|cursor| cursor.index());
        match hidden {
            Some(index) => self.set_index(index + 1),
            None => false,
        }
    }

    pub fn decrease_pos(&mut self) -> bool {
        let hidden = self.with_hidden(|cursor| cursor.index());
        match hidden {
            Some(index) if index > 0 => self.set_index(index - 1),
            _ => false,
        }
    }

    fn with_hidden<T>(&mut self, f: impl FnOnce(&Self) -> T) -> T {
        let shown = self.is_shown();
        self.hide_cursor();
        let result = f(self);
        if shown {
            self.show_cursor();
        }
        result
    }

    fn leaves_of(&self, list_address: &[usize]) -> Vec<Vec<usize>> {
        self.visible_leaves()
            .into_iter()
            .filter(|leaf| leaf.starts_with(list_address))
            .collect()
    }

    fn go_to_list(&mut self, list_address: Option<Vec<usize>>, side: Side) -> bool {
        let Some(list_address) = list_address else {
            return false;
        };
        let leaves = self.with_hidden(|cursor| cursor.leaves_of(&list_address));
        let target = match side {
            Side::Before => leaves.first(),
            Side::After => leaves.last(),
        };
        match target.cloned() {
            Some(address) => {
                self.set(address, side);
                true
            }
            None => false,
        }
    }

    /// Moves after the last rendering of `expr`. A shared subterm may be
    /// rendered more than once.
    pub fn go_to(&mut self, expr: &Expr) -> bool {
        let renders = |list: &MathList| list.expr.as_ref().is_some_and(|e| e.ptr_eq(expr));
        let address = self.with_hidden(|cursor| cursor.list.find_last_list(&renders));
        self.go_to_list(address, Side::After)
    }

    /// Moves to the rendering of the subexpression at `descent`.
    pub fn go_to_descent(&mut self, descent: &[usize], side: Side) -> bool {
        let address = self.with_hidden(|cursor| {
            cursor
                .list
                .find_list(&|list: &MathList| list.expr.is_some() && list.descent == descent)
        });
        self.go_to_list(address, side)
    }

    /// Path from the root expression to the innermost node rendered around
    /// the cursor.
    pub fn descent(&self) -> Vec<usize> {
        let mut descent = self.list.descent.clone();
        for len in 1..self.address.len() {
            if let Some(list) = self.list.list_at(&self.address[..len]) {
                if list.expr.is_some() {
                    descent = list.descent.clone();
                }
            }
        }
        descent
    }

    pub fn show_cursor(&mut self) {
        if self.is_shown() {
            return;
        }
        let Some((&last, parent)) = self.address.split_last() else {
            return;
        };
        let depth = self.list.leaf(&self.address).map_or(0, |leaf| leaf.depth);
        let mut sentinel = parent.to_vec();
        match self.side {
            Side::After => sentinel.push(last + 1),
            Side::Before => sentinel.push(last),
        }
        let mark = MathItem::Leaf(MathString::new(r"\cursor", TokenKind::Cursor, depth));
        if self.list.insert(&sentinel, mark) {
            if self.side == Side::Before {
                if let Some(index) = self.address.last_mut() {
                    *index += 1;
                }
            }
            self.sentinel = Some(sentinel);
        }
    }

    pub fn hide_cursor(&mut self) {
        let Some(sentinel) = self.sentinel.take() else {
            return;
        };
        self.list.remove(&sentinel);
        if self.side == Side::Before {
            if let Some(index) = self.address.last_mut() {
                *index -= 1;
            }
        }
    }
}
