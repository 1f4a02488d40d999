use crate::expr::Expr;
use crate::node::NodeKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Macro,
    Variable,
    DummyVariable,
    Property,
    Number,
    Paren,
    Cursor,
    Placeholder,
}

impl TokenKind {
    /// Cosmetic tokens are skipped by the cursor.
    pub fn is_cosmetic(&self) -> bool {
        matches!(self, TokenKind::Paren | TokenKind::Cursor)
    }
}

/// A leaf of a math list: a piece of text with its role and the depth of
/// the node that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathString {
    pub text: String,
    pub token: TokenKind,
    pub depth: usize,
}

impl MathString {
    pub fn new(text: impl Into<String>, token: TokenKind, depth: usize) -> Self {
        Self {
            text: text.into(),
            token,
            depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Sub,
    Sup,
}

#[derive(Debug, Clone)]
pub enum MathItem {
    Leaf(MathString),
    List(MathList),
}

/// The display tree of an expression. A list built for a node remembers the
/// node and its path from the root; lists added for parentheses or scripts
/// carry no node.
#[derive(Debug, Clone)]
pub struct MathList {
    pub expr: Option<Expr>,
    pub descent: Vec<usize>,
    pub kind: Option<NodeKind>,
    pub script: Option<Script>,
    pub items: Vec<MathItem>,
}

impl MathList {
    pub fn new(expr: Option<Expr>, descent: Vec<usize>) -> Self {
        Self {
            expr,
            descent,
            kind: None,
            script: None,
            items: vec![],
        }
    }

    pub fn get(&self, address: &[usize]) -> Option<&MathItem> {
        let (&first, rest) = address.split_first()?;
        let item = self.items.get(first)?;
        if rest.is_empty() {
            return Some(item);
        }
        match item {
            MathItem::List(list) => list.get(rest),
            MathItem::Leaf(_) => None,
        }
    }

    pub fn leaf(&self, address: &[usize]) -> Option<&MathString> {
        match self.get(address)? {
            MathItem::Leaf(leaf) => Some(leaf),
            MathItem::List(_) => None,
        }
    }

    pub fn list_at(&self, address: &[usize]) -> Option<&MathList> {
        if address.is_empty() {
            return Some(self);
        }
        match self.get(address)? {
            MathItem::List(list) => Some(list),
            MathItem::Leaf(_) => None,
        }
    }

    fn list_at_mut(&mut self, address: &[usize]) -> Option<&mut MathList> {
        let Some((&first, rest)) = address.split_first() else {
            return Some(self);
        };
        match self.items.get_mut(first)? {
            MathItem::List(list) => list.list_at_mut(rest),
            MathItem::Leaf(_) => None,
        }
    }

    /// Inserts `item` so that it ends up at `address`.
    pub fn insert(&mut self, address: &[usize], item: MathItem) -> bool {
        let Some((&index, parent)) = address.split_last() else {
            return false;
        };
        match self.list_at_mut(parent) {
            Some(list) if index <= list.items.len() => {
                list.items.insert(index, item);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&mut self, address: &[usize]) -> Option<MathItem> {
        let (&index, parent) = address.split_last()?;
        let list = self.list_at_mut(parent)?;
        (index < list.items.len()).then(|| list.items.remove(index))
    }

    /// Addresses of all leaves, left to right.
    pub fn leaf_addresses(&self) -> Vec<Vec<usize>> {
        let mut addresses = vec![];
        self.collect_leaves(&mut vec![], &mut addresses);
        addresses
    }

    fn collect_leaves(&self, prefix: &mut Vec<usize>, addresses: &mut Vec<Vec<usize>>) {
        for (index, item) in self.items.iter().enumerate() {
            prefix.push(index);
            match item {
                MathItem::Leaf(_) => addresses.push(prefix.clone()),
                MathItem::List(list) => list.collect_leaves(prefix, addresses),
            }
            prefix.pop();
        }
    }

    /// Address of the outermost list satisfying `pred`, in preorder.
    pub fn find_list(&self, pred: &impl Fn(&MathList) -> bool) -> Option<Vec<usize>> {
        if pred(self) {
            return Some(vec![]);
        }
        for (index, item) in self.items.iter().enumerate() {
            if let MathItem::List(list) = item {
                if let Some(mut address) = list.find_list(pred) {
                    address.insert(0, index);
                    return Some(address);
                }
            }
        }
        None
    }

    /// Like `find_list`, but the rightmost of the outermost matches.
    pub fn find_last_list(&self, pred: &impl Fn(&MathList) -> bool) -> Option<Vec<usize>> {
        if pred(self) {
            return Some(vec![]);
        }
        self.items.iter().enumerate().rev().find_map(|(index, item)| match item {
            MathItem::List(list) => list.find_last_list(pred).map(|mut address| {
                address.insert(0, index);
                address
            }),
            MathItem::Leaf(_) => None,
        })
    }

    pub fn leaves_mut(&mut self) -> Vec<&mut MathString> {
        let mut leaves = vec![];
        for item in &mut self.items {
            match item {
                MathItem::Leaf(leaf) => leaves.push(leaf),
                MathItem::List(list) => leaves.extend(list.leaves_mut()),
            }
        }
        leaves
    }

    /// Concatenation of the leaves, with no formatting.
    pub fn raw_text(&self) -> String {
        let mut text = String::new();
        for item in &self.items {
            match item {
                MathItem::Leaf(leaf) => text.push_str(&leaf.text),
                MathItem::List(list) => text.push_str(&list.raw_text()),
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(text: &str) -> MathItem {
        MathItem::Leaf(MathString::new(text, TokenKind::Text, 0))
    }

    fn sample() -> MathList {
        let mut inner = MathList::new(None, vec![1]);
        inner.items = vec![leaf("b"), leaf("c")];
        let mut list = MathList::new(None, vec![]);
        list.items = vec![leaf("a"), MathItem::List(inner), leaf("d")];
        list
    }

    #[test]
    fn leaves_are_listed_left_to_right() {
        let list = sample();
        assert_eq!(
            list.leaf_addresses(),
            vec![vec![0], vec![1, 0], vec![1, 1], vec![2]]
        );
        assert_eq!(list.leaf(&[1, 1]).map(|l| l.text.as_str()), Some("c"));
        assert_eq!(list.raw_text(), "abcd");
    }

    #[test]
    fn insert_and_remove_nested_items() {
        let mut list = sample();
        assert!(list.insert(&[1, 1], leaf("|")));
        assert_eq!(list.raw_text(), "ab|cd");
        assert!(list.remove(&[1, 1]).is_some());
        assert_eq!(list.raw_text(), "abcd");
        assert!(!list.insert(&[0, 0], leaf("x")));
    }

    #[test]
    fn find_list_by_descent() {
        let list = sample();
        assert_eq!(list.find_list(&|l: &MathList| l.descent == [1]), Some(vec![1]));
        assert_eq!(list.find_list(&|l: &MathList| l.descent == [7]), None);
    }
}
