//! Rendering of expressions: shape resolution, expansion into a math list,
//! localisation, and formatting to utf8, html or Lean source.

pub mod cursor;
pub mod format;
pub mod locale;
pub mod math_list;
pub mod paren;
pub mod shape;

use crate::expr::Expr;
use crate::goal::is_property;
use crate::node::NodeKind;
use crate::pattern::MatchContext;
use crate::session::Session;

use self::cursor::MathCursor;
use self::format::{escape_html, html_span, post_format, utf8_macro};
use self::math_list::{MathItem, MathList, MathString, Script, TokenKind};
use self::paren::{lean_needs_paren, needs_paren};
use self::shape::{
    is_composition, is_indexed, latex_shape, lean_shape, text_shape, type_text_shape, PatternShape,
    Shape, ShapeItem,
};

pub const PLACEHOLDER: &str = "***";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Utf8,
    Html,
    Lean,
}

/// The shape chosen for a node, with the match that selected it.
struct Resolved<'s> {
    shape: Shape,
    kind: NodeKind,
    rule: Option<(&'s PatternShape, MatchContext)>,
}

/// The kind standing for the generic notation of `expr` when deciding
/// parentheses.
fn notation_kind(expr: &Expr) -> NodeKind {
    match expr.kind() {
        NodeKind::Application
            if expr.children().len() == 3 && expr.child(0).is_some_and(is_composition) =>
        {
            NodeKind::Composite
        }
        NodeKind::Lambda if is_indexed(expr) => NodeKind::Application,
        kind => kind,
    }
}

fn leaf(text: impl Into<String>, token: TokenKind, depth: usize) -> MathItem {
    MathItem::Leaf(MathString::new(text, token, depth))
}

pub struct Displayer<'a> {
    session: &'a Session,
    format: Format,
    text_depth: usize,
}

impl<'a> Displayer<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            format: Format::default(),
            text_depth: 0,
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Nodes less than `depth` levels below the root are written in words.
    pub fn text_depth(mut self, depth: usize) -> Self {
        self.text_depth = depth;
        self
    }

    pub fn math_list(&self, expr: &Expr) -> MathList {
        let mut list = self.expand(expr, vec![]);
        self.text_pass(&mut list);
        list
    }

    pub fn display(&self, expr: &Expr) -> String {
        self.render(&self.math_list(expr))
    }

    pub fn cursor(&self, expr: &Expr) -> MathCursor {
        MathCursor::new(self.math_list(expr))
    }

    /// The rendering with the cursor mark, and the position of the mark in
    /// characters.
    pub fn render_cursor(&self, cursor: &MathCursor) -> (String, Option<usize>) {
        let mut cursor = cursor.clone();
        cursor.show_cursor();
        let text = self.render(cursor.list());
        // offsets count characters of the plain rendering, not markup
        let plain = match self.format {
            Format::Html => Displayer {
                format: Format::Utf8,
                ..*self
            }
            .render(cursor.list()),
            _ => text.clone(),
        };
        let offset = plain.chars().position(|c| c == '‸');
        (text, offset)
    }

    /// Describes a type. With a positive text depth this reads "a subset of
    /// X"; otherwise it is the type itself, "𝒫(X)".
    pub fn math_type_to_string(&self, math_type: &Expr) -> String {
        if self.text_depth > 0 && self.format != Format::Lean {
            if let Some(shape) = type_text_shape(math_type) {
                let resolved = Resolved {
                    shape,
                    kind: math_type.kind(),
                    rule: None,
                };
                let mut list = MathList::new(Some(math_type.clone()), vec![]);
                list.kind = Some(resolved.kind);
                list.items = self.expand_shape(math_type, &resolved.shape, &resolved, &[]);
                self.text_pass(&mut list);
                return self.render(&list);
            }
        }
        self.display(math_type)
    }

    /// `name: type` line of a context entry.
    pub fn context_entry(&self, entry: &Expr) -> String {
        let name = self.display(entry);
        match entry.math_type() {
            Some(ty) if is_property(entry) => format!("{name}: {}", self.display(ty)),
            Some(ty) => format!("{name}: {}", self.math_type_to_string(ty)),
            None => name,
        }
    }

    fn resolve(&self, expr: &Expr, depth: usize) -> Resolved<'a> {
        let generic = |shape| Resolved {
            shape,
            kind: notation_kind(expr),
            rule: None,
        };
        if self.format == Format::Lean {
            return generic(lean_shape(expr).unwrap_or_default());
        }
        if depth < self.text_depth {
            if let Some(shape) = text_shape(expr) {
                return generic(shape);
            }
        }
        let session: &'a Session = self.session;
        let config = session.config();
        for rule in session.display_rules() {
            if rule.bounded && !config.use_bounded_quantification_notation {
                continue;
            }
            let mut ctx = MatchContext::new();
            if ctx.match_pattern(&rule.pattern, expr) {
                log::trace!("display rule for {} applies to {expr}", rule.kind);
                return Resolved {
                    shape: rule.shape.clone(),
                    kind: rule.kind,
                    rule: Some((rule, ctx)),
                };
            }
        }
        generic(latex_shape(expr))
    }

    fn expand(&self, expr: &Expr, descent: Vec<usize>) -> MathList {
        let resolved = self.resolve(expr, descent.len());
        let items = self.expand_shape(expr, &resolved.shape, &resolved, &descent);
        let mut list = MathList::new(Some(expr.clone()), descent);
        list.kind = Some(resolved.kind);
        list.items = items;
        list
    }

    fn expand_shape(
        &self,
        expr: &Expr,
        shape: &[ShapeItem],
        resolved: &Resolved<'_>,
        descent: &[usize],
    ) -> Vec<MathItem> {
        let depth = descent.len();
        let mut items = vec![];
        for item in shape {
            match item {
                ShapeItem::Macro(name) => items.push(leaf(*name, TokenKind::Macro, depth)),
                ShapeItem::Text(text) => items.push(leaf(text.as_str(), TokenKind::Text, depth)),
                ShapeItem::Child(index) => {
                    items.push(self.child_item(expr, &[*index], resolved.kind, descent))
                }
                ShapeItem::Descendant(path) => {
                    items.push(self.child_item(expr, path, resolved.kind, descent))
                }
                ShapeItem::Callable(f) => {
                    items.extend(self.expand_shape(expr, &f(expr), resolved, descent))
                }
                ShapeItem::Meta(index) => items.push(self.meta_item(expr, *index, resolved, descent)),
                ShapeItem::Name => items.push(self.name_leaf(expr, depth)),
                ShapeItem::Value => {
                    let value = expr.value().map_or_else(|| expr.display_name(), str::to_owned);
                    items.push(leaf(value, TokenKind::Number, depth))
                }
                ShapeItem::Sub(inner) | ShapeItem::Sup(inner) => {
                    let mut list = MathList::new(None, descent.to_vec());
                    list.script = Some(match item {
                        ShapeItem::Sub(_) => Script::Sub,
                        _ => Script::Sup,
                    });
                    list.items = self.expand_shape(expr, inner, resolved, descent);
                    items.push(MathItem::List(list));
                }
            }
        }
        if items.is_empty() {
            items.push(self.placeholder(expr, depth));
        }
        items
    }

    fn child_item(
        &self,
        expr: &Expr,
        path: &[usize],
        parent: NodeKind,
        descent: &[usize],
    ) -> MathItem {
        let Some(child) = expr.descendant(path) else {
            return self.placeholder(expr, descent.len());
        };
        let mut child_descent = descent.to_vec();
        child_descent.extend_from_slice(path);
        let list = self.expand(child, child_descent);
        self.parenthesise(parent, list, path.last().copied().unwrap_or(0))
    }

    fn meta_item(
        &self,
        expr: &Expr,
        index: usize,
        resolved: &Resolved<'_>,
        descent: &[usize],
    ) -> MathItem {
        let witness = resolved
            .rule
            .as_ref()
            .and_then(|(rule, ctx)| rule.metavars.get(index).and_then(|m| ctx.get(m)));
        let Some(witness) = witness else {
            return self.placeholder(expr, descent.len());
        };
        match expr.path_to(witness) {
            Some(path) if !path.is_empty() => self.child_item(expr, &path, resolved.kind, descent),
            _ => {
                let list = self.expand(witness, descent.to_vec());
                self.parenthesise(resolved.kind, list, 0)
            }
        }
    }

    fn parenthesise(&self, parent: NodeKind, list: MathList, index: usize) -> MathItem {
        let Some(child) = list.kind else {
            return MathItem::List(list);
        };
        let paren = match self.format {
            Format::Lean => lean_needs_paren(parent, child, index),
            Format::Utf8 | Format::Html => needs_paren(parent, child, index),
        };
        if !paren {
            return MathItem::List(list);
        }
        let depth = list.descent.len();
        let mut wrapper = MathList::new(None, list.descent.clone());
        wrapper.items = vec![
            leaf("(", TokenKind::Paren, depth),
            MathItem::List(list),
            leaf(")", TokenKind::Paren, depth),
        ];
        MathItem::List(wrapper)
    }

    fn name_leaf(&self, expr: &Expr, depth: usize) -> MathItem {
        let token = match expr.kind() {
            NodeKind::BoundVar => TokenKind::DummyVariable,
            NodeKind::LocalConstant if is_property(expr) => TokenKind::Property,
            NodeKind::LocalConstant => TokenKind::Variable,
            _ => TokenKind::Text,
        };
        leaf(expr.display_name(), token, depth)
    }

    fn placeholder(&self, expr: &Expr, depth: usize) -> MathItem {
        log::warn!("no {:?} shape for {}", self.format, expr.kind());
        leaf(PLACEHOLDER, TokenKind::Placeholder, depth)
    }

    fn text_pass(&self, list: &mut MathList) {
        if self.text_depth == 0 || self.format == Format::Lean {
            return;
        }
        let language = self.session.config().select_language;
        for leaf in list.leaves_mut() {
            if leaf.token != TokenKind::Macro || leaf.depth >= self.text_depth {
                continue;
            }
            if let Some(word) = locale::word(&leaf.text, language) {
                leaf.text = word.to_owned();
                leaf.token = TokenKind::Text;
            }
        }
    }

    pub fn render(&self, list: &MathList) -> String {
        let mut out = String::new();
        self.render_list(list, &mut out);
        post_format(&out)
    }

    fn render_list(&self, list: &MathList, out: &mut String) {
        let Some(script) = list.script else {
            for item in &list.items {
                self.render_item(item, out);
            }
            return;
        };
        let mut inner = String::new();
        for item in &list.items {
            self.render_item(item, &mut inner);
        }
        let inner = inner.trim();
        let rendered = match (self.format, script) {
            (Format::Html, Script::Sub) => format!("<sub>{inner}</sub>"),
            (Format::Html, Script::Sup) => format!("<sup>{inner}</sup>"),
            (_, script) => {
                let mark = if script == Script::Sub { '_' } else { '^' };
                if inner.chars().count() == 1 {
                    format!("{mark}{inner}")
                } else {
                    format!("{mark}{{{inner}}}")
                }
            }
        };
        out.push_str(&rendered);
    }

    fn render_item(&self, item: &MathItem, out: &mut String) {
        match item {
            MathItem::Leaf(leaf) => self.render_leaf(leaf, out),
            MathItem::List(list) => self.render_list(list, out),
        }
    }

    fn render_leaf(&self, leaf: &MathString, out: &mut String) {
        let text = match leaf.token {
            TokenKind::Macro => match utf8_macro(&leaf.text) {
                Some(text) => text,
                None => {
                    log::warn!("no rendering for macro {}", leaf.text);
                    PLACEHOLDER
                }
            },
            TokenKind::Cursor => "‸",
            _ => leaf.text.as_str(),
        };
        if self.format != Format::Html {
            out.push_str(text);
            return;
        }
        let config = self.session.config();
        let class = match leaf.token {
            TokenKind::Variable if config.use_color_for_variables => Some("variable"),
            TokenKind::DummyVariable if config.use_color_for_dummy_variables => {
                Some("dummy_variable")
            }
            TokenKind::Property
                if config.use_color_for_applied_properties
                    && self.session.is_property_used(&leaf.text) =>
            {
                Some("used_property")
            }
            TokenKind::Cursor => Some("cursor"),
            _ => None,
        };
        let text = escape_html(text);
        match class {
            Some(class) => out.push_str(&html_span(class, &text)),
            None => out.push_str(&text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::cursor::Side;
    use super::*;
    use crate::config::{Config, Language};
    use crate::expr::Info;

    fn set(name: &str) -> Expr {
        Expr::local_constant(name, Some(Expr::universe()))
    }

    fn app(f: &Expr, x: &Expr) -> Expr {
        Expr::application(f, x).unwrap()
    }

    fn elem(name: &str, ty: &Expr) -> Expr {
        Expr::local_constant(name, Some(ty.clone()))
    }

    #[test]
    fn parenthesised_set_operations() {
        let session = Session::default();
        let x = set("X");
        let sub = Expr::set_of(x.clone());
        let (a, b, c) = (elem("A", &sub), elem("B", &sub), elem("C", &sub));
        let union = Expr::new(NodeKind::Union, Info::default(), vec![b, c], Some(sub.clone()));
        let inter = Expr::new(NodeKind::Inter, Info::default(), vec![a, union], Some(sub));
        let expr = Expr::proposition(NodeKind::Belongs, vec![elem("x", &x), inter]);
        let displayer = Displayer::new(&session);
        assert_eq!(displayer.display(&expr), "x ∈ A ∩ (B ∪ C)");
        assert_eq!(
            displayer.display(&expr),
            displayer.display(&expr),
            "rendering is deterministic"
        );
    }

    #[test]
    fn bounded_quantifier_notation_follows_config() {
        let x = set("X");
        let a = elem("A", &Expr::set_of(x.clone()));
        let p = elem("P", &Expr::function_type(x.clone(), Expr::prop()));
        let var = Expr::bound_var("x", Some(x.clone()));
        let guard = Expr::proposition(NodeKind::Belongs, vec![var.clone(), a]);
        let body = Expr::proposition(NodeKind::Implies, vec![guard, app(&p, &var)]);
        let expr = Expr::binder(NodeKind::ForAll, &var, &body, Some(Expr::prop()));

        let session = Session::default();
        assert_eq!(Displayer::new(&session).display(&expr), "∀x ∈ A, P(x)");

        let session = Session::new(Config {
            use_bounded_quantification_notation: false,
            ..Default::default()
        });
        assert_eq!(
            Displayer::new(&session).display(&expr),
            "∀x ∈ X, x ∈ A ⇒ P(x)"
        );
    }

    #[test]
    fn negated_relations() {
        let session = Session::default();
        let x = set("X");
        let (a, b) = (elem("a", &x), elem("b", &x));
        let eq = Expr::proposition(NodeKind::Equal, vec![a.clone(), b]);
        let neq = Expr::proposition(NodeKind::Not, vec![eq]);
        let big_a = elem("A", &Expr::set_of(x));
        let belongs = Expr::proposition(NodeKind::Belongs, vec![a, big_a]);
        let notin = Expr::proposition(NodeKind::Not, vec![belongs]);
        let displayer = Displayer::new(&session);
        assert_eq!(displayer.display(&neq), "a ≠ b");
        assert_eq!(displayer.display(&notin), "a ∉ A");
    }

    #[test]
    fn composition_and_sequences() {
        let session = Session::default();
        let (x, y, z) = (set("X"), set("Y"), set("Z"));
        let f = elem("f", &Expr::function_type(x.clone(), y.clone()));
        let g = elem("g", &Expr::function_type(y.clone(), z.clone()));
        let comp = Expr::constant("composition", None);
        let gf = Expr::new(
            NodeKind::Application,
            Info::default(),
            vec![comp, g, f],
            Some(Expr::function_type(x.clone(), z)),
        );
        let displayer = Displayer::new(&session);
        assert_eq!(displayer.display(&gf), "g ∘ f");
        assert_eq!(displayer.display(&app(&gf, &elem("a", &x))), "(g ∘ f)(a)");

        let nat = Expr::constant("ℕ", Some(Expr::universe()));
        let seq_type = Expr::new(
            NodeKind::Sequence,
            Info::default(),
            vec![nat.clone(), x],
            Some(Expr::universe()),
        );
        let u = elem("u", &seq_type);
        let n = Expr::bound_var("n", Some(nat));
        let term = Expr::new(NodeKind::Application, Info::default(), vec![u, n.clone()], None);
        assert_eq!(displayer.display(&term), "u_n");
        let seq = Expr::lambda(&n, &term, Some(seq_type));
        assert_eq!(displayer.display(&seq), "(u_n)_{n ∈ ℕ}");
    }

    #[test]
    fn html_marks_variables() {
        let session = Session::default();
        let x = set("X");
        let var = Expr::bound_var("y", Some(x.clone()));
        let body = Expr::proposition(NodeKind::Less, vec![var.clone(), elem("a", &x)]);
        let expr = Expr::binder(NodeKind::Exists, &var, &body, Some(Expr::prop()));
        let html = Displayer::new(&session).format(Format::Html).display(&expr);
        assert_eq!(
            html,
            "∃<span class=\"dummy_variable\">y</span> ∈ <span class=\"variable\">X</span>, \
             <span class=\"dummy_variable\">y</span> &lt; <span class=\"variable\">a</span>"
        );
    }

    #[test]
    fn text_depth_uses_words() {
        let x = set("X");
        let p = elem("P", &Expr::function_type(x.clone(), Expr::prop()));
        let var = Expr::bound_var("x", Some(x.clone()));
        let expr = Expr::binder(NodeKind::ForAll, &var, &app(&p, &var), Some(Expr::prop()));

        let session = Session::default();
        let displayer = Displayer::new(&session).text_depth(1);
        assert_eq!(displayer.display(&expr), "for every x in X, P(x)");
        assert_eq!(
            displayer.math_type_to_string(&Expr::set_of(x.clone())),
            "a subset of X"
        );
        assert_eq!(
            Displayer::new(&session).math_type_to_string(&Expr::set_of(x.clone())),
            "𝒫(X)"
        );

        let mut config = Config::default();
        config.select_language = Language::Fr;
        let session = Session::new(config);
        let displayer = Displayer::new(&session).text_depth(1);
        assert_eq!(displayer.display(&expr), "pour tout x dans X, P(x)");
    }

    #[test]
    fn lean_output() {
        let session = Session::default();
        let x = set("X");
        let f = elem("f", &Expr::function_type(x.clone(), x.clone()));
        let a = elem("a", &x);
        let fa = app(&f, &a);
        let expr = Expr::proposition(NodeKind::Equal, vec![app(&f, &fa), a]);
        let displayer = Displayer::new(&session).format(Format::Lean);
        assert_eq!(displayer.display(&expr), "(f (f a)) = a");
    }

    #[test]
    fn missing_shapes_show_a_placeholder() {
        let session = Session::default();
        let x = set("X");
        let ext = Expr::new(
            NodeKind::SetExtension,
            Info::default(),
            vec![elem("a", &x)],
            Some(Expr::set_of(x)),
        );
        let displayer = Displayer::new(&session).format(Format::Lean);
        assert_eq!(displayer.display(&ext), PLACEHOLDER);
        assert_eq!(Displayer::new(&session).display(&ext), "{a}");
    }

    #[test]
    fn cursor_follows_subexpressions() {
        let session = Session::default();
        let x = set("X");
        let (a, b) = (elem("a", &x), elem("b", &x));
        let expr = Expr::proposition(NodeKind::Equal, vec![a, b.clone()]);
        let displayer = Displayer::new(&session);
        let mut cursor = displayer.cursor(&expr);
        assert_eq!(displayer.render_cursor(&cursor), ("‸a = b".to_owned(), Some(0)));
        assert!(cursor.go_to(&b));
        assert_eq!(cursor.descent(), vec![1]);
        assert_eq!(displayer.render_cursor(&cursor), ("a = b‸".to_owned(), Some(5)));
        assert!(cursor.go_to_descent(&[1], Side::Before));
        assert_eq!(displayer.render_cursor(&cursor).0, "a = ‸b");
    }

    #[test]
    fn cursor_goes_after_the_last_rendering_of_a_shared_term() {
        let session = Session::default();
        let a = elem("a", &set("X"));
        let expr = Expr::proposition(NodeKind::Equal, vec![a.clone(), a.clone()]);
        let displayer = Displayer::new(&session);
        let mut cursor = displayer.cursor(&expr);
        assert!(cursor.go_to(&a));
        assert_eq!(cursor.descent(), vec![1]);
        assert_eq!(displayer.render_cursor(&cursor), ("a = a‸".to_owned(), Some(5)));
    }

    #[test]
    fn html_cursor_offset_ignores_markup() {
        let session = Session::default();
        let x = set("X");
        let (a, b) = (elem("a", &x), elem("b", &x));
        let expr = Expr::proposition(NodeKind::Less, vec![a, b.clone()]);
        let displayer = Displayer::new(&session).format(Format::Html);
        let mut cursor = displayer.cursor(&expr);
        assert!(cursor.go_to(&b));
        let (html, offset) = displayer.render_cursor(&cursor);
        assert!(html.contains("&lt;"), "{html}");
        assert!(html.ends_with("<span class=\"cursor\">‸</span>"), "{html}");
        assert_eq!(offset, Some(5));
        assert_eq!(offset, Displayer::new(&session).render_cursor(&cursor).1);
    }

    #[test]
    fn html_marks_applied_properties() {
        let prop = Expr::proposition(NodeKind::True, vec![]);
        let (h, k) = (elem("H", &prop), elem("K", &prop));
        let mut session = Session::default();
        session.mark_property_used("H");
        let displayer = Displayer::new(&session).format(Format::Html);
        assert_eq!(displayer.display(&h), "<span class=\"used_property\">H</span>");
        assert_eq!(displayer.display(&k), "K");

        let session = Session::new(Config {
            use_color_for_applied_properties: false,
            ..Default::default()
        });
        assert_eq!(Displayer::new(&session).format(Format::Html).display(&h), "H");
    }
}
