use once_cell::sync::Lazy;
use regex::Regex;

/// Unicode rendering of a macro, spaces included.
pub fn utf8_macro(name: &str) -> Option<&'static str> {
    let text = match name {
        r"\and" => " ∧ ",
        r"\or" => " ∨ ",
        r"\not" => "¬",
        r"\implies" => " ⇒ ",
        r"\iff" => " ⇔ ",
        r"\true" => "True",
        r"\false" => "False",
        r"\forall" => "∀",
        r"\exists" => "∃",
        r"\exists_unique" => "∃!",
        r"\in" => " ∈ ",
        r"\notin" => " ∉ ",
        r"\subset" => " ⊂ ",
        r"\cap" => " ∩ ",
        r"\cup" => " ∪ ",
        r"\setminus" => " ∖ ",
        r"\complement" => "ᶜ",
        r"\emptyset" => "∅",
        r"\inverse" => "⁻¹",
        r"\powerset" => "𝒫",
        r"\lbrace" => "{",
        r"\rbrace" => "}",
        r"\lparen" => "(",
        r"\rparen" => ")",
        r"\sep" => ", ",
        r"\comma" => ", ",
        r"\colon" => ": ",
        r"\such_that" => " | ",
        r"\plus" => " + ",
        r"\minus" => " - ",
        r"\mult" => " × ",
        r"\div" => " / ",
        r"\neg" => "-",
        r"\equal" => " = ",
        r"\neq" => " ≠ ",
        r"\lt" => " < ",
        r"\leq" => " ≤ ",
        r"\gt" => " > ",
        r"\geq" => " ≥ ",
        r"\to" => " → ",
        r"\mapsto" => " ↦ ",
        r"\circ" => " ∘ ",
        r"\type" => "a set",
        r"\prop" => "a proposition",
        r"\metavar" => "□",
        r"\cursor" => "‸",
        _ => return None,
    };
    Some(text)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn html_span(class: &str, content: &str) -> String {
    format!("<span class=\"{class}\">{content}</span>")
}

/// Final cleanup of a rendered string: odd characters are normalised and
/// runs of spaces collapsed.
pub fn post_format(text: &str) -> String {
    static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \u{a0}]{2,}").unwrap());
    let text = text.replace('′', "'").replace('\u{a0}', " ");
    SPACES.replace_all(&text, " ").trim().to_owned()
}
