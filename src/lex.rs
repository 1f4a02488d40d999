use std::iter::FusedIterator;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A named input with the offsets at which its lines start.
#[derive(Debug)]
pub struct File {
    name: String,
    text: String,
    line_starts: Vec<usize>,
}

impl File {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(offset, _)| offset + 1))
            .collect();
        Self {
            name: name.into(),
            text,
            line_starts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// One-based line and column, in characters, of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.text.len());
        // the first line starts at 0, so at least one start precedes `offset`
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let start = self.line_starts[line - 1];
        (line, self.text[start..offset].chars().count() + 1)
    }

    /// A one-based line without its newline.
    pub fn line(&self, line: usize) -> &str {
        line.checked_sub(1)
            .and_then(|index| self.line_starts.get(index))
            .and_then(|&start| self.text[start..].split('\n').next())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct SourceInfo {
    range: Range<usize>,
    file: Arc<File>,
}

impl SourceInfo {
    pub fn new(file: Arc<File>, range: Range<usize>) -> Self {
        Self { range, file }
    }

    pub fn eof(file: Arc<File>) -> Self {
        let end = file.text().len();
        Self::new(file, end..end)
    }

    pub fn as_str(&self) -> &str {
        self.file.text().get(self.range.clone()).unwrap_or("")
    }

    pub fn line_column(&self) -> (usize, usize) {
        self.file.position(self.range.start)
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (line, column) = self.line_column();
        let width = self.as_str().chars().count().max(1);
        writeln!(f, "{}:{line}:{column}\n", self.file.name())?;
        writeln!(f, "{}", self.file.line(line))?;
        writeln!(f, "{:pad$}{}", "", "^".repeat(width), pad = column - 1)
    }
}

/// The markers of the prover's output, and the text between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Item,      // ¿¿¿
    Open,      // ¿(
    Close,     // ¿)
    Comma,     // ¿,
    InfoOpen,  // ¿[
    InfoClose, // ¿]
    InfoSep,   // ¿/
    HasType,   // ¿=
    Text,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub source_info: SourceInfo,
}

impl Token {
    pub fn is_text(&self) -> bool {
        self.kind == TokenKind::Text
    }

    pub fn as_str(&self) -> &str {
        self.source_info.as_str()
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?} {}\n{}", self.kind, self.as_str(), self.source_info)
    }
}

#[derive(Debug, Clone)]
pub struct Lex {
    file: Arc<File>,
    position: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LexState {
    position: usize,
}

#[derive(Debug, Clone, Error)]
#[error("unrecognizable marker at {source_info}")]
pub struct LexError {
    source_info: SourceInfo,
}

impl From<Lex> for LexError {
    fn from(lex: Lex) -> Self {
        let start = std::cmp::min(lex.position, lex.file.text().len());
        let end = lex.file.text()[start..]
            .chars()
            .take(2)
            .fold(start, |end, c| end + c.len_utf8());
        Self {
            source_info: SourceInfo::new(lex.file, start..end),
        }
    }
}

impl Lex {
    pub fn new(file: Arc<File>) -> Self {
        Self { file, position: 0 }
    }

    pub fn input(&self) -> &Arc<File> {
        &self.file
    }

    pub fn save(&self) -> LexState {
        LexState {
            position: self.position,
        }
    }

    pub fn restore(&mut self, state: LexState) {
        self.position = state.position;
    }

    fn advance(&mut self, bytes: usize) -> SourceInfo {
        let source_info =
            SourceInfo::new(Arc::clone(&self.file), self.position..self.position + bytes);
        self.position += bytes;
        source_info
    }

    pub fn is_eof(&self) -> bool {
        self.clone().next().is_none()
    }
}

impl Iterator for Lex {
    type Item = std::result::Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        static RE: Lazy<Regex> = Lazy::new(|| {
            let s = &[
                (TokenKind::Item, r"¿¿¿"),
                (TokenKind::Open, r"¿\("),
                (TokenKind::Close, r"¿\)"),
                (TokenKind::Comma, r"¿, ?"),
                (TokenKind::InfoOpen, r"¿\["),
                (TokenKind::InfoClose, r"¿\]"),
                (TokenKind::InfoSep, r"¿/ ?"),
                (TokenKind::HasType, r"¿= ?"),
                (TokenKind::Text, r"[^¿]+"),
            ]
            .iter()
            .map(|(kind, re)| format!("(?P<{:?}>{})", kind, re))
            .collect::<Vec<_>>()
            .join("|");
            Regex::new(&format!("^(?:{})", s)).unwrap()
        });
        const KINDS: [TokenKind; 9] = [
            TokenKind::Item,
            TokenKind::Open,
            TokenKind::Close,
            TokenKind::Comma,
            TokenKind::InfoOpen,
            TokenKind::InfoClose,
            TokenKind::InfoSep,
            TokenKind::HasType,
            TokenKind::Text,
        ];

        loop {
            if self.file.text().len() == self.position {
                return None;
            }
            let input = Arc::clone(&self.file);
            let cap = match RE.captures(&input.text()[self.position..]) {
                None => return Some(Err(LexError::from(self.clone()))),
                Some(cap) => cap,
            };
            let Some(kind) = KINDS
                .into_iter()
                .find(|kind| cap.name(&format!("{kind:?}")).is_some())
            else {
                return Some(Err(LexError::from(self.clone())));
            };
            let len = cap.get(0).map_or(0, |m| m.len());
            let source_info = self.advance(len);
            // blank text between markers is layout
            if kind == TokenKind::Text && source_info.as_str().trim().is_empty() {
                continue;
            }
            return Some(Ok(Token { kind, source_info }));
        }
    }
}

impl FusedIterator for Lex {}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        let file = Arc::new(File::new("<test>", input.to_owned()));
        Lex::new(file)
            .map(|token| token.expect("lexing failed"))
            .collect()
    }

    #[test]
    fn markers_and_text() {
        let tokens = tokenize("¿¿¿object: LOCAL_CONSTANT¿[name: x¿/ identifier: 1¿]¿= TYPE");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Item,
                TokenKind::Text,
                TokenKind::InfoOpen,
                TokenKind::Text,
                TokenKind::InfoSep,
                TokenKind::Text,
                TokenKind::InfoClose,
                TokenKind::HasType,
                TokenKind::Text,
            ]
        );
        assert_eq!(tokens[1].as_str(), "object: LOCAL_CONSTANT");
        assert_eq!(tokens[5].as_str(), "identifier: 1");
        assert_eq!(tokens[8].as_str(), "TYPE");
    }

    #[test]
    fn blank_text_is_skipped() {
        let tokens = tokenize("¿¿¿\n  \n¿¿¿");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn positions_count_lines_and_characters() {
        let file = File::new("<test>", "¿¿¿a\nbé¿x\n");
        assert_eq!(file.position(0), (1, 1));
        assert_eq!(file.position(13), (2, 4));
        assert_eq!(file.line(2), "bé¿x");
        assert_eq!(file.line(3), "");
        assert_eq!(file.line(0), "");
    }

    #[test]
    fn lone_marker_is_an_error() {
        let file = Arc::new(File::new("<test>", "PROP¿x"));
        let mut lex = Lex::new(file);
        let first = lex.next().expect("first token").expect("lexing first token");
        assert_eq!(first.as_str(), "PROP");
        let err = lex.next().expect("second token").unwrap_err();
        assert!(err.to_string().contains("<test>:1:5"), "{err}");
    }
}
