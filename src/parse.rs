//! Reader for the context and target descriptions printed by the prover.
//!
//! ```text
//! entry    ::= "¿¿¿" ("object:" | "property" info? ":") expr
//! expr     ::= name info? children? ("¿=" expr)?
//! children ::= "¿(" expr ("¿," expr)* "¿)"
//! info     ::= "¿[" field ("¿/" field)* "¿]"
//! ```

use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;

use crate::expr::{Expr, Info};
use crate::goal::{Goal, ProofState};
use crate::lex::{File, Lex, LexError, SourceInfo, Token, TokenKind};
use crate::node::NodeKind;
use crate::session::Session;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("tokenize error")]
    Lex {
        #[from]
        lex_error: LexError,
    },
    #[error("parse error: {message} at {source_info}")]
    Parse {
        message: String,
        source_info: String,
    },
    #[error("unexpected end of input at {source_info}")]
    Eof { source_info: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Object,
    Property,
}

/// One item of the prover's output: a named object or property, whose math
/// type is the statement shown to the user.
#[derive(Debug, Clone)]
pub struct Entry {
    pub kind: EntryKind,
    pub expr: Expr,
}

pub struct Parser<'a> {
    lex: &'a mut Lex,
    session: &'a mut Session,
}

impl<'a> Parser<'a> {
    pub fn new(lex: &'a mut Lex, session: &'a mut Session) -> Self {
        Self { lex, session }
    }

    fn fail<R>(token: Token, message: impl Into<String>) -> Result<R, ParseError> {
        Err(ParseError::Parse {
            message: message.into(),
            source_info: token.source_info.to_string(),
        })
    }

    fn eof_error(&self) -> ParseError {
        ParseError::Eof {
            source_info: SourceInfo::eof(Arc::clone(self.lex.input())).to_string(),
        }
    }

    fn optional<F, R>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Self) -> Result<R, ParseError>,
    {
        let state = self.lex.save();
        match f(self) {
            Ok(m) => Some(m),
            Err(_err) => {
                self.lex.restore(state);
                None
            }
        }
    }

    fn peek_opt(&mut self) -> Option<Token> {
        self.optional(|this| this.peek())
    }

    fn peek(&mut self) -> Result<Token, ParseError> {
        self.lex
            .clone()
            .next()
            .transpose()?
            .ok_or_else(|| self.eof_error())
    }

    fn advance(&mut self) {
        // only called after a successful peek
        let _ = self.lex.next();
    }

    pub fn eof(&mut self) -> Result<(), ParseError> {
        if let Some(token) = self.peek_opt() {
            Self::fail(token, "expected end of input but markers remain")?;
        }
        Ok(())
    }

    fn any_token(&mut self) -> Result<Token, ParseError> {
        self.lex.next().transpose()?.ok_or_else(|| self.eof_error())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        let token = self.any_token()?;
        if token.kind != kind {
            return Self::fail(token, format!("expected {kind:?}"));
        }
        Ok(token)
    }

    fn expect_opt(&mut self, kind: TokenKind) -> Option<Token> {
        if let Some(token) = self.peek_opt() {
            if token.kind == kind {
                self.advance();
                return Some(token);
            }
        }
        None
    }

    fn text(&mut self) -> Result<Token, ParseError> {
        self.expect(TokenKind::Text)
    }

    pub fn entry(&mut self) -> Result<Entry, ParseError> {
        self.expect(TokenKind::Item)?;
        let head = self.text()?;
        let text = head.as_str().trim();
        let (kind, rest) = if let Some(rest) = text.strip_prefix("object:") {
            (EntryKind::Object, rest.to_owned())
        } else if let Some(rest) = text.strip_prefix("property:") {
            (EntryKind::Property, rest.to_owned())
        } else if text == "property" {
            // the info of the property repeats that of its node
            let _ = self.info()?;
            let colon = self.text()?;
            let Some(rest) = colon.as_str().trim().strip_prefix(':') else {
                return Self::fail(colon, "expected ':' after property");
            };
            (EntryKind::Property, rest.to_owned())
        } else {
            return Self::fail(head, "expected 'object:' or 'property'");
        };
        let name = rest.split_whitespace().next().unwrap_or_default();
        let Some(node_kind) = NodeKind::from_name(name) else {
            return Self::fail(head, format!("unknown node '{name}'"));
        };
        let mut expr = self.node(node_kind)?;
        if kind == EntryKind::Property && expr.name().map_or(true, str::is_empty) {
            let info = Info {
                name: Some(self.session.fresh_property_name()),
                ..expr.info().clone()
            };
            log::debug!("anonymous property named {}", info.name.as_deref().unwrap_or_default());
            expr = Expr::new(expr.kind(), info, expr.children().to_vec(), expr.math_type().cloned());
        }
        if expr.math_type().is_none() {
            log::warn!("entry {} has no type", expr.display_name());
        }
        Ok(Entry { kind, expr })
    }

    pub fn expr(&mut self) -> Result<Expr, ParseError> {
        let token = self.text()?;
        let Some(kind) = NodeKind::from_name(token.as_str()) else {
            let name = token.as_str().trim().to_owned();
            return Self::fail(token, format!("unknown node '{name}'"));
        };
        self.node(kind)
    }

    fn node(&mut self, kind: NodeKind) -> Result<Expr, ParseError> {
        let info = self.info()?;
        let mut children = vec![];
        if self.expect_opt(TokenKind::Open).is_some() {
            loop {
                children.push(self.expr()?);
                let token = self.any_token()?;
                match token.kind {
                    TokenKind::Comma => continue,
                    TokenKind::Close => break,
                    _ => return Self::fail(token, "expected '¿,' or '¿)'"),
                }
            }
        }
        if kind.is_atom() && !children.is_empty() {
            log::warn!("{kind} node with {} children", children.len());
        }
        let math_type = match self.expect_opt(TokenKind::HasType) {
            Some(_) => Some(self.expr()?),
            None => None,
        };
        Ok(self
            .session
            .from_info_and_children(kind, info, children, math_type))
    }

    fn info(&mut self) -> Result<Info, ParseError> {
        let mut info = Info::default();
        if self.expect_opt(TokenKind::InfoOpen).is_none() {
            return Ok(info);
        }
        loop {
            let field = self.text()?;
            let Some((key, value)) = field.as_str().split_once(':') else {
                return Self::fail(field, "expected 'key: value'");
            };
            let value = value.trim().to_owned();
            match key.trim() {
                "name" => info.name = Some(value),
                "lean_name" => info.lean_name = Some(value),
                "identifier" => info.identifier = Some(value),
                "value" => info.value = Some(value),
                "binder_info" => info.binder_info = Some(value),
                "pp_type" | "type" => {}
                other => log::debug!("ignoring field {other}"),
            }
            let token = self.any_token()?;
            match token.kind {
                TokenKind::InfoSep => continue,
                TokenKind::InfoClose => break,
                _ => return Self::fail(token, "expected '¿/' or '¿]'"),
            }
        }
        Ok(info)
    }
}

/// Every entry of a prover output, in order.
pub fn parse_entries(
    session: &mut Session,
    file_name: &str,
    text: &str,
) -> Result<Vec<Entry>, ParseError> {
    let mut lex = Lex::new(Arc::new(File::new(file_name, text)));
    let mut entries = vec![];
    while !lex.is_eof() {
        let mut parser = Parser::new(&mut lex, session);
        entries.push(parser.entry()?);
    }
    log::debug!("read {} entries from {file_name}", entries.len());
    Ok(entries)
}

/// The goals described by a list of targets. Only the first goal gets the
/// context.
pub fn parse_proof_state(
    session: &mut Session,
    context: &str,
    targets: &str,
) -> anyhow::Result<ProofState> {
    let context: Vec<Expr> = parse_entries(session, "<context>", context)
        .context("invalid context")?
        .into_iter()
        .map(|entry| entry.expr)
        .collect();
    let targets = parse_entries(session, "<targets>", targets).context("invalid targets")?;
    let mut goals = vec![];
    for (index, target) in targets.into_iter().enumerate() {
        let context = if index == 0 { context.clone() } else { vec![] };
        goals.push(Goal::new(context, target.expr));
    }
    Ok(ProofState::new(goals)?)
}

pub fn parse_goal(session: &mut Session, context: &str, targets: &str) -> anyhow::Result<Goal> {
    let state = parse_proof_state(session, context, targets)?;
    Ok(state.main_goal().clone())
}
