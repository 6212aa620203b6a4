//! Turns structured tokens into an [Expression] tree.
//!
//! Grammar, loosely:
//!
//! ```text
//! query      := or-expr [ordering]
//! or-expr    := and-expr ("or" and-expr)*
//! and-expr   := operand (["and"] operand)*
//! operand    := "(" or-expr ")" | "not" "(" or-expr ")" | attribute | "note" "." path | word+
//! attribute  := ("#" | "#!") name [op value] | ("~" | "~!") name ["." path]
//! path       := ("parents" | "children" | "ancestors") "." path
//!             | "labels" "." name [op value] | "relations" "." name ["." path]
//!             | property op value
//! ordering   := "orderby" key ["asc" | "desc"] ("," key ["asc" | "desc"])* ["limit" N]
//!             | "limit" N
//! ```
//!
//! Consecutive bare words form one full-text operand.

use crate::{
    error::BeccaError,
    properties::AttributeType,
    query::{
        expression::{Comparator, ComparisonOp, Expression, NoteProperty, OrderKey, OrderSource},
        lex::{lex, normalize, Token},
        parens::{structure, TokenTree},
    },
};

/// Output of [parse_query].
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    /// `None` for a query that selects everything (e.g. the empty query).
    pub expression: Option<Expression>,
    /// Normalized bare words, in query order.
    pub fulltext_tokens: Vec<String>,
}

/// Lex, structure and parse `query`. With `fast_search`, bare words only match note titles and
/// attributes, never content.
pub fn parse_query(query: &str, fast_search: bool) -> Result<ParsedQuery, BeccaError> {
    let tokens = lex(query)?;
    validate_operands(&tokens, query)?;
    let trees = structure(tokens, query)?;
    let mut parser = Parser {
        query,
        fast_search,
        fulltext_tokens: Vec::new(),
    };
    let expression = parser.parse_level(&trees, true)?;
    Ok(ParsedQuery {
        expression,
        fulltext_tokens: parser.fulltext_tokens,
    })
}

/// Every comparison operator must be followed by a value: not a paren, not another operator.
fn validate_operands(tokens: &[Token], query: &str) -> Result<(), BeccaError> {
    for (idx, token) in tokens.iter().enumerate() {
        if !token.is_operator() {
            continue;
        }
        match tokens.get(idx + 1) {
            Some(next) if !next.is_paren() && !next.is_operator() => {}
            Some(next) => {
                return Err(BeccaError::invalid_syntax(
                    query,
                    token.start,
                    next.end,
                    format!("Expected a value after operator '{}'", token.text),
                ))
            }
            None => {
                return Err(BeccaError::invalid_syntax(
                    query,
                    token.start,
                    token.end,
                    format!("Missing value after operator '{}'", token.text),
                ))
            }
        }
    }
    Ok(())
}

struct Parser<'a> {
    query: &'a str,
    fast_search: bool,
    fulltext_tokens: Vec<String>,
}

impl<'a> Parser<'a> {
    fn error<M: Into<String>>(&self, start: usize, end: usize, message: M) -> BeccaError {
        BeccaError::invalid_syntax(self.query, start, end, message)
    }

    /// Error located at `trees[idx]`, or at the end of the query when `idx` is past the end.
    fn error_at<M: Into<String>>(
        &self,
        trees: &[TokenTree],
        idx: usize,
        message: M,
    ) -> BeccaError {
        let (start, end) = match trees.get(idx) {
            Some(tree) => tree.span(),
            None => (self.query.len(), self.query.len()),
        };
        self.error(start, end, message)
    }

    fn token_at<'t>(&self, trees: &'t [TokenTree], idx: usize) -> Option<&'t Token> {
        trees.get(idx).and_then(TokenTree::as_token)
    }

    fn expect_dot(&self, trees: &[TokenTree], idx: usize) -> Result<(), BeccaError> {
        match self.token_at(trees, idx) {
            Some(token) if token.is(".") => Ok(()),
            _ => Err(self.error_at(trees, idx, "Expected '.'")),
        }
    }

    fn flush_words(&mut self, words: &mut Vec<String>, chain: &mut Vec<Expression>) {
        if words.is_empty() {
            return;
        }
        let tokens: Vec<String> = words.drain(..).map(|word| normalize(&word)).collect();
        self.fulltext_tokens.extend(tokens.iter().cloned());
        chain.push(if self.fast_search {
            Expression::NoteFlat { tokens }
        } else {
            Expression::Or(vec![
                Expression::NoteFlat {
                    tokens: tokens.clone(),
                },
                Expression::FullTextSearch { tokens },
            ])
        });
    }

    fn parse_level(
        &mut self,
        trees: &[TokenTree],
        top_level: bool,
    ) -> Result<Option<Expression>, BeccaError> {
        let mut alternatives = Vec::new();
        let mut chain = Vec::new();
        let mut words = Vec::new();
        let mut dangling: Option<&Token> = None;
        let mut ordering = None;
        let mut idx = 0;

        while idx < trees.len() {
            let token = match &trees[idx] {
                TokenTree::Group {
                    open,
                    children,
                    close,
                } => {
                    self.flush_words(&mut words, &mut chain);
                    chain.push(self.parse_group(open, children, close)?);
                    dangling = None;
                    idx += 1;
                    continue;
                }
                TokenTree::Token(token) => token,
            };
            if token.in_quotes {
                words.push(token.text.clone());
                dangling = None;
                idx += 1;
                continue;
            }
            match token.text.as_str() {
                "#" | "~" => idx += 1,
                "and" => {
                    if let Some(previous) = dangling {
                        return Err(self.error(
                            token.start,
                            token.end,
                            format!("Expected an expression after '{}'", previous.text),
                        ));
                    }
                    self.flush_words(&mut words, &mut chain);
                    if chain.is_empty() {
                        return Err(self.error(
                            token.start,
                            token.end,
                            "Expected an expression before 'and'",
                        ));
                    }
                    dangling = Some(token);
                    idx += 1;
                }
                "or" => {
                    if let Some(previous) = dangling {
                        return Err(self.error(
                            token.start,
                            token.end,
                            format!("Expected an expression after '{}'", previous.text),
                        ));
                    }
                    self.flush_words(&mut words, &mut chain);
                    let Some(conjunction) = Expression::and_of(std::mem::take(&mut chain)) else {
                        return Err(self.error(
                            token.start,
                            token.end,
                            "Expected an expression before 'or'",
                        ));
                    };
                    alternatives.push(conjunction);
                    dangling = Some(token);
                    idx += 1;
                }
                "not" => {
                    self.flush_words(&mut words, &mut chain);
                    let Some(TokenTree::Group {
                        open,
                        children,
                        close,
                    }) = trees.get(idx + 1)
                    else {
                        return Err(self.error(
                            token.start,
                            token.end,
                            "'not' must be followed by a parenthesized expression",
                        ));
                    };
                    let negated = self.parse_group(open, children, close)?;
                    chain.push(Expression::Not(Box::new(negated)));
                    dangling = None;
                    idx += 2;
                }
                "orderby" | "limit" => {
                    if !top_level {
                        return Err(self.error(
                            token.start,
                            token.end,
                            format!("'{}' is only allowed at the top level", token.text),
                        ));
                    }
                    self.flush_words(&mut words, &mut chain);
                    ordering = Some(self.parse_ordering(&trees[idx..])?);
                    break;
                }
                "note" if self.token_at(trees, idx + 1).is_some_and(|next| next.is(".")) => {
                    self.flush_words(&mut words, &mut chain);
                    let (expression, next) = self.parse_path(trees, idx + 2)?;
                    chain.push(expression);
                    dangling = None;
                    idx = next;
                }
                text if text.starts_with('#') || text.starts_with('~') => {
                    self.flush_words(&mut words, &mut chain);
                    let (expression, next) = self.parse_attribute(trees, idx)?;
                    chain.push(expression);
                    dangling = None;
                    idx = next;
                }
                "." | "," => {
                    return Err(self.error(
                        token.start,
                        token.end,
                        format!("Unexpected '{}'", token.text),
                    ))
                }
                _ if token.is_operator() => {
                    return Err(self.error(
                        token.start,
                        token.end,
                        format!("Misplaced comparison operator '{}'", token.text),
                    ))
                }
                _ => {
                    words.push(token.text.clone());
                    dangling = None;
                    idx += 1;
                }
            }
        }
        self.flush_words(&mut words, &mut chain);

        if let Some(token) = dangling {
            return Err(self.error(
                token.start,
                token.end,
                format!("Expected an expression after '{}'", token.text),
            ));
        }
        if let Some(conjunction) = Expression::and_of(chain) {
            alternatives.push(conjunction);
        }
        let expression = Expression::or_of(alternatives);
        Ok(match ordering {
            Some((keys, limit)) => Some(Expression::OrderBy {
                keys,
                limit,
                sub: Box::new(expression.unwrap_or(Expression::And(Vec::new()))),
            }),
            None => expression,
        })
    }

    fn parse_group(
        &mut self,
        open: &Token,
        children: &[TokenTree],
        close: &Token,
    ) -> Result<Expression, BeccaError> {
        if children.is_empty() {
            return Err(self.error(open.start, close.end, "Empty parentheses"));
        }
        self.parse_level(children, false)?
            .ok_or_else(|| self.error(open.start, close.end, "Expected an expression"))
    }

    fn parse_attribute(
        &mut self,
        trees: &[TokenTree],
        idx: usize,
    ) -> Result<(Expression, usize), BeccaError> {
        let Some(token) = self.token_at(trees, idx) else {
            return Err(self.error_at(trees, idx, "Expected an attribute"));
        };
        let mut chars = token.text.chars();
        let attribute_type = match chars.next() {
            Some('~') => AttributeType::Relation,
            _ => AttributeType::Label,
        };
        let rest = chars.as_str();
        let (negated, name) = match rest.strip_prefix('!') {
            Some(name) => (true, name),
            None => (false, rest),
        };
        if name.is_empty() {
            return Err(self.error(token.start, token.end, "Expected an attribute name"));
        }
        let (expression, next) = match attribute_type {
            AttributeType::Label => self.parse_label_tail(trees, idx + 1, name)?,
            AttributeType::Relation => self.parse_relation_tail(trees, idx + 1, name)?,
        };
        if negated {
            return Ok((Expression::Not(Box::new(expression)), next));
        }
        Ok((expression, next))
    }

    /// Optional `op value` after a label name at `idx`.
    fn parse_label_tail(
        &mut self,
        trees: &[TokenTree],
        idx: usize,
        name: &str,
    ) -> Result<(Expression, usize), BeccaError> {
        match self.token_at(trees, idx) {
            Some(op) if op.is_operator() => {
                let comparator = self.parse_comparison(trees, idx)?;
                Ok((
                    Expression::AttributeComparison {
                        attribute_type: AttributeType::Label,
                        name: name.to_string(),
                        comparator,
                    },
                    idx + 2,
                ))
            }
            _ => Ok((
                Expression::AttributeExists {
                    attribute_type: AttributeType::Label,
                    name: name.to_string(),
                },
                idx,
            )),
        }
    }

    /// Optional `.path` after a relation name at `idx`.
    fn parse_relation_tail(
        &mut self,
        trees: &[TokenTree],
        idx: usize,
        name: &str,
    ) -> Result<(Expression, usize), BeccaError> {
        match self.token_at(trees, idx) {
            Some(dot) if dot.is(".") => {
                let (condition, next) = self.parse_path(trees, idx + 1)?;
                Ok((
                    Expression::RelationWhere {
                        name: name.to_string(),
                        condition: Box::new(condition),
                    },
                    next,
                ))
            }
            Some(op) if op.is_operator() => Err(self.error(
                op.start,
                op.end,
                "A relation can only be compared through a property, e.g. ~author.title = value",
            )),
            _ => Ok((
                Expression::AttributeExists {
                    attribute_type: AttributeType::Relation,
                    name: name.to_string(),
                },
                idx,
            )),
        }
    }

    /// `op value` at `idx`.
    fn parse_comparison(&self, trees: &[TokenTree], idx: usize) -> Result<Comparator, BeccaError> {
        let Some(op_token) = self.token_at(trees, idx).filter(|token| token.is_operator()) else {
            return Err(self.error_at(trees, idx, "Expected a comparison operator"));
        };
        let Some(op) = ComparisonOp::from_token(&op_token.text) else {
            return Err(self.error(
                op_token.start,
                op_token.end,
                format!("Unrecognized comparison operator '{}'", op_token.text),
            ));
        };
        let Some(value) = self.token_at(trees, idx + 1) else {
            return Err(self.error_at(trees, idx + 1, "Expected a value"));
        };
        if !value.in_quotes
            && (value.text.starts_with('#') || value.text.starts_with('~') || value.text == "note")
        {
            return Err(self.error(
                value.start,
                value.end,
                format!(
                    "Comparison value must be a constant, quote it to search for '{}'",
                    value.text
                ),
            ));
        }
        Comparator::new(op, &value.text).map_err(|err| {
            self.error(
                value.start,
                value.end,
                format!("Invalid regular expression: {err}"),
            )
        })
    }

    /// Property path starting at `idx` (just after a `.`).
    fn parse_path(
        &mut self,
        trees: &[TokenTree],
        idx: usize,
    ) -> Result<(Expression, usize), BeccaError> {
        let Some(segment) = self.token_at(trees, idx) else {
            return Err(self.error_at(trees, idx, "Expected a property name"));
        };
        match segment.text.as_str() {
            "parents" | "children" | "ancestors" => {
                self.expect_dot(trees, idx + 1)?;
                let (inner, next) = self.parse_path(trees, idx + 2)?;
                let inner = Box::new(inner);
                let expression = match segment.text.as_str() {
                    "parents" => Expression::ChildOf(inner),
                    "children" => Expression::ParentOf(inner),
                    _ => Expression::DescendantOf(inner),
                };
                Ok((expression, next))
            }
            "labels" | "relations" => {
                self.expect_dot(trees, idx + 1)?;
                let Some(name) = self.token_at(trees, idx + 2) else {
                    return Err(self.error_at(trees, idx + 2, "Expected an attribute name"));
                };
                let name = name.text.clone();
                match segment.text.as_str() {
                    "labels" => self.parse_label_tail(trees, idx + 3, &name),
                    _ => self.parse_relation_tail(trees, idx + 3, &name),
                }
            }
            "text" => {
                let comparator = self.parse_comparison(trees, idx + 1)?;
                if comparator.op != ComparisonOp::Contains {
                    return Err(self.error(
                        segment.start,
                        segment.end,
                        "note.text only supports the '*=*' operator",
                    ));
                }
                Ok((
                    Expression::FullTextSearch {
                        tokens: vec![normalize(&comparator.value)],
                    },
                    idx + 3,
                ))
            }
            property => {
                let comparator = self.parse_comparison(trees, idx + 1)?;
                Ok((
                    Expression::PropertyComparison {
                        property: NoteProperty::from_name(property),
                        comparator,
                    },
                    idx + 3,
                ))
            }
        }
    }

    /// Trailing `orderby ... [limit N]` or `limit N`. Must consume all of `trees`.
    fn parse_ordering(
        &mut self,
        trees: &[TokenTree],
    ) -> Result<(Vec<OrderKey>, Option<usize>), BeccaError> {
        let mut keys = Vec::new();
        let mut limit = None;
        let mut idx = 0;
        if self.token_at(trees, idx).is_some_and(|token| token.is("orderby")) {
            idx += 1;
            loop {
                let (source, next) = self.parse_order_source(trees, idx)?;
                idx = next;
                let descending = match self.token_at(trees, idx) {
                    Some(token) if token.is("desc") => {
                        idx += 1;
                        true
                    }
                    Some(token) if token.is("asc") => {
                        idx += 1;
                        false
                    }
                    _ => false,
                };
                keys.push(OrderKey { source, descending });
                match self.token_at(trees, idx) {
                    Some(token) if token.is(",") => idx += 1,
                    _ => break,
                }
            }
        }
        if self.token_at(trees, idx).is_some_and(|token| token.is("limit")) {
            let count = self
                .token_at(trees, idx + 1)
                .and_then(|token| token.text.parse::<usize>().ok())
                .ok_or_else(|| self.error_at(trees, idx + 1, "'limit' requires a number"))?;
            limit = Some(count);
            idx += 2;
        }
        if idx < trees.len() {
            return Err(self.error_at(
                trees,
                idx,
                "Unexpected input after ordering; orderby and limit must end the query",
            ));
        }
        Ok((keys, limit))
    }

    fn parse_order_source(
        &self,
        trees: &[TokenTree],
        idx: usize,
    ) -> Result<(OrderSource, usize), BeccaError> {
        let Some(token) = self.token_at(trees, idx) else {
            return Err(self.error_at(trees, idx, "Expected a sort key"));
        };
        if let Some(name) = token.text.strip_prefix('#').filter(|_| !token.in_quotes) {
            return Ok((OrderSource::Label(name.to_string()), idx + 1));
        }
        if !token.is("note") {
            return Err(self.error(
                token.start,
                token.end,
                "Sort keys are written as note.<property>, note.labels.<name> or #<label>",
            ));
        }
        self.expect_dot(trees, idx + 1)?;
        let Some(property) = self.token_at(trees, idx + 2) else {
            return Err(self.error_at(trees, idx + 2, "Expected a property name"));
        };
        if property.is("labels") {
            self.expect_dot(trees, idx + 3)?;
            let Some(name) = self.token_at(trees, idx + 4) else {
                return Err(self.error_at(trees, idx + 4, "Expected a label name"));
            };
            return Ok((OrderSource::Label(name.text.clone()), idx + 5));
        }
        Ok((
            OrderSource::Property(NoteProperty::from_name(&property.text)),
            idx + 3,
        ))
    }
}
