use serde::Serialize;

use crate::{
    becca::Becca,
    config::SearchDefaults,
    error::BeccaError,
    query::{
        context::{CancelToken, SearchContext},
        expression::{Comparator, DepthFilter, Expression, NoteProperty},
        lex::normalize,
        parse::parse_query,
    },
};

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Restrict results to strict descendants of this note. The root note means no restriction.
    pub ancestor_note_id: Option<String>,
    pub ancestor_depth: Option<DepthFilter>,
    pub include_archived: bool,
    /// Include the hidden subtree when no ancestor restriction applies.
    pub include_hidden: bool,
    /// Bare words match titles and attributes only, never content.
    pub fast_search: bool,
    /// Applied after ordering.
    pub limit: Option<usize>,
    pub cancel: CancelToken,
}

impl SearchOptions {
    pub fn from_defaults(defaults: &SearchDefaults) -> SearchOptions {
        SearchOptions {
            include_archived: defaults.include_archived,
            include_hidden: defaults.include_hidden,
            fast_search: defaults.fast_search,
            limit: defaults.limit,
            ..Default::default()
        }
    }

    pub fn with_ancestor<S: Into<String>>(mut self, ancestor_note_id: S) -> SearchOptions {
        self.ancestor_note_id = Some(ancestor_note_id.into());
        self
    }
}

/// Search results together with the evaluated expression tree.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub note_ids: Vec<String>,
    pub expression: Expression,
}

impl Becca {
    /// Find the live notes matching `query`, in result order.
    ///
    /// Query syntax errors are reported before any evaluation happens.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<String>, BeccaError> {
        Ok(self.search_with_debug(query, options)?.note_ids)
    }

    #[tracing::instrument(level = "debug", skip(self, options))]
    pub fn search_with_debug(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchOutcome, BeccaError> {
        let parsed = parse_query(query, options.fast_search)?;
        let expression = self.search_expression(parsed.expression, options);
        let ctx = SearchContext::new(self, options.fast_search, options.cancel.clone());
        ctx.check_cancelled()?;
        let found = expression.evaluate(&ctx.universe, &ctx)?;

        let mut note_ids = found.into_ids();
        if !expression.is_ordered() && !parsed.fulltext_tokens.is_empty() {
            let (mut title_matches, rest): (Vec<String>, Vec<String>) =
                note_ids.into_iter().partition(|note_id| {
                    self.get_note(note_id).is_some_and(|note| {
                        let title = normalize(&note.title);
                        parsed
                            .fulltext_tokens
                            .iter()
                            .all(|token| title.contains(token.as_str()))
                    })
                });
            title_matches.extend(rest);
            note_ids = title_matches;
        }
        if let Some(limit) = options.limit {
            note_ids.truncate(limit);
        }
        tracing::debug!("[Becca] search {query:?} matched {} notes", note_ids.len());
        Ok(SearchOutcome {
            note_ids,
            expression,
        })
    }

    /// Wrap a parsed query with the archive and subtree filters implied by `options`.
    pub fn search_expression(
        &self,
        parsed: Option<Expression>,
        options: &SearchOptions,
    ) -> Expression {
        let mut operands = Vec::new();
        if !options.include_archived {
            operands.push(Expression::PropertyComparison {
                property: NoteProperty::IsArchived,
                comparator: Comparator::equals("false"),
            });
        }
        match options.ancestor_note_id.as_deref() {
            Some(ancestor) if ancestor != self.root_note_id() => {
                operands.push(Expression::Ancestor {
                    note_id: ancestor.to_string(),
                    depth: options.ancestor_depth,
                    include_self: false,
                });
            }
            _ if !options.include_hidden => {
                operands.push(Expression::Not(Box::new(Expression::Ancestor {
                    note_id: self.config().hidden_subtree_root.clone(),
                    depth: None,
                    include_self: true,
                })));
            }
            _ => {}
        }
        operands.extend(parsed);
        Expression::And(operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_configured_defaults() {
        let defaults = SearchDefaults {
            include_archived: true,
            fast_search: true,
            limit: Some(3),
            ..Default::default()
        };
        let options = SearchOptions::from_defaults(&defaults).with_ancestor("books");
        assert!(options.include_archived);
        assert!(!options.include_hidden);
        assert!(options.fast_search);
        assert_eq!(options.limit, Some(3));
        assert_eq!(options.ancestor_note_id.as_deref(), Some("books"));
    }

    #[test]
    fn default_filters_exclude_archived_and_hidden() {
        let becca = Becca::default();
        let expression = becca.search_expression(None, &SearchOptions::default());
        match expression {
            Expression::And(operands) => {
                assert_eq!(operands.len(), 2);
                assert!(matches!(
                    operands[0],
                    Expression::PropertyComparison {
                        property: NoteProperty::IsArchived,
                        ..
                    }
                ));
                assert!(matches!(operands[1], Expression::Not(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
