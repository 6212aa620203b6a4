use serde::Serialize;

use crate::{error::BeccaError, query::lex::Token};

/// A token or a parenthesized group of token trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenTree {
    Token(Token),
    Group {
        open: Token,
        children: Vec<TokenTree>,
        close: Token,
    },
}

impl TokenTree {
    /// Byte span covered in the original query, parens included.
    pub fn span(&self) -> (usize, usize) {
        match self {
            TokenTree::Token(token) => (token.start, token.end),
            TokenTree::Group { open, close, .. } => (open.start, close.end),
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            TokenTree::Token(token) => Some(token),
            TokenTree::Group { .. } => None,
        }
    }

    fn flatten_into(&self, out: &mut Vec<Token>) {
        match self {
            TokenTree::Token(token) => out.push(token.clone()),
            TokenTree::Group {
                open,
                children,
                close,
            } => {
                out.push(open.clone());
                for child in children {
                    child.flatten_into(out);
                }
                out.push(close.clone());
            }
        }
    }
}

/// The token sequence `trees` was built from.
pub fn flatten(trees: &[TokenTree]) -> Vec<Token> {
    let mut tokens = Vec::new();
    for tree in trees {
        tree.flatten_into(&mut tokens);
    }
    tokens
}

/// Group `tokens` by their unquoted parentheses.
///
/// Errors with [BeccaError::UnbalancedParens] on a `)` without an open group, or on a `(` that is
/// never closed (reported at the innermost unclosed paren).
pub fn structure(tokens: Vec<Token>, query: &str) -> Result<Vec<TokenTree>, BeccaError> {
    let mut stack: Vec<(Option<Token>, Vec<TokenTree>)> = vec![(None, Vec::new())];
    for token in tokens {
        if token.is("(") {
            stack.push((Some(token), Vec::new()));
        } else if token.is(")") {
            if stack.len() == 1 {
                return Err(BeccaError::unbalanced_parens(query, token.start));
            }
            if let Some((Some(open), children)) = stack.pop() {
                let group = TokenTree::Group {
                    open,
                    children,
                    close: token,
                };
                if let Some((_, parent)) = stack.last_mut() {
                    parent.push(group);
                }
            }
        } else if let Some((_, current)) = stack.last_mut() {
            current.push(TokenTree::Token(token));
        }
    }
    match stack.pop() {
        Some((None, trees)) => Ok(trees),
        Some((Some(open), _)) => Err(BeccaError::unbalanced_parens(query, open.start)),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lex::lex;
    use serde_json::{json, Value};

    fn shape(trees: &[TokenTree]) -> Value {
        Value::Array(
            trees
                .iter()
                .map(|tree| match tree {
                    TokenTree::Token(token) => json!(token.text),
                    TokenTree::Group { children, .. } => shape(children),
                })
                .collect(),
        )
    }

    fn bare(texts: &[&str]) -> Vec<Token> {
        texts
            .iter()
            .enumerate()
            .map(|(idx, text)| Token::new(*text, false, idx, idx + 1))
            .collect()
    }

    #[test]
    fn nested_groups_take_their_shape() {
        let tokens = bare(&[
            "(", "hello", ")", "and", "(", "(", "pick", "one", ")", "and", "another", ")",
        ]);
        let trees = structure(tokens.clone(), "").unwrap();
        assert_eq!(
            shape(&trees),
            json!([["hello"], "and", [["pick", "one"], "and", "another"]])
        );
        assert_eq!(flatten(&trees), tokens);
    }

    #[test]
    fn quoted_parens_are_plain_tokens() {
        let query = "#title = \")\" and (#a)";
        let trees = structure(lex(query).unwrap(), query).unwrap();
        assert_eq!(shape(&trees), json!(["#title", "=", ")", "and", ["#a"]]));
    }

    #[test]
    fn unbalanced_parens_report_the_offending_paren() {
        let query = "(#a or (#b)";
        let err = structure(lex(query).unwrap(), query).unwrap_err();
        assert!(matches!(err, BeccaError::UnbalancedParens { position: 0, .. }));

        let query = "#a) or #b";
        let err = structure(lex(query).unwrap(), query).unwrap_err();
        assert!(matches!(err, BeccaError::UnbalancedParens { position: 2, .. }));
    }
}
