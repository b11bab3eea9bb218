//! Directive lexer.
//!
//! A directive is a compact, whitespace separated string such as
//! `notnull index references={country onupdate=cascade}`. The lexer splits
//! it into a primary value and an ordered list of `name=value` modifiers.
//! Values may be wrapped in braces to carry whitespace; braces nest, and the
//! outermost pair is stripped. Modifier meaning is left to the caller.

/// Why a directive failed to lex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LexErrorKind {
    /// A `}` appeared with no matching `{`.
    #[error("too many closing braces")]
    UnmatchedClosingBrace,
    /// The input ended inside a `{ ... }` group.
    #[error("unclosed brace")]
    UnclosedBrace,
}

/// A directive syntax error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason} at byte {position} in {fragment:?}")]
pub struct LexError {
    /// Byte offset of the offending brace in the lexed input.
    pub position: usize,
    /// What went wrong.
    pub reason: LexErrorKind,
    /// The unconsumed input starting at the token that failed.
    pub fragment: String,
}

impl LexError {
    fn new(reason: LexErrorKind, position: usize, fragment: &str) -> Self {
        Self {
            position,
            reason,
            fragment: fragment.to_string(),
        }
    }
}

/// A `name=value` pair. Bare words yield an empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifier<'a> {
    /// Text before the first `=`.
    pub name: &'a str,
    /// Text after the first `=`, with enclosing braces removed.
    pub value: &'a str,
}

impl<'a> Modifier<'a> {
    /// Creates a modifier from its parts.
    #[must_use]
    pub const fn new(name: &'a str, value: &'a str) -> Self {
        Self { name, value }
    }

    /// Returns true if the modifier carried no value.
    #[must_use]
    pub const fn is_flag(&self) -> bool {
        self.value.is_empty()
    }
}

/// Cuts the first value off `s`.
///
/// Leading whitespace is skipped. A value starting with `{` runs to its
/// matching `}` and is returned without the enclosing braces; any other
/// value runs to the next whitespace outside braces. The remainder is
/// returned verbatim, leading whitespace included.
///
/// # Errors
///
/// Returns a [`LexError`] when braces are unbalanced.
///
/// # Example
///
/// ```rust
/// use oxide_ddl_core::lexer::cut_value;
///
/// let (value, rest) = cut_value("{notnull}    haha").unwrap();
/// assert_eq!(value, "notnull");
/// assert_eq!(rest, "    haha");
/// ```
pub fn cut_value(s: &str) -> Result<(&str, &str), LexError> {
    cut_value_at(s, 0)
}

/// Splits every token of `s` into a [`Modifier`], preserving order.
///
/// # Errors
///
/// Returns a [`LexError`] when braces are unbalanced.
pub fn lex_modifiers(s: &str) -> Result<Vec<Modifier<'_>>, LexError> {
    lex_modifiers_at(s, 0)
}

/// Cuts the primary value off `s` and lexes the rest as modifiers.
///
/// # Errors
///
/// Returns a [`LexError`] when braces are unbalanced.
///
/// # Example
///
/// ```rust
/// use oxide_ddl_core::lexer::{lex_value, Modifier};
///
/// let (value, modifiers) = lex_value("0 where={email LIKE '%gmail'}").unwrap();
/// assert_eq!(value, "0");
/// assert_eq!(modifiers, vec![Modifier::new("where", "email LIKE '%gmail'")]);
/// ```
pub fn lex_value(s: &str) -> Result<(&str, Vec<Modifier<'_>>), LexError> {
    let (value, rest) = cut_value_at(s, 0)?;
    let modifiers = lex_modifiers_at(rest, s.len() - rest.len())?;
    Ok((value, modifiers))
}

fn cut_value_at(s: &str, base: usize) -> Result<(&str, &str), LexError> {
    let trimmed = s.trim_start_matches(char::is_whitespace);
    if trimmed.is_empty() {
        return Ok(("", ""));
    }
    let offset = base + (s.len() - trimmed.len());
    let brace_quoted = trimmed.starts_with('{');

    // Byte offsets of currently open braces, outermost first.
    let mut open: Vec<usize> = Vec::new();
    let mut split_at = trimmed.len();
    for (i, c) in trimmed.char_indices() {
        match c {
            '{' => open.push(i),
            '}' => {
                if open.pop().is_none() {
                    return Err(LexError::new(
                        LexErrorKind::UnmatchedClosingBrace,
                        offset + i,
                        trimmed,
                    ));
                }
                if open.is_empty() && brace_quoted {
                    split_at = i + c.len_utf8();
                    break;
                }
            }
            c if open.is_empty() && c.is_whitespace() => {
                split_at = i;
                break;
            }
            _ => {}
        }
    }
    if let Some(&first) = open.first() {
        return Err(LexError::new(
            LexErrorKind::UnclosedBrace,
            offset + first,
            trimmed,
        ));
    }

    let (value, rest) = trimmed.split_at(split_at);
    let value = if brace_quoted {
        &value[1..value.len() - 1]
    } else {
        value
    };
    Ok((value, rest))
}

fn lex_modifiers_at(s: &str, base: usize) -> Result<Vec<Modifier<'_>>, LexError> {
    let mut modifiers = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let consumed = s.len() - rest.len();
        let (token, remainder) = cut_value_at(rest, base + consumed)?;
        rest = remainder;
        if token.is_empty() {
            continue;
        }
        let modifier = match token.split_once('=') {
            Some((name, value)) => Modifier::new(name, strip_braces(value)),
            None => Modifier::new(token, ""),
        };
        modifiers.push(modifier);
    }
    Ok(modifiers)
}

fn strip_braces(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('{') && value.ends_with('}') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
