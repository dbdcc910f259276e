//! The string-token grammar.
//!
//! A token is `name` or `name:arg1,arg2,...` - a plain identifier optionally
//! followed by one colon and a comma-separated argument block. The split
//! happens on the FIRST colon only; arguments are raw strings with no
//! escaping, so a comma always separates and later colons stay inside the
//! argument they appear in. An empty argument block (`name:`) behaves as if
//! no block were present.

/// A parsed string token, borrowing from the raw form.
///
/// # Example
///
/// ```
/// use strata_core::Token;
///
/// let token = Token::parse("gate:foo,bar");
/// assert_eq!(token.name, "gate");
/// assert_eq!(token.args, vec!["foo", "bar"]);
///
/// let bare = Token::parse("web");
/// assert_eq!(bare.name, "web");
/// assert!(bare.args.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The identifier before the first colon.
    pub name: &'a str,
    /// The comma-split argument block, empty when absent.
    pub args: Vec<&'a str>,
}

impl<'a> Token<'a> {
    /// Parses a raw token string.
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        match raw.split_once(':') {
            Some((name, block)) if !block.is_empty() => Self {
                name,
                args: block.split(',').collect(),
            },
            Some((name, _)) => Self { name, args: Vec::new() },
            None => Self { name: raw, args: Vec::new() },
        }
    }

    /// Returns `true` if the token carries an argument block.
    #[must_use]
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }

    /// Copies the arguments into owned strings.
    #[must_use]
    pub fn owned_args(&self) -> Vec<String> {
        self.args.iter().map(ToString::to_string).collect()
    }
}
