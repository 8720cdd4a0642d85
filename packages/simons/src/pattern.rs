use std::fmt::{self, Display};

use crate::{Error, Result, is_valid_name};

const WILDCARD: char = '*';

/// A glob-like pattern that matches Simon names.
///
/// Supported forms:
///
/// * `app.db.query` - matches exactly this name.
/// * `*` - matches every name.
/// * `app.db.*` - matches names starting with `app.db.`.
/// * `*.query` - matches names ending with `.query`.
/// * `app.*.query` - matches names starting with `app.` and ending with `.query`.
/// * `*db*` - matches names containing `db`.
///
/// Apart from the `*db*` form, at most one wildcard is allowed. Every literal part must
/// consist of characters allowed in Simon names.
///
/// Matching is a pure function of the name and does not depend on any registry state.
///
/// # Example
///
/// ```
/// use simons::SimonPattern;
///
/// let pattern = SimonPattern::new("app.db.*").unwrap();
///
/// assert!(pattern.matches("app.db.query"));
/// assert!(!pattern.matches("app.cache"));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimonPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Matcher {
    Exact(String),
    Contains(String),
    Affixes { prefix: String, suffix: String },
}

impl SimonPattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the pattern has more than one wildcard (other than
    /// the `*middle*` form) or contains characters not allowed in Simon names.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        let matcher = Self::parse(&source)?;

        Ok(Self { source, matcher })
    }

    /// A pattern that matches every name.
    #[must_use]
    pub fn any() -> Self {
        Self {
            source: WILDCARD.to_string(),
            matcher: Matcher::Contains(String::new()),
        }
    }

    fn parse(source: &str) -> Result<Matcher> {
        let invalid = |problem: &str| Error::InvalidPattern {
            pattern: source.to_string(),
            problem: problem.to_string(),
        };

        let wildcards = source.matches(WILDCARD).count();

        if wildcards == 0 {
            // The empty pattern exists only to select the root Simon.
            if !source.is_empty() && !is_valid_name(source) {
                return Err(invalid("contains characters not allowed in Simon names"));
            }

            return Ok(Matcher::Exact(source.to_string()));
        }

        if source.len() == 1 {
            return Ok(Matcher::Contains(String::new()));
        }

        if wildcards == 2 && source.len() > 2 {
            let Some(middle) = source
                .strip_prefix(WILDCARD)
                .and_then(|rest| rest.strip_suffix(WILDCARD))
            else {
                return Err(invalid("two wildcards are only allowed as *middle*"));
            };

            if !is_valid_name(middle) {
                return Err(invalid("contains characters not allowed in Simon names"));
            }

            return Ok(Matcher::Contains(middle.to_string()));
        }

        if wildcards > 1 {
            return Err(invalid("at most one wildcard is allowed"));
        }

        let (prefix, suffix) = source
            .split_once(WILDCARD)
            .ok_or_else(|| invalid("wildcard disappeared during parsing"))?;

        for part in [prefix, suffix] {
            if !part.is_empty() && !is_valid_name(part) {
                return Err(invalid("contains characters not allowed in Simon names"));
            }
        }

        Ok(Matcher::Affixes {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Whether `name` matches this pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match &self.matcher {
            Matcher::Exact(exact) => exact == name,
            Matcher::Contains(middle) => name.contains(middle.as_str()),
            Matcher::Affixes { prefix, suffix } => {
                name.len() >= prefix.len().saturating_add(suffix.len())
                    && name.starts_with(prefix.as_str())
                    && name.ends_with(suffix.as_str())
            }
        }
    }

    /// The textual form the pattern was created from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Display for SimonPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
