use std::fmt;
use std::str::FromStr;

/// Identifies the markup dialect a macro invocation was written against.
/// Macros are registered per syntax, so this is a registry lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Syntax {
    pub syntax_type: String,
    pub version: String,
}

impl Syntax {
    pub fn new(syntax_type: impl Into<String>, version: impl Into<String>) -> Self {
        Syntax {
            syntax_type: syntax_type.into(),
            version: version.into(),
        }
    }

    /// The default dialect read by [`crate::parser::Parser`].
    pub fn xwiki_2_0() -> Self {
        Syntax::new("xwiki", "2.0")
    }
}

impl Default for Syntax {
    fn default() -> Self {
        Syntax::xwiki_2_0()
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.syntax_type, self.version)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxParseError(pub String);

impl fmt::Display for SyntaxParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid syntax id '{}': expected <type>/<version>", self.0)
    }
}

impl std::error::Error for SyntaxParseError {}

impl FromStr for Syntax {
    type Err = SyntaxParseError;

    /// Parse a `type/version` id such as `xwiki/2.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((syntax_type, version)) if !syntax_type.is_empty() && !version.is_empty() => {
                Ok(Syntax::new(syntax_type.trim(), version.trim()))
            }
            _ => Err(SyntaxParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_agree() {
        let syntax = Syntax::new("confluence", "1.0");
        assert_eq!(syntax.to_string(), "confluence/1.0");
        assert_eq!("confluence/1.0".parse::<Syntax>().unwrap(), syntax);
    }

    #[test]
    fn rejects_missing_version() {
        assert!("xwiki".parse::<Syntax>().is_err());
        assert!("xwiki/".parse::<Syntax>().is_err());
        assert!("/2.0".parse::<Syntax>().is_err());
    }
}
