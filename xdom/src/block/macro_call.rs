use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::block::Block;
use crate::syntax::Syntax;

/// Macro parameters. Ordered so that rendering and tracing are deterministic.
pub type Parameters = BTreeMap<String, String>;

/// The source of a macro call: what the author wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall {
    pub identifier: String,
    pub parameters: Parameters,
    pub raw_content: Option<String>,
}

impl MacroCall {
    pub fn new(identifier: impl Into<String>) -> Self {
        MacroCall {
            identifier: identifier.into(),
            parameters: Parameters::new(),
            raw_content: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.raw_content = Some(content.into());
        self
    }
}

/// Formats as `[id] [k1=v1, k2=v2] [content]`, with `null` for missing content.
impl fmt::Display for MacroCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] [", self.identifier)?;
        for (i, (name, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, "] [")?;
        match &self.raw_content {
            Some(content) => write!(f, "{}", content)?,
            None => write!(f, "null")?,
        }
        write!(f, "]")
    }
}

/// An unexpanded macro call, as produced by parsing or by another macro.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroInvocation {
    pub call: MacroCall,
    /// The dialect the call was written in.
    pub syntax: Syntax,
    /// Byte span in source, when the invocation came from parsed text.
    pub span: Option<Range<usize>>,
}

impl MacroInvocation {
    pub fn new(call: MacroCall, syntax: Syntax) -> Self {
        MacroInvocation {
            call,
            syntax,
            span: None,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn identifier(&self) -> &str {
        &self.call.identifier
    }
}

/// Records that `children` were generated by expanding `call`.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroMarker {
    pub call: MacroCall,
    pub children: Vec<Block>,
}

impl MacroMarker {
    pub fn identifier(&self) -> &str {
        &self.call.identifier
    }

    /// True when the marker stands for a call that was not expanded
    /// (it wraps only a macro reference).
    pub fn is_unexpanded(&self) -> bool {
        matches!(self.children.as_slice(), [Block::MacroReference(_)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_display_matches_event_format() {
        assert_eq!(MacroCall::new("toc").to_string(), "[toc] [] [null]");
        let call = MacroCall::new("code")
            .with_parameter("lang", "rust")
            .with_parameter("title", "x")
            .with_content("fn main() {}");
        assert_eq!(
            call.to_string(),
            "[code] [lang=rust, title=x] [fn main() {}]"
        );
    }

    #[test]
    fn unexpanded_marker_detection() {
        let call = MacroCall::new("loop");
        let marker = MacroMarker {
            call: call.clone(),
            children: vec![Block::MacroReference(call)],
        };
        assert!(marker.is_unexpanded());
    }
}
