use std::fmt;
use std::ops::Range;

use xdom::syntax::Syntax;

use crate::config::ConfigError;

/// Failures that abort a whole transformation.
///
/// The tree keeps the state of the last completed pass; nothing is rolled back.
#[derive(Debug, thiserror::Error)]
pub enum TransformationError {
    #[error("macro registry unavailable while resolving '{identifier}' for {syntax}: {source}")]
    RegistryUnavailable {
        identifier: String,
        syntax: Syntax,
        #[source]
        source: RegistryError,
    },

    /// Only raised in strict mode; otherwise unknown macros are warnings.
    #[error("unknown macro '{identifier}' for syntax {syntax}")]
    UnresolvedMacro {
        identifier: String,
        syntax: Syntax,
        span: Option<Range<usize>>,
    },

    #[error("invalid transformation config: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// A registry lookup that could not be answered (as opposed to "not found").
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct RegistryError {
    pub message: String,
}

impl RegistryError {
    pub fn new(message: impl Into<String>) -> Self {
        RegistryError {
            message: message.into(),
        }
    }
}

/// Raised by a macro implementation; the engine turns it into an inline error block.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct MacroExecutionError {
    pub message: String,
}

impl MacroExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        MacroExecutionError {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnresolvedMacro,
    MacroExecution,
    Placement,
    RecursionLimitExceeded,
}

/// A per-invocation problem recovered locally during a transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub identifier: String,
    pub message: String,
    /// Source span of the invocation, when it came from parsed text.
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    /// The pass (recursion depth) that produced the diagnostic.
    pub pass: usize,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        identifier: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            kind,
            identifier: identifier.into(),
            message: message.into(),
            span: None,
            source_id: 0,
            pass: 0,
        }
    }

    pub fn with_span(mut self, span: Option<Range<usize>>, source_id: usize) -> Self {
        self.span = span;
        self.source_id = source_id;
        self
    }

    pub fn in_pass(mut self, pass: usize) -> Self {
        self.pass = pass;
        self
    }

    /// Unknown macros and the recursion safeguard are warnings; failed
    /// executions and placement violations are errors shown in the output.
    pub fn is_warning(&self) -> bool {
        matches!(
            self.kind,
            DiagnosticKind::UnresolvedMacro | DiagnosticKind::RecursionLimitExceeded
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
