use std::ops::Range;

use xdom::XDom;
use xdom::block::path::{BlockPath, Placement};
use xdom::syntax::Syntax;

use crate::error::TransformationError;
use crate::macros::Macro;
use crate::registry::MacroRegistry;

/// An invocation found in the tree together with the macro that will run it.
pub struct ResolvedInvocation<'r> {
    pub path: BlockPath,
    /// Index in document (pre-order) order among this pass's invocations.
    pub position: usize,
    pub placement: Placement,
    pub implementation: &'r dyn Macro,
}

impl ResolvedInvocation<'_> {
    pub fn priority(&self) -> i32 {
        self.implementation.priority()
    }
}

/// An invocation the registry has no macro for. It stays in the tree as is.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedInvocation {
    pub path: BlockPath,
    pub identifier: String,
    pub span: Option<Range<usize>>,
}

#[derive(Default)]
pub struct Resolution<'r> {
    pub resolved: Vec<ResolvedInvocation<'r>>,
    pub unresolved: Vec<UnresolvedInvocation>,
}

/// Find every invocation in the tree and look it up for `syntax`.
///
/// A registry failure aborts resolution; nothing has been changed yet.
pub fn resolve_invocations<'r>(
    dom: &XDom,
    syntax: &Syntax,
    registry: &'r dyn MacroRegistry,
) -> Result<Resolution<'r>, TransformationError> {
    let mut resolution = Resolution::default();

    for (position, (path, invocation, placement)) in dom.invocations().into_iter().enumerate() {
        let identifier = invocation.identifier();
        let found = registry.resolve(identifier, syntax).map_err(|source| {
            TransformationError::RegistryUnavailable {
                identifier: identifier.to_string(),
                syntax: syntax.clone(),
                source,
            }
        })?;

        match found {
            Some(implementation) => resolution.resolved.push(ResolvedInvocation {
                path,
                position,
                placement,
                implementation,
            }),
            None => resolution.unresolved.push(UnresolvedInvocation {
                path,
                identifier: identifier.to_string(),
                span: invocation.span.clone(),
            }),
        }
    }

    Ok(resolution)
}
