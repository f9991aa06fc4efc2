use tracing::trace;
use xdom::XDom;
use xdom::block::path::{BlockPath, Placement};
use xdom::block::{Block, MacroCall, MacroMarker};
use xdom::syntax::Syntax;

use crate::error::{Diagnostic, DiagnosticKind};
use crate::macros::MacroContext;
use crate::resolver::ResolvedInvocation;

/// What one pass of execution did to the tree.
#[derive(Debug, Default)]
pub struct PassOutcome {
    /// Invocations replaced by a marker, successful or not.
    pub executed: usize,
    /// Paths of the markers written this pass, in execution order.
    pub markers: Vec<BlockPath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Execute `scheduled` in order, replacing each invocation with a marker.
///
/// Each macro sees the tree as left by the macros scheduled before it. A macro
/// that cannot run (wrong placement, invalid call, execution failure) still
/// gets a marker, wrapping an error block instead of its output.
pub fn execute_pass(
    dom: &mut XDom,
    syntax: &Syntax,
    scheduled: Vec<ResolvedInvocation<'_>>,
    pass: usize,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    for resolved in scheduled {
        let Some(Block::MacroInvocation(invocation)) = dom.get(&resolved.path) else {
            continue;
        };
        let call = invocation.call.clone();
        let span = invocation.span.clone();

        let children = match run(dom, syntax, &resolved, &call) {
            Ok(mut children) => {
                forget_spans(&mut children);
                trace!(
                    pass,
                    path = %resolved.path,
                    identifier = %call.identifier,
                    blocks = children.len(),
                    "executed macro"
                );
                children
            }
            Err((kind, cause)) => {
                trace!(
                    pass,
                    path = %resolved.path,
                    identifier = %call.identifier,
                    error = cause.as_str(),
                    "macro failed"
                );
                let block = Block::Error {
                    message: format!("Failed to execute the [{}] macro", call.identifier),
                    description: Some(cause.clone()),
                };
                outcome.diagnostics.push(
                    Diagnostic::new(kind, call.identifier.clone(), cause)
                        .with_span(span, dom.source_id)
                        .in_pass(pass),
                );
                vec![block]
            }
        };

        dom.replace(
            &resolved.path,
            Block::MacroMarker(MacroMarker { call, children }),
        );
        outcome.executed += 1;
        outcome.markers.push(resolved.path);
    }

    outcome
}

fn run(
    dom: &XDom,
    syntax: &Syntax,
    resolved: &ResolvedInvocation<'_>,
    call: &MacroCall,
) -> Result<Vec<Block>, (DiagnosticKind, String)> {
    let implementation = resolved.implementation;

    if resolved.placement == Placement::Inline && !implementation.supports_inline_mode() {
        return Err((
            DiagnosticKind::Placement,
            format!(
                "the [{}] macro is a standalone macro and cannot be used inline",
                call.identifier
            ),
        ));
    }

    implementation
        .descriptor()
        .validate(call)
        .map_err(|err| (DiagnosticKind::MacroExecution, err.message))?;

    let context = MacroContext::new(dom, syntax, &resolved.path, resolved.placement, call);
    implementation
        .execute(&call.parameters, call.raw_content.as_deref(), &context)
        .map_err(|err| (DiagnosticKind::MacroExecution, err.message))
}

/// Spans in macro output point into the macro's own markup, not the document.
fn forget_spans(blocks: &mut [Block]) {
    for block in blocks {
        if let Block::MacroInvocation(invocation) = block {
            invocation.span = None;
        } else if let Some(children) = block.children_mut() {
            forget_spans(children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xdom::block::{MacroCall, MacroInvocation};

    #[test]
    fn macro_output_spans_are_cleared() {
        let nested = MacroInvocation::new(MacroCall::new("inner"), Syntax::xwiki_2_0())
            .with_span(0..9);
        let mut blocks = vec![Block::Group(vec![Block::Paragraph(vec![
            Block::Word("x".into()),
            Block::MacroInvocation(nested),
        ])])];

        forget_spans(&mut blocks);

        let dom = XDom::new(blocks);
        let (_, invocation, _) = &dom.invocations()[0];
        assert_eq!(invocation.span, None);
    }
}
