use std::collections::BTreeSet;

use tracing::{debug, warn};
use xdom::XDom;
use xdom::block::path::BlockPath;
use xdom::block::{Block, MacroMarker};
use xdom::syntax::Syntax;

use crate::config::TransformConfig;
use crate::error::{Diagnostic, DiagnosticKind, TransformationError};
use crate::executor::execute_pass;
use crate::registry::MacroRegistry;
use crate::resolver::resolve_invocations;
use crate::scheduler::schedule;

/// Summary of a completed transformation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformReport {
    /// Passes that expanded at least one invocation.
    pub passes: usize,
    /// Invocations replaced by a marker, including failed ones.
    pub expansions: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl TransformReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_warning())
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: TransformReport) {
        self.passes += other.passes;
        self.expansions += other.expansions;
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Expands macro invocations until none are left or the pass limit is hit.
pub struct MacroTransformation<'r> {
    registry: &'r dyn MacroRegistry,
    config: TransformConfig,
}

impl<'r> MacroTransformation<'r> {
    pub fn new(registry: &'r dyn MacroRegistry) -> Self {
        MacroTransformation {
            registry,
            config: TransformConfig::default(),
        }
    }

    pub fn with_config(mut self, config: TransformConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Run passes of resolve, schedule and execute over `dom`.
    ///
    /// Macro output may contain new invocations; they are picked up by the
    /// next pass. Once `max_depth` passes have run, invocations produced by
    /// the last pass are frozen as macro references and reported.
    ///
    /// On error the tree keeps every substitution made by completed passes.
    pub fn transform(
        &self,
        dom: &mut XDom,
        syntax: &Syntax,
    ) -> Result<TransformReport, TransformationError> {
        self.config.validate()?;

        let mut report = TransformReport::default();
        let mut reported_unresolved = BTreeSet::new();
        let mut depth = 0;

        loop {
            depth += 1;
            let resolution = resolve_invocations(dom, syntax, self.registry)?;
            debug!(
                pass = depth,
                resolved = resolution.resolved.len(),
                unresolved = resolution.unresolved.len(),
                "resolved invocations"
            );

            for unresolved in resolution.unresolved {
                if self.config.strict {
                    warn!(identifier = %unresolved.identifier, "unknown macro in strict mode");
                    return Err(TransformationError::UnresolvedMacro {
                        identifier: unresolved.identifier,
                        syntax: syntax.clone(),
                        span: unresolved.span,
                    });
                }
                // The node stays put, so later passes find it again.
                if reported_unresolved.insert(unresolved.path) {
                    report.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::UnresolvedMacro,
                            unresolved.identifier.clone(),
                            format!(
                                "unknown macro '{}' for syntax {}",
                                unresolved.identifier, syntax
                            ),
                        )
                        .with_span(unresolved.span, dom.source_id)
                        .in_pass(depth),
                    );
                }
            }

            if resolution.resolved.is_empty() {
                break;
            }

            let scheduled = schedule(resolution.resolved, self.config.priority_order);
            let outcome = execute_pass(dom, syntax, scheduled, depth);
            report.passes = depth;
            report.expansions += outcome.executed;
            report.diagnostics.extend(outcome.diagnostics);

            if depth >= self.config.max_depth {
                self.stop_recursion(dom, &outcome.markers, depth, &mut report);
                break;
            }
        }

        debug!(
            passes = report.passes,
            expansions = report.expansions,
            diagnostics = report.diagnostics.len(),
            "macro transformation finished"
        );
        Ok(report)
    }

    /// Freeze every invocation produced by the last pass so the tree holds no
    /// unexpanded invocation when the limit is reached.
    fn stop_recursion(
        &self,
        dom: &mut XDom,
        markers: &[BlockPath],
        depth: usize,
        report: &mut TransformReport,
    ) {
        let pending: Vec<BlockPath> = dom
            .invocations()
            .into_iter()
            .filter(|(path, _, _)| markers.iter().any(|marker| marker.is_ancestor_of(path)))
            .map(|(path, _, _)| path)
            .collect();

        for path in pending {
            let Some(Block::MacroInvocation(invocation)) = dom.get(&path) else {
                continue;
            };
            let call = invocation.call.clone();
            let span = invocation.span.clone();

            warn!(
                identifier = %call.identifier,
                path = %path,
                max_depth = self.config.max_depth,
                "macro recursion limit reached"
            );
            report.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::RecursionLimitExceeded,
                    call.identifier.clone(),
                    format!(
                        "macro '{}' not expanded: recursion limit of {} passes reached",
                        call.identifier, self.config.max_depth
                    ),
                )
                .with_span(span, dom.source_id)
                .in_pass(depth),
            );

            let reference = Block::MacroReference(call.clone());
            dom.replace(
                &path,
                Block::MacroMarker(MacroMarker {
                    call,
                    children: vec![reference],
                }),
            );
        }
    }
}
