use tracing::debug;
use xdom::XDom;
use xdom::syntax::Syntax;

use crate::error::TransformationError;
use crate::macro_transformation::{MacroTransformation, TransformReport};

/// A whole-tree rewrite applied as one step of rendering.
pub trait Transformation {
    fn name(&self) -> &str;

    /// Lower values run earlier.
    fn priority(&self) -> i32;

    fn transform(
        &self,
        dom: &mut XDom,
        syntax: &Syntax,
    ) -> Result<TransformReport, TransformationError>;
}

impl Transformation for MacroTransformation<'_> {
    fn name(&self) -> &str {
        "macro"
    }

    fn priority(&self) -> i32 {
        100
    }

    fn transform(
        &self,
        dom: &mut XDom,
        syntax: &Syntax,
    ) -> Result<TransformReport, TransformationError> {
        MacroTransformation::transform(self, dom, syntax)
    }
}

/// Runs registered transformations in priority order, registration order
/// breaking ties.
#[derive(Default)]
pub struct TransformationManager<'t> {
    transformations: Vec<Box<dyn Transformation + 't>>,
}

impl<'t> TransformationManager<'t> {
    pub fn new() -> Self {
        TransformationManager {
            transformations: Vec::new(),
        }
    }

    pub fn register(&mut self, transformation: Box<dyn Transformation + 't>) {
        self.transformations.push(transformation);
        self.transformations.sort_by_key(|t| t.priority());
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformations.iter().map(|t| t.name()).collect()
    }

    /// Apply every transformation to `dom`, stopping at the first failure.
    pub fn perform(
        &self,
        dom: &mut XDom,
        syntax: &Syntax,
    ) -> Result<TransformReport, TransformationError> {
        let mut report = TransformReport::default();
        for transformation in &self.transformations {
            debug!(name = transformation.name(), "applying transformation");
            report.merge(transformation.transform(dom, syntax)?);
        }
        Ok(report)
    }
}
