//! The macro contract and the macros shipped with the engine.

pub mod builtin;
pub mod wiki;
pub mod xhtml;

use xdom::XDom;
use xdom::block::path::{BlockPath, Placement};
use xdom::block::{Block, MacroCall, Parameters};
use xdom::syntax::Syntax;

use crate::descriptor::MacroDescriptor;
use crate::error::MacroExecutionError;

/// A named, parameterized generator of replacement blocks.
pub trait Macro {
    fn descriptor(&self) -> &MacroDescriptor;

    /// Produce the blocks that replace the invocation. The output may itself
    /// contain invocations, which are expanded in the next pass.
    fn execute(
        &self,
        parameters: &Parameters,
        content: Option<&str>,
        context: &MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError>;

    fn supports_inline_mode(&self) -> bool {
        self.descriptor().supports_inline_mode
    }

    fn priority(&self) -> i32 {
        self.descriptor().priority
    }
}

/// Read-only view of the tree handed to a macro while it runs.
pub struct MacroContext<'a> {
    dom: &'a XDom,
    syntax: &'a Syntax,
    path: &'a BlockPath,
    placement: Placement,
    call: &'a MacroCall,
}

impl<'a> MacroContext<'a> {
    pub fn new(
        dom: &'a XDom,
        syntax: &'a Syntax,
        path: &'a BlockPath,
        placement: Placement,
        call: &'a MacroCall,
    ) -> Self {
        MacroContext {
            dom,
            syntax,
            path,
            placement,
            call,
        }
    }

    /// The whole tree as it stands before this invocation is replaced.
    pub fn dom(&self) -> &'a XDom {
        self.dom
    }

    /// The syntax the transformation targets.
    pub fn syntax(&self) -> &'a Syntax {
        self.syntax
    }

    pub fn path(&self) -> &'a BlockPath {
        self.path
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_inline(&self) -> bool {
        self.placement == Placement::Inline
    }

    pub fn call(&self) -> &'a MacroCall {
        self.call
    }
}
