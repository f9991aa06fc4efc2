pub mod error;
pub mod macro_call;
mod markup;

pub use error::ParseError;

use crate::XDom;
use crate::block::Block;
use crate::syntax::Syntax;

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
    syntax: Syntax,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser {
            source,
            file_id,
            syntax: Syntax::xwiki_2_0(),
        }
    }

    /// Record `syntax` as the source syntax of every invocation read.
    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Parse the source markup into a document tree.
    pub fn parse(&self) -> Result<XDom, Vec<ParseError>> {
        let blocks = markup::parse_markup(&self.source, self.file_id, &self.syntax)?;
        Ok(XDom {
            blocks,
            source_id: self.file_id,
        })
    }
}

/// Parse a markup fragment, such as the body of a wiki macro, into blocks.
pub fn parse_fragment(source: &str, syntax: &Syntax) -> Result<Vec<Block>, Vec<ParseError>> {
    markup::parse_markup(source, 0, syntax)
}
