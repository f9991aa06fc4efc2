pub mod display;
pub mod macro_call;
pub mod path;

pub use macro_call::{MacroCall, MacroInvocation, MacroMarker, Parameters};

/// Inline formatting styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Bold,
    Italic,
    Strikethrough,
    Monospace,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Format::Bold => "BOLD",
            Format::Italic => "ITALIC",
            Format::Strikethrough => "STRIKEDOUT",
            Format::Monospace => "MONOSPACE",
        }
    }
}

/// A single node in the document tree.
///
/// Content variants are opaque to the macro engine; only `MacroInvocation`,
/// `MacroMarker` and `MacroReference` carry macro semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    // Block-level
    Paragraph(Vec<Block>),
    Heading {
        level: u8,
        children: Vec<Block>,
    },
    Quotation(Vec<Block>),
    List {
        ordered: bool,
        items: Vec<Block>,
    },
    ListItem(Vec<Block>),
    /// Neutral container, typically produced by macros.
    Group(Vec<Block>),
    /// An XML element, attributes in document order.
    XmlElement {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<Block>,
    },
    HorizontalLine,

    // Inline
    Word(String),
    Space,
    SpecialSymbol(char),
    NewLine,
    Format {
        format: Format,
        children: Vec<Block>,
    },
    Link {
        reference: String,
        children: Vec<Block>,
    },
    Verbatim {
        content: String,
        inline: bool,
    },

    /// Visible error indicator left where a macro failed.
    Error {
        message: String,
        description: Option<String>,
    },

    // Macros
    /// An unexpanded macro call.
    MacroInvocation(MacroInvocation),
    /// Transparent wrapper recording which call produced its children.
    MacroMarker(MacroMarker),
    /// Inert record of a call that was deliberately not expanded.
    MacroReference(MacroCall),
}

impl Block {
    /// Convenience constructor: a paragraph of words separated by spaces.
    pub fn paragraph_of(text: &str) -> Block {
        Block::Paragraph(words(text))
    }

    pub fn error(message: impl Into<String>) -> Block {
        Block::Error {
            message: message.into(),
            description: None,
        }
    }

    /// Child blocks, for every container variant. Leaves return an empty slice.
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Paragraph(children)
            | Block::Quotation(children)
            | Block::ListItem(children)
            | Block::Group(children)
            | Block::Heading { children, .. }
            | Block::XmlElement { children, .. }
            | Block::Format { children, .. }
            | Block::Link { children, .. } => children,
            Block::List { items, .. } => items,
            Block::MacroMarker(marker) => &marker.children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Block>> {
        match self {
            Block::Paragraph(children)
            | Block::Quotation(children)
            | Block::ListItem(children)
            | Block::Group(children)
            | Block::Heading { children, .. }
            | Block::XmlElement { children, .. }
            | Block::Format { children, .. }
            | Block::Link { children, .. } => Some(children),
            Block::List { items, .. } => Some(items),
            Block::MacroMarker(marker) => Some(&mut marker.children),
            _ => None,
        }
    }

    /// Containers whose children are inline content (a text run).
    pub fn is_inline_container(&self) -> bool {
        matches!(
            self,
            Block::Paragraph(_)
                | Block::Heading { .. }
                | Block::ListItem(_)
                | Block::Format { .. }
                | Block::Link { .. }
        )
    }

    pub fn as_invocation(&self) -> Option<&MacroInvocation> {
        match self {
            Block::MacroInvocation(invocation) => Some(invocation),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<&MacroMarker> {
        match self {
            Block::MacroMarker(marker) => Some(marker),
            _ => None,
        }
    }
}

/// Split plain text into `Word`, `Space` and `SpecialSymbol` blocks.
/// Runs of whitespace collapse into a single `Space`.
pub fn words(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut word = String::new();
    let mut in_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !word.is_empty() {
                blocks.push(Block::Word(std::mem::take(&mut word)));
            }
            if !in_space {
                blocks.push(Block::Space);
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if c.is_alphanumeric() {
            word.push(c);
        } else {
            if !word.is_empty() {
                blocks.push(Block::Word(std::mem::take(&mut word)));
            }
            blocks.push(Block::SpecialSymbol(c));
        }
    }
    if !word.is_empty() {
        blocks.push(Block::Word(word));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn words_splits_symbols_and_collapses_spaces() {
        assert_eq!(
            words("hi,  there"),
            vec![
                Block::Word("hi".into()),
                Block::SpecialSymbol(','),
                Block::Space,
                Block::Word("there".into()),
            ]
        );
    }

    #[test]
    fn leaves_have_no_children() {
        let mut word = Block::Word("x".into());
        assert!(word.children().is_empty());
        assert!(word.children_mut().is_none());
    }

    #[test]
    fn marker_exposes_its_children() {
        let marker = Block::MacroMarker(MacroMarker {
            call: MacroCall::new("m"),
            children: vec![Block::paragraph_of("a")],
        });
        assert_eq!(marker.children().len(), 1);
        assert!(!marker.is_inline_container());
    }
}
