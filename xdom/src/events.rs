//! Event-stream view of a block tree.
//!
//! Containers produce a `Begin`/`End` pair around their children, leaves a
//! single `On` event. [`EventsWriter`] renders the stream one event per line,
//! e.g. `beginMacroMarker: [toc] [] [null]`, which is the format used by the
//! transformation tests and the `--events` CLI output.

use std::fmt::{self, Write};

use crate::block::Block;

#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Begin(&'a Block),
    End(&'a Block),
    On(&'a Block),
}

pub trait Listener {
    fn event(&mut self, event: Event<'_>);
}

/// Feed every block (pre-order) to `listener`.
pub fn traverse(blocks: &[Block], listener: &mut dyn Listener) {
    for block in blocks {
        traverse_block(block, listener);
    }
}

fn traverse_block(block: &Block, listener: &mut dyn Listener) {
    if is_container(block) {
        listener.event(Event::Begin(block));
        for child in block.children() {
            traverse_block(child, listener);
        }
        listener.event(Event::End(block));
    } else {
        listener.event(Event::On(block));
    }
}

fn is_container(block: &Block) -> bool {
    !matches!(
        block,
        Block::Word(_)
            | Block::Space
            | Block::SpecialSymbol(_)
            | Block::NewLine
            | Block::HorizontalLine
            | Block::Verbatim { .. }
            | Block::Error { .. }
            | Block::MacroInvocation(_)
            | Block::MacroReference(_)
    )
}

/// Writes one line per event into any `fmt::Write` sink.
pub struct EventsWriter<W: Write> {
    out: W,
    result: fmt::Result,
}

impl<W: Write> EventsWriter<W> {
    pub fn new(out: W) -> Self {
        EventsWriter {
            out,
            result: Ok(()),
        }
    }

    pub fn finish(self) -> Result<W, fmt::Error> {
        self.result.map(|_| self.out)
    }

    fn line(&mut self, event: Event<'_>) -> fmt::Result {
        match event {
            Event::Begin(block) => writeln!(self.out, "begin{}", describe(block)),
            Event::End(block) => writeln!(self.out, "end{}", describe(block)),
            Event::On(block) => writeln!(self.out, "on{}", describe(block)),
        }
    }
}

impl<W: Write> Listener for EventsWriter<W> {
    fn event(&mut self, event: Event<'_>) {
        if self.result.is_ok() {
            self.result = self.line(event);
        }
    }
}

/// The event name (without `begin`/`end`/`on`) plus its arguments.
fn describe(block: &Block) -> String {
    match block {
        Block::Paragraph(_) => "Paragraph".to_string(),
        Block::Heading { level, .. } => format!("Header: [{}]", level),
        Block::Quotation(_) => "Quotation".to_string(),
        Block::List { ordered, .. } => {
            let style = if *ordered { "NUMBERED" } else { "BULLETED" };
            format!("List: [{}]", style)
        }
        Block::ListItem(_) => "ListItem".to_string(),
        Block::Group(_) => "Group".to_string(),
        Block::XmlElement {
            name, attributes, ..
        } => {
            let attributes = attributes
                .iter()
                .map(|(key, value)| format!("{}={}", key, value))
                .collect::<Vec<_>>()
                .join(", ");
            format!("XMLElement: [{}] [{}]", name, attributes)
        }
        Block::HorizontalLine => "HorizontalLine".to_string(),
        Block::Word(word) => format!("Word: [{}]", word),
        Block::Space => "Space".to_string(),
        Block::SpecialSymbol(c) => format!("SpecialSymbol: [{}]", c),
        Block::NewLine => "NewLine".to_string(),
        Block::Format { format, .. } => format!("Format: [{}]", format.name()),
        Block::Link { reference, .. } => format!("Link: [{}]", reference),
        Block::Verbatim { content, inline } => {
            let kind = if *inline { "Inline" } else { "Standalone" };
            format!("Verbatim{}: [{}]", kind, content)
        }
        Block::Error { message, .. } => format!("Error: [{}]", message),
        Block::MacroInvocation(invocation) => format!("Macro: {}", invocation.call),
        // A reference reads like the call it stands for.
        Block::MacroReference(call) => format!("Macro: {}", call),
        Block::MacroMarker(marker) => format!("MacroMarker: {}", marker.call),
    }
}

/// Render `blocks` as an event listing.
pub fn to_events_string(blocks: &[Block]) -> String {
    let mut writer = EventsWriter::new(String::new());
    traverse(blocks, &mut writer);
    // Writing into a String cannot fail.
    writer.finish().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{MacroCall, MacroInvocation, MacroMarker};
    use crate::syntax::Syntax;
    use pretty_assertions::assert_eq;

    #[test]
    fn marker_wrapping_paragraph() {
        let blocks = vec![Block::MacroMarker(MacroMarker {
            call: MacroCall::new("testsimplemacro"),
            children: vec![Block::Paragraph(vec![Block::Word("simplemacro0".into())])],
        })];
        assert_eq!(
            to_events_string(&blocks),
            "beginMacroMarker: [testsimplemacro] [] [null]\n\
             beginParagraph\n\
             onWord: [simplemacro0]\n\
             endParagraph\n\
             endMacroMarker: [testsimplemacro] [] [null]\n"
        );
    }

    #[test]
    fn leaves_emit_single_events() {
        let blocks = vec![
            Block::MacroInvocation(MacroInvocation::new(
                MacroCall::new("missing").with_parameter("a", "1"),
                Syntax::xwiki_2_0(),
            )),
            Block::error("boom"),
            Block::Verbatim {
                content: "x".into(),
                inline: true,
            },
            Block::MacroReference(MacroCall::new("frozen")),
        ];
        assert_eq!(
            to_events_string(&blocks),
            "onMacro: [missing] [a=1] [null]\n\
             onError: [boom]\n\
             onVerbatimInline: [x]\n\
             onMacro: [frozen] [] [null]\n"
        );
    }

    struct Counter {
        begins: usize,
        ends: usize,
        leaves: usize,
    }

    impl Listener for Counter {
        fn event(&mut self, event: Event<'_>) {
            match event {
                Event::Begin(_) => self.begins += 1,
                Event::End(_) => self.ends += 1,
                Event::On(_) => self.leaves += 1,
            }
        }
    }

    #[test]
    fn xml_elements_list_attributes_in_order() {
        let blocks = vec![Block::XmlElement {
            name: "td".into(),
            attributes: vec![("width".into(), "2".into()), ("align".into(), "left".into())],
            children: vec![Block::Word("cell".into())],
        }];
        assert_eq!(
            to_events_string(&blocks),
            "beginXMLElement: [td] [width=2, align=left]\n\
             onWord: [cell]\n\
             endXMLElement: [td] [width=2, align=left]\n"
        );
    }

    #[test]
    fn begin_and_end_are_balanced() {
        let blocks = vec![Block::List {
            ordered: false,
            items: vec![Block::ListItem(vec![Block::Word("a".into())])],
        }];
        let mut counter = Counter {
            begins: 0,
            ends: 0,
            leaves: 0,
        };
        traverse(&blocks, &mut counter);
        assert_eq!((counter.begins, counter.ends, counter.leaves), (2, 2, 1));
    }
}
