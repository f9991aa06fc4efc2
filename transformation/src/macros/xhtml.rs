//! `{{xhtml}}...{{/xhtml}}`: XHTML content turned into element blocks.
//!
//! Elements and their attributes come from the XML. Text between elements is
//! parsed as markup, so `<td>* item</td>` yields a list inside the cell and
//! macro calls in the text are expanded on the next pass.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use xdom::block::{Block, Parameters};
use xdom::parser::parse_fragment;
use xdom::syntax::Syntax;

use crate::descriptor::{ContentDescriptor, MacroDescriptor};
use crate::error::MacroExecutionError;
use crate::macros::{Macro, MacroContext};

pub struct XhtmlMacro {
    descriptor: MacroDescriptor,
}

impl XhtmlMacro {
    pub fn new() -> Self {
        XhtmlMacro {
            descriptor: MacroDescriptor::new("XHTML")
                .with_description("Inserts XHTML content")
                .with_category("Development")
                .with_content(ContentDescriptor::mandatory("The XHTML content")),
        }
    }
}

impl Default for XhtmlMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for XhtmlMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        _parameters: &Parameters,
        content: Option<&str>,
        context: &MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let content = content.ok_or_else(|| MacroExecutionError::new("no XHTML given"))?;
        parse_xhtml(content, context.syntax())
    }
}

struct OpenElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Block>,
}

impl OpenElement {
    fn read(start: &BytesStart<'_>) -> Result<Self, MacroExecutionError> {
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(invalid)?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value().map_err(invalid)?.into_owned();
            attributes.push((key, value));
        }
        Ok(OpenElement {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Vec::new(),
        })
    }

    fn into_block(self) -> Block {
        Block::XmlElement {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
        }
    }
}

fn invalid(error: impl std::fmt::Display) -> MacroExecutionError {
    MacroExecutionError::new(format!("invalid XHTML: {}", error))
}

/// Read `source` as a sequence of XML nodes.
pub fn parse_xhtml(source: &str, syntax: &Syntax) -> Result<Vec<Block>, MacroExecutionError> {
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut top = Vec::new();

    loop {
        let blocks = match reader.read_event().map_err(invalid)? {
            Event::Start(start) => {
                stack.push(OpenElement::read(&start)?);
                continue;
            }
            Event::Empty(start) => vec![OpenElement::read(&start)?.into_block()],
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                match stack.pop() {
                    Some(element) if element.name == name => vec![element.into_block()],
                    _ => return Err(invalid(format!("unexpected closing tag </{}>", name))),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(invalid)?;
                if text.trim().is_empty() {
                    continue;
                }
                parse_fragment(&text, syntax).map_err(|errors| {
                    let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
                    MacroExecutionError::new(format!(
                        "cannot parse XHTML text: {}",
                        messages.join(", ")
                    ))
                })?
            }
            Event::CData(data) => vec![Block::Verbatim {
                content: String::from_utf8_lossy(&data).into_owned(),
                inline: false,
            }],
            Event::Eof => break,
            // Comments, declarations, processing instructions, doctypes.
            _ => continue,
        };
        match stack.last_mut() {
            Some(parent) => parent.children.extend(blocks),
            None => top.extend(blocks),
        }
    }

    if let Some(element) = stack.last() {
        return Err(invalid(format!("element <{}> is never closed", element.name)));
    }
    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xdom::events::to_events_string;

    const TABLE: &str = "<table border=\"1\">\n<tr>\n<td>\n* listitem\n</td>\n</tr>\n</table>";

    #[test]
    fn elements_wrap_parsed_markup() {
        let blocks = parse_xhtml(TABLE, &Syntax::xwiki_2_0()).unwrap();
        assert_eq!(
            to_events_string(&blocks),
            "beginXMLElement: [table] [border=1]\n\
             beginXMLElement: [tr] []\n\
             beginXMLElement: [td] []\n\
             beginList: [BULLETED]\n\
             beginListItem\n\
             onWord: [listitem]\n\
             endListItem\n\
             endList: [BULLETED]\n\
             endXMLElement: [td] []\n\
             endXMLElement: [tr] []\n\
             endXMLElement: [table] [border=1]\n"
        );
    }

    #[test]
    fn entities_and_empty_elements() {
        let blocks = parse_xhtml(
            "<p title=\"a &amp; b\">x &lt; y<br/></p>",
            &Syntax::xwiki_2_0(),
        )
        .unwrap();
        let [Block::XmlElement {
            name,
            attributes,
            children,
        }] = blocks.as_slice()
        else {
            panic!("expected one element, got {:?}", blocks);
        };
        assert_eq!(name, "p");
        assert_eq!(attributes, &vec![("title".to_string(), "a & b".to_string())]);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0], Block::paragraph_of("x < y"));
        assert!(matches!(&children[1], Block::XmlElement { name, .. } if name == "br"));
    }

    #[test]
    fn text_keeps_macro_calls_for_the_next_pass() {
        let blocks = parse_xhtml("<div>{{toc/}}</div>", &Syntax::xwiki_2_0()).unwrap();
        assert_eq!(
            to_events_string(&blocks),
            "beginXMLElement: [div] []\n\
             onMacro: [toc] [] [null]\n\
             endXMLElement: [div] []\n"
        );
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let unclosed = parse_xhtml("<table><tr></table>", &Syntax::xwiki_2_0()).unwrap_err();
        assert!(unclosed.to_string().starts_with("invalid XHTML"));
        let open = parse_xhtml("<div>", &Syntax::xwiki_2_0()).unwrap_err();
        assert!(open.to_string().starts_with("invalid XHTML"));
    }

    #[test]
    fn xhtml_is_block_only() {
        let descriptor = XhtmlMacro::new().descriptor().clone();
        assert!(!descriptor.supports_inline_mode);
        assert!(
            descriptor
                .content_descriptor
                .is_some_and(|content| content.mandatory)
        );
    }
}
