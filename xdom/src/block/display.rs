use std::fmt;

use crate::block::{Block, Format, MacroCall};

/// Renders a block back to markup. Markers are transparent; invocations and
/// references render as `{{id k="v"}}content{{/id}}`.
impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Paragraph(children) => {
                write_all(f, children)?;
                writeln!(f)
            }
            Block::Heading { level, children } => {
                for _ in 0..*level {
                    write!(f, "#")?;
                }
                write!(f, " ")?;
                write_all(f, children)?;
                writeln!(f)
            }
            Block::Quotation(children) => {
                let text = children.iter().map(|c| c.to_string()).collect::<String>();
                for line in text.lines() {
                    writeln!(f, "> {}", line)?;
                }
                Ok(())
            }
            Block::List { ordered, items } => {
                for (i, item) in items.iter().enumerate() {
                    if *ordered {
                        write!(f, "{}. ", i + 1)?;
                    } else {
                        write!(f, "- ")?;
                    }
                    let text = item.to_string();
                    writeln!(f, "{}", text.trim_end())?;
                }
                Ok(())
            }
            Block::ListItem(children) | Block::Group(children) => write_all(f, children),
            Block::XmlElement {
                name,
                attributes,
                children,
            } => {
                write!(f, "<{}", name)?;
                for (key, value) in attributes {
                    write!(f, " {}=\"{}\"", key, value.replace('&', "&amp;").replace('"', "&quot;"))?;
                }
                if children.is_empty() {
                    return writeln!(f, "/>");
                }
                writeln!(f, ">")?;
                write_all(f, children)?;
                writeln!(f, "</{}>", name)
            }
            Block::HorizontalLine => writeln!(f, "---"),
            Block::Word(word) => write!(f, "{}", word),
            Block::Space => write!(f, " "),
            Block::SpecialSymbol(c) => write!(f, "{}", c),
            Block::NewLine => writeln!(f),
            Block::Format { format, children } => {
                let delimiter = match format {
                    Format::Bold => "**",
                    Format::Italic => "*",
                    Format::Strikethrough => "~~",
                    Format::Monospace => "`",
                };
                write!(f, "{}", delimiter)?;
                write_all(f, children)?;
                write!(f, "{}", delimiter)
            }
            Block::Link {
                reference,
                children,
            } => {
                write!(f, "[")?;
                write_all(f, children)?;
                write!(f, "]({})", reference)
            }
            Block::Verbatim { content, inline } => {
                if *inline {
                    write!(f, "`{}`", content)
                } else {
                    writeln!(f, "```")?;
                    writeln!(f, "{}", content.trim_end_matches('\n'))?;
                    writeln!(f, "```")
                }
            }
            Block::Error { message, .. } => write!(f, "[error: {}]", message),
            Block::MacroInvocation(invocation) => write_call(f, &invocation.call),
            Block::MacroReference(call) => write_call(f, call),
            Block::MacroMarker(marker) => write_all(f, &marker.children),
        }
    }
}

fn write_all(f: &mut fmt::Formatter<'_>, blocks: &[Block]) -> fmt::Result {
    for block in blocks {
        write!(f, "{}", block)?;
    }
    Ok(())
}

fn write_call(f: &mut fmt::Formatter<'_>, call: &MacroCall) -> fmt::Result {
    write!(f, "{{{{{}", call.identifier)?;
    for (name, value) in &call.parameters {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        write!(f, " {}=\"{}\"", name, escaped)?;
    }
    match &call.raw_content {
        Some(content) => write!(f, "}}}}{}{{{{/{}}}}}", content, call.identifier),
        None => write!(f, "/}}}}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{MacroInvocation, MacroMarker};
    use crate::syntax::Syntax;

    #[test]
    fn invocation_renders_as_macro_syntax() {
        let call = MacroCall::new("code")
            .with_parameter("lang", "rust")
            .with_content("let x = 1;");
        let block = Block::MacroInvocation(MacroInvocation::new(call, Syntax::xwiki_2_0()));
        assert_eq!(
            block.to_string(),
            "{{code lang=\"rust\"}}let x = 1;{{/code}}"
        );
        let empty = Block::MacroReference(MacroCall::new("toc"));
        assert_eq!(empty.to_string(), "{{toc/}}");
    }

    #[test]
    fn parameter_values_round_trip() {
        let call = MacroCall::new("path")
            .with_parameter("dir", "C:\\temp\\")
            .with_parameter("quote", "say \"hi\"");
        let rendered = Block::MacroReference(call.clone()).to_string();
        assert_eq!(
            rendered,
            "{{path dir=\"C:\\\\temp\\\\\" quote=\"say \\\"hi\\\"\"/}}"
        );
        let parsed = crate::parser::macro_call::read_macro(&rendered, 0)
            .unwrap()
            .unwrap();
        assert_eq!(parsed.call, call);
    }

    #[test]
    fn markers_are_transparent() {
        let marker = Block::MacroMarker(MacroMarker {
            call: MacroCall::new("greeting"),
            children: vec![Block::paragraph_of("hello world")],
        });
        assert_eq!(marker.to_string(), "hello world\n");
    }

    #[test]
    fn formatting_and_lists() {
        let list = Block::List {
            ordered: true,
            items: vec![
                Block::ListItem(vec![Block::Format {
                    format: Format::Bold,
                    children: vec![Block::Word("one".into())],
                }]),
                Block::ListItem(vec![Block::Word("two".into())]),
            ],
        };
        assert_eq!(list.to_string(), "1. **one**\n2. two\n");
    }
}
