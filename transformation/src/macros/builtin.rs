use xdom::block::{self, Block, Format, Parameters};
use xdom::parser::parse_fragment;

use crate::descriptor::{ContentDescriptor, MacroDescriptor, ParameterDescriptor};
use crate::error::MacroExecutionError;
use crate::macros::xhtml::XhtmlMacro;
use crate::macros::{Macro, MacroContext};
use crate::registry::DefaultMacroRegistry;

/// Register `code`, `box` and `xhtml` for every syntax.
pub fn register_builtin_macros(registry: &mut DefaultMacroRegistry) {
    registry.register_for_all_syntaxes("code", Box::new(CodeMacro::new()));
    registry.register_for_all_syntaxes("box", Box::new(BoxMacro::new()));
    registry.register_for_all_syntaxes("xhtml", Box::new(XhtmlMacro::new()));
}

/// `{{code language="..."}}...{{/code}}`: content rendered verbatim.
pub struct CodeMacro {
    descriptor: MacroDescriptor,
}

impl CodeMacro {
    pub fn new() -> Self {
        CodeMacro {
            descriptor: MacroDescriptor::new("Code")
                .with_description("Displays content verbatim")
                .with_category("Formatting")
                .with_inline_mode(true)
                .with_content(ContentDescriptor::mandatory("The code to display"))
                .with_parameter(ParameterDescriptor::new(
                    "language",
                    "Language of the code",
                    false,
                )),
        }
    }
}

impl Default for CodeMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for CodeMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        _parameters: &Parameters,
        content: Option<&str>,
        context: &MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let content = content.ok_or_else(|| MacroExecutionError::new("no code given"))?;
        Ok(vec![Block::Verbatim {
            content: content.to_string(),
            inline: context.is_inline(),
        }])
    }
}

/// `{{box title="..."}}...{{/box}}`: content parsed as markup and grouped.
///
/// Block-only. The content may contain further macro calls; they are
/// expanded on the next pass.
pub struct BoxMacro {
    descriptor: MacroDescriptor,
}

impl BoxMacro {
    pub fn new() -> Self {
        BoxMacro {
            descriptor: MacroDescriptor::new("Box")
                .with_description("Draws a box around its content")
                .with_category("Layout")
                .with_content(ContentDescriptor::optional("The content of the box"))
                .with_parameter(ParameterDescriptor::new("title", "Box title", false)),
        }
    }
}

impl Default for BoxMacro {
    fn default() -> Self {
        Self::new()
    }
}

impl Macro for BoxMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        parameters: &Parameters,
        content: Option<&str>,
        context: &MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let mut children = Vec::new();
        if let Some(title) = parameters.get("title") {
            children.push(Block::Paragraph(vec![Block::Format {
                format: Format::Bold,
                children: block::words(title),
            }]));
        }
        if let Some(content) = content {
            let parsed = parse_fragment(content, context.syntax()).map_err(|errors| {
                let messages: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
                MacroExecutionError::new(format!(
                    "cannot parse box content: {}",
                    messages.join(", ")
                ))
            })?;
            children.extend(parsed);
        }
        Ok(vec![Block::Group(children)])
    }
}
