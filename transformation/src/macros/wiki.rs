//! Macros defined at runtime from TOML definition records.
//!
//! ```toml
//! [[macro]]
//! id = "greet"
//! name = "Greeting"
//! content_type = "Optional"
//! code = "Hello **${who}**! ${content}"
//!
//! [[macro.parameters]]
//! name = "who"
//! mandatory = true
//! ```
//!
//! The body is markup. `${name}` is replaced by the parameter of that name
//! (empty when absent) and `${content}` by the invocation content before the
//! body is parsed.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use xdom::block::{Block, Parameters};
use xdom::parser::parse_fragment;
use xdom::syntax::Syntax;

use crate::descriptor::{ContentDescriptor, MacroDescriptor, ParameterDescriptor};
use crate::error::MacroExecutionError;
use crate::macros::{Macro, MacroContext};
use crate::registry::DefaultMacroRegistry;

#[derive(Debug, thiserror::Error)]
pub enum WikiMacroError {
    #[error("cannot read macro definitions from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid macro definitions: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("macro definition has an empty id")]
    EmptyId,
    #[error("macro '{id}' has unknown content type '{content_type}'")]
    UnknownContentType { id: String, content_type: String },
    #[error("macro '{id}' has invalid code: {message}")]
    InvalidCode { id: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WikiParameterDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mandatory: bool,
}

/// One `[[macro]]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WikiMacroDefinition {
    pub id: String,
    /// Display name; the id is used when empty.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_category: Option<String>,
    #[serde(default)]
    pub supports_inline_mode: bool,
    /// `"No content"`, `"Optional"` or `"Mandatory"`.
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub code: String,
    #[serde(default)]
    pub parameters: Vec<WikiParameterDefinition>,
}

fn default_content_type() -> String {
    "Optional".to_string()
}

fn default_priority() -> i32 {
    MacroDescriptor::DEFAULT_PRIORITY
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WikiMacroDefinitions {
    #[serde(rename = "macro", default)]
    pub macros: Vec<WikiMacroDefinition>,
}

impl WikiMacroDefinitions {
    pub fn from_toml_str(source: &str) -> Result<Self, WikiMacroError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, WikiMacroError> {
        let source = std::fs::read_to_string(path).map_err(|source| WikiMacroError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Build every definition and register it for all syntaxes under its id.
    /// Returns the number of macros registered. Nothing is registered unless
    /// every definition builds.
    pub fn register_all(
        &self,
        registry: &mut DefaultMacroRegistry,
    ) -> Result<usize, WikiMacroError> {
        let built = self
            .macros
            .iter()
            .map(WikiMacro::build)
            .collect::<Result<Vec<_>, _>>()?;
        let count = built.len();
        for wiki_macro in built {
            registry.register_for_all_syntaxes(wiki_macro.id.clone(), Box::new(wiki_macro));
        }
        Ok(count)
    }
}

pub struct WikiMacro {
    id: String,
    descriptor: MacroDescriptor,
    code: String,
}

impl WikiMacro {
    pub fn build(definition: &WikiMacroDefinition) -> Result<Self, WikiMacroError> {
        let id = definition.id.trim();
        if id.is_empty() {
            return Err(WikiMacroError::EmptyId);
        }

        let content_descriptor = match definition.content_type.as_str() {
            "No content" => None,
            "Optional" => Some(ContentDescriptor::optional("Macro content")),
            "Mandatory" => Some(ContentDescriptor::mandatory("Macro content")),
            other => {
                return Err(WikiMacroError::UnknownContentType {
                    id: id.to_string(),
                    content_type: other.to_string(),
                });
            }
        };

        // Catch malformed bodies at load time rather than on every call.
        parse_fragment(&definition.code, &Syntax::default()).map_err(|errors| {
            WikiMacroError::InvalidCode {
                id: id.to_string(),
                message: join_messages(&errors),
            }
        })?;

        let name = if definition.name.trim().is_empty() {
            id
        } else {
            definition.name.as_str()
        };
        let mut descriptor = MacroDescriptor::new(name)
            .with_description(definition.description.clone())
            .with_inline_mode(definition.supports_inline_mode)
            .with_priority(definition.priority);
        descriptor.default_category = definition.default_category.clone();
        descriptor.content_descriptor = content_descriptor;
        for parameter in &definition.parameters {
            descriptor = descriptor.with_parameter(ParameterDescriptor::new(
                parameter.name.clone(),
                parameter.description.clone(),
                parameter.mandatory,
            ));
        }

        Ok(WikiMacro {
            id: id.to_string(),
            descriptor,
            code: definition.code.clone(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Macro for WikiMacro {
    fn descriptor(&self) -> &MacroDescriptor {
        &self.descriptor
    }

    fn execute(
        &self,
        parameters: &Parameters,
        content: Option<&str>,
        context: &MacroContext<'_>,
    ) -> Result<Vec<Block>, MacroExecutionError> {
        let source = expand_template(&self.code, parameters, content);
        let mut blocks = parse_fragment(&source, context.syntax())
            .map_err(|errors| MacroExecutionError::new(join_messages(&errors)))?;

        if context.is_inline() {
            if let [Block::Paragraph(children)] = blocks.as_mut_slice() {
                return Ok(std::mem::take(children));
            }
        }
        Ok(blocks)
    }
}

fn join_messages(errors: &[xdom::parser::error::ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Replace `${name}` placeholders. Unterminated placeholders are kept as text.
fn expand_template(code: &str, parameters: &Parameters, content: Option<&str>) -> String {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = after[..end].trim();
        if name == "content" {
            out.push_str(content.unwrap_or_default());
        } else if let Some(value) = parameters.get(name) {
            out.push_str(value);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
