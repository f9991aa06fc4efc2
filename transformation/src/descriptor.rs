use xdom::block::MacroCall;

use crate::error::MacroExecutionError;

/// Describes the macro's content, when it accepts any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub description: String,
    pub mandatory: bool,
}

impl ContentDescriptor {
    pub fn optional(description: impl Into<String>) -> Self {
        ContentDescriptor {
            description: description.into(),
            mandatory: false,
        }
    }

    pub fn mandatory(description: impl Into<String>) -> Self {
        ContentDescriptor {
            description: description.into(),
            mandatory: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub description: String,
    pub mandatory: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, mandatory: bool) -> Self {
        ParameterDescriptor {
            name: name.into(),
            description: description.into(),
            mandatory,
        }
    }
}

/// Static facts about a macro: what it is called, where it may be used,
/// what it accepts and when it runs relative to other macros in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDescriptor {
    pub name: String,
    pub description: String,
    pub default_category: Option<String>,
    pub supports_inline_mode: bool,
    /// `None` means the macro takes no content.
    pub content_descriptor: Option<ContentDescriptor>,
    pub parameter_descriptors: Vec<ParameterDescriptor>,
    /// Lower values execute earlier within a pass.
    pub priority: i32,
}

impl MacroDescriptor {
    pub const DEFAULT_PRIORITY: i32 = 1000;

    pub fn new(name: impl Into<String>) -> Self {
        MacroDescriptor {
            name: name.into(),
            description: String::new(),
            default_category: None,
            supports_inline_mode: false,
            content_descriptor: None,
            parameter_descriptors: Vec::new(),
            priority: Self::DEFAULT_PRIORITY,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = Some(category.into());
        self
    }

    pub fn with_inline_mode(mut self, supported: bool) -> Self {
        self.supports_inline_mode = supported;
        self
    }

    pub fn with_content(mut self, content: ContentDescriptor) -> Self {
        self.content_descriptor = Some(content);
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDescriptor) -> Self {
        self.parameter_descriptors.push(parameter);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Check a call against the declared parameters and content.
    /// Parameters the descriptor does not mention are passed through.
    pub fn validate(&self, call: &MacroCall) -> Result<(), MacroExecutionError> {
        for parameter in &self.parameter_descriptors {
            if parameter.mandatory && !call.parameters.contains_key(&parameter.name) {
                return Err(MacroExecutionError::new(format!(
                    "missing mandatory parameter '{}'",
                    parameter.name
                )));
            }
        }

        let has_content = call
            .raw_content
            .as_deref()
            .is_some_and(|content| !content.trim().is_empty());
        match &self.content_descriptor {
            None if has_content => Err(MacroExecutionError::new(format!(
                "the '{}' macro does not accept content",
                call.identifier
            ))),
            Some(content) if content.mandatory && !has_content => Err(MacroExecutionError::new(
                format!("the '{}' macro requires content", call.identifier),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> MacroDescriptor {
        MacroDescriptor::new("Box")
            .with_parameter(ParameterDescriptor::new("title", "Box title", true))
            .with_content(ContentDescriptor::mandatory("Box body"))
    }

    #[test]
    fn accepts_a_complete_call() {
        let call = MacroCall::new("box")
            .with_parameter("title", "t")
            .with_parameter("extra", "ignored")
            .with_content("body");
        assert_eq!(descriptor().validate(&call), Ok(()));
    }

    #[test]
    fn reports_missing_parameter_before_content() {
        let err = descriptor().validate(&MacroCall::new("box")).unwrap_err();
        assert_eq!(err.message, "missing mandatory parameter 'title'");
    }

    #[test]
    fn blank_content_does_not_satisfy_mandatory_content() {
        let call = MacroCall::new("box")
            .with_parameter("title", "t")
            .with_content("  \n");
        assert!(descriptor().validate(&call).is_err());
    }

    #[test]
    fn content_rejected_when_not_accepted() {
        let err = MacroDescriptor::new("toc")
            .validate(&MacroCall::new("toc").with_content("x"))
            .unwrap_err();
        assert!(err.message.contains("does not accept content"));
    }
}
