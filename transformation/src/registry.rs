use std::collections::BTreeMap;

use xdom::syntax::Syntax;

use crate::error::RegistryError;
use crate::macros::Macro;

/// Maps a macro identifier and a syntax to an implementation.
///
/// `Ok(None)` means "no such macro"; `Err` means the registry itself could not
/// answer, which aborts the transformation.
pub trait MacroRegistry {
    fn resolve(&self, identifier: &str, syntax: &Syntax)
    -> Result<Option<&dyn Macro>, RegistryError>;
}

/// In-memory registry. Macros registered for a specific syntax take precedence
/// over macros registered for all syntaxes.
#[derive(Default)]
pub struct DefaultMacroRegistry {
    by_syntax: BTreeMap<(String, Syntax), Box<dyn Macro>>,
    any_syntax: BTreeMap<String, Box<dyn Macro>>,
}

impl DefaultMacroRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `implementation` under `identifier` for one syntax, replacing
    /// any previous registration.
    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        syntax: Syntax,
        implementation: Box<dyn Macro>,
    ) {
        self.by_syntax
            .insert((identifier.into(), syntax), implementation);
    }

    pub fn register_for_all_syntaxes(
        &mut self,
        identifier: impl Into<String>,
        implementation: Box<dyn Macro>,
    ) {
        self.any_syntax.insert(identifier.into(), implementation);
    }

    /// All registered identifiers, sorted and without duplicates.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut identifiers: Vec<&str> = self
            .by_syntax
            .keys()
            .map(|(identifier, _)| identifier.as_str())
            .chain(self.any_syntax.keys().map(String::as_str))
            .collect();
        identifiers.sort_unstable();
        identifiers.dedup();
        identifiers
    }

    pub fn is_empty(&self) -> bool {
        self.by_syntax.is_empty() && self.any_syntax.is_empty()
    }
}

impl MacroRegistry for DefaultMacroRegistry {
    fn resolve(
        &self,
        identifier: &str,
        syntax: &Syntax,
    ) -> Result<Option<&dyn Macro>, RegistryError> {
        let specific = self
            .by_syntax
            .get(&(identifier.to_string(), syntax.clone()));
        Ok(specific
            .or_else(|| self.any_syntax.get(identifier))
            .map(|implementation| implementation.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MacroDescriptor;
    use crate::error::MacroExecutionError;
    use crate::macros::MacroContext;
    use xdom::block::{Block, Parameters};

    struct Named(MacroDescriptor);

    impl Macro for Named {
        fn descriptor(&self) -> &MacroDescriptor {
            &self.0
        }

        fn execute(
            &self,
            _parameters: &Parameters,
            _content: Option<&str>,
            _context: &MacroContext<'_>,
        ) -> Result<Vec<Block>, MacroExecutionError> {
            Ok(Vec::new())
        }
    }

    fn named(name: &str) -> Box<dyn Macro> {
        Box::new(Named(MacroDescriptor::new(name)))
    }

    fn resolved_name(registry: &DefaultMacroRegistry, id: &str, syntax: &Syntax) -> Option<String> {
        registry
            .resolve(id, syntax)
            .unwrap()
            .map(|m| m.descriptor().name.clone())
    }

    #[test]
    fn syntax_specific_registration_wins() {
        let xwiki = Syntax::xwiki_2_0();
        let markdown = Syntax::new("markdown", "1.0");
        let mut registry = DefaultMacroRegistry::new();
        registry.register_for_all_syntaxes("toc", named("generic"));
        registry.register("toc", xwiki.clone(), named("xwiki"));

        assert_eq!(resolved_name(&registry, "toc", &xwiki).as_deref(), Some("xwiki"));
        assert_eq!(
            resolved_name(&registry, "toc", &markdown).as_deref(),
            Some("generic")
        );
        assert_eq!(resolved_name(&registry, "missing", &xwiki), None);
    }

    #[test]
    fn identifiers_are_sorted_and_unique() {
        let mut registry = DefaultMacroRegistry::new();
        registry.register("b", Syntax::xwiki_2_0(), named("b"));
        registry.register_for_all_syntaxes("b", named("b"));
        registry.register_for_all_syntaxes("a", named("a"));
        assert_eq!(registry.identifiers(), vec!["a", "b"]);
    }
}
