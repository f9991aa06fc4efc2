use serde::Deserialize;

/// Passes run before the recursion safeguard stops expanding.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Which end of the priority scale executes first within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityOrder {
    /// Lower priority values execute earlier.
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    pub max_depth: usize,
    /// Treat an unknown macro as a fatal error instead of a warning.
    pub strict: bool,
    pub priority_order: PriorityOrder,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
            priority_order: PriorityOrder::Ascending,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_depth must be at least 1")]
    ZeroMaxDepth,
    #[error("cannot parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TransformConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: TransformConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        Ok(())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_priority_order(mut self, order: PriorityOrder) -> Self {
        self.priority_order = order;
        self
    }
}
