pub mod config;
pub mod descriptor;
pub mod error;
pub mod executor;
pub mod macro_transformation;
pub mod macros;
pub mod manager;
pub mod registry;
pub mod resolver;
pub mod scheduler;

pub use config::{PriorityOrder, TransformConfig};
pub use descriptor::{ContentDescriptor, MacroDescriptor, ParameterDescriptor};
pub use error::{
    Diagnostic, DiagnosticKind, MacroExecutionError, RegistryError, TransformationError,
};
pub use macro_transformation::{MacroTransformation, TransformReport};
pub use macros::{Macro, MacroContext};
pub use manager::{Transformation, TransformationManager};
pub use registry::{DefaultMacroRegistry, MacroRegistry};
