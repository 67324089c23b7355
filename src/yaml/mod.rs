//! YAML helpers

mod diagnostics;

pub use diagnostics::YamlSyntaxError;
