pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, prepare_directories, ConfigError};
pub use schema::{CodexFile, Guardrails, Metadata, Policy};
