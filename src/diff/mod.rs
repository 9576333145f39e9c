//! Unified diff handling: parsing into hunks, policy validation and
//! line-exact application.

pub mod applicator;
pub mod errors;
pub mod parser;
pub mod validator;

pub use applicator::apply;
pub use errors::{ApplyError, ParseError};
pub use parser::{parse, Hunk, HunkHeader, LineOp};
pub use validator::{validate, ValidationIssue};
