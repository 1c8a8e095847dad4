//! Application layer: declaration files and application-level errors
//!
//! This layer turns files on disk into domain types.

pub mod declaration;
pub mod error;

pub use declaration::{load_declarations, parse_declarations, DeclarationFile};
pub use error::{ApplicationError, ApplicationResult};
