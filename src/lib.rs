//! Self-wiring entity hierarchies.
//!
//! Model types declare their children as fields; instantiating a type wires every
//! child's parent automatically, and instance methods returning an entity adopt it.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod util;
