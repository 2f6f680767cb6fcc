//! Standards-compliant documentation for Python, SQL and R sources.
//!
//! `docstamp` finds documentable units, checks their documentation against
//! NumPy, SQL-markdown or Roxygen2 conventions, asks a generator for missing
//! or broken documentation and splices it back into the file in place.

pub mod config;
pub mod core;
pub mod error;

pub use config::{Config, DetailLevel};
pub use error::{DocstampError, GenerationError, Result};
