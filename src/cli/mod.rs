//! CLI command implementations
//!
//! - `generate`: run the pipeline over a manifest and write the units
//! - `inspect`: scanner and provider catalog views (scan, providers)
//! - `schema`: JSON schemas of the config and manifest formats
//! - `util`: shared argument and output helpers

pub mod generate;
pub mod inspect;
pub mod schema;
pub mod util;

pub use generate::cmd_generate;
pub use inspect::{cmd_providers, cmd_scan};
pub use schema::cmd_schema;
