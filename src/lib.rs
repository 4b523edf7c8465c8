//! Host surface for the escript value runtime: compiler configuration,
//! file loading and packed value files.

pub mod config;
pub mod file_contents;
pub mod inspect;

pub use config::{CompilerConfig, ConfigError};
pub use file_contents::{FileContents, FileError};
pub use inspect::InspectError;
