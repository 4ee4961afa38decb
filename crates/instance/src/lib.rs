//! Filesystem-side view of game-server instances.
//!
//! An instance is a directory under a fixed root whose name carries the
//! instance prefix. Each instance directory holds a line-oriented
//! `key=value` configuration file from which the TCP listen port is read.
//!
//! Two concerns, kept separate:
//! - **discovery**: list the instance directories present right now
//! - **config**: wait (bounded) for an instance's config file and parse
//!   its port entry

pub mod config;
pub mod discovery;
pub mod error;

pub use config::{ReadSettings, parse_port, read_port, wait_for_config};
pub use discovery::scan;
pub use error::{InstanceError, Result};
