//! Source adapters.
//!
//! Each module provides a `Parser` implementing [`crate::Parser`]. Sources
//! that have a command-line or environment spelling also implement
//! [`crate::Printer`] so help listings show how to set a flag from them.
//!
//! | Module | Reads | Printed as |
//! |---|---|---|
//! | [`args`] | Go-style argv (`-name value`) | `-name` |
//! | [`posix`] | GNU-style argv (`--name`, `-n`) | `-n, --name` |
//! | [`env`] | environment variables | `$NAME` |
//! | [`file`] | JSON, TOML or YAML documents | |
//! | [`prompt`] | interactive answers | |
//! | [`object`] | any `serde::Serialize` value | |
//! | `cli` | clap matches and `--set NAME=VALUE` | |

pub mod args;
#[cfg(feature = "clap")]
pub mod cli;
pub mod env;
pub mod file;
pub mod object;
pub mod posix;
pub mod prompt;
