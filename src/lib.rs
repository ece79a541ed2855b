//! Layered flag resolution for Rust applications. Define your flags once,
//! list your sources, and let the first source that mentions a flag win.
//!
//! Flaglayer fills one registry of typed flags from an ordered list of
//! sources: command-line arguments, environment variables, config files,
//! interactive prompts, or any `serde::Serialize` value.
//!
//! ```ignore
//! let mut fs = FlagSet::new("myapp", ErrorHandling::Exit);
//! let port = fs.int("port", 8080, "port to listen on")?;
//! let url = fs.string("database.url", "", "database `url`")?;
//!
//! Flaglayer::builder()
//!     .parser(parse::args::Parser::new(std::env::args().skip(1)))
//!     .parser(parse::env::Parser::new().with_prefix("MYAPP_"))
//!     .parser(parse::file::Parser::new(
//!         parse::file::Lookup::platform("myapp", "config.toml"),
//!         parse::file::Toml,
//!     ))
//!     .parse(&mut fs)?;
//! ```
//!
//! `-port 9000` beats `MYAPP_PORT`, which beats `port = 7000` in the file,
//! which beats the compiled default.
//!
//! # The registry
//!
//! A [`FlagSet`] is a flat, name-ordered map of [`Flag`]s. Each flag owns a
//! shared cell implementing [`FlagValue`]: something that parses text into a
//! typed value and prints it back. The typed helpers ([`FlagSet::int`],
//! [`FlagSet::list`], ...) hand back a typed handle to the cell, so the
//! application reads resolved values without any lookup by name.
//!
//! Nested configuration is modelled with dotted names. `database.url` is a
//! plain flag; the file and object sources map `{"database": {"url": ..}}`
//! onto it, and the env source reads it from `DATABASE__URL`.
//!
//! # Precedence
//!
//! Sources run in the order they were added. Each one gets its own *level*:
//!
//! ```text
//! source 1 (argv)       sets -port 9000
//!        ↓ locks port
//! source 2 (env)        MYAPP_PORT=7000 is ignored
//!        ↓
//! source 3 (file)       fills what is still unset
//! ```
//!
//! A flag set by an earlier level is locked: later writes are silently
//! dropped. Inside one level, repeated writes reach the cell, so list and
//! map flags accumulate. Per-source [`ParserOptions`] adjust a level:
//!
//! - **stash** predicates hide flags from one source, which then sees them as
//!   undefined (keep `--config` out of the config file itself);
//! - **ignore_undefined** turns unknown names into no-ops instead of errors
//!   (share a config file with other tools);
//! - **allow_reset_specified** lets one source overwrite earlier levels.
//!
//! All of this lives in [`FlagSetView`], the only way sources touch the
//! registry.
//!
//! # Sources
//!
//! The [`parse`] module has one adapter per source kind. Writing a new one
//! means implementing [`Parser`], one method receiving the view; implement
//! [`Printer`] too if the source has a spelling worth showing in help.
//!
//! # Help and errors
//!
//! A `-h`/`-help` that no flag claims surfaces as [`FlagError::Help`]. The
//! orchestrator then prints either the registry's custom usage or a listing
//! of every flag with the names each source reads it under:
//!
//! ```text
//!   -port, $MYAPP_PORT
//!     	int
//!     	port to listen on (default 8080)
//! ```
//!
//! What happens next follows the registry's [`ErrorHandling`]: return the
//! error, exit with status 2, or panic. Every error names the flag it is
//! about; see [`FlagError`].
//!
//! # Combining registries
//!
//! The [`merge`] module combines flags so one value drives two cells, merges
//! independently declared flag groups into a superset, and mounts a group
//! under a prefix.

pub mod error;
pub mod flatten;
pub mod merge;
pub mod node;
pub mod parse;
pub mod usage;
pub mod value;
pub mod view;

mod builder;
mod flagset;
mod ser;

#[cfg(test)]
mod fixtures;

pub use builder::{
    Flaglayer, FlaglayerBuilder, NameFn, Parser, ParserFn, ParserOptions, Printer,
};
pub use error::{FlagError, FlattenError, ValueError};
pub use flagset::{ErrorHandling, Flag, FlagSet, UsageFn};
pub use flatten::SET_SEPARATOR;
pub use merge::{combine_flags, combine_sets, copy, merge_into, subset};
pub use node::Node;
pub use ser::to_node;
pub use usage::UnquoteUsageMode;
pub use value::{
    BoolValue, Cell, FlagValue, FloatValue, IntValue, ListValue, MapValue, OverrideSet,
    StringValue, UintValue, ValuePair, ValueRef,
};
pub use view::{FlagInfo, FlagSetView, Stash};
