//! Clap integration.
//!
//! Compiled only with the `clap` Cargo feature (on by default). Two ways to
//! feed an application's existing clap parsing into the resolution:
//!
//! - [`SetArgs`] is a derive fragment adding a repeatable `--set NAME=VALUE`
//!   option. Embed it with `#[command(flatten)]`.
//! - [`Matches`] reads an [`ArgMatches`] and applies every argument whose value
//!   came from the command line. Defaults and env fallbacks clap filled in are
//!   left to the later sources.

use std::fmt;

use clap::parser::ValueSource;
use clap::{ArgMatches, Args};

use crate::builder;
use crate::error::FlagError;
use crate::view::FlagSetView;

fn fail(message: String) -> FlagError {
    FlagError::Syntax {
        source_name: "clap",
        message,
    }
}

/// `--set NAME=VALUE`, repeatable.
///
/// ```ignore
/// #[derive(Parser)]
/// struct Cli {
///     #[command(flatten)]
///     flags: SetArgs,
/// }
/// ```
#[derive(Debug, Clone, Default, Args)]
pub struct SetArgs {
    /// Set a flag, e.g. `--set database.url=postgres://localhost`.
    #[arg(long = "set", value_name = "NAME=VALUE", global = true)]
    pub set: Vec<String>,
}

impl builder::Parser for SetArgs {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        for pair in &self.set {
            let Some((name, value)) = pair.split_once('=') else {
                return Err(fail(format!("expected NAME=VALUE, got {pair:?}")));
            };
            view.set(name.trim(), value)?;
        }
        Ok(())
    }
}

type RenameFn = Box<dyn Fn(&str) -> String>;

/// Command-line values from clap matches.
///
/// Argument ids are used as flag names unless [`with_rename`](Self::with_rename)
/// maps them. Ids that don't name a visible flag are skipped.
pub struct Matches<'m> {
    matches: &'m ArgMatches,
    rename: Option<RenameFn>,
}

impl<'m> Matches<'m> {
    pub fn new(matches: &'m ArgMatches) -> Self {
        Self {
            matches,
            rename: None,
        }
    }

    pub fn with_rename(mut self, rename: impl Fn(&str) -> String + 'static) -> Self {
        self.rename = Some(Box::new(rename));
        self
    }

    fn flag_name(&self, id: &str) -> String {
        match &self.rename {
            Some(rename) => rename(id),
            None => id.to_string(),
        }
    }
}

impl builder::Parser for Matches<'_> {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        for id in self.matches.ids() {
            let id = id.as_str();
            if self.matches.value_source(id) != Some(ValueSource::CommandLine) {
                continue;
            }
            let name = self.flag_name(id);
            if view.lookup(&name).is_none() {
                continue;
            }
            let raw = self
                .matches
                .try_get_raw(id)
                .map_err(|e| fail(format!("{id}: {e}")))?;
            for value in raw.into_iter().flatten() {
                let value = value
                    .to_str()
                    .ok_or_else(|| fail(format!("{id}: value is not valid UTF-8")))?;
                view.set(&name, value)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Matches<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matches")
            .field("matches", &self.matches)
            .field("rename", &self.rename.is_some())
            .finish()
    }
}
