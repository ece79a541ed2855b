//! POSIX/GNU argument syntax.
//!
//! - long options: `--name`, `--name=value`, `--name value`;
//! - short options: `-o value`, `-ovalue`, `-o=value`;
//! - grouped boolean short options: `-abc` sets `a`, `b` and `c`;
//! - optional shorthands: the first letter of each top-level flag name, when
//!   it is unambiguous and not itself a flag name.
//!
//! Parsing stops at the first non-option argument or after `--`.

use std::collections::HashMap;
use std::fmt;

use crate::builder::{self, NameFn, Printer};
use crate::error::FlagError;
use crate::flatten::SET_SEPARATOR;
use crate::view::{FlagInfo, FlagSetView, is_help_name};

type ShorthandFn = Box<dyn Fn(&str) -> Option<String>>;

#[derive(Default)]
pub struct Parser {
    args: Vec<String>,
    shorthand: bool,
    shorthand_fn: Option<ShorthandFn>,
    pos: usize,
}

/// One parsed option: several names only for grouped short booleans.
struct Opt {
    names: Vec<String>,
    value: String,
}

impl Parser {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Accept first-letter shorthands for top-level flags.
    pub fn with_shorthand(mut self) -> Self {
        self.shorthand = true;
        self
    }

    /// Pick shorthands with `f` instead. `None` means the flag has none.
    pub fn with_shorthand_fn(mut self, f: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.shorthand = true;
        self.shorthand_fn = Some(Box::new(f));
        self
    }

    pub fn non_option_args(&self) -> &[String] {
        &self.args[self.pos.min(self.args.len())..]
    }

    fn shorthand_of(&self, name: &str) -> Option<String> {
        if let Some(f) = &self.shorthand_fn {
            return f(name).filter(|s| !s.is_empty());
        }
        if name.contains(SET_SEPARATOR) {
            return None;
        }
        name.chars().next().map(String::from)
    }

    /// Shorthand to flag name, without ambiguous shorthands and without
    /// shorthands that collide with a flag name.
    fn shorthands(&self, view: &FlagSetView<'_>) -> HashMap<String, String> {
        if !self.shorthand {
            return HashMap::new();
        }
        let mut short: HashMap<String, Option<String>> = HashMap::new();
        view.visit_all(|flag| {
            let Some(s) = self.shorthand_of(&flag.name) else {
                return;
            };
            short
                .entry(s)
                .and_modify(|owner| *owner = None)
                .or_insert_with(|| Some(flag.name.clone()));
        });
        short
            .into_iter()
            .filter(|(s, _)| view.lookup(s).is_none())
            .filter_map(|(s, owner)| owner.map(|name| (s, name)))
            .collect()
    }

    fn next(
        &mut self,
        view: &FlagSetView<'_>,
        alias: &HashMap<String, String>,
    ) -> Result<Option<Opt>, FlagError> {
        let Some(arg) = self.args.get(self.pos) else {
            return Ok(None);
        };
        if arg.len() < 2 || !arg.starts_with('-') {
            return Ok(None);
        }
        let arg = arg.clone();
        self.pos += 1;

        let (body, short) = match arg.strip_prefix("--") {
            Some("") => return Ok(None),
            Some(body) => (body, false),
            None => (&arg[1..], true),
        };
        let dash = if short { "-" } else { "--" };
        let bool_flag = |name: &str| is_bool(view, alias, name);

        let (mut name, mut value) = match body.split_once('=') {
            Some((name, value)) => (name.to_string(), Some(value.to_string())),
            None => (body.to_string(), None),
        };
        // Only `--name` and `-n` take the next argument as their value.
        if value.is_none()
            && (!short || name.chars().count() == 1)
            && let Some(next) = self.args.get(self.pos)
            && !next.starts_with('-')
        {
            if bool_flag(&name) {
                return Err(fail(format!(
                    "ambiguous boolean flag {dash}{name} value: can't guess whether {next:?} is \
                     the flag value or a non-option argument \
                     (use {dash}{name}={next} or {dash}{name} -- {next})"
                )));
            }
            value = Some(next.clone());
            self.pos += 1;
        }

        let mut names = None;
        if short {
            let mut chars = name.chars();
            let first = chars.next().map(String::from).unwrap_or_default();
            let rest = chars.as_str().to_string();
            match value {
                Some(_) if !rest.is_empty() => {
                    return Err(fail(format!("invalid short option syntax for {name:?}")));
                }
                Some(_) => {}
                None if !bool_flag(&first) => {
                    if rest.is_empty() {
                        return Err(fail(format!("argument is required for option {name:?}")));
                    }
                    value = Some(rest);
                    name = first;
                }
                None => {
                    names = Some(name.chars().map(String::from).collect());
                    value = Some("true".to_string());
                }
            }
        } else if value.is_none() {
            if !bool_flag(&name) {
                return Err(fail(format!("argument is required for option {name:?}")));
            }
            value = Some("true".to_string());
        }
        if !is_valid_name(&name, short) {
            return Err(fail(format!("invalid option name: {name:?}")));
        }

        Ok(Some(Opt {
            names: names.unwrap_or_else(|| vec![name]),
            value: value.unwrap_or_default(),
        }))
    }
}

fn fail(message: String) -> FlagError {
    FlagError::Syntax {
        source_name: "posix",
        message,
    }
}

fn resolve<'a>(alias: &'a HashMap<String, String>, name: &'a str) -> &'a str {
    alias.get(name).map(String::as_str).unwrap_or(name)
}

fn is_bool(view: &FlagSetView<'_>, alias: &HashMap<String, String>, name: &str) -> bool {
    let name = resolve(alias, name);
    match view.lookup(name) {
        Some(flag) => flag.is_bool,
        None => is_help_name(name),
    }
}

/// Short names are letters and digits; long names may also use `.`, `_` and `-`.
fn is_valid_name(name: &str, short: bool) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || (!short && matches!(c, '.' | '_' | '-')))
}

impl builder::Parser for Parser {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        self.pos = 0;
        let alias = self.shorthands(view);
        while let Some(opt) = self.next(view, &alias)? {
            for name in &opt.names {
                let name = resolve(&alias, name);
                if view.lookup(name).is_none() && is_help_name(name) {
                    return Err(FlagError::Help);
                }
                view.set(name, &opt.value)?;
            }
        }
        Ok(())
    }

    fn printer(&self) -> Option<&dyn Printer> {
        Some(self)
    }
}

impl Printer for Parser {
    fn name(&self, view: &FlagSetView<'_>) -> Result<NameFn<'_>, FlagError> {
        let short = self.shorthands(view);
        Ok(Box::new(move |flag: &FlagInfo| {
            let mut names = Vec::new();
            if let Some(s) = self.shorthand_of(&flag.name)
                && short.contains_key(&s)
            {
                names.push(format!("-{s}"));
            }
            let dash = if flag.name.chars().count() == 1 { "-" } else { "--" };
            names.push(format!("{dash}{}", flag.name));
            names
        }))
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("args", &self.args)
            .field("shorthand", &self.shorthand)
            .field("pos", &self.pos)
            .finish()
    }
}
