//! Environment variables.
//!
//! Each visible flag is looked up under an upper-cased variable name built
//! from the flag name: `server.max-conns` with prefix `APP_` reads
//! `APP_SERVER__MAX_CONNS`. Dots become the set separator (`__` by default)
//! and the replacement table (`-` to `_` by default) applies afterwards.
//!
//! Lookup goes through a function so tests can pass synthetic data instead of
//! the process environment.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::builder::{self, NameFn, Printer};
use crate::error::FlagError;
use crate::flatten::SET_SEPARATOR;
use crate::view::{FlagInfo, FlagSetView};

pub const DEFAULT_SET_SEPARATOR: &str = "__";

type LookupFn = Box<dyn Fn(&str) -> Option<String>>;

pub struct Parser {
    prefix: String,
    set_separator: String,
    list_separator: Option<String>,
    replace: Vec<(String, String)>,
    lookup: LookupFn,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            set_separator: DEFAULT_SET_SEPARATOR.to_string(),
            list_separator: None,
            replace: vec![("-".to_string(), "_".to_string())],
            lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }
}

impl Parser {
    /// Read from the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from `vars` instead of the process environment.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        Self::default().with_lookup(move |name| vars.get(name).cloned())
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// What dots in flag names turn into.
    pub fn with_set_separator(mut self, separator: &str) -> Self {
        self.set_separator = separator.to_string();
        self
    }

    /// Split values on `separator` and set each part, for list flags.
    pub fn with_list_separator(mut self, separator: &str) -> Self {
        self.list_separator = Some(separator.to_string()).filter(|s| !s.is_empty());
        self
    }

    /// Replace the default `-` to `_` table.
    pub fn with_replace<I, K, V>(mut self, table: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.replace = table
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.lookup = Box::new(lookup);
        self
    }

    /// Variable name read for `flag`.
    pub fn var_name(&self, flag: &str) -> String {
        let raw = format!("{}{}", self.prefix, flag.to_uppercase());
        let mut table = Vec::with_capacity(self.replace.len() + 1);
        table.push((SET_SEPARATOR, self.set_separator.as_str()));
        table.extend(self.replace.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        replace_all(&raw, &table)
    }
}

/// Single left-to-right pass; at each position the first matching entry
/// wins and its output is not scanned again.
fn replace_all(s: &str, table: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    'scan: while let Some(c) = rest.chars().next() {
        for (old, new) in table {
            if !old.is_empty()
                && let Some(tail) = rest.strip_prefix(old)
            {
                out.push_str(new);
                rest = tail;
                continue 'scan;
            }
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

impl builder::Parser for Parser {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        for flag in view.flags() {
            let name = self.var_name(&flag.name);
            let Some(value) = (self.lookup)(&name) else {
                continue;
            };
            trace!(var = %name, flag = %flag.name, "found environment variable");
            match &self.list_separator {
                Some(sep) => {
                    for part in value.split(sep.as_str()) {
                        view.set(&flag.name, part)?;
                    }
                }
                None => view.set(&flag.name, &value)?,
            }
        }
        Ok(())
    }

    fn printer(&self) -> Option<&dyn Printer> {
        Some(self)
    }
}

impl Printer for Parser {
    fn name(&self, _view: &FlagSetView<'_>) -> Result<NameFn<'_>, FlagError> {
        Ok(Box::new(|flag: &FlagInfo| vec![format!("${}", self.var_name(&flag.name))]))
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("prefix", &self.prefix)
            .field("set_separator", &self.set_separator)
            .field("list_separator", &self.list_separator)
            .field("replace", &self.replace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Parser as _;
    use crate::fixtures::test::{flags_named, pairs, recording, sample_flags};

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prefixed_and_nested_names() {
        let mut fs = flags_named(&["foo", "bar.baz", "xxx"], &[]);
        let log = recording(&mut fs);
        let mut parser = Parser::from_vars(vars(&[("F_FOO", "bar"), ("F_BAR__BAZ", "qux")]))
            .with_prefix("F_");
        parser.parse(&mut FlagSetView::new(&mut fs)).unwrap();
        assert_eq!(*log.borrow(), pairs(&[("bar.baz", "qux"), ("foo", "bar")]));
    }

    #[test]
    fn var_names() {
        let parser = Parser::new().with_prefix("APP_");
        assert_eq!(parser.var_name("server.max-conns"), "APP_SERVER__MAX_CONNS");
        let parser = Parser::new().with_set_separator("_").with_replace([(".", "-")]);
        assert_eq!(parser.var_name("a.b-c"), "A_B-C");
    }

    #[test]
    fn list_separator_splits_values() {
        let mut fs = sample_flags();
        let mut parser =
            Parser::from_vars(vars(&[("TAGS", "a;b;c")])).with_list_separator(";");
        parser.parse(&mut FlagSetView::new(&mut fs)).unwrap();
        assert_eq!(fs.lookup("tags").unwrap().current(), "a,b,c");
    }

    #[test]
    fn earlier_sources_win() {
        let mut fs = sample_flags();
        fs.set("foo", "cli").unwrap();
        let mut parser = Parser::from_vars(vars(&[("FOO", "env"), ("PORT", "9090")]));
        parser.parse(&mut FlagSetView::new(&mut fs)).unwrap();
        assert_eq!(fs.lookup("foo").unwrap().current(), "cli");
        assert_eq!(fs.lookup("port").unwrap().current(), "9090");
    }

    #[test]
    fn conversion_errors_carry_the_flag_name() {
        let mut fs = sample_flags();
        let mut parser = Parser::from_vars(vars(&[("PORT", "eighty")]));
        let err = parser.parse(&mut FlagSetView::new(&mut fs)).unwrap_err();
        assert!(matches!(err, FlagError::InvalidValue { name, .. } if name == "port"));
    }

    #[test]
    fn printed_names() {
        let mut fs = flags_named(&["db.url"], &[]);
        let parser = Parser::new().with_prefix("APP_");
        let view = FlagSetView::new(&mut fs);
        let name = parser.name(&view).unwrap();
        assert_eq!(name(&view.lookup("db.url").unwrap()), ["$APP_DB__URL"]);
    }
}
