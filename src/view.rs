//! Layered resolution view over a [`FlagSet`].
//!
//! A [`FlagSetView`] is opened once per resolution pass. Each source gets its
//! own *level*, started with [`next_level`](FlagSetView::next_level):
//!
//! - flags set before the level started are locked: setting them again is a
//!   silent no-op unless the level allows resetting;
//! - [stash](Stash) predicates hide flags from the current level only, so the
//!   source sees them as undefined;
//! - unknown names are errors unless the level ignores undefined flags.
//!
//! The view never hands out the underlying cells. Everything a source writes
//! goes through [`set`](FlagSetView::set), so precedence cannot be bypassed.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use tracing::debug;

use crate::error::FlagError;
use crate::flagset::{Flag, FlagSet};
use crate::flatten::Visitor;
use crate::node::Node;

/// Names reserved for help requests in every source.
pub fn is_help_name(name: &str) -> bool {
    name == "help" || name == "h"
}

/// Predicate hiding flags from one level.
#[derive(Clone)]
pub enum Stash {
    Name(String),
    Prefix(String),
    Regex(Regex),
    Fn(Rc<dyn Fn(&str) -> bool>),
}

impl Stash {
    pub fn name(name: impl Into<String>) -> Self {
        Stash::Name(name.into())
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Stash::Prefix(prefix.into())
    }

    pub fn func(f: impl Fn(&str) -> bool + 'static) -> Self {
        Stash::Fn(Rc::new(f))
    }

    pub fn hides(&self, name: &str) -> bool {
        match self {
            Stash::Name(n) => n == name,
            Stash::Prefix(p) => name.starts_with(p.as_str()),
            Stash::Regex(re) => re.is_match(name),
            Stash::Fn(f) => f(name),
        }
    }
}

impl fmt::Debug for Stash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stash::Name(n) => f.debug_tuple("Name").field(n).finish(),
            Stash::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            Stash::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Stash::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// `true` if any predicate in the list hides `name`.
pub fn stashed(stash: &[Stash], name: &str) -> bool {
    stash.iter().any(|s| s.hides(name))
}

/// Read-only snapshot of a flag, as seen by a source.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagInfo {
    pub name: String,
    pub usage: String,
    pub default: String,
    /// Current textual value.
    pub value: String,
    /// Current typed value, if the cell reports one.
    pub typed: Option<Node>,
    pub is_bool: bool,
}

impl From<&Flag> for FlagInfo {
    fn from(flag: &Flag) -> Self {
        let value = flag.value.borrow();
        Self {
            name: flag.name.clone(),
            usage: flag.usage.clone(),
            default: flag.default.clone(),
            value: value.to_string(),
            typed: value.get(),
            is_bool: value.is_bool_flag(),
        }
    }
}

pub struct FlagSetView<'a> {
    dest: &'a mut FlagSet,
    ignore_undefined: bool,
    allow_reset_specified: bool,
    provided: HashSet<String>,
    stash: Vec<Stash>,
}

impl<'a> FlagSetView<'a> {
    /// Open a view. Flags already set on `dest` count as specified.
    pub fn new(dest: &'a mut FlagSet) -> Self {
        let mut view = Self {
            dest,
            ignore_undefined: false,
            allow_reset_specified: false,
            provided: HashSet::new(),
            stash: Vec::new(),
        };
        view.snapshot();
        view
    }

    pub fn with_ignore_undefined(mut self, ignore: bool) -> Self {
        self.ignore_undefined = ignore;
        self
    }

    pub fn with_stash(mut self, stash: Stash) -> Self {
        self.stash.push(stash);
        self
    }

    /// Start a new precedence level.
    ///
    /// Clears the stash and the reset permission, and locks every flag that
    /// has been set on the registry so far, by any means.
    pub fn next_level(&mut self) {
        self.stash.clear();
        self.allow_reset_specified = false;
        self.snapshot();
    }

    fn snapshot(&mut self) {
        let mut provided = HashSet::new();
        self.dest.visit(|f| {
            provided.insert(f.name.clone());
        });
        self.provided = provided;
    }

    /// Hide more flags from the current level. Predicates accumulate.
    pub fn stash(&mut self, stash: Stash) {
        self.stash.push(stash);
    }

    pub fn set_ignore_undefined(&mut self, ignore: bool) {
        self.ignore_undefined = ignore;
    }

    pub fn ignores_undefined(&self) -> bool {
        self.ignore_undefined
    }

    /// Let the current level overwrite flags specified by earlier levels.
    pub fn allow_reset_specified(&mut self, allow: bool) {
        self.allow_reset_specified = allow;
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        stashed(&self.stash, name)
    }

    /// Whether `name` was specified before the current level started.
    pub fn is_specified(&self, name: &str) -> bool {
        self.provided.contains(name)
    }

    /// The underlying registry, bypassing the level's stash.
    pub fn registry(&self) -> &FlagSet {
        &*self.dest
    }

    fn visible(&self, name: &str) -> Option<&Flag> {
        if self.is_hidden(name) {
            return None;
        }
        self.dest.lookup(name)
    }

    /// Set a flag, honoring precedence, the stash and the undefined policy.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        if self.provided.contains(name) && !self.allow_reset_specified {
            debug!(flag = name, "already specified by an earlier source, ignoring");
            return Ok(());
        }
        if self.visible(name).is_none() {
            if is_help_name(name) {
                return Err(FlagError::Help);
            }
            if self.ignore_undefined {
                debug!(flag = name, "undefined flag ignored");
                return Ok(());
            }
            return Err(FlagError::Undefined {
                name: name.to_string(),
            });
        }
        self.dest.set(name, value)
    }

    pub fn lookup(&self, name: &str) -> Option<FlagInfo> {
        self.visible(name).map(FlagInfo::from)
    }

    /// Visit every flag not hidden by the stash, in name order.
    pub fn visit_all(&self, mut f: impl FnMut(&FlagInfo)) {
        for flag in self.dest.flags() {
            if !self.is_hidden(&flag.name) {
                f(&FlagInfo::from(flag));
            }
        }
    }

    /// Visit flags that are neither hidden nor specified by an earlier level.
    pub fn visit_unspecified(&self, mut f: impl FnMut(&FlagInfo)) {
        for flag in self.dest.flags() {
            if !self.is_hidden(&flag.name) && !self.provided.contains(&flag.name) {
                f(&FlagInfo::from(flag));
            }
        }
    }

    /// Owned list of visible flags, for sources that set while iterating.
    pub fn flags(&self) -> Vec<FlagInfo> {
        let mut out = Vec::new();
        self.visit_all(|f| out.push(f.clone()));
        out
    }

    pub fn unspecified(&self) -> Vec<FlagInfo> {
        let mut out = Vec::new();
        self.visit_unspecified(|f| out.push(f.clone()));
        out
    }
}

impl Visitor for FlagSetView<'_> {
    fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        FlagSetView::set(self, name, value)
    }

    fn has(&self, name: &str) -> bool {
        self.visible(name).is_some()
    }
}

impl fmt::Debug for FlagSetView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSetView")
            .field("ignore_undefined", &self.ignore_undefined)
            .field("allow_reset_specified", &self.allow_reset_specified)
            .field("provided", &self.provided)
            .field("stash", &self.stash)
            .finish()
    }
}
