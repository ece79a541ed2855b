//! The primitive flag registry: a flat, name-ordered map from flag name to a
//! shared [`FlagValue`] cell.
//!
//! A [`FlagSet`] knows nothing about sources or precedence. It only records
//! which flags have been set through it ("actual" flags); the
//! [resolution view](crate::view) builds its precedence snapshots from that.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use crate::error::FlagError;
use crate::value::{
    BoolValue, Cell, FlagValue, FloatValue, IntValue, ListValue, MapValue, StringValue, UintValue,
    ValueRef,
};

/// What the orchestrator does with an error surfaced by a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorHandling {
    /// Return the error to the caller.
    #[default]
    Continue,
    /// Print the error to stderr and exit the process with status 2.
    Exit,
    /// Panic with the error message.
    Panic,
}

/// A named flag. Cloning a `Flag` shares its cell.
#[derive(Clone)]
pub struct Flag {
    pub name: String,
    pub usage: String,
    /// Textual default, captured when the flag was defined.
    pub default: String,
    pub value: ValueRef,
}

impl Flag {
    pub fn new(name: impl Into<String>, usage: impl Into<String>, value: ValueRef) -> Self {
        let default = value.borrow().to_string();
        Self {
            name: name.into(),
            usage: usage.into(),
            default,
            value,
        }
    }

    pub fn is_bool_flag(&self) -> bool {
        self.value.borrow().is_bool_flag()
    }

    /// Current textual value.
    pub fn current(&self) -> String {
        self.value.borrow().to_string()
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("default", &self.default)
            .field("value", &self.current())
            .finish()
    }
}

/// Custom usage printer invoked on help requests.
pub type UsageFn = Rc<dyn Fn(&FlagSet)>;

#[derive(Default)]
pub struct FlagSet {
    name: String,
    error_handling: ErrorHandling,
    flags: BTreeMap<String, Flag>,
    actual: BTreeSet<String>,
    usage: Option<UsageFn>,
}

impl FlagSet {
    pub fn new(name: impl Into<String>, error_handling: ErrorHandling) -> Self {
        Self {
            name: name.into(),
            error_handling,
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    pub fn set_usage(&mut self, usage: impl Fn(&FlagSet) + 'static) {
        self.usage = Some(Rc::new(usage));
    }

    pub fn usage(&self) -> Option<UsageFn> {
        self.usage.clone()
    }

    /// Register an existing shared cell under `name`.
    pub fn var(
        &mut self,
        value: ValueRef,
        name: impl Into<String>,
        usage: impl Into<String>,
    ) -> Result<(), FlagError> {
        self.insert(Flag::new(name, usage, value))
    }

    /// Register a flag, failing if the name is taken.
    pub fn insert(&mut self, flag: Flag) -> Result<(), FlagError> {
        if self.flags.contains_key(&flag.name) {
            return Err(FlagError::Redefined { name: flag.name });
        }
        self.flags.insert(flag.name.clone(), flag);
        Ok(())
    }

    /// Register a typed cell and hand back a typed handle to it.
    pub fn define<V: FlagValue + 'static>(
        &mut self,
        name: &str,
        value: V,
        usage: &str,
    ) -> Result<Cell<V>, FlagError> {
        let cell = Rc::new(RefCell::new(value));
        self.var(cell.clone(), name, usage)?;
        Ok(cell)
    }

    pub fn string(
        &mut self,
        name: &str,
        default: &str,
        usage: &str,
    ) -> Result<Cell<StringValue>, FlagError> {
        self.define(name, StringValue(default.to_string()), usage)
    }

    pub fn bool(
        &mut self,
        name: &str,
        default: bool,
        usage: &str,
    ) -> Result<Cell<BoolValue>, FlagError> {
        self.define(name, BoolValue(default), usage)
    }

    pub fn int(&mut self, name: &str, default: i64, usage: &str) -> Result<Cell<IntValue>, FlagError> {
        self.define(name, IntValue(default), usage)
    }

    pub fn uint(
        &mut self,
        name: &str,
        default: u64,
        usage: &str,
    ) -> Result<Cell<UintValue>, FlagError> {
        self.define(name, UintValue(default), usage)
    }

    pub fn float(
        &mut self,
        name: &str,
        default: f64,
        usage: &str,
    ) -> Result<Cell<FloatValue>, FlagError> {
        self.define(name, FloatValue(default), usage)
    }

    pub fn list(&mut self, name: &str, usage: &str) -> Result<Cell<ListValue>, FlagError> {
        self.define(name, ListValue::default(), usage)
    }

    pub fn map(&mut self, name: &str, usage: &str) -> Result<Cell<MapValue>, FlagError> {
        self.define(name, MapValue::default(), usage)
    }

    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }

    /// Swap the flag registered under `flag.name` for `flag`, or add it.
    /// The "actual" state of the name is kept.
    pub fn replace(&mut self, flag: Flag) {
        self.flags.insert(flag.name.clone(), flag);
    }

    /// Parse `value` into the named flag and mark it as set.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        let flag = self.flags.get(name).ok_or_else(|| FlagError::Undefined {
            name: name.to_string(),
        })?;
        flag.value
            .borrow_mut()
            .set(value)
            .map_err(|source| FlagError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
                source,
            })?;
        self.actual.insert(name.to_string());
        Ok(())
    }

    /// Mark a flag as set without touching its value. Unknown names are ignored.
    pub fn set_actual(&mut self, name: &str) {
        if self.flags.contains_key(name) {
            self.actual.insert(name.to_string());
        }
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.actual.contains(name)
    }

    /// Visit every flag in name order.
    pub fn visit_all(&self, mut f: impl FnMut(&Flag)) {
        for flag in self.flags.values() {
            f(flag);
        }
    }

    /// Visit only flags that have been set, in name order.
    pub fn visit(&self, mut f: impl FnMut(&Flag)) {
        for name in &self.actual {
            if let Some(flag) = self.flags.get(name) {
                f(flag);
            }
        }
    }

    pub fn flags(&self) -> impl Iterator<Item = &Flag> {
        self.flags.values()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlagSet")
            .field("name", &self.name)
            .field("error_handling", &self.error_handling)
            .field("flags", &self.flags)
            .field("actual", &self.actual)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_handles_see_sets() {
        let mut fs = FlagSet::default();
        let port = fs.int("port", 8080, "port to listen on").unwrap();
        fs.set("port", "3000").unwrap();
        assert_eq!(port.borrow().value(), 3000);
        assert!(fs.is_set("port"));
    }

    #[test]
    fn default_is_captured_at_definition() {
        let mut fs = FlagSet::default();
        fs.string("host", "localhost", "").unwrap();
        fs.set("host", "0.0.0.0").unwrap();
        let flag = fs.lookup("host").unwrap();
        assert_eq!(flag.default, "localhost");
        assert_eq!(flag.current(), "0.0.0.0");
    }

    #[test]
    fn redefinition_fails() {
        let mut fs = FlagSet::default();
        fs.bool("debug", false, "").unwrap();
        let err = fs.bool("debug", true, "").unwrap_err();
        assert!(matches!(err, FlagError::Redefined { name } if name == "debug"));
    }

    #[test]
    fn set_unknown_is_undefined() {
        let mut fs = FlagSet::default();
        let err = fs.set("nope", "1").unwrap_err();
        assert!(matches!(err, FlagError::Undefined { name } if name == "nope"));
    }

    #[test]
    fn conversion_error_is_tagged_and_not_marked() {
        let mut fs = FlagSet::default();
        fs.uint("workers", 4, "").unwrap();
        let err = fs.set("workers", "-1").unwrap_err();
        assert!(matches!(&err, FlagError::InvalidValue { name, value, .. } if name == "workers" && value == "-1"));
        assert!(!fs.is_set("workers"));
    }

    #[test]
    fn visit_sees_only_actual_flags() {
        let mut fs = FlagSet::default();
        fs.string("a", "", "").unwrap();
        fs.string("b", "", "").unwrap();
        fs.set("b", "x").unwrap();
        fs.set_actual("a");
        fs.set_actual("missing");
        let mut seen = Vec::new();
        fs.visit(|f| seen.push(f.name.clone()));
        assert_eq!(seen, ["a", "b"]);
        assert_eq!(fs.lookup("a").unwrap().current(), "");
    }

    #[test]
    fn visit_all_is_name_ordered() {
        let mut fs = FlagSet::default();
        for name in ["zeta", "alpha", "mid"] {
            fs.string(name, "", "").unwrap();
        }
        let mut seen = Vec::new();
        fs.visit_all(|f| seen.push(f.name.clone()));
        assert_eq!(seen, ["alpha", "mid", "zeta"]);
    }
}
