//! Typed flag cells.
//!
//! A [`FlagValue`] is the mutable cell behind a flag: it accepts text through
//! [`set`](FlagValue::set), renders itself through `Display`, and optionally
//! reports a typed read-back through [`get`](FlagValue::get) that is compared
//! structurally when two cells are combined.
//!
//! Cells are shared through [`ValueRef`] so that a merged flag and the flags
//! it was built from can point at the same storage.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::error::ValueError;
use crate::node::Node;

pub trait FlagValue: fmt::Display {
    /// Parse `s` into the cell. Accumulating cells append instead of replacing.
    fn set(&mut self, s: &str) -> Result<(), ValueError>;

    /// Typed read-back. `None` means the cell has no comparable value.
    fn get(&self) -> Option<Node> {
        None
    }

    /// Boolean-shaped flags may be given without a value in textual sources.
    fn is_bool_flag(&self) -> bool {
        false
    }
}

/// Shared handle to a flag cell.
pub type ValueRef = Rc<RefCell<dyn FlagValue>>;

/// Typed handle returned by the [`FlagSet`](crate::FlagSet) helpers.
pub type Cell<T> = Rc<RefCell<T>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringValue(pub String);

impl StringValue {
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StringValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FlagValue for StringValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0 = s.to_string();
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::Str(self.0.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoolValue(pub bool);

impl BoolValue {
    pub fn value(&self) -> bool {
        self.0
    }
}

impl fmt::Display for BoolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FlagValue for BoolValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0 = parse_bool(s)?;
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::Bool(self.0))
    }

    fn is_bool_flag(&self) -> bool {
        true
    }
}

/// Accepts the spellings Go's `strconv.ParseBool` does, which is what users of
/// flag-style CLIs expect.
fn parse_bool(s: &str) -> Result<bool, ValueError> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("invalid boolean '{s}'").into()),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntValue(pub i64);

impl IntValue {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for IntValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FlagValue for IntValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0 = s.parse()?;
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::I64(self.0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UintValue(pub u64);

impl UintValue {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FlagValue for UintValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0 = s.parse()?;
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::U64(self.0))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FloatValue(pub f64);

impl FloatValue {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for FloatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FlagValue for FloatValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0 = s.parse()?;
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::F64(self.0))
    }
}

/// Every `set` appends one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListValue(pub Vec<String>);

impl ListValue {
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ListValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

impl FlagValue for ListValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0.push(s.to_string());
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::List(self.0.iter().cloned().map(Node::Str).collect()))
    }
}

/// Every `set` takes one `key:value` pair and inserts it.
///
/// This is the accumulating destination for maps that the flattener delivers
/// as aggregate strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapValue(pub BTreeMap<String, String>);

impl MapValue {
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

impl fmt::Display for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{k}:{v}")?;
        }
        Ok(())
    }
}

impl FlagValue for MapValue {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        let (k, v) = s
            .split_once(':')
            .ok_or_else(|| format!("expected key:value, got '{s}'"))?;
        self.0.insert(k.to_string(), v.to_string());
        Ok(())
    }

    fn get(&self) -> Option<Node> {
        Some(Node::Map(
            self.0
                .iter()
                .map(|(k, v)| (Node::Str(k.clone()), Node::Str(v.clone())))
                .collect(),
        ))
    }
}

/// Two cells driven as one. See [`combine_flags`](crate::merge::combine_flags).
///
/// `set` applies to both cells in order and stops at the first failure.
/// `get` and `Display` report a value only while both cells agree.
#[derive(Clone)]
pub struct ValuePair(pub ValueRef, pub ValueRef);

impl fmt::Display for ValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s0 = self.0.borrow().to_string();
        let s1 = self.1.borrow().to_string();
        if s0 != s1 {
            return Ok(());
        }
        f.write_str(&s0)
    }
}

impl FlagValue for ValuePair {
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        self.0.borrow_mut().set(s)?;
        self.1.borrow_mut().set(s)
    }

    fn get(&self) -> Option<Node> {
        let v0 = self.0.borrow().get();
        let v1 = self.1.borrow().get();
        if v0 != v1 {
            return None;
        }
        v0
    }

    fn is_bool_flag(&self) -> bool {
        self.0.borrow().is_bool_flag() && self.1.borrow().is_bool_flag()
    }
}

/// Wraps a cell, replacing its `set` with a custom function while keeping
/// the wrapped cell's read side.
pub struct OverrideSet<F> {
    inner: ValueRef,
    set: F,
}

impl<F> OverrideSet<F>
where
    F: FnMut(&str) -> Result<(), ValueError>,
{
    pub fn new(inner: ValueRef, set: F) -> Self {
        Self { inner, set }
    }
}

impl<F> fmt::Display for OverrideSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.borrow())
    }
}

impl<F> FlagValue for OverrideSet<F>
where
    F: FnMut(&str) -> Result<(), ValueError>,
{
    fn set(&mut self, s: &str) -> Result<(), ValueError> {
        (self.set)(s)
    }

    fn get(&self) -> Option<Node> {
        self.inner.borrow().get()
    }

    fn is_bool_flag(&self) -> bool {
        self.inner.borrow().is_bool_flag()
    }
}
