//! Programmatic overrides from any `serde::Serialize` value.
//!
//! The value is serialized into a [`Node`] and flattened like a config file,
//! so a struct with a nested `database` struct sets `database.url` and so on.
//! `None` fields are skipped.

use serde::Serialize;

use crate::builder;
use crate::error::FlagError;
use crate::flatten::flatten;
use crate::node::Node;
use crate::ser::to_node;
use crate::view::FlagSetView;

#[derive(Debug, Clone, PartialEq)]
pub struct Parser {
    node: Node,
}

impl Parser {
    pub fn new<T: Serialize + ?Sized>(value: &T) -> Result<Self, FlagError> {
        Ok(Self {
            node: to_node(value)?,
        })
    }

    /// Use an already built tree.
    pub fn from_node(node: Node) -> Self {
        Self { node }
    }
}

impl builder::Parser for Parser {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        match &self.node {
            Node::Null => Ok(()),
            node => flatten(node, view),
        }
    }
}
