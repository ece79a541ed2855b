//! Generic nested values, as produced by file decoders and serializers.
//!
//! [`Node`] is a closed tagged union: keyed collections, ordered collections
//! and a fixed table of scalar kinds. Anything that can be deserialized with
//! serde (JSON, TOML, YAML documents) can be decoded into a `Node` directly,
//! which is how the file source feeds the [flattener](crate::flatten).

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// Field name `toml` uses to smuggle datetimes through serde.
const TOML_DATETIME_FIELD: &str = "$__toml_private_datetime";

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Keyed collection. Entries keep the decoder's iteration order.
    Map(Vec<(Node, Node)>),
    /// Ordered collection.
    List(Vec<Node>),
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    /// Explicit null (`null` in JSON, `~` in YAML, `Option::None`).
    Null,
}

impl Node {
    /// Build a map node from `(key, value)` pairs with string keys.
    pub fn map<K, V, I>(entries: I) -> Node
    where
        K: Into<String>,
        V: Into<Node>,
        I: IntoIterator<Item = (K, V)>,
    {
        Node::Map(
            entries
                .into_iter()
                .map(|(k, v)| (Node::Str(k.into()), v.into()))
                .collect(),
        )
    }

    pub fn list<V, I>(items: I) -> Node
    where
        V: Into<Node>,
        I: IntoIterator<Item = V>,
    {
        Node::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the node's kind, used in error messages and usage output.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Map(_) => "map",
            Node::List(_) => "list",
            Node::Bool(_) => "bool",
            Node::I8(_) => "i8",
            Node::I16(_) => "i16",
            Node::I32(_) => "i32",
            Node::I64(_) => "i64",
            Node::U8(_) => "u8",
            Node::U16(_) => "u16",
            Node::U32(_) => "u32",
            Node::U64(_) => "u64",
            Node::F32(_) => "f32",
            Node::F64(_) => "f64",
            Node::Str(_) => "string",
            Node::Null => "null",
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Node::Map(_) | Node::List(_) | Node::Null)
    }
}

impl From<bool> for Node {
    fn from(v: bool) -> Self {
        Node::Bool(v)
    }
}

impl From<i64> for Node {
    fn from(v: i64) -> Self {
        Node::I64(v)
    }
}

impl From<i32> for Node {
    fn from(v: i32) -> Self {
        Node::I32(v)
    }
}

impl From<u64> for Node {
    fn from(v: u64) -> Self {
        Node::U64(v)
    }
}

impl From<f64> for Node {
    fn from(v: f64) -> Self {
        Node::F64(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::Str(v.to_string())
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::Str(v)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any structured value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Node, E> {
        Ok(Node::Bool(v))
    }

    fn visit_i8<E: de::Error>(self, v: i8) -> Result<Node, E> {
        Ok(Node::I8(v))
    }

    fn visit_i16<E: de::Error>(self, v: i16) -> Result<Node, E> {
        Ok(Node::I16(v))
    }

    fn visit_i32<E: de::Error>(self, v: i32) -> Result<Node, E> {
        Ok(Node::I32(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Node, E> {
        Ok(Node::I64(v))
    }

    fn visit_u8<E: de::Error>(self, v: u8) -> Result<Node, E> {
        Ok(Node::U8(v))
    }

    fn visit_u16<E: de::Error>(self, v: u16) -> Result<Node, E> {
        Ok(Node::U16(v))
    }

    fn visit_u32<E: de::Error>(self, v: u32) -> Result<Node, E> {
        Ok(Node::U32(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Node, E> {
        Ok(Node::U64(v))
    }

    fn visit_f32<E: de::Error>(self, v: f32) -> Result<Node, E> {
        Ok(Node::F32(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Node, E> {
        Ok(Node::F64(v))
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<Node, E> {
        Ok(Node::Str(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Node, E> {
        Ok(Node::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Node, E> {
        Ok(Node::Str(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Node, E> {
        Ok(Node::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Node, D::Error> {
        Node::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Node, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Node, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<Node>()? {
            let value = map.next_value::<Node>()?;
            entries.push((key, value));
        }
        // TOML datetimes arrive as a single-entry map with a private key.
        if let [(Node::Str(key), Node::Str(datetime))] = entries.as_slice()
            && key == TOML_DATETIME_FIELD
        {
            return Ok(Node::Str(datetime.clone()));
        }
        Ok(Node::Map(entries))
    }
}
