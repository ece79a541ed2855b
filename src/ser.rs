//! serde `Serializer` that turns any `Serialize` value into a [`Node`].
//!
//! Used by the [object source](crate::parse::object) to feed programmatic
//! overrides through the same flattening path as files. `Option::None` struct
//! fields and map entries are dropped, so partially filled override structs
//! only touch the fields they carry, without `#[serde(skip_serializing_if)]`.
//!
//! Enum variants with data are externally tagged, the way the file formats
//! spell them: `Mode::Fixed(3)` becomes `{"Fixed": 3}`.

use serde::ser::{self, Serialize};

use crate::error::FlagError;
use crate::node::Node;

impl ser::Error for FlagError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        FlagError::Decode {
            format: "serialize",
            reason: msg.to_string(),
        }
    }
}

/// Serialize `value` into a tree.
pub fn to_node<T: Serialize + ?Sized>(value: &T) -> Result<Node, FlagError> {
    value.serialize(NodeSerializer)
}

struct NodeSerializer;

impl ser::Serializer for NodeSerializer {
    type Ok = Node;
    type Error = FlagError;
    type SerializeSeq = SeqBuilder;
    type SerializeTuple = SeqBuilder;
    type SerializeTupleStruct = SeqBuilder;
    type SerializeTupleVariant = SeqBuilder;
    type SerializeMap = MapBuilder;
    type SerializeStruct = MapBuilder;
    type SerializeStructVariant = MapBuilder;

    fn serialize_bool(self, v: bool) -> Result<Node, FlagError> {
        Ok(Node::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Node, FlagError> {
        Ok(Node::I8(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Node, FlagError> {
        Ok(Node::I16(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Node, FlagError> {
        Ok(Node::I32(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Node, FlagError> {
        Ok(Node::I64(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Node, FlagError> {
        Ok(Node::U8(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Node, FlagError> {
        Ok(Node::U16(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Node, FlagError> {
        Ok(Node::U32(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Node, FlagError> {
        Ok(Node::U64(v))
    }

    fn serialize_f32(self, v: f32) -> Result<Node, FlagError> {
        Ok(Node::F32(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Node, FlagError> {
        Ok(Node::F64(v))
    }

    fn serialize_char(self, v: char) -> Result<Node, FlagError> {
        Ok(Node::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Node, FlagError> {
        Ok(Node::Str(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Node, FlagError> {
        Err(ser::Error::custom("bytes not supported"))
    }

    fn serialize_none(self) -> Result<Node, FlagError> {
        Ok(Node::Null)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Node, FlagError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Node, FlagError> {
        Ok(Node::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Node, FlagError> {
        Ok(Node::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Node, FlagError> {
        Ok(Node::Str(variant.to_string()))
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Node, FlagError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Node, FlagError> {
        Ok(Node::Map(vec![(
            Node::Str(variant.to_string()),
            to_node(value)?,
        )]))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder, FlagError> {
        Ok(SeqBuilder {
            variant: None,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder, FlagError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SeqBuilder, FlagError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SeqBuilder, FlagError> {
        Ok(SeqBuilder {
            variant: Some(variant),
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder, FlagError> {
        Ok(MapBuilder {
            variant: None,
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<MapBuilder, FlagError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<MapBuilder, FlagError> {
        Ok(MapBuilder {
            variant: Some(variant),
            entries: Vec::with_capacity(len),
            pending_key: None,
        })
    }
}

/// Wrap `node` as `{variant: node}` when serializing an enum variant.
fn tagged(variant: Option<&'static str>, node: Node) -> Node {
    match variant {
        Some(v) => Node::Map(vec![(Node::Str(v.to_string()), node)]),
        None => node,
    }
}

struct SeqBuilder {
    variant: Option<&'static str>,
    items: Vec<Node>,
}

impl SeqBuilder {
    fn push<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FlagError> {
        self.items.push(to_node(value)?);
        Ok(())
    }

    fn finish(self) -> Node {
        tagged(self.variant, Node::List(self.items))
    }
}

impl ser::SerializeSeq for SeqBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FlagError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTuple for SeqBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FlagError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleStruct for SeqBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FlagError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}

impl ser::SerializeTupleVariant for SeqBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FlagError> {
        self.push(value)
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}

struct MapBuilder {
    variant: Option<&'static str>,
    entries: Vec<(Node, Node)>,
    pending_key: Option<Node>,
}

impl MapBuilder {
    /// Null values are absent values: the entry is dropped.
    fn entry(&mut self, key: Node, value: Node) {
        if value != Node::Null {
            self.entries.push((key, value));
        }
    }

    fn finish(self) -> Node {
        tagged(self.variant, Node::Map(self.entries))
    }
}

impl ser::SerializeMap for MapBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), FlagError> {
        self.pending_key = Some(to_node(key)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), FlagError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| <FlagError as ser::Error>::custom("map value without a key"))?;
        let value = to_node(value)?;
        self.entry(key, value);
        Ok(())
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStruct for MapBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), FlagError> {
        let value = to_node(value)?;
        self.entry(Node::Str(key.to_string()), value);
        Ok(())
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}

impl ser::SerializeStructVariant for MapBuilder {
    type Ok = Node;
    type Error = FlagError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), FlagError> {
        let value = to_node(value)?;
        self.entry(Node::Str(key.to_string()), value);
        Ok(())
    }

    fn end(self) -> Result<Node, FlagError> {
        Ok(self.finish())
    }
}
