//! Project a nested [`Node`] tree onto dotted flag names.
//!
//! Every scalar leaf becomes one `set(path, text)` call on a [`Visitor`]:
//!
//! - map entries extend the path: `{"database": {"url": "pg://"}}` sets
//!   `database.url`;
//! - list elements repeat the path: `{"tags": ["a", "b"]}` sets `tags` twice;
//! - a map whose path the visitor [`has`](Visitor::has) is delivered as one
//!   `key:value` string per entry, for flags that accumulate map entries
//!   themselves.
//!
//! No format-specific logic lives here; decoders only have to produce a `Node`.

use tracing::trace;

use crate::error::{FlagError, FlattenError};
use crate::node::Node;

/// Separator between the segments of a dotted flag name.
pub const SET_SEPARATOR: &str = ".";

/// Destination of flattened `(name, value)` pairs.
pub trait Visitor {
    fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError>;

    /// Whether a map found at `name` should be delivered whole, as `key:value`
    /// strings, instead of being expanded into `name.key` paths.
    fn has(&self, name: &str) -> bool;
}

/// A [`Visitor`] made of two closures.
pub struct VisitorFn<S, H> {
    pub set: S,
    pub has: H,
}

impl<S, H> Visitor for VisitorFn<S, H>
where
    S: FnMut(&str, &str) -> Result<(), FlagError>,
    H: Fn(&str) -> bool,
{
    fn set(&mut self, name: &str, value: &str) -> Result<(), FlagError> {
        (self.set)(name, value)
    }

    fn has(&self, name: &str) -> bool {
        (self.has)(name)
    }
}

/// Flatten `node` from the root. Stops at the first error.
pub fn flatten<V: Visitor + ?Sized>(node: &Node, visitor: &mut V) -> Result<(), FlagError> {
    flatten_at(node, "", visitor)
}

/// Flatten `node` as if it were found at path `prefix`.
pub fn flatten_at<V: Visitor + ?Sized>(
    node: &Node,
    prefix: &str,
    visitor: &mut V,
) -> Result<(), FlagError> {
    match node {
        Node::Map(entries) => {
            if visitor.has(prefix) {
                for (key, value) in entries {
                    let pair = format!("{}:{}", stringify(key)?, stringify(value)?);
                    emit(visitor, prefix, &pair)?;
                }
            } else {
                for (key, value) in entries {
                    let key = stringify(key)?;
                    flatten_at(value, &join(prefix, &key), visitor)?;
                }
            }
        }
        Node::List(items) => {
            for item in items {
                emit(visitor, prefix, &stringify(item)?)?;
            }
        }
        scalar => emit(visitor, prefix, &stringify(scalar)?)?,
    }
    Ok(())
}

fn emit<V: Visitor + ?Sized>(visitor: &mut V, name: &str, value: &str) -> Result<(), FlagError> {
    if name.is_empty() {
        return Err(FlattenError::EmptyKey.into());
    }
    trace!(flag = name, value, "flattened leaf");
    visitor.set(name, value)
}

/// Dotted-path join: `b` when `a` is empty, else `a.b`.
pub fn join(a: &str, b: &str) -> String {
    join_with(a, b, SET_SEPARATOR)
}

pub fn join_with(a: &str, b: &str, separator: &str) -> String {
    if a.is_empty() {
        return b.to_string();
    }
    format!("{a}{separator}{b}")
}

/// Render a scalar the way textual sources would spell it.
///
/// Floats use the shortest representation that parses back to the same
/// value, without exponent notation. Infinities are `inf` and `-inf`, NaN is
/// `NaN`: the spellings `str::parse` accepts back.
pub fn stringify(node: &Node) -> Result<String, FlattenError> {
    let s = match node {
        Node::Bool(v) => v.to_string(),
        Node::I8(v) => v.to_string(),
        Node::I16(v) => v.to_string(),
        Node::I32(v) => v.to_string(),
        Node::I64(v) => v.to_string(),
        Node::U8(v) => v.to_string(),
        Node::U16(v) => v.to_string(),
        Node::U32(v) => v.to_string(),
        Node::U64(v) => v.to_string(),
        Node::F32(v) => v.to_string(),
        Node::F64(v) => v.to_string(),
        Node::Str(v) => v.clone(),
        other => {
            return Err(FlattenError::Unstringifiable { kind: other.kind() });
        }
    };
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn collect(node: &Node, has: &[&str]) -> Result<Vec<(String, String)>, FlagError> {
        let mut pairs = Vec::new();
        let mut visitor = VisitorFn {
            set: |name: &str, value: &str| -> Result<(), FlagError> {
                pairs.push((name.to_string(), value.to_string()));
                Ok(())
            },
            has: |name: &str| has.iter().any(|h| *h == name),
        };
        flatten(node, &mut visitor)?;
        Ok(pairs)
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn basic() {
        let node = Node::map([("foo", "bar")]);
        assert_eq!(collect(&node, &[]).unwrap(), pairs(&[("foo", "bar")]));
    }

    #[test]
    fn list_repeats_the_name_in_order() {
        let node = Node::map([("x", Node::list(["a", "b", "c"]))]);
        assert_eq!(
            collect(&node, &[]).unwrap(),
            pairs(&[("x", "a"), ("x", "b"), ("x", "c")])
        );
    }

    #[test]
    fn nested_maps_join_with_dots() {
        let node = Node::map([("foo", Node::map([("bar", "baz")]))]);
        assert_eq!(collect(&node, &[]).unwrap(), pairs(&[("foo.bar", "baz")]));
    }

    #[test]
    fn non_string_keys_are_stringified() {
        let node = Node::Map(vec![(Node::I64(1), Node::I64(2))]);
        assert_eq!(collect(&node, &[]).unwrap(), pairs(&[("1", "2")]));
    }

    #[test]
    fn aggregate_map_is_delivered_as_key_value_strings() {
        let node = Node::map([("m", Node::map([("k1", "v1"), ("k2", "v2")]))]);
        let got: HashSet<_> = collect(&node, &["m"]).unwrap().into_iter().collect();
        let want: HashSet<_> = pairs(&[("m", "k1:v1"), ("m", "k2:v2")]).into_iter().collect();
        assert_eq!(got, want);
    }

    #[test]
    fn aggregate_applies_at_depth() {
        let node = Node::map([(
            "foo",
            Node::map([("bar", Node::map([("baz", "yes")]))]),
        )]);
        assert_eq!(
            collect(&node, &["foo.bar"]).unwrap(),
            pairs(&[("foo.bar", "baz:yes")])
        );
    }

    #[test]
    fn map_inside_list_is_rejected() {
        let node = Node::map([("slice", Node::list([Node::map([("foo", "bar")])]))]);
        let err = collect(&node, &[]).unwrap_err();
        assert!(matches!(
            err,
            FlagError::Flatten(FlattenError::Unstringifiable { kind: "map" })
        ));
    }

    #[test]
    fn null_leaf_is_rejected() {
        let node = Node::map([("x", Node::Null)]);
        assert!(matches!(
            collect(&node, &[]),
            Err(FlagError::Flatten(FlattenError::Unstringifiable { kind: "null" }))
        ));
    }

    #[test]
    fn bare_root_scalar_has_no_name() {
        let err = collect(&Node::from("lonely"), &[]).unwrap_err();
        assert!(matches!(err, FlagError::Flatten(FlattenError::EmptyKey)));
    }

    #[test]
    fn visitor_errors_abort_the_walk() {
        let node = Node::map([("a", "1"), ("b", "2")]);
        let mut calls = 0;
        let mut visitor = VisitorFn {
            set: |name: &str, _: &str| -> Result<(), FlagError> {
                calls += 1;
                Err(FlagError::Undefined {
                    name: name.to_string(),
                })
            },
            has: |_: &str| false,
        };
        let err = flatten(&node, &mut visitor).unwrap_err();
        assert!(matches!(err, FlagError::Undefined { name } if name == "a"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn prefix_is_respected() {
        let node = Node::map([("port", Node::I64(80))]);
        let mut got = Vec::new();
        let mut visitor = VisitorFn {
            set: |name: &str, value: &str| -> Result<(), FlagError> {
                got.push(format!("{name}={value}"));
                Ok(())
            },
            has: |_: &str| false,
        };
        flatten_at(&node, "server", &mut visitor).unwrap();
        assert_eq!(got, ["server.port=80"]);
    }

    #[test]
    fn scalar_table() {
        assert_eq!(stringify(&Node::Bool(false)).unwrap(), "false");
        assert_eq!(stringify(&Node::I8(-8)).unwrap(), "-8");
        assert_eq!(stringify(&Node::U64(u64::MAX)).unwrap(), "18446744073709551615");
        assert_eq!(stringify(&Node::F64(2.75)).unwrap(), "2.75");
        assert_eq!(stringify(&Node::F64(1.0)).unwrap(), "1");
        assert_eq!(stringify(&Node::F32(0.1)).unwrap(), "0.1");
        assert_eq!(stringify(&Node::F64(1e21)).unwrap(), "1000000000000000000000");
        assert_eq!(stringify(&Node::F64(f64::INFINITY)).unwrap(), "inf");
        assert_eq!(stringify(&Node::F32(f32::NEG_INFINITY)).unwrap(), "-inf");
        assert_eq!(stringify(&Node::F64(f64::NAN)).unwrap(), "NaN");
        assert_eq!("inf".parse::<f64>().unwrap(), f64::INFINITY);
    }

    #[test]
    fn join_paths() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "b"), "a.b");
        assert_eq!(join_with("a", "b", "/"), "a/b");
    }
}
