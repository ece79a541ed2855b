//! Usage listing rendering.
//!
//! One entry per flag:
//!
//! ```text
//!   -p, --port, $PORT
//!     	int
//!     	port to listen on (default 8080)
//! ```
//!
//! The second line carries the value name: a back-quoted word in the usage
//! string, or the type inferred from the cell, depending on the
//! [`UnquoteUsageMode`].

use std::fmt;
use std::io::{self, Write};
use std::ops::BitOr;

use crate::node::Node;
use crate::view::FlagInfo;

const INDENT: &str = "\n    \t";

/// How back-quoted value names in usage strings are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnquoteUsageMode(u8);

impl UnquoteUsageMode {
    /// Leave usage untouched and print no value name.
    pub const NOTHING: Self = Self(0);
    /// Use the back-quoted word as value name and unquote it in the usage.
    pub const QUOTED: Self = Self(1);
    /// Infer the value name from the flag's cell.
    pub const INFER_TYPE: Self = Self(1 << 1);
    /// Drop the back-quoted word from the usage.
    pub const CLEAN: Self = Self(1 << 2);
    pub const DEFAULT: Self = Self(Self::QUOTED.0 | Self::INFER_TYPE.0);

    pub fn has(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for UnquoteUsageMode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl BitOr for UnquoteUsageMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for UnquoteUsageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::NOTHING => "Nothing",
            Self::QUOTED => "Quoted",
            Self::INFER_TYPE => "InferType",
            Self::CLEAN => "Clean",
            Self::DEFAULT => "Default",
            _ => return write!(f, "UnquoteUsageMode({:#b})", self.0),
        };
        f.write_str(name)
    }
}

/// Split a flag's usage into a value name and the usage text to print.
pub fn unquote_usage(mode: UnquoteUsageMode, flag: &FlagInfo) -> (String, String) {
    let usage = flag.usage.as_str();
    if mode == UnquoteUsageMode::NOTHING {
        return (String::new(), usage.to_string());
    }
    let inferred_or_nothing = || {
        if mode.has(UnquoteUsageMode::INFER_TYPE) {
            (infer_type(flag).to_string(), usage.to_string())
        } else {
            (String::new(), usage.to_string())
        }
    };
    let Some(i) = usage.find('`') else {
        return inferred_or_nothing();
    };
    let Some(j) = usage[i + 1..].find('`').map(|j| j + i + 1) else {
        return inferred_or_nothing();
    };

    let name = if mode.has(UnquoteUsageMode::QUOTED) {
        usage[i + 1..j].to_string()
    } else if mode.has(UnquoteUsageMode::INFER_TYPE) {
        infer_type(flag).to_string()
    } else {
        String::new()
    };

    let (prefix, suffix) = (&usage[..i], &usage[j + 1..]);
    let usage = if mode.has(UnquoteUsageMode::CLEAN) {
        format!("{} {}", prefix.trim_end_matches(' '), suffix.trim_start_matches(' '))
    } else if mode.has(UnquoteUsageMode::QUOTED) {
        format!("{prefix}{name}{suffix}")
    } else {
        usage.to_string()
    };
    (name, usage)
}

/// Value name derived from what the cell holds. Empty when unknown.
pub fn infer_type(flag: &FlagInfo) -> &'static str {
    if flag.is_bool {
        return "bool";
    }
    match &flag.typed {
        Some(Node::Str(_)) => "string",
        Some(Node::F32(_) | Node::F64(_)) => "float",
        Some(Node::I8(_) | Node::I16(_) | Node::I32(_) | Node::I64(_)) => "int",
        Some(Node::U8(_) | Node::U16(_) | Node::U32(_) | Node::U64(_)) => "uint",
        Some(Node::List(_)) => "list",
        Some(Node::Map(_)) => "object",
        _ => "",
    }
}

/// Default as printed in the listing. String defaults are quoted; empty
/// strings, lists and maps print as `""`, `[]` and `{}`.
pub fn def_value(flag: &FlagInfo) -> String {
    if !flag.default.is_empty() {
        if let Some(Node::Str(_)) = flag.typed {
            return format!("\"{}\"", flag.default);
        }
        return flag.default.clone();
    }
    match flag.typed {
        Some(Node::Str(_)) => "\"\"".to_string(),
        Some(Node::List(_)) => "[]".to_string(),
        Some(Node::Map(_)) => "{}".to_string(),
        _ => String::new(),
    }
}

/// Render one listing entry. `names` must not be empty.
pub fn write_entry(
    out: &mut dyn Write,
    names: &[String],
    flag: &FlagInfo,
    mode: UnquoteUsageMode,
) -> io::Result<()> {
    let mut buf = String::from("  ");
    buf.push_str(&names.join(", "));

    let (name, usage) = unquote_usage(mode, flag);
    if !name.is_empty() {
        buf.push_str(INDENT);
        buf.push_str(&name);
    }
    let value = def_value(flag);
    buf.push_str(INDENT);
    if !usage.is_empty() {
        buf.push_str(&usage.replace('\n', INDENT));
        if !value.is_empty() {
            buf.push_str(" (");
        }
    }
    if !value.is_empty() {
        buf.push_str("default ");
        buf.push_str(&value);
        if !usage.is_empty() {
            buf.push(')');
        }
    }
    buf.push_str("\n\n");
    out.write_all(buf.as_bytes())
}
