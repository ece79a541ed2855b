//! Structured config files.
//!
//! A file source is a [`Lookup`] (where the bytes come from) plus a
//! [`Syntax`] (how they decode into a [`Node`]). The decoded document is
//! [flattened](crate::flatten) onto the view, so `{"db": {"url": "x"}}` sets
//! `db.url`.
//!
//! # Discovery
//!
//! - [`Lookup::Path`] reads one explicit path.
//! - [`Lookup::Platform`] reads `file_name` from the platform config directory
//!   (`~/.config/{app_name}/` on Linux).
//! - [`Lookup::Ancestors`] walks from a start directory (the CWD by default)
//!   toward the root and reads the nearest `file_name` found. The
//!   [`Boundary`] controls where the walk ends.
//! - [`Lookup::Flag`] reads the path held by another flag, typically
//!   `--config`. An empty value means no file.
//! - [`Lookup::Bytes`] is an in-memory document.
//! - [`Lookup::Multi`] tries several lookups in order; the first hit wins.
//!
//! Missing files are skipped unless the parser is [`required`](Parser::required).
//! Other I/O errors always propagate.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::builder;
use crate::error::FlagError;
use crate::flatten::flatten;
use crate::node::Node;
use crate::view::FlagSetView;

/// Where an [`Ancestors`](Lookup::Ancestors) walk ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    /// Continue to the filesystem root.
    Root,
    /// Stop, inclusive, at the first directory containing an entry with this
    /// name (`.git`, `Cargo.toml`). Walks to the root if there is none.
    Marker(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Path(PathBuf),
    Platform {
        app_name: String,
        file_name: String,
    },
    Ancestors {
        start: Option<PathBuf>,
        file_name: String,
        boundary: Boundary,
    },
    /// Path taken from a flag's current value. An undefined flag or an empty
    /// value finds nothing.
    Flag(String),
    Bytes(Vec<u8>),
    Multi(Vec<Lookup>),
}

/// Bytes found by a [`Lookup`], with the path they came from if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Found {
    pub path: Option<PathBuf>,
    pub bytes: Vec<u8>,
}

impl Lookup {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Lookup::Path(path.into())
    }

    pub fn platform(app_name: impl Into<String>, file_name: impl Into<String>) -> Self {
        Lookup::Platform {
            app_name: app_name.into(),
            file_name: file_name.into(),
        }
    }

    /// Walk up from the current directory.
    pub fn ancestors(file_name: impl Into<String>, boundary: Boundary) -> Self {
        Lookup::Ancestors {
            start: None,
            file_name: file_name.into(),
            boundary,
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Lookup::Flag(name.into())
    }

    /// Locate and read the document. `Ok(None)` means nothing was found.
    pub fn find(&self, view: &FlagSetView<'_>) -> Result<Option<Found>, FlagError> {
        match self {
            Lookup::Path(path) => read_at(path),
            Lookup::Platform {
                app_name,
                file_name,
            } => {
                let Some(proj) = directories::ProjectDirs::from("", "", app_name) else {
                    return Ok(None);
                };
                read_at(&proj.config_dir().join(file_name))
            }
            Lookup::Ancestors {
                start,
                file_name,
                boundary,
            } => {
                let start = match start {
                    Some(start) => start.clone(),
                    None => match std::env::current_dir() {
                        Ok(cwd) => cwd,
                        Err(_) => return Ok(None),
                    },
                };
                for dir in ancestors(&start, boundary) {
                    if let Some(found) = read_at(&dir.join(file_name))? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
            Lookup::Flag(name) => {
                let Some(flag) = view.registry().lookup(name) else {
                    return Ok(None);
                };
                let path = flag.current();
                if path.is_empty() {
                    return Ok(None);
                }
                read_at(Path::new(&path))
            }
            Lookup::Bytes(bytes) => Ok(Some(Found {
                path: None,
                bytes: bytes.clone(),
            })),
            Lookup::Multi(lookups) => {
                for lookup in lookups {
                    if let Some(found) = lookup.find(view)? {
                        return Ok(Some(found));
                    }
                }
                Ok(None)
            }
        }
    }
}

/// Directories from `start` up to the boundary, nearest first.
pub fn ancestors(start: &Path, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let mut current = start;
    loop {
        dirs.push(current.to_path_buf());
        if let Boundary::Marker(name) = boundary
            && current.join(name).exists()
        {
            break;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }
    dirs
}

fn read_at(path: &Path) -> Result<Option<Found>, FlagError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(Found {
            path: Some(path.to_path_buf()),
            bytes,
        })),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FlagError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// A document format.
pub trait Syntax {
    fn name(&self) -> &'static str;
    fn decode(&self, bytes: &[u8]) -> Result<Node, FlagError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

#[derive(Debug, Clone, Copy, Default)]
pub struct Toml;

#[derive(Debug, Clone, Copy, Default)]
pub struct Yaml;

fn decode_error(format: &'static str, reason: impl fmt::Display) -> FlagError {
    FlagError::Decode {
        format,
        reason: reason.to_string(),
    }
}

impl Syntax for Json {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, FlagError> {
        serde_json::from_slice(bytes).map_err(|e| decode_error(self.name(), e))
    }
}

impl Syntax for Toml {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, FlagError> {
        let text = std::str::from_utf8(bytes).map_err(|e| decode_error(self.name(), e))?;
        toml::from_str(text).map_err(|e| decode_error(self.name(), e))
    }
}

impl Syntax for Yaml {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, FlagError> {
        serde_yaml::from_slice(bytes).map_err(|e| decode_error(self.name(), e))
    }
}

/// Pick a syntax from a file extension: `json`, `toml`, `yaml`/`yml`.
pub fn syntax_for(path: &Path) -> Option<Box<dyn Syntax>> {
    match path.extension()?.to_str()? {
        "json" => Some(Box::new(Json)),
        "toml" => Some(Box::new(Toml)),
        "yaml" | "yml" => Some(Box::new(Yaml)),
        _ => None,
    }
}

pub struct Parser {
    lookup: Lookup,
    syntax: Box<dyn Syntax>,
    required: bool,
}

impl Parser {
    pub fn new(lookup: Lookup, syntax: impl Syntax + 'static) -> Self {
        Self {
            lookup,
            syntax: Box::new(syntax),
            required: false,
        }
    }

    /// Fail with [`FlagError::NotFound`] when the lookup finds nothing.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl builder::Parser for Parser {
    fn parse(&mut self, view: &mut FlagSetView<'_>) -> Result<(), FlagError> {
        let Some(found) = self.lookup.find(view)? else {
            if self.required {
                return Err(FlagError::NotFound);
            }
            debug!(lookup = ?self.lookup, "no config file found");
            return Ok(());
        };
        if found.bytes.is_empty() {
            return Ok(());
        }
        debug!(path = ?found.path, syntax = self.syntax.name(), "loading config file");
        let doc = self.syntax.decode(&found.bytes)?;
        match doc {
            Node::Null => Ok(()),
            doc => flatten(&doc, view),
        }
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("lookup", &self.lookup)
            .field("syntax", &self.syntax.name())
            .field("required", &self.required)
            .finish()
    }
}
