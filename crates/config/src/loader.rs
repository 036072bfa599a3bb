//! Document loader implementation

use std::io::Read;
use std::path::Path;
use toml::{Table, Value};
use tracing::debug;
use types::{utils, ConfigError, ParseError, Result};

/// A parsed configuration document: namespaces mapped to nested option tables
///
/// Key order follows the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDocument {
    root: Table,
}

/// Outcome of looking up a namespace path in a document
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<'a> {
    /// The path holds a table
    Found(&'a Table),
    /// Some segment of the path is missing
    Absent,
    /// A segment of the path holds something other than a table
    NotATable { path: String, found: &'static str },
}

impl ConfigurationDocument {
    pub fn from_table(root: Table) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Table {
        &self.root
    }

    /// Top-level keys, in document order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(|k| k.as_str())
    }

    /// Walk `segments` from the root down to a table
    pub fn lookup<S: AsRef<str>>(&self, segments: &[S]) -> Lookup<'_> {
        let mut current = &self.root;
        for (depth, segment) in segments.iter().enumerate() {
            match current.get(segment.as_ref()) {
                None => return Lookup::Absent,
                Some(Value::Table(table)) => current = table,
                Some(other) => {
                    return Lookup::NotATable {
                        path: utils::join_segments(&segments[..=depth]),
                        found: other.type_str(),
                    }
                }
            }
        }
        Lookup::Found(current)
    }

    /// Value at a dotted path, if any
    pub fn get(&self, path: &str) -> Option<&Value> {
        let segments = utils::split_path(path);
        let (last, parents) = segments.split_last()?;
        match self.lookup(parents) {
            Lookup::Found(table) => table.get(last),
            _ => None,
        }
    }
}

/// Loader that turns explicitly supplied sources into documents
///
/// Nothing is discovered implicitly; callers pass the text, bytes, reader or
/// path they want parsed.
pub struct DocumentLoader;

impl DocumentLoader {
    /// Parse a document from text
    pub fn load(source: &str) -> std::result::Result<ConfigurationDocument, ParseError> {
        let root: Table = toml::from_str(source).map_err(|e| Self::parse_error(source, &e))?;

        debug!(namespaces = root.len(), "Parsed configuration document");
        Ok(ConfigurationDocument { root })
    }

    /// Parse a document from raw bytes, which must be UTF-8
    pub fn load_bytes(bytes: &[u8]) -> std::result::Result<ConfigurationDocument, ParseError> {
        let source = std::str::from_utf8(bytes).map_err(|e| {
            let position = utils::position_at(
                &String::from_utf8_lossy(&bytes[..e.valid_up_to()]),
                e.valid_up_to(),
            );
            ParseError::new(format!("invalid UTF-8: {}", e), Some(position))
        })?;
        Self::load(source)
    }

    /// Read a source to the end and parse it
    pub fn load_reader<R: Read>(mut reader: R) -> Result<ConfigurationDocument> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|source| ConfigError::Io {
                path: "<reader>".to_string(),
                source,
            })?;
        Ok(Self::load_bytes(&bytes)?)
    }

    /// Read and parse the file at `path`
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<ConfigurationDocument> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        debug!(path = %path.display(), bytes = bytes.len(), "Read configuration file");
        Ok(Self::load_bytes(&bytes)?)
    }

    fn parse_error(source: &str, err: &toml::de::Error) -> ParseError {
        let position = err.span().map(|span| utils::position_at(source, span.start));
        ParseError::new(err.message().trim(), position)
    }
}
