//! In-memory view of an archive: a tree of groups holding typed values.
//!
//! Paths use `/` as separator: `grid/nx`, `timeseries/u/10`. Inserting
//! at a path creates the intermediate groups.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use indexmap::IndexMap;
use shoal_field::Field;
use smallvec::SmallVec;

use crate::codec::{decode_header, decode_record};
use crate::error::ArchiveError;

/// A dense `f64` array with its shape. Data is stored with the first
/// axis varying fastest.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    /// Extent along each axis.
    pub shape: SmallVec<[usize; 3]>,
    /// Values, `shape.iter().product()` of them.
    pub data: Vec<f64>,
}

impl Array {
    /// A one-dimensional array.
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: SmallVec::from_slice(&[data.len()]),
            data,
        }
    }

    /// The full halo-inclusive storage of a field.
    pub fn from_field(field: &Field) -> Self {
        Self {
            shape: SmallVec::from_slice(&field.shape()),
            data: field.data().to_vec(),
        }
    }

    /// Number of elements implied by the shape.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Returns `true` if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A typed leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Unsigned integer.
    U64(u64),
    /// Floating-point scalar.
    F64(f64),
    /// UTF-8 string.
    Str(String),
    /// Shaped `f64` array.
    Array(Array),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// Type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::U64(_) => "u64",
            Self::F64(_) => "f64",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Array> for Value {
    fn from(v: Array) -> Self {
        Self::Array(v)
    }
}

/// A child of a [`Group`].
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A nested group.
    Group(Group),
    /// A leaf value.
    Value(Value),
}

/// An ordered mapping from names to nested groups and values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Group {
    children: IndexMap<String, Node>,
}

impl Group {
    /// An empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at `path`, creating intermediate groups. A value
    /// already sitting where a group is needed is replaced by the group.
    pub fn insert(&mut self, path: &str, value: impl Into<Value>) {
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
        let mut group = self;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                group
                    .children
                    .insert(segment.to_string(), Node::Value(value.into()));
                return;
            }
            let node = group
                .children
                .entry(segment.to_string())
                .or_insert_with(|| Node::Group(Group::new()));
            if let Node::Value(_) = node {
                *node = Node::Group(Group::new());
            }
            let Node::Group(child) = node else {
                return;
            };
            group = child;
        }
    }

    /// Merge every value of `other` under `prefix`.
    pub fn merge(&mut self, prefix: &str, other: &Group) {
        for (path, value) in other.flatten() {
            let full = join(prefix, &path);
            self.insert(&full, value.clone());
        }
    }

    /// The node at `path`.
    pub fn node(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = segments.next()?;
        let mut node = self.children.get(first)?;
        for segment in segments {
            match node {
                Node::Group(g) => node = g.children.get(segment)?,
                Node::Value(_) => return None,
            }
        }
        Some(node)
    }

    /// The value at `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        match self.node(path)? {
            Node::Value(v) => Some(v),
            Node::Group(_) => None,
        }
    }

    /// The group at `path`.
    pub fn group(&self, path: &str) -> Option<&Group> {
        match self.node(path)? {
            Node::Group(g) => Some(g),
            Node::Value(_) => None,
        }
    }

    /// Returns `true` if a value or group exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    /// Names of direct children, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the group has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every leaf as `(full path, value)`, depth first in insertion order.
    pub fn flatten(&self) -> Vec<(String, &Value)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Value)>) {
        for (name, node) in &self.children {
            let path = join(prefix, name);
            match node {
                Node::Value(v) => out.push((path, v)),
                Node::Group(g) => g.flatten_into(&path, out),
            }
        }
    }

    /// The value at `path` as `u64`.
    pub fn u64(&self, path: &str) -> Result<u64, ArchiveError> {
        match self.require(path)? {
            Value::U64(v) => Ok(*v),
            _ => Err(mismatch(path, "u64")),
        }
    }

    /// The value at `path` as `f64`.
    pub fn f64(&self, path: &str) -> Result<f64, ArchiveError> {
        match self.require(path)? {
            Value::F64(v) => Ok(*v),
            _ => Err(mismatch(path, "f64")),
        }
    }

    /// The value at `path` as a string.
    pub fn str(&self, path: &str) -> Result<&str, ArchiveError> {
        match self.require(path)? {
            Value::Str(v) => Ok(v),
            _ => Err(mismatch(path, "string")),
        }
    }

    /// The value at `path` as an array.
    pub fn array(&self, path: &str) -> Result<&Array, ArchiveError> {
        match self.require(path)? {
            Value::Array(v) => Ok(v),
            _ => Err(mismatch(path, "array")),
        }
    }

    /// The value at `path`, or [`ArchiveError::MissingKey`].
    pub fn require(&self, path: &str) -> Result<&Value, ArchiveError> {
        self.get(path).ok_or_else(|| ArchiveError::MissingKey {
            path: path.to_string(),
        })
    }
}

fn mismatch(path: &str, expected: &'static str) -> ArchiveError {
    ArchiveError::TypeMismatch {
        path: path.to_string(),
        expected,
    }
}

/// Join two path fragments with `/`.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// A decoded archive file.
///
/// Records are applied in file order, so a later record for a path
/// replaces an earlier one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Archive {
    root: Group,
    records: usize,
}

impl Archive {
    /// Decode an archive from a byte stream, validating the header.
    pub fn from_reader(mut reader: impl Read) -> Result<Self, ArchiveError> {
        decode_header(&mut reader)?;
        let mut root = Group::new();
        let mut records = 0;
        while let Some((path, value)) = decode_record(&mut reader)? {
            root.insert(&path, value);
            records += 1;
        }
        Ok(Self { root, records })
    }

    /// Read and decode a file.
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// The root group.
    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Number of records decoded (including superseded ones).
    pub fn records(&self) -> usize {
        self.records
    }

    /// The value at `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.root.get(path)
    }

    /// The group at `path`.
    pub fn group(&self, path: &str) -> Option<&Group> {
        self.root.group(path)
    }

    /// The array at `path`.
    pub fn array(&self, path: &str) -> Result<&Array, ArchiveError> {
        self.root.array(path)
    }

    /// Returns `true` if anything is stored at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.root.contains(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_creates_groups() {
        let mut g = Group::new();
        g.insert("grid/nx", 8u64);
        g.insert("grid/Lx", 1.5);
        g.insert("name", "run");
        assert_eq!(g.u64("grid/nx").unwrap(), 8);
        assert_eq!(g.f64("grid/Lx").unwrap(), 1.5);
        assert_eq!(g.group("grid").unwrap().keys().collect::<Vec<_>>(), ["nx", "Lx"]);
        assert!(g.contains("name"));
        assert!(!g.contains("grid/ny"));
    }

    #[test]
    fn typed_getters_report_mismatch() {
        let mut g = Group::new();
        g.insert("x", 1u64);
        assert!(matches!(
            g.f64("x"),
            Err(ArchiveError::TypeMismatch { expected: "f64", .. })
        ));
        assert!(matches!(g.u64("y"), Err(ArchiveError::MissingKey { .. })));
    }

    #[test]
    fn value_replaced_by_group() {
        let mut g = Group::new();
        g.insert("a", 1u64);
        g.insert("a/b", 2u64);
        assert!(g.get("a").is_none());
        assert_eq!(g.u64("a/b").unwrap(), 2);
    }

    #[test]
    fn flatten_and_merge() {
        let mut inner = Group::new();
        inner.insert("x/y", 1.0);
        inner.insert("z", "s");
        let mut outer = Group::new();
        outer.merge("meta", &inner);
        let paths: Vec<String> = outer.flatten().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["meta/x/y", "meta/z"]);
    }
}
