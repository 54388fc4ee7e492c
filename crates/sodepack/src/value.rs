//! # Value Trees
//!
//! The payload model of SODEP: every node carries one scalar `Content` and
//! any number of named child sequences.
//!
//! ## Invariants
//! - **Single Owner**: Each child lives in exactly one `(name, index)` slot of one parent.
//! - **Ordered Sequences**: Order within a name's sequence is significant; order across
//!   names is not, but enumeration is stable (lexicographic) so encoding is deterministic.

use std::collections::BTreeMap;

use crate::types::Tag;

/// Scalar content held at a value node.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Content {
    /// No content. Distinct from an empty string.
    #[default]
    Absent,
    Text(String),
    Int32(i32),
    Float64(f64),
}

impl Content {
    /// The wire tag for this content.
    pub const fn tag(&self) -> Tag {
        match self {
            Content::Absent => Tag::Absent,
            Content::Text(_) => Tag::Text,
            Content::Int32(_) => Tag::Int32,
            Content::Float64(_) => Tag::Float64,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Content::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Content::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Content::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Content::Float64(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Content::Text(s.to_owned())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Content::Text(s)
    }
}

impl From<i32> for Content {
    fn from(v: i32) -> Self {
        Content::Int32(v)
    }
}

impl From<f64> for Content {
    fn from(v: f64) -> Self {
        Content::Float64(v)
    }
}

impl<T: Into<Content>> From<Option<T>> for Content {
    fn from(v: Option<T>) -> Self {
        v.map_or(Content::Absent, Into::into)
    }
}

/// A node of a SODEP value tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    content: Content,
    children: BTreeMap<String, Vec<Value>>,
}

impl Value {
    /// Creates a childless value holding `content`.
    pub fn new(content: impl Into<Content>) -> Self {
        Self {
            content: content.into(),
            children: BTreeMap::new(),
        }
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<Content>) {
        self.content = content.into();
    }

    /// All child sequences, keyed by name.
    pub fn children(&self) -> &BTreeMap<String, Vec<Value>> {
        &self.children
    }

    /// Number of distinct child names.
    pub fn children_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Replaces the whole sequence stored under `name`.
    pub fn set_children(&mut self, name: impl Into<String>, children: Vec<Value>) {
        self.children.insert(name.into(), children);
    }

    /// Replaces the sequence stored under `name` with the single `child`.
    pub fn set_child(&mut self, name: impl Into<String>, child: Value) {
        self.set_children(name, vec![child]);
    }

    /// Appends `child` to the sequence stored under `name`.
    pub fn push_child(&mut self, name: impl Into<String>, child: Value) {
        self.children.entry(name.into()).or_default().push(child);
    }

    /// The sequence stored under `name`; empty if there is none.
    pub fn children_with_name(&self, name: &str) -> &[Value] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_child(&self, name: &str) -> Option<&Value> {
        self.children_with_name(name).first()
    }

    pub fn first_child_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.children.get_mut(name).and_then(|seq| seq.first_mut())
    }

    pub fn remove_children(&mut self, name: &str) -> Option<Vec<Value>> {
        self.children.remove(name)
    }

    /// Builder form of `push_child`.
    pub fn with_child(mut self, name: impl Into<String>, child: Value) -> Self {
        self.push_child(name, child);
        self
    }

    /// Builder form of `set_children`.
    pub fn with_children(mut self, name: impl Into<String>, children: Vec<Value>) -> Self {
        self.set_children(name, children);
        self
    }

    /// Total number of nodes in this tree, the root included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.values().flatten());
        }
        count
    }

    /// Length of the longest root-to-leaf path, counted in edges.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(node.children.values().flatten().map(|c| (c, depth + 1)));
        }
        max
    }
}

macro_rules! impl_value_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(content: $ty) -> Self {
                    Value::new(content)
                }
            }
        )*
    };
}

impl_value_from!(Content, &str, String, i32, f64);
