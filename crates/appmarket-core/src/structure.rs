//! Structural path tracking
//!
//! [`PathTracker`] follows the chain of enclosing mapping keys while the
//! lines of a document are fed to it in order, using the records produced by
//! the indent classifier. It never builds a tree.

use std::fmt;

use crate::indent::IndentRecord;

/// Sentinel first segment of every path
pub const ROOT_SEGMENT: &str = "_";

/// Dotted chain of mapping keys, rooted at `_`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructurePath(Vec<String>);

impl StructurePath {
    pub fn root() -> Self {
        Self(vec![ROOT_SEGMENT.to_string()])
    }

    /// Segments strictly between the root and the last segment
    pub fn intermediate(&self) -> &[String] {
        if self.0.len() <= 2 {
            return &[];
        }
        &self.0[1..self.0.len() - 1]
    }

    fn push(&mut self, segment: String) {
        self.0.push(segment);
    }

    fn pop(&mut self) {
        if self.0.len() > 1 {
            self.0.pop();
        }
    }
}

impl fmt::Display for StructurePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for StructurePath {
    fn from(dotted: &str) -> Self {
        Self(dotted.split('.').map(str::to_string).collect())
    }
}

/// Incremental path tracker; call [`update`](Self::update) once per line
#[derive(Debug, Clone)]
pub struct PathTracker {
    path: StructurePath,
    indent_unit: usize,
    prev_indent: usize,
    prev_line: String,
}

impl PathTracker {
    pub fn new(indent_unit: usize) -> Self {
        Self {
            path: StructurePath::root(),
            indent_unit,
            prev_indent: 0,
            prev_line: String::new(),
        }
    }

    /// Feed the next line and its indent record, returning the current path
    pub fn update(&mut self, line: &str, record: IndentRecord) -> &StructurePath {
        let Some(indent) = record else {
            return &self.path;
        };

        if indent > self.prev_indent {
            let prev = self.prev_line.trim();
            if let Some(key) = prev.strip_suffix(':') {
                self.path.push(key.to_string());
            }
        } else if indent < self.prev_indent {
            let delta = self.prev_indent - indent;
            if self.indent_unit > 0 && delta % self.indent_unit == 0 {
                for _ in 0..delta / self.indent_unit {
                    self.path.pop();
                }
            } else {
                // Known fragility: the stack is left as is and may stay stale.
                tracing::warn!(
                    path = %self.path,
                    delta,
                    unit = self.indent_unit,
                    "indentation decrease is not a multiple of the indent unit; path not popped"
                );
            }
        }

        self.prev_line.clear();
        self.prev_line.push_str(line);
        self.prev_indent = indent;
        &self.path
    }

    pub fn path(&self) -> &StructurePath {
        &self.path
    }
}
