//! Line-oriented values document
//!
//! The raw lines (terminators included) are the authoritative
//! representation. Indent records and structural paths are derived indexes
//! that are recomputed whenever the lines change.

use crate::error::Result;
use crate::indent::{IndentClassifier, IndentIndex, IndentRecord};
use crate::structure::{PathTracker, StructurePath};
use crate::values::Values;

/// One line of a scan with its derived structure
#[derive(Debug, Clone)]
pub struct ScannedLine<'a> {
    pub index: usize,
    pub text: &'a str,
    pub indent: IndentRecord,
    pub path: StructurePath,
}

/// A values document as an ordered list of lines
#[derive(Debug, Clone)]
pub struct ValuesDocument {
    lines: Vec<String>,
    indents: IndentIndex,
    paths: Vec<StructurePath>,
}

impl ValuesDocument {
    /// Split text into lines, keeping each line's terminator
    pub fn from_text(text: &str) -> Self {
        Self::from_lines(text.split_inclusive('\n').map(str::to_string).collect())
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        let mut doc = Self {
            lines,
            indents: IndentIndex::default(),
            paths: Vec::new(),
        };
        doc.recompute();
        doc
    }

    /// Re-derive indent records and paths from the current lines
    fn recompute(&mut self) {
        self.indents = IndentClassifier::classify(&self.lines);
        let mut tracker = PathTracker::new(self.indents.unit());
        self.paths = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| tracker.update(line, self.indents.get(i)).clone())
            .collect();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn indents(&self) -> &IndentIndex {
        &self.indents
    }

    pub fn indent(&self, index: usize) -> IndentRecord {
        self.indents.get(index)
    }

    pub fn indent_unit(&self) -> usize {
        self.indents.unit_or_default()
    }

    pub fn path(&self, index: usize) -> Option<&StructurePath> {
        self.paths.get(index)
    }

    /// Scan the document as `(index, line, indent, path)` tuples
    pub fn scan(&self) -> impl Iterator<Item = ScannedLine<'_>> {
        self.lines.iter().enumerate().map(move |(index, text)| ScannedLine {
            index,
            text,
            indent: self.indents.get(index),
            path: self.paths[index].clone(),
        })
    }

    /// Replace one line and recompute the indexes
    pub fn replace_line(&mut self, index: usize, line: String) {
        if self.lines[index] != line {
            self.lines[index] = line;
            self.recompute();
        }
    }

    /// Replace `range` with `lines` and recompute the indexes
    pub fn splice_lines(&mut self, range: std::ops::Range<usize>, lines: Vec<String>) {
        let unchanged = self.lines[range.clone()] == lines[..];
        if unchanged {
            return;
        }
        self.lines.splice(range, lines);
        self.recompute();
    }

    /// Number of lines matching a predicate
    pub fn count_matching(&self, pred: impl Fn(&str) -> bool) -> usize {
        self.lines.iter().filter(|l| pred(l)).count()
    }

    /// Parse the whole document as a values tree
    pub fn parse_values(&self) -> Result<Values> {
        Values::from_yaml(&self.to_text())
    }

    pub fn to_text(&self) -> String {
        self.lines.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_text() {
        let text = "a: 1\n# c\n\nb:\n  c: 2";
        let doc = ValuesDocument::from_text(text);
        assert_eq!(doc.len(), 5);
        assert_eq!(doc.to_text(), text);
    }

    #[test]
    fn test_scan_paths() {
        let doc = ValuesDocument::from_text("image:\n  tag: 1\nreplicas: 2\n");
        let paths: Vec<String> = doc.scan().map(|l| l.path.to_string()).collect();
        assert_eq!(paths, vec!["_", "_.image", "_"]);
    }

    #[test]
    fn test_insert_recomputes() {
        let mut doc = ValuesDocument::from_text("ingress:\n  hosts:\ntls: []\n");
        doc.splice_lines(2..2, vec!["    - a.local\n".to_string()]);
        assert_eq!(doc.indent(2), None);
        assert_eq!(doc.path(3).unwrap().to_string(), "_");
        assert_eq!(doc.to_text(), "ingress:\n  hosts:\n    - a.local\ntls: []\n");
    }

    #[test]
    fn test_splice_lines() {
        let mut doc = ValuesDocument::from_text("a:\n  - x\n  - y\nb: 1\n");
        doc.splice_lines(1..3, vec!["  c: 1\n".to_string()]);
        assert_eq!(doc.to_text(), "a:\n  c: 1\nb: 1\n");
        assert_eq!(doc.path(1).unwrap().to_string(), "_.a");
    }

    #[test]
    fn test_replace_recomputes() {
        let mut doc = ValuesDocument::from_text("a:\n  b: 1\n");
        doc.replace_line(1, "  # b: 1\n".to_string());
        assert_eq!(doc.indent(1), None);
        assert_eq!(doc.indent_unit(), 2);
    }
}
