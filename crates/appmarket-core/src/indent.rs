//! Indentation classification of values documents
//!
//! Each line gets an [`IndentRecord`]: its leading-space count when it is a
//! structural anchor, or `None` when it must not open or close a path segment
//! (comments, blank lines, list items and multi-line scalar bodies).
//!
//! Block detection is done by small stateful filters that see the lines in
//! document order. A classifier is single-use: feed it one document.

use once_cell::sync::Lazy;
use regex::Regex;

/// Indentation of a structural line, `None` for non-structural lines
pub type IndentRecord = Option<usize>;

/// Indent unit assumed when a document has no indented structural line
pub const DEFAULT_INDENT_UNIT: usize = 2;

/// Any plain or quoted mapping key followed by a `|` or `>` block indicator
static MULTI_LINE_SCALAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*(?:"[^"]*"|'[^']*'|[^\s#'"][^:#]*?):\s+[>|][-+]?[0-9]?\s*(#.*)?$"#).unwrap()
});

static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*-").unwrap());

/// Whether a line is a comment (possibly indented)
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Whether a line holds only whitespace
pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Number of leading space characters
pub fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// A block filter: once its pattern matches at indent `D`, every following
/// line deeper than `D` belongs to the block.
#[derive(Debug)]
struct BlockFilter {
    pattern: &'static Lazy<Regex>,
    block_indent: Option<usize>,
}

impl BlockFilter {
    fn new(pattern: &'static Lazy<Regex>) -> Self {
        Self {
            pattern,
            block_indent: None,
        }
    }

    /// Returns true when the line is claimed by this filter
    fn claims(&mut self, line: &str, indent: usize) -> bool {
        if let Some(block_indent) = self.block_indent {
            if indent > block_indent {
                return true;
            }
            // Block closed; the closing line may open the next block.
            self.block_indent = None;
        }

        if self.pattern.is_match(line.trim_end_matches(['\n', '\r'])) {
            self.block_indent = Some(indent);
            return true;
        }
        false
    }
}

/// Computes indent records line by line
#[derive(Debug)]
pub struct IndentClassifier {
    records: Vec<IndentRecord>,
    filters: Vec<BlockFilter>,
}

impl Default for IndentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IndentClassifier {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            // Registration order matters: the first filter to claim a line wins.
            filters: vec![
                BlockFilter::new(&MULTI_LINE_SCALAR),
                BlockFilter::new(&LIST_ITEM),
            ],
        }
    }

    /// Classify every line of a document
    pub fn classify<S: AsRef<str>>(lines: &[S]) -> IndentIndex {
        let mut classifier = Self::new();
        for line in lines {
            classifier.push_line(line.as_ref());
        }
        classifier.finish()
    }

    /// Classify the next line of the document
    pub fn push_line(&mut self, line: &str) -> IndentRecord {
        let record = self.record_for(line);
        self.records.push(record);
        record
    }

    fn record_for(&mut self, line: &str) -> IndentRecord {
        if is_comment(line) || is_blank(line) {
            return None;
        }

        let indent = leading_spaces(line);
        for filter in &mut self.filters {
            if filter.claims(line, indent) {
                return None;
            }
        }
        Some(indent)
    }

    pub fn finish(self) -> IndentIndex {
        IndentIndex::new(self.records)
    }
}

/// The classified records of one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndentIndex {
    records: Vec<IndentRecord>,
    unit: usize,
}

impl IndentIndex {
    fn new(records: Vec<IndentRecord>) -> Self {
        let unit = records
            .iter()
            .flatten()
            .copied()
            .find(|&indent| indent > 0)
            .unwrap_or(0);
        Self { records, unit }
    }

    pub fn records(&self) -> &[IndentRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> IndentRecord {
        self.records.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First strictly positive structural indent, or 0
    pub fn unit(&self) -> usize {
        self.unit
    }

    /// Indent unit to use when generating text
    pub fn unit_or_default(&self) -> usize {
        if self.unit == 0 {
            DEFAULT_INDENT_UNIT
        } else {
            self.unit
        }
    }

    /// Nearest structural indent strictly before `index`
    pub fn structural_before(&self, index: usize) -> Option<usize> {
        self.records[..index.min(self.records.len())]
            .iter()
            .rev()
            .find_map(|r| *r)
    }

    /// Nearest structural indent strictly after `index`
    pub fn structural_after(&self, index: usize) -> Option<usize> {
        self.records
            .iter()
            .skip(index + 1)
            .find_map(|r| *r)
    }
}
