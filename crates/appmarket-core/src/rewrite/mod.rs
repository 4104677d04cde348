//! Text rewriters for values documents
//!
//! Every rewriter reads a [`ValuesDocument`] and produces new text. Lines
//! that a rewriter does not touch are copied through byte for byte, so
//! comments, blank lines and key order survive.

mod ingress;
mod node_selector;
mod storage_class;

pub use ingress::{HostsShape, IngressRewriter};
pub use node_selector::NodeSelectorRewriter;
pub use storage_class::StorageClassRewriter;

use crate::document::ValuesDocument;
use crate::indent::leading_spaces;

/// Result of running one rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Whether `text` differs from the input
    pub changed: bool,
}

impl RewriteOutcome {
    pub(crate) fn new(original: &ValuesDocument, text: String) -> Self {
        let changed = text != original.to_text();
        Self { text, changed }
    }

    pub(crate) fn unchanged(original: &ValuesDocument) -> Self {
        Self {
            text: original.to_text(),
            changed: false,
        }
    }
}

/// A single-purpose rewrite of a values document
pub trait ValuesFilter {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn filter(&self, doc: &ValuesDocument) -> RewriteOutcome;
}

/// `n` spaces
pub(crate) fn pad(n: usize) -> String {
    " ".repeat(n)
}

/// Line content without its terminator
pub(crate) fn body(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// The line with exactly one `\n` terminator
pub(crate) fn terminated(line: &str) -> String {
    let mut out = body(line).to_string();
    out.push('\n');
    out
}

/// Scalar text after the first `key:`, without any trailing comment
pub(crate) fn inline_value(line: &str) -> &str {
    let text = body(line);
    let Some(colon) = text.find(':') else {
        return "";
    };
    let rest = &text[colon + 1..];
    let value = match rest.find(" #") {
        Some(pos) => &rest[..pos],
        None => rest,
    };
    value.trim()
}

/// Trailing comment after the first `key:`, with the spaces before it
///
/// Empty when the line carries no ` #` comment.
pub(crate) fn trailing_comment(line: &str) -> &str {
    let text = body(line);
    let Some(colon) = text.find(':') else {
        return "";
    };
    let rest = &text[colon + 1..];
    match rest.find(" #") {
        Some(pos) => &rest[rest[..pos].trim_end().len()..],
        None => "",
    }
}

/// Comment out a line by prefixing `#`
pub(crate) fn comment_out(line: &str) -> String {
    let mut out = format!("#{}", body(line));
    out.push('\n');
    out
}

/// Column a commented line's content would sit at once `# ` is removed
pub(crate) fn uncommented_indent(line: &str) -> usize {
    let lead = leading_spaces(line);
    let after_hashes = line[lead..].trim_start_matches('#');
    lead + leading_spaces(after_hashes).saturating_sub(1)
}

/// Content of a commented line with the hashes and surrounding spaces removed
pub(crate) fn uncommented_content(line: &str) -> &str {
    body(line).trim_start().trim_start_matches('#').trim_start()
}

/// Replace the scalar after `key:` keeping the prefix and any trailing comment
///
/// Returns the line untouched when it already carries `value`.
pub(crate) fn set_scalar(line: &str, value: &str) -> String {
    let text = body(line);
    let Some(colon) = text.find(':') else {
        return line.to_string();
    };
    let (head, rest) = text.split_at(colon);
    let rest = &rest[1..];
    let (current, comment) = match rest.find(" #") {
        Some(pos) => rest.split_at(rest[..pos].trim_end().len()),
        None => (rest, ""),
    };

    if current.trim() == value {
        return line.to_string();
    }
    format!("{head}: {value}{comment}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_scalar() {
        assert_eq!(set_scalar("  enabled: false\n", "true"), "  enabled: true\n");
        assert_eq!(
            set_scalar("    - name: chart.local  # host\n", "a.b"),
            "    - name: a.b  # host\n"
        );
        assert_eq!(set_scalar("  tls: true\n", "true"), "  tls: true\n");
        assert_eq!(set_scalar("  tls:   true", "true"), "  tls:   true");
    }

    #[test]
    fn test_uncommented_indent() {
        assert_eq!(uncommented_indent("  # storageClass: \"-\"\n"), 2);
        assert_eq!(uncommented_indent("#   storageClass: x\n"), 2);
        assert_eq!(uncommented_indent("#storageClass: x\n"), 0);
        assert_eq!(uncommented_indent("    ## key: v\n"), 4);
    }

    #[test]
    fn test_uncommented_content() {
        assert_eq!(
            uncommented_content("    # kubernetes.io/tls-acme: \"true\"\n"),
            "kubernetes.io/tls-acme: \"true\""
        );
        assert_eq!(comment_out("  - a\n"), "#  - a\n");
    }

    #[test]
    fn test_trailing_comment() {
        assert_eq!(trailing_comment("nodeSelector: {}  # pin nodes\n"), "  # pin nodes");
        assert_eq!(trailing_comment("nodeSelector:  # pin nodes\n"), "  # pin nodes");
        assert_eq!(trailing_comment("nodeSelector: {}\n"), "");
        assert_eq!(trailing_comment("# no key"), "");
    }

    #[test]
    fn test_inline_value() {
        assert_eq!(inline_value("  hosts: []  # none\n"), "[]");
        assert_eq!(inline_value("  hosts: # list\n"), "");
        assert_eq!(inline_value("  tls:\n"), "");
        assert_eq!(terminated("last"), "last\n");
    }
}
