//! storageClass assignment
//!
//! Two strategies are tried in order. When the document has a (possibly
//! commented) top-level `global:` block holding a storageClass line, that
//! block is activated and the line is set. Otherwise every storageClass line
//! with a value is replaced in place.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{pad, uncommented_indent, RewriteOutcome, ValuesFilter};
use crate::document::ValuesDocument;
use crate::indent::{is_blank, is_comment, leading_spaces};

static STORAGE_CLASS_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#*\s*storageClass:").unwrap());
static STORAGE_CLASS_WITH_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*#*\s*storageClass:\s+[-_/"'.a-zA-Z0-9]+"#).unwrap());
static GLOBAL_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#\s?)?global:").unwrap());
static TOP_LEVEL_KEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z_\-]+:").unwrap());

pub struct StorageClassRewriter<'a> {
    storage_class: &'a str,
}

impl<'a> StorageClassRewriter<'a> {
    pub fn new(storage_class: &'a str) -> Self {
        Self { storage_class }
    }

    fn assignment(&self, indent: usize) -> String {
        format!("{}storageClass: {}\n", pad(indent), self.storage_class)
    }

    /// Global strategy; `None` when no storageClass lives in the global block
    fn rewrite_global(&self, doc: &ValuesDocument) -> Option<String> {
        let unit = doc.indent_unit();
        let mut out = String::new();
        let mut in_global = false;
        let mut found = false;

        for line in doc.lines() {
            if !found && !in_global && GLOBAL_TAG.is_match(line) {
                in_global = true;
                if is_comment(line) {
                    out.push_str("global:\n");
                } else {
                    out.push_str(line);
                }
                continue;
            }

            if in_global {
                if STORAGE_CLASS_TAG.is_match(line) {
                    out.push_str(&self.assignment(unit));
                    in_global = false;
                    found = true;
                    continue;
                }
                if is_blank(line) || TOP_LEVEL_KEY.is_match(line) {
                    return None;
                }
            }
            out.push_str(line);
        }

        found.then_some(out)
    }

    /// Separate strategy: set each storageClass occurrence where it stands
    fn rewrite_occurrences(&self, doc: &ValuesDocument) -> String {
        let mut out = String::new();
        for (i, line) in doc.lines().iter().enumerate() {
            if STORAGE_CLASS_WITH_VALUE.is_match(line) {
                if let Some(indent) = occurrence_indent(doc, i, line) {
                    out.push_str(&self.assignment(indent));
                    continue;
                }
                tracing::debug!(line = i + 1, "storageClass indentation is ambiguous; left untouched");
            }
            out.push_str(line);
        }
        out
    }
}

/// Indent at which an occurrence is re-emitted
///
/// An active line keeps its own indent. A commented line takes the
/// indentation of its structural neighbours when they agree, otherwise the
/// neighbour matching the column the line would have once uncommented.
fn occurrence_indent(doc: &ValuesDocument, index: usize, line: &str) -> Option<usize> {
    if !is_comment(line) {
        return Some(leading_spaces(line));
    }

    let before = doc.indents().structural_before(index).unwrap_or(0);
    let after = doc.indents().structural_after(index).unwrap_or(0);
    if before == after {
        return Some(before);
    }

    [uncommented_indent(line), leading_spaces(line)]
        .into_iter()
        .find(|&candidate| candidate == before || candidate == after)
}

impl ValuesFilter for StorageClassRewriter<'_> {
    fn name(&self) -> &'static str {
        "storageClass"
    }

    fn filter(&self, doc: &ValuesDocument) -> RewriteOutcome {
        if !doc.lines().iter().any(|l| STORAGE_CLASS_TAG.is_match(l)) {
            return RewriteOutcome::unchanged(doc);
        }

        let has_global = doc.lines().iter().any(|l| GLOBAL_TAG.is_match(l));
        if has_global {
            if let Some(text) = self.rewrite_global(doc) {
                return RewriteOutcome::new(doc, text);
            }
            tracing::debug!("global block has no storageClass; rewriting occurrences");
        }

        RewriteOutcome::new(doc, self.rewrite_occurrences(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASS: &str = "openebs-jiva-rdbox";

    fn rewrite(text: &str) -> RewriteOutcome {
        StorageClassRewriter::new(CLASS).filter(&ValuesDocument::from_text(text))
    }

    #[test]
    fn test_commented_global_block() {
        let text = "\
## Global Docker image parameters
# global:
#   imageRegistry: myRegistryName
#   imagePullSecrets:
#     - myRegistryKeySecretName
#   storageClass: myStorageClass

image:
  registry: docker.io
";
        let outcome = rewrite(text);
        assert_eq!(
            outcome.text,
            "\
## Global Docker image parameters
global:
#   imageRegistry: myRegistryName
#   imagePullSecrets:
#     - myRegistryKeySecretName
  storageClass: openebs-jiva-rdbox

image:
  registry: docker.io
"
        );
        assert!(outcome.changed);
    }

    #[test]
    fn test_global_without_storage_class_falls_back() {
        let text = "\
##
# global:
#   imageRegistry: myRegistryName
#   imagePullSecrets:
#     - myRegistryKeySecretName
##
persistence:
  enable: true
  # storageClass: \"-\"
";
        let outcome = rewrite(text);
        assert_eq!(
            outcome.text,
            "\
##
# global:
#   imageRegistry: myRegistryName
#   imagePullSecrets:
#     - myRegistryKeySecretName
##
persistence:
  enable: true
  storageClass: openebs-jiva-rdbox
"
        );
    }

    #[test]
    fn test_separate_commented_between_siblings() {
        let text = "\
persistence:
  enable: true
# storageClass: \"-\"
  size: 8Gi
";
        let outcome = rewrite(text);
        assert_eq!(
            outcome.text,
            "\
persistence:
  enable: true
  storageClass: openebs-jiva-rdbox
  size: 8Gi
"
        );
    }

    #[test]
    fn test_separate_uses_uncommented_column() {
        let text = "\
persistence:
  data:
    size: 1Gi
#     storageClass: fast
metrics: {}
";
        let outcome = rewrite(text);
        assert!(outcome.text.contains("\n    storageClass: openebs-jiva-rdbox\n"));
    }

    #[test]
    fn test_active_line_keeps_indent() {
        let text = "a:\n  b:\n      storageClass: standard\n";
        let outcome = rewrite(text);
        assert_eq!(outcome.text, "a:\n  b:\n      storageClass: openebs-jiva-rdbox\n");
    }

    #[test]
    fn test_valueless_storage_class_untouched() {
        let outcome = rewrite("persistence:\n  storageClass:\n  size: 1Gi\n");
        assert!(!outcome.changed);
    }

    #[test]
    fn test_no_storage_class_unchanged() {
        let outcome = rewrite("global:\n  imageRegistry: x\n");
        assert!(!outcome.changed);
    }

    #[test]
    fn test_idempotent() {
        let text = "# global:\n#   storageClass: x\nreplicas: 1\n";
        let first = rewrite(text);
        assert_eq!(first.text, "global:\n  storageClass: openebs-jiva-rdbox\nreplicas: 1\n");
        let second = rewrite(&first.text);
        assert!(!second.changed);
    }
}
