//! nodeSelector normalization
//!
//! Each active `nodeSelector:` block is re-emitted with the OS key and,
//! for images not known to be multi-arch, the architecture key.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};

use super::{inline_value, pad, terminated, trailing_comment, RewriteOutcome, ValuesFilter};
use crate::document::ValuesDocument;
use crate::indent::{is_blank, is_comment, leading_spaces};
use crate::probe::MultiArchMap;

pub const OS_KEY: &str = "beta.kubernetes.io/os";
pub const OS_VALUE: &str = "linux";
pub const ARCH_KEY: &str = "beta.kubernetes.io/arch";
pub const ARCH_VALUE: &str = "amd64";

static TRIGGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*nodeSelector:").unwrap());

/// A captured `nodeSelector` block
struct Capture {
    indent: usize,
    path: String,
    lines: Vec<String>,
}

pub struct NodeSelectorRewriter<'a> {
    multi_arch: &'a MultiArchMap,
}

impl<'a> NodeSelectorRewriter<'a> {
    pub fn new(multi_arch: &'a MultiArchMap) -> Self {
        Self { multi_arch }
    }

    fn ends_capture(line: &str, indent: usize) -> bool {
        is_blank(line) || is_comment(line) || leading_spaces(line) <= indent
    }

    fn flush(&self, capture: Capture, unit: usize, out: &mut String) {
        let mut selector = parse_selector(&capture);
        let mut added = Mapping::new();

        let os_key = YamlValue::from(OS_KEY);
        if !selector.contains_key(&os_key) {
            added.insert(os_key, YamlValue::from(OS_VALUE));
        }

        let multi_arch = self.multi_arch.contains_key(&capture.path);
        let arch_key = YamlValue::from(ARCH_KEY);
        if !multi_arch && !selector.contains_key(&arch_key) {
            added.insert(arch_key, YamlValue::from(ARCH_VALUE));
        }

        tracing::debug!(path = %capture.path, multi_arch, "normalized nodeSelector");
        out.push_str(&pad(capture.indent));
        out.push_str("nodeSelector:");
        if let Some(trigger) = capture.lines.first() {
            out.push_str(trailing_comment(trigger));
        }
        out.push('\n');

        match verbatim_column(&capture, &selector) {
            Some(column) => {
                for line in &capture.lines[1..] {
                    out.push_str(&terminated(line));
                }
                emit_mapping(&added, column, unit, out);
            }
            None => {
                selector.extend(added);
                emit_mapping(&selector, capture.indent + unit, unit, out);
            }
        }
    }
}

impl ValuesFilter for NodeSelectorRewriter<'_> {
    fn name(&self) -> &'static str {
        "nodeSelector"
    }

    fn filter(&self, doc: &ValuesDocument) -> RewriteOutcome {
        let unit = doc.indent_unit();
        let mut out = String::with_capacity(doc.to_text().len());
        let mut capture: Option<Capture> = None;

        for line in doc.scan() {
            if let Some(active) = capture.as_mut() {
                if !Self::ends_capture(line.text, active.indent) {
                    active.lines.push(line.text.to_string());
                    continue;
                }
                if let Some(done) = capture.take() {
                    self.flush(done, unit, &mut out);
                }
            }

            if TRIGGER.is_match(line.text) {
                capture = Some(Capture {
                    indent: leading_spaces(line.text),
                    path: line.path.to_string(),
                    lines: vec![line.text.to_string()],
                });
                continue;
            }
            out.push_str(line.text);
        }

        if let Some(done) = capture.take() {
            self.flush(done, unit, &mut out);
        }

        RewriteOutcome::new(doc, out)
    }
}

/// Parse the captured block; anything that is not a mapping reads as empty
fn parse_selector(capture: &Capture) -> Mapping {
    let text: String = capture
        .lines
        .iter()
        .map(|l| {
            let strip = leading_spaces(l).min(capture.indent);
            let mut line = l[strip..].trim_end_matches(['\n', '\r']).to_string();
            line.push('\n');
            line
        })
        .collect();

    match serde_yaml::from_str::<YamlValue>(&text) {
        Ok(value) => value
            .get("nodeSelector")
            .and_then(YamlValue::as_mapping)
            .cloned()
            .unwrap_or_default(),
        Err(e) => {
            tracing::debug!(path = %capture.path, error = %e, "nodeSelector block does not parse; treating as empty");
            Mapping::new()
        }
    }
}

/// Column of the entries when they can be copied through as written
///
/// That holds when the trigger has no inline value and every entry is a
/// one-line scalar at the same column.
fn verbatim_column(capture: &Capture, selector: &Mapping) -> Option<usize> {
    let (trigger, entries) = capture.lines.split_first()?;
    let column = leading_spaces(entries.first()?);
    if !inline_value(trigger).is_empty() || entries.len() != selector.len() {
        return None;
    }

    let simple = entries.iter().all(|line| {
        leading_spaces(line) == column
            && !inline_value(line).is_empty()
            && serde_yaml::from_str::<Mapping>(line.trim()).is_ok_and(|entry| {
                entry.len() == 1 && entry.values().all(|v| !v.is_mapping() && !v.is_sequence())
            })
    });
    simple.then_some(column)
}

fn emit_mapping(map: &Mapping, indent: usize, unit: usize, out: &mut String) {
    for (key, value) in map {
        out.push_str(&pad(indent));
        out.push_str(&render_scalar(key));
        out.push(':');
        emit_value(value, indent, unit, out);
    }
}

fn emit_value(value: &YamlValue, indent: usize, unit: usize, out: &mut String) {
    match value {
        YamlValue::Mapping(map) if !map.is_empty() => {
            out.push('\n');
            emit_mapping(map, indent + unit, unit, out);
        }
        YamlValue::Sequence(seq) if !seq.is_empty() => {
            out.push('\n');
            for item in seq {
                out.push_str(&pad(indent + unit));
                out.push_str("- ");
                out.push_str(&render_scalar(item));
                out.push('\n');
            }
        }
        other => {
            out.push(' ');
            out.push_str(&render_scalar(other));
            out.push('\n');
        }
    }
}

/// Single-line YAML rendering of a scalar
fn render_scalar(value: &YamlValue) -> String {
    let rendered = serde_yaml::to_string(value).unwrap_or_default();
    let rendered = rendered.trim_end_matches('\n');
    if !rendered.is_empty() && !rendered.contains('\n') {
        return rendered.to_string();
    }
    // Multi-line output (block scalars, nested flow) falls back to JSON,
    // which is valid flow YAML.
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
