//! README checks used by the chart policy

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

pub const README_FILE: &str = "README.md";

/// Deprecation markers are only looked for this close to the top
const DEPRECATION_HEAD_LINES: usize = 10;

static TLDR_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#*\sTL;DR").unwrap());
static SECTION_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^##").unwrap());

#[derive(Debug, Clone)]
pub struct ReadmeMd {
    module_name: String,
    path: PathBuf,
}

impl ReadmeMd {
    pub fn new(module_dir: impl AsRef<Path>, module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            path: module_dir.as_ref().join(README_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// README lines, or `None` when it cannot be read
    fn lines(&self) -> Option<Vec<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Some(text.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(module = %self.module_name, error = %e, "README unreadable");
                None
            }
        }
    }

    /// Whether a deprecation notice appears in the first lines
    pub fn is_deprecated(&self) -> bool {
        self.lines().is_some_and(|lines| {
            lines
                .iter()
                .take(DEPRECATION_HEAD_LINES)
                .any(|l| l.contains("eprecat") || l.contains("EPRECAT"))
        })
    }

    pub fn contains_word(&self, word: &str) -> bool {
        self.lines()
            .is_some_and(|lines| lines.iter().any(|l| l.contains(word)))
    }

    pub fn has_tldr(&self) -> bool {
        self.contains_word("TL;DR")
    }

    pub fn mentions_bitnami(&self) -> bool {
        self.contains_word("bitnami")
    }

    /// Last `helm install` line of the TL;DR section, prompt stripped
    ///
    /// Empty when the README, the section or the command is missing.
    pub fn install_command(&self) -> String {
        let Some(lines) = self.lines() else {
            return String::new();
        };

        let mut in_section = false;
        let mut command = None;
        for line in &lines {
            if TLDR_HEADING.is_match(line) {
                in_section = true;
                continue;
            }
            if !in_section {
                continue;
            }
            if SECTION_HEADING.is_match(line) {
                break;
            }
            if line.contains("helm install") {
                command = Some(line.as_str());
            }
        }

        command
            .map(|c| c.replace("$ ", "").trim().to_string())
            .unwrap_or_default()
    }

    /// Keys passed with `--set` in the install command
    pub fn set_options(&self) -> Vec<String> {
        let command = self.install_command();
        let tokens: Vec<&str> = command.split(' ').collect();
        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.contains("--set"))
            .filter_map(|(i, _)| tokens.get(i + 1))
            .map(|option| option.split('=').next().unwrap_or_default().to_string())
            .collect()
    }
}
