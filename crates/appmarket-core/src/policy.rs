//! Chart admission policy
//!
//! Decides whether a chart can be converted at all. The only side effect
//! is correcting a commented-out nodeSelector in place.

use std::fmt;

use crate::module::HelmModule;

/// Module exempt from most checks when its README is a bitnami one
const BITNAMI_COMMON_MODULE: &str = "common";

/// Why a chart is excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    Deprecated,
    MissingTldr,
    NodeSelector,
    ImageTag,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Deprecated => "deprecate",
            Self::MissingTldr => "TLDR",
            Self::NodeSelector => "nodeSelector",
            Self::ImageTag => "imageTag",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    /// Kept after its commented-out nodeSelector was activated
    Corrected,
    Exclude(Vec<ExclusionReason>),
}

impl Verdict {
    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::Exclude(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartPolicy {
    require_tldr: bool,
}

impl ChartPolicy {
    pub fn new(require_tldr: bool) -> Self {
        Self { require_tldr }
    }

    pub fn evaluate(&self, module: &HelmModule) -> Verdict {
        let mut reasons = Vec::new();
        let mut corrected = false;

        if module.readme().is_deprecated() {
            reasons.push(ExclusionReason::Deprecated);
        }

        let exempt = module.name() == BITNAMI_COMMON_MODULE && module.readme().mentions_bitnami();
        if !exempt {
            if self.require_tldr && !module.readme().has_tldr() {
                reasons.push(ExclusionReason::MissingTldr);
            }

            match self.check_node_selector(module) {
                Some(true) => corrected = true,
                Some(false) => {}
                None => reasons.push(ExclusionReason::NodeSelector),
            }

            if !module.values().has_expected_structure_for_image_tag() {
                reasons.push(ExclusionReason::ImageTag);
            }
        }

        if !reasons.is_empty() {
            Verdict::Exclude(reasons)
        } else if corrected {
            Verdict::Corrected
        } else {
            Verdict::Keep
        }
    }

    /// `Some(corrected)` when the chart has, or now has, an active nodeSelector
    fn check_node_selector(&self, module: &HelmModule) -> Option<bool> {
        let values = module.values();
        if values.has_active_node_selector() {
            return Some(false);
        }
        if !values.has_commented_node_selector() {
            return None;
        }

        match values.correct_commented_node_selector() {
            Ok(outcome) if outcome.changed => {
                tracing::info!(module = %module.name(), "commented nodeSelector activated");
                Some(true)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(module = %module.name(), error = %e, "nodeSelector correction failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn module(name: &str, values: &str, readme: Option<&str>) -> (TempDir, HelmModule) {
        let root = TempDir::new().unwrap();
        let dir = root.path().join(name);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("values.yaml"), values).unwrap();
        if let Some(readme) = readme {
            std::fs::write(dir.join("README.md"), readme).unwrap();
        }
        let module = HelmModule::load(&dir).unwrap();
        (root, module)
    }

    const GOOD_VALUES: &str = "image:\n  repository: nginx\n  tag: 1.25\nnodeSelector: {}\n";

    #[test]
    fn test_keep() {
        let (_root, m) = module("nginx", GOOD_VALUES, Some("# nginx\n## TL;DR\n"));
        assert_eq!(ChartPolicy::new(true).evaluate(&m), Verdict::Keep);
    }

    #[test]
    fn test_deprecated_and_missing_tldr() {
        let (_root, m) = module("old", GOOD_VALUES, Some("# DEPRECATED\n"));
        assert_eq!(
            ChartPolicy::new(true).evaluate(&m),
            Verdict::Exclude(vec![ExclusionReason::Deprecated, ExclusionReason::MissingTldr])
        );
        assert_eq!(
            ChartPolicy::new(false).evaluate(&m),
            Verdict::Exclude(vec![ExclusionReason::Deprecated])
        );
    }

    #[test]
    fn test_commented_node_selector_is_corrected() {
        let values = "image:\n  repository: nginx\n  tag: 1.25\n# nodeSelector: {}\n";
        let (_root, m) = module("nginx", values, None);
        assert_eq!(ChartPolicy::default().evaluate(&m), Verdict::Corrected);
        assert!(m.values().has_active_node_selector());
    }

    #[test]
    fn test_missing_node_selector_and_bad_image() {
        let (_root, m) = module("bare", "image:\n  repository: nginx\n", None);
        assert_eq!(
            ChartPolicy::default().evaluate(&m),
            Verdict::Exclude(vec![ExclusionReason::NodeSelector, ExclusionReason::ImageTag])
        );
    }

    #[test]
    fn test_bitnami_common_is_exempt() {
        let readme = "# Bitnami Common Library Chart\n\nhttps://bitnami.com\nbitnami/common\n";
        let (_root, m) = module("common", "exampleValue: common-chart\n", Some(readme));
        assert_eq!(ChartPolicy::new(true).evaluate(&m), Verdict::Keep);

        let (_root, other) = module("common", "exampleValue: common-chart\n", None);
        assert!(ChartPolicy::default().evaluate(&other).is_excluded());
    }
}
