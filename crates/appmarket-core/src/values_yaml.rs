//! The `values.yaml` of one chart and the rewrites applied to it

use std::path::{Path, PathBuf};

use crate::config::KubernetesConfig;
use crate::document::ValuesDocument;
use crate::error::{CoreError, Result};
use crate::probe::{ManifestSource, MultiArchMap, MultiArchProbe};
use crate::rewrite::{
    IngressRewriter, NodeSelectorRewriter, RewriteOutcome, StorageClassRewriter, ValuesFilter,
};
use crate::values::Values;

pub const VALUES_FILE: &str = "values.yaml";

const COMMENTED_NODE_SELECTOR: &str = "# nodeSelector: ";
const CORRECTED_NODE_SELECTOR: &str = "nodeSelector: {} #";

/// Result of the nodeSelector rewrite
#[derive(Debug, Clone)]
pub struct NodeSelectorReport {
    pub outcome: RewriteOutcome,
    pub multi_arch: MultiArchMap,
}

/// Summary of [`ValuesYaml::specify_all`]
#[derive(Debug, Clone, Default)]
pub struct ValuesReport {
    pub node_selector: bool,
    pub storage_class: bool,
    pub ingress: bool,
    pub multi_arch: MultiArchMap,
    /// Non-fatal rewrite failures, as `(rewriter, message)`
    pub failures: Vec<(String, String)>,
}

impl ValuesReport {
    /// Whether any rewrite modified the file
    pub fn changed(&self) -> bool {
        self.node_selector || self.storage_class || self.ingress
    }
}

/// Owner of a chart's values file
#[derive(Debug, Clone)]
pub struct ValuesYaml {
    module_name: String,
    path: PathBuf,
}

impl ValuesYaml {
    pub fn new(module_dir: impl AsRef<Path>, module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            path: module_dir.as_ref().join(VALUES_FILE),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_text(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| CoreError::io(&self.path, e))
    }

    pub fn read_document(&self) -> Result<ValuesDocument> {
        Ok(ValuesDocument::from_text(&self.read_text()?))
    }

    /// Overwrite the whole file
    pub fn write_text(&self, text: &str) -> Result<()> {
        std::fs::write(&self.path, text).map_err(|e| CoreError::io(&self.path, e))
    }

    fn parsed(&self) -> Result<Values> {
        Values::from_yaml(&self.read_text()?)
    }

    /// Whether a `nodeSelector` key exists at any depth
    pub fn has_active_node_selector(&self) -> bool {
        match self.parsed() {
            Ok(values) => values.find_key("nodeSelector").is_some(),
            Err(e) => {
                tracing::debug!(module = %self.module_name, error = %e, "values unreadable");
                false
            }
        }
    }

    /// Whether some line holds a commented-out `nodeSelector`
    pub fn has_commented_node_selector(&self) -> bool {
        self.read_text()
            .map(|text| text.contains(COMMENTED_NODE_SELECTOR))
            .unwrap_or(false)
    }

    /// Turn `# nodeSelector: ` into an empty active selector
    ///
    /// The rest of the line stays behind a comment marker.
    pub fn correct_commented_node_selector(&self) -> Result<RewriteOutcome> {
        let doc = self.read_document()?;
        let text = doc
            .to_text()
            .replace(COMMENTED_NODE_SELECTOR, CORRECTED_NODE_SELECTOR);
        let outcome = RewriteOutcome::new(&doc, text);
        self.persist("nodeSelector", &outcome)?;
        Ok(outcome)
    }

    /// Whether the first `image` mapping has a repository (or name) and a tag
    ///
    /// A document without any `image` key passes.
    pub fn has_expected_structure_for_image_tag(&self) -> bool {
        let Ok(values) = self.parsed() else {
            return false;
        };
        match values.find_key("image") {
            None => true,
            Some(image) => image.as_mapping().is_some_and(|map| {
                (map.contains_key("repository") || map.contains_key("name"))
                    && map.contains_key("tag")
            }),
        }
    }

    pub async fn specify_node_selector(
        &self,
        source: &dyn ManifestSource,
    ) -> Result<NodeSelectorReport> {
        let doc = self.read_document()?;
        let multi_arch = MultiArchProbe::new(source).compute(&doc).await;
        let outcome = NodeSelectorRewriter::new(&multi_arch).filter(&doc);
        self.persist("nodeSelector", &outcome)?;
        Ok(NodeSelectorReport {
            outcome,
            multi_arch,
        })
    }

    pub fn specify_storage_class(&self, config: &KubernetesConfig) -> Result<RewriteOutcome> {
        self.apply(&StorageClassRewriter::new(&config.common_storage))
    }

    pub fn specify_ingress(&self, config: &KubernetesConfig) -> Result<RewriteOutcome> {
        self.apply(&IngressRewriter::new(&self.module_name, config))
    }

    /// nodeSelector, then storageClass, then ingress
    ///
    /// Only a nodeSelector failure aborts; the other two are recorded in
    /// the report.
    pub async fn specify_all(
        &self,
        config: &KubernetesConfig,
        source: &dyn ManifestSource,
    ) -> Result<ValuesReport> {
        let node_selector = self.specify_node_selector(source).await?;
        let mut report = ValuesReport {
            node_selector: node_selector.outcome.changed,
            multi_arch: node_selector.multi_arch,
            ..Default::default()
        };

        match self.specify_storage_class(config) {
            Ok(outcome) => report.storage_class = outcome.changed,
            Err(e) => {
                tracing::warn!(module = %self.module_name, error = %e, "storageClass rewrite failed");
                report.failures.push(("storageClass".to_string(), e.to_string()));
            }
        }

        match self.specify_ingress(config) {
            Ok(outcome) => report.ingress = outcome.changed,
            Err(e) => {
                tracing::warn!(module = %self.module_name, error = %e, "ingress rewrite failed");
                report.failures.push(("ingress".to_string(), e.to_string()));
            }
        }

        Ok(report)
    }

    fn apply(&self, filter: &dyn ValuesFilter) -> Result<RewriteOutcome> {
        let doc = self.read_document()?;
        let outcome = filter.filter(&doc);
        self.persist(filter.name(), &outcome)?;
        Ok(outcome)
    }

    fn persist(&self, rewriter: &str, outcome: &RewriteOutcome) -> Result<()> {
        if !outcome.changed {
            tracing::debug!(module = %self.module_name, rewriter, "values unchanged");
            return Ok(());
        }
        self.write_text(&outcome.text)?;
        tracing::info!(module = %self.module_name, rewriter, path = %self.path.display(), "values modified");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::OfflineSource;
    use tempfile::TempDir;

    fn chart(values: &str) -> (TempDir, ValuesYaml) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(VALUES_FILE), values).unwrap();
        let owner = ValuesYaml::new(dir.path(), "demo");
        (dir, owner)
    }

    #[test]
    fn test_node_selector_predicates() {
        let (_dir, active) = chart("controller:\n  nodeSelector: {}\n");
        assert!(active.has_active_node_selector());
        assert!(!active.has_commented_node_selector());

        let (_dir, commented) = chart("# nodeSelector: {}\nreplicas: 1\n");
        assert!(!commented.has_active_node_selector());
        assert!(commented.has_commented_node_selector());
    }

    #[test]
    fn test_missing_file_predicates_are_false() {
        let dir = TempDir::new().unwrap();
        let owner = ValuesYaml::new(dir.path(), "ghost");
        assert!(!owner.has_active_node_selector());
        assert!(!owner.has_commented_node_selector());
        assert!(!owner.has_expected_structure_for_image_tag());
        assert!(matches!(owner.read_text(), Err(CoreError::Io { .. })));
    }

    #[test]
    fn test_correct_commented_node_selector() {
        let (_dir, owner) = chart("# nodeSelector: {}\nreplicas: 1\n");
        let outcome = owner.correct_commented_node_selector().unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.text, "nodeSelector: {} #{}\nreplicas: 1\n");
        assert_eq!(owner.read_text().unwrap(), outcome.text);
        assert!(owner.has_active_node_selector());
    }

    #[test]
    fn test_image_tag_structure() {
        let (_dir, good) = chart("image:\n  repository: nginx\n  tag: 1.25\n");
        assert!(good.has_expected_structure_for_image_tag());

        let (_dir, by_name) = chart("image:\n  name: nginx\n  tag: 1.25\n");
        assert!(by_name.has_expected_structure_for_image_tag());

        let (_dir, no_tag) = chart("image:\n  repository: nginx\n");
        assert!(!no_tag.has_expected_structure_for_image_tag());

        let (_dir, flat) = chart("image: nginx:1.25\n");
        assert!(!flat.has_expected_structure_for_image_tag());

        let (_dir, none) = chart("replicas: 1\n");
        assert!(none.has_expected_structure_for_image_tag());
    }

    #[test]
    fn test_unchanged_rewrite_does_not_write() {
        let (_dir, owner) = chart("replicas: 1\n");
        let before = std::fs::metadata(owner.path()).unwrap().modified().unwrap();
        let outcome = owner.specify_storage_class(&KubernetesConfig::default()).unwrap();
        assert!(!outcome.changed);
        let after = std::fs::metadata(owner.path()).unwrap().modified().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_specify_all() {
        let (_dir, owner) = chart(
            "\
image:
  repository: registry
  tag: 2.7.1
persistence:
  enabled: true
  # storageClass: \"-\"
nodeSelector: {}
",
        );
        let report = owner
            .specify_all(&KubernetesConfig::default(), &OfflineSource)
            .await
            .unwrap();

        assert!(report.node_selector);
        assert!(report.storage_class);
        assert!(!report.ingress);
        assert!(report.changed());
        assert!(report.multi_arch.is_empty());
        assert_eq!(
            owner.read_text().unwrap(),
            "\
image:
  repository: registry
  tag: 2.7.1
persistence:
  enabled: true
  storageClass: openebs-jiva-rdbox
nodeSelector:
  beta.kubernetes.io/os: linux
  beta.kubernetes.io/arch: amd64
"
        );
    }

    #[tokio::test]
    async fn test_specify_all_missing_file_aborts() {
        let dir = TempDir::new().unwrap();
        let owner = ValuesYaml::new(dir.path(), "ghost");
        let result = owner
            .specify_all(&KubernetesConfig::default(), &OfflineSource)
            .await;
        assert!(result.is_err());
    }
}
