//! Multi-architecture image probing
//!
//! Decides, per `image` mapping of a values document, whether the image is
//! published for more than one CPU architecture. Only the decision logic
//! lives here; fetching tag metadata is delegated to a [`ManifestSource`].

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;

use crate::document::ValuesDocument;
use crate::error::{CoreError, Result};
use crate::values::scalar_to_string;

/// Structural path of an `image` mapping's parent -> image repository
pub type MultiArchMap = BTreeMap<String, String>;

static NODE_SELECTOR_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*nodeSelector:").unwrap());
static IMAGE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*image:").unwrap());

/// Registries that are aliases of Docker Hub
const DOCKER_HUB_HOSTS: &[&str] = &["docker.io", "index.docker.io", "registry-1.docker.io"];

/// A Docker Hub image reference derived from an `image` mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Repository as written in the values file
    pub repository: String,
    /// Hub namespace (`library` for official images)
    pub namespace: String,
    pub name: String,
    pub tag: String,
}

impl ImageReference {
    /// Build a reference from an `image:` mapping
    ///
    /// Returns `None` when the mapping has no usable repository or tag, or
    /// when the repository is not hosted on Docker Hub.
    pub fn from_image_values(image: &YamlValue) -> Option<Self> {
        let map = image.as_mapping()?;
        let repository = map
            .get("repository")
            .or_else(|| map.get("name"))
            .and_then(scalar_to_string)?;
        let tag = map.get("tag").and_then(scalar_to_string)?;

        if let Some(registry) = map.get("registry").and_then(scalar_to_string) {
            if !DOCKER_HUB_HOSTS.contains(&registry.as_str()) {
                return None;
            }
        }

        Self::parse(&repository, &tag)
    }

    /// Parse `name`, `namespace/name` repositories; anything longer names
    /// another registry and yields `None`.
    pub fn parse(repository: &str, tag: &str) -> Option<Self> {
        let repository = repository.trim();
        if repository.is_empty() || tag.trim().is_empty() {
            return None;
        }

        let segments: Vec<&str> = repository.split('/').collect();
        let (namespace, name) = match segments.as_slice() {
            [name] => ("library", *name),
            [namespace, name] => (*namespace, *name),
            _ => return None,
        };

        Some(Self {
            repository: repository.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            tag: tag.trim().to_string(),
        })
    }

    /// `namespace/name` as used in Hub API paths
    pub fn hub_path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Tag metadata URL under a registry API base
    pub fn tag_url(&self, base_url: &str) -> String {
        format!(
            "{}/v2/repositories/{}/tags/{}",
            base_url.trim_end_matches('/'),
            self.hub_path(),
            self.tag
        )
    }
}

/// Tag metadata returned by the registry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagManifest {
    #[serde(default)]
    pub images: Vec<PlatformImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformImage {
    #[serde(default)]
    pub architecture: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
}

impl TagManifest {
    /// Whether any platform image is built for an ARM architecture
    pub fn has_arm_image(&self) -> bool {
        self.images.iter().any(|image| {
            image
                .architecture
                .as_deref()
                .is_some_and(|arch| arch.starts_with("arm"))
        })
    }
}

/// Source of tag metadata
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn tag_manifest(&self, image: &ImageReference) -> Result<TagManifest>;
}

/// A source that never answers; every image counts as single-arch
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl ManifestSource for OfflineSource {
    async fn tag_manifest(&self, image: &ImageReference) -> Result<TagManifest> {
        Err(CoreError::probe(image.hub_path(), "probing disabled"))
    }
}

/// Computes the [`MultiArchMap`] of a document
pub struct MultiArchProbe<'a> {
    source: &'a dyn ManifestSource,
}

impl<'a> MultiArchProbe<'a> {
    pub fn new(source: &'a dyn ManifestSource) -> Self {
        Self { source }
    }

    /// Whether nodeSelector and image lines pair up one to one
    ///
    /// This is a correlation heuristic only; equal counts do not prove that
    /// each nodeSelector belongs to the image beside it.
    pub fn counts_correlate(doc: &ValuesDocument) -> bool {
        let node_selectors = doc.count_matching(|l| NODE_SELECTOR_LINE.is_match(l));
        let images = doc.count_matching(|l| IMAGE_LINE.is_match(l));
        node_selectors == images
    }

    pub async fn compute(&self, doc: &ValuesDocument) -> MultiArchMap {
        let mut map = MultiArchMap::new();
        if !Self::counts_correlate(doc) {
            tracing::debug!("nodeSelector/image counts differ; skipping multi-arch probe");
            return map;
        }

        let values = match doc.parse_values() {
            Ok(values) => values,
            Err(e) => {
                tracing::debug!(error = %e, "values do not parse; skipping multi-arch probe");
                return map;
            }
        };

        let candidates: Vec<(String, ImageReference)> = values
            .find_key_all("image")
            .into_iter()
            .filter_map(|(path, image)| {
                ImageReference::from_image_values(image).map(|reference| (path, reference))
            })
            .collect();

        let lookups = candidates.iter().map(|(_, reference)| self.is_multi_arch(reference));
        let results = futures::future::join_all(lookups).await;

        for ((path, reference), multi_arch) in candidates.into_iter().zip(results) {
            if multi_arch {
                map.entry(path).or_insert(reference.repository);
            }
        }
        map
    }

    async fn is_multi_arch(&self, reference: &ImageReference) -> bool {
        match self.source.tag_manifest(reference).await {
            Ok(manifest) => manifest.has_arm_image(),
            Err(e) => {
                tracing::debug!(image = %reference.hub_path(), tag = %reference.tag, error = %e, "no multi-arch evidence");
                false
            }
        }
    }
}
