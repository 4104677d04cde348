//! AppMarket Core - Comment-preserving rewriting of Helm chart values
//!
//! This crate provides the values rewriting engine used by `appmarket`:
//! - `IndentClassifier` / `PathTracker`: line structure of a values file
//! - `ValuesDocument`: the line list with its derived indexes
//! - `MultiArchProbe`: multi-architecture image detection
//! - `NodeSelectorRewriter`, `StorageClassRewriter`, `IngressRewriter`
//! - `ValuesYaml`, `ReadmeMd`, `HelmModule`: chart files on disk
//! - `ChartPolicy`: chart admission checks

pub mod config;
pub mod document;
pub mod error;
pub mod indent;
pub mod module;
pub mod policy;
pub mod probe;
pub mod readme;
pub mod rewrite;
pub mod structure;
pub mod values;
pub mod values_yaml;

pub use config::{KubernetesConfig, MarketConfig, RegistryConfig};
pub use document::{ScannedLine, ValuesDocument};
pub use error::{CoreError, Result};
pub use indent::{IndentClassifier, IndentIndex, IndentRecord};
pub use module::HelmModule;
pub use policy::{ChartPolicy, ExclusionReason, Verdict};
pub use probe::{
    ImageReference, ManifestSource, MultiArchMap, MultiArchProbe, OfflineSource, PlatformImage,
    TagManifest,
};
pub use readme::ReadmeMd;
pub use rewrite::{
    HostsShape, IngressRewriter, NodeSelectorRewriter, RewriteOutcome, StorageClassRewriter,
    ValuesFilter,
};
pub use structure::{PathTracker, StructurePath};
pub use values::Values;
pub use values_yaml::{NodeSelectorReport, ValuesReport, ValuesYaml};
