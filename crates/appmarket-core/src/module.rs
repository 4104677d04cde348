//! A chart directory on disk

use std::path::Path;

use crate::error::{CoreError, Result};
use crate::readme::ReadmeMd;
use crate::values_yaml::{ValuesYaml, VALUES_FILE};

/// One chart: its values file and README
#[derive(Debug, Clone)]
pub struct HelmModule {
    name: String,
    values: ValuesYaml,
    readme: ReadmeMd,
}

impl HelmModule {
    /// Open a chart directory; the module name is the directory name
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dir = path.as_ref();
        if !dir.join(VALUES_FILE).is_file() {
            return Err(CoreError::ChartNotFound {
                path: dir.display().to_string(),
            });
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CoreError::ChartNotFound {
                path: dir.display().to_string(),
            })?;

        Ok(Self {
            values: ValuesYaml::new(dir, name.clone()),
            readme: ReadmeMd::new(dir, name.clone()),
            name,
        })
    }

    /// Every immediate sub-directory of `root` holding a values file, by name
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Vec<Self>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let mut modules = Vec::new();
        for entry in walkdir::WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_dir() && entry.path().join(VALUES_FILE).is_file() {
                modules.push(Self::load(entry.path())?);
            }
        }
        Ok(modules)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ValuesYaml {
        &self.values
    }

    pub fn readme(&self) -> &ReadmeMd {
        &self.readme
    }
}
