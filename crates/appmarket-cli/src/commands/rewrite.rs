//! Rewrite command - apply the three values rewrites to each chart

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Duration;

use appmarket_core::{
    HelmModule, KubernetesConfig, ManifestSource, MarketConfig, OfflineSource, ValuesReport,
};
use appmarket_registry::DockerHubClient;

use crate::display::ModuleLine;
use crate::error::{CliError, Result};

pub async fn run(charts: &[PathBuf], config: &MarketConfig, skip_probe: bool, jobs: usize) -> Result<()> {
    let source: Box<dyn ManifestSource> = if skip_probe {
        Box::new(OfflineSource)
    } else {
        Box::new(DockerHubClient::new(
            &config.registry.base_url,
            Duration::from_secs(config.registry.timeout_secs),
        )?)
    };

    let source = source.as_ref();
    let kubernetes = &config.kubernetes;
    let mut outcomes = stream::iter(charts)
        .map(|chart| async move { (chart, rewrite_chart(chart, kubernetes, source).await) })
        .buffer_unordered(jobs.max(1));

    let mut failed = 0;
    while let Some((chart, outcome)) = outcomes.next().await {
        let name = display_name(chart);
        match outcome {
            Ok(report) => {
                for (rewriter, message) in &report.failures {
                    tracing::warn!(module = %name, rewriter = %rewriter, "{}", message);
                }
                if !report.multi_arch.is_empty() {
                    tracing::debug!(module = %name, multi_arch = ?report.multi_arch, "multi-arch images");
                }
                let line = if report.changed() {
                    ModuleLine::Modified
                } else {
                    ModuleLine::Unchanged
                };
                line.print(&name);
            }
            Err(err) => {
                failed += 1;
                ModuleLine::ConvertError(err.to_string()).print(&name);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::ConvertFailed {
            failed,
            total: charts.len(),
        });
    }
    Ok(())
}

async fn rewrite_chart(
    chart: &Path,
    config: &KubernetesConfig,
    source: &dyn ManifestSource,
) -> appmarket_core::Result<ValuesReport> {
    let module = HelmModule::load(chart)?;
    module.values().specify_all(config, source).await
}

fn display_name(chart: &Path) -> String {
    chart
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| chart.display().to_string())
}
