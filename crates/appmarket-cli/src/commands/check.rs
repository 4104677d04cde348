//! Check command - apply the admission policy to a charts directory

use futures::stream::{self, StreamExt};
use std::path::Path;

use appmarket_core::{ChartPolicy, HelmModule, Verdict};

use crate::display::ModuleLine;
use crate::error::{CliError, Result};

pub async fn run(root: &Path, require_tldr: bool, jobs: usize) -> Result<()> {
    let modules = HelmModule::discover(root)?;
    let total = modules.len();
    let policy = ChartPolicy::new(require_tldr);

    let mut verdicts: Vec<(String, Verdict, Vec<String>)> = stream::iter(modules)
        .map(move |module| {
            tokio::task::spawn_blocking(move || {
                let verdict = policy.evaluate(&module);
                let set_options = if verdict.is_excluded() {
                    Vec::new()
                } else {
                    let readme = module.readme();
                    tracing::debug!(
                        module = module.name(),
                        command = %readme.install_command(),
                        "install command"
                    );
                    readme.set_options()
                };
                (module.name().to_string(), verdict, set_options)
            })
        })
        .buffer_unordered(jobs.max(1))
        .map(|joined| joined.map_err(|e| CliError::internal(e.to_string())))
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<_>>()?;
    verdicts.sort_by(|a, b| a.0.cmp(&b.0));

    let mut excluded = 0;
    for (name, verdict, set_options) in &verdicts {
        match verdict {
            Verdict::Keep => {}
            Verdict::Corrected => ModuleLine::NodeSelectorCorrected.print(name),
            Verdict::Exclude(reasons) => {
                excluded += 1;
                for reason in reasons {
                    ModuleLine::Deleted(reason.to_string()).print(name);
                }
            }
        }
        if !set_options.is_empty() {
            ModuleLine::SetOptions(set_options.clone()).print(name);
        }
    }

    tracing::info!(total, excluded, "policy evaluated");
    Ok(())
}
