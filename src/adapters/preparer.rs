use crate::core::notifier::{CmsNotifier, MergeKind};
use crate::core::prepare::{IndexSeed, MergeContext};
use crate::domain::ports::{PreparedArtifact, Preparer};
use crate::utils::error::{PlateauError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;

#[derive(Debug, Default, Deserialize)]
struct WorkerOutput {
    #[serde(default)]
    path: Option<PathBuf>,
    #[serde(default)]
    warnings: Vec<String>,
    #[serde(default)]
    asset_id: Option<String>,
}

/// Runs each preparation step as `<program> [args..] <step> --city-item .. --tmp-dir ..`.
///
/// The worker prints a JSON object (`path`, `warnings`, `asset_id`) on stdout;
/// empty output means the step produced nothing.
#[derive(Debug, Clone)]
pub struct CommandPreparer {
    program: String,
    args: Vec<String>,
}

impl CommandPreparer {
    pub fn new(program: &str, args: Vec<String>) -> Self {
        Self {
            program: program.to_string(),
            args,
        }
    }

    /// Splits a whitespace separated command line such as `plateau-worker --quiet`.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| PlateauError::MissingConfigError {
            field: "prepare.worker_command".to_string(),
        })?;
        Ok(Self::new(&program, parts.collect()))
    }

    async fn run(&self, step: &str, mc: &MergeContext, extra: &[String]) -> Result<WorkerOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(step)
            .arg("--city-item")
            .arg(&mc.city_item.id)
            .arg("--tmp-dir")
            .arg(&mc.tmp_dir)
            .arg("--feature-types")
            .arg(mc.feature_types.join(","))
            .args(extra);
        if mc.wet_run {
            command.arg("--wet-run");
        }

        tracing::info!("running worker step: {}", step);
        let output = command.output().await?;

        if !output.status.success() {
            return Err(PlateauError::prepare(format!(
                "{} exited with {}: {}",
                step,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(WorkerOutput::default());
        }
        Ok(serde_json::from_str(stdout.trim())?)
    }

    async fn run_merge(
        &self,
        step: &str,
        kind: Option<MergeKind>,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact> {
        match self.run(step, mc, &[]).await {
            Ok(out) => {
                if let Some(kind) = kind {
                    notifier.notify_success(kind, out.asset_id.as_deref()).await;
                }
                Ok(PreparedArtifact {
                    path: out.path,
                    warnings: out.warnings,
                })
            }
            Err(e) => {
                notifier
                    .notify_error(
                        &e,
                        kind == Some(MergeKind::CityGml),
                        kind == Some(MergeKind::Plateau),
                        kind == Some(MergeKind::MaxLod),
                    )
                    .await;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Preparer for CommandPreparer {
    async fn prepare_maxlod(&self, notifier: &CmsNotifier<'_>, mc: &MergeContext) -> Result<()> {
        self.run_merge("maxlod", Some(MergeKind::MaxLod), notifier, mc)
            .await
            .map(|_| ())
    }

    async fn validate_maxlod(&self, notifier: &CmsNotifier<'_>, mc: &MergeContext) -> Result<()> {
        let out = self.run_merge("validate-maxlod", None, notifier, mc).await?;
        if !out.warnings.is_empty() {
            notifier
                .comment(&format!("MaxLOD validation:\n{}", out.warnings.join("\n")))
                .await;
        }
        Ok(())
    }

    async fn prepare_related(
        &self,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact> {
        self.run_merge("related", None, notifier, mc).await
    }

    async fn prepare_citygml(
        &self,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact> {
        self.run_merge("citygml", Some(MergeKind::CityGml), notifier, mc)
            .await
    }

    async fn prepare_plateau(
        &self,
        notifier: &CmsNotifier<'_>,
        mc: &MergeContext,
    ) -> Result<PreparedArtifact> {
        self.run_merge("plateau", Some(MergeKind::Plateau), notifier, mc)
            .await
    }

    async fn prepare_index(
        &self,
        notifier: &CmsNotifier<'_>,
        seed: &IndexSeed,
        mc: &MergeContext,
    ) -> Result<()> {
        let seed_path = mc.tmp_dir.join("index-seed.json");
        tokio::fs::write(&seed_path, serde_json::to_vec_pretty(seed)?).await?;

        let extra = vec!["--seed".to_string(), seed_path.display().to_string()];
        match self.run("index", mc, &extra).await {
            Ok(_) => Ok(()),
            Err(e) => {
                notifier
                    .comment(&format!("Failed to generate the data catalog: {}", e))
                    .await;
                Err(e)
            }
        }
    }
}
