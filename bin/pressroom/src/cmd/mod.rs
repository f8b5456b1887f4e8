//! Command implementations.

pub mod backup;
pub mod generate;
pub mod plan;
pub mod publish;
pub mod schedule;

use std::{
    future::Future,
    io,
    path::{Path, PathBuf},
};

use color_eyre::eyre::{Result, WrapErr};
use pressroom_core::{Config, PipelineSettings, SiteSnapshot, SiteWorkspace};
use pressroom_generator::{Builder, GenerationReport};
use pressroom_publish::{CommandGit, Publisher};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Everything one site run needs: its records, workspace and tools.
#[derive(Debug, Clone)]
pub struct SiteJob {
    pub snapshot: SiteSnapshot,
    pub workspace: SiteWorkspace,
    pub static_dir: Option<PathBuf>,
    pub git_binary: String,
}

impl SiteJob {
    /// Load a snapshot and place its workspace under the configured root.
    pub fn load(config: &Config, snapshot_path: &Path) -> Result<Self> {
        let snapshot = SiteSnapshot::load(snapshot_path)
            .wrap_err_with(|| format!("Failed to load snapshot {}", snapshot_path.display()))?;
        let workspace = SiteWorkspace::new(config.site_workspace(&snapshot.site.slug));

        tracing::debug!(
            site = %snapshot.site.slug,
            workspace = %workspace.root().display(),
            "loaded site job"
        );

        Ok(Self {
            snapshot,
            workspace,
            static_dir: config.build.static_dir.clone(),
            git_binary: config.git.binary.clone(),
        })
    }

    pub fn site_id(&self) -> i64 {
        self.snapshot.site.id
    }

    pub fn settings(&self) -> PipelineSettings {
        self.snapshot.pipeline_settings()
    }

    /// Run a full generation into the workspace.
    pub fn generate(&self) -> Result<GenerationReport> {
        let mut builder = Builder::new(&self.snapshot, self.workspace.clone());
        if let Some(dir) = &self.static_dir {
            builder = builder.with_static_dir(dir);
        }
        builder.build().wrap_err("Generation failed")
    }

    pub fn publisher(&self) -> Publisher {
        Publisher::new(CommandGit::new(&self.git_binary))
    }
}

/// Cancel `token` once `signal` fires.
///
/// If the listener cannot be installed the token is left alone and the
/// process keeps its default interrupt handling.
pub fn cancel_on<S>(signal: S, token: CancellationToken) -> JoinHandle<()>
where
    S: Future<Output = io::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, cancelling");
                token.cancel();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    })
}

/// Run a blocking command on the blocking pool.
///
/// The runtime stays free to deliver cancellation while git runs, so an
/// interrupted command still drops its temporary clone.
pub async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .wrap_err("Command task panicked")?
}

/// Print a generation summary, listing recorded errors.
pub(crate) fn print_report(report: &GenerationReport, output: &Path) {
    println!();
    println!(
        "  {} pages generated, {} errors",
        report.pages_generated,
        report.errors.len()
    );
    println!();
    println!("  Content:  {}", report.pages_generated);
    println!("  Indexes:  {}", report.index_pages);
    println!("  Authors:  {}", report.author_pages);
    println!("  Assets:   {}", report.assets_copied);
    println!();
    println!("  Duration: {}ms", report.duration_ms);
    println!("  Output:   {}", output.display());
    println!();

    for error in &report.errors {
        println!("  ⚠ {error}");
    }
    if !report.errors.is_empty() {
        println!();
    }
}
