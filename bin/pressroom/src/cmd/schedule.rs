//! Schedule command - regenerates and publishes sites on an interval

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use color_eyre::eyre::{Result, WrapErr};
use pressroom_core::Config;
use pressroom_generator::SourceExporter;
use pressroom_publish::PublishOutcome;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::SiteJob;
use crate::runner::SiteRunner;

/// Options of a schedule loop.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub snapshots: Vec<PathBuf>,
    pub every: Duration,
    pub backup: bool,
}

/// Run the schedule loop until `cancel` fires.
///
/// Each tick reloads every snapshot and runs generate and publish (plus
/// backup when enabled) off the async runtime. A failed site is logged and
/// tried again on the next tick.
pub async fn run(config: Config, schedule: Schedule, cancel: CancellationToken) -> Result<()> {
    let config = Arc::new(config);
    let runner = Arc::new(SiteRunner::new());

    let mut interval = tokio::time::interval(schedule.every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sites = schedule.snapshots.len(),
        interval_secs = schedule.every.as_secs(),
        backup = schedule.backup,
        "Schedule started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let handles: Vec<_> = schedule
                    .snapshots
                    .iter()
                    .cloned()
                    .map(|path| {
                        let config = Arc::clone(&config);
                        let runner = Arc::clone(&runner);
                        let cancel = cancel.clone();
                        let backup = schedule.backup;
                        tokio::task::spawn_blocking(move || {
                            let result = tick(&config, &path, backup, &runner, &cancel);
                            (path, result)
                        })
                    })
                    .collect();

                for handle in handles {
                    match handle.await {
                        Ok((_, Ok(()))) => {}
                        Ok((path, Err(e))) => {
                            tracing::error!(snapshot = %path.display(), error = ?e, "Scheduled run failed");
                        }
                        Err(e) => tracing::error!(error = %e, "Scheduled run panicked"),
                    }
                }
            }
        }
    }

    tracing::info!("Schedule stopped");
    Ok(())
}

/// One scheduled run of one site, serialized with other runs of that site.
pub fn tick(
    config: &Config,
    snapshot: &Path,
    backup: bool,
    runner: &SiteRunner,
    cancel: &CancellationToken,
) -> Result<()> {
    let job = SiteJob::load(config, snapshot)?;
    let site = job.snapshot.site.slug.clone();

    runner.with_site(job.site_id(), || {
        let report = job.generate()?;
        tracing::info!(
            site = %site,
            pages = report.pages_generated,
            errors = report.errors.len(),
            "Scheduled generation complete"
        );

        let settings = job.settings();
        let publisher = job.publisher();

        if settings.publish.is_configured() {
            let outcome = publisher
                .publish(&settings.publish, &job.workspace.html_dir(), cancel)
                .wrap_err("Publish failed")?;
            log_outcome(&site, "publish", &outcome);
        } else {
            tracing::debug!(site = %site, "No publish repository configured");
        }

        if backup && settings.backup.is_configured() {
            SourceExporter
                .export(&job.workspace, &job.snapshot)
                .wrap_err("Export failed")?;
            let outcome = publisher
                .backup(&settings.backup, &job.workspace, cancel)
                .wrap_err("Backup failed")?;
            log_outcome(&site, "backup", &outcome);
        }

        Ok(())
    })
}

fn log_outcome(site: &str, operation: &str, outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::Published { commit, plan } => tracing::info!(
            site,
            operation,
            commit = %commit,
            changes = %plan.summary(),
            "Scheduled push complete"
        ),
        PublishOutcome::NoChanges => tracing::info!(site, operation, "Nothing to push"),
    }
}
