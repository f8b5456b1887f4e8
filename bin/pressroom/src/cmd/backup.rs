//! Backup command - exports source records and pushes them to the backup branch

use color_eyre::eyre::{Result, WrapErr, bail};
use pressroom_generator::SourceExporter;
use pressroom_publish::PublishOutcome;
use tokio_util::sync::CancellationToken;

use super::{SiteJob, publish::print_outcome};

/// Run the backup command.
pub fn run(job: &SiteJob, cancel: &CancellationToken) -> Result<PublishOutcome> {
    let settings = job.settings();
    if !settings.backup.is_configured() {
        bail!("site {} has no backup repository configured", job.snapshot.site.slug);
    }

    let stats = SourceExporter
        .export(&job.workspace, &job.snapshot)
        .wrap_err("Export failed")?;
    println!();
    println!("  Exported {} content files", stats.contents);

    let outcome = job
        .publisher()
        .backup(&settings.backup, &job.workspace, cancel)
        .wrap_err("Backup failed")?;

    print_outcome("Backed up", &settings.backup.branch, &outcome);
    println!();
    Ok(outcome)
}
