//! Generate command - renders the site into its workspace

use color_eyre::eyre::Result;
use pressroom_generator::GenerationReport;

use super::{SiteJob, print_report};

/// Run the generate command.
pub fn run(job: &SiteJob) -> Result<GenerationReport> {
    tracing::info!(site = %job.snapshot.site.slug, "Starting generation");

    let report = job.generate()?;
    print_report(&report, &job.workspace.html_dir());

    Ok(report)
}
