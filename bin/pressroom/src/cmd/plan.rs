//! Plan command - previews what a publish would change

use color_eyre::eyre::{Result, WrapErr, bail};
use pressroom_publish::ChangePlan;
use tokio_util::sync::CancellationToken;

use super::SiteJob;

/// Run the plan command against the current HTML tree.
pub fn run(job: &SiteJob, cancel: &CancellationToken) -> Result<ChangePlan> {
    let settings = job.settings();
    if !settings.publish.is_configured() {
        bail!("site {} has no publish repository configured", job.snapshot.site.slug);
    }

    let html = job.workspace.html_dir();
    let plan = job
        .publisher()
        .plan(&settings.publish, &html, cancel)
        .wrap_err("Plan failed")?;

    println!();
    if plan.is_empty() {
        println!("  Nothing to publish on {}", settings.publish.branch);
    } else {
        println!("  {} on {}", plan.summary(), settings.publish.branch);
        println!();
        for line in plan.to_string().lines() {
            println!("  {line}");
        }
    }
    println!();

    Ok(plan)
}
