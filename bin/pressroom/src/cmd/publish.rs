//! Publish command - generates the site and pushes it to its publish branch

use color_eyre::eyre::{Result, WrapErr, bail};
use pressroom_publish::PublishOutcome;
use tokio_util::sync::CancellationToken;

use super::{SiteJob, print_report};

/// Run the publish command.
///
/// With `skip_generate` the existing HTML tree is pushed as it is.
pub fn run(job: &SiteJob, skip_generate: bool, cancel: &CancellationToken) -> Result<PublishOutcome> {
    let settings = job.settings();
    if !settings.publish.is_configured() {
        bail!("site {} has no publish repository configured", job.snapshot.site.slug);
    }

    if !skip_generate {
        let report = job.generate()?;
        print_report(&report, &job.workspace.html_dir());
    }

    let outcome = job
        .publisher()
        .publish(&settings.publish, &job.workspace.html_dir(), cancel)
        .wrap_err("Publish failed")?;

    print_outcome("Published", &settings.publish.branch, &outcome);
    Ok(outcome)
}

pub(crate) fn print_outcome(verb: &str, branch: &str, outcome: &PublishOutcome) {
    match outcome {
        PublishOutcome::Published { commit, plan } => {
            println!("  {verb} {} to {branch} ({})", short(commit), plan.summary());
        }
        PublishOutcome::NoChanges => println!("  Nothing to publish on {branch}"),
    }
}

fn short(commit: &str) -> &str {
    commit.get(..10).unwrap_or(commit)
}
