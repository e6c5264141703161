//! `watchparty sweep`: one reaper pass for cron-style deployments that do
//! not run the in-process loops.

use std::sync::Arc;

use anyhow::Context;
use wp_channels::StalenessPredicate;
use wp_domain::config::Config;

use super::SweepPredicate;
use crate::bootstrap;

pub async fn run(config: Arc<Config>, predicate: SweepPredicate) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config.clone()).await?;

    let predicates = match predicate {
        SweepPredicate::Inactive => vec![StalenessPredicate::inactive(&config.reaper.inactive)],
        SweepPredicate::AbandonedNew => {
            vec![StalenessPredicate::abandoned_new(&config.reaper.abandoned_new)]
        }
        SweepPredicate::All => StalenessPredicate::all(&config.reaper).to_vec(),
    };

    let mut reports = Vec::with_capacity(predicates.len());
    for p in predicates {
        let report = state
            .reaper
            .sweep(p)
            .await
            .with_context(|| format!("{} sweep", p.name()))?;
        reports.push(report);
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
