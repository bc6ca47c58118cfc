use log::{error, info, warn};

use crate::account::Account;
use crate::error::Result;
use crate::reconcile::ReconcileReport;

/// Team names from a group listing, one group per line.
///
/// The team is the second `_`-separated token, so
/// `Dynatrace_acme_Users` yields `acme`. Lines without one are skipped.
pub fn teams_from_lines(text: &str) -> Vec<String> {
    let mut teams = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split('_').nth(1).map(str::trim).filter(|t| !t.is_empty()) {
            Some(team) => teams.push(team.to_string()),
            None => warn!("Line {}: no team name in '{}'", number + 1, line),
        }
    }
    teams
}

pub struct BatchResult {
    pub team: String,
    pub outcome: Result<ReconcileReport>,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, Ok(report) if report.is_success())
    }
}

/// Applies defaults to each team in turn; one team's failure does not
/// stop the others.
pub async fn apply_defaults_batch(account: &Account, teams: &[String]) -> Vec<BatchResult> {
    let mut results = Vec::with_capacity(teams.len());
    for team in teams {
        let outcome = account.set_defaults(team).await;
        match &outcome {
            Ok(report) if report.is_success() => info!("Permissions set for {}", team),
            Ok(_) => error!("Permissions for {} partially failed", team),
            Err(e) => error!("Could not set permissions for {}: {}", team, e),
        }
        results.push(BatchResult { team: team.clone(), outcome });
    }
    results
}
