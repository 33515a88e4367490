use crate::error::CliError;
use engine_processing::producer::poller::ShardOutcome;
use model::events::capture::OutputEvent;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ShardReport<'a> {
    shard_id: &'a str,
    pages: usize,
    records: usize,
    events: usize,
    reissues: usize,
    stop: String,
    failed: bool,
}

impl<'a> From<&'a ShardOutcome> for ShardReport<'a> {
    fn from(outcome: &'a ShardOutcome) -> Self {
        Self {
            shard_id: outcome.shard_id.as_str(),
            pages: outcome.pages,
            records: outcome.records,
            events: outcome.events,
            reissues: outcome.reissues,
            stop: outcome.stop.to_string(),
            failed: outcome.is_failure(),
        }
    }
}

pub fn print_outcomes(outcomes: &[ShardOutcome]) -> Result<(), CliError> {
    let report: Vec<ShardReport> = outcomes.iter().map(ShardReport::from).collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn print_event(event: Option<&OutputEvent>) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}
