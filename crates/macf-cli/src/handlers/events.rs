use anyhow::Result;
use macf_eventlog::query::QueryFilters;

use crate::args::{EventsCommand, OutputFormat, SessionsCommand};
use crate::runtime::{print_json, Runtime};

pub fn handle(rt: &Runtime, command: EventsCommand, format: OutputFormat) -> Result<()> {
    match command {
        EventsCommand::Show { limit } => show(rt, limit, format),
        EventsCommand::History { limit } => history(rt, limit, format),
        EventsCommand::Query { session, event, limit } => query(rt, session.as_deref(), event.as_deref(), limit, format),
        EventsCommand::Sessions { command } => match command {
            SessionsCommand::List => sessions_list(rt, format),
        },
        EventsCommand::Stats => stats(rt, format),
        EventsCommand::Gaps { threshold } => gaps(rt, threshold, format),
    }
}

fn show(rt: &Runtime, limit: usize, format: OutputFormat) -> Result<()> {
    let records = rt.log.read(Some(limit), true)?;
    render_records(&records, format)
}

fn history(rt: &Runtime, limit: usize, format: OutputFormat) -> Result<()> {
    let records = rt.log.read(Some(limit), true)?;
    render_records(&records, format)
}

fn query(rt: &Runtime, session: Option<&str>, event: Option<&str>, limit: usize, format: OutputFormat) -> Result<()> {
    let filters = QueryFilters { session_id: session.map(str::to_string), event_type: event.map(str::to_string), ..Default::default() };
    let mut records = rt.log.query(&filters)?;
    records.reverse();
    records.truncate(limit);
    render_records(&records, format)
}

fn sessions_list(rt: &Runtime, format: OutputFormat) -> Result<()> {
    use std::collections::BTreeSet;
    let mut sessions = BTreeSet::new();
    for record in rt.log.read_all()? {
        if let Some(session_id) = macf_eventlog::query::record_session_id(&record) {
            sessions.insert(session_id);
        }
    }
    let sessions: Vec<String> = sessions.into_iter().collect();
    match format {
        OutputFormat::Json => print_json(&sessions),
        OutputFormat::Plain => {
            for session in &sessions {
                println!("{session}");
            }
            Ok(())
        }
    }
}

fn stats(rt: &Runtime, format: OutputFormat) -> Result<()> {
    let tallies = rt.log.tally_all()?;
    match format {
        OutputFormat::Json => print_json(&tallies),
        OutputFormat::Plain => {
            for (event, count) in &tallies.event_tallies {
                println!("{event}: {count}");
            }
            Ok(())
        }
    }
}

/// Gaps of more than `threshold` seconds between consecutive appends —
/// candidate boundaries for a missed session_end or a host crash.
fn gaps(rt: &Runtime, threshold: f64, format: OutputFormat) -> Result<()> {
    let records = rt.log.read_all()?;
    let mut found = Vec::new();
    for pair in records.windows(2) {
        let gap = pair[1].timestamp - pair[0].timestamp;
        if gap >= threshold {
            found.push(serde_json::json!({
                "after": pair[0].timestamp,
                "before": pair[1].timestamp,
                "gap_seconds": gap,
            }));
        }
    }
    match format {
        OutputFormat::Json => print_json(&found),
        OutputFormat::Plain => {
            for entry in &found {
                println!("{entry}");
            }
            Ok(())
        }
    }
}

fn render_records(records: &[macf_types::EventRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(records),
        OutputFormat::Plain => {
            for record in records {
                println!("{} {} {}", record.timestamp, record.breadcrumb, record.event_name());
            }
            Ok(())
        }
    }
}
