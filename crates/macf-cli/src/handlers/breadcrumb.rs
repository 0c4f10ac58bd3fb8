use anyhow::{Context, Result};

use crate::runtime::{print_json, Runtime};

/// Mint and print the breadcrumb that would be attached to an event emitted
/// right now (spec §4.2), using the current session and its most recent
/// user-prompt uuid.
pub fn handle(rt: &Runtime, json: bool) -> Result<()> {
    let session_id = rt.current_session_id()?.context("no current session id found")?;
    let transcripts_dir = macf_core::path::host_transcript_dir(&rt.project_root)?;
    let prompt_uuid = macf_projections::last_user_prompt_uuid(&transcripts_dir.join(format!("{session_id}.jsonl")))?;

    let breadcrumb = rt.mint_breadcrumb(&session_id, prompt_uuid.as_deref());

    if json {
        print_json(&breadcrumb)?;
    } else {
        println!("{}", breadcrumb.format());
    }
    Ok(())
}
