use anyhow::{Context, Result};
use macf_eventlog::query::{BreadcrumbFilter, QueryFilters};
use macf_types::Breadcrumb;

use crate::runtime::Runtime;

/// Render a dev-drive summary for a given breadcrumb (spec §6 `dev_drv`):
/// the breadcrumb's own prompt_uuid scopes which events belong to that
/// drive, and `dev_drv_stats` gives the aggregate count/duration.
pub fn handle(rt: &Runtime, breadcrumb: &str, raw: bool, md: bool, output: Option<&std::path::Path>) -> Result<()> {
    let parsed = Breadcrumb::parse(breadcrumb).context("unparseable breadcrumb")?;
    let stats = macf_projections::dev_drv_stats(&rt.log, Some(&parsed.session_id))?;

    let filters = QueryFilters {
        breadcrumb: Some(BreadcrumbFilter { session_id: Some(parsed.session_id.clone()), prompt_uuid: parsed.prompt_uuid.clone(), ..Default::default() }),
        ..Default::default()
    };
    let events = rt.log.query(&filters)?;

    let rendered = if raw || !md {
        serde_json::to_string_pretty(&serde_json::json!({
            "breadcrumb": parsed,
            "dev_drv_stats": {
                "count": stats.count,
                "total_duration": stats.total_duration,
                "current_prompt_uuid": stats.current_prompt_uuid,
            },
            "events": events,
        }))?
    } else {
        render_markdown(&parsed, &stats, events.len())
    };

    match output {
        Some(path) => std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn render_markdown(breadcrumb: &Breadcrumb, stats: &macf_projections::DevDrvStats, event_count: usize) -> String {
    format!(
        "# Dev-drive summary for `{}`\n\n- cycle: {}\n- session: {}\n- dev_drv count this session: {}\n- accumulated dev_drv duration: {:.1}s\n- events in this prompt's scope: {}\n",
        breadcrumb.format(),
        breadcrumb.cycle,
        breadcrumb.session_id,
        stats.count,
        stats.total_duration,
        event_count,
    )
}
