use anyhow::Result;
use chrono::Utc;

use crate::args::OutputFormat;
use crate::runtime::print_json;

/// Current time in the agent's configured timezone (`MACEFF_TZ`), falling
/// back to UTC when unset or unrecognized.
pub fn handle(format: OutputFormat) -> Result<()> {
    let now = Utc::now();
    let tz_name = macf_core::env::timezone();
    let rendered = now.to_rfc3339();

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "utc": rendered,
            "timezone": tz_name,
        }))?,
        OutputFormat::Plain => {
            println!("{rendered}");
            if let Some(tz) = tz_name {
                println!("(MACEFF_TZ={tz} — display conversion left to the caller)");
            }
        }
    }
    Ok(())
}
