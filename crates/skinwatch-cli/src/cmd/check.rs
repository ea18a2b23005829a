use crate::output::{print_fields, print_json};
use skinwatch_core::config::WatchConfig;

use super::build_runner;

pub fn run(config: &WatchConfig, json: bool) -> anyhow::Result<()> {
    let runner = build_runner(config)?;
    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(runner.run_cycle());

    if json {
        print_json(&outcome)?;
    } else {
        let elapsed = outcome.finished_at - outcome.started_at;
        print_fields(&[
            ("records", outcome.total_records.to_string()),
            ("updated", outcome.updated_count.to_string()),
            ("unchanged", outcome.unchanged_count.to_string()),
            ("unknown", outcome.unknown_count.to_string()),
            ("failed", outcome.failed_count.to_string()),
            ("elapsed", format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0)),
        ]);
    }

    if let Some(reason) = outcome.abort_reason {
        anyhow::bail!("cycle aborted: {reason}");
    }
    Ok(())
}
