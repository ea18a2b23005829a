use crate::output::{print_json, print_table};
use anyhow::Context;
use skinwatch_core::config::WatchConfig;

use super::build_runner;

pub fn run(config: &WatchConfig, codes: &[String], apply: bool, json: bool) -> anyhow::Result<()> {
    let runner = build_runner(config)?;
    let rt = tokio::runtime::Runtime::new()?;

    let reports = rt.block_on(async {
        let mut reports = Vec::with_capacity(codes.len());
        for code in codes {
            let report = runner
                .probe(code, apply)
                .await
                .with_context(|| format!("probe of '{code}' failed"))?;
            reports.push(report);
        }
        anyhow::Ok(reports)
    })?;

    if json {
        return print_json(&reports);
    }

    let rows: Vec<Vec<String>> = reports
        .iter()
        .map(|r| {
            let c = &r.classification;
            vec![
                r.code.clone(),
                c.verdict.to_string(),
                c.rule.unwrap_or("-").to_string(),
                r.stored
                    .as_ref()
                    .map_or("-".to_string(), |s| s.active.to_string()),
                r.action.map_or("-", |a| a.as_str()).to_string(),
                c.final_status.to_string(),
                c.final_url.clone(),
            ]
        })
        .collect();
    print_table(
        &["CODE", "VERDICT", "RULE", "STORED", "ACTION", "STATUS", "FINAL URL"],
        &rows,
    );
    Ok(())
}
