use crate::output::{print_fields, print_json};
use anyhow::Context;
use skinwatch_core::config::{StoreConfig, WatchConfig};
use skinwatch_core::store::{ItemStore, JsonFileStore, SqliteItemStore};
use std::path::Path;

pub fn run(config: &WatchConfig, source: &Path, json: bool) -> anyhow::Result<()> {
    let StoreConfig::Sqlite { path: target } = &config.store else {
        anyhow::bail!("migrate needs a sqlite store; the configured store is a JSON file");
    };

    let records = JsonFileStore::new(source)
        .list_all()
        .with_context(|| format!("failed to read {}", source.display()))?;
    let store = SqliteItemStore::open(target)
        .with_context(|| format!("failed to open {}", target.display()))?;
    let report = store.import(&records).context("import failed")?;

    tracing::info!(
        heroes = report.heroes_inserted,
        skins = report.skins_inserted,
        skipped = report.skins_skipped,
        "migration complete"
    );

    if json {
        print_json(&report)?;
    } else {
        print_fields(&[
            ("source", source.display().to_string()),
            ("target", target.display().to_string()),
            ("heroes", format!("{} ({} new)", report.heroes_seen, report.heroes_inserted)),
            ("skins inserted", report.skins_inserted.to_string()),
            ("skins skipped", report.skins_skipped.to_string()),
        ]);
    }
    Ok(())
}
