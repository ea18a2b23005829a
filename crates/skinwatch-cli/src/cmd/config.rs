use crate::output::print_json;
use clap::Subcommand;
use skinwatch_core::config::{WarnLevel, WatchConfig};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration with secrets redacted
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(config: &WatchConfig, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(config, json),
        ConfigSubcommand::Validate => validate(config, json),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(config: &WatchConfig, json: bool) -> anyhow::Result<()> {
    let redacted = config.redacted();
    if json {
        print_json(&redacted)
    } else {
        print!("{}", serde_yaml::to_string(&redacted)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(config: &WatchConfig, json: bool) -> anyhow::Result<()> {
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
