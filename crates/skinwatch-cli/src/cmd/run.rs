use anyhow::Context;
use skinwatch_core::config::{WarnLevel, WatchConfig};
use skinwatch_core::scheduler::{Scheduler, SystemClock};
use tokio::sync::watch;

use super::build_runner;

pub fn run(config: &WatchConfig) -> anyhow::Result<()> {
    let policy = config.schedule.policy().context("invalid schedule")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("{}", w.message),
            WarnLevel::Error => tracing::error!("{}", w.message),
        }
    }

    let runner = build_runner(config)?;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("shutdown requested; letting any running cycle finish");
                    let _ = shutdown_tx.send(true);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot listen for Ctrl-C; stop the process to exit");
                    // Holding the sender keeps the scheduler alive.
                    std::future::pending::<()>().await;
                }
            }
        });

        let runner = &runner;
        let scheduler = Scheduler::new(policy, SystemClock);
        scheduler
            .run(
                move || async move {
                    runner.run_cycle().await;
                },
                shutdown_rx,
            )
            .await;
    });

    Ok(())
}
