pub mod check;
pub mod config;
pub mod migrate;
pub mod probe;
pub mod run;

use anyhow::Context;
use skinwatch_core::config::WatchConfig;
use skinwatch_core::cycle::CycleRunner;
use skinwatch_core::notifier::OperatorNotifier;
use skinwatch_core::store;
use skinwatch_core::walker::ReqwestTransport;

pub type Runner = CycleRunner<ReqwestTransport, OperatorNotifier>;

/// Wire store, transport and notifier from configuration.
pub fn build_runner(config: &WatchConfig) -> anyhow::Result<Runner> {
    let store = store::open(&config.store).with_context(|| {
        format!(
            "failed to open item store at {}",
            config.store.path().display()
        )
    })?;
    let transport =
        ReqwestTransport::new(config.request_timeout()).context("failed to build http client")?;
    let notify_client = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("failed to build notifier client")?;
    let notifier = OperatorNotifier::from_config(notify_client, &config.notify);
    CycleRunner::from_config(config, store, transport, notifier).context("invalid configuration")
}
