//! CLI command handlers. Each command is in its own file for clarity.

mod provision;
mod run;
mod status;
mod validate;

pub use provision::run_provision;
pub use run::run_batch_cmd;
pub use status::run_status;
pub use validate::run_validate;

use anyhow::{Context, Result};
use gridfetch_core::config::RunConfig;
use gridfetch_core::remote::GatewayClient;

/// Builds the gateway client for commands that talk to the service.
pub(crate) fn gateway(cfg: &RunConfig) -> Result<GatewayClient> {
    let endpoint = cfg
        .service_endpoint
        .as_deref()
        .context("service_endpoint is required for this command")?;
    Ok(GatewayClient::new(endpoint))
}
