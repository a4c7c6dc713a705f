//! Login command - check the configured credentials

use anyhow::Result;
use autoskope_client::AutoskopeClient;

use crate::output::OutputContext;

/// Authenticate once and report the outcome
pub async fn login(client: &mut AutoskopeClient, ctx: &OutputContext) -> Result<()> {
    let host = client.config().host().to_string();
    let username = client.config().username().to_string();

    let mut session = client.connect()?;
    session.login().await?;

    ctx.success(&format!("Logged in to {} as {}", host, username));
    Ok(())
}
