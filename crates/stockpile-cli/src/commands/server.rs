use anyhow::{Context, Result};
use colored::Colorize;

use crate::context::CliContext;
use crate::output::print_profile;

/// Round-trips the session against the server: restores it, lets the
/// pipeline refresh if the token is expiring, and fetches the profile.
pub async fn status(ctx: &CliContext, server: &str) -> Result<()> {
    println!("{}: {}", "Server".cyan(), server);

    if !ctx.session.restore_session().await? {
        println!("{}: not logged in", "Session".cyan());
        return Ok(());
    }

    let users = stockpile_client::UserApi::new(ctx.client.clone());
    let profile = users
        .info()
        .await
        .context("Session check failed")?
        .context("Profile request was superseded")?;

    println!("{}: active", "Session".cyan());
    print_profile(&profile);
    Ok(())
}
