use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::LoginArgs;
use crate::context::CliContext;
use crate::output::{print_profile, print_success};

pub async fn login(ctx: &CliContext, args: &LoginArgs, server: &str) -> Result<()> {
    let username = args.username.as_deref().context("--username is required")?;
    let password = args.password.as_deref().context("--password is required")?;

    ctx.session
        .login(username, password, args.remember)
        .await
        .context("Login failed")?;

    if args.remember {
        print_success(&format!(
            "Logged in to {} as {} (session persisted)",
            server.cyan(),
            username.cyan()
        ));
    } else {
        print_success(&format!(
            "Logged in to {} as {} (session ends with this process)",
            server.cyan(),
            username.cyan()
        ));
    }
    Ok(())
}

pub async fn logout(ctx: &CliContext) -> Result<()> {
    let restored = ctx.session.restore_session().await?;
    if !restored {
        println!("No active session.");
        return Ok(());
    }
    ctx.session.logout(false).await;
    print_success("Logged out");
    Ok(())
}

pub async fn whoami(ctx: &CliContext) -> Result<()> {
    if !ctx.session.restore_session().await? {
        println!("Not logged in. Run: stockpile login --username <name> --password <pw>");
        return Ok(());
    }
    match ctx.session.current_user().await? {
        Some(profile) => print_profile(&profile),
        None => println!("Session present, but no profile is available."),
    }
    Ok(())
}
