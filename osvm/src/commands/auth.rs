//! The `auth` command: authenticate and cache a token for the host.

use anyhow::{Context as _, Result};
use dialoguer::{theme::ColorfulTheme, Input, Password};
use osvm_api::auth;

use super::Context;

pub fn run(
    ctx: &Context,
    user: Option<String>,
    domain: Option<String>,
    project: Option<String>,
) -> Result<()> {
    let domain = domain
        .or_else(|| ctx.config.domain.clone())
        .context("no domain specified; provide --domain or set 'domain' in config")?;
    let project = project
        .or_else(|| ctx.config.project.clone())
        .context("no project specified; provide --project or set 'project' in config")?;

    let username = match user.or_else(|| ctx.config.username.clone()) {
        Some(u) => u,
        None => Input::with_theme(&ColorfulTheme::default())
            .with_prompt("username")
            .interact_text()?,
    };
    let password = match ctx.config.password.clone() {
        Some(p) => p,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("password")
            .interact()?,
    };

    let token = auth::authenticate(&ctx.host, &domain, &project, &username, &password)?;
    println!(
        "Authenticated to {}; token for project '{}' cached (expires {})",
        ctx.host, token.project, token.expires_at
    );
    Ok(())
}
