// Command dispatch

use anyhow::{Context as _, Result};
use osvm_api::auth::Token;
use osvm_core::ClientConfig;

use crate::cli::{Args, Command};

mod auth;
mod create;
mod delete;
mod list;
mod migrate;
mod reboot;

/// Resolved invocation context shared by every command handler.
pub struct Context {
    pub config: ClientConfig,
    pub host: String,
    pub json: bool,
}

fn load_cached_token(host: &str) -> Result<Token> {
    osvm_api::auth::load_token(host)
        .with_context(|| format!("run 'osvm auth' to authenticate against '{host}'"))
}

pub fn execute_command(args: Args) -> Result<()> {
    let config = ClientConfig::load(args.config.as_deref())?;
    let host = args
        .host
        .clone()
        .or_else(|| config.host.clone())
        .context("no host found; provide --host or set 'host' in the config file")?;

    let ctx = Context {
        config,
        host,
        json: args.json,
    };
    tracing::debug!(host = %ctx.host, "resolved invocation context");

    match args.command {
        Command::Auth {
            user,
            domain,
            project,
        } => auth::run(&ctx, user, domain, project),
        Command::Create { target } => {
            let token = load_cached_token(&ctx.host)?;
            create::run(&ctx, token, target)
        }
        Command::Migrate { target } => {
            let token = load_cached_token(&ctx.host)?;
            migrate::run(&ctx, token, target)
        }
        Command::List { target } => {
            let token = load_cached_token(&ctx.host)?;
            list::run(&ctx, token, target)
        }
        Command::Delete { target } => {
            let token = load_cached_token(&ctx.host)?;
            delete::run(&ctx, token, target)
        }
        Command::Reboot { server, hard } => {
            let token = load_cached_token(&ctx.host)?;
            reboot::run(token, &server, hard)
        }
    }
}
