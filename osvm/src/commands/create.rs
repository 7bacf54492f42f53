//! The `create vm` command: run the provisioning orchestrator.

use std::path::Path;

use anyhow::{Context as _, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use osvm_api::auth::Token;
use osvm_api::{flavors, images};
use osvm_core::Tuning;
use osvm_provision::{provision_server, ProvisionRequest, Services};

use super::Context;
use crate::cli::netargs::parse_network_requests;
use crate::cli::CreateTarget;
use crate::render::print_record;

fn read_user_data(path: &Path) -> Result<String> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read user data file {}", path.display()))?;
    Ok(STANDARD.encode(data))
}

pub fn run(ctx: &Context, token: Token, target: CreateTarget) -> Result<()> {
    let CreateTarget::Vm {
        name,
        flavor,
        image,
        networks,
        ips,
        macs,
        size,
        user_data,
        volume_type,
        shutdown,
    } = target;

    let flavor_ref = flavor
        .or_else(|| ctx.config.flavor_id.clone())
        .context("no flavor specified; provide --flavor or set 'flavor_id' in config")?;
    let image_ref = image.or_else(|| ctx.config.image_id.clone());
    let networks_csv = networks.or_else(|| ctx.config.networks.clone());
    let requests = parse_network_requests(networks_csv.as_deref(), ips.as_deref(), macs.as_deref())?;

    let services = Services::from_token(token)?;
    let token_value = services.token().value.clone();

    // Resolve names to IDs up front; an unresolved reference is passed
    // through raw and left for the backend to reject.
    let flavor_ref = flavors::flavor_id_by_name(services.compute_url(), &token_value, &flavor_ref)
        .unwrap_or(flavor_ref);
    let image_ref = image_ref.map(|image| {
        images::image_id_by_name(services.image_url(), &token_value, &image).unwrap_or(image)
    });

    let user_data = user_data.as_deref().map(read_user_data).transpose()?;

    let request = ProvisionRequest {
        name: name.clone(),
        flavor_ref,
        image_ref,
        networks: requests,
        boot_volume_gib: size,
        user_data,
        disk_bus: None,
        volume_type,
        power_down: shutdown,
    };

    println!("Provisioning VM '{name}'...");
    let summary = provision_server(&services, &request, &Tuning::default())?;
    print_record(&summary, ctx.json)?;
    Ok(())
}
