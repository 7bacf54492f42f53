//! The `migrate vm` command: run the migration orchestrator.

use anyhow::{Context as _, Result};
use osvm_api::auth::Token;
use osvm_api::flavors;
use osvm_core::Tuning;
use osvm_provision::{migrate_server, DiskBus, MigrationRequest, Services};

use super::Context;
use crate::cli::netargs::parse_network_requests;
use crate::cli::MigrateTarget;
use crate::render::print_record;

pub fn run(ctx: &Context, token: Token, target: MigrateTarget) -> Result<()> {
    let MigrateTarget::Vm {
        name,
        vmdk,
        flavor,
        networks,
        mac,
        size,
        disk_bus,
        volume_type,
        shutdown,
    } = target;

    // Rejected before any network call; an unsupported bus produces an
    // unbootable guest discoverable only after the fact.
    let disk_bus: DiskBus = disk_bus.parse()?;

    let flavor_ref = flavor
        .or_else(|| ctx.config.flavor_id.clone())
        .context("no flavor specified; provide --flavor or set 'flavor_id' in config")?;
    let networks_csv = networks.or_else(|| ctx.config.networks.clone());
    let requests = parse_network_requests(networks_csv.as_deref(), None, mac.as_deref())?;

    let services = Services::from_token(token)?;
    let token_value = services.token().value.clone();
    let flavor_ref = flavors::flavor_id_by_name(services.compute_url(), &token_value, &flavor_ref)
        .unwrap_or(flavor_ref);

    let request = MigrationRequest {
        name: name.clone(),
        flavor_ref,
        source: vmdk,
        networks: requests,
        boot_volume_gib: size,
        disk_bus,
        volume_type,
        power_down: shutdown,
    };

    println!(
        "Migrating '{}' from {}...",
        name,
        request.source.display()
    );
    let summary = migrate_server(&services, &request, &Tuning::default())?;
    print_record(&summary, ctx.json)?;
    Ok(())
}
