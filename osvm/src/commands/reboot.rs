//! The `reboot` command: request a reboot, then wait for ACTIVE.

use anyhow::Result;
use osvm_api::auth::Token;
use osvm_api::compute;
use osvm_core::Tuning;
use osvm_provision::poller::{self, Classified, PollOptions};

pub fn run(token: Token, server: &str, hard: bool) -> Result<()> {
    let url = token.endpoint("compute")?;
    let id = compute::server_id_by_name(&url, &token.value, server)?;
    let reboot_type = if hard { "HARD" } else { "SOFT" };

    compute::reboot_server(&url, &token.value, &id, reboot_type)?;
    println!("Reboot ({reboot_type}) requested for {id}; waiting for ACTIVE...");

    let tuning = Tuning::default();
    let opts = PollOptions {
        interval: tuning.poll_interval,
        max_attempts: tuning.poll_max_attempts,
    };
    let detail = poller::wait_for(
        &opts,
        || compute::get_server(&url, &token.value, &id),
        |server| {
            if server.status.eq_ignore_ascii_case("ERROR") {
                Classified::Failed("server entered error state during reboot".into())
            } else if server.status.eq_ignore_ascii_case("ACTIVE") {
                Classified::Ready
            } else {
                Classified::Pending
            }
        },
    )
    .map_err(|e| e.into_error(&format!("server {id} to reboot"), |s| s.status.clone()))?;

    println!(
        "Server {} is {} ({})",
        detail.id,
        detail.status,
        compute::power_state_label(detail.power_state)
    );
    Ok(())
}
