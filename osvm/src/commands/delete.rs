//! The `delete` commands.

use anyhow::Result;
use osvm_api::auth::Token;
use osvm_api::{compute, images, volumes};

use super::Context;
use crate::cli::DeleteTarget;

pub fn run(_ctx: &Context, token: Token, target: DeleteTarget) -> Result<()> {
    match target {
        DeleteTarget::Vm { id } => {
            let url = token.endpoint("compute")?;
            let id = compute::server_id_by_name(&url, &token.value, &id)?;
            compute::delete_server(&url, &token.value, &id)?;
            println!("Delete requested for server {id}");
        }
        DeleteTarget::Image { id } => {
            let url = token.endpoint("image")?;
            let id = images::image_id_by_name(&url, &token.value, &id)?;
            images::delete_image(&url, &token.value, &id)?;
            println!("Deleted image {id}");
        }
        DeleteTarget::Volume { id } => {
            let url = token.endpoint("volumev3")?;
            let id = volumes::volume_id_by_name(&url, &token.value, &id)?;
            volumes::delete_volume(&url, &token.value, &id)?;
            println!("Delete requested for volume {id}");
        }
    }
    Ok(())
}
