//! The `list` commands: table or JSON views of control plane resources.

use anyhow::Result;
use osvm_api::auth::Token;
use osvm_api::{compute, flavors, images, networks, volumes};

use super::Context;
use crate::cli::ListTarget;
use crate::render::{print_list, string_or_none};

pub fn run(ctx: &Context, token: Token, target: ListTarget) -> Result<()> {
    let json = ctx.json;
    match target {
        ListTarget::Vms => {
            let url = token.endpoint("compute")?;
            let servers = compute::list_servers(&url, &token.value)?;
            print_list(&servers, json, &["ID", "NAME"], |s| {
                vec![s.id.clone(), s.name.clone()]
            })
        }
        ListTarget::Images => {
            let url = token.endpoint("image")?;
            let images = images::list_images(&url, &token.value, &[])?;
            print_list(
                &images,
                json,
                &["ID", "NAME", "STATUS", "SIZE (MB)", "VISIBILITY"],
                |i| {
                    vec![
                        i.id.clone(),
                        string_or_none(i.name.as_deref().unwrap_or_default()),
                        i.status.clone(),
                        i.size
                            .map(|s| (s / (1024 * 1024)).to_string())
                            .unwrap_or_else(|| "-".into()),
                        string_or_none(i.visibility.as_deref().unwrap_or_default()),
                    ]
                },
            )
        }
        ListTarget::Networks => {
            let url = token.endpoint("network")?;
            let networks = networks::list_networks(&url, &token.value)?;
            print_list(
                &networks,
                json,
                &["ID", "NAME", "STATUS", "SHARED", "EXTERNAL"],
                |n| {
                    vec![
                        n.id.clone(),
                        n.name.clone(),
                        n.status.clone(),
                        n.shared.to_string(),
                        n.external.to_string(),
                    ]
                },
            )
        }
        ListTarget::Flavors => {
            let url = token.endpoint("compute")?;
            let flavors = flavors::list_flavors(&url, &token.value)?;
            print_list(&flavors, json, &["ID", "NAME"], |f| {
                vec![f.id.clone(), f.name.clone()]
            })
        }
        ListTarget::Volumes => {
            let url = token.endpoint("volumev3")?;
            let volumes = volumes::list_volumes(&url, &token.value)?;
            print_list(
                &volumes,
                json,
                &["ID", "NAME", "STATUS", "SIZE (GiB)", "BOOTABLE"],
                |v| {
                    vec![
                        v.id.clone(),
                        string_or_none(v.name.as_deref().unwrap_or_default()),
                        v.status.clone(),
                        v.size.to_string(),
                        string_or_none(v.bootable.as_deref().unwrap_or_default()),
                    ]
                },
            )
        }
    }
}
