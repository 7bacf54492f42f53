// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod netargs;

#[derive(Debug, Clone, Parser)]
#[command(name = "osvm")]
#[command(about = "A command line client for an OpenStack-compatible control plane")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a custom client configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Control plane host to connect to
    #[arg(short = 'H', long, global = true)]
    pub host: Option<String>,

    /// Render results as JSON instead of YAML/tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Authenticate and cache a token for the host
    Auth {
        /// Username (prompted when omitted)
        #[arg(long)]
        user: Option<String>,
        /// Identity domain name
        #[arg(long)]
        domain: Option<String>,
        /// Project to scope the token to
        #[arg(long)]
        project: Option<String>,
    },
    /// Create resources
    Create {
        #[command(subcommand)]
        target: CreateTarget,
    },
    /// Migrate resources
    #[command(alias = "mig")]
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// List resources
    List {
        #[command(subcommand)]
        target: ListTarget,
    },
    /// Delete resources
    Delete {
        #[command(subcommand)]
        target: DeleteTarget,
    },
    /// Reboot a virtual machine and wait for it to come back
    Reboot {
        /// Server name or ID
        server: String,
        /// Hard reboot instead of the default soft reboot
        #[arg(long)]
        hard: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CreateTarget {
    /// Create a new virtual machine
    Vm {
        /// Name of the VM
        #[arg(long)]
        name: String,
        /// Flavor name or ID
        #[arg(long)]
        flavor: Option<String>,
        /// Image name or ID (omit to boot from a blank volume)
        #[arg(long)]
        image: Option<String>,
        /// Comma-separated network names/IDs, attached in order
        #[arg(long)]
        networks: Option<String>,
        /// Comma-separated fixed IPs, one per network ('auto' to skip)
        #[arg(long)]
        ips: Option<String>,
        /// Comma-separated MAC addresses, one per network ('auto' to skip)
        #[arg(long)]
        macs: Option<String>,
        /// Boot volume size in GiB
        #[arg(long)]
        size: Option<u64>,
        /// Path to a cloud-init user data file
        #[arg(long)]
        user_data: Option<PathBuf>,
        /// Volume type for the boot volume
        #[arg(long)]
        volume_type: Option<String>,
        /// Gracefully stop the VM once provisioning finishes
        #[arg(long)]
        shutdown: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum MigrateTarget {
    /// Migrate a virtual machine from a VMware VMDK
    Vm {
        /// Name of the VM
        #[arg(long)]
        name: String,
        /// Local path to the VMDK file
        #[arg(long)]
        vmdk: PathBuf,
        /// Flavor name or ID
        #[arg(long)]
        flavor: Option<String>,
        /// Comma-separated network names/IDs, attached in order
        #[arg(long)]
        networks: Option<String>,
        /// Comma-separated MAC addresses, one per network ('auto' to skip)
        #[arg(long)]
        mac: Option<String>,
        /// Root volume size in GiB (defaults to the image size, rounded up)
        #[arg(long)]
        size: Option<u64>,
        /// Disk bus for the root volume: sata, scsi, or virtio
        #[arg(long, default_value = "scsi")]
        disk_bus: String,
        /// Volume type for the root volume
        #[arg(long)]
        volume_type: Option<String>,
        /// Shut the VM down after migration
        #[arg(long)]
        shutdown: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ListTarget {
    /// List virtual machines
    Vms,
    /// List images
    Images,
    /// List networks
    Networks,
    /// List flavors
    Flavors,
    /// List volumes
    Volumes,
}

#[derive(Debug, Clone, Subcommand)]
pub enum DeleteTarget {
    /// Delete a virtual machine
    Vm {
        /// Server name or ID
        id: String,
    },
    /// Delete an image
    Image {
        /// Image name or ID
        id: String,
    },
    /// Delete a volume
    Volume {
        /// Volume name or ID
        id: String,
    },
}
