//! Command-line surface

use camino::Utf8PathBuf;
use clap::Parser;

use crate::config::{DEFAULT_CPUS, DEFAULT_MEMORY_GB};

/// Define and start a libvirt domain from a base disk image.
///
/// Copies the base image, renders a domain XML document from a template,
/// registers it with libvirt, optionally patches the guest hostname, and
/// starts the domain.
#[derive(Debug, Parser)]
#[clap(name = "vmdeploy", version)]
pub struct Cli {
    /// VM name to be defined
    pub name: String,

    /// Base image name, absolute path, or LIST / ? to list available base
    /// images
    pub baseimage: String,

    /// Domain XML template file
    #[clap(short = 't', long)]
    pub template: Option<Utf8PathBuf>,

    /// Number of virtual CPUs
    #[clap(short = 'c', long, default_value_t = DEFAULT_CPUS)]
    pub cpu: u32,

    /// Memory size [GB]
    #[clap(short = 'm', long, default_value_t = DEFAULT_MEMORY_GB)]
    pub memory: u64,

    /// NIC to attach: "NAT", "pub", "br:NAME", "net:NAME", or a bare
    /// network name. Repeat for multiple vNICs.
    #[clap(short = 'i', long = "nic")]
    pub nic: Vec<String>,

    /// Do not start the domain after defining it
    #[clap(long)]
    pub nostart: bool,

    /// Do not set the hostname of the VM
    #[clap(long)]
    pub no_hostname: bool,

    /// Stage the image copy through the fast-storage (ramdisk) directory
    #[clap(short = 'r', long)]
    pub use_ramdisk: bool,
}

impl Cli {
    /// True when BASEIMAGE selects the listing mode instead of a deployment.
    pub fn list_requested(&self) -> bool {
        self.baseimage == "?" || self.baseimage.eq_ignore_ascii_case("list")
    }

    /// NIC tokens to attach; defaults to a single NAT interface so every
    /// produced domain has at least one network attachment.
    pub fn nic_tokens(&self) -> Vec<String> {
        if self.nic.is_empty() {
            vec!["NAT".to_string()]
        } else {
            self.nic.clone()
        }
    }
}
