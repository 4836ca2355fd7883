//! VM easy deployment for libvirt hosts
//!
//! Copies a base disk image, renders a domain XML document from a
//! template, registers it with libvirt, optionally patches the guest
//! hostname, and starts the domain - one synchronous invocation, driven
//! by the `vmdeploy` binary.

pub mod cli;
pub mod cmdext;
pub mod config;
pub mod deploy;
pub mod error;
pub mod nic;
pub mod qemu_img;
pub mod subcmds;
pub mod template;
pub mod virsh;
