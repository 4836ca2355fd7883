//! Thin wrappers over the virsh CLI
//!
//! Each call runs one virsh subcommand to completion and captures its
//! output; libvirt itself is the source of truth for domain state.

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use std::process::Command;

use crate::cmdext::CommandRunExt;

/// Whether a domain with this name is known to libvirt, in any state.
///
/// `virsh domstate` succeeds exactly when the domain is defined, so the
/// exit status is the answer and the output is discarded.
pub fn domain_defined(name: &str) -> Result<bool> {
    let output = Command::new("virsh")
        .args(["domstate", name])
        .output()
        .with_context(|| format!("Failed to run virsh domstate {name}"))?;
    Ok(output.status.success())
}

/// Register a domain definition document with libvirt.
pub fn define(xml: &Utf8Path) -> Result<()> {
    Command::new("virsh")
        .arg("define")
        .arg(xml)
        .run_captured()
        .context("virsh define failed")?;
    Ok(())
}

/// Start a defined domain.
pub fn start(name: &str) -> Result<()> {
    Command::new("virsh")
        .args(["start", name])
        .run_captured()
        .context("virsh start failed")?;
    Ok(())
}
