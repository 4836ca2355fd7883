//! Privileged helper scripts bundled under the share directory
//!
//! The image existence check, the copy, and the hostname patch all need
//! root on a stock libvirt host, so each runs through sudo. The scripts
//! are installation artifacts living in `subcmds/` next to the templates
//! and base images.

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use std::process::Command;

use crate::cmdext::CommandRunExt;
use crate::config::DeployConfig;

const CHECK_IMAGE: &str = "subcmds/check_image.sh";
const COPY_IMAGE: &str = "subcmds/copy_image.sh";
const SET_VM_NAME: &str = "subcmds/set-vm-name.sh";

fn sudo_script(config: &DeployConfig, script: &str) -> Command {
    let mut cmd = Command::new("sudo");
    cmd.arg(config.share_dir.join(script));
    cmd
}

/// Whether the destination image already exists in the image directory.
///
/// The check runs as root because the image directory is not generally
/// readable; the script exits 0 exactly when the image is present.
pub fn image_exists(config: &DeployConfig, image: &str) -> Result<bool> {
    let output = sudo_script(config, CHECK_IMAGE)
        .arg(&config.image_dir)
        .arg(image)
        .output()
        .context("Failed to run check_image helper")?;
    Ok(output.status.success())
}

/// Copy the base image into place, optionally staging through the
/// fast-storage directory.
pub fn copy_image(
    config: &DeployConfig,
    src: &Utf8Path,
    dest: &Utf8Path,
    staging: Option<&Utf8Path>,
) -> Result<()> {
    let mut cmd = sudo_script(config, COPY_IMAGE);
    cmd.arg(src).arg(dest);
    if let Some(dir) = staging {
        cmd.arg(dir);
    }
    cmd.run_captured().context("copy_image helper failed")?;
    Ok(())
}

/// Patch the guest hostname inside the copied image.
pub fn set_hostname(config: &DeployConfig, image: &Utf8Path, name: &str) -> Result<()> {
    sudo_script(config, SET_VM_NAME)
        .arg(image)
        .arg(name)
        .run_captured()
        .context("set-vm-name helper failed")?;
    Ok(())
}
