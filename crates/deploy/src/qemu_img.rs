//! Helper functions for interacting with qemu-img

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use serde::Deserialize;
use std::process::Command;

/// Information returned by `qemu-img info --output=json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QemuImgInfo {
    /// Path to the disk image file
    pub filename: Option<String>,
    /// Image format (e.g., "qcow2", "raw"); absent when qemu-img cannot
    /// determine it
    pub format: Option<String>,
    /// Virtual size of the disk image in bytes
    pub virtual_size: Option<u64>,
}

/// Run `qemu-img info --output=json` on a disk image
pub fn info(path: &Utf8Path) -> Result<QemuImgInfo> {
    let output = Command::new("qemu-img")
        .args(["info", "--output=json", path.as_str()])
        .output()
        .with_context(|| format!("Failed to run qemu-img info on {:?}", path))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(color_eyre::eyre::eyre!(
            "qemu-img info failed for {:?}: {}",
            path,
            stderr
        ));
    }

    parse_info(&output.stdout).with_context(|| format!("Failed to parse qemu-img info for {:?}", path))
}

fn parse_info(bytes: &[u8]) -> Result<QemuImgInfo, serde_json::Error> {
    serde_json::from_slice(bytes)
}
