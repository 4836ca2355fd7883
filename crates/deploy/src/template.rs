//! Domain definition document generation
//!
//! Renders the domain XML from a Jinja-style template into an ephemeral
//! file. The returned [`NamedTempFile`] is the cleanup guarantee: the
//! document disappears when the handle drops, on the happy path and on
//! every abort path after creation alike.

use camino::Utf8Path;
use color_eyre::{eyre::Context, Result};
use minijinja::Environment;
use serde::Serialize;
use std::io::Write;
use tempfile::NamedTempFile;

use crate::nic::NicParam;

/// Parameter set consumed by the domain template.
#[derive(Debug, Serialize)]
pub struct DomainParams<'a> {
    /// Domain name.
    pub name: &'a str,
    /// Number of vCPUs.
    pub cpu: u32,
    /// Memory in KiB, libvirt's default unit.
    pub memory: u64,
    /// Base image format carried into the disk driver element.
    pub format: &'a str,
    /// Ordered NIC parameters.
    pub nics: &'a [NicParam],
}

/// Render the template source with the given parameters.
pub fn render(source: &str, params: &DomainParams<'_>) -> Result<String> {
    let env = Environment::new();
    env.render_str(source, params)
        .context("Failed to render domain template")
}

/// Render the template file into an ephemeral document for virsh define.
pub fn write_document(template: &Utf8Path, params: &DomainParams<'_>) -> Result<NamedTempFile> {
    let source = std::fs::read_to_string(template)
        .with_context(|| format!("Failed to read template {template}"))?;
    let rendered = render(&source, params)?;
    let mut file = NamedTempFile::new().context("Failed to create domain document")?;
    file.write_all(rendered.as_bytes())
        .context("Failed to write domain document")?;
    file.flush().context("Failed to flush domain document")?;
    Ok(file)
}
