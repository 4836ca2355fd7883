//! The provisioning sequence
//!
//! Strictly ordered: preconditions, NIC derivation, document rendering,
//! then the mutating steps (define, copy, hostname patch, start). Every
//! step aborts the whole invocation on failure; there is no rollback. A
//! failure after `virsh define` leaves the domain registered without a
//! backing image - a known limitation, recovery is manual.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::{eyre, Context};
use tracing::debug;

use crate::cli::Cli;
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::{nic, qemu_img, subcmds, template, virsh};

/// Print the available base images, sorted, one per line.
pub fn list_base_images(config: &DeployConfig) -> Result<(), DeployError> {
    for name in base_images(&config.baseimage_dir)? {
        println!("{name}");
    }
    Ok(())
}

/// Sorted base image names, dotfiles skipped.
fn base_images(dir: &Utf8Path) -> color_eyre::Result<Vec<String>> {
    let mut names = Vec::new();
    let entries = dir
        .read_dir_utf8()
        .with_context(|| format!("Failed to read base image directory {dir}"))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {dir}"))?;
        let name = entry.file_name();
        if name.starts_with('.') {
            continue;
        }
        names.push(name.to_string());
    }
    names.sort();
    Ok(names)
}

/// The domain name, and every alias sharing its MAC, must be unknown to
/// libvirt before anything mutates.
fn check_domain(name: &str, config: &DeployConfig) -> Result<(), DeployError> {
    if virsh::domain_defined(name)? {
        return Err(DeployError::DomainDefined(name.to_string()));
    }
    for alias in config.aliases_of(name) {
        if virsh::domain_defined(&alias)? {
            return Err(DeployError::DomainDefined(format!("alias \"{alias}\"")));
        }
    }
    Ok(())
}

/// Absolute path of the requested base image; relative names resolve
/// against the configured base image directory.
fn resolve_base_image(baseimage: &str, config: &DeployConfig) -> Result<Utf8PathBuf, DeployError> {
    let path = Utf8Path::new(baseimage);
    let resolved = if path.is_absolute() {
        path.to_owned()
    } else {
        config.baseimage_dir.join(path)
    };
    if !resolved.exists() {
        return Err(DeployError::BaseImageMissing(resolved));
    }
    Ok(resolved)
}

/// Execute one deployment invocation end to end.
pub fn run(cli: &Cli, config: &DeployConfig) -> Result<(), DeployError> {
    let dest_image = format!("{}.img", cli.name);
    let dest_path = config.image_dir.join(&dest_image);

    // Preconditions, all before any mutation.
    if subcmds::image_exists(config, &dest_image)? {
        return Err(DeployError::ImageExists(dest_path));
    }
    check_domain(&cli.name, config)?;
    let base_path = resolve_base_image(&cli.baseimage, config)?;
    let format = match qemu_img::info(&base_path) {
        Ok(info) => info.format,
        Err(err) => {
            debug!("qemu-img info failed: {err:#}");
            None
        }
    };
    let format = format.ok_or_else(|| DeployError::FormatUnknown(base_path.clone()))?;

    // Derivation and rendering.
    let tokens = cli.nic_tokens();
    let mut rng = rand::rng();
    let nics = nic::derive_nics(&tokens, &cli.name, config, &mut rng)?;
    let params = template::DomainParams {
        name: &cli.name,
        cpu: cli.cpu,
        memory: cli.memory * 1024 * 1024,
        format: &format,
        nics: &nics,
    };
    let template_path = cli.template.as_deref().unwrap_or(config.template.as_path());
    let document = template::write_document(template_path, &params)?;
    for nic in &nics {
        match &nic.targetdev {
            Some(dev) => println!("{}: {} ({dev})", nic.network, nic.mac),
            None => println!("{}: {}", nic.network, nic.mac),
        }
    }

    // Mutating sequence. The document handle guarantees removal of the
    // rendered XML on every abort path from here on.
    let doc_path = Utf8Path::from_path(document.path())
        .ok_or_else(|| eyre!("domain document path is not UTF-8"))?;
    virsh::define(doc_path)
        .map_err(|err| DeployError::DefineFailed(cli.name.clone(), format!("{err:#}")))?;

    println!(
        "Copying {} -> {}...",
        base_path.file_name().unwrap_or(base_path.as_str()),
        dest_image
    );
    let staging = cli.use_ramdisk.then(|| config.ramdisk_dir.as_path());
    subcmds::copy_image(config, &base_path, &dest_path, staging)
        .map_err(|err| DeployError::CopyFailed(dest_image.clone(), format!("{err:#}")))?;

    // The patch helper cannot address raw images.
    if !cli.no_hostname && format != "raw" {
        println!("Setting hostname to the image...");
        subcmds::set_hostname(config, &dest_path, &cli.name)
            .map_err(|err| DeployError::HostnameFailed(dest_path.clone(), format!("{err:#}")))?;
        println!("Done");
    }

    document
        .close()
        .context("Failed to remove domain document")?;

    if !cli.nostart {
        virsh::start(&cli.name)
            .map_err(|err| DeployError::StartFailed(cli.name.clone(), format!("{err:#}")))?;
        println!("Start VM {}", cli.name);
    }

    Ok(())
}
