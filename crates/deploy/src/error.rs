//! Failure taxonomy for one deployment invocation
//!
//! Every way the program can fail maps to exactly one variant here, and
//! every variant maps to a distinct process exit status. The conversion
//! happens once, at the top of `main` - nothing below it calls
//! `std::process::exit`.

use camino::Utf8PathBuf;
use thiserror::Error;

/// One failure class per process exit status.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Usage, configuration, or environment problems ahead of the
    /// provisioning sequence (unreadable rc file, template errors, a
    /// helper that could not be spawned at all).
    #[error("{0:#}")]
    General(color_eyre::Report),

    /// A `--nic` token whose prefix is neither a bridge nor a network.
    #[error("unknown network type {0:?}")]
    UnknownNetworkType(String),

    /// The domain, or an alias sharing its MAC address, is already defined.
    #[error("{0} is already defined")]
    DomainDefined(String),

    /// The destination image path is already occupied.
    #[error("{0} exists")]
    ImageExists(Utf8PathBuf),

    /// The base image could not be found.
    #[error("base image {0} does not exist")]
    BaseImageMissing(Utf8PathBuf),

    /// qemu-img could not report a format for the base image.
    #[error("image format for {0} is unknown")]
    FormatUnknown(Utf8PathBuf),

    /// virsh rejected the rendered domain document.
    #[error("defining domain {0} failed: {1}")]
    DefineFailed(String, String),

    /// The image copy helper failed after the domain was defined.
    #[error("copying image {0} failed: {1}")]
    CopyFailed(String, String),

    /// The hostname patch helper failed.
    #[error("setting hostname in {0} failed: {1}")]
    HostnameFailed(Utf8PathBuf, String),

    /// virsh could not start the freshly defined domain.
    #[error("starting domain {0} failed: {1}")]
    StartFailed(String, String),
}

impl DeployError {
    /// The process exit status reported for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::General(_) | DeployError::UnknownNetworkType(_) => 1,
            DeployError::DomainDefined(_) => 2,
            DeployError::ImageExists(_) => 3,
            DeployError::BaseImageMissing(_) | DeployError::FormatUnknown(_) => 4,
            DeployError::DefineFailed(_, _) => 5,
            DeployError::CopyFailed(_, _) => 6,
            DeployError::HostnameFailed(_, _) => 7,
            DeployError::StartFailed(_, _) => 8,
        }
    }
}

impl From<color_eyre::Report> for DeployError {
    fn from(report: color_eyre::Report) -> Self {
        DeployError::General(report)
    }
}
