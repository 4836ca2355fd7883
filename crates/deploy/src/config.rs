//! Per-invocation configuration
//!
//! All tunables live in one [`DeployConfig`] value built once at startup
//! and passed by reference into whatever needs it. Sources, in load order:
//! built-in defaults, the `VMDEPLOY_PUBLIC_BRIDGE` environment variable,
//! the per-user `~/.vmdeployrc` (TOML), then the optional JSON MAC and
//! alias registry files.

use camino::Utf8PathBuf;
use color_eyre::{eyre::Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

/// Share directory holding templates, helper scripts, and base images.
pub const SHARE_DIR: &str = "/usr/local/share/vmdeploy";
/// Directory libvirt serves domain disks from.
pub const IMAGE_DIR: &str = "/var/lib/libvirt/images";
/// Default number of vCPUs.
pub const DEFAULT_CPUS: u32 = 2;
/// Default memory size in GB.
pub const DEFAULT_MEMORY_GB: u64 = 4;

/// Environment variable overriding the public bridge name.
pub const ENV_PUBLIC_BRIDGE: &str = "VMDEPLOY_PUBLIC_BRIDGE";
/// Environment variable overriding the MAC registry file path.
pub const ENV_MAC_FILE: &str = "VMDEPLOY_MAC_FILE";
/// Environment variable naming the JSON alias file.
pub const ENV_ALIAS_FILE: &str = "VMDEPLOY_ALIAS_FILE";

const DEFAULT_PUBLIC_BRIDGE: &str = "br0";
const DEFAULT_RAMDISK_DIR: &str = "/dev/shm";
const RC_FILE_NAME: &str = ".vmdeployrc";

/// Configuration for one deployment invocation; immutable after load.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Bridge interface connected to the external network; a NIC resolved
    /// onto it may reuse a registered MAC address.
    pub public_bridge: String,
    /// Identifier to MAC address mapping; aliases are folded in at load
    /// time so two identifiers sharing a MAC are aliases of one another.
    pub mac_registry: HashMap<String, String>,
    /// Fast storage used as a copy staging area with --use-ramdisk.
    pub ramdisk_dir: Utf8PathBuf,
    /// Where domain disks are created.
    pub image_dir: Utf8PathBuf,
    /// Where relative base image names are looked up.
    pub baseimage_dir: Utf8PathBuf,
    /// Default domain XML template.
    pub template: Utf8PathBuf,
    /// Root of the helper script installation.
    pub share_dir: Utf8PathBuf,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let share_dir = Utf8PathBuf::from(SHARE_DIR);
        Self {
            public_bridge: DEFAULT_PUBLIC_BRIDGE.to_string(),
            mac_registry: HashMap::new(),
            ramdisk_dir: Utf8PathBuf::from(DEFAULT_RAMDISK_DIR),
            image_dir: Utf8PathBuf::from(IMAGE_DIR),
            baseimage_dir: share_dir.join("images"),
            template: share_dir.join("templates/libvirt.xml"),
            share_dir,
        }
    }
}

/// Shape of `~/.vmdeployrc`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RcFile {
    default: RcDefaults,
    mac: HashMap<String, String>,
    alias: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct RcDefaults {
    public_bridge: Option<String>,
    ramdisk_dir: Option<String>,
}

impl DeployConfig {
    /// Load configuration from the environment, the per-user rc file, and
    /// the optional JSON registry files.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bridge) = std::env::var(ENV_PUBLIC_BRIDGE) {
            if !bridge.is_empty() {
                config.public_bridge = bridge;
            }
        }

        if let Some(home) = dirs::home_dir() {
            let rc_path = home.join(RC_FILE_NAME);
            if rc_path.exists() {
                let text = std::fs::read_to_string(&rc_path)
                    .with_context(|| format!("Failed to read {}", rc_path.display()))?;
                config
                    .apply_rc(&text)
                    .with_context(|| format!("Failed to parse {}", rc_path.display()))?;
            }
        }

        let mac_file = std::env::var(ENV_MAC_FILE)
            .map(Utf8PathBuf::from)
            .unwrap_or_else(|_| config.share_dir.join("mac.json"));
        if mac_file.exists() {
            println!("Loading mac_address file {mac_file}");
            let text = std::fs::read_to_string(&mac_file)
                .with_context(|| format!("Failed to read {mac_file}"))?;
            config
                .apply_mac_json(&text)
                .with_context(|| format!("Failed to parse {mac_file}"))?;
        }

        if let Ok(alias_file) = std::env::var(ENV_ALIAS_FILE) {
            let alias_file = Utf8PathBuf::from(alias_file);
            if !alias_file.as_str().is_empty() && alias_file.exists() {
                println!("Loading alias file {alias_file}");
                let text = std::fs::read_to_string(&alias_file)
                    .with_context(|| format!("Failed to read {alias_file}"))?;
                config
                    .apply_alias_json(&text)
                    .with_context(|| format!("Failed to parse {alias_file}"))?;
            }
        }

        Ok(config)
    }

    /// Fold the per-user rc file into the defaults.
    fn apply_rc(&mut self, text: &str) -> Result<()> {
        let rc: RcFile = toml::from_str(text)?;
        if let Some(bridge) = rc.default.public_bridge {
            self.public_bridge = bridge;
        }
        if let Some(dir) = rc.default.ramdisk_dir {
            self.ramdisk_dir = Utf8PathBuf::from(dir);
        }
        self.mac_registry.extend(rc.mac);
        self.apply_aliases(&rc.alias);
        Ok(())
    }

    /// Replace the registry with the contents of the JSON MAC file. The
    /// file is authoritative when present; rc-file entries do not survive.
    fn apply_mac_json(&mut self, text: &str) -> Result<()> {
        self.mac_registry = serde_json::from_str(text)?;
        Ok(())
    }

    /// Fold a JSON alias map (alias -> canonical name) into the registry.
    fn apply_alias_json(&mut self, text: &str) -> Result<()> {
        let aliases: HashMap<String, String> = serde_json::from_str(text)?;
        self.apply_aliases(&aliases);
        Ok(())
    }

    fn apply_aliases(&mut self, aliases: &HashMap<String, String>) {
        for (alias, name) in aliases {
            match self.mac_registry.get(name).cloned() {
                Some(mac) => {
                    self.mac_registry.insert(alias.clone(), mac);
                }
                None => warn!("Alias {alias:?} has no corresponding entry {name:?}"),
            }
        }
    }

    /// Identifiers sharing this name's MAC address, the name itself
    /// excluded. Empty when the name is not registered.
    pub fn aliases_of(&self, name: &str) -> Vec<String> {
        let Some(mac) = self.mac_registry.get(name) else {
            return Vec::new();
        };
        self.mac_registry
            .iter()
            .filter(|(alias, m)| m.as_str() == mac.as_str() && alias.as_str() != name)
            .map(|(alias, _)| alias.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc_overrides_defaults() {
        let mut config = DeployConfig::default();
        config
            .apply_rc(
                r#"
                [default]
                public-bridge = "br1"
                ramdisk-dir = "/mnt/fast"

                [mac]
                web = "52:54:00:aa:bb:cc"
            "#,
            )
            .unwrap();
        assert_eq!(config.public_bridge, "br1");
        assert_eq!(config.ramdisk_dir, Utf8PathBuf::from("/mnt/fast"));
        assert_eq!(
            config.mac_registry.get("web").map(String::as_str),
            Some("52:54:00:aa:bb:cc")
        );
    }

    #[test]
    fn test_rc_aliases_resolve_against_mac_section() {
        let mut config = DeployConfig::default();
        config
            .apply_rc(
                r#"
                [mac]
                web = "52:54:00:aa:bb:cc"

                [alias]
                www = "web"
                ghost = "nonexistent"
            "#,
            )
            .unwrap();
        assert_eq!(
            config.mac_registry.get("www"),
            config.mac_registry.get("web")
        );
        assert!(!config.mac_registry.contains_key("ghost"));
    }

    #[test]
    fn test_mac_json_replaces_rc_entries() {
        let mut config = DeployConfig::default();
        config
            .apply_rc("[mac]\nweb = \"52:54:00:aa:bb:cc\"\n")
            .unwrap();
        config
            .apply_mac_json(r#"{"db": "52:54:00:11:22:33"}"#)
            .unwrap();
        assert!(!config.mac_registry.contains_key("web"));
        assert_eq!(
            config.mac_registry.get("db").map(String::as_str),
            Some("52:54:00:11:22:33")
        );
    }

    #[test]
    fn test_aliases_of_is_a_mac_equivalence() {
        let mut config = DeployConfig::default();
        config
            .apply_mac_json(
                r#"{
                    "web": "52:54:00:aa:bb:cc",
                    "www": "52:54:00:aa:bb:cc",
                    "db": "52:54:00:11:22:33"
                }"#,
            )
            .unwrap();
        assert_eq!(config.aliases_of("web"), vec!["www".to_string()]);
        assert!(config.aliases_of("db").is_empty());
        assert!(config.aliases_of("unregistered").is_empty());
    }

    #[test]
    fn test_empty_rc_is_fine() {
        let mut config = DeployConfig::default();
        config.apply_rc("").unwrap();
        assert_eq!(config.public_bridge, "br0");
        assert!(config.mac_registry.is_empty());
    }
}
