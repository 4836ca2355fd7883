//! NIC parameter derivation
//!
//! Turns the ordered list of raw `--nic` tokens into fully resolved
//! parameters for template substitution: a network classification, a MAC
//! address, a PCI slot, and (when it fits) a guest device name. No two
//! parameters collide on slot or device name within one invocation.

use std::collections::HashMap;

use rand::Rng;
use serde::Serialize;

use crate::config::DeployConfig;
use crate::error::DeployError;

/// PCI slot of the first NIC; later NICs count up from here.
pub const BASE_SLOT: u8 = 0x07;

/// Linux IF_NAMESIZE. Device names longer than this are left to the
/// platform to choose.
const DEV_NAME_LEN: usize = 16;

/// QEMU's locally administered OUI for generated MAC addresses.
const MAC_OUI: [u8; 3] = [0x52, 0x54, 0x00];

/// Semantic classification of a NIC token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// The libvirt default NAT network.
    Nat,
    /// The host bridge connected to the external network.
    Public,
    /// An arbitrary host bridge.
    Bridge,
    /// A named libvirt network.
    Network,
}

/// Fully resolved parameters for one virtual NIC, in the shape the domain
/// template consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NicParam {
    /// Classification of the requested token.
    pub kind: NetworkKind,
    /// Resolved bridge or network name.
    pub network: String,
    /// Colon-separated lowercase MAC address.
    pub mac: String,
    /// PCI slot, formatted `0xNN`.
    pub slot: String,
    /// Guest device name; `None` past the interface-name length limit,
    /// meaning the platform chooses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targetdev: Option<String>,
}

/// Classify one token into a network kind and resolved name.
fn classify(token: &str, public_bridge: &str) -> Result<(NetworkKind, String), DeployError> {
    let lower = token.to_ascii_lowercase();
    if lower == "nat" {
        return Ok((NetworkKind::Nat, "default".to_string()));
    }
    if lower.starts_with("pub") {
        return Ok((NetworkKind::Public, public_bridge.to_string()));
    }
    match token.split_once(':') {
        Some((prefix, rest)) => match prefix.to_ascii_lowercase().as_str() {
            "br" => Ok((NetworkKind::Bridge, rest.to_string())),
            "net" => Ok((NetworkKind::Network, rest.to_string())),
            _ => Err(DeployError::UnknownNetworkType(token.to_string())),
        },
        None => Ok((NetworkKind::Network, token.to_string())),
    }
}

/// Generate a MAC address in QEMU's vendor block with three uniformly
/// random trailing octets.
pub fn random_mac(rng: &mut impl Rng) -> String {
    let octets: [u8; 6] = [
        MAC_OUI[0],
        MAC_OUI[1],
        MAC_OUI[2],
        rng.random(),
        rng.random(),
        rng.random(),
    ];
    octets
        .iter()
        .map(|octet| format!("{octet:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// A public NIC reuses the MAC registered for the domain; everything else
/// gets a fresh one.
fn resolve_mac(
    kind: NetworkKind,
    network: &str,
    domname: &str,
    registry: &HashMap<String, String>,
    rng: &mut impl Rng,
) -> String {
    if kind == NetworkKind::Public {
        if let Some(mac) = registry.get(domname) {
            println!("Use {mac} for nic connected to {network}");
            return mac.clone();
        }
    }
    let mac = random_mac(rng);
    println!("Generate random MAC address {mac} for network {network}");
    mac
}

/// Guest-visible device name, or `None` past the IF_NAMESIZE limit.
fn device_name(domname: &str, index: usize) -> Option<String> {
    let devname = format!("{domname}-eth{index}");
    (devname.len() <= DEV_NAME_LEN).then_some(devname)
}

/// Derive the full NIC parameter list for a domain.
///
/// Tokens resolve in request order; the caller replaces an empty request
/// list with a single synthetic NAT token beforehand. The random source
/// backs fresh MAC generation and is injectable so tests can seed it.
pub fn derive_nics(
    tokens: &[String],
    domname: &str,
    config: &DeployConfig,
    rng: &mut impl Rng,
) -> Result<Vec<NicParam>, DeployError> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| {
            let (kind, network) = classify(token, &config.public_bridge)?;
            let mac = resolve_mac(kind, &network, domname, &config.mac_registry, rng);
            Ok(NicParam {
                kind,
                network,
                mac,
                slot: format!("0x{:02x}", BASE_SLOT as usize + i),
                targetdev: device_name(domname, i),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn config() -> DeployConfig {
        DeployConfig::default()
    }

    fn tokens(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn assert_mac_shape(mac: &str) {
        let octets: Vec<&str> = mac.split(':').collect();
        assert_eq!(octets.len(), 6, "not six octets: {mac}");
        for octet in octets {
            assert_eq!(octet.len(), 2, "octet width in {mac}");
            assert!(
                octet.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()),
                "not lowercase hex: {mac}"
            );
        }
    }

    #[test]
    fn test_classification() {
        let cases = [
            ("NAT", NetworkKind::Nat, "default"),
            ("nat", NetworkKind::Nat, "default"),
            ("pub", NetworkKind::Public, "br0"),
            ("PUBLIC", NetworkKind::Public, "br0"),
            ("pub-anything", NetworkKind::Public, "br0"),
            ("br:br7", NetworkKind::Bridge, "br7"),
            ("BR:br7", NetworkKind::Bridge, "br7"),
            ("net:isolated", NetworkKind::Network, "isolated"),
            ("isolated", NetworkKind::Network, "isolated"),
        ];
        for (token, kind, network) in cases {
            let (got_kind, got_network) = classify(token, "br0").unwrap();
            assert_eq!(got_kind, kind, "token {token:?}");
            assert_eq!(got_network, network, "token {token:?}");
        }
    }

    #[test]
    fn test_unknown_prefix_is_fatal() {
        let err = classify("vlan:17", "br0").unwrap_err();
        assert!(matches!(err, DeployError::UnknownNetworkType(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_slots_increase_from_base() {
        let nics = derive_nics(
            &tokens(&["one", "two", "three"]),
            "vm1",
            &config(),
            &mut rng(),
        )
        .unwrap();
        let slots: Vec<&str> = nics.iter().map(|n| n.slot.as_str()).collect();
        assert_eq!(slots, vec!["0x07", "0x08", "0x09"]);
    }

    #[test]
    fn test_device_names_follow_request_order() {
        let nics = derive_nics(&tokens(&["NAT", "br:br0"]), "vm1", &config(), &mut rng()).unwrap();
        assert_eq!(nics[0].targetdev.as_deref(), Some("vm1-eth0"));
        assert_eq!(nics[1].targetdev.as_deref(), Some("vm1-eth1"));
    }

    #[test]
    fn test_device_name_length_limit() {
        // "abcdefghijk-eth0" is exactly 16 bytes and still fits.
        assert_eq!(
            device_name("abcdefghijk", 0).as_deref(),
            Some("abcdefghijk-eth0")
        );
        // One more character pushes past IF_NAMESIZE.
        assert_eq!(device_name("abcdefghijkl", 0), None);
    }

    #[test]
    fn test_public_nic_reuses_registered_mac() {
        let mut config = config();
        config
            .mac_registry
            .insert("vm1".to_string(), "52:54:00:aa:bb:cc".to_string());
        for token in ["pub", "public", "Pub"] {
            let nics =
                derive_nics(&tokens(&[token]), "vm1", &config, &mut rng()).unwrap();
            assert_eq!(nics[0].mac, "52:54:00:aa:bb:cc", "token {token:?}");
        }
    }

    #[test]
    fn test_public_nic_without_registration_generates() {
        let nics = derive_nics(&tokens(&["pub"]), "vm1", &config(), &mut rng()).unwrap();
        assert!(nics[0].mac.starts_with("52:54:00:"));
        assert_mac_shape(&nics[0].mac);
    }

    #[test]
    fn test_registered_mac_not_reused_on_other_networks() {
        let mut config = config();
        config
            .mac_registry
            .insert("vm1".to_string(), "52:54:00:aa:bb:cc".to_string());
        let nics = derive_nics(&tokens(&["br:br9"]), "vm1", &config, &mut rng()).unwrap();
        assert_ne!(nics[0].mac, "52:54:00:aa:bb:cc");
    }

    #[test]
    fn test_fresh_mac_shape() {
        let mut r = rng();
        for _ in 0..64 {
            let mac = random_mac(&mut r);
            assert!(mac.starts_with("52:54:00:"), "vendor prefix in {mac}");
            assert_mac_shape(&mac);
        }
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        assert_eq!(random_mac(&mut rng()), random_mac(&mut rng()));
    }

    #[test]
    fn test_bridge_and_network_scenario() {
        let nics = derive_nics(
            &tokens(&["br:br0", "net:isolated"]),
            "vm1",
            &config(),
            &mut rng(),
        )
        .unwrap();
        assert_eq!(nics.len(), 2);
        assert_eq!(nics[0].kind, NetworkKind::Bridge);
        assert_eq!(nics[0].network, "br0");
        assert_eq!(nics[0].slot, "0x07");
        assert_eq!(nics[1].kind, NetworkKind::Network);
        assert_eq!(nics[1].network, "isolated");
        assert_eq!(nics[1].slot, "0x08");
    }

    #[test]
    fn test_nat_scenario() {
        let nics = derive_nics(&tokens(&["NAT"]), "vm1", &config(), &mut rng()).unwrap();
        assert_eq!(nics.len(), 1);
        assert_eq!(nics[0].kind, NetworkKind::Nat);
        assert_eq!(nics[0].network, "default");
        assert_eq!(nics[0].slot, "0x07");
        assert_eq!(nics[0].targetdev.as_deref(), Some("vm1-eth0"));
        assert!(nics[0].mac.starts_with("52:54:00:"));
    }
}
