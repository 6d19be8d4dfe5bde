use bluer::Address;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::env;

/// Deployment settings. Protocol and scan policy constants are fixed in code.
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Bluetooth adapter name, e.g. `hci0`. Default adapter when `None`.
    pub adapter_name: Option<String>,
    /// Report labels keyed by device address
    pub tags: HashMap<Address, String>,
}

impl MonitorConfig {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        let adapter_name = env::var("BLUETOOTH_ADAPTER")
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        // Try RUUVI_TAGS format first
        let pairs = if let Ok(ruuvi_tags) = env::var("RUUVI_TAGS") {
            debug!("Found RUUVI_TAGS: '{}'", ruuvi_tags);
            parse_tag_pairs(&ruuvi_tags)
        } else {
            // Fallback to individual environment variables
            debug!("RUUVI_TAGS environment variable not found, trying individual variables");
            let mut pairs = Vec::new();
            for (key, value) in env::vars() {
                if let Some(index) = key
                    .strip_prefix("RUUVI_TAG_")
                    .and_then(|s| s.strip_suffix("_MAC"))
                {
                    let name_key = format!("RUUVI_TAG_{}_NAME", index);
                    if let Ok(name) = env::var(&name_key) {
                        pairs.push((value, name));
                    }
                }
            }
            pairs
        };

        let tags = parse_tags(pairs)?;

        info!("Total tag aliases loaded: {}", tags.len());
        for (mac, name) in &tags {
            debug!("Tag: {} -> {}", mac, name);
        }

        Ok(MonitorConfig { adapter_name, tags })
    }
}

/// Split `MAC=name,MAC=name` into trimmed pairs, skipping empty or incomplete entries
fn parse_tag_pairs(ruuvi_tags: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for pair in ruuvi_tags.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        match pair.split_once('=') {
            Some((mac, name)) => {
                let mac = mac.trim();
                let name = name.trim();
                if !mac.is_empty() && !name.is_empty() {
                    pairs.push((mac.to_string(), name.to_string()));
                }
            }
            None => warn!("Failed to split tag pair: '{}'", pair),
        }
    }
    pairs
}

fn parse_tags(
    pairs: Vec<(String, String)>,
) -> Result<HashMap<Address, String>, Box<dyn std::error::Error>> {
    let mut tags = HashMap::new();
    for (mac, name) in pairs {
        let address: Address = mac
            .trim()
            .parse()
            .map_err(|e| format!("Invalid tag MAC address '{}': {}", mac, e))?;
        tags.insert(address, name);
    }
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tag_list() {
        let pairs = parse_tag_pairs(
            " C4:7C:8D:6A:01:02 = Sauna ,, broken, =x, D1:D2:D3:D4:D5:D6=Attic",
        );
        assert_eq!(
            pairs,
            vec![
                ("C4:7C:8D:6A:01:02".to_string(), "Sauna".to_string()),
                ("D1:D2:D3:D4:D5:D6".to_string(), "Attic".to_string()),
            ]
        );

        let tags = parse_tags(pairs).unwrap();
        assert_eq!(
            tags.get(&Address::new([0xC4, 0x7C, 0x8D, 0x6A, 0x01, 0x02])),
            Some(&"Sauna".to_string())
        );
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn lowercase_mac_matches_address() {
        let tags = parse_tags(vec![(
            "c4:7c:8d:6a:01:02".to_string(),
            "Sauna".to_string(),
        )])
        .unwrap();
        assert!(tags.contains_key(&Address::new([0xC4, 0x7C, 0x8D, 0x6A, 0x01, 0x02])));
    }

    #[test]
    fn invalid_mac_is_an_error() {
        let result = parse_tags(vec![("not-a-mac".to_string(), "Sauna".to_string())]);
        assert!(result.is_err());
    }
}
