use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Logical network name -> Alchemy network identifier
    static ref NETWORK_MAP: HashMap<&'static str, &'static str> = HashMap::from([
        ("ethereum", "eth-mainnet"),
        ("polygon", "polygon-mainnet"),
        ("arbitrum", "arb-mainnet"),
        ("optimism", "opt-mainnet"),
        ("base", "base-mainnet"),
        ("bsc", "bsc-mainnet"),
        ("avalanche", "avax-mainnet"),
    ]);
}

/// Map a logical network name onto Alchemy's identifier.
/// Unmapped names pass through unchanged.
pub fn alchemy_network(network: &str) -> String {
    NETWORK_MAP
        .get(network.to_lowercase().as_str())
        .map(|n| n.to_string())
        .unwrap_or_else(|| network.to_string())
}
