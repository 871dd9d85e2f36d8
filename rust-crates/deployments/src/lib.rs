use anyhow::{
    Context,
    Result,
    anyhow,
};
use itertools::Itertools;
use raffle_abi::Address;
use std::{
    collections::{
        BTreeMap,
        HashMap,
    },
    fs,
    path::Path,
};

pub const DEFAULT_ADDRESSES_FILE: &str = "constants/contractAddresses.json";

/// Deployed raffle contracts keyed by chain id.
///
/// The file format is a JSON object whose keys are chain ids (decimal, or
/// `0x`-hex) and whose values are lists of addresses, newest first:
///
/// ```json
/// { "11155111": ["0x…"], "31337": ["0x…"] }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    by_chain: BTreeMap<u64, Vec<Address>>,
}

impl ContractAddresses {
    pub fn new(by_chain: impl IntoIterator<Item = (u64, Vec<Address>)>) -> Self {
        Self {
            by_chain: by_chain.into_iter().collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| {
            format!("Failed to read contract address table {}", path.display())
        })?;
        Self::from_json(&data)
            .with_context(|| format!("Invalid contract address table {}", path.display()))
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let raw: HashMap<String, Vec<Address>> = serde_json::from_slice(data)
            .context("Failed to parse contract address JSON")?;
        let mut by_chain = BTreeMap::new();
        for (key, addresses) in raw {
            let chain_id = parse_chain_id(&key)?;
            by_chain.insert(chain_id, addresses);
        }
        Ok(Self { by_chain })
    }

    /// First deployed address for the chain. Unknown chains and chains with
    /// an empty list resolve to `None`.
    pub fn resolve(&self, chain_id: u64) -> Option<Address> {
        self.by_chain
            .get(&chain_id)
            .and_then(|addresses| addresses.first())
            .copied()
    }

    pub fn supported_chains(&self) -> impl Iterator<Item = u64> + '_ {
        self.by_chain
            .iter()
            .filter(|(_, addresses)| !addresses.is_empty())
            .map(|(chain_id, _)| *chain_id)
    }

    pub fn is_empty(&self) -> bool {
        self.supported_chains().next().is_none()
    }

    /// Prompt shown when the active chain has no deployment, e.g.
    /// `Please connect to Sepolia or Goerli network`.
    pub fn connect_prompt(&self) -> String {
        if self.is_empty() {
            return String::from("No raffle deployments are configured");
        }
        let names = self
            .supported_chains()
            .map(chain_label)
            .join(" or ");
        format!("Please connect to {names} network")
    }
}

fn parse_chain_id(key: &str) -> Result<u64> {
    let key = key.trim();
    let parsed = match key.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => key.parse::<u64>(),
    };
    parsed.map_err(|_| anyhow!("Invalid chain id key `{key}` in contract address table"))
}

pub fn chain_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("Ethereum Mainnet"),
        5 => Some("Goerli"),
        10 => Some("Optimism"),
        137 => Some("Polygon"),
        8453 => Some("Base"),
        42161 => Some("Arbitrum One"),
        1337 => Some("Localhost"),
        31337 => Some("Hardhat"),
        80001 => Some("Mumbai"),
        11155111 => Some("Sepolia"),
        _ => None,
    }
}

pub fn chain_label(chain_id: u64) -> String {
    match chain_name(chain_id) {
        Some(name) => name.to_string(),
        None => format!("chain {chain_id}"),
    }
}
