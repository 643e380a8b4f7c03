//! Static network configuration.
//!
//! Two kinds of chain identifiers live here: the well-known [`ChainId`]s that
//! can be addressed by a short query name (`?chain=bsc`), and the concrete
//! [`ChainConfig`] records the helpers actually connect to.

use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// Chains addressable by query name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u64)]
pub enum ChainId {
    Ethereum = 1,
    Goerli = 5,
    Bsc = 56,
    BscTestnet = 97,
}

impl ChainId {
    pub const ALL: [ChainId; 4] = [
        ChainId::Bsc,
        ChainId::Ethereum,
        ChainId::BscTestnet,
        ChainId::Goerli,
    ];

    pub const fn id(self) -> u64 {
        self as u64
    }

    pub const fn query_name(self) -> &'static str {
        match self {
            ChainId::Ethereum => "eth",
            ChainId::Goerli => "goerli",
            ChainId::Bsc => "bsc",
            ChainId::BscTestnet => "bscTestnet",
        }
    }
}

impl TryFrom<u64> for ChainId {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self> {
        ChainId::ALL
            .into_iter()
            .find(|chain| chain.id() == id)
            .ok_or(Error::UnsupportedChain(id))
    }
}

/// Resolves a query name (`eth`, `goerli`, `bsc`, `bscTestnet`) to its chain id.
pub fn chain_id_from_query_name(name: &str) -> Option<u64> {
    if name.is_empty() {
        return None;
    }
    ChainId::ALL
        .into_iter()
        .find(|chain| chain.query_name() == name)
        .map(ChainId::id)
}

/// Connection and display parameters of a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub hex_chain_id: &'static str,
    pub block_explorer: &'static str,
    pub decimals: u8,
}

impl ChainConfig {
    pub fn rpc_url(&self) -> Result<Url> {
        Ok(Url::parse(self.rpc)?)
    }

    /// The endpoint to connect through: `rpc_url` if given, else the configured one.
    pub fn with_rpc(&self, rpc_url: Option<Url>) -> Result<Url> {
        match rpc_url {
            Some(url) => Ok(url),
            None => self.rpc_url(),
        }
    }

    pub fn explorer_address_url(&self, address: &alloy::primitives::Address) -> String {
        format!("{}/address/{}", self.block_explorer, address)
    }
}

pub const FTM_TESTNET: ChainConfig = ChainConfig {
    chain_id: 4002,
    rpc: "https://rpc.testnet.fantom.network",
    name: "Fantom testnet",
    symbol: "FTM",
    hex_chain_id: "0xfa2",
    block_explorer: "https://testnet.ftmscan.com",
    decimals: 18,
};

pub const BSC_MAINNET: ChainConfig = ChainConfig {
    chain_id: 56,
    rpc: "https://bsc-dataseed1.binance.org",
    name: "BNB Smart Chain Mainnet",
    symbol: "BNB",
    hex_chain_id: "0x38",
    block_explorer: "https://bscscan.com",
    decimals: 18,
};

pub const CONFIGURED_CHAINS: [&ChainConfig; 2] = [&FTM_TESTNET, &BSC_MAINNET];

/// Looks up the connection parameters of a chain.
pub fn chain_config(chain_id: u64) -> Result<&'static ChainConfig> {
    CONFIGURED_CHAINS
        .into_iter()
        .find(|chain| chain.chain_id == chain_id)
        .ok_or(Error::UnsupportedChain(chain_id))
}
