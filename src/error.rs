//! Error type shared by the configuration and multicall helpers.

use alloy::primitives::Address;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// No aggregator contract is deployed (or known) for the chain.
    #[error("Multicall Provider missing for {0}")]
    MulticallProviderMissing(u64),

    /// The chain id has no configuration or no address for the requested contract.
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),

    /// The configured RPC endpoint is not a valid URL.
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    /// A JSON ABI could not be parsed.
    #[error("Invalid ABI: {0}")]
    Abi(#[from] serde_json::Error),

    /// The function name is not part of the ABI used for the call.
    #[error("{name} missing on {address}")]
    MissingFunction { name: String, address: Address },

    #[error("Failed to encode {name}: {reason}")]
    Encode { name: String, reason: String },

    #[error("Failed to decode result of {name}: {reason}")]
    Decode { name: String, reason: String },

    /// The aggregator call itself failed (transport error or revert).
    #[error("Multicall aggregate failed: {0}")]
    Aggregate(String),

    /// A decoded result did not have the shape the caller expected.
    #[error("Unexpected return data for {0}")]
    UnexpectedReturn(&'static str),

    #[error("Numeric conversion failed: {0}")]
    Numeric(String),
}

impl From<alloy::contract::Error> for Error {
    fn from(err: alloy::contract::Error) -> Self {
        Error::Aggregate(err.to_string())
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Numeric(err.to_string())
    }
}
