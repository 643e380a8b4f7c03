//! Network configuration and Multicall3 batch reads for the Bera deployments.
//!
//! - [`chains`] and [`addresses`]: static chain parameters and per-chain
//!   contract deployments.
//! - [`multicall`]: batch many contract reads into one `eth_call` against a
//!   Multicall3 aggregator and decode the results positionally.
//! - [`teams`]: merge on-chain profile team data with the static team list.
//! - [`farms`]: MasterChefV3 reward rate, pool weights, prices and APR.

pub mod abi;
pub mod addresses;
pub mod chains;
pub mod constants;
pub mod error;
pub mod farms;
pub mod interface;
pub mod multicall;
pub mod teams;

pub use error::{Error, Result};
pub use interface::{Interface, InterfaceCache};
pub use multicall::{
    Aggregator, Call, CallResult, ContractCall, MulticallV2Options, MulticallV3Options,
    get_multicall_contract, get_multicall_contract_with_rpc, multicall_contract, multicall_v2,
    multicall_v3,
};
