//! Per-chain deployed contract addresses.

use alloy::primitives::Address;
use serde::Serialize;

use crate::{
    chains::{BSC_MAINNET, FTM_TESTNET},
    constants::*,
    error::{Error, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContractKind {
    /// Project ERC20 token.
    Token,
    /// Auto-compounding staking vault.
    CakeVault,
    /// Social profile contract holding teams.
    SleepProfile,
    /// Multicall3 aggregator.
    Multicall,
    /// MasterChefV3 farm manager.
    MasterChefV3,
    PancakeProfile,
}

impl ContractKind {
    pub const ALL: [ContractKind; 6] = [
        ContractKind::Token,
        ContractKind::CakeVault,
        ContractKind::SleepProfile,
        ContractKind::Multicall,
        ContractKind::MasterChefV3,
        ContractKind::PancakeProfile,
    ];
}

fn lookup(kind: ContractKind, chain_id: u64) -> Option<Address> {
    const FTM: u64 = FTM_TESTNET.chain_id;
    const BSC: u64 = BSC_MAINNET.chain_id;

    match (kind, chain_id) {
        (ContractKind::Token, FTM) => Some(BERA_TOKEN_FTM_TESTNET),
        (ContractKind::CakeVault, FTM) => Some(CAKE_VAULT_V2_FTM_TESTNET),
        (ContractKind::SleepProfile, FTM) => Some(BERA_SLEEP_PROFILE_FTM_TESTNET),
        (ContractKind::Multicall, FTM) => Some(BERA_MULTICALL_FTM_TESTNET),
        (ContractKind::Multicall, BSC) => Some(MULTICALL3_ADDRESS),
        (ContractKind::MasterChefV3, BSC) => Some(MASTER_CHEF_V3_BSC),
        (ContractKind::PancakeProfile, BSC) => Some(PANCAKE_PROFILE_BSC),
        _ => None,
    }
}

/// Returns the deployment of `kind` on `chain_id`.
///
/// A missing aggregator is reported as [`Error::MulticallProviderMissing`],
/// any other missing deployment as [`Error::UnsupportedChain`].
pub fn contract_address(kind: ContractKind, chain_id: u64) -> Result<Address> {
    lookup(kind, chain_id).ok_or(match kind {
        ContractKind::Multicall => Error::MulticallProviderMissing(chain_id),
        _ => Error::UnsupportedChain(chain_id),
    })
}

/// All known deployments on a chain, in [`ContractKind::ALL`] order.
pub fn deployments(chain_id: u64) -> Vec<(ContractKind, Address)> {
    ContractKind::ALL
        .into_iter()
        .filter_map(|kind| lookup(kind, chain_id).map(|address| (kind, address)))
        .collect()
}
