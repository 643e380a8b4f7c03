use alloy::primitives::{Address, address};

/// Canonical Multicall3 deployment, same address on every chain that has one.
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

pub const CHAIN_ID_ENV: &str = "BERA_CHAIN_ID";
pub const RPC_URL_ENV: &str = "BERA_RPC_URL";
pub const MASTER_CHEF_ENV: &str = "BERA_MASTER_CHEF";

// Fantom testnet deployments
pub const BERA_TOKEN_FTM_TESTNET: Address = address!("0xC938173CccA0f3C917A0dC799B3dbEF89626fE2B");
pub const CAKE_VAULT_V2_FTM_TESTNET: Address =
    address!("0xAE06cF3a2247aea8217e95E2e26b440bfB7C9b99");
pub const BERA_SLEEP_PROFILE_FTM_TESTNET: Address =
    address!("0xAec50Cc30f13Ce836c81314f83486a6A06D75BD2");
pub const BERA_MULTICALL_FTM_TESTNET: Address =
    address!("0xE4019DfBc58f54fa4CE48EE90220FAd328A1A93c");

// BNB Smart Chain deployments
pub const MASTER_CHEF_V3_BSC: Address = address!("0x556B9306565093C855AEA9AE92A594704c2Cd59e");
pub const PANCAKE_PROFILE_BSC: Address = address!("0xDf4dBf6536201370F95e06A0F8a7a70fE40E388a");

pub const SECONDS_PER_YEAR: u64 = 31_536_000;
