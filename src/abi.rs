use std::sync::Arc;

use alloy::{json_abi::JsonAbi, sol};

sol! {
    #[sol(rpc)]
    interface Multicall3 {
        #[derive(Debug)]
        struct Call {
            address target;
            bytes callData;
        }

        #[derive(Debug)]
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        #[derive(Debug)]
        struct Result {
            bool success;
            bytes returnData;
        }

        function tryAggregate(bool requireSuccess, Call[] calldata calls) external payable returns (Result[] memory returnData);

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
    }
}

pub const PANCAKE_PROFILE_ABI: &str = include_str!("abi/pancake_profile.json");
pub const MASTER_CHEF_V3_ABI: &str = include_str!("abi/master_chef_v3.json");
pub const PANCAKE_V3_POOL_ABI: &str = include_str!("abi/pancake_v3_pool.json");

/// Parses a JSON ABI into a shareable handle.
///
/// Calls made with clones of the same handle share one encoder per batch.
pub fn load(json: &str) -> crate::Result<Arc<JsonAbi>> {
    Ok(Arc::new(serde_json::from_str(json)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_abis_parse() {
        let profile = load(PANCAKE_PROFILE_ABI).unwrap();
        assert!(profile.function("getTeamProfile").is_some());
        assert!(profile.function("numberTeams").is_some());

        let chef = load(MASTER_CHEF_V3_ABI).unwrap();
        assert_eq!(chef.function("poolInfo").unwrap()[0].outputs.len(), 7);

        let pool = load(PANCAKE_V3_POOL_ABI).unwrap();
        assert!(pool.function("slot0").is_some());
    }

    #[test]
    fn invalid_abi_is_an_error() {
        assert!(load("{not json").is_err());
    }
}
