//! Batched contract reads through a Multicall3 aggregator.
//!
//! Call descriptors name a target, a function and its positional
//! parameters. They are ABI-encoded, submitted to the aggregator in a single
//! `eth_call`, and each returned payload is decoded with the same function
//! that encoded it. Results line up with the input calls; a call that failed
//! or returned no data yields `None`.

use std::{future::Future, sync::Arc};

use alloy::{
    dyn_abi::DynSolValue,
    eips::BlockId,
    json_abi::JsonAbi,
    network::Network,
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder},
    transports::Transport,
};
use tracing::{debug, error};
use url::Url;

use crate::{
    abi::Multicall3::{self, Multicall3Instance},
    addresses::{ContractKind, contract_address},
    chains::chain_config,
    error::{Error, Result},
    interface::{Interface, InterfaceCache},
};

/// Decoded outputs of one call, or `None` if it failed or returned nothing.
pub type CallResult = Option<Vec<DynSolValue>>;

/// A call against any contract, carrying its own ABI.
#[derive(Debug, Clone)]
pub struct Call {
    pub abi: Arc<JsonAbi>,
    pub address: Address,
    pub name: String,
    pub params: Vec<DynSolValue>,
    /// Overrides [`MulticallV3Options::allow_failure`] for this call.
    pub allow_failure: Option<bool>,
}

impl Call {
    pub fn new(abi: &Arc<JsonAbi>, address: Address, name: impl Into<String>) -> Self {
        Self {
            abi: Arc::clone(abi),
            address,
            name: name.into(),
            params: Vec::new(),
            allow_failure: None,
        }
    }

    pub fn with_params(mut self, params: Vec<DynSolValue>) -> Self {
        self.params = params;
        self
    }

    pub fn allow_failure(mut self, allow: bool) -> Self {
        self.allow_failure = Some(allow);
        self
    }
}

/// A call against a contract whose ABI is supplied for the whole batch.
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub address: Address,
    pub name: String,
    pub params: Vec<DynSolValue>,
}

impl ContractCall {
    pub fn new(address: Address, name: impl Into<String>) -> Self {
        Self {
            address,
            name: name.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<DynSolValue>) -> Self {
        self.params = params;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MulticallV3Options {
    /// Lets any call fail without reverting the batch.
    pub allow_failure: bool,
    pub block: Option<BlockId>,
}

#[derive(Debug, Clone, Copy)]
pub struct MulticallV2Options {
    /// Reverts the whole batch if any call fails.
    pub require_success: bool,
    pub block: Option<BlockId>,
}

impl Default for MulticallV2Options {
    fn default() -> Self {
        Self {
            require_success: true,
            block: None,
        }
    }
}

/// The on-chain batch entry points the helpers submit to.
pub trait Aggregator {
    fn batch_aggregate3(
        &self,
        calls: Vec<Multicall3::Call3>,
        block: Option<BlockId>,
    ) -> impl Future<Output = Result<Vec<Multicall3::Result>>>;

    fn batch_try_aggregate(
        &self,
        require_success: bool,
        calls: Vec<Multicall3::Call>,
        block: Option<BlockId>,
    ) -> impl Future<Output = Result<Vec<Multicall3::Result>>>;
}

impl<A: Aggregator> Aggregator for &A {
    fn batch_aggregate3(
        &self,
        calls: Vec<Multicall3::Call3>,
        block: Option<BlockId>,
    ) -> impl Future<Output = Result<Vec<Multicall3::Result>>> {
        (**self).batch_aggregate3(calls, block)
    }

    fn batch_try_aggregate(
        &self,
        require_success: bool,
        calls: Vec<Multicall3::Call>,
        block: Option<BlockId>,
    ) -> impl Future<Output = Result<Vec<Multicall3::Result>>> {
        (**self).batch_try_aggregate(require_success, calls, block)
    }
}

impl<T, P, N> Aggregator for Multicall3Instance<T, P, N>
where
    T: Transport + Clone,
    P: Provider<T, N>,
    N: Network,
{
    async fn batch_aggregate3(
        &self,
        calls: Vec<Multicall3::Call3>,
        block: Option<BlockId>,
    ) -> Result<Vec<Multicall3::Result>> {
        let mut request = self.aggregate3(calls);
        if let Some(block) = block {
            request = request.block(block);
        }
        Ok(request.call().await?.returnData)
    }

    async fn batch_try_aggregate(
        &self,
        require_success: bool,
        calls: Vec<Multicall3::Call>,
        block: Option<BlockId>,
    ) -> Result<Vec<Multicall3::Result>> {
        let mut request = self.tryAggregate(require_success, calls);
        if let Some(block) = block {
            request = request.block(block);
        }
        Ok(request.call().await?.returnData)
    }
}

/// Binds the aggregator deployed on `chain_id` to an HTTP provider for `rpc_url`.
pub fn multicall_contract(chain_id: u64, rpc_url: Url) -> Result<impl Aggregator> {
    let address = contract_address(ContractKind::Multicall, chain_id)?;
    let provider = ProviderBuilder::new().on_http(rpc_url);
    Ok(Multicall3::new(address, provider))
}

/// Binds the aggregator of a configured chain, through `rpc_url` if given or
/// the chain's own endpoint otherwise.
pub fn get_multicall_contract_with_rpc(
    chain_id: u64,
    rpc_url: Option<Url>,
) -> Result<impl Aggregator> {
    let chain = chain_config(chain_id).map_err(|_| Error::MulticallProviderMissing(chain_id))?;
    multicall_contract(chain_id, chain.with_rpc(rpc_url)?)
}

/// Same as [`multicall_contract`], using the chain's configured RPC endpoint.
pub fn get_multicall_contract(chain_id: u64) -> Result<impl Aggregator> {
    get_multicall_contract_with_rpc(chain_id, None)
}

fn encode_call(
    interface: &Interface,
    address: Address,
    name: &str,
    params: &[DynSolValue],
) -> Result<Bytes> {
    if !interface.has_function(name) {
        error!(%address, function = name, "{name} missing on {address}");
        return Err(Error::MissingFunction {
            name: name.to_string(),
            address,
        });
    }
    interface.encode_function_data(name, params)
}

fn decode_result(
    interface: &Interface,
    name: &str,
    result: &Multicall3::Result,
) -> Result<CallResult> {
    if !result.success || result.returnData.is_empty() {
        return Ok(None);
    }
    interface
        .decode_function_result(name, &result.returnData)
        .map(Some)
}

fn check_len(expected: usize, results: &[Multicall3::Result]) -> Result<()> {
    if results.len() != expected {
        return Err(Error::Aggregate(format!(
            "expected {expected} results, aggregator returned {}",
            results.len()
        )));
    }
    Ok(())
}

/// Batches calls against any mix of contracts through `aggregate3`.
///
/// Each call's ABI is turned into an [`Interface`] once per batch, however
/// many calls share it. A call that is not allowed to fail and does fail
/// reverts the whole batch, which surfaces as [`Error::Aggregate`].
pub async fn multicall_v3<A: Aggregator>(
    aggregator: &A,
    calls: &[Call],
    options: MulticallV3Options,
) -> Result<Vec<CallResult>> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let mut cache = InterfaceCache::new();
    let mut batch = Vec::with_capacity(calls.len());
    for call in calls {
        let interface = cache.get_or_build(&call.abi);
        batch.push(Multicall3::Call3 {
            target: call.address,
            allowFailure: call.allow_failure.unwrap_or(options.allow_failure),
            callData: encode_call(interface, call.address, &call.name, &call.params)?,
        });
    }

    debug!(calls = batch.len(), abis = cache.len(), "submitting aggregate3");
    let results = aggregator.batch_aggregate3(batch, options.block).await?;
    check_len(calls.len(), &results)?;

    let mut decoded = Vec::with_capacity(results.len());
    for (call, result) in calls.iter().zip(&results) {
        let interface = cache.get_or_build(&call.abi);
        decoded.push(decode_result(interface, &call.name, result)?);
    }
    Ok(decoded)
}

/// Batches calls against contracts sharing one ABI through `tryAggregate`.
pub async fn multicall_v2<A: Aggregator>(
    aggregator: &A,
    abi: &JsonAbi,
    calls: &[ContractCall],
    options: MulticallV2Options,
) -> Result<Vec<CallResult>> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }

    let interface = Interface::new(abi);
    let batch = calls
        .iter()
        .map(|call| {
            Ok(Multicall3::Call {
                target: call.address,
                callData: encode_call(&interface, call.address, &call.name, &call.params)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        calls = batch.len(),
        require_success = options.require_success,
        "submitting tryAggregate"
    );
    let results = aggregator
        .batch_try_aggregate(options.require_success, batch, options.block)
        .await?;
    check_len(calls.len(), &results)?;

    calls
        .iter()
        .zip(&results)
        .map(|(call, result)| decode_result(&interface, &call.name, result))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_requires_success_by_default() {
        assert!(MulticallV2Options::default().require_success);
        assert!(!MulticallV3Options::default().allow_failure);
    }

    #[test]
    fn unknown_chain_has_no_multicall_provider() {
        assert!(matches!(
            get_multicall_contract(97),
            Err(Error::MulticallProviderMissing(97))
        ));
        assert!(matches!(
            get_multicall_contract(12345),
            Err(Error::MulticallProviderMissing(12345))
        ));
    }

    #[test]
    fn known_chain_builds_contract() {
        assert!(get_multicall_contract(4002).is_ok());
        assert!(get_multicall_contract(56).is_ok());
    }

    #[test]
    fn rpc_override_still_needs_a_configured_aggregator() {
        let local = Url::parse("http://127.0.0.1:8545").unwrap();
        assert!(get_multicall_contract_with_rpc(56, Some(local.clone())).is_ok());
        assert!(matches!(
            get_multicall_contract_with_rpc(97, Some(local)),
            Err(Error::MulticallProviderMissing(97))
        ));
    }
}
