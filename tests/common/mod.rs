#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    eips::BlockId,
    json_abi::JsonAbi,
    primitives::{Address, Bytes},
};
use bera_multicall::{Aggregator, Error, Result, abi::Multicall3};

/// In-memory aggregator answering calls from canned responses.
///
/// Calls without a response revert. Reverts follow Multicall3: they fail the
/// whole batch unless the call is allowed to fail.
#[derive(Debug, Default)]
pub struct MockAggregator {
    responses: HashMap<(Address, Bytes), Bytes>,
    round_trips: AtomicUsize,
    blocks: Mutex<Vec<Option<BlockId>>>,
}

impl MockAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(
        &mut self,
        abi: &JsonAbi,
        target: Address,
        name: &str,
        params: &[DynSolValue],
        outputs: &[DynSolValue],
    ) {
        let function = &abi.function(name).expect("function in ABI")[0];
        let return_data = function.abi_encode_output(outputs).expect("valid outputs");
        self.respond_raw(abi, target, name, params, return_data.into());
    }

    /// Answers successfully with no return data.
    pub fn respond_empty(
        &mut self,
        abi: &JsonAbi,
        target: Address,
        name: &str,
        params: &[DynSolValue],
    ) {
        self.respond_raw(abi, target, name, params, Bytes::new());
    }

    /// Answers successfully with `return_data` as is.
    pub fn respond_raw(
        &mut self,
        abi: &JsonAbi,
        target: Address,
        name: &str,
        params: &[DynSolValue],
        return_data: Bytes,
    ) {
        let function = &abi.function(name).expect("function in ABI")[0];
        let call_data = function.abi_encode_input(params).expect("valid params");
        self.responses.insert((target, call_data.into()), return_data);
    }

    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    /// Block each round trip was pinned to, in submission order.
    pub fn blocks(&self) -> Vec<Option<BlockId>> {
        self.blocks.lock().unwrap().clone()
    }

    fn record(&self, block: Option<BlockId>) {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        self.blocks.lock().unwrap().push(block);
    }

    fn execute(&self, target: Address, call_data: &Bytes) -> Option<Bytes> {
        self.responses.get(&(target, call_data.clone())).cloned()
    }

    fn revert() -> Error {
        Error::Aggregate("execution reverted: Multicall3: call failed".to_string())
    }
}

impl Aggregator for MockAggregator {
    async fn batch_aggregate3(
        &self,
        calls: Vec<Multicall3::Call3>,
        block: Option<BlockId>,
    ) -> Result<Vec<Multicall3::Result>> {
        self.record(block);
        calls
            .into_iter()
            .map(|call| match self.execute(call.target, &call.callData) {
                Some(return_data) => Ok(Multicall3::Result {
                    success: true,
                    returnData: return_data,
                }),
                None if call.allowFailure => Ok(Multicall3::Result {
                    success: false,
                    returnData: Bytes::new(),
                }),
                None => Err(Self::revert()),
            })
            .collect()
    }

    async fn batch_try_aggregate(
        &self,
        require_success: bool,
        calls: Vec<Multicall3::Call>,
        block: Option<BlockId>,
    ) -> Result<Vec<Multicall3::Result>> {
        self.record(block);
        calls
            .into_iter()
            .map(|call| match self.execute(call.target, &call.callData) {
                Some(return_data) => Ok(Multicall3::Result {
                    success: true,
                    returnData: return_data,
                }),
                None if require_success => Err(Self::revert()),
                None => Ok(Multicall3::Result {
                    success: false,
                    returnData: Bytes::new(),
                }),
            })
            .collect()
    }
}
