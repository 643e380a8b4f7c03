//! Function-level ABI encoding over a JSON ABI.

use std::{collections::HashMap, sync::Arc};

use alloy::{
    dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt},
    json_abi::{Function, JsonAbi},
    primitives::Bytes,
};

use crate::error::{Error, Result};

/// Name-indexed view of the functions of a contract ABI.
///
/// Overloaded functions resolve to the first declaration.
#[derive(Debug, Clone)]
pub struct Interface {
    functions: HashMap<String, Function>,
}

impl Interface {
    pub fn new(abi: &JsonAbi) -> Self {
        let mut functions = HashMap::new();
        for function in abi.functions() {
            functions
                .entry(function.name.clone())
                .or_insert_with(|| function.clone());
        }
        Self { functions }
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn function(&self, name: &str) -> Result<&Function> {
        self.functions.get(name).ok_or_else(|| Error::Encode {
            name: name.to_string(),
            reason: "function not found in ABI".to_string(),
        })
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn encode_function_data(&self, name: &str, params: &[DynSolValue]) -> Result<Bytes> {
        let function = self.function(name)?;
        function
            .abi_encode_input(params)
            .map(Bytes::from)
            .map_err(|e| Error::Encode {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn decode_function_result(&self, name: &str, data: &[u8]) -> Result<Vec<DynSolValue>> {
        let function = self.function(name).map_err(|_| Error::Decode {
            name: name.to_string(),
            reason: "function not found in ABI".to_string(),
        })?;
        function
            .abi_decode_output(data, true)
            .map_err(|e| Error::Decode {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Builds each [`Interface`] once per distinct ABI handle.
///
/// Entries are keyed by the address of the shared [`JsonAbi`], so two handles
/// cloned from the same `Arc` hit the same entry while equal-but-separate
/// ABIs get their own. The cache keeps its handles alive, which keeps keys
/// from being reused while it exists.
#[derive(Debug, Default)]
pub struct InterfaceCache {
    entries: HashMap<usize, (Arc<JsonAbi>, Interface)>,
}

impl InterfaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, abi: &Arc<JsonAbi>) -> &Interface {
        let key = Arc::as_ptr(abi) as usize;
        &self
            .entries
            .entry(key)
            .or_insert_with(|| (Arc::clone(abi), Interface::new(abi)))
            .1
    }

    pub fn get(&self, abi: &Arc<JsonAbi>) -> Option<&Interface> {
        self.entries
            .get(&(Arc::as_ptr(abi) as usize))
            .map(|(_, interface)| interface)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
