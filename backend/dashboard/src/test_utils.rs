//! Scripted in-memory wallet used by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::contract::{collectedCall, completedCall, deadlineCall, goalCall};
use crate::errors::{DashboardError, Result};
use crate::rpc::{self, WalletProvider, METHOD_NOT_FOUND};

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Value),
    /// JSON-RPC error object with this code and message.
    Err(i64, &'static str),
    /// Behave like an endpoint nobody listens on.
    Unreachable,
}

impl Reply {
    fn to_result(&self) -> Result<Value> {
        match self {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Err(code, message) => Err(DashboardError::Rpc {
                code: *code,
                message: message.to_string(),
            }),
            Reply::Unreachable => Err(DashboardError::ProviderUnavailable(
                "connection refused".to_string(),
            )),
        }
    }
}

/// Replies are keyed by method name, except `eth_call` which is keyed by the
/// 4-byte selector of the call data. The last reply of a sequence sticks.
#[derive(Default)]
pub struct MockWallet {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    logs: Mutex<Vec<Value>>,
    calls: Mutex<Vec<(String, Value)>>,
}

fn selector_key(selector: [u8; 4]) -> String {
    format!("eth_call:0x{}", hex::encode(selector))
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: &str, reply: Reply) {
        self.reply_sequence(method, vec![reply]);
    }

    pub fn reply_sequence(&self, method: &str, replies: Vec<Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(method.to_string(), replies.into());
    }

    /// Script the return value of a view function.
    pub fn set_view<C: SolCall, V: SolValue>(&self, value: V) {
        let encoded = format!("0x{}", hex::encode(value.abi_encode()));
        self.reply(&selector_key(C::SELECTOR), Reply::Ok(json!(encoded)));
    }

    pub fn fail_view<C: SolCall>(&self, code: i64, message: &'static str) {
        self.reply(&selector_key(C::SELECTOR), Reply::Err(code, message));
    }

    /// Script all four campaign getters at once.
    pub fn set_campaign(&self, goal: u64, collected: u64, completed: bool, deadline: u64) {
        self.set_view::<goalCall, _>(U256::from(goal));
        self.set_view::<collectedCall, _>(U256::from(collected));
        self.set_view::<completedCall, _>(completed);
        self.set_view::<deadlineCall, _>(U256::from(deadline));
    }

    pub fn set_block_number(&self, block: u64) {
        self.reply("eth_blockNumber", Reply::Ok(json!(rpc::quantity(block))));
    }

    /// Record an emitted event; `eth_getLogs` filters these by block range
    /// and first topic.
    pub fn push_log<E: SolEvent>(&self, contract: Address, event: &E, block: u64, index: u64) {
        self.logs.lock().unwrap().push(json!({
            "address": contract,
            "topics": [E::SIGNATURE_HASH],
            "data": Bytes::from(event.encode_data()),
            "blockNumber": rpc::quantity(block),
            "logIndex": rpc::quantity(index),
            "transactionHash": null,
        }));
    }

    /// Methods requested so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Params of the most recent request for `method`.
    pub fn params_of(&self, method: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }

    fn filter_logs(&self, params: &Value) -> Result<Value> {
        let filter = &params[0];
        let from = rpc::parse_quantity(&filter["fromBlock"])?;
        let to = rpc::parse_quantity(&filter["toBlock"])?;
        let topic0 = &filter["topics"][0];
        let logs: Vec<Value> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                let block = rpc::parse_quantity(&log["blockNumber"]).unwrap_or(0);
                (from..=to).contains(&block)
                    && &log["topics"][0] == topic0
                    && log["address"] == filter["address"]
            })
            .cloned()
            .collect();
        Ok(Value::Array(logs))
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        let key = match method {
            "eth_call" => {
                let data = params[0]["data"].as_str().unwrap_or_default();
                format!("eth_call:{}", data.get(..10).unwrap_or(data))
            }
            _ => method.to_string(),
        };

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            replies.get_mut(&key).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match reply {
            Some(reply) => reply.to_result(),
            None if method == "eth_getLogs" => self.filter_logs(&params),
            None => Err(DashboardError::Rpc {
                code: METHOD_NOT_FOUND,
                message: format!("no scripted reply for {key}"),
            }),
        }
    }
}
