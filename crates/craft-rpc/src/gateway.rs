//! [`ContractGateway`] over Ethereum JSON-RPC.

use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use craft_core::abi::AbiValue;
use craft_core::config::ClientConfig;
use craft_core::error::{CallError, GatewayError};
use craft_core::traits::ContractGateway;
use craft_core::types::{BlockHeight, Finality, ReadDescriptor, TxId, WriteIntent};
use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::{ArrayParams, BatchRequestBuilder};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::types::ErrorObject;
use serde::Serialize;
use tracing::debug;

use crate::codec::{parse_data, parse_quantity, quantity, CallRequest, ReceiptJson};

/// JSON-RPC gateway. Writes are sent with `eth_sendTransaction`, so the node
/// must manage (and unlock) the sender account.
pub struct RpcGateway {
    client: HttpClient,
    sender: Option<Address>,
    required_confirmations: u64,
}

impl RpcGateway {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, GatewayError> {
        let client = HttpClientBuilder::default()
            .request_timeout(request_timeout)
            .build(endpoint)
            .map_err(map_client_error)?;
        Ok(Self { client, sender: None, required_confirmations: 1 })
    }

    /// Gateway for the configured endpoint, sending from the configured account.
    pub fn from_config(config: &ClientConfig) -> Result<Self, GatewayError> {
        let gateway = Self::new(&config.rpc_endpoint, config.sync.request_timeout())?
            .with_confirmations(config.orchestrator.required_confirmations);
        Ok(match config.account() {
            Ok(account) => gateway.with_sender(account),
            Err(_) => gateway,
        })
    }

    pub fn with_sender(mut self, sender: Address) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_confirmations(mut self, required: u64) -> Self {
        self.required_confirmations = required.max(1);
        self
    }
}

fn unencodable(e: serde_json::Error) -> GatewayError {
    GatewayError::MalformedResponse(format!("unencodable params: {e}"))
}

fn params<T: Serialize>(values: &[T]) -> Result<ArrayParams, GatewayError> {
    let mut params = ArrayParams::new();
    for value in values {
        params.insert(value).map_err(unencodable)?;
    }
    Ok(params)
}

/// Transport failures and node errors, as the client's transient error.
pub fn map_client_error(e: ClientError) -> GatewayError {
    match e {
        ClientError::Call(obj) => {
            GatewayError::Rpc { code: obj.code(), message: obj.message().to_string() }
        }
        ClientError::RequestTimeout => GatewayError::Timeout,
        ClientError::ParseError(e) => GatewayError::MalformedResponse(e.to_string()),
        other => GatewayError::Unavailable(other.to_string()),
    }
}

/// JSON-RPC code nodes use for a call that executed and reverted.
const EXECUTION_REVERTED: i32 = 3;

/// One failed `eth_call` in a batch. A revert belongs to that read; anything
/// else (unknown block, missing state) is the node failing the whole batch.
fn call_failure(obj: &ErrorObject<'_>) -> Result<CallError, GatewayError> {
    if obj.code() == EXECUTION_REVERTED || obj.message().contains("revert") {
        Ok(CallError::Reverted(obj.message().to_string()))
    } else {
        Err(GatewayError::Rpc { code: obj.code(), message: obj.message().to_string() })
    }
}

fn decode_call(read: &ReadDescriptor, data: &str) -> Result<AbiValue, CallError> {
    let bytes = parse_data(data).map_err(|e| CallError::Reverted(e.to_string()))?;
    Ok(read.function.decode_output(&bytes)?)
}

#[async_trait]
impl ContractGateway for RpcGateway {
    async fn block_height(&self) -> Result<BlockHeight, GatewayError> {
        let hex: String = self
            .client
            .request("eth_blockNumber", ArrayParams::new())
            .await
            .map_err(map_client_error)?;
        Ok(BlockHeight(parse_quantity(&hex)?))
    }

    async fn read_batch(
        &self,
        at: BlockHeight,
        reads: &[ReadDescriptor],
    ) -> Result<Vec<Result<AbiValue, CallError>>, GatewayError> {
        let tag = quantity(at.0);
        let mut batch = BatchRequestBuilder::new();
        let mut encoded = Vec::with_capacity(reads.len());
        for read in reads {
            match CallRequest::read(read) {
                Ok(call) => {
                    let mut p = ArrayParams::new();
                    p.insert(call).map_err(unencodable)?;
                    p.insert(&tag).map_err(unencodable)?;
                    batch.insert("eth_call", p).map_err(unencodable)?;
                    encoded.push(Ok(()));
                }
                Err(e) => encoded.push(Err(CallError::Abi(e))),
            }
        }
        if encoded.iter().all(Result::is_err) {
            return Ok(encoded.into_iter().filter_map(Result::err).map(Err).collect());
        }

        debug!(block = %at, calls = reads.len(), "eth_call batch");
        let response = self
            .client
            .batch_request::<String>(batch)
            .await
            .map_err(map_client_error)?;
        let mut responses = response.into_iter();

        let mut results = Vec::with_capacity(reads.len());
        for (read, encoded) in reads.iter().zip(encoded) {
            let result = match encoded {
                Err(e) => Err(e),
                Ok(()) => match responses.next() {
                    Some(Ok(data)) => decode_call(read, &data),
                    Some(Err(obj)) => Err(call_failure(&obj)?),
                    None => {
                        return Err(GatewayError::MalformedResponse("batch response too short".into()));
                    }
                },
            };
            results.push(result);
        }
        Ok(results)
    }

    async fn submit(&self, intent: &WriteIntent) -> Result<TxId, GatewayError> {
        let sender = self
            .sender
            .ok_or_else(|| GatewayError::Unavailable("no sender account configured".into()))?;
        let tx = CallRequest::write(sender, intent)
            .map_err(|e| GatewayError::MalformedResponse(format!("unencodable call: {e}")))?;
        debug!(to = %intent.contract, function = intent.function.name(), "eth_sendTransaction");
        let hash: String = self
            .client
            .request("eth_sendTransaction", params(&[tx])?)
            .await
            .map_err(map_client_error)?;
        hash.parse::<TxId>()
            .map_err(|e| GatewayError::MalformedResponse(format!("bad transaction hash {hash}: {e}")))
    }

    async fn finality(&self, id: &TxId) -> Result<Finality, GatewayError> {
        let receipt: Option<ReceiptJson> = self
            .client
            .request("eth_getTransactionReceipt", params(&[id])?)
            .await
            .map_err(map_client_error)?;
        let Some(receipt) = receipt else {
            return Ok(Finality::Pending);
        };
        let head = if self.required_confirmations > 1 {
            self.block_height().await?
        } else {
            BlockHeight(u64::MAX)
        };
        receipt.finality(head, self.required_confirmations)
    }
}
