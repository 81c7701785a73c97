//! Versioned swap message codec.
//!
//! Two wire schemas coexist: the legacy flat schema ([`ProtocolVersion::V0`])
//! and the current one ([`ProtocolVersion::V1`]) carrying unblinded-input
//! proofs and the explicit fee flag. Which schema applies is decided by the
//! caller's route and passed down as a [`ProtocolVersion`] — decoding never
//! probes the payload to guess its version.

use lwk_wollet::elements::AssetId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::failure::FailureCode;
use crate::messages::{
    SwapAccept, SwapComplete, SwapFail, SwapId, SwapMessage, SwapRequest, UnblindedInput,
};
use crate::validator::ValidatedSwapRequest;

/// Wire schema selector, supplied explicitly by the transport route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Legacy flat schema; blinding keys travel out of band.
    V0,
    /// Current schema with `unblinded_inputs` and `fee_included`.
    V1,
}

impl std::fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVersion::V0 => f.write_str("v0"),
            ProtocolVersion::V1 => f.write_str("v1"),
        }
    }
}

/// Source of fresh message ids. Injectable so tests can be deterministic.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> SwapId;
}

/// Default generator: 16 random bytes, hex encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> SwapId {
        use rand::Rng;
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill(&mut bytes);
        SwapId::new(hex::encode(bytes))
    }
}

/// Options for [`SwapCodec::build_request`].
#[derive(Debug, Clone)]
pub struct RequestOpts {
    /// Caller-supplied id; a fresh one is generated when unset.
    pub id: Option<SwapId>,
    pub asset_to_send: AssetId,
    pub amount_to_send: u64,
    pub asset_to_receive: AssetId,
    pub amount_to_receive: u64,
    /// Base64 PSET funding the send side and paying the receive side.
    pub transaction: String,
    pub unblinded_inputs: Vec<UnblindedInput>,
    pub fee_included: Option<bool>,
}

/// Options for [`SwapCodec::build_accept`].
#[derive(Debug, Clone)]
pub struct AcceptOpts {
    /// The request PSET extended with the acceptor's inputs and outputs.
    pub transaction: String,
    pub unblinded_inputs: Vec<UnblindedInput>,
}

/// Builds and decodes the four protocol messages.
pub struct SwapCodec<G: IdGenerator = RandomIdGenerator> {
    ids: G,
}

impl SwapCodec<RandomIdGenerator> {
    pub fn new() -> Self {
        SwapCodec {
            ids: RandomIdGenerator,
        }
    }
}

impl Default for SwapCodec<RandomIdGenerator> {
    fn default() -> Self {
        SwapCodec::new()
    }
}

impl<G: IdGenerator> SwapCodec<G> {
    pub fn with_id_generator(ids: G) -> Self {
        SwapCodec { ids }
    }

    /// Mint a fresh opaque id from the injected generator.
    pub fn generate_id(&self) -> SwapId {
        self.ids.generate()
    }

    // ── Build ───────────────────────────────────────────────────────────

    /// Serialize a new swap request. Side-effect-free apart from id
    /// generation when `opts.id` is unset.
    pub fn build_request(
        &self,
        opts: RequestOpts,
        version: ProtocolVersion,
    ) -> Result<(SwapRequest, Vec<u8>)> {
        let request = SwapRequest {
            id: opts.id.unwrap_or_else(|| self.ids.generate()),
            asset_to_send: opts.asset_to_send,
            amount_to_send: opts.amount_to_send,
            asset_to_receive: opts.asset_to_receive,
            amount_to_receive: opts.amount_to_receive,
            transaction: opts.transaction,
            unblinded_inputs: opts.unblinded_inputs,
            fee_included: opts.fee_included,
        };
        let bytes = encode_request(&request, version)?;
        Ok((request, bytes))
    }

    /// Serialize the accept answering a request.
    ///
    /// Takes a [`ValidatedSwapRequest`] on purpose: an Accept for a request
    /// that has not passed the validator cannot be expressed.
    pub fn build_accept(
        &self,
        request: &ValidatedSwapRequest,
        opts: AcceptOpts,
        version: ProtocolVersion,
    ) -> Result<(SwapAccept, Vec<u8>)> {
        let accept = SwapAccept {
            id: self.ids.generate(),
            request_id: request.request().id.clone(),
            transaction: opts.transaction,
            unblinded_inputs: opts.unblinded_inputs,
        };
        let bytes = encode_accept(&accept, version)?;
        Ok((accept, bytes))
    }

    /// Serialize the complete finalizing an accept.
    pub fn build_complete(
        &self,
        accept: &SwapAccept,
        final_transaction: String,
        version: ProtocolVersion,
    ) -> Result<(SwapComplete, Vec<u8>)> {
        let complete = SwapComplete {
            id: self.ids.generate(),
            accept_id: accept.id.clone(),
            transaction: final_transaction,
        };
        // Complete shares one schema across versions.
        let _ = version;
        let bytes = encode(&SwapMessage::SwapComplete(complete.clone()))?;
        Ok((complete, bytes))
    }

    /// Serialize a failure for `message_id`. The text is the fixed string
    /// for `code`; only serialization itself can fail, and that is fatal.
    pub fn build_fail(
        &self,
        message_id: SwapId,
        code: FailureCode,
        version: ProtocolVersion,
    ) -> Result<(SwapFail, Vec<u8>)> {
        let fail = SwapFail {
            id: self.ids.generate(),
            message_id,
            failure_code: code,
            failure_message: code.message().to_string(),
        };
        // Fail shares one schema across versions.
        let _ = version;
        let bytes = encode(&SwapMessage::SwapFail(fail.clone()))?;
        Ok((fail, bytes))
    }

    // ── Decode ──────────────────────────────────────────────────────────

    /// Decode any protocol message under the given schema version.
    pub fn decode(&self, bytes: &[u8], version: ProtocolVersion) -> Result<SwapMessage> {
        decode_message(bytes, version)
    }

    pub fn decode_request(&self, bytes: &[u8], version: ProtocolVersion) -> Result<SwapRequest> {
        match decode_message(bytes, version)? {
            SwapMessage::SwapRequest(r) => Ok(r),
            other => Err(unexpected("swap_request", &other)),
        }
    }

    pub fn decode_accept(&self, bytes: &[u8], version: ProtocolVersion) -> Result<SwapAccept> {
        match decode_message(bytes, version)? {
            SwapMessage::SwapAccept(a) => Ok(a),
            other => Err(unexpected("swap_accept", &other)),
        }
    }

    pub fn decode_complete(&self, bytes: &[u8], version: ProtocolVersion) -> Result<SwapComplete> {
        match decode_message(bytes, version)? {
            SwapMessage::SwapComplete(c) => Ok(c),
            other => Err(unexpected("swap_complete", &other)),
        }
    }

    pub fn decode_fail(&self, bytes: &[u8], version: ProtocolVersion) -> Result<SwapFail> {
        match decode_message(bytes, version)? {
            SwapMessage::SwapFail(f) => Ok(f),
            other => Err(unexpected("swap_fail", &other)),
        }
    }
}

fn unexpected(expected: &'static str, found: &SwapMessage) -> Error {
    Error::UnexpectedMessage {
        expected,
        found: found.kind(),
    }
}

// ── Wire schemas ────────────────────────────────────────────────────────

/// Legacy (V0) flat request schema.
#[derive(Serialize, Deserialize)]
struct LegacyRequestWire {
    id: SwapId,
    asset_p: AssetId,
    amount_p: u64,
    asset_r: AssetId,
    amount_r: u64,
    transaction: String,
}

/// Legacy (V0) accept schema.
#[derive(Serialize, Deserialize)]
struct LegacyAcceptWire {
    id: SwapId,
    request_id: SwapId,
    transaction: String,
}

/// Legacy (V0) tagged envelope. Complete and Fail are schema-identical to
/// the current versions.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LegacyMessage {
    SwapRequest(LegacyRequestWire),
    SwapAccept(LegacyAcceptWire),
    SwapComplete(SwapComplete),
    SwapFail(SwapFail),
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| Error::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.to_string()))
}

fn encode_request(request: &SwapRequest, version: ProtocolVersion) -> Result<Vec<u8>> {
    match version {
        ProtocolVersion::V1 => encode(&SwapMessage::SwapRequest(request.clone())),
        ProtocolVersion::V0 => {
            if !request.unblinded_inputs.is_empty() {
                return Err(Error::Encode(
                    "legacy schema cannot carry unblinded inputs".to_string(),
                ));
            }
            encode(&LegacyMessage::SwapRequest(LegacyRequestWire {
                id: request.id.clone(),
                asset_p: request.asset_to_send,
                amount_p: request.amount_to_send,
                asset_r: request.asset_to_receive,
                amount_r: request.amount_to_receive,
                transaction: request.transaction.clone(),
            }))
        }
    }
}

fn encode_accept(accept: &SwapAccept, version: ProtocolVersion) -> Result<Vec<u8>> {
    match version {
        ProtocolVersion::V1 => encode(&SwapMessage::SwapAccept(accept.clone())),
        ProtocolVersion::V0 => {
            if !accept.unblinded_inputs.is_empty() {
                return Err(Error::Encode(
                    "legacy schema cannot carry unblinded inputs".to_string(),
                ));
            }
            encode(&LegacyMessage::SwapAccept(LegacyAcceptWire {
                id: accept.id.clone(),
                request_id: accept.request_id.clone(),
                transaction: accept.transaction.clone(),
            }))
        }
    }
}

fn decode_message(bytes: &[u8], version: ProtocolVersion) -> Result<SwapMessage> {
    match version {
        ProtocolVersion::V1 => decode::<SwapMessage>(bytes),
        ProtocolVersion::V0 => Ok(match decode::<LegacyMessage>(bytes)? {
            LegacyMessage::SwapRequest(w) => SwapMessage::SwapRequest(SwapRequest {
                id: w.id,
                asset_to_send: w.asset_p,
                amount_to_send: w.amount_p,
                asset_to_receive: w.asset_r,
                amount_to_receive: w.amount_r,
                transaction: w.transaction,
                unblinded_inputs: Vec::new(),
                fee_included: None,
            }),
            LegacyMessage::SwapAccept(w) => SwapMessage::SwapAccept(SwapAccept {
                id: w.id,
                request_id: w.request_id,
                transaction: w.transaction,
                unblinded_inputs: Vec::new(),
            }),
            LegacyMessage::SwapComplete(c) => SwapMessage::SwapComplete(c),
            LegacyMessage::SwapFail(f) => SwapMessage::SwapFail(f),
        }),
    }
}
