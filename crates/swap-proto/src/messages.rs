//! The four swap protocol messages.
//!
//! A swap is negotiated as Request → Accept → Complete, with Fail legal at
//! any point. Messages reference each other by id: an Accept names the
//! Request it answers, a Complete names the Accept, a Fail names whichever
//! message it kills.

use lwk_wollet::elements::AssetId;
use lwk_wollet::elements::confidential::{AssetBlindingFactor, ValueBlindingFactor};
use serde::{Deserialize, Serialize};

use crate::failure::FailureCode;

/// Opaque message/trade token. Callers may supply their own; the codec
/// generates one otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(String);

impl SwapId {
    pub fn new(id: impl Into<String>) -> Self {
        SwapId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SwapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SwapId {
    fn from(s: &str) -> Self {
        SwapId(s.to_string())
    }
}

/// The revealed secrets of one confidential transaction input.
///
/// Lets the counterparty check input values without the blinding factors
/// ever appearing on-chain. Range-proof verification of these claims is the
/// wallet/explorer's job and must happen before the values are trusted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnblindedInput {
    /// Input index within the swap transaction.
    pub index: u32,
    pub asset: AssetId,
    pub amount: u64,
    pub asset_blinder: AssetBlindingFactor,
    pub amount_blinder: ValueBlindingFactor,
}

/// Opening move: what the proposer gives, what they want, and their
/// partially-built transaction funding the give side and paying themselves
/// the receive side.
///
/// Immutable once created; the declared amounts are frozen for the life of
/// the trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub id: SwapId,
    pub asset_to_send: AssetId,
    pub amount_to_send: u64,
    pub asset_to_receive: AssetId,
    pub amount_to_receive: u64,
    /// Base64 PSET with the proposer's inputs and receive output.
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unblinded_inputs: Vec<UnblindedInput>,
    /// Whether `amount_to_receive` already has the network fee deducted.
    /// Absent on the legacy schema, where the validator must reconcile by
    /// trying both interpretations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_included: Option<bool>,
}

/// The counterparty's answer: the same transaction extended with their own
/// inputs and receive output. Only ever built from a validated Request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapAccept {
    pub id: SwapId,
    /// Must equal the originating [`SwapRequest::id`].
    pub request_id: SwapId,
    /// Base64 PSET extended with the acceptor's side.
    pub transaction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unblinded_inputs: Vec<UnblindedInput>,
}

/// Terminal success artifact: the fully signed transaction, ready to
/// extract and broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapComplete {
    pub id: SwapId,
    /// Must equal the [`SwapAccept::id`] being finalized.
    pub accept_id: SwapId,
    /// Base64 PSET, fully signed.
    pub transaction: String,
}

/// Terminal failure artifact. May reference any prior message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapFail {
    pub id: SwapId,
    /// Id of the message that failed validation or processing.
    pub message_id: SwapId,
    pub failure_code: FailureCode,
    /// Fixed text keyed by `failure_code`.
    pub failure_message: String,
}

/// Tagged wire envelope. The message kind is explicit on the wire — the
/// codec never guesses it from the payload shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SwapMessage {
    SwapRequest(SwapRequest),
    SwapAccept(SwapAccept),
    SwapComplete(SwapComplete),
    SwapFail(SwapFail),
}

impl SwapMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            SwapMessage::SwapRequest(_) => "swap_request",
            SwapMessage::SwapAccept(_) => "swap_accept",
            SwapMessage::SwapComplete(_) => "swap_complete",
            SwapMessage::SwapFail(_) => "swap_fail",
        }
    }

    pub fn id(&self) -> &SwapId {
        match self {
            SwapMessage::SwapRequest(m) => &m.id,
            SwapMessage::SwapAccept(m) => &m.id,
            SwapMessage::SwapComplete(m) => &m.id,
            SwapMessage::SwapFail(m) => &m.id,
        }
    }
}
