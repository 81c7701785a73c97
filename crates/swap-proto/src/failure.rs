//! Wire-stable failure codes carried by [`SwapFail`](crate::messages::SwapFail).
//!
//! Each code maps to exactly one fixed human-readable string. The numeric
//! values are part of the protocol and must never be reassigned.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Reason a swap was refused or killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FailureCode {
    InvalidSwapRequest = 0,
    RejectedSwapRequest = 1,
    FailedToComplete = 2,
    InvalidTransaction = 3,
    BadPricingSwapRequest = 4,
    Aborted = 5,
    FailedToBroadcast = 6,
}

impl FailureCode {
    /// The fixed text serialized alongside this code.
    pub fn message(&self) -> &'static str {
        match self {
            FailureCode::InvalidSwapRequest => "invalid swap request",
            FailureCode::RejectedSwapRequest => "swap request rejected",
            FailureCode::FailedToComplete => "failed to complete swap",
            FailureCode::InvalidTransaction => "invalid transaction format",
            FailureCode::BadPricingSwapRequest => "bad pricing for swap request",
            FailureCode::Aborted => "trade aborted",
            FailureCode::FailedToBroadcast => {
                "swap completed but didn't get included in blockchain"
            }
        }
    }
}

impl From<FailureCode> for u8 {
    fn from(code: FailureCode) -> u8 {
        code as u8
    }
}

impl TryFrom<u8> for FailureCode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        match value {
            0 => Ok(FailureCode::InvalidSwapRequest),
            1 => Ok(FailureCode::RejectedSwapRequest),
            2 => Ok(FailureCode::FailedToComplete),
            3 => Ok(FailureCode::InvalidTransaction),
            4 => Ok(FailureCode::BadPricingSwapRequest),
            5 => Ok(FailureCode::Aborted),
            6 => Ok(FailureCode::FailedToBroadcast),
            other => Err(Error::UnknownFailureCode(other)),
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", *self as u8, self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_wire_stable() {
        assert_eq!(u8::from(FailureCode::InvalidSwapRequest), 0);
        assert_eq!(u8::from(FailureCode::RejectedSwapRequest), 1);
        assert_eq!(u8::from(FailureCode::FailedToComplete), 2);
        assert_eq!(u8::from(FailureCode::InvalidTransaction), 3);
        assert_eq!(u8::from(FailureCode::BadPricingSwapRequest), 4);
        assert_eq!(u8::from(FailureCode::Aborted), 5);
        assert_eq!(u8::from(FailureCode::FailedToBroadcast), 6);
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(
            FailureCode::InvalidSwapRequest.message(),
            "invalid swap request"
        );
        assert_eq!(
            FailureCode::FailedToBroadcast.message(),
            "swap completed but didn't get included in blockchain"
        );
    }

    #[test]
    fn round_trip_u8() {
        for v in 0u8..=6 {
            let code = FailureCode::try_from(v).unwrap();
            assert_eq!(u8::from(code), v);
        }
        assert!(FailureCode::try_from(7).is_err());
    }

    #[test]
    fn serde_as_integer() {
        let json = serde_json::to_string(&FailureCode::Aborted).unwrap();
        assert_eq!(json, "5");
        let back: FailureCode = serde_json::from_str("6").unwrap();
        assert_eq!(back, FailureCode::FailedToBroadcast);
        assert!(serde_json::from_str::<FailureCode>("9").is_err());
    }
}
