pub use lwk_wollet::elements;

pub mod codec;
pub mod error;
pub mod failure;
pub mod messages;
pub mod pset;
pub mod validator;

// Core types
pub use codec::{
    AcceptOpts, IdGenerator, ProtocolVersion, RandomIdGenerator, RequestOpts, SwapCodec,
};
pub use error::{Error, Result};
pub use failure::FailureCode;
pub use messages::{
    SwapAccept, SwapComplete, SwapFail, SwapId, SwapMessage, SwapRequest, UnblindedInput,
};
pub use validator::{
    BlindingMaterial, SwapTerms, ValidatedSwapAccept, ValidatedSwapRequest, ValidationError,
    validate_accept, validate_request,
};

// Re-export LWK for app-layer use
pub use lwk_wollet;

// PSET helpers shared between builders and validation
pub use pset::{
    add_explicit_output, add_input, extract_final_tx, parse_pset, serialize_pset,
};
