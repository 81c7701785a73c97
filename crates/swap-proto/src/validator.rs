//! Swap validator: ties the amounts declared in a Request/Accept to the
//! actual contents of the PSET it carries.
//!
//! Confidential inputs are opened either with a blinding-key map (legacy
//! format) or by trusting the declared [`UnblindedInput`] list (current
//! format). For the declared path the underlying range proofs must have
//! been verified upstream by the wallet/explorer collaborator before the
//! values reach this module.

use std::collections::HashMap;

use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::secp256k1_zkp::{self, SecretKey};
use lwk_wollet::elements::{AssetId, Script, TxOut};
use thiserror::Error;

use crate::failure::FailureCode;
use crate::messages::{SwapAccept, SwapId, SwapRequest, UnblindedInput};
use crate::pset::{confidential_output_txout, explicit_output, parse_pset};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("declared swap amount is zero")]
    ZeroAmount,

    #[error("malformed swap transaction: {0}")]
    MalformedTransaction(String),

    #[error("cumulative input value {have} of asset {asset} is below the declared {need}")]
    InsufficientInputValue {
        asset: AssetId,
        have: u64,
        need: u64,
    },

    #[error("no output paying {amount} of asset {asset} was found")]
    MissingMatchingOutput { asset: AssetId, amount: u64 },

    #[error("declared receive of {declared} does not reconcile with the quoted {expected}")]
    PriceMismatch { declared: u64, expected: u64 },

    #[error("declared receive asset {declared} does not match the quoted {expected}")]
    AssetMismatch {
        declared: AssetId,
        expected: AssetId,
    },

    #[error("accept references request {got}, expected {want}")]
    RequestIdMismatch { want: SwapId, got: SwapId },

    #[error("accept no longer carries the request's receive output")]
    AmountsChanged,
}

impl ValidationError {
    /// The wire failure code this validation outcome maps to.
    pub fn failure_code(&self) -> FailureCode {
        match self {
            ValidationError::ZeroAmount => FailureCode::InvalidSwapRequest,
            ValidationError::MalformedTransaction(_) => FailureCode::InvalidTransaction,
            ValidationError::InsufficientInputValue { .. } => FailureCode::InvalidTransaction,
            ValidationError::MissingMatchingOutput { .. } => FailureCode::InvalidTransaction,
            ValidationError::PriceMismatch { .. } => FailureCode::BadPricingSwapRequest,
            ValidationError::AssetMismatch { .. } => FailureCode::BadPricingSwapRequest,
            ValidationError::RequestIdMismatch { .. } => FailureCode::InvalidSwapRequest,
            ValidationError::AmountsChanged => FailureCode::InvalidSwapRequest,
        }
    }
}

/// What the validator expects the counterparty to be owed, plus the network
/// fee context needed for reconciliation. Comes from the pricing collaborator
/// for a Request, and from the original Request for an Accept.
#[derive(Debug, Clone)]
pub struct SwapTerms {
    /// Gross counter-amount quoted for the proposed side.
    pub amount_expected: u64,
    pub asset_expected: AssetId,
    pub fee_amount: u64,
    pub fee_asset: AssetId,
}

/// How confidential transaction parts are opened.
pub enum BlindingMaterial<'a> {
    /// Legacy format: blinding keys indexed by output script.
    Keys(&'a HashMap<Script, SecretKey>),
    /// Current format: values declared per input index, proofs verified
    /// upstream.
    Declared(&'a [UnblindedInput]),
}

/// A request that has passed validation. The only way to obtain one is
/// through [`validate_request`]; building an Accept requires it.
#[derive(Debug, Clone)]
pub struct ValidatedSwapRequest {
    request: SwapRequest,
}

impl ValidatedSwapRequest {
    pub fn request(&self) -> &SwapRequest {
        &self.request
    }

    pub fn into_inner(self) -> SwapRequest {
        self.request
    }
}

/// An accept that has passed validation against its originating request.
#[derive(Debug, Clone)]
pub struct ValidatedSwapAccept {
    accept: SwapAccept,
}

impl ValidatedSwapAccept {
    pub fn accept(&self) -> &SwapAccept {
        &self.accept
    }

    pub fn into_inner(self) -> SwapAccept {
        self.accept
    }
}

/// Validate a swap request against the quoted terms.
///
/// Checks, in order: non-zero amounts, declared receive against the quote,
/// cumulative eligible input value against the declared send amount, and the
/// existence of an output paying the declared receive.
pub fn validate_request(
    request: &SwapRequest,
    terms: &SwapTerms,
    blinding: &BlindingMaterial<'_>,
) -> Result<ValidatedSwapRequest, ValidationError> {
    if request.amount_to_send == 0 || request.amount_to_receive == 0 {
        return Err(ValidationError::ZeroAmount);
    }

    if request.asset_to_receive != terms.asset_expected {
        return Err(ValidationError::AssetMismatch {
            declared: request.asset_to_receive,
            expected: terms.asset_expected,
        });
    }

    check_price(
        request.amount_to_receive,
        terms,
        request.asset_to_receive,
        request.fee_included,
    )?;

    let pset = parse_pset(&request.transaction)
        .map_err(|e| ValidationError::MalformedTransaction(e.to_string()))?;

    check_cumulative_inputs(
        &pset,
        request.asset_to_send,
        request.amount_to_send,
        blinding,
    )?;

    check_output_exists(
        &pset,
        request.asset_to_receive,
        request.amount_to_receive,
        terms,
        request.fee_included,
        blinding,
    )?;

    Ok(ValidatedSwapRequest {
        request: request.clone(),
    })
}

/// Validate an accept against the request it answers.
///
/// The accept's transaction is the request's PSET extended with the
/// acceptor's side: its eligible inputs must cover what the proposer is
/// owed, it must pay the acceptor the proposed amount, and the proposer's
/// own receive output must survive unchanged.
pub fn validate_accept(
    accept: &SwapAccept,
    request: &SwapRequest,
    terms: &SwapTerms,
    blinding: &BlindingMaterial<'_>,
) -> Result<ValidatedSwapAccept, ValidationError> {
    if accept.request_id != request.id {
        return Err(ValidationError::RequestIdMismatch {
            want: request.id.clone(),
            got: accept.request_id.clone(),
        });
    }

    let pset = parse_pset(&accept.transaction)
        .map_err(|e| ValidationError::MalformedTransaction(e.to_string()))?;

    // The acceptor funds what the proposer receives.
    check_cumulative_inputs(
        &pset,
        request.asset_to_receive,
        request.amount_to_receive,
        blinding,
    )?;

    // The acceptor pays itself what the proposer sends.
    check_output_exists(
        &pset,
        request.asset_to_send,
        request.amount_to_send,
        terms,
        request.fee_included,
        blinding,
    )?;

    // The proposer's receive output must not have been tampered with.
    if !output_exists(
        &pset,
        request.asset_to_receive,
        &receive_candidates(request.amount_to_receive, terms, request.asset_to_receive, request.fee_included),
        blinding,
    ) {
        return Err(ValidationError::AmountsChanged);
    }

    Ok(ValidatedSwapAccept {
        accept: accept.clone(),
    })
}

// ── Internals ───────────────────────────────────────────────────────────

/// Declared receive amount vs quoted gross amount.
fn check_price(
    declared: u64,
    terms: &SwapTerms,
    receive_asset: AssetId,
    fee_included: Option<bool>,
) -> Result<(), ValidationError> {
    let fee_applies = terms.fee_asset == receive_asset && terms.fee_amount > 0;
    let gross = terms.amount_expected;
    let ok = match (fee_included, fee_applies) {
        (_, false) | (Some(false), true) => declared == gross,
        (Some(true), true) => declared == gross.saturating_sub(terms.fee_amount),
        (None, true) => {
            // Legacy schema: the wire does not say whether the fee was
            // already netted into the declared amount. Try both.
            log::warn!(
                "fee-inclusion flag absent, reconciling declared {declared} both ways against {gross}"
            );
            declared == gross
                || declared == gross.saturating_add(terms.fee_amount)
                || declared == gross.saturating_sub(terms.fee_amount)
        }
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::PriceMismatch {
            declared,
            expected: gross,
        })
    }
}

/// The output values that would satisfy a declared receive amount.
fn receive_candidates(
    declared: u64,
    terms: &SwapTerms,
    receive_asset: AssetId,
    fee_included: Option<bool>,
) -> Vec<u64> {
    let fee_applies = terms.fee_asset == receive_asset && terms.fee_amount > 0;
    match (fee_included, fee_applies) {
        (_, false) | (Some(_), true) => vec![declared],
        (None, true) => vec![
            declared,
            declared.saturating_add(terms.fee_amount),
            declared.saturating_sub(terms.fee_amount),
        ],
    }
}

/// Sum the eligible input values and compare against the declared amount.
fn check_cumulative_inputs(
    pset: &PartiallySignedTransaction,
    asset: AssetId,
    need: u64,
    blinding: &BlindingMaterial<'_>,
) -> Result<(), ValidationError> {
    let mut total: u64 = 0;
    for (index, input) in pset.inputs().iter().enumerate() {
        let Some((input_asset, value)) = input_value(index, input.witness_utxo.as_ref(), blinding)
        else {
            log::debug!("input {index}: prevout unknown or unopenable, not counted");
            continue;
        };
        if input_asset == asset {
            total = total.saturating_add(value);
        }
    }
    if total >= need {
        Ok(())
    } else {
        Err(ValidationError::InsufficientInputValue {
            asset,
            have: total,
            need,
        })
    }
}

/// Resolve one input to an (asset, value) pair, unblinding if needed.
fn input_value(
    index: usize,
    witness_utxo: Option<&TxOut>,
    blinding: &BlindingMaterial<'_>,
) -> Option<(AssetId, u64)> {
    let txout = witness_utxo?;
    if let (Some(asset), Some(value)) = (txout.asset.explicit(), txout.value.explicit()) {
        return Some((asset, value));
    }
    match blinding {
        BlindingMaterial::Declared(inputs) => inputs
            .iter()
            .find(|u| u.index as usize == index)
            .map(|u| (u.asset, u.amount)),
        BlindingMaterial::Keys(keys) => unblind_with_keys(txout, keys),
    }
}

/// Check that some output pays one of `candidates` of `asset`.
fn check_output_exists(
    pset: &PartiallySignedTransaction,
    asset: AssetId,
    declared: u64,
    terms: &SwapTerms,
    fee_included: Option<bool>,
    blinding: &BlindingMaterial<'_>,
) -> Result<(), ValidationError> {
    let candidates = receive_candidates(declared, terms, asset, fee_included);
    if output_exists(pset, asset, &candidates, blinding) {
        Ok(())
    } else {
        Err(ValidationError::MissingMatchingOutput {
            asset,
            amount: declared,
        })
    }
}

fn output_exists(
    pset: &PartiallySignedTransaction,
    asset: AssetId,
    candidates: &[u64],
    blinding: &BlindingMaterial<'_>,
) -> bool {
    pset.outputs().iter().any(|out| {
        let resolved = match explicit_output(out) {
            Some(pair) => Some(pair),
            None => match blinding {
                BlindingMaterial::Keys(keys) => confidential_output_txout(out)
                    .as_ref()
                    .and_then(|txout| unblind_with_keys(txout, keys)),
                // The declared list proves inputs only; a blinded output we
                // hold no key for cannot satisfy the match.
                BlindingMaterial::Declared(_) => None,
            },
        };
        matches!(resolved, Some((a, v)) if a == asset && candidates.contains(&v))
    })
}

fn unblind_with_keys(
    txout: &TxOut,
    keys: &HashMap<Script, SecretKey>,
) -> Option<(AssetId, u64)> {
    let key = keys.get(&txout.script_pubkey)?;
    let secp = secp256k1_zkp::Secp256k1::new();
    match txout.unblind(&secp, *key) {
        Ok(secrets) => Some((secrets.asset, secrets.value)),
        Err(e) => {
            log::debug!("unblind failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::SwapId;
    use crate::pset::{add_explicit_output, add_input, explicit_txout};
    use lwk_wollet::elements::confidential::{
        Asset as ConfAsset, AssetBlindingFactor, Nonce, Value as ConfValue, ValueBlindingFactor,
    };
    use lwk_wollet::elements::hashes::Hash;
    use lwk_wollet::elements::{OutPoint, Txid, TxOutWitness};

    const USDT: u8 = 0x01;
    const LBTC: u8 = 0x02;

    fn asset(byte: u8) -> AssetId {
        AssetId::from_slice(&[byte; 32]).unwrap()
    }

    fn outpoint(vout: u32) -> OutPoint {
        OutPoint::new(Txid::all_zeros(), vout)
    }

    /// Alice's side: explicit USDT inputs and an explicit LBTC receive output.
    fn alice_pset(input_amounts: &[u64], receive: u64) -> String {
        let mut pset = PartiallySignedTransaction::new_v2();
        let spk = Script::new();
        for (i, amount) in input_amounts.iter().enumerate() {
            add_input(
                &mut pset,
                outpoint(i as u32),
                explicit_txout(asset(USDT), *amount, &spk),
            );
        }
        add_explicit_output(&mut pset, asset(LBTC), receive, &spk);
        pset.to_string()
    }

    fn sample_request(input_amounts: &[u64], receive: u64) -> SwapRequest {
        SwapRequest {
            id: SwapId::from("req-1"),
            asset_to_send: asset(USDT),
            amount_to_send: 30_000_000_000,
            asset_to_receive: asset(LBTC),
            amount_to_receive: receive,
            transaction: alice_pset(input_amounts, receive),
            unblinded_inputs: vec![],
            fee_included: Some(false),
        }
    }

    fn terms(expected: u64) -> SwapTerms {
        SwapTerms {
            amount_expected: expected,
            asset_expected: asset(LBTC),
            fee_amount: 0,
            fee_asset: asset(LBTC),
        }
    }

    fn no_keys() -> HashMap<Script, SecretKey> {
        HashMap::new()
    }

    #[test]
    fn valid_request_passes() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        let keys = no_keys();
        let validated =
            validate_request(&request, &terms(5_000_000), &BlindingMaterial::Keys(&keys)).unwrap();
        assert_eq!(validated.request().id, request.id);
    }

    #[test]
    fn inputs_may_be_split_across_utxos() {
        let request = sample_request(&[10_000_000_000, 20_000_000_000], 5_000_000);
        let keys = no_keys();
        assert!(
            validate_request(&request, &terms(5_000_000), &BlindingMaterial::Keys(&keys)).is_ok()
        );
    }

    #[test]
    fn zero_amount_rejected_before_transaction_inspection() {
        let mut request = sample_request(&[1], 5_000_000);
        request.amount_to_send = 0;
        request.transaction = "garbage, never parsed".to_string();
        let keys = no_keys();
        let err =
            validate_request(&request, &terms(5_000_000), &BlindingMaterial::Keys(&keys))
                .unwrap_err();
        assert!(matches!(err, ValidationError::ZeroAmount));
        assert_eq!(err.failure_code(), FailureCode::InvalidSwapRequest);
    }

    #[test]
    fn insufficient_inputs_rejected() {
        let request = sample_request(&[29_999_999_999], 5_000_000);
        let keys = no_keys();
        let err =
            validate_request(&request, &terms(5_000_000), &BlindingMaterial::Keys(&keys))
                .unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientInputValue { .. }));
        assert_eq!(err.failure_code(), FailureCode::InvalidTransaction);
    }

    #[test]
    fn missing_receive_output_rejected() {
        let mut request = sample_request(&[30_000_000_000], 5_000_000);
        // Transaction pays a different amount than declared.
        request.transaction = alice_pset(&[30_000_000_000], 4_999_999);
        let keys = no_keys();
        let err =
            validate_request(&request, &terms(5_000_000), &BlindingMaterial::Keys(&keys))
                .unwrap_err();
        assert!(matches!(err, ValidationError::MissingMatchingOutput { .. }));
    }

    #[test]
    fn price_mismatch_rejected() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        let keys = no_keys();
        let err =
            validate_request(&request, &terms(4_000_000), &BlindingMaterial::Keys(&keys))
                .unwrap_err();
        assert!(matches!(err, ValidationError::PriceMismatch { .. }));
        assert_eq!(err.failure_code(), FailureCode::BadPricingSwapRequest);
    }

    #[test]
    fn malformed_transaction_rejected() {
        let mut request = sample_request(&[30_000_000_000], 5_000_000);
        request.transaction = "definitely not a pset".to_string();
        let keys = no_keys();
        let err =
            validate_request(&request, &terms(5_000_000), &BlindingMaterial::Keys(&keys))
                .unwrap_err();
        assert_eq!(err.failure_code(), FailureCode::InvalidTransaction);
    }

    #[test]
    fn explicit_fee_flag_uses_single_interpretation() {
        // Quote is gross 5_000_000 with a 500 fee netted into the declared
        // amount.
        let mut request = sample_request(&[30_000_000_000], 4_999_500);
        request.fee_included = Some(true);
        let t = SwapTerms {
            amount_expected: 5_000_000,
            asset_expected: asset(LBTC),
            fee_amount: 500,
            fee_asset: asset(LBTC),
        };
        let keys = no_keys();
        assert!(validate_request(&request, &t, &BlindingMaterial::Keys(&keys)).is_ok());

        // The other interpretation must NOT be accepted under an explicit flag.
        let mut gross_request = sample_request(&[30_000_000_000], 5_000_000);
        gross_request.fee_included = Some(true);
        assert!(matches!(
            validate_request(&gross_request, &t, &BlindingMaterial::Keys(&keys)),
            Err(ValidationError::PriceMismatch { .. })
        ));
    }

    #[test]
    fn legacy_fee_reconciliation_tries_both_directions() {
        let t = SwapTerms {
            amount_expected: 5_000_000,
            asset_expected: asset(LBTC),
            fee_amount: 500,
            fee_asset: asset(LBTC),
        };
        let keys = no_keys();
        for declared in [5_000_000u64, 5_000_500, 4_999_500] {
            let mut request = sample_request(&[30_000_000_000], declared);
            request.fee_included = None;
            assert!(
                validate_request(&request, &t, &BlindingMaterial::Keys(&keys)).is_ok(),
                "declared {declared} should reconcile"
            );
        }
        let mut request = sample_request(&[30_000_000_000], 5_001_000);
        request.fee_included = None;
        assert!(validate_request(&request, &t, &BlindingMaterial::Keys(&keys)).is_err());
    }

    #[test]
    fn legacy_reconciliation_survives_extreme_quotes() {
        // A quote near u64::MAX must not overflow the fee-added branch.
        let t = SwapTerms {
            amount_expected: u64::MAX - 100,
            asset_expected: asset(LBTC),
            fee_amount: 500,
            fee_asset: asset(LBTC),
        };
        assert!(matches!(
            check_price(1, &t, asset(LBTC), None),
            Err(ValidationError::PriceMismatch { .. })
        ));
        let candidates = receive_candidates(u64::MAX - 100, &t, asset(LBTC), None);
        assert!(candidates.contains(&u64::MAX));
    }

    #[test]
    fn declared_confidential_inputs_are_trusted() {
        // Build a pset whose single input is confidential; the declared
        // list carries its opening.
        let secp = secp256k1_zkp::Secp256k1::new();
        let abf = AssetBlindingFactor::from_slice(&[3u8; 32]).unwrap();
        let vbf = ValueBlindingFactor::from_slice(&[4u8; 32]).unwrap();
        let conf_asset = ConfAsset::new_confidential(&secp, asset(USDT), abf);
        let generator = conf_asset.commitment().unwrap();
        let conf_value =
            ConfValue::new_confidential(&secp, 30_000_000_000, generator, vbf);

        let mut pset = PartiallySignedTransaction::new_v2();
        let spk = Script::new();
        add_input(
            &mut pset,
            outpoint(0),
            TxOut {
                asset: conf_asset,
                value: conf_value,
                nonce: Nonce::Null,
                script_pubkey: spk.clone(),
                witness: TxOutWitness::default(),
            },
        );
        add_explicit_output(&mut pset, asset(LBTC), 5_000_000, &spk);

        let request = SwapRequest {
            id: SwapId::from("req-conf"),
            asset_to_send: asset(USDT),
            amount_to_send: 30_000_000_000,
            asset_to_receive: asset(LBTC),
            amount_to_receive: 5_000_000,
            transaction: pset.to_string(),
            unblinded_inputs: vec![UnblindedInput {
                index: 0,
                asset: asset(USDT),
                amount: 30_000_000_000,
                asset_blinder: abf,
                amount_blinder: vbf,
            }],
            fee_included: Some(false),
        };

        let declared = request.unblinded_inputs.clone();
        assert!(validate_request(
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Declared(&declared),
        )
        .is_ok());

        // Without the declared opening the input cannot be counted.
        let err = validate_request(
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Declared(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientInputValue { .. }));
    }

    // ── Accept ──────────────────────────────────────────────────────────

    /// Bob's extension: request tx plus LBTC inputs and a USDT receive output.
    fn bob_pset(request: &SwapRequest, lbtc_inputs: &[u64], usdt_out: u64) -> String {
        let mut pset: PartiallySignedTransaction = request.transaction.parse().unwrap();
        let spk = Script::new();
        let base = pset.inputs().len() as u32;
        for (i, amount) in lbtc_inputs.iter().enumerate() {
            add_input(
                &mut pset,
                outpoint(base + i as u32 + 100),
                explicit_txout(asset(LBTC), *amount, &spk),
            );
        }
        add_explicit_output(&mut pset, asset(USDT), usdt_out, &spk);
        pset.to_string()
    }

    fn accept_for(request: &SwapRequest, transaction: String) -> SwapAccept {
        SwapAccept {
            id: SwapId::from("acc-1"),
            request_id: request.id.clone(),
            transaction,
            unblinded_inputs: vec![],
        }
    }

    #[test]
    fn valid_accept_passes() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        let tx = bob_pset(&request, &[5_000_000], 30_000_000_000);
        let accept = accept_for(&request, tx);
        let keys = no_keys();
        assert!(validate_accept(
            &accept,
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Keys(&keys),
        )
        .is_ok());
    }

    #[test]
    fn accept_with_wrong_request_id_rejected_regardless_of_amounts() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        let tx = bob_pset(&request, &[5_000_000], 30_000_000_000);
        let mut accept = accept_for(&request, tx);
        accept.request_id = SwapId::from("someone-else");
        let keys = no_keys();
        let err = validate_accept(
            &accept,
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Keys(&keys),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::RequestIdMismatch { .. }));
    }

    #[test]
    fn accept_with_underfunded_inputs_rejected() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        let tx = bob_pset(&request, &[4_999_999], 30_000_000_000);
        let accept = accept_for(&request, tx);
        let keys = no_keys();
        let err = validate_accept(
            &accept,
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Keys(&keys),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientInputValue { .. }));
    }

    #[test]
    fn accept_missing_counterparty_output_rejected() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        let tx = bob_pset(&request, &[5_000_000], 29_999_999_999);
        let accept = accept_for(&request, tx);
        let keys = no_keys();
        let err = validate_accept(
            &accept,
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Keys(&keys),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::MissingMatchingOutput { .. }));
    }

    #[test]
    fn accept_that_dropped_the_request_output_rejected() {
        let request = sample_request(&[30_000_000_000], 5_000_000);
        // Build Bob's side from scratch, leaving out Alice's LBTC output.
        let mut pset = PartiallySignedTransaction::new_v2();
        let spk = Script::new();
        add_input(
            &mut pset,
            outpoint(0),
            explicit_txout(asset(USDT), 30_000_000_000, &spk),
        );
        add_input(
            &mut pset,
            outpoint(1),
            explicit_txout(asset(LBTC), 5_000_000, &spk),
        );
        add_explicit_output(&mut pset, asset(USDT), 30_000_000_000, &spk);
        let accept = accept_for(&request, pset.to_string());
        let keys = no_keys();
        let err = validate_accept(
            &accept,
            &request,
            &terms(5_000_000),
            &BlindingMaterial::Keys(&keys),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::AmountsChanged));
    }
}
