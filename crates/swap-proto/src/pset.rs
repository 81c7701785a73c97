//! Helpers over the PSET (partially signed Elements transaction) carried in
//! the `transaction` field of swap messages.

use lwk_wollet::elements::confidential::{Asset, Nonce, Value as ConfValue};
use lwk_wollet::elements::pset::{self, PartiallySignedTransaction};
use lwk_wollet::elements::secp256k1_zkp;
use lwk_wollet::elements::{AssetId, OutPoint, Script, Sequence, Transaction, TxOut, TxOutWitness};

use crate::error::{Error, Result};

/// Parse the base64 PSET string carried on the wire.
pub fn parse_pset(transaction: &str) -> Result<PartiallySignedTransaction> {
    transaction
        .parse::<PartiallySignedTransaction>()
        .map_err(|e| Error::Pset(format!("invalid PSET: {e}")))
}

/// Serialize a PSET to its base64 wire form.
pub fn serialize_pset(pset: &PartiallySignedTransaction) -> String {
    pset.to_string()
}

/// The previous output being spent by input `index`, if the PSET carries it.
pub fn input_witness_utxo(pset: &PartiallySignedTransaction, index: usize) -> Option<&TxOut> {
    pset.inputs().get(index).and_then(|i| i.witness_utxo.as_ref())
}

/// The explicit (asset, value) of a PSET output, if it is unblinded.
pub fn explicit_output(out: &pset::Output) -> Option<(AssetId, u64)> {
    match (out.asset, out.amount) {
        (Some(asset), Some(amount)) => Some((asset, amount)),
        _ => None,
    }
}

/// Reassemble a confidential `TxOut` from a blinded PSET output so it can be
/// unblinded with a blinding key. Returns `None` when the output lacks the
/// commitments or the rangeproof needed for a rewind.
pub fn confidential_output_txout(out: &pset::Output) -> Option<TxOut> {
    let asset_comm = out.asset_comm?;
    let amount_comm = out.amount_comm?;
    let ecdh = out.ecdh_pubkey?;
    let nonce_pk = secp256k1_zkp::PublicKey::from_slice(&ecdh.inner.serialize()).ok()?;
    out.value_rangeproof.as_ref()?;
    Some(TxOut {
        asset: Asset::Confidential(asset_comm),
        value: ConfValue::Confidential(amount_comm),
        nonce: Nonce::Confidential(nonce_pk),
        script_pubkey: out.script_pubkey.clone(),
        witness: TxOutWitness {
            surjection_proof: out.asset_surjection_proof.clone(),
            rangeproof: out.value_rangeproof.clone(),
        },
    })
}

/// Extract the final transaction from a fully signed PSET.
///
/// Used on the Complete leg; the PSET must already carry final script
/// sigs/witnesses for all inputs.
pub fn extract_final_tx(pset: &PartiallySignedTransaction) -> Result<Transaction> {
    pset.extract_tx()
        .map_err(|e| Error::Pset(format!("cannot extract final transaction: {e}")))
}

/// Build an explicit (non-confidential) TxOut.
pub fn explicit_txout(asset: AssetId, amount: u64, script_pubkey: &Script) -> TxOut {
    TxOut {
        asset: Asset::Explicit(asset),
        value: ConfValue::Explicit(amount),
        nonce: Nonce::Null,
        script_pubkey: script_pubkey.clone(),
        witness: TxOutWitness::default(),
    }
}

/// Add an input spending `outpoint`, carrying its previous output.
pub fn add_input(pset: &mut PartiallySignedTransaction, outpoint: OutPoint, prevout: TxOut) {
    let input = pset::Input {
        previous_txid: outpoint.txid,
        previous_output_index: outpoint.vout,
        witness_utxo: Some(prevout),
        sequence: Some(Sequence::ENABLE_LOCKTIME_NO_RBF),
        ..Default::default()
    };
    pset.add_input(input);
}

/// Add an explicit output.
pub fn add_explicit_output(
    pset: &mut PartiallySignedTransaction,
    asset: AssetId,
    amount: u64,
    script_pubkey: &Script,
) {
    let output = pset::Output {
        amount: Some(amount),
        asset: Some(asset),
        script_pubkey: script_pubkey.clone(),
        ..Default::default()
    };
    pset.add_output(output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwk_wollet::elements::Txid;
    use lwk_wollet::elements::hashes::Hash;

    fn asset(byte: u8) -> AssetId {
        AssetId::from_slice(&[byte; 32]).unwrap()
    }

    fn dummy_outpoint(vout: u32) -> OutPoint {
        OutPoint::new(Txid::all_zeros(), vout)
    }

    #[test]
    fn pset_string_round_trip() {
        let mut pset = PartiallySignedTransaction::new_v2();
        let spk = Script::new();
        add_input(&mut pset, dummy_outpoint(0), explicit_txout(asset(1), 1000, &spk));
        add_explicit_output(&mut pset, asset(2), 900, &spk);

        let encoded = serialize_pset(&pset);
        let decoded = parse_pset(&encoded).unwrap();
        assert_eq!(decoded.inputs().len(), 1);
        assert_eq!(decoded.outputs().len(), 1);
        assert_eq!(explicit_output(&decoded.outputs()[0]), Some((asset(2), 900)));
    }

    #[test]
    fn malformed_pset_is_a_decode_error() {
        assert!(matches!(parse_pset("not a pset"), Err(Error::Pset(_))));
    }

    #[test]
    fn witness_utxo_access() {
        let mut pset = PartiallySignedTransaction::new_v2();
        let spk = Script::new();
        add_input(&mut pset, dummy_outpoint(1), explicit_txout(asset(3), 42, &spk));

        let utxo = input_witness_utxo(&pset, 0).unwrap();
        assert_eq!(utxo.value.explicit(), Some(42));
        assert!(input_witness_utxo(&pset, 1).is_none());
    }

    #[test]
    fn blinded_output_without_commitments_has_no_txout() {
        let out = pset::Output {
            script_pubkey: Script::new(),
            ..Default::default()
        };
        assert!(confidential_output_txout(&out).is_none());
    }
}
