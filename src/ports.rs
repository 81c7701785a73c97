//! Collaborator ports. The trade service only ever talks to these traits,
//! so pricing, wallet and broadcast backends can be swapped per deployment
//! and stubbed in tests.

use serde::{Deserialize, Serialize};
use swap_proto::elements::{AssetId, Transaction, Txid};
use swap_proto::{SwapTerms, UnblindedInput, ValidatedSwapRequest};

use crate::error::{Error, Result};
use crate::market::{Market, TradeSide};

/// A price snapshot for one proposed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Gross counter-amount owed for the proposed amount.
    pub counter_amount: u64,
    pub counter_asset: AssetId,
    /// Network fee the settlement transaction is expected to pay.
    pub fee_amount: u64,
    pub fee_asset: AssetId,
}

impl Quote {
    /// The validation terms implied by this quote.
    pub fn terms(&self) -> SwapTerms {
        SwapTerms {
            amount_expected: self.counter_amount,
            asset_expected: self.counter_asset,
            fee_amount: self.fee_amount,
            fee_asset: self.fee_asset,
        }
    }
}

/// Supplies quotes and the set of markets this engine serves.
pub trait PriceSource: Send + Sync {
    /// Quote the counter-amount for trading `amount` on `market`.
    fn quote(&self, market: &Market, side: TradeSide, amount: u64) -> Result<Quote>;

    fn tradable_markets(&self) -> Result<Vec<Market>>;
}

/// What the wallet produced when funding our side of a swap.
#[derive(Debug, Clone)]
pub struct WalletSwapOutput {
    /// The request's PSET extended with our inputs and outputs, base64.
    pub transaction: String,
    /// Openings for any confidential inputs we added.
    pub unblinded_inputs: Vec<UnblindedInput>,
}

/// Funds and signs our side of a validated swap request.
pub trait SwapWallet: Send + Sync {
    fn complete_counter_tx(
        &self,
        request: &ValidatedSwapRequest,
        quote: &Quote,
    ) -> Result<WalletSwapOutput>;

    /// Wallet balance per asset. Optional for backends that cannot report it.
    fn balance(&self) -> Result<Vec<(AssetId, u64)>> {
        Err(Error::NotImplemented("wallet balance"))
    }
}

/// Pushes the final transaction to the network.
pub trait TxBroadcaster: Send + Sync {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid>;
}

/// Electrum-backed broadcaster for Liquid.
pub struct ElectrumBroadcaster {
    electrum_url: String,
}

impl ElectrumBroadcaster {
    pub fn new(electrum_url: &str) -> Self {
        Self {
            electrum_url: electrum_url.to_string(),
        }
    }

    pub fn electrum_url(&self) -> &str {
        &self.electrum_url
    }
}

impl TxBroadcaster for ElectrumBroadcaster {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        use lwk_wollet::blocking::BlockchainBackend;

        let url: lwk_wollet::ElectrumUrl = self
            .electrum_url
            .parse()
            .map_err(|e| Error::Broadcast(format!("{e:?}")))?;
        let client =
            lwk_wollet::ElectrumClient::new(&url).map_err(|e| Error::Broadcast(e.to_string()))?;
        client
            .broadcast(tx)
            .map_err(|e| Error::Broadcast(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_terms_carry_fee_context() {
        let asset = AssetId::from_slice(&[7u8; 32]).unwrap();
        let quote = Quote {
            counter_amount: 5_000_000,
            counter_asset: asset,
            fee_amount: 500,
            fee_asset: asset,
        };
        let terms = quote.terms();
        assert_eq!(terms.amount_expected, 5_000_000);
        assert_eq!(terms.asset_expected, asset);
        assert_eq!(terms.fee_amount, 500);
    }

    #[test]
    fn traits_are_object_safe() {
        fn assert_object_safe(
            _: Option<&dyn PriceSource>,
            _: Option<&dyn SwapWallet>,
            _: Option<&dyn TxBroadcaster>,
        ) {
        }
        assert_object_safe(None, None, None);
    }
}
