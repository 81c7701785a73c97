use serde::{Deserialize, Serialize};
use swap_proto::elements::AssetId;
use swap_proto::SwapRequest;

/// An asset pair this engine trades, identified by its two asset ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Market {
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
}

/// Direction of a trade relative to the market's base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    /// The counterparty buys the base asset (sends quote, receives base).
    Buy,
    /// The counterparty sells the base asset (sends base, receives quote).
    Sell,
}

impl Market {
    pub fn new(base_asset: AssetId, quote_asset: AssetId) -> Self {
        Self {
            base_asset,
            quote_asset,
        }
    }

    pub fn contains(&self, asset: AssetId) -> bool {
        asset == self.base_asset || asset == self.quote_asset
    }

    /// The trade side implied by a request's send/receive assets, or `None`
    /// if the pair does not belong to this market.
    pub fn side_of(&self, request: &SwapRequest) -> Option<TradeSide> {
        if request.asset_to_send == self.quote_asset
            && request.asset_to_receive == self.base_asset
        {
            Some(TradeSide::Buy)
        } else if request.asset_to_send == self.base_asset
            && request.asset_to_receive == self.quote_asset
        {
            Some(TradeSide::Sell)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base_asset, self.quote_asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_proto::SwapId;

    fn asset(byte: u8) -> AssetId {
        AssetId::from_slice(&[byte; 32]).unwrap()
    }

    fn request(send: AssetId, receive: AssetId) -> SwapRequest {
        SwapRequest {
            id: SwapId::from("r"),
            asset_to_send: send,
            amount_to_send: 1,
            asset_to_receive: receive,
            amount_to_receive: 1,
            transaction: String::new(),
            unblinded_inputs: vec![],
            fee_included: None,
        }
    }

    #[test]
    fn side_derivation() {
        let market = Market::new(asset(1), asset(2));
        assert_eq!(
            market.side_of(&request(asset(2), asset(1))),
            Some(TradeSide::Buy)
        );
        assert_eq!(
            market.side_of(&request(asset(1), asset(2))),
            Some(TradeSide::Sell)
        );
        assert_eq!(market.side_of(&request(asset(1), asset(3))), None);
        // Same asset on both sides never matches a market.
        assert_eq!(market.side_of(&request(asset(1), asset(1))), None);
    }
}
