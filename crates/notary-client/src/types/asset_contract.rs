//! Asset contracts: plain assets and baskets.

use serde::{Deserialize, Serialize};

use crate::types::ids::AssetId;

/// A sub-asset entry in a basket, with its own minimum transfer unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAsset {
    pub asset: AssetId,
    pub minimum_transfer: u64,
}

/// Either a plain asset or a basket of sub-assets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetContract {
    Plain {
        id: AssetId,
        name: String,
    },
    Basket {
        id: AssetId,
        name: String,
        sub_assets: Vec<SubAsset>,
        minimum_transfer: u64,
    },
}

impl AssetContract {
    pub fn id(&self) -> &AssetId {
        match self {
            AssetContract::Plain { id, .. } => id,
            AssetContract::Basket { id, .. } => id,
        }
    }

    pub fn is_basket(&self) -> bool {
        matches!(self, AssetContract::Basket { .. })
    }

    /// Number of sub-accounts a basket exchange on this asset must touch.
    /// `0` for a plain asset.
    pub fn sub_account_count(&self) -> usize {
        match self {
            AssetContract::Plain { .. } => 0,
            AssetContract::Basket { sub_assets, .. } => sub_assets.len(),
        }
    }
}
