//! Read-side projections for the presentation layer.

use serde::{Deserialize, Serialize};

use crate::cache::QueryCache;
use crate::error::ClassifiedError;
use crate::traits::LedgerGateway;
use crate::types::{AccessoryId, Address, AssetId, EquipmentView, HoldingKind};

/// Whether the equip modal is showing. Passed explicitly to whatever needs
/// to react to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModalVisibility {
    Open,
    Closed,
}

impl ModalVisibility {
    /// Cards behind an open modal do not react to hover.
    pub fn hover_effects_enabled(self) -> bool {
        self == ModalVisibility::Closed
    }
}

/// Rewrite `ipfs://` URLs through `gateway`. http(s) URLs pass through.
pub fn resolve_media_url(url: &str, gateway: &str) -> String {
    match url.strip_prefix("ipfs://") {
        Some(path) => format!(
            "{}/{}",
            gateway.trim_end_matches('/'),
            path.trim_start_matches("ipfs/")
        ),
        None => url.to_string(),
    }
}

/// Contents of the equip modal for one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipPanel {
    pub asset: AssetId,
    pub equipped: Option<EquipmentView>,
    /// Accessories in free holdings that could be equipped.
    pub choices: Vec<AccessoryId>,
}

impl EquipPanel {
    /// Load the panel through the cache. A closed modal issues no queries.
    pub async fn load<G: LedgerGateway>(
        cache: &QueryCache<G>,
        owner: Address,
        asset: AssetId,
        visibility: ModalVisibility,
        media_gateway: &str,
    ) -> Result<Option<Self>, ClassifiedError> {
        if visibility == ModalVisibility::Closed {
            return Ok(None);
        }
        let mut equipped = cache.equipment(owner, asset, false).await?;
        if let Some(view) = equipped.as_mut() {
            view.thumbnail = resolve_media_url(&view.thumbnail, media_gateway);
        }
        let choices = cache.holdings(owner, HoldingKind::Accessory, false).await?;
        Ok(Some(Self {
            asset,
            equipped,
            choices,
        }))
    }
}
