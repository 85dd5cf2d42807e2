//! Per-frame tile resolution with ancestor fallback.
//!
//! For every visible tile the resolver returns either the exact decoded tile
//! or, while that one is still loading, the nearest cached ancestor to draw
//! in its place. Missing tiles are requested as a side effect.
//!
//! Fallbacks are deduplicated per call: once an ancestor is in the fallback
//! list, every later tile it covers is skipped, so a coarse tile is drawn
//! once no matter how many fine tiles it stands in for. Coverage state lives
//! only for the duration of one [`TileResolver::resolve`] call.

use crate::cache::DecodedTileCache;
use crate::coord::TileId;
use crate::tile::DecodedTile;
use std::sync::Arc;
use tracing::trace;

/// Starts loading a tile that is not yet decoded.
///
/// Implemented by the admission controller; must not block.
pub trait TileRequester: Send + Sync {
    fn request(&self, id: TileId);
}

/// Result of one resolve pass.
#[derive(Debug, Clone, Default)]
pub struct ResolvedTiles {
    /// Visible tiles that are ready to draw.
    pub actual: Vec<Arc<DecodedTile>>,
    /// Coarser stand-ins for visible tiles that are still loading.
    pub fallback: Vec<Arc<DecodedTile>>,
}

impl ResolvedTiles {
    pub fn is_empty(&self) -> bool {
        self.actual.is_empty() && self.fallback.is_empty()
    }

    /// Every tile to draw, fallbacks first so exact tiles paint over them.
    pub fn draw_order(&self) -> impl Iterator<Item = &Arc<DecodedTile>> {
        self.fallback.iter().chain(self.actual.iter())
    }
}

/// Maps visible tile ids to drawable tiles.
pub struct TileResolver {
    cache: Arc<DecodedTileCache>,
    requester: Option<Arc<dyn TileRequester>>,
}

impl TileResolver {
    /// Creates a resolver. Without a requester, misses are never fetched.
    pub fn new(cache: Arc<DecodedTileCache>, requester: Option<Arc<dyn TileRequester>>) -> Self {
        Self { cache, requester }
    }

    /// Resolves `visible` in order.
    ///
    /// With `cache_only` set no fetches are started; use it for frames drawn
    /// while the camera is still moving fast.
    pub fn resolve(&self, visible: &[TileId], cache_only: bool) -> ResolvedTiles {
        let mut resolved = ResolvedTiles::default();

        for &id in visible {
            if let Some(tile) = self.cache.get(&id) {
                resolved.actual.push(tile);
                continue;
            }

            if !Self::is_covered(&id, &resolved.fallback) {
                if let Some(parent) = self.find_available_parent(id) {
                    trace!(tile = %id, fallback = %parent.id, "Using ancestor fallback");
                    resolved.fallback.push(parent);
                }
            }

            if cache_only {
                continue;
            }
            if let Some(requester) = &self.requester {
                requester.request(id);
            }
        }

        resolved
    }

    /// Nearest cached ancestor of `id`, walking from `z - 1` to zoom 0.
    pub fn find_available_parent(&self, id: TileId) -> Option<Arc<DecodedTile>> {
        id.ancestors().find_map(|ancestor| self.cache.get(&ancestor))
    }

    fn is_covered(id: &TileId, fallback: &[Arc<DecodedTile>]) -> bool {
        fallback
            .iter()
            .any(|tile| tile.id.z < id.z && tile.id.covers(id))
    }
}
