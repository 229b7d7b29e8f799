//! Per-symbol trading constraint cache.

use crate::clock::SharedClock;
use crate::error::MetadataError;
use connector_core::{GatewayError, SharedGateway};
use dashmap::DashMap;
use execution_core::SymbolMetadata;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedEntry {
    metadata: SymbolMetadata,
    fetched_at: Instant,
}

/// Memoizes [`SymbolMetadata`] per symbol with a TTL.
///
/// Hits are served under a shared read lock. Misses are single-flight per symbol:
/// concurrent callers for the same symbol queue on one fetch and read its result.
pub struct MetadataCache {
    gateway: SharedGateway,
    clock: SharedClock,
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedEntry>>,
    fetch_locks: DashMap<String, Arc<Mutex<()>>>,
}

pub type SharedMetadataCache = Arc<MetadataCache>;

impl MetadataCache {
    pub fn new(gateway: SharedGateway, clock: SharedClock, ttl: Duration) -> Self {
        Self {
            gateway,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
            fetch_locks: DashMap::new(),
        }
    }

    /// Constraints for a tradable `symbol`.
    ///
    /// Fails with `UnknownSymbol` if the exchange does not list it or it is not trading.
    pub async fn get_metadata(&self, symbol: &str) -> Result<SymbolMetadata, MetadataError> {
        if let Some(metadata) = self.fresh(symbol) {
            return ensure_tradable(metadata);
        }

        let lock = self
            .fetch_locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Whoever held the lock before us may have filled the entry.
        if let Some(metadata) = self.fresh(symbol) {
            return ensure_tradable(metadata);
        }

        tracing::debug!(symbol = %symbol, "Fetching symbol filters");
        let metadata = match self.gateway.get_symbol_filters(symbol).await {
            Ok(metadata) => metadata,
            Err(GatewayError::UnknownSymbol(_)) => {
                tracing::warn!(symbol = %symbol, "Symbol not listed by exchange");
                return Err(MetadataError::UnknownSymbol {
                    symbol: symbol.to_string(),
                    reason: "not listed by the exchange".into(),
                });
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Symbol filter fetch failed");
                return Err(MetadataError::Gateway(e));
            }
        };

        tracing::info!(
            symbol = %symbol,
            step_size = %metadata.step_size,
            tick_size = %metadata.tick_size,
            min_qty = %metadata.min_qty,
            max_qty = %metadata.max_qty,
            min_notional = %metadata.min_notional,
            trading = metadata.trading_enabled,
            "Symbol filters cached"
        );
        self.entries.write().insert(
            symbol.to_string(),
            CachedEntry {
                metadata: metadata.clone(),
                fetched_at: self.clock.now(),
            },
        );

        ensure_tradable(metadata)
    }

    /// Drop one symbol so the next lookup refetches it.
    pub fn invalidate(&self, symbol: &str) {
        self.entries.write().remove(symbol);
    }

    pub fn invalidate_all(&self) {
        self.entries.write().clear();
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh(&self, symbol: &str) -> Option<SymbolMetadata> {
        let entries = self.entries.read();
        let entry = entries.get(symbol)?;
        if self.clock.now().saturating_duration_since(entry.fetched_at) < self.ttl {
            Some(entry.metadata.clone())
        } else {
            None
        }
    }
}

fn ensure_tradable(metadata: SymbolMetadata) -> Result<SymbolMetadata, MetadataError> {
    if metadata.trading_enabled {
        Ok(metadata)
    } else {
        Err(MetadataError::UnknownSymbol {
            symbol: metadata.symbol,
            reason: "not currently trading".into(),
        })
    }
}
