//! Durable candle cache
//!
//! Resolves a [`CandleRangeId`] to its candle block, backed by one JSON file
//! per range under a fixed cache directory, falling back to the rate-limited
//! gateway on a miss. Gaps in the exchange response become `None` slots.
//! Ranges that reach into the future are returned but never persisted, since
//! their trailing buckets are provisional.

use crate::cancel::CancelToken;
use crate::candle::{Candle, CandleRange, CandleRangeId};
use crate::error::EngineError;
use crate::gateway::{CandleSource, RawCandle};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One slot read back from a cache file: `null` or `[open, close, high, low]`.
/// The index order is fixed for compatibility with pre-existing cache files.
type DiskSlot = Option<(Decimal, Decimal, Decimal, Decimal)>;

/// Written form of a slot. Prices go to disk as plain JSON numbers so the
/// files stay readable by any numeric-array consumer.
#[derive(serde::Serialize)]
struct DiskCandle(
    #[serde(with = "rust_decimal::serde::float")] Decimal,
    #[serde(with = "rust_decimal::serde::float")] Decimal,
    #[serde(with = "rust_decimal::serde::float")] Decimal,
    #[serde(with = "rust_decimal::serde::float")] Decimal,
);

/// Disk-backed candle cache in front of a [`CandleSource`]
pub struct CandleCache {
    dir: PathBuf,
    source: Arc<dyn CandleSource>,
    /// Guards disk reads/writes; multiple runs may share one cache directory
    disk_lock: Mutex<()>,
}

impl CandleCache {
    /// Create a cache over the given directory. The directory is created on
    /// first write if it does not exist.
    pub fn new(dir: impl Into<PathBuf>, source: Arc<dyn CandleSource>) -> Self {
        Self {
            dir: dir.into(),
            source,
            disk_lock: Mutex::new(()),
        }
    }

    /// Cache directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a range id to its candle block.
    ///
    /// A cache hit skips network access entirely. On a miss the range is
    /// fetched through the gateway and persisted only when it lies fully in
    /// the past. A fetch failure is fatal to the caller's run; nothing is
    /// retried here and no partial file is ever written.
    pub async fn fetch_range(
        &self,
        id: &CandleRangeId,
        cancel: &CancelToken,
    ) -> Result<CandleRange, EngineError> {
        let all_past = id.end_time() < chrono::Utc::now();
        let path = self.dir.join(id.encode());

        if let Some(candles) = self.read_cached(&path).await? {
            if candles.len() == id.count() {
                tracing::debug!(file = %path.display(), "Candle cache hit");
                return Ok(CandleRange::new(id.clone(), candles));
            }
            // Slot count mismatch means the file belongs to a different
            // encoding generation; refetch rather than serve bad data.
            tracing::warn!(file = %path.display(), "Cache file has wrong slot count, refetching");
        }

        if cancel.is_cancelled() {
            tracing::debug!("Candle fetch cancelled before network access");
            return Err(EngineError::Cancelled);
        }

        let raw = self
            .source
            .fetch_candles(id.coin(), id.granularity(), id.start(), id.end_time())
            .await
            .map_err(EngineError::Fetch)?;

        let candles = assemble_slots(id, &raw)?;

        if all_past {
            self.write_cached(&path, &candles).await?;
        } else {
            tracing::debug!(
                end = %id.end_time(),
                "Range extends into the future, not caching"
            );
        }

        Ok(CandleRange::new(id.clone(), candles))
    }

    /// Range ids of every valid cache file currently on disk. Foreign files
    /// in the directory are skipped, not errors.
    pub async fn cached_range_ids(&self) -> Vec<CandleRangeId> {
        let _guard = self.disk_lock.lock().await;

        let mut ids = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return ids;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(id) = CandleRangeId::decode(name) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    async fn read_cached(&self, path: &Path) -> Result<Option<Vec<Option<Candle>>>, EngineError> {
        let _guard = self.disk_lock.lock().await;

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(EngineError::fetch(anyhow::Error::new(err).context(format!(
                    "failed to read cache file {}",
                    path.display()
                ))))
            }
        };

        let slots: Vec<DiskSlot> = serde_json::from_str(&content).map_err(|err| {
            EngineError::fetch(anyhow::Error::new(err).context(format!(
                "corrupt cache file {}",
                path.display()
            )))
        })?;

        Ok(Some(
            slots
                .into_iter()
                .map(|slot| slot.map(|(open, close, high, low)| Candle::new(open, close, high, low)))
                .collect(),
        ))
    }

    async fn write_cached(
        &self,
        path: &Path,
        candles: &[Option<Candle>],
    ) -> Result<(), EngineError> {
        let slots: Vec<Option<DiskCandle>> = candles
            .iter()
            .map(|slot| slot.map(|c| DiskCandle(c.open, c.close, c.high, c.low)))
            .collect();
        let content = serde_json::to_string(&slots)
            .map_err(|err| EngineError::fetch(anyhow::Error::new(err)))?;

        let _guard = self.disk_lock.lock().await;

        if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
            return Err(EngineError::fetch(anyhow::Error::new(err).context(
                format!("failed to create cache directory {}", self.dir.display()),
            )));
        }
        tokio::fs::write(path, content).await.map_err(|err| {
            EngineError::fetch(anyhow::Error::new(err).context(format!(
                "failed to write cache file {}",
                path.display()
            )))
        })?;

        tracing::debug!(file = %path.display(), "Persisted candle range");
        Ok(())
    }
}

/// Lay the unordered exchange tuples into an ordered slot array.
///
/// Bucket index is round-half-away-from-zero of (time − start) / granularity;
/// that rounding choice decides which bucket an edge-case candle lands in.
/// Any index outside `0..count` means the exchange returned data outside the
/// requested window and the whole fetch is treated as an integrity failure.
/// Duplicate buckets are permitted; last write wins.
fn assemble_slots(
    id: &CandleRangeId,
    raw: &[RawCandle],
) -> Result<Vec<Option<Candle>>, EngineError> {
    let mut slots: Vec<Option<Candle>> = vec![None; id.count()];
    let start = id.start().timestamp();
    let granularity = id.granularity().seconds();

    for candle in raw {
        let delta = candle.time - start;
        let index = (Decimal::from(delta) / Decimal::from(granularity))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| {
                EngineError::fetch(anyhow::anyhow!("bucket index overflow for time {}", candle.time))
            })?;

        if index < 0 || index >= id.count() as i64 {
            return Err(EngineError::fetch(anyhow::anyhow!(
                "exchange returned candle at {} outside requested window (bucket {}, count {})",
                candle.time,
                index,
                id.count()
            )));
        }

        slots[index as usize] = Some(Candle::new(candle.open, candle.close, candle.high, candle.low));
    }

    Ok(slots)
}
