//! A fetched block of candles

use super::{Candle, CandleRangeId};

/// A contiguous block of candle slots addressed by a [`CandleRangeId`].
///
/// Slots holding `None` are buckets in which no trade occurred. They are a
/// first-class value, not an error; callers skip them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleRange {
    id: CandleRangeId,
    candles: Vec<Option<Candle>>,
}

impl CandleRange {
    /// Build a range. The slot vector must match the id's count exactly.
    pub fn new(id: CandleRangeId, candles: Vec<Option<Candle>>) -> Self {
        debug_assert_eq!(id.count(), candles.len());
        Self { id, candles }
    }

    pub fn id(&self) -> &CandleRangeId {
        &self.id
    }

    /// Ordered slots, one per bucket, `None` where no trade occurred
    pub fn candles(&self) -> &[Option<Candle>] {
        &self.candles
    }

    /// Number of slots actually holding a candle
    pub fn present_count(&self) -> usize {
        self.candles.iter().filter(|slot| slot.is_some()).count()
    }
}
