//! Time alignment of two tick series onto shared UTC-minute buckets.
//!
//! Only buckets observed in *both* series are emitted (an intersection, not a
//! union), in ascending chronological order, so the output is reproducible
//! regardless of upstream ordering.

use crate::domain::{PriceSeries, Tick};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A timestamp truncated to its UTC minute, as minutes since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MinuteBucket(i64);

impl MinuteBucket {
    pub fn of(timestamp: &DateTime<Utc>) -> Self {
        Self(timestamp.timestamp().div_euclid(60))
    }

    pub fn minutes_since_epoch(&self) -> i64 {
        self.0
    }
}

/// Prices at the minute buckets two series have in common.
///
/// `x[i]` and `y[i]` always come from the same bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedPair {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Latest tick per minute bucket.
///
/// A tick replaces the bucket's occupant only if its timestamp is strictly
/// later, so on equal timestamps the first one seen wins.
fn latest_per_bucket(series: &PriceSeries) -> BTreeMap<MinuteBucket, &Tick> {
    let mut buckets: BTreeMap<MinuteBucket, &Tick> = BTreeMap::new();
    for tick in series.ticks() {
        buckets
            .entry(MinuteBucket::of(&tick.timestamp))
            .and_modify(|current| {
                if tick.timestamp > current.timestamp {
                    *current = tick;
                }
            })
            .or_insert(tick);
    }
    buckets
}

/// Align two series on the minute buckets present in both.
pub fn align(a: &PriceSeries, b: &PriceSeries) -> AlignedPair {
    let buckets_a = latest_per_bucket(a);
    let buckets_b = latest_per_bucket(b);

    // BTreeMap iteration is already chronological
    let mut pair = AlignedPair::default();
    for (bucket, tick_a) in &buckets_a {
        if let Some(tick_b) = buckets_b.get(bucket) {
            pair.x.push(tick_a.price);
            pair.y.push(tick_b.price);
        }
    }
    pair
}
