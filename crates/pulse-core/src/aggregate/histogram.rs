//! Online latency histogram with bounded memory.
//!
//! Accumulates non-negative integer samples (durations in milliseconds or
//! nanoseconds, the histogram does not care) and answers nearest-rank
//! percentile queries. Low-volume windows keep the exact multiset of samples;
//! once a window crosses [`EXACT_STORAGE_LIMIT`] the histogram converts to a
//! log-linear bucketed form whose memory no longer grows with sample count.
//! The conversion is one-way: a bucketed histogram never reverts to exact
//! storage, and merging a bucketed snapshot into an exact histogram buckets
//! the receiver as well.
//!
//! The bucket scheme maps values below 256 one-to-one (zero rounding error)
//! and splits every power-of-two octave above that into 128 linear
//! sub-buckets, bounding the relative error of any percentile by 1/128.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// Number of samples kept exactly before converting to bucketed storage.
pub const EXACT_STORAGE_LIMIT: usize = 1024;

/// Values below this map one-to-one onto their own bucket.
const LINEAR_CUTOFF: u64 = 256;

/// Linear sub-buckets per power-of-two octave above the cutoff.
const SUBBUCKETS_PER_OCTAVE: usize = 128;

const SUBBUCKET_BITS: u32 = 7;

/// log2 of [`LINEAR_CUTOFF`]; the first octave subject to sub-bucketing.
const FIRST_OCTAVE: u32 = 8;

/// Total addressable buckets: the linear region plus 56 octaves of 128.
const MAX_BUCKETS: usize = LINEAR_CUTOFF as usize + (64 - FIRST_OCTAVE as usize) * SUBBUCKETS_PER_OCTAVE;

const ENCODING_VERSION: u8 = 1;
const KIND_EXACT: u8 = 0;
const KIND_BUCKETED: u8 = 1;

/// Errors produced when decoding or merging an encoded histogram.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistogramError {
    /// Input ended before the declared content was read.
    #[error("encoded histogram is truncated")]
    Truncated,

    /// The leading version byte is not one this build understands.
    #[error("unsupported histogram encoding version {0}")]
    UnsupportedVersion(u8),

    /// The kind discriminator is neither the exact-list nor the bucketed form.
    #[error("unknown histogram encoding kind {0}")]
    InvalidKind(u8),

    /// A bucket entry names an index outside the addressable bucket range.
    #[error("bucket index {0} out of range")]
    BucketIndexOutOfRange(u32),

    /// The declared total does not match the sum of the bucket counts.
    #[error("declared total {declared} does not match summed bucket counts {summed}")]
    CountMismatch {
        /// Total sample count declared in the header.
        declared: u64,
        /// Sum of the decoded bucket counts.
        summed: u64,
    },

    /// Bytes remained after the declared content was fully read.
    #[error("{0} trailing bytes after encoded histogram")]
    TrailingBytes(usize),
}

/// Maps a sample value to its bucket index.
fn bucket_index(value: u64) -> usize {
    if value < LINEAR_CUTOFF {
        return value as usize;
    }
    let exponent = 63 - value.leading_zeros();
    let sub = ((value - (1u64 << exponent)) >> (exponent - SUBBUCKET_BITS)) as usize;
    LINEAR_CUTOFF as usize + (exponent - FIRST_OCTAVE) as usize * SUBBUCKETS_PER_OCTAVE + sub
}

/// Largest value that falls into the bucket at `index`.
///
/// Percentile queries report this ceiling, which preserves the nearest-rank
/// guarantee that at least the requested fraction of samples is `<=` the
/// returned value.
fn bucket_ceiling(index: usize) -> u64 {
    if index < LINEAR_CUTOFF as usize {
        return index as u64;
    }
    let offset = index - LINEAR_CUTOFF as usize;
    let exponent = FIRST_OCTAVE + (offset / SUBBUCKETS_PER_OCTAVE) as u32;
    let sub = (offset % SUBBUCKETS_PER_OCTAVE) as u64;
    let width = 1u64 << (exponent - SUBBUCKET_BITS);
    (1u64 << exponent) + sub * width + (width - 1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repr {
    /// The raw multiset of samples, kept while small.
    Exact(Vec<u64>),
    /// Log-linear bucket counts; `counts` is dense up to the highest bucket
    /// touched and `total` is the overall sample count.
    Bucketed { total: u64, counts: Vec<u64> },
}

/// Online histogram of non-negative integer samples.
///
/// A plain value type: no interior synchronization, cheap to clone, safe to
/// merge on private copies. Callers sharing a mutable instance across threads
/// must synchronize externally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    repr: Repr,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self { repr: Repr::Exact(Vec::new()) }
    }

    /// Total number of samples recorded, including merged ones.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        match &self.repr {
            Repr::Exact(values) => values.len() as u64,
            Repr::Bucketed { total, .. } => *total,
        }
    }

    /// Returns `true` if no samples have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Records one sample. Amortized O(1).
    pub fn add(&mut self, value: u64) {
        match &mut self.repr {
            Repr::Exact(values) => values.push(value),
            Repr::Bucketed { total, counts } => {
                bump(counts, bucket_index(value), 1);
                *total += 1;
            }
        }
        if matches!(&self.repr, Repr::Exact(values) if values.len() > EXACT_STORAGE_LIMIT) {
            self.convert_to_bucketed();
        }
    }

    /// Nearest-rank percentile: the smallest recorded (or bucket-rounded)
    /// value `v` such that at least `percentile`% of samples are `<= v`.
    /// Ties resolve to the smaller value.
    ///
    /// Returns `None` when the histogram is empty or `percentile` lies
    /// outside `[0, 100]`.
    #[must_use]
    pub fn percentile(&self, percentile: f64) -> Option<u64> {
        let total = self.total_count();
        if total == 0 || !(0.0..=100.0).contains(&percentile) {
            return None;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target = (((percentile / 100.0) * total as f64).ceil() as u64).clamp(1, total);
        match &self.repr {
            Repr::Exact(values) => {
                let mut sorted = values.clone();
                sorted.sort_unstable();
                #[allow(clippy::cast_possible_truncation)]
                let rank = (target - 1) as usize;
                Some(sorted[rank])
            }
            Repr::Bucketed { counts, .. } => {
                let mut cumulative = 0u64;
                for (index, &count) in counts.iter().enumerate() {
                    cumulative += count;
                    if cumulative >= target {
                        return Some(bucket_ceiling(index));
                    }
                }
                None
            }
        }
    }

    /// Merges another histogram into this one.
    ///
    /// Commutative and associative with respect to percentile results up to
    /// the bucketed representation's rounding. Merging a bucketed histogram
    /// into an exact one converts the receiver first (the lossy transition is
    /// monotonic).
    pub fn merge(&mut self, other: &Histogram) {
        match &other.repr {
            Repr::Exact(values) => {
                for &value in values {
                    self.add(value);
                }
            }
            Repr::Bucketed { total: other_total, counts: other_counts } => {
                self.convert_to_bucketed();
                if let Repr::Bucketed { total, counts } = &mut self.repr {
                    *total += other_total;
                    for (index, &count) in other_counts.iter().enumerate() {
                        if count > 0 {
                            bump(counts, index, count);
                        }
                    }
                }
            }
        }
    }

    /// Decodes `bytes` and merges the result into this histogram.
    ///
    /// # Errors
    ///
    /// Returns a [`HistogramError`] if `bytes` is not a well-formed encoded
    /// histogram; the receiver is left unchanged in that case.
    pub fn merge_encoded(&mut self, bytes: &[u8]) -> Result<(), HistogramError> {
        let other = Self::decode(bytes)?;
        self.merge(&other);
        Ok(())
    }

    /// Encodes the histogram into its compact, byte-stable binary form.
    ///
    /// Layout: a version byte, a kind discriminator (`0` = exact list,
    /// `1` = bucketed sparse array), then big-endian fixed-width fields.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.put_u8(ENCODING_VERSION);
        match &self.repr {
            Repr::Exact(values) => {
                buf.put_u8(KIND_EXACT);
                #[allow(clippy::cast_possible_truncation)]
                buf.put_u32(values.len() as u32);
                for &value in values {
                    buf.put_u64(value);
                }
            }
            Repr::Bucketed { total, counts } => {
                buf.put_u8(KIND_BUCKETED);
                buf.put_u64(*total);
                #[allow(clippy::cast_possible_truncation)]
                let nonzero = counts.iter().filter(|&&count| count > 0).count() as u32;
                buf.put_u32(nonzero);
                for (index, &count) in counts.iter().enumerate() {
                    if count > 0 {
                        #[allow(clippy::cast_possible_truncation)]
                        buf.put_u32(index as u32);
                        buf.put_u64(count);
                    }
                }
            }
        }
        buf
    }

    /// Decodes an encoded histogram.
    ///
    /// # Errors
    ///
    /// Rejects truncated input, unknown versions and kinds, out-of-range
    /// bucket indices, count/total mismatches, and trailing bytes.
    pub fn decode(mut buf: &[u8]) -> Result<Self, HistogramError> {
        if buf.remaining() < 2 {
            return Err(HistogramError::Truncated);
        }
        let version = buf.get_u8();
        if version != ENCODING_VERSION {
            return Err(HistogramError::UnsupportedVersion(version));
        }
        match buf.get_u8() {
            KIND_EXACT => {
                if buf.remaining() < 4 {
                    return Err(HistogramError::Truncated);
                }
                let len = buf.get_u32() as usize;
                if (buf.remaining() as u64) < len as u64 * 8 {
                    return Err(HistogramError::Truncated);
                }
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(buf.get_u64());
                }
                if buf.has_remaining() {
                    return Err(HistogramError::TrailingBytes(buf.remaining()));
                }
                let mut histogram = Self { repr: Repr::Exact(values) };
                // Another process may encode with a larger exact window.
                if histogram.total_count() as usize > EXACT_STORAGE_LIMIT {
                    histogram.convert_to_bucketed();
                }
                Ok(histogram)
            }
            KIND_BUCKETED => {
                if buf.remaining() < 12 {
                    return Err(HistogramError::Truncated);
                }
                let total = buf.get_u64();
                let entries = buf.get_u32() as usize;
                if (buf.remaining() as u64) < entries as u64 * 12 {
                    return Err(HistogramError::Truncated);
                }
                let mut counts = Vec::new();
                let mut summed = 0u64;
                for _ in 0..entries {
                    let index = buf.get_u32();
                    let count = buf.get_u64();
                    if index as usize >= MAX_BUCKETS {
                        return Err(HistogramError::BucketIndexOutOfRange(index));
                    }
                    bump(&mut counts, index as usize, count);
                    summed = summed.saturating_add(count);
                }
                if buf.has_remaining() {
                    return Err(HistogramError::TrailingBytes(buf.remaining()));
                }
                if summed != total {
                    return Err(HistogramError::CountMismatch { declared: total, summed });
                }
                Ok(Self { repr: Repr::Bucketed { total, counts } })
            }
            kind => Err(HistogramError::InvalidKind(kind)),
        }
    }

    /// Rebuckets all exact samples. No-op when already bucketed.
    fn convert_to_bucketed(&mut self) {
        let Repr::Exact(values) = &mut self.repr else {
            return;
        };
        let values = std::mem::take(values);
        let mut counts = Vec::new();
        for &value in &values {
            bump(&mut counts, bucket_index(value), 1);
        }
        self.repr = Repr::Bucketed { total: values.len() as u64, counts };
    }

    #[cfg(test)]
    fn is_bucketed(&self) -> bool {
        matches!(self.repr, Repr::Bucketed { .. })
    }
}

fn bump(counts: &mut Vec<u64>, index: usize, count: u64) {
    if counts.len() <= index {
        counts.resize(index + 1, 0);
    }
    counts[index] += count;
}
