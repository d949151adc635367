//! Count and list partitioning.
//!
//! Both partitions agree on per-shard sizes: with `n` units over `k`
//! shards, shard `j` receives `n / k` units plus one when `j < n % k`.
//! They differ only in *which* items land in a shard: a count split hands
//! out contiguous ranges, a list split deals items round-robin.

use serde::{Deserialize, Serialize};

/// How items are dealt to shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Contiguous ranges, larger shards first.
    Remainder,
    /// Item `i` goes to shard `i mod k`.
    RoundRobin,
}

/// The part of a sequence of `total` items assigned to one shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardSlice {
    pub shard: usize,
    /// Number of items held by all previous shards.
    pub offset: usize,
    /// Indices into the original sequence, ascending.
    pub indices: Vec<usize>,
}

impl ShardSlice {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Pick this shard's items out of `items`.
    pub fn select<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.indices
            .iter()
            .filter_map(|&i| items.get(i).cloned())
            .collect()
    }
}

/// Split `total` items over `shards` shards.
///
/// Always returns exactly `shards` slices (possibly empty); `shards == 0`
/// yields none.
pub fn distribute(total: usize, shards: usize, strategy: Distribution) -> Vec<ShardSlice> {
    if shards == 0 {
        return Vec::new();
    }
    let base = total / shards;
    let remainder = total % shards;
    let mut slices = Vec::with_capacity(shards);
    let mut offset = 0usize;
    for shard in 0..shards {
        let size = base + usize::from(shard < remainder);
        let indices = match strategy {
            Distribution::Remainder => (offset..offset + size).collect(),
            Distribution::RoundRobin => (shard..total).step_by(shards).collect(),
        };
        slices.push(ShardSlice {
            shard,
            offset,
            indices,
        });
        offset += size;
    }
    slices
}

/// `shards` counts summing to `value`, the first `value % shards` one
/// larger. Zero entries are removed unless `include_zero`.
pub fn shard_value(value: u32, shards: usize, include_zero: bool) -> Vec<u32> {
    distribute(value as usize, shards, Distribution::Remainder)
        .iter()
        .map(|slice| slice.len() as u32)
        .filter(|&count| include_zero || count != 0)
        .collect()
}

/// Deal `items` round-robin over `shards` sub-lists. Trailing empty
/// shards are dropped unless `include_empty`.
pub fn shard_list<T: Clone>(items: &[T], shards: usize, include_empty: bool) -> Vec<Vec<T>> {
    distribute(items.len(), shards, Distribution::RoundRobin)
        .iter()
        .filter(|slice| include_empty || !slice.is_empty())
        .map(|slice| slice.select(items))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_value_spreads_remainder_first() {
        assert_eq!(shard_value(10, 2, true), vec![5, 5]);
        assert_eq!(shard_value(10, 3, true), vec![4, 3, 3]);
        assert_eq!(shard_value(5, 10, true), vec![1, 1, 1, 1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(shard_value(5, 10, false), vec![1, 1, 1, 1, 1]);
    }

    #[test]
    fn shard_value_preserves_total() {
        for n in 0..40u32 {
            for k in 1..9usize {
                let shards = shard_value(n, k, true);
                assert_eq!(shards.len(), k);
                assert_eq!(shards.iter().sum::<u32>(), n);
            }
        }
    }

    #[test]
    fn shard_list_deals_round_robin() {
        assert_eq!(shard_list(&[1, 2, 3, 4], 2, false), vec![vec![1, 3], vec![2, 4]]);
        assert_eq!(shard_list(&[1, 2, 3, 4], 3, false), vec![vec![1, 4], vec![2], vec![3]]);
        assert_eq!(shard_list(&[1], 3, true), vec![vec![1], vec![], vec![]]);
        assert_eq!(shard_list(&[1], 3, false), vec![vec![1]]);
    }

    #[test]
    fn both_strategies_agree_on_sizes() {
        for total in 0..25 {
            for shards in 1..7 {
                let remainder = distribute(total, shards, Distribution::Remainder);
                let round_robin = distribute(total, shards, Distribution::RoundRobin);
                let sizes = |s: &[ShardSlice]| s.iter().map(ShardSlice::len).collect::<Vec<_>>();
                assert_eq!(sizes(&remainder), sizes(&round_robin));
                assert_eq!(
                    remainder.iter().map(|s| s.offset).collect::<Vec<_>>(),
                    round_robin.iter().map(|s| s.offset).collect::<Vec<_>>()
                );
            }
        }
    }

    #[test]
    fn offsets_count_previous_items() {
        let slices = distribute(7, 3, Distribution::Remainder);
        assert_eq!(slices[0].indices, vec![0, 1, 2]);
        assert_eq!(slices[1].offset, 3);
        assert_eq!(slices[2].offset, 5);
        assert_eq!(slices[2].indices, vec![5, 6]);
    }

    #[test]
    fn zero_shards_yield_nothing() {
        assert!(distribute(3, 0, Distribution::RoundRobin).is_empty());
        assert!(shard_value(3, 0, true).is_empty());
    }
}
