mod strategies;

use rayon::prelude::*;
use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SortStrategy {
    Sequential,
    TaskParallel,
    Hybrid,
    HybridTaskloop,
}

pub const ALL_STRATEGIES: [SortStrategy; 4] = [
    SortStrategy::Sequential,
    SortStrategy::TaskParallel,
    SortStrategy::Hybrid,
    SortStrategy::HybridTaskloop,
];

pub fn all_strategies() -> &'static [SortStrategy] {
    &ALL_STRATEGIES
}

pub fn strategy_name(strategy: SortStrategy) -> &'static str {
    match strategy {
        SortStrategy::Sequential => "sequential",
        SortStrategy::TaskParallel => "task_parallel",
        SortStrategy::Hybrid => "hybrid",
        SortStrategy::HybridTaskloop => "hybrid_taskloop",
    }
}

/// How block indices of a data-parallel partition are handed to workers.
/// Both variants produce the same partition; they differ only in
/// scheduling overhead.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PartitionDispatch {
    /// Work-stealing parallel loop over the block range.
    ParallelFor,
    /// One spawned task per block (grain = 1), scheduler balances the load.
    TaskPerBlock,
}

/// Size regime of a sub-array, derived from the cutoffs in [`Tunables`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Regime {
    Sequential,
    TaskParallel,
    DataParallel,
}

/// Cutoffs and the partition block size. These are cache-hierarchy tuning
/// constants, not algorithm invariants, so they travel as configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tunables {
    /// At or below this length, ranges are insertion sorted.
    pub insertion_sort_cutoff: usize,
    /// Below this length, recursion stops spawning tasks.
    pub sequential_cutoff: usize,
    /// At or above this length, partitioning goes data parallel.
    pub datapar_cutoff: usize,
    /// Elements per block in the data-parallel partitioner.
    pub partition_block_size: usize,
}

pub const TUNABLES: Tunables = Tunables {
    insertion_sort_cutoff: 20,
    sequential_cutoff: 8192,
    datapar_cutoff: 32768,
    partition_block_size: 512,
};

/// Upper bound on [`Tunables::partition_block_size`]; blocks are staged in a
/// stack buffer of this many elements before being flushed to the scratch
/// buffer.
pub const MAX_PARTITION_BLOCK: usize = 2048;

impl Default for Tunables {
    fn default() -> Self {
        TUNABLES
    }
}

impl Tunables {
    pub fn validate(&self) -> Result<(), SortError> {
        let ordered = self.insertion_sort_cutoff < self.sequential_cutoff
            && self.sequential_cutoff < self.datapar_cutoff;
        let block_in_range =
            self.partition_block_size != 0 && self.partition_block_size <= MAX_PARTITION_BLOCK;
        if !ordered || self.insertion_sort_cutoff == 0 || !block_in_range {
            return Err(SortError::InvalidTunables {
                insertion_sort_cutoff: self.insertion_sort_cutoff,
                sequential_cutoff: self.sequential_cutoff,
                datapar_cutoff: self.datapar_cutoff,
                partition_block_size: self.partition_block_size,
            });
        }
        Ok(())
    }

    pub fn regime(&self, len: usize) -> Regime {
        if len < self.sequential_cutoff {
            Regime::Sequential
        } else if len < self.datapar_cutoff {
            Regime::TaskParallel
        } else {
            Regime::DataParallel
        }
    }
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SortError {
    #[error("input array is empty")]
    EmptyInput,
    #[error(
        "invalid tunables: need 0 < insertion_sort_cutoff ({insertion_sort_cutoff}) \
         < sequential_cutoff ({sequential_cutoff}) < datapar_cutoff ({datapar_cutoff}) \
         and a partition block size in 1..=2048 ({partition_block_size})"
    )]
    InvalidTunables {
        insertion_sort_cutoff: usize,
        sequential_cutoff: usize,
        datapar_cutoff: usize,
        partition_block_size: usize,
    },
    #[error("sequential partition pointers failed to meet (left {left}, right {right})")]
    PartitionPointerMismatch { left: usize, right: usize },
    #[error("partition counters cover {left} + {right} + 1 elements, expected {size}")]
    PartitionCountMismatch { left: u64, right: u64, size: usize },
}

/// Sorts `data` ascending with the hybrid engine, dispatching partition
/// blocks through a work-stealing parallel loop.
///
/// Runs on the current rayon pool; wrap the call in
/// `ThreadPool::install` to pick a thread count.
pub fn sort(data: &mut [u32]) -> Result<(), SortError> {
    sort_with(data, &TUNABLES, PartitionDispatch::ParallelFor)
}

/// Like [`sort`], but dispatches one task per partition block.
pub fn sort_taskloop(data: &mut [u32]) -> Result<(), SortError> {
    sort_with(data, &TUNABLES, PartitionDispatch::TaskPerBlock)
}

pub fn sort_with(
    data: &mut [u32],
    tunables: &Tunables,
    dispatch: PartitionDispatch,
) -> Result<(), SortError> {
    check_input(data, tunables)?;
    run_hybrid(data, tunables, dispatch)
}

pub fn sort_strategy(strategy: SortStrategy, data: &mut [u32]) -> Result<(), SortError> {
    sort_strategy_with(strategy, data, &TUNABLES)
}

pub fn sort_strategy_with(
    strategy: SortStrategy,
    data: &mut [u32],
    tunables: &Tunables,
) -> Result<(), SortError> {
    check_input(data, tunables)?;
    match strategy {
        SortStrategy::Sequential => strategies::sequential::sort(data, tunables),
        SortStrategy::TaskParallel => strategies::task_parallel::sort(data, tunables),
        SortStrategy::Hybrid => run_hybrid(data, tunables, PartitionDispatch::ParallelFor),
        SortStrategy::HybridTaskloop => run_hybrid(data, tunables, PartitionDispatch::TaskPerBlock),
    }
}

fn check_input(data: &[u32], tunables: &Tunables) -> Result<(), SortError> {
    tunables.validate()?;
    if data.is_empty() {
        return Err(SortError::EmptyInput);
    }
    Ok(())
}

fn run_hybrid(
    data: &mut [u32],
    tunables: &Tunables,
    dispatch: PartitionDispatch,
) -> Result<(), SortError> {
    // The caller's slice is the final destination, so it enters flipped.
    let mut scratch = vec![0u32; data.len()];
    strategies::hybrid::sort(data, &mut scratch, true, tunables, dispatch)
}

/// Deterministic value for index `seed`, the multiply/xorshift mix used to
/// build reproducible benchmark inputs.
pub fn random_u32(mut seed: u64) -> u32 {
    seed = seed.wrapping_add(876_998_787_696);
    seed = seed.wrapping_mul(35_334_534_876_231);
    seed ^= seed << 19;
    seed ^= seed >> 23;
    seed ^= seed << 13;
    seed ^= seed >> 17;
    seed ^= seed << 5;
    (seed & 0xFFFF_FFFF) as u32
}

/// Fills `data[i] = random_u32(i)` with a parallel loop.
pub fn fill_random(data: &mut [u32]) {
    data.par_iter_mut()
        .with_min_len(8192)
        .enumerate()
        .for_each(|(i, slot)| *slot = random_u32(i as u64));
}
