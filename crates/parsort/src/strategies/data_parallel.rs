use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

use crate::{MAX_PARTITION_BLOCK, PartitionDispatch, SortError, Tunables};

// One packed counter cell per partition call: the low 32 bits accumulate the
// left (`< pivot`) count, the high 32 bits the right (`>= pivot`) count. A
// single fetch-add reserves both output ranges at once.

#[inline]
pub fn pack_counts(left: u64, right: u64) -> u64 {
    debug_assert!(left <= u32::MAX as u64 && right <= u32::MAX as u64);
    (right << 32) | left
}

#[inline]
pub fn unpack_counts(packed: u64) -> (u64, u64) {
    (packed & 0xFFFF_FFFF, packed >> 32)
}

/// Partitions the non-pivot elements of `current` (element 0 is the pivot)
/// into `scratch`: values `< pivot` fill `scratch[..left_count]`, values
/// `>= pivot` fill `scratch[left_count + 1..]`, and `scratch[left_count]` is
/// left untouched for the caller to place the pivot. Returns `left_count`.
pub fn partition(
    current: &[u32],
    scratch: &mut [u32],
    tunables: &Tunables,
    dispatch: PartitionDispatch,
) -> Result<usize, SortError> {
    let size = current.len();
    debug_assert!(size > 1);
    debug_assert_eq!(size, scratch.len());

    let pivot = current[0];
    let block_size = tunables.partition_block_size;
    let block_count = (size - 1).div_ceil(block_size);
    let counters = AtomicU64::new(0);
    let output = OutputSlots::new(scratch);

    match dispatch {
        PartitionDispatch::ParallelFor => {
            (0..block_count).into_par_iter().for_each(|block_index| {
                partition_block(current, &output, pivot, &counters, block_index, block_size);
            });
        }
        PartitionDispatch::TaskPerBlock => {
            rayon::scope(|scope| {
                for block_index in 0..block_count {
                    let output = &output;
                    let counters = &counters;
                    scope.spawn(move |_| {
                        partition_block(current, output, pivot, counters, block_index, block_size);
                    });
                }
            });
        }
    }

    // The joins above ordered every block's fetch-add before this load.
    let (left, right) = unpack_counts(counters.load(Ordering::Relaxed));
    if left + right + 1 != size as u64 {
        log::error!("partition counters out of sync: left {left}, right {right}, size {size}");
        return Err(SortError::PartitionCountMismatch { left, right, size });
    }
    Ok(left as usize)
}

fn partition_block(
    current: &[u32],
    output: &OutputSlots<'_>,
    pivot: u32,
    counters: &AtomicU64,
    block_index: usize,
    block_size: usize,
) {
    // Blocks cover 1..len; element 0 is the pivot.
    let start = 1 + block_index * block_size;
    let end = (start + block_size).min(current.len());
    let len = end - start;

    // Stage the block in one stack buffer, lefts growing from the front and
    // rights from the back. Tunables::validate keeps block sizes within the
    // buffer.
    let mut values = [0u32; MAX_PARTITION_BLOCK];
    let mut left_count = 0;
    for (i, &value) in current[start..end].iter().enumerate() {
        if value < pivot {
            values[left_count] = value;
            left_count += 1;
        } else {
            values[len - 1 - (i - left_count)] = value;
        }
    }
    let right_count = len - left_count;

    // The fetch-add serializes range assignment across blocks: the previous
    // totals it returns are the exclusive offsets this block writes to.
    let previous = counters.fetch_add(
        pack_counts(left_count as u64, right_count as u64),
        Ordering::SeqCst,
    );
    let (previous_left, previous_right) = unpack_counts(previous);

    let left_offset = previous_left as usize;
    let right_offset = current.len() - right_count - previous_right as usize;
    unsafe {
        output.write(left_offset, &values[..left_count]);
        output.write(right_offset, &values[len - right_count..len]);
    }
}

/// Shared write handle over the scratch buffer for concurrent block copies.
struct OutputSlots<'a> {
    ptr: *mut u32,
    len: usize,
    _buffer: PhantomData<&'a mut [u32]>,
}

// Blocks write disjoint ranges, reserved through the counter cell.
unsafe impl Send for OutputSlots<'_> {}
unsafe impl Sync for OutputSlots<'_> {}

impl<'a> OutputSlots<'a> {
    fn new(buffer: &'a mut [u32]) -> Self {
        Self {
            ptr: buffer.as_mut_ptr(),
            len: buffer.len(),
            _buffer: PhantomData,
        }
    }

    /// # Safety
    /// The caller must hold an exclusive reservation for
    /// `offset..offset + values.len()`.
    unsafe fn write(&self, offset: usize, values: &[u32]) {
        debug_assert!(offset + values.len() <= self.len);
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), self.ptr.add(offset), values.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::TUNABLES;

    const DISPATCHES: [PartitionDispatch; 2] =
        [PartitionDispatch::ParallelFor, PartitionDispatch::TaskPerBlock];

    fn check_partition(input: &[u32], tunables: &Tunables, dispatch: PartitionDispatch) {
        let pivot = input[0];
        let mut scratch = vec![0u32; input.len()];
        let left_count = partition(input, &mut scratch, tunables, dispatch).unwrap();

        for &value in &scratch[..left_count] {
            assert!(value < pivot);
        }
        for &value in &scratch[left_count + 1..] {
            assert!(value >= pivot);
        }

        // Same multiset once the pivot is dropped into its slot.
        scratch[left_count] = pivot;
        let mut expected = input.to_vec();
        expected.sort_unstable();
        scratch.sort_unstable();
        assert_eq!(scratch, expected);
    }

    #[test]
    fn pack_unpack_round_trip() {
        assert_eq!(unpack_counts(pack_counts(0, 0)), (0, 0));
        assert_eq!(unpack_counts(pack_counts(17, 4)), (17, 4));
        let max = u32::MAX as u64;
        assert_eq!(unpack_counts(pack_counts(max, max)), (max, max));
    }

    #[test]
    fn counter_accumulation_is_field_wise() {
        let packed = pack_counts(3, 5) + pack_counts(10, 20);
        assert_eq!(unpack_counts(packed), (13, 25));
    }

    #[test]
    fn partitions_seeded_inputs() {
        let mut rng = StdRng::seed_from_u64(0xB10C_2026);
        for &size in &[2_usize, 3, 511, 512, 513, 1024, 4096, 70_000] {
            let input: Vec<u32> = (0..size).map(|_| rng.random()).collect();
            for dispatch in DISPATCHES {
                check_partition(&input, &TUNABLES, dispatch);
            }
        }
    }

    #[test]
    fn tiny_blocks_many_tasks() {
        let tunables = Tunables {
            partition_block_size: 2,
            ..TUNABLES
        };
        let mut rng = StdRng::seed_from_u64(0xB10D_2026);
        let input: Vec<u32> = (0..1001).map(|_| rng.random::<u32>() % 100).collect();
        for dispatch in DISPATCHES {
            check_partition(&input, &tunables, dispatch);
        }
    }

    #[test]
    fn all_equal_input_goes_right() {
        let input = vec![6u32; 40_000];
        for dispatch in DISPATCHES {
            let mut scratch = vec![0u32; input.len()];
            let left_count = partition(&input, &mut scratch, &TUNABLES, dispatch).unwrap();
            assert_eq!(left_count, 0);
            assert!(scratch[1..].iter().all(|&value| value == 6));
        }
    }

    #[test]
    fn pivot_slot_is_left_for_the_caller() {
        let input = vec![5, 3, 8, 1, 9, 2];
        let mut scratch = vec![u32::MAX; input.len()];
        let left_count = partition(&input, &mut scratch, &TUNABLES, DISPATCHES[0]).unwrap();
        assert_eq!(left_count, 3);
        assert_eq!(scratch[left_count], u32::MAX);
    }
}
