use crate::{SortError, Tunables};

use super::common;

/// Classic in-place quicksort; the base case for both parallel regimes.
/// Recurses into the smaller half and iterates on the larger one, so the
/// stack depth stays logarithmic even for degenerate pivots.
pub fn sort(mut data: &mut [u32], tunables: &Tunables) -> Result<(), SortError> {
    while data.len() > tunables.insertion_sort_cutoff {
        let pivot_idx = partition(data)?;
        data.swap(0, pivot_idx);

        let (left, rest) = data.split_at_mut(pivot_idx);
        let (_, right) = rest.split_at_mut(1);
        if left.len() <= right.len() {
            sort(left, tunables)?;
            data = right;
        } else {
            sort(right, tunables)?;
            data = left;
        }
    }

    common::insertion_sort(data);
    Ok(())
}

/// Hoare-style partition around `data[0]`. On success all elements before
/// the returned index are `< pivot` and all at or after it are `>= pivot`;
/// the returned index is the final slot for the pivot.
pub fn partition(data: &mut [u32]) -> Result<usize, SortError> {
    debug_assert!(data.len() > 1);

    let pivot = data[0];
    let mut left = 1;
    let mut right = data.len() - 1;
    loop {
        while left < data.len() && data[left] < pivot {
            left += 1;
        }
        while right > 0 && data[right] >= pivot {
            right -= 1;
        }
        if left >= right {
            break;
        }
        data.swap(left, right);
        left += 1;
        right -= 1;
    }

    if left - 1 != right {
        log::error!("sequential partition pointers out of sync: left {left}, right {right}");
        return Err(SortError::PartitionPointerMismatch { left, right });
    }
    Ok(right)
}
