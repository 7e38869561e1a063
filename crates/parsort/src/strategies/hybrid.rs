use std::sync::OnceLock;

use rayon::Scope;

use crate::{PartitionDispatch, Regime, SortError, Tunables};

use super::{data_parallel, sequential, task_parallel};

/// Orchestrator over the ping-pong buffer pair.
///
/// `current` holds the valid data; `flipped` is true when `current` is also
/// the final destination. Each data-parallel partition moves the data into
/// `scratch` and toggles the flag; the sub-tree below the data-parallel
/// cutoff sorts in place, copying over first when the valid data sits in the
/// wrong buffer.
///
/// After each partition the smaller half forks onto the scope and the larger
/// half is walked in the same frame, so the stack depth stays logarithmic
/// even when every pivot lands at one end.
pub fn sort(
    current: &mut [u32],
    scratch: &mut [u32],
    flipped: bool,
    tunables: &Tunables,
    dispatch: PartitionDispatch,
) -> Result<(), SortError> {
    let first_error = OnceLock::new();
    rayon::scope(|scope| {
        walk(
            scope,
            &first_error,
            current,
            scratch,
            flipped,
            tunables,
            dispatch,
        );
    });
    first_error.into_inner().map_or(Ok(()), Err)
}

fn walk<'a>(
    scope: &Scope<'a>,
    first_error: &'a OnceLock<SortError>,
    mut current: &'a mut [u32],
    mut scratch: &'a mut [u32],
    mut flipped: bool,
    tunables: &'a Tunables,
    dispatch: PartitionDispatch,
) {
    loop {
        debug_assert_eq!(current.len(), scratch.len());

        match current.len() {
            0 => return,
            1 => {
                if !flipped {
                    scratch[0] = current[0];
                }
                return;
            }
            _ => {}
        }

        let regime = tunables.regime(current.len());
        if regime != Regime::DataParallel {
            let destination = if flipped {
                current
            } else {
                scratch.copy_from_slice(current);
                scratch
            };
            let result = match regime {
                Regime::Sequential => sequential::sort(destination, tunables),
                _ => task_parallel::sort(destination, tunables),
            };
            if let Err(error) = result {
                let _ = first_error.set(error);
            }
            return;
        }

        let pivot = current[0];
        let pivot_idx = match data_parallel::partition(current, scratch, tunables, dispatch) {
            Ok(idx) => idx,
            Err(error) => {
                let _ = first_error.set(error);
                return;
            }
        };

        let destination = if flipped { &mut *current } else { &mut *scratch };
        destination[pivot_idx] = pivot;

        // The pivot slot stays out of both halves, so its write above
        // survives the rest of the walk.
        let current_taken = current;
        let scratch_taken = scratch;
        let (current_left, rest) = current_taken.split_at_mut(pivot_idx);
        let (_, current_right) = rest.split_at_mut(1);
        let (scratch_left, rest) = scratch_taken.split_at_mut(pivot_idx);
        let (_, scratch_right) = rest.split_at_mut(1);

        // The partition swapped the buffer roles for both halves.
        let left_pair = (scratch_left, current_left);
        let right_pair = (scratch_right, current_right);
        let (smaller, larger) = if left_pair.0.len() <= right_pair.0.len() {
            (left_pair, right_pair)
        } else {
            (right_pair, left_pair)
        };

        let next_flipped = !flipped;
        let (forked_current, forked_scratch) = smaller;
        scope.spawn(move |scope| {
            walk(
                scope,
                first_error,
                forked_current,
                forked_scratch,
                next_flipped,
                tunables,
                dispatch,
            );
        });

        (current, scratch) = larger;
        flipped = next_flipped;
    }
}
