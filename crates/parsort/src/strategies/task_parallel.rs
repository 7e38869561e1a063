use std::sync::OnceLock;

use rayon::Scope;

use crate::{SortError, Tunables};

use super::sequential;

/// Quicksort with a sequential partition and fork-join recursion. Below the
/// sequential cutoff it stops forking to bound task-creation overhead.
///
/// The scope joins every forked sub-sort before this returns. Forks only
/// cover the smaller half of each split; the larger half is walked
/// iteratively, keeping the stack depth logarithmic for degenerate pivots.
pub fn sort(data: &mut [u32], tunables: &Tunables) -> Result<(), SortError> {
    if data.len() < tunables.sequential_cutoff {
        return sequential::sort(data, tunables);
    }

    let first_error = OnceLock::new();
    rayon::scope(|scope| walk(scope, &first_error, data, tunables));
    first_error.into_inner().map_or(Ok(()), Err)
}

fn walk<'a>(
    scope: &Scope<'a>,
    first_error: &'a OnceLock<SortError>,
    mut data: &'a mut [u32],
    tunables: &'a Tunables,
) {
    while data.len() >= tunables.sequential_cutoff {
        let pivot_idx = match sequential::partition(data) {
            Ok(idx) => idx,
            Err(error) => {
                let _ = first_error.set(error);
                return;
            }
        };
        data.swap(0, pivot_idx);

        let taken = data;
        let (left, rest) = taken.split_at_mut(pivot_idx);
        let (_, right) = rest.split_at_mut(1);
        let (smaller, larger) = if left.len() <= right.len() {
            (left, right)
        } else {
            (right, left)
        };

        scope.spawn(move |scope| walk(scope, first_error, smaller, tunables));
        data = larger;
    }

    if let Err(error) = sequential::sort(data, tunables) {
        let _ = first_error.set(error);
    }
}
