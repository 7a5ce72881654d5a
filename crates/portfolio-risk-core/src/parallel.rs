//! Conditional fan-out over independent computations.
//!
//! Uses rayon when the `parallel` feature is enabled and the batch is at
//! least `threshold` items long; otherwise maps sequentially. Result order
//! always matches input order.

#[allow(unused_variables)]
pub(crate) fn maybe_parallel_map<T, U, F>(items: &[T], threshold: usize, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if items.len() >= threshold.max(2) {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}
