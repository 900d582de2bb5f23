//! Order-preserving batch evaluation.
//!
//! Markets and positions are independent of each other, so batches are mapped
//! across rayon's thread pool when the `parallel` feature is enabled and
//! sequentially otherwise. Output order always matches input order.

/// Batches smaller than this are not worth handing to the thread pool
const PARALLEL_THRESHOLD: usize = 16;

/// Map every item sequentially
pub(crate) fn map_sequential<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    F: Fn(&T) -> R,
{
    items.iter().map(f).collect()
}

/// Map items across the rayon thread pool
#[cfg(feature = "parallel")]
pub(crate) fn map_parallel<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    use rayon::prelude::*;
    items.par_iter().map(f).collect()
}

/// Map items, in parallel when the `parallel` feature is enabled
pub(crate) fn map_ordered<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if items.len() < PARALLEL_THRESHOLD {
        return map_sequential(items, f);
    }
    #[cfg(feature = "parallel")]
    {
        map_parallel(items, f)
    }
    #[cfg(not(feature = "parallel"))]
    {
        map_sequential(items, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_ordered_preserves_order() {
        let items: Vec<u64> = (0..1_000).collect();
        let doubled = map_ordered(&items, |x| x * 2);
        assert_eq!(doubled, map_sequential(&items, |x| x * 2));
        assert_eq!(doubled[999], 1_998);
    }

    #[test]
    fn test_map_empty() {
        let items: Vec<u64> = Vec::new();
        assert!(map_ordered(&items, |x| *x).is_empty());
    }
}
