use std::num::NonZeroUsize;

/// Split `items` into consecutive groups of `size`, keeping order.
/// The last group may be shorter; empty input yields no groups.
pub fn chunk<T: Clone>(items: &[T], size: NonZeroUsize) -> Vec<Vec<T>> {
    items.chunks(size.get()).map(|c| c.to_vec()).collect()
}
