/// Split `items` into consecutive groups of `size`; the last group may be shorter.
/// A `size` of zero is treated as one.
pub fn batch<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(<[T]>::to_vec).collect()
}
