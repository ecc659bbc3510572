//! Reduction operators with an explicit identity

use std::ops::Add;

/// A combining operator plus its identity element
///
/// Callers assume `combine(identity(), x) == x`; this is not checked.
/// Reductions fold in a fixed order, so results are reproducible for a fixed
/// worker count even when `combine` is not exactly associative.
pub trait Reducer<V>: Sync {
    /// The neutral element each accumulator starts from
    fn identity(&self) -> V;

    /// Fold `value` into `acc`
    fn combine(&self, acc: V, value: V) -> V;

    /// Fold `values` left to right starting from the identity
    fn fold<I>(&self, values: I) -> V
    where
        I: IntoIterator<Item = V>,
    {
        values
            .into_iter()
            .fold(self.identity(), |acc, value| self.combine(acc, value))
    }
}

/// Addition with `Default::default()` as the identity
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl<V> Reducer<V> for Sum
where
    V: Default + Add<Output = V>,
{
    fn identity(&self) -> V {
        V::default()
    }

    fn combine(&self, acc: V, value: V) -> V {
        acc + value
    }
}

/// A reducer built from an identity value and a closure
#[derive(Debug, Clone)]
pub struct FnReducer<V, F> {
    identity: V,
    op: F,
}

impl<V, F> FnReducer<V, F>
where
    V: Clone + Sync,
    F: Fn(V, V) -> V + Sync,
{
    pub fn new(identity: V, op: F) -> Self {
        Self { identity, op }
    }
}

impl<V, F> Reducer<V> for FnReducer<V, F>
where
    V: Clone + Sync,
    F: Fn(V, V) -> V + Sync,
{
    fn identity(&self) -> V {
        self.identity.clone()
    }

    fn combine(&self, acc: V, value: V) -> V {
        (self.op)(acc, value)
    }
}

/// Shorthand for [`FnReducer::new`]
///
/// ```
/// use parfor::{reducer, Reducer};
///
/// let max = reducer(i64::MIN, |a: i64, b: i64| a.max(b));
/// assert_eq!(max.fold([3, -1, 7, 2]), 7);
/// ```
pub fn reducer<V, F>(identity: V, op: F) -> FnReducer<V, F>
where
    V: Clone + Sync,
    F: Fn(V, V) -> V + Sync,
{
    FnReducer::new(identity, op)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_identity() {
        assert_eq!(Reducer::<i32>::identity(&Sum), 0);
        assert_eq!(Reducer::<f64>::identity(&Sum), 0.0);
        assert_eq!(Sum.fold(1..=10u64), 55);
    }

    #[test]
    fn test_fold_empty_is_identity() {
        let product = reducer(1u64, |a, b| a * b);
        assert_eq!(product.fold(std::iter::empty()), 1);
        assert_eq!(product.fold([2, 3, 4]), 24);
    }

    #[test]
    fn test_fn_reducer_non_numeric() {
        let concat = reducer(String::new(), |mut acc: String, s: String| {
            acc.push_str(&s);
            acc
        });
        let words = ["fork", "/", "join"].map(String::from);
        assert_eq!(concat.fold(words), "fork/join");
    }
}
