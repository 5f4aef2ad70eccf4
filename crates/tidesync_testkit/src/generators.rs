//! Property-based test generators using proptest.

use proptest::prelude::*;

/// Strategy for one '/'-delimited object key: one to three segments of
/// lowercase alphanumerics.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9]{1,8}", 1..=3).prop_map(|segments| segments.join("/"))
}

/// Strategy for a sorted set of unique keys, sized `1..=max`.
pub fn key_set_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(key_strategy(), 1..=max)
        .prop_map(|set| set.into_iter().collect())
}

/// Strategy for arbitrary small object bodies.
pub fn body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn keys_have_no_empty_segments(key in key_strategy()) {
            prop_assert!(!key.is_empty());
            prop_assert!(key.split('/').all(|segment| !segment.is_empty()));
        }

        #[test]
        fn key_sets_are_sorted_and_unique(keys in key_set_strategy(16)) {
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
