use proptest::prelude::*;
use samplesort::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Sortedness and permutation, across the sequential/parallel boundary.
    #[test]
    fn prop_copying_matches_reference(
        input in prop::collection::vec(any::<u32>(), 0..40_000)
    ) {
        let mut expected = input.clone();
        expected.sort_unstable();
        prop_assert_eq!(sample_sort(&input, &|a: &u32, b: &u32| a < b, false), expected);
    }

    #[test]
    fn prop_inplace_agrees_with_copying(
        input in prop::collection::vec(any::<u64>(), 0..40_000)
    ) {
        let copied = sample_sort(&input, &|a: &u64, b: &u64| a < b, false);
        let mut inplace = input;
        sample_sort_inplace(&mut inplace, &|a: &u64, b: &u64| a < b);
        prop_assert_eq!(inplace, copied);
    }

    // Stability: equal keys keep input order, exactly like the std stable sort.
    #[test]
    fn prop_stable_matches_std(
        keys in prop::collection::vec(0u8..16, 0..40_000)
    ) {
        let input: Vec<(u8, u32)> = keys.into_iter().zip(0..).map(|(k, i)| (k, i)).collect();
        let mut expected = input.clone();
        expected.sort_by_key(|kv| kv.0);
        prop_assert_eq!(sample_sort(&input, &|a: &(u8, u32), b: &(u8, u32)| a.0 < b.0, true), expected);
    }

    // Sorting a sorted sequence is the identity.
    #[test]
    fn prop_idempotent(
        mut input in prop::collection::vec(any::<u32>(), 0..40_000)
    ) {
        input.sort_unstable();
        prop_assert_eq!(&sample_sort(&input, &|a: &u32, b: &u32| a < b, false), &input);
    }
}
