//! Property tests for the enum vocabulary encoding.

use proptest::prelude::*;

use vat_reference::{ordinal_of, value_at};

fn vocabulary_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[A-Za-z_?-]{1,12}", 1..20)
        .prop_map(|set| set.into_iter().collect())
}

proptest! {
    #[test]
    fn encoding_then_decoding_recovers_every_vocabulary_value(vocab in vocabulary_strategy()) {
        for value in &vocab {
            let ordinal = ordinal_of(&vocab, value).expect("value is in its own vocabulary");
            prop_assert_eq!(value_at(&vocab, ordinal), Some(value.as_str()));
        }
    }

    #[test]
    fn unknown_values_encode_to_absent_without_panicking(
        vocab in vocabulary_strategy(),
        probe in "[0-9]{1,8}!",
    ) {
        // The probe alphabet is disjoint from the vocabulary alphabet.
        prop_assert_eq!(ordinal_of(&vocab, &probe), None);
    }

    #[test]
    fn out_of_range_ordinals_decode_to_absent(vocab in vocabulary_strategy(), ordinal in -5i64..200) {
        let decoded = value_at(&vocab, ordinal);
        if ordinal >= 0 && (ordinal as usize) < vocab.len() {
            prop_assert!(decoded.is_some());
        } else {
            prop_assert_eq!(decoded, None);
        }
    }
}
