use proptest::prelude::*;

use sheetseek_engine::normalize::{
    comparison_key, extract_numeric_tokens, normalize_header_name, normalize_numeric_string,
};

const CASES: u32 = 256;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn header_normalization_is_idempotent(s in "\\PC{0,40}") {
        let once = normalize_header_name(&s);
        prop_assert_eq!(normalize_header_name(&once), once);
    }

    #[test]
    fn numeric_normalization_is_idempotent(s in "\\PC{0,40}") {
        let once = normalize_numeric_string(&s);
        prop_assert_eq!(normalize_numeric_string(&once), once);
    }

    #[test]
    fn numeric_normalization_is_idempotent_on_number_like_text(
        s in "[0-9 ,.\\-\u{a0}\u{202f}]{0,24}"
    ) {
        let once = normalize_numeric_string(&s);
        prop_assert_eq!(normalize_numeric_string(&once), once.clone());
        prop_assert!(once.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-'));
    }

    #[test]
    fn grouped_integers_normalize_to_plain_digits(n in 1_000u64..1_000_000_000) {
        let plain = n.to_string();
        let mut grouped = String::new();
        for (idx, ch) in plain.chars().enumerate() {
            if idx > 0 && (plain.len() - idx) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }
        prop_assert_eq!(normalize_numeric_string(&grouped), plain.clone());
        prop_assert_eq!(normalize_numeric_string(&grouped.replace(' ', ",")), plain.clone());
        prop_assert_eq!(normalize_numeric_string(&(n as f64).to_string()), plain);
    }

    #[test]
    fn comparison_key_is_idempotent(s in "\\PC{0,30}") {
        let once = comparison_key(&s);
        prop_assert_eq!(comparison_key(&once), once);
    }

    #[test]
    fn numeric_tokens_have_no_leading_zeros(s in "[a-z0-9/:.?=&]{0,40}") {
        for token in extract_numeric_tokens(&s) {
            prop_assert!(!token.is_empty());
            prop_assert!(token == "0" || !token.starts_with('0'));
        }
    }
}
