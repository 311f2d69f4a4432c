//! Property-based tests for migration key rewriting
//!
//! Tests invariants:
//! - A rewritten key ends with the target suffix and never with the source suffix
//! - Only the suffix changes
//! - Keys without the source suffix are left alone

use proptest::prelude::*;

use crate::core::media::target_key;

fn arb_stem() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,12}(/[a-z0-9_-]{1,12}){0,3}"
}

proptest! {
    #[test]
    fn prop_rename_is_idempotent(stem in arb_stem()) {
        let source = format!("{stem}.mp3");
        let target = target_key(&source, ".mp3", ".opus").unwrap();

        prop_assert!(target.ends_with(".opus"));
        prop_assert!(!target.ends_with(".mp3"));
        prop_assert_eq!(target_key(&target, ".mp3", ".opus"), None);
        prop_assert_eq!(target.strip_suffix(".opus"), Some(stem.as_str()));
    }

    #[test]
    fn prop_other_suffixes_untouched(stem in arb_stem(), ext in "(wav|ogg|flac|m4a)") {
        let key = format!("{stem}.{ext}");
        prop_assert_eq!(target_key(&key, ".mp3", ".opus"), None);
    }
}
