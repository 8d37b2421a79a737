//! Property-based tests for the conflict resolver.
//!
//! These tests use proptest to generate random destination paths and verify
//! that resolver invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::conflict::{ConflictAction, ConflictResolver, ConflictRules};
    use proptest::prelude::*;
    use std::path::Path;

    // ============================================================================
    // resolve() invariants over the production rules
    // ============================================================================

    proptest! {
        /// Property: resolution is deterministic (same path = same verdict)
        #[test]
        fn resolve_is_deterministic(path in "[a-zA-Z0-9_./-]{1,40}") {
            let resolver = ConflictResolver::with_default_rules();
            let first = resolver.resolve(Path::new(&path));
            let second = resolver.resolve(Path::new(&path));
            prop_assert_eq!(first, second);
        }

        /// Property: every path gets a verdict; the reason is never empty
        #[test]
        fn resolve_always_produces_a_reason(path in "[a-zA-Z0-9_./-]{1,40}") {
            let resolver = ConflictResolver::with_default_rules();
            let resolution = resolver.resolve(Path::new(&path));
            prop_assert!(!resolution.reason.is_empty());
        }

        /// Property: renamed_to is populated exactly for rename verdicts
        #[test]
        fn renamed_to_tracks_rename_action(path in "[a-zA-Z0-9_./-]{1,40}") {
            let resolver = ConflictResolver::with_default_rules();
            let resolution = resolver.resolve(Path::new(&path));
            prop_assert_eq!(
                resolution.action == ConflictAction::Rename,
                resolution.renamed_to.is_some()
            );
        }

        /// Property: append file names resolve to append at any depth,
        /// regardless of what the override globs would say
        #[test]
        fn append_names_beat_override_globs(dir in "(src|components|routes)", name in "[a-z]{1,8}") {
            let resolver = ConflictResolver::with_default_rules();
            let path = format!("{}/{}/.env", dir, name);
            let resolution = resolver.resolve(Path::new(&path));
            prop_assert_eq!(resolution.action, ConflictAction::Append);
        }

        /// Property: the manifest resolves to merge wherever it sits
        #[test]
        fn manifest_always_merges(prefix in "([a-z]{1,8}/){0,3}") {
            let resolver = ConflictResolver::with_default_rules();
            let path = format!("{}package.json", prefix);
            let resolution = resolver.resolve(Path::new(&path));
            prop_assert_eq!(resolution.action, ConflictAction::Merge);
        }
    }

    // ============================================================================
    // resolve() with an empty rule set
    // ============================================================================

    proptest! {
        /// Property: with no rules at all, everything is the default override
        #[test]
        fn empty_rules_default_to_override(path in "[a-zA-Z0-9_./-]{1,40}") {
            let resolver = ConflictResolver::new(ConflictRules {
                rename_table: Vec::new(),
                merge_files: Vec::new(),
                append_files: Vec::new(),
                override_globs: Vec::new(),
            }).unwrap();
            let resolution = resolver.resolve(Path::new(&path));
            prop_assert_eq!(resolution.action, ConflictAction::Override);
            prop_assert_eq!(resolution.reason, "default behavior");
        }
    }
}
