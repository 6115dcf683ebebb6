//! Property tests for the fingerprint and health invariants

mod fixtures;

use std::fs;

use build_attest::fingerprint::{
    fingerprint, verify_fingerprints, FingerprintOutcome, FingerprintPair,
};
use build_attest::health::{check_health, CheckResult, HealthStatus, RequiredEntry};
use fixtures::{populate, Layout};
use proptest::collection::vec;
use proptest::prelude::*;
use tempfile::TempDir;

fn computed(outcome: FingerprintOutcome) -> FingerprintPair {
    match outcome {
        FingerprintOutcome::Computed(pair) => pair,
        FingerprintOutcome::Skipped { path } => panic!("unexpected skip of {}", path.display()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Fingerprinting an unchanged file twice writes identical sidecars.
    #[test]
    fn fingerprint_is_deterministic(content in vec(any::<u8>(), 0..4096)) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), &content).unwrap();

        let first = computed(fingerprint(dir.path(), "index.html").unwrap());
        let sha256_first = fs::read(dir.path().join("index.html.sha256")).unwrap();
        let sha1_first = fs::read(dir.path().join("index.html.sha1")).unwrap();

        let second = computed(fingerprint(dir.path(), "index.html").unwrap());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(sha256_first, fs::read(dir.path().join("index.html.sha256")).unwrap());
        prop_assert_eq!(sha1_first, fs::read(dir.path().join("index.html.sha1")).unwrap());

        prop_assert!(verify_fingerprints(dir.path(), "index.html").unwrap().passed());
    }

    /// Any single-byte change alters both digests and fails verification.
    #[test]
    fn single_byte_mutation_changes_both_digests(
        content in vec(any::<u8>(), 1..2048),
        index in any::<prop::sample::Index>(),
        delta in 1u8..=255,
    ) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), &content).unwrap();
        let before = computed(fingerprint(dir.path(), "index.html").unwrap());
        let sidecars_before = FingerprintPair::from_sidecars(dir.path(), "index.html").unwrap();

        let mut mutated = content.clone();
        let i = index.index(mutated.len());
        mutated[i] = mutated[i].wrapping_add(delta);
        fs::write(dir.path().join("index.html"), &mutated).unwrap();

        prop_assert!(!verify_fingerprints(dir.path(), "index.html").unwrap().passed());

        let after = computed(fingerprint(dir.path(), "index.html").unwrap());
        prop_assert_eq!(&after, &FingerprintPair::of_bytes(&mutated));
        prop_assert_ne!(&before.sha256, &after.sha256);
        prop_assert_ne!(&before.sha1, &after.sha1);

        let sidecars_after = FingerprintPair::from_sidecars(dir.path(), "index.html").unwrap();
        prop_assert_ne!(&sidecars_before.sha256, &sidecars_after.sha256);
        prop_assert_ne!(&sidecars_before.sha1, &sidecars_after.sha1);
        prop_assert_eq!(sidecars_after, after);
        prop_assert!(verify_fingerprints(dir.path(), "index.html").unwrap().passed());
    }

    /// Status is degraded exactly when some required entry is missing, and
    /// only the missing entries are reported as such.
    #[test]
    fn health_status_matches_missing_entries(
        index in any::<bool>(),
        manifest in any::<bool>(),
        assets in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        populate(dir.path(), Layout { index, manifest, assets });

        let descriptor = check_health(dir.path(), &RequiredEntry::defaults());

        let expected_missing: Vec<&str> =
            [("assets", assets), ("build", index), ("manifest", manifest)]
                .iter()
                .filter(|(_, present)| !present)
                .map(|(name, _)| *name)
                .collect();

        prop_assert_eq!(descriptor.missing(), expected_missing.clone());
        prop_assert_eq!(
            descriptor.status == HealthStatus::Degraded,
            !expected_missing.is_empty()
        );
        for (name, present) in [("build", index), ("manifest", manifest), ("assets", assets)] {
            let expected = if present { CheckResult::Ok } else { CheckResult::Missing };
            prop_assert_eq!(descriptor.checks[name], expected);
        }
    }
}
