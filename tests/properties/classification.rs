//! Property tests for external classification and UMD global lookup.

use std::collections::BTreeMap;

use proptest::prelude::*;

use packlet::external::{ExternalMatcher, GlobalNameMap, ModuleClass};

fn vue_leaflet_matcher() -> ExternalMatcher {
    ExternalMatcher::new(
        &["vue".to_string(), "leaflet".to_string()],
        &["^leaflet/.*".to_string()],
    )
    .unwrap()
}

fn globals() -> GlobalNameMap {
    GlobalNameMap::new(BTreeMap::from([
        ("vue".to_string(), "Vue".to_string()),
        ("leaflet".to_string(), "L".to_string()),
    ]))
}

fn path_segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[a-z][a-z0-9_.-]{0,10}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: Every sub-path of an external package is external.
    #[test]
    fn property_leaflet_subpaths_are_external(
        segments in proptest::collection::vec(path_segment(), 1..4),
    ) {
        let specifier = format!("leaflet/{}", segments.join("/"));
        prop_assert_eq!(vue_leaflet_matcher().classify(&specifier), ModuleClass::External);
    }

    /// PROPERTY: Relative and aliased imports are always bundled.
    #[test]
    fn property_relative_imports_are_internal(
        segments in proptest::collection::vec(path_segment(), 1..4),
        prefix in prop_oneof![Just("./"), Just("../"), Just("@src/")],
    ) {
        let specifier = format!("{}{}", prefix, segments.join("/"));
        prop_assert_eq!(vue_leaflet_matcher().classify(&specifier), ModuleClass::Internal);
    }

    /// PROPERTY: Classification depends only on the specifier.
    #[test]
    fn property_classification_is_deterministic(specifier in "[a-z@./_-]{1,24}") {
        let first = vue_leaflet_matcher().classify(&specifier);
        let second = vue_leaflet_matcher().classify(&specifier);
        prop_assert_eq!(first, second);
        prop_assert_eq!(
            vue_leaflet_matcher().is_external(&specifier),
            first == ModuleClass::External
        );
    }

    /// PROPERTY: Sub-path globals are borrowed from the package and flagged as guessed.
    #[test]
    fn property_subpath_globals_are_guessed(
        segments in proptest::collection::vec(path_segment(), 1..4),
    ) {
        let specifier = format!("leaflet/{}", segments.join("/"));
        let binding = globals().binding_for(&specifier).unwrap();
        prop_assert_eq!(binding.global, "L");
        prop_assert!(binding.guessed);
    }

    /// PROPERTY: Names with no mapped package prefix have no global.
    #[test]
    fn property_unmapped_packages_have_no_global(name in "[a-z]{2,10}") {
        prop_assume!(name != "vue" && name != "leaflet");
        prop_assert!(globals().binding_for(&name).is_none());
        let nested = format!("{}/sub", name);
        prop_assert!(globals().binding_for(&nested).is_none());
    }
}
