//! Property tests for tokenizing and scanning source modules.

use proptest::prelude::*;

use packlet::parser::{parse_module, tokenize, SourceKind};

/// Token soup built from the pieces real component sources are made of
fn source_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("import".to_string()),
        Just("export".to_string()),
        Just("default".to_string()),
        Just("from".to_string()),
        Just("type".to_string()),
        Just("interface".to_string()),
        Just("const".to_string()),
        Just("function".to_string()),
        Just("return".to_string()),
        Just("as".to_string()),
        Just("=>".to_string()),
        Just("{".to_string()),
        Just("}".to_string()),
        Just("(".to_string()),
        Just(")".to_string()),
        Just("<".to_string()),
        Just(">".to_string()),
        Just(":".to_string()),
        Just(";".to_string()),
        Just(",".to_string()),
        Just("*".to_string()),
        Just("/".to_string()),
        Just("\n".to_string()),
        Just("'vue'".to_string()),
        Just("'./utils'".to_string()),
        Just("`a${b}c`".to_string()),
        Just("/re+/g".to_string()),
        Just("// note\n".to_string()),
        proptest::string::string_regex("[A-Za-z_$][A-Za-z0-9_]{0,8}").unwrap(),
        proptest::string::string_regex("[0-9]{1,4}").unwrap(),
    ]
}

fn token_soup() -> impl Strategy<Value = String> {
    proptest::collection::vec(source_fragment(), 0..48).prop_map(|parts| parts.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// PROPERTY: The tokenizer returns tokens or an error, never panics.
    #[test]
    fn property_tokenize_never_panics(src in "\\PC{0,200}") {
        let _ = tokenize(&src);
    }

    /// PROPERTY: Tokens are in bounds, non-empty and in source order.
    #[test]
    fn property_tokens_are_ordered_slices(src in token_soup()) {
        if let Ok(tokens) = tokenize(&src) {
            let mut last_end = 0;
            for token in tokens {
                prop_assert!(token.start >= last_end);
                prop_assert!(token.start < token.end);
                prop_assert!(token.end <= src.len());
                prop_assert!(src.is_char_boundary(token.start));
                prop_assert!(src.is_char_boundary(token.end));
                last_end = token.end;
            }
        }
    }

    /// PROPERTY: Scanning any script source yields a module or an error.
    #[test]
    fn property_parse_script_never_panics(src in token_soup()) {
        let _ = parse_module("src/fuzz.ts", SourceKind::Ts, &src);
        let _ = parse_module("src/fuzz.js", SourceKind::Js, &src);
    }

    /// PROPERTY: Single-file components with arbitrary script bodies never panic.
    #[test]
    fn property_parse_vue_never_panics(script in token_soup(), lang_ts in any::<bool>()) {
        let lang = if lang_ts { " lang=\"ts\"" } else { "" };
        let src = format!(
            "<template><div /></template>\n<script{}>\n{}\n</script>\n<style>.a {{}}</style>\n",
            lang, script
        );
        let _ = parse_module("src/Fuzz.vue", SourceKind::Vue, &src);
    }

    /// PROPERTY: Erasing types keeps every plain identifier of a JS module.
    #[test]
    fn property_plain_javascript_is_kept(
        names in proptest::collection::vec("[a-z][a-z0-9]{2,8}", 1..6),
    ) {
        let src: String = names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("const v{}_{} = {};\n", i, name, i))
            .collect();
        let module = parse_module("src/plain.js", SourceKind::Js, &src).unwrap();
        let body = module.body(Vec::new());
        for (i, name) in names.iter().enumerate() {
            let expected = format!("v{}_{}", i, name);
            prop_assert!(body.contains(&expected));
        }
    }
}
