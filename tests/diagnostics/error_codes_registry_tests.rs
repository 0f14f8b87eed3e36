use invoke::diagnostics::{ERROR_CODES, lookup_code, registry::registry_json};

#[test]
fn registry_has_unique_codes() {
    let mut codes = std::collections::HashSet::new();
    for item in ERROR_CODES {
        assert!(
            codes.insert(item.code),
            "duplicate error code in registry: {}",
            item.code
        );
    }
}

#[test]
fn registry_get_finds_codes() {
    for item in ERROR_CODES {
        let found = lookup_code(item.code).expect("code missing from registry");
        assert_eq!(found.title, item.title);
    }
}

#[test]
fn codes_stay_in_the_e2000_block() {
    for item in ERROR_CODES {
        let number: u32 = item.code[1..].parse().expect("numeric code");
        assert!(item.code.starts_with('E'), "{}", item.code);
        assert!((2000..2300).contains(&number), "{} outside E2000-E2299", item.code);
        assert_eq!(item.title, item.title.to_uppercase());
    }
}

#[test]
fn registry_renders_as_json() {
    let json: serde_json::Value = serde_json::from_str(&registry_json()).expect("valid json");
    let entries = json.as_array().expect("array of codes");
    assert_eq!(entries.len(), ERROR_CODES.len());
    assert_eq!(entries[0]["code"], "E2000");
    assert_eq!(entries[0]["title"], "SIGNATURE MISMATCH");
}
