use super::*;

fn env_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key| {
        pairs
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.to_string())
    }
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = load_settings_from(None, env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.page_limit, 10);
    assert!(settings.crm_config().is_err());
}

#[test]
fn file_values_are_overridden_by_environment() {
    let file = r#"
        bind_addr = "0.0.0.0:8080"
        crm_base_url = "https://file.example.com/rest"
        page_limit = 25
    "#;
    let settings = load_settings_from(
        Some(file),
        env_from(&[
            ("TWENTY_API_BASE_URL", "https://env.example.com/rest"),
            ("TWENTY_API_KEY", "env-key"),
        ]),
    );

    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.page_limit, 25);
    assert_eq!(
        settings.crm_base_url.as_deref(),
        Some("https://env.example.com/rest")
    );

    let crm = settings.crm_config().expect("crm config");
    assert_eq!(crm.base_url.as_str(), "https://env.example.com/rest");
    assert_eq!(crm.api_key, "env-key");
}

#[test]
fn app_prefixed_variables_win_over_legacy_names() {
    let settings = load_settings_from(
        None,
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:4000"),
            ("APP__BIND_ADDR", "127.0.0.1:5000"),
            ("APP__PAGE_LIMIT", "500"),
            ("APP__MAX_BODY_BYTES", "2048"),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:5000");
    assert_eq!(settings.page_limit, 100);
    assert_eq!(settings.max_body_bytes, 2048);
}

#[test]
fn file_values_keep_their_toml_types() {
    let file = "bind_addr = \"0.0.0.0:8080\"\npage_limit = 25\n";
    let settings = load_settings_from(Some(file), env_from(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.page_limit, 25);
    assert_eq!(settings.crm_base_url, None);
}

#[test]
fn mistyped_file_value_falls_back_to_defaults() {
    let settings = load_settings_from(Some("page_limit = \"lots\""), env_from(&[]));
    assert_eq!(settings, Settings::default());
}

#[test]
fn malformed_file_is_ignored() {
    let settings = load_settings_from(Some("this is = = not toml"), env_from(&[]));
    assert_eq!(settings, Settings::default());
}

#[test]
fn crm_config_requires_api_key() {
    let settings = load_settings_from(
        None,
        env_from(&[("TWENTY_API_BASE_URL", "https://crm.example.com/rest")]),
    );
    let err = settings.crm_config().expect_err("missing key");
    assert!(err.to_string().contains("TWENTY_API_KEY"));
}
