//! Loading configuration from disk.

use std::io::Write;

use gatekeeper::config::{load_config, ConfigError, MatchKind, SessionProvider};
use gatekeeper::session::Role;
use gatekeeper::Gatekeeper;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_full_config_loads_and_compiles() {
    let file = write_config(
        r#"
        [listener]
        bind_address = "127.0.0.1:9000"

        [rate_limit]
        max = 20
        window_ms = 30000

        [rate_limit.contact]
        limit = 3
        window_ms = 60000

        [[routes]]
        name = "admin"
        path = "/admin"
        surface = "page"
        access = "protected"
        role = "ADMIN"

        [[routes]]
        name = "signin"
        path = "/signin"
        match = "exact"
        access = "auth_only"

        [[routes]]
        name = "api"
        path = "/api/"
        surface = "api"
        access = "public"

        [redirects]
        sign_in = "/signin"

        [session]
        provider = "static"

        [[session.users]]
        token = "t-1"
        id = "1"
        email = "root@example.com"
        role = "ADMIN"
        "#,
    );

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    assert_eq!(config.rate_limit.contact.limit, 3);
    assert_eq!(config.routes.len(), 3);
    assert_eq!(config.routes[1].match_kind, MatchKind::Exact);
    assert_eq!(config.routes[0].role, Some(Role::Admin));
    assert_eq!(config.session.provider, SessionProvider::Static);

    let gate = Gatekeeper::from_config(&config).unwrap();
    assert_eq!(gate.classify("/admin/users").name, "admin");
    let api = gate.classify("/api/things");
    assert_eq!(api.rate_limit.map(|r| r.limit()), Some(20));
}

#[test]
fn test_validation_collects_every_error() {
    let file = write_config(
        r#"
        [rate_limit]
        max = 0

        [[routes]]
        name = "bad"
        path = "no-slash"
        access = "protected"

        [redirects]
        sign_in = "https://elsewhere.example"
        "#,
    );

    match load_config(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
            assert!(fields.iter().any(|f| f.starts_with("rate_limit")), "{fields:?}");
            assert!(fields.iter().any(|f| f.starts_with("routes")), "{fields:?}");
            assert!(fields.iter().any(|f| f.starts_with("redirects")), "{fields:?}");
        }
        other => panic!("expected validation errors, got {other:?}"),
    }
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let file = write_config("[rate_limit\nmax = 1");
    assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_short_jwt_secret_is_rejected() {
    let file = write_config(
        r#"
        [session]
        provider = "jwt"
        jwt_secret = "too-short"
        "#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("session.jwt_secret"), "{err}");
}
