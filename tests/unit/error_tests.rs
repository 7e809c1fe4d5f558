//! Unit tests for `AppError` display format and conversions.

use nightfury_client::AppError;

#[test]
fn display_uses_category_prefix() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::Protocol("bad".into()), "protocol: bad"),
        (AppError::Engine("bad".into()), "engine: bad"),
        (AppError::EditConflict("bad".into()), "edit conflict: bad"),
        (AppError::Connection("bad".into()), "connection: bad"),
        (AppError::InvalidRequest("bad".into()), "invalid request: bad"),
        (AppError::NotFound("bad".into()), "not found: bad"),
        (AppError::Io("bad".into()), "io: bad"),
    ];

    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn protocol_error_is_distinct_from_engine_error() {
    let protocol = AppError::Protocol("frame".into());
    let engine = AppError::Engine("frame".into());
    assert_ne!(protocol.to_string(), engine.to_string());
}

#[test]
fn io_error_converts_to_io_variant() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();

    assert!(matches!(err, AppError::Io(_)));
    assert_eq!(err.to_string(), "io: pipe closed");
}

#[test]
fn toml_error_converts_to_config_variant() {
    let parse_err = toml::from_str::<toml::Value>("= broken").expect_err("invalid toml");
    let err: AppError = parse_err.into();

    assert!(err.to_string().starts_with("config: invalid config:"));
}

#[test]
fn error_message_has_no_trailing_period() {
    let err = AppError::Connection("engine unreachable".into());
    let s = err.to_string();
    assert!(
        !s.ends_with('.'),
        "error message must not end with a period: {s}"
    );
}
