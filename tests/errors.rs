use rodin3d::{ErrorKind, RodinError};
use std::collections::HashSet;

const ALL_KINDS: [ErrorKind; 10] = [
    ErrorKind::Validation,
    ErrorKind::Auth,
    ErrorKind::NotFound,
    ErrorKind::State,
    ErrorKind::Transport,
    ErrorKind::Timeout,
    ErrorKind::ExpiredLink,
    ErrorKind::GenerationFailed,
    ErrorKind::Io,
    ErrorKind::Api,
];

#[test]
fn test_errors_map_to_their_kind() {
    let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let bad_url = url::Url::parse("not a url").unwrap_err();

    let cases = vec![
        (RodinError::Validation("bad".into()), ErrorKind::Validation),
        (RodinError::Auth("no key".into()), ErrorKind::Auth),
        (RodinError::NotFound("task".into()), ErrorKind::NotFound),
        (RodinError::State("running".into()), ErrorKind::State),
        (
            RodinError::Timeout {
                attempts: 3,
                last_error: None,
            },
            ErrorKind::Timeout,
        ),
        (RodinError::ExpiredLink("url".into()), ErrorKind::ExpiredLink),
        (
            RodinError::GenerationFailed {
                reason: "insufficient credits".into(),
            },
            ErrorKind::GenerationFailed,
        ),
        (
            RodinError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
            ErrorKind::Io,
        ),
        (RodinError::EmptyArtifact("url".into()), ErrorKind::Io),
        (
            RodinError::Api {
                status: 500,
                message: "boom".into(),
            },
            ErrorKind::Api,
        ),
        (RodinError::Decode(decode), ErrorKind::Api),
        (RodinError::Url(bad_url), ErrorKind::Api),
    ];

    for (err, kind) in cases {
        assert_eq!(err.kind(), kind, "{err}");
    }
}

#[test]
fn test_exit_codes_are_distinct_and_clear_of_usage_errors() {
    let codes: HashSet<u8> = ALL_KINDS.iter().map(|k| k.exit_code()).collect();
    assert_eq!(codes.len(), ALL_KINDS.len());
    assert!(codes.iter().all(|&code| code >= 3));

    assert_eq!(ErrorKind::Validation.exit_code(), 4);
    assert_eq!(ErrorKind::Timeout.exit_code(), 9);
    assert_eq!(ErrorKind::Validation.to_string(), "ValidationError");
    assert_eq!(ErrorKind::Io.to_string(), "IOError");
}

#[test]
fn test_transient_classification() {
    let api = |status| RodinError::Api {
        status,
        message: String::new(),
    };
    assert!(api(429).is_transient());
    assert!(api(503).is_transient());
    assert!(!api(418).is_transient());
    assert!(!RodinError::Auth("rejected".into()).is_transient());
    assert!(!RodinError::NotFound("task".into()).is_transient());
}

#[test]
fn test_timeout_message_includes_last_error() {
    let err = RodinError::Timeout {
        attempts: 5,
        last_error: Some("service unavailable".into()),
    };
    assert_eq!(
        err.to_string(),
        "task did not finish after 5 status checks (last error: service unavailable)"
    );
}
