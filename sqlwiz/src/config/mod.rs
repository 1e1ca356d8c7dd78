// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Config loader and validator
//
// Loads sqlwiz.yaml, checks the contract version, resolves `${VAR}`
// interpolation, and fills defaults for the service endpoints and the
// stream idle deadline.

mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::load_config;
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn load(yaml: &str) -> Result<Config, ConfigError> {
        load_config(&StringSource {
            content: yaml.to_string(),
        })
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = load("sqlwiz: v1\n").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.query_url(), "http://localhost:8000/api/query");
        assert_eq!(config.api.upload_url(), "http://localhost:8000/api/upload");
        assert_eq!(config.stream.idle_timeout(), None);
    }

    #[test]
    fn full_config_parses_all_fields() {
        let config = load(
            r#"
sqlwiz: v1
api:
  base_url: "https://sql.internal.example/"
  query_path: /v2/query
  upload_path: /v2/documents
  connect_timeout_ms: 2500
stream:
  idle_timeout_ms: 30000
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://sql.internal.example");
        assert_eq!(config.api.query_url(), "https://sql.internal.example/v2/query");
        assert_eq!(
            config.api.upload_url(),
            "https://sql.internal.example/v2/documents"
        );
        assert_eq!(config.api.connect_timeout_ms, Some(2500));
        assert_eq!(
            config.stream.idle_timeout(),
            Some(Duration::from_millis(30_000))
        );
    }

    #[test]
    fn unsupported_version_rejected() {
        let err = load("sqlwiz: v2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("v2"));
    }

    #[test]
    fn missing_version_is_yaml_error() {
        let err = load("api:\n  base_url: http://x\n").unwrap_err();
        assert!(matches!(err, ConfigError::YamlError(_)));
    }

    #[test]
    fn unknown_field_rejected() {
        let err = load("sqlwiz: v1\napi:\n  base_uri: http://x\n").unwrap_err();
        assert!(err.to_string().contains("base_uri"));
    }

    #[test]
    fn base_url_without_scheme_rejected() {
        let err = load("sqlwiz: v1\napi:\n  base_url: localhost:8000\n").unwrap_err();
        assert!(err.to_string().contains("api.base_url"));
    }

    #[test]
    fn relative_path_rejected() {
        let err = load("sqlwiz: v1\napi:\n  query_path: api/query\n").unwrap_err();
        assert!(err.to_string().contains("api.query_path"));
    }

    #[test]
    fn zero_idle_timeout_rejected() {
        let err = load("sqlwiz: v1\nstream:\n  idle_timeout_ms: 0\n").unwrap_err();
        assert!(err.to_string().contains("stream.idle_timeout_ms"));
    }

    #[test]
    fn base_url_interpolated_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("SQLWIZ_TEST_HOST", "db-assistant:9000");
        let config = load("sqlwiz: v1\napi:\n  base_url: \"http://${SQLWIZ_TEST_HOST}\"\n").unwrap();
        std::env::remove_var("SQLWIZ_TEST_HOST");

        assert_eq!(config.api.base_url, "http://db-assistant:9000");
    }

    #[test]
    fn undefined_variable_fails_with_clear_error() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::remove_var("SQLWIZ_TEST_UNSET");
        let err = load("sqlwiz: v1\napi:\n  base_url: \"http://${SQLWIZ_TEST_UNSET}\"\n")
            .unwrap_err();

        match err {
            ConfigError::UndefinedVariable { name } => assert_eq!(name, "SQLWIZ_TEST_UNSET"),
            other => panic!("expected UndefinedVariable, got {other:?}"),
        }
    }

    #[test]
    fn malformed_references_kept_literally() {
        assert_eq!(resolve_variables("a ${ b").unwrap(), "a ${ b");
        assert_eq!(resolve_variables("${}").unwrap(), "${}");
        assert_eq!(resolve_variables("$HOME").unwrap(), "$HOME");
    }

    #[test]
    fn multiple_variables_in_one_string() {
        let _guard = ENV_MUTEX.lock().unwrap();
        std::env::set_var("SQLWIZ_TEST_A", "alpha");
        std::env::set_var("SQLWIZ_TEST_B", "beta");
        let resolved = resolve_variables("${SQLWIZ_TEST_A}/${SQLWIZ_TEST_B}").unwrap();
        std::env::remove_var("SQLWIZ_TEST_A");
        std::env::remove_var("SQLWIZ_TEST_B");

        assert_eq!(resolved, "alpha/beta");
    }

    #[test]
    fn file_source_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = load_config(&FileSource { path: path.clone() }).unwrap_err();

        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }
}
