// ABOUTME: Typed environment variable parsing helpers
// ABOUTME: Reads env vars with defaults, warning on malformed values

use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Parse an environment variable into `T`, falling back to `default` when the
/// variable is unset. A set-but-malformed value logs a warning and yields the
/// default rather than failing startup.
pub fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Ignoring invalid value {:?} for {}, using default {}",
                    raw, name, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Read a string-valued environment variable with a default.
pub fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_env_returns_default_when_unset() {
        std::env::remove_var("CRUCIBLE_TEST_UNSET_VAR");
        assert_eq!(parse_env("CRUCIBLE_TEST_UNSET_VAR", 42u16), 42);
    }

    #[test]
    fn parse_env_reads_valid_value() {
        std::env::set_var("CRUCIBLE_TEST_VALID_VAR", "8080");
        assert_eq!(parse_env("CRUCIBLE_TEST_VALID_VAR", 42u16), 8080);
        std::env::remove_var("CRUCIBLE_TEST_VALID_VAR");
    }

    #[test]
    fn parse_env_falls_back_on_garbage() {
        std::env::set_var("CRUCIBLE_TEST_GARBAGE_VAR", "not-a-number");
        assert_eq!(parse_env("CRUCIBLE_TEST_GARBAGE_VAR", 7u32), 7);
        std::env::remove_var("CRUCIBLE_TEST_GARBAGE_VAR");
    }

    #[test]
    fn env_or_uses_default() {
        std::env::remove_var("CRUCIBLE_TEST_STRING_VAR");
        assert_eq!(env_or("CRUCIBLE_TEST_STRING_VAR", "0.0.0.0"), "0.0.0.0");
    }
}
