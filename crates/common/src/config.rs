//! Process configuration helpers.
//!
//! Configuration is resolved once at process startup and then passed into services as
//! plain structs. Resolution functions take the raw variable values as `Option<String>`
//! so they can be tested without touching the process environment; only the
//! `from_env()` wrappers read `std::env`.

use std::str::FromStr;

/// Errors raised while resolving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable was not set
    #[error("{0} must be set")]
    Missing(&'static str),

    /// A variable was set to a value that could not be parsed
    #[error("invalid {name} '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Result type for configuration resolution.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Reads a variable from the process environment.
///
/// Unset and blank variables both read as `None`.
pub fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional value, falling back to `default` when it is absent.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the value is present but does not parse.
pub fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(value) => parse(name, value),
    }
}

/// Parses an optional value that has no default.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the value is present but does not parse.
pub fn parse_opt<T>(name: &'static str, value: Option<String>) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.map(|value| parse(name, value)).transpose()
}

/// Parses a value that must be present.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] if the value is absent and [`ConfigError::Invalid`] if
/// it does not parse.
pub fn parse_required<T>(name: &'static str, value: Option<String>) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse(name, value.ok_or(ConfigError::Missing(name))?)
}

fn parse<T>(name: &'static str, value: String) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let trimmed = value.trim();
    trimmed.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name,
        reason: e.to_string(),
        value: trimmed.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    #[test]
    fn test_parse_or_uses_default_when_absent() {
        let port: u16 = parse_or("PORT", None, 6001).unwrap();
        assert_eq!(port, 6001);
    }

    #[test]
    fn test_parse_or_trims_value() {
        let addr: SocketAddr = parse_or(
            "ADDR",
            Some(" 127.0.0.1:7000 ".into()),
            "0.0.0.0:0".parse().unwrap(),
        )
        .unwrap();
        assert_eq!(addr, "127.0.0.1:7000".parse().unwrap());
    }

    #[test]
    fn test_invalid_value_names_the_variable() {
        let err = parse_or::<u16>("DFS_PORT", Some("seventy".into()), 1).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "DFS_PORT", .. }));
        assert!(err.to_string().contains("seventy"));
    }

    #[test]
    fn test_parse_required_and_optional() {
        assert!(matches!(
            parse_required::<String>("DFS_ROOT", None),
            Err(ConfigError::Missing("DFS_ROOT"))
        ));
        assert_eq!(parse_opt::<u16>("P", None).unwrap(), None);
        assert_eq!(parse_opt::<u16>("P", Some("9".into())).unwrap(), Some(9));
    }
}
