use std::{env, fmt::Display, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads and parses the environment variable `name`.
///
/// Returns `Ok(None)` if the variable is not set, and `Err` with a human-readable message if it is set but cannot be
/// parsed. Callers decide what the fallback is.
pub fn parse_env<T>(name: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|e| format!("{name}={s} is invalid. {e}")),
        Err(_) => Ok(None),
    }
}
