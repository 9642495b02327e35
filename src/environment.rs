use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Returns the trimmed value of an environment variable, treating empty values as unset.
pub fn get_env_var(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Returns the environment variable or `default` when it is unset or empty.
pub fn get_env_var_or(var: &str, default: &str) -> String {
    get_env_var(var).unwrap_or_else(|| default.to_string())
}

/// Retrieves an environment variable that must be present.
pub fn require_env_var(var: &str) -> Result<String> {
    get_env_var(var).with_context(|| format!("{} environment variable not set", var))
}

/// Parses an environment variable, falling back to `default` when it is unset.
///
/// A value that is set but does not parse is an error rather than silently ignored.
pub fn parse_env_var<T>(var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_var(var) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value {:?} for {}: {}", raw, var, e)),
        None => Ok(default),
    }
}

/// Reads a boolean flag. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn get_env_flag(var: &str, default: bool) -> Result<bool> {
    match get_env_var(var) {
        Some(raw) => parse_flag(&raw)
            .with_context(|| format!("Invalid boolean {:?} for {}", raw, var)),
        None => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
