//! Small helpers for reading process configuration from the environment.
//!
//! Every binary in the fleet builds its own `Config` struct with a
//! `from_env()` constructor; these helpers keep the parsing and default
//! handling consistent across all of them.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use anyhow::{Context, Result};

/// Read a required string variable, with context naming it on failure.
pub fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

/// Read an optional string variable, falling back to `default`.
pub fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Read an optional variable of any `FromStr` type, falling back to `default`
/// when unset, and erroring (with the bad value quoted) when set but
/// unparsable — a misconfigured deployment should fail at startup, not
/// silently fall back.
pub fn optional_parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {name} ({raw:?}): {e}")),
        Err(_) => Ok(default),
    }
}

/// Read an optional boolean variable ("true"/"false", case-insensitive, or
/// "1"/"0"), falling back to `default`.
pub fn optional_bool(name: &str, default: bool) -> Result<bool> {
    match env::var(name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(anyhow::anyhow!("invalid boolean for {name}: {other:?}")),
        },
        Err(_) => Ok(default),
    }
}
