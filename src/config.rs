// src/config.rs

use std::env;

use dotenvy::dotenv;

use crate::models::attempt::{AttemptPolicy, MAX_GRACE_SECONDS};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    /// When set, tokens must carry this `iss` claim.
    pub jwt_issuer: Option<String>,
    pub rust_log: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub attempt_policy: AttemptPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set")?;

        let jwt_issuer = env::var("JWT_ISSUER").ok().filter(|s| !s.trim().is_empty());

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let port = parse_or("PORT", env::var("PORT").ok(), 3000)?;
        let database_max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            env::var("DATABASE_MAX_CONNECTIONS").ok(),
            5,
        )?;

        let cors_origins = split_origins(
            env::var("CORS_ORIGINS")
                .as_deref()
                .unwrap_or("http://localhost:3000,http://127.0.0.1:3000"),
        );

        let attempt_policy = AttemptPolicy {
            enforce_time_limit: parse_bool(
                "ATTEMPT_ENFORCE_TIME_LIMIT",
                env::var("ATTEMPT_ENFORCE_TIME_LIMIT").ok(),
                true,
            )?,
            grace_seconds: parse_grace(env::var("ATTEMPT_GRACE_SECONDS").ok())?,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            jwt_secret,
            jwt_issuer,
            rust_log,
            port,
            cors_origins,
            attempt_policy,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, String> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| format!("{name} has an invalid value: {value}")),
    }
}

fn parse_bool(name: &str, raw: Option<String>, default: bool) -> Result<bool, String> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(format!("{name} must be a boolean, got {v}")),
    }
}

fn parse_grace(raw: Option<String>) -> Result<i64, String> {
    let seconds = parse_or("ATTEMPT_GRACE_SECONDS", raw, 30)?;
    if !(0..=MAX_GRACE_SECONDS).contains(&seconds) {
        return Err(format!(
            "ATTEMPT_GRACE_SECONDS must be between 0 and {MAX_GRACE_SECONDS}, got {seconds}"
        ));
    }
    Ok(seconds)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_missing() {
        assert_eq!(parse_or::<u16>("PORT", None, 3000).unwrap(), 3000);
        assert_eq!(parse_or::<u16>("PORT", Some(" 8080 ".into()), 3000).unwrap(), 8080);
        assert!(parse_or::<u16>("PORT", Some("eighty".into()), 3000).is_err());
    }

    #[test]
    fn test_parse_bool_accepts_common_spellings() {
        assert!(parse_bool("X", Some("TRUE".into()), false).unwrap());
        assert!(!parse_bool("X", Some("off".into()), true).unwrap());
        assert!(parse_bool("X", None, true).unwrap());
        assert!(parse_bool("X", Some("maybe".into()), true).is_err());
    }

    #[test]
    fn test_grace_seconds_must_be_in_range() {
        assert_eq!(parse_grace(None).unwrap(), 30);
        assert_eq!(parse_grace(Some("0".into())).unwrap(), 0);
        assert_eq!(parse_grace(Some("86400".into())).unwrap(), MAX_GRACE_SECONDS);
        assert!(parse_grace(Some("-1".into())).is_err());
        assert!(parse_grace(Some("86401".into())).is_err());
        assert!(parse_grace(Some("9223372036854775807".into())).is_err());
    }

    #[test]
    fn test_split_origins_skips_blanks() {
        let origins = split_origins("http://a.test, ,http://b.test,");
        assert_eq!(origins, vec!["http://a.test", "http://b.test"]);
    }
}
