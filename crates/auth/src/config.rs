//! Engine configuration.

use chrono::Duration;

use crate::password::DEFAULT_BCRYPT_COST;

/// Refresh tokens always live seven days.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Immutable settings for [`crate::AuthService`], built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub bcrypt_cost: u32,
    /// Password given to invited staff when the inviter does not set one.
    pub invite_default_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::hours(24),
            refresh_token_ttl: Duration::days(REFRESH_TOKEN_TTL_DAYS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            invite_default_password: "tempPassword123!".to_string(),
        }
    }
}

impl AuthConfig {
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }
}

/// Parse a lifetime like `"24h"`, `"15m"`, `"7d"`, `"90s"` or a bare number of seconds.
pub fn parse_ttl(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: i64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    if value <= 0 {
        return Err(format!("duration must be positive: '{raw}'"));
    }

    match unit {
        "" | "s" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" => Ok(Duration::hours(value)),
        "d" => Ok(Duration::days(value)),
        other => Err(format!("unknown duration unit '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = AuthConfig::default();
        assert_eq!(cfg.access_token_ttl, Duration::hours(24));
        assert_eq!(cfg.refresh_token_ttl, Duration::days(7));
        assert!(cfg.bcrypt_cost >= 12);
    }

    #[test]
    fn parse_ttl_units() {
        assert_eq!(parse_ttl("24h"), Ok(Duration::hours(24)));
        assert_eq!(parse_ttl("15m"), Ok(Duration::minutes(15)));
        assert_eq!(parse_ttl("7d"), Ok(Duration::days(7)));
        assert_eq!(parse_ttl("90"), Ok(Duration::seconds(90)));
        assert!(parse_ttl("0h").is_err());
        assert!(parse_ttl("1w").is_err());
        assert!(parse_ttl("h").is_err());
    }
}
