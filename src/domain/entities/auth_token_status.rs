use chrono::{DateTime, Utc};
use serde::Serialize;

/// Credential health as reported by a source.
///
/// Fields are private so `has_token == false` always implies `is_valid == false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokenStatus {
    is_valid: bool,
    has_token: bool,
    expires_at: Option<DateTime<Utc>>,
    minutes_remaining: Option<i64>,
}

impl AuthTokenStatus {
    /// No credential on disk (or the source has none at all).
    pub fn missing() -> Self {
        Self {
            is_valid: false,
            has_token: false,
            expires_at: None,
            minutes_remaining: None,
        }
    }

    /// Token present. Without an expiry it is treated as valid.
    pub fn from_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let is_valid = expires_at.map_or(true, |at| at > now);
        let minutes_remaining = expires_at.map(|at| (at - now).num_minutes().max(0));
        Self {
            is_valid,
            has_token: true,
            expires_at,
            minutes_remaining,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn has_token(&self) -> bool {
        self.has_token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn minutes_remaining(&self) -> Option<i64> {
        self.minutes_remaining
    }

    /// Token exists but can no longer be used.
    pub fn is_expired(&self) -> bool {
        self.has_token && !self.is_valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn missing_token_is_never_valid() {
        let status = AuthTokenStatus::missing();
        assert!(!status.has_token());
        assert!(!status.is_valid());
        assert!(!status.is_expired());
    }

    #[test]
    fn expiry_drives_validity_and_remaining_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();

        let fresh = AuthTokenStatus::from_expiry(Some(now + Duration::minutes(45)), now);
        assert!(fresh.is_valid());
        assert_eq!(fresh.minutes_remaining(), Some(45));

        let stale = AuthTokenStatus::from_expiry(Some(now - Duration::minutes(5)), now);
        assert!(stale.is_expired());
        assert_eq!(stale.minutes_remaining(), Some(0));

        let open_ended = AuthTokenStatus::from_expiry(None, now);
        assert!(open_ended.is_valid());
        assert_eq!(open_ended.minutes_remaining(), None);
    }
}
