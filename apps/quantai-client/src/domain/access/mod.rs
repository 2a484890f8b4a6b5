//! Access Decisions
//!
//! Whether a ticker request gets the snapshot only, the snapshot plus the
//! streamed analysis, or the paywall. The backend remains authoritative:
//! a 401/403 on the analysis stream shows the paywall regardless of what
//! was planned here.

use serde::{Deserialize, Serialize};

use super::wire::null_as_default;

/// Analyses a free account may run.
pub const FREE_ANALYSIS_QUOTA: u32 = 1;

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Provider user id.
    pub uid: String,
    /// Sign-in email, when the provider exposes one.
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(uid: impl Into<String>, email: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email,
        }
    }

    /// Whether this identity matches the allow-listed admin email.
    ///
    /// Comparison is case-insensitive. No admin email configured means no
    /// one is admin.
    #[must_use]
    pub fn is_admin(&self, admin_email: Option<&str>) -> bool {
        match (self.email.as_deref(), admin_email) {
            (Some(mine), Some(admin)) => mine.eq_ignore_ascii_case(admin.trim()),
            _ => false,
        }
    }
}

/// `GET /api/user-profile` response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    /// Pro entitlement.
    #[serde(deserialize_with = "null_as_default")]
    pub is_pro: bool,
    /// Pro preference: run the analysis as soon as a ticker opens.
    #[serde(deserialize_with = "null_as_default")]
    pub auto_analysis: bool,
    /// Analyses run so far.
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_count: u32,
}

impl UserProfile {
    /// Free account with its quota used up.
    #[must_use]
    pub const fn quota_exhausted(&self) -> bool {
        !self.is_pro && self.analysis_count >= FREE_ANALYSIS_QUOTA
    }

    /// Free analyses left; `None` for Pro accounts.
    #[must_use]
    pub const fn remaining_free(&self) -> Option<u32> {
        if self.is_pro {
            None
        } else {
            Some(FREE_ANALYSIS_QUOTA.saturating_sub(self.analysis_count))
        }
    }

    /// Auto analysis only applies to Pro accounts.
    #[must_use]
    pub const fn auto_analysis_enabled(&self) -> bool {
        self.is_pro && self.auto_analysis
    }
}

/// How the request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The user asked for the analysis.
    Explicit,
    /// A ticker was opened (landing page, deep link, search pick).
    Auto,
}

/// What a ticker request should load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPlan {
    /// Load quick stats and chart; the analysis waits.
    SnapshotOnly {
        /// Show the upgrade prompt.
        paywall: bool,
    },
    /// Load the snapshot, then open the analysis stream.
    SnapshotAndStream,
}

impl AnalysisPlan {
    /// Whether the plan opens the analysis stream.
    #[must_use]
    pub const fn streams(self) -> bool {
        matches!(self, Self::SnapshotAndStream)
    }
}

/// Decide what a ticker request loads.
///
/// An unknown profile (fetch failed or not signed in) counts as a free
/// account with no analyses used.
#[must_use]
pub fn plan_analysis(
    identity: Option<&Identity>,
    profile: Option<&UserProfile>,
    trigger: Trigger,
) -> AnalysisPlan {
    let profile = profile.copied().unwrap_or_default();
    match trigger {
        Trigger::Explicit => {
            if identity.is_none() || profile.quota_exhausted() {
                AnalysisPlan::SnapshotOnly { paywall: true }
            } else {
                AnalysisPlan::SnapshotAndStream
            }
        }
        Trigger::Auto => {
            if identity.is_some() && profile.auto_analysis_enabled() {
                AnalysisPlan::SnapshotAndStream
            } else {
                AnalysisPlan::SnapshotOnly { paywall: false }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn alice() -> Identity {
        Identity::new("u1", Some("alice@example.com".into()))
    }

    const fn profile(is_pro: bool, auto_analysis: bool, analysis_count: u32) -> UserProfile {
        UserProfile {
            is_pro,
            auto_analysis,
            analysis_count,
        }
    }

    #[test]
    fn explicit_without_identity_is_paywalled() {
        assert_eq!(
            plan_analysis(None, None, Trigger::Explicit),
            AnalysisPlan::SnapshotOnly { paywall: true }
        );
    }

    #[test_case(profile(false, false, 0), AnalysisPlan::SnapshotAndStream ; "fresh free account")]
    #[test_case(profile(false, false, 1), AnalysisPlan::SnapshotOnly { paywall: true } ; "free quota used")]
    #[test_case(profile(true, false, 40), AnalysisPlan::SnapshotAndStream ; "pro ignores quota")]
    fn explicit_with_identity(profile: UserProfile, expected: AnalysisPlan) {
        assert_eq!(
            plan_analysis(Some(&alice()), Some(&profile), Trigger::Explicit),
            expected
        );
    }

    #[test]
    fn explicit_with_unknown_profile_streams() {
        assert_eq!(
            plan_analysis(Some(&alice()), None, Trigger::Explicit),
            AnalysisPlan::SnapshotAndStream
        );
    }

    #[test_case(profile(true, true, 0), true ; "pro with auto analysis")]
    #[test_case(profile(true, false, 0), false ; "pro without auto analysis")]
    #[test_case(profile(false, true, 0), false ; "free account ignores preference")]
    fn auto_trigger(profile: UserProfile, streams: bool) {
        assert_eq!(
            plan_analysis(Some(&alice()), Some(&profile), Trigger::Auto).streams(),
            streams
        );
    }

    #[test]
    fn auto_trigger_never_paywalls() {
        assert_eq!(
            plan_analysis(None, None, Trigger::Auto),
            AnalysisPlan::SnapshotOnly { paywall: false }
        );
    }

    #[test]
    fn remaining_free_saturates() {
        assert_eq!(profile(false, false, 3).remaining_free(), Some(0));
        assert_eq!(profile(false, false, 0).remaining_free(), Some(1));
        assert_eq!(profile(true, false, 3).remaining_free(), None);
    }

    #[test]
    fn admin_match_is_case_insensitive() {
        assert!(alice().is_admin(Some("Alice@Example.com")));
        assert!(!alice().is_admin(Some("bob@example.com")));
        assert!(!alice().is_admin(None));
        assert!(!Identity::new("u2", None).is_admin(Some("alice@example.com")));
    }

    #[test]
    fn profile_tolerates_missing_and_null_fields() {
        let parsed: UserProfile =
            serde_json::from_str(r#"{"isPro":true,"analysisCount":null}"#).unwrap();
        assert_eq!(parsed, profile(true, false, 0));
    }
}
