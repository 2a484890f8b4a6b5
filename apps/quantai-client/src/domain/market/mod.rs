//! Snapshot payloads: quick stats, search hits and admin user records.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::chart::WireCandle;
use super::wire::{lenient_f64, null_as_default};

/// `GET /api/quick-stats/{ticker}` response.
///
/// Fast path for the dashboard header; arrives well before the analysis
/// stream produces anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickStats {
    /// Upper-cased ticker.
    #[serde(deserialize_with = "null_as_default")]
    pub ticker: String,
    /// Short company name.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Last price.
    pub price: Option<Decimal>,
    /// Daily change in percent.
    #[serde(rename = "changePercent")]
    pub change_percent: Option<Decimal>,
    /// Recommendation score, when the backend has a cached analysis.
    #[serde(deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    /// Recommendation label, when the backend has a cached analysis.
    pub recommendation: Option<String>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Headline metrics (`pe_ratio`, `beta`).
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: BTreeMap<String, serde_json::Value>,
    /// One month of daily candles keyed by `date`.
    #[serde(rename = "chartData", deserialize_with = "null_as_default")]
    pub chart_data: Vec<WireCandle>,
}

/// `GET /api/search?q=` result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Ticker symbol.
    pub symbol: String,
    /// Short name.
    #[serde(default)]
    pub name: String,
    /// Listing exchange code.
    #[serde(default = "unknown_exchange")]
    pub exchange: String,
}

fn unknown_exchange() -> String {
    "N/A".to_string()
}

/// `GET /api/admin/users` row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdminUser {
    /// Identity provider user id.
    pub uid: String,
    /// Sign-in email.
    pub email: Option<String>,
    /// Display name.
    #[serde(alias = "displayName")]
    pub name: Option<String>,
    /// Pro entitlement.
    #[serde(deserialize_with = "null_as_default")]
    pub is_pro: bool,
    /// Account creation time as an ISO-8601 string.
    pub created_at: Option<String>,
    /// Analyses run so far.
    #[serde(deserialize_with = "null_as_default")]
    pub analysis_count: u32,
}

impl AdminUser {
    /// Name for listings: display name, then email, then uid.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quick_stats_tolerates_nulls() {
        let stats: QuickStats = serde_json::from_str(
            r#"{"ticker":"AAPL","name":null,"price":189.5,"changePercent":-1.25,
                "market_cap":2.9e12,"metrics":{"pe_ratio":null,"beta":1.2},
                "chartData":[{"date":"01/02","open":1,"high":2,"low":1,"close":2,"volume":5}]}"#,
        )
        .unwrap();
        assert_eq!(stats.name, "");
        assert_eq!(stats.change_percent, Some(dec!(-1.25)));
        assert_eq!(stats.chart_data.len(), 1);
    }

    #[test]
    fn search_hit_defaults_exchange() {
        let hit: SearchHit = serde_json::from_str(r#"{"symbol":"NVDA","name":"NVIDIA"}"#).unwrap();
        assert_eq!(hit.exchange, "N/A");
    }

    #[test]
    fn admin_user_reads_camel_case() {
        let user: AdminUser = serde_json::from_str(
            r#"{"uid":"u1","email":"a@b.c","isPro":true,"createdAt":"2024-05-01T00:00:00Z","analysisCount":null}"#,
        )
        .unwrap();
        assert!(user.is_pro);
        assert_eq!(user.analysis_count, 0);
        assert_eq!(user.label(), "a@b.c");
    }
}
