use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Market alerts
// ---------------------------------------------------------------------------

/// One detected market-condition change, as stored by the backend.
/// Read-only from this service's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAlert {
    pub id: String,
    pub market_id: String,
    /// Open vocabulary (e.g. "price_spike", "volume_surge").
    pub alert_type: String,
    pub urgency: Urgency,
    pub headline: String,
    pub price_change: f64,
    pub old_price: f64,
    pub new_price: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    pub market_data: MarketSnapshot,
    /// ISO-8601 timestamp; ordering and windowing key.
    pub created_at: String,
}

/// Denormalized copy of the referenced market at alert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub question: String,
    pub slug: String,
    #[serde(rename = "yesPrice")]
    pub yes_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Urgency::High),
            "MEDIUM" => Ok(Urgency::Medium),
            "LOW" => Ok(Urgency::Low),
            other => Err(format!("unknown urgency '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of `GET /api/alerts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertsResponse {
    pub alerts: Vec<MarketAlert>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_json_uses_backend_field_names() {
        let raw = r#"{
            "id": "a1",
            "market_id": "m1",
            "alert_type": "price_spike",
            "urgency": "HIGH",
            "headline": "Odds jump",
            "price_change": -0.12,
            "old_price": 0.55,
            "new_price": 0.43,
            "market_data": {"question": "Will it rain?", "slug": "will-it-rain", "yesPrice": 0.43},
            "created_at": "2026-10-18T10:00:00.000Z"
        }"#;

        let alert: MarketAlert = serde_json::from_str(raw).unwrap();
        assert_eq!(alert.urgency, Urgency::High);
        assert_eq!(alert.reasoning, None);
        assert_eq!(alert.market_data.yes_price, 0.43);

        let back = serde_json::to_value(&alert).unwrap();
        assert_eq!(back["market_data"]["yesPrice"], 0.43);
        assert_eq!(back["urgency"], "HIGH");
        assert!(back["reasoning"].is_null());
    }

    #[test]
    fn urgency_round_trips_through_text() {
        for u in [Urgency::High, Urgency::Medium, Urgency::Low] {
            assert_eq!(u.to_string().parse::<Urgency>().unwrap(), u);
        }
        assert!("high".parse::<Urgency>().is_err());
    }
}
