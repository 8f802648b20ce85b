use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Database Models ============

/// One joined property + proprietor row from the land-registry dataset.
///
/// Every query path (number, name, address, director) returns this same row
/// shape. Reference data: loaded in bulk by ingestion tooling, never mutated
/// by the search path.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Internal row id of the property.
    pub id: i64,
    /// Stable external identifier of the land title.
    pub title_number: String,
    /// Tenure (e.g. "Freehold", "Leasehold").
    pub tenure: Option<String>,
    /// Free-text address of the property.
    pub property_address: Option<String>,
    pub district: Option<String>,
    pub county: Option<String>,
    pub region: Option<String>,
    pub postcode: Option<String>,
    /// Price paid in whole pounds, where recorded.
    pub price_paid: Option<i64>,
    pub date_proprietor_added: Option<NaiveDate>,
    /// Name of the owning entity (1..4 proprietors per property in source data).
    pub proprietor_name: Option<String>,
    pub proprietorship_category: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub address_line_3: Option<String>,
    /// Company registration number as stored; may be blank. Compared via
    /// `normalize::normalize_identifier` on both sides.
    pub company_registration_no: Option<String>,
}

/// A recorded payment for a single search, keyed by the provider's checkout
/// session id. The table is the authoritative double-spend guard; the
/// in-memory cache is only a fast path.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub provider_session_id: String,
    pub search_type: String,
    pub search_value: String,
    pub amount_pence: i64,
    pub status: String,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// ============ Search Domain Models ============

/// The four supported search modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Number,
    Name,
    Address,
    Director,
}

impl SearchMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "number" => Some(SearchMode::Number),
            "name" => Some(SearchMode::Name),
            "address" => Some(SearchMode::Address),
            "director" => Some(SearchMode::Director),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Number => "number",
            SearchMode::Name => "name",
            SearchMode::Address => "address",
            SearchMode::Director => "director",
        }
    }

    /// Price of one search in pence. Director searches cost more because
    /// they fan out to the external officer registry.
    pub fn price_pence(&self) -> i64 {
        match self {
            SearchMode::Director => 300,
            _ => 100,
        }
    }

    /// Display label used on checkout line items.
    pub fn label(&self) -> &'static str {
        match self {
            SearchMode::Number => "Company Number Search",
            SearchMode::Name => "Company Name Search",
            SearchMode::Address => "Address Search",
            SearchMode::Director => "Director Search",
        }
    }
}

/// A fuzzy near-match, produced only when a primary search yields zero rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    /// Composite similarity in [0, 100], rounded to one decimal place.
    pub similarity: f64,
}

/// One (officer, appointment) pair surfaced by a director search. Unlike the
/// deduplicated company-number set, this list keeps every pair for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorAppointment {
    pub director_name: String,
    pub company_number: String,
    pub company_name: String,
    pub officer_role: String,
    pub appointed_on: String,
    pub resigned_on: String,
    pub company_status: String,
}

// ============ API Request/Response Models ============

/// Request payload for `POST /api/search` and the export endpoints.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    /// "number", "name", "address", or "director". Defaults to "number".
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default)]
    pub search_value: String,
    /// Checkout session id proving entitlement; required when payments are
    /// configured.
    pub session_id: Option<String>,
}

fn default_search_type() -> String {
    "number".to_string()
}

/// Response payload for `POST /api/search`.
///
/// Error responses never populate `results`; `directors_found` is present
/// only for director-mode searches.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<PropertyRecord>,
    pub count: usize,
    pub suggestions: Vec<Suggestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directors_found: Option<Vec<DirectorAppointment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Diagnostic message for soft zero-result states (e.g. directors found
    /// but no appointments). Not an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_pence: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,
}

/// Request payload for `POST /api/create-checkout`.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default)]
    pub search_value: String,
}

/// Response payload for `POST /api/create-checkout`.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub checkout_url: String,
    pub session_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_is_case_insensitive() {
        assert_eq!(SearchMode::parse("Director"), Some(SearchMode::Director));
        assert_eq!(SearchMode::parse(" number "), Some(SearchMode::Number));
        assert_eq!(SearchMode::parse("postcode"), None);
    }

    #[test]
    fn director_searches_cost_more() {
        assert_eq!(SearchMode::Director.price_pence(), 300);
        assert_eq!(SearchMode::Name.price_pence(), 100);
        assert_eq!(SearchMode::Number.price_pence(), 100);
        assert_eq!(SearchMode::Address.price_pence(), 100);
    }
}
