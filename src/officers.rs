use crate::errors::AppError;
use serde::Deserialize;
use std::time::Duration;

/// Default page size requested from the officer search endpoint. We ask for
/// more than we ultimately use because corporate officers are filtered out
/// after the fact.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Per-call timeout against the officer registry.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Lexical indicators that an officer record names a corporate entity
/// rather than an individual person.
const CORPORATE_INDICATORS: [&str; 17] = [
    "LTD",
    "LIMITED",
    "LLP",
    "PLC",
    "INC",
    "INCORPORATED",
    "CORP",
    "CORPORATION",
    "LLC",
    "CO.",
    "& CO",
    "PARTNERS",
    "TRUSTEES",
    "TRUST",
    "SECRETARIAL",
    "SERVICES",
    "NOMINEES",
];

/// Whether an officer name appears to be a corporate entity.
pub fn is_corporate_officer(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let upper = name.to_uppercase();
    CORPORATE_INDICATORS.iter().any(|ind| upper.contains(ind))
}

// ============ Wire types (officer registry JSON) ============
//
// The upstream payloads are loosely typed; every field we rely on is
// explicitly optional here and defaulted at the boundary rather than
// trusted to be present.

#[derive(Debug, Deserialize)]
struct OfficerSearchResponse {
    #[serde(default)]
    items: Vec<OfficerSearchItem>,
}

#[derive(Debug, Deserialize)]
struct OfficerSearchItem {
    #[serde(default)]
    title: String,
    date_of_birth: Option<DateOfBirth>,
    address: Option<OfficerAddress>,
    #[serde(default)]
    appointment_count: i64,
    links: Option<OfficerLinks>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    description_identifiers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct DateOfBirth {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct OfficerAddress {
    pub premises: Option<String>,
    pub address_line_1: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfficerLinks {
    /// Already points at the officer's appointments resource; used verbatim.
    #[serde(rename = "self")]
    self_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppointmentsResponse {
    #[serde(default)]
    items: Vec<AppointmentItem>,
}

#[derive(Debug, Deserialize)]
struct AppointmentItem {
    appointed_to: Option<AppointedTo>,
    #[serde(default)]
    officer_role: String,
    #[serde(default)]
    appointed_on: String,
    #[serde(default)]
    resigned_on: String,
}

#[derive(Debug, Deserialize)]
struct AppointedTo {
    #[serde(default)]
    company_number: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    company_status: String,
}

// ============ Domain types ============

/// An individual officer returned by the registry search (corporate officers
/// are dropped before this type is built). Transient: never persisted.
#[derive(Debug, Clone)]
pub struct Officer {
    pub name: String,
    pub date_of_birth: Option<DateOfBirth>,
    pub address: Option<OfficerAddress>,
    pub appointment_count: i64,
    /// Link to this officer's appointments resource, when provided.
    pub appointments_link: Option<String>,
    /// Derived from presence of a birth date or a "born-on" descriptor.
    pub is_individual: bool,
    pub description: String,
}

/// One company appointment held by an officer. Used only to build the
/// company-number set searched locally; never stored.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub company_number: String,
    pub company_name: String,
    pub officer_role: String,
    pub appointed_on: String,
    pub resigned_on: String,
    pub company_status: String,
}

/// Client for the external officer/company registry (Companies House style).
///
/// Authenticates with HTTP Basic, API key as username and empty password.
/// Both operations are read-only GETs with a 15-second per-call timeout.
#[derive(Clone)]
pub struct OfficerDirectoryClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl OfficerDirectoryClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create officer registry client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Search officers by name, keeping only individuals.
    ///
    /// HTTP status is mapped 1:1 to the error taxonomy; nothing is retried
    /// here; upstream errors are terminal for the request.
    pub async fn search_officers(
        &self,
        name: &str,
        items_per_page: u32,
    ) -> Result<Vec<Officer>, AppError> {
        let url = format!("{}/search/officers", self.base_url);
        tracing::info!("Searching officer registry for: {}", name);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", name.trim()),
                ("items_per_page", &items_per_page.to_string()),
            ])
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            200 => {}
            401 => {
                return Err(AppError::UpstreamAuth(
                    "Invalid API key - please check COMPANIES_HOUSE_API_KEY is set correctly"
                        .to_string(),
                ))
            }
            429 => {
                return Err(AppError::UpstreamRateLimited(
                    "Rate limit exceeded. Please try again later.".to_string(),
                ))
            }
            400 => {
                let detail = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::UpstreamBadRequest(format!(
                    "Bad request to officer registry: {}",
                    truncate(&detail, 200)
                )));
            }
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::UpstreamUnavailable(format!(
                    "Officer registry error {}: {}",
                    status.as_u16(),
                    truncate(&body, 200)
                )));
            }
        }

        let data: OfficerSearchResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!(
                "Failed to parse officer registry response: {}",
                e
            ))
        })?;

        let mut officers = Vec::new();
        for item in data.items {
            // Only individual people; corporate officers are dropped.
            if is_corporate_officer(&item.title) {
                continue;
            }

            let has_dob = item.date_of_birth.is_some();
            let has_born_on = item
                .description_identifiers
                .iter()
                .any(|d| d == "born-on");

            officers.push(Officer {
                name: item.title,
                date_of_birth: item.date_of_birth,
                address: item.address,
                appointment_count: item.appointment_count,
                appointments_link: item.links.and_then(|l| l.self_link),
                is_individual: has_dob || has_born_on,
                description: item.description,
            });
        }

        tracing::info!("Officer registry returned {} individual officers", officers.len());
        Ok(officers)
    }

    /// Fetch one officer's company appointments.
    ///
    /// Best-effort per officer: any failure is swallowed (logged, empty list
    /// returned) so a single bad officer never aborts the whole pipeline.
    /// The link from the search step already points at the appointments
    /// resource, so no suffix is appended.
    pub async fn appointments(&self, officer_link: &str) -> Vec<Appointment> {
        if officer_link.is_empty() {
            return Vec::new();
        }

        let url = format!("{}{}", self.base_url, officer_link);

        let response = match self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Appointments fetch failed for {}: {}", officer_link, e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Appointments fetch for {} returned {}",
                officer_link,
                response.status()
            );
            return Vec::new();
        }

        let data: AppointmentsResponse = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Failed to parse appointments for {}: {}", officer_link, e);
                return Vec::new();
            }
        };

        data.items
            .into_iter()
            .filter_map(|item| {
                let appointed_to = item.appointed_to?;
                // Only appointments that carry a company number are usable.
                if appointed_to.company_number.trim().is_empty() {
                    return None;
                }
                Some(Appointment {
                    company_number: appointed_to.company_number,
                    company_name: appointed_to.company_name,
                    officer_role: item.officer_role,
                    appointed_on: item.appointed_on,
                    resigned_on: item.resigned_on,
                    company_status: appointed_to.company_status,
                })
            })
            .collect()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
