//! Resolution orchestrator: drives the normalizer, registry store, fuzzy
//! suggestion engine, and officer directory client through one of four
//! mode-specific pipelines and produces a unified outcome.

use crate::errors::AppError;
use crate::fuzzy::{self, DEFAULT_SUGGESTION_THRESHOLD, DIRECTOR_FALLBACK_THRESHOLD, SUGGESTION_LIMIT};
use crate::models::{DirectorAppointment, PropertyRecord, SearchMode, Suggestion};
use crate::normalize::{normalize_identifier, normalize_text};
use crate::officers::{OfficerDirectoryClient, DEFAULT_PAGE_SIZE};
use crate::registry::PropertyRegistry;
use futures::StreamExt;
use moka::future::Cache;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// At most this many officers have their appointments fetched, bounding
/// worst-case external calls and respecting upstream rate limits.
pub const MAX_OFFICERS: usize = 15;
/// Concurrent in-flight appointment fetches during the director fan-out.
const APPOINTMENT_CONCURRENCY: usize = 4;
/// Aggregate budget for the whole appointment fan-out. Without it the worst
/// case is MAX_OFFICERS sequential 15s timeouts.
const APPOINTMENT_FANOUT_BUDGET: Duration = Duration::from_secs(60);
/// TTL for the cached proprietor-name candidate universe. The dataset is
/// bulk-loaded reference data, so staleness here is harmless.
const NAME_UNIVERSE_TTL: Duration = Duration::from_secs(600);

const NAME_UNIVERSE_KEY: &str = "proprietor_names";

/// Unified result of one search.
///
/// Soft zero-result states (no officers found, officers without
/// appointments) are not errors: they carry a diagnostic `message` and empty
/// `results`. Hard failures surface as `Err(AppError)` from `run` instead.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub results: Vec<PropertyRecord>,
    pub suggestions: Vec<Suggestion>,
    /// Present only for director-mode searches; one entry per
    /// (officer, appointment) pair.
    pub directors_found: Option<Vec<DirectorAppointment>>,
    /// Diagnostic message for soft zero-result states.
    pub message: Option<String>,
}

/// Owns the collaborators a search needs; one instance shared across
/// requests via `AppState`.
pub struct SearchService {
    registry: Arc<dyn PropertyRegistry>,
    officer_client: Option<OfficerDirectoryClient>,
    /// Cached candidate universe for fuzzy suggestions; the registry stays
    /// authoritative.
    name_universe: Cache<&'static str, Arc<Vec<String>>>,
}

impl SearchService {
    pub fn new(
        registry: Arc<dyn PropertyRegistry>,
        officer_client: Option<OfficerDirectoryClient>,
    ) -> Self {
        Self {
            registry,
            officer_client,
            name_universe: Cache::builder()
                .time_to_live(NAME_UNIVERSE_TTL)
                .max_capacity(1)
                .build(),
        }
    }

    /// Execute one search. Single request-scoped execution: no state is kept
    /// between calls beyond the best-effort name-universe cache.
    pub async fn run(&self, mode: SearchMode, raw_query: &str) -> Result<SearchOutcome, AppError> {
        let query = raw_query.trim();
        if query.is_empty() {
            return Err(AppError::BadRequest("Search value is required".to_string()));
        }

        match mode {
            SearchMode::Number => self.by_number(query).await,
            SearchMode::Name => self.by_name(query).await,
            SearchMode::Address => self.by_address(query).await,
            SearchMode::Director => self.by_director(query).await,
        }
    }

    async fn by_number(&self, query: &str) -> Result<SearchOutcome, AppError> {
        let key = normalize_identifier(query);
        let results = self.registry.by_company_number(&key).await?;
        Ok(SearchOutcome {
            results,
            ..Default::default()
        })
    }

    async fn by_address(&self, query: &str) -> Result<SearchOutcome, AppError> {
        let key = normalize_text(query);
        let results = self.registry.by_address(&key).await?;
        Ok(SearchOutcome {
            results,
            ..Default::default()
        })
    }

    /// Name search: substring match first; fuzzy suggestions only as a
    /// fallback when the primary search yields nothing.
    async fn by_name(&self, query: &str) -> Result<SearchOutcome, AppError> {
        let key = normalize_text(query);
        let results = self.registry.by_company_name(&key).await?;

        if !results.is_empty() {
            return Ok(SearchOutcome {
                results,
                ..Default::default()
            });
        }

        let candidates = self.proprietor_name_universe().await?;
        let suggestions = fuzzy::suggest(
            query,
            &candidates,
            DEFAULT_SUGGESTION_THRESHOLD,
            SUGGESTION_LIMIT,
        );

        tracing::info!(
            "Name search '{}' matched nothing; {} fuzzy suggestions",
            query,
            suggestions.len()
        );

        Ok(SearchOutcome {
            suggestions,
            ..Default::default()
        })
    }

    /// Director pipeline. Terminal on the first applicable branch:
    /// 1. unconfigured registry -> configuration error, no I/O;
    /// 2. officer search error -> propagated verbatim;
    /// 3. no individual officers -> cross-mode fallback to fuzzy
    ///    name suggestions at a looser threshold;
    /// 4. bounded fan-out over the first 15 officers' appointments;
    /// 5. officers but no appointments -> diagnostic soft state;
    /// 6. batch lookup of the accumulated company-number set.
    async fn by_director(&self, query: &str) -> Result<SearchOutcome, AppError> {
        let client = self.officer_client.as_ref().ok_or_else(|| {
            AppError::Configuration(
                "Officer registry API key not configured. Please set COMPANIES_HOUSE_API_KEY."
                    .to_string(),
            )
        })?;

        let officers = client.search_officers(query, DEFAULT_PAGE_SIZE).await?;

        if officers.is_empty() {
            // Degrade to a name-search suggestion: the officer identity
            // search drew a blank, so offer proprietor names instead.
            let candidates = self.proprietor_name_universe().await?;
            let suggestions = fuzzy::suggest(
                query,
                &candidates,
                DIRECTOR_FALLBACK_THRESHOLD,
                SUGGESTION_LIMIT,
            );
            return Ok(SearchOutcome {
                suggestions,
                directors_found: Some(Vec::new()),
                message: Some(
                    "No individual directors found matching this name. Try searching by company name instead."
                        .to_string(),
                ),
                ..Default::default()
            });
        }

        let officer_count = officers.len();
        let fanout = futures::stream::iter(officers.into_iter().take(MAX_OFFICERS).map(
            |officer| async move {
                let appointments = match officer.appointments_link.as_deref() {
                    Some(link) => client.appointments(link).await,
                    None => Vec::new(),
                };
                (officer.name, appointments)
            },
        ))
        .buffered(APPOINTMENT_CONCURRENCY)
        .collect::<Vec<_>>();

        let per_officer = tokio::time::timeout(APPOINTMENT_FANOUT_BUDGET, fanout)
            .await
            .map_err(|_| {
                AppError::UpstreamTimeout(
                    "Director search timed out while fetching appointments. Please try again."
                        .to_string(),
                )
            })?;

        // The set deduplicates company numbers for the batch lookup; the
        // list keeps one entry per (officer, appointment) pair for display.
        let mut company_numbers: HashSet<String> = HashSet::new();
        let mut directors_found: Vec<DirectorAppointment> = Vec::new();

        for (director_name, appointments) in per_officer {
            for appt in appointments {
                company_numbers.insert(normalize_identifier(&appt.company_number));
                directors_found.push(DirectorAppointment {
                    director_name: director_name.clone(),
                    company_number: appt.company_number,
                    company_name: appt.company_name,
                    officer_role: appt.officer_role,
                    appointed_on: appt.appointed_on,
                    resigned_on: appt.resigned_on,
                    company_status: appt.company_status,
                });
            }
        }

        if company_numbers.is_empty() {
            // Distinct from "no officers found": identities matched, but the
            // registry holds no appointments for them.
            return Ok(SearchOutcome {
                directors_found: Some(directors_found),
                message: Some(format!(
                    "Found {} matching directors but none have company appointments in the registry.",
                    officer_count
                )),
                ..Default::default()
            });
        }

        let mut keys: Vec<String> = company_numbers.into_iter().collect();
        keys.sort_unstable();
        let results = self.registry.by_company_numbers(&keys).await?;

        tracing::info!(
            "Director search '{}': {} officers, {} appointments, {} properties",
            query,
            officer_count,
            directors_found.len(),
            results.len()
        );

        Ok(SearchOutcome {
            results,
            directors_found: Some(directors_found),
            ..Default::default()
        })
    }

    async fn proprietor_name_universe(&self) -> Result<Arc<Vec<String>>, AppError> {
        if let Some(cached) = self.name_universe.get(&NAME_UNIVERSE_KEY).await {
            return Ok(cached);
        }

        let names = Arc::new(self.registry.proprietor_names().await?);
        self.name_universe
            .insert(NAME_UNIVERSE_KEY, names.clone())
            .await;
        Ok(names)
    }
}
