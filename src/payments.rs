use crate::errors::{AppError, ResultExt};
use crate::models::{PaymentRecord, SearchMode};
use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// A checkout session as confirmed by the payment provider.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub paid: bool,
    pub search_type: String,
    pub search_value: String,
}

/// A newly created checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Seam for the payment provider's checkout mechanics. The core only needs
/// to create a session and confirm one; everything else about the provider
/// flow stays behind this trait.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn create_session(
        &self,
        mode: SearchMode,
        search_value: &str,
        base_url: &str,
    ) -> Result<CheckoutSession, AppError>;

    async fn retrieve_session(&self, session_id: &str) -> Result<VerifiedSession, AppError>;
}

/// Seam over the double-spend bookkeeping, so the entitlement gate can be
/// exercised without a live database.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Whether this session has already been spent.
    async fn is_used(&self, session_id: &str) -> Result<bool, AppError>;

    /// Atomically consume a verified session. Returns false if another
    /// request consumed it first.
    async fn consume(
        &self,
        session_id: &str,
        mode: SearchMode,
        search_value: &str,
    ) -> Result<bool, AppError>;

    /// Record a pending payment when a checkout session is created.
    async fn record_pending(
        &self,
        session_id: &str,
        mode: SearchMode,
        search_value: &str,
    ) -> Result<(), AppError>;
}

// ============ Provider client (Stripe-compatible REST) ============

#[derive(Debug, Deserialize)]
struct ProviderSessionPayload {
    id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    payment_status: String,
    #[serde(default)]
    metadata: ProviderMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderMetadata {
    #[serde(default)]
    search_type: String,
    #[serde(default)]
    search_value: String,
}

/// Thin REST client for the checkout provider.
#[derive(Clone)]
pub struct CheckoutProvider {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl CheckoutProvider {
    pub fn new(secret_key: String) -> Result<Self, AppError> {
        Self::with_base("https://api.stripe.com".to_string(), secret_key)
    }

    pub fn with_base(api_base: String, secret_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| {
                AppError::InternalError(format!("Failed to create payment client: {}", e))
            })?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }
}

#[async_trait]
impl PaymentVerifier for CheckoutProvider {
    async fn create_session(
        &self,
        mode: SearchMode,
        search_value: &str,
        base_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        let price = mode.price_pence().to_string();
        let description = if search_value.chars().count() > 50 {
            format!("Search for: {}...", search_value.chars().take(50).collect::<String>())
        } else {
            format!("Search for: {}", search_value)
        };
        let success_url = format!(
            "{}/search?session_id={{CHECKOUT_SESSION_ID}}&search_type={}",
            base_url,
            mode.as_str()
        );
        let cancel_url = format!("{}/search?cancelled=true", base_url);

        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("payment_method_types[0]", "card"),
            ("line_items[0][price_data][currency]", "gbp"),
            ("line_items[0][price_data][product_data][name]", mode.label()),
            (
                "line_items[0][price_data][product_data][description]",
                &description,
            ),
            ("line_items[0][price_data][unit_amount]", &price),
            ("line_items[0][quantity]", "1"),
            ("success_url", &success_url),
            ("cancel_url", &cancel_url),
            ("metadata[search_type]", mode.as_str()),
            ("metadata[search_value]", search_value),
        ];

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamUnavailable(format!(
                "Payment provider returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let payload: ProviderSessionPayload = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse checkout session: {}", e))
        })?;

        tracing::info!("Checkout session created: {}", payload.id);
        Ok(CheckoutSession {
            id: payload.id,
            url: payload.url,
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<VerifiedSession, AppError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.api_base, session_id
            ))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::UpstreamUnavailable(
                "Invalid payment session. Please try again.".to_string(),
            ));
        }

        let payload: ProviderSessionPayload = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to parse checkout session: {}", e))
        })?;

        Ok(VerifiedSession {
            paid: payload.payment_status == "paid",
            search_type: payload.metadata.search_type,
            search_value: payload.metadata.search_value,
        })
    }
}

// ============ Ledger ============

/// Double-spend bookkeeping over the `payments` table.
///
/// The table is authoritative and survives restarts; the in-memory cache is
/// only a fast path reconciled on every check.
#[derive(Clone)]
pub struct PaymentLedger {
    pool: PgPool,
    used_sessions: Cache<String, bool>,
}

impl PaymentLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            // 24h TTL; a session id older than that cannot be replayed
            // against the cache anyway because the table check comes next.
            used_sessions: Cache::builder()
                .time_to_live(Duration::from_secs(86_400))
                .max_capacity(100_000)
                .build(),
        }
    }
}

#[async_trait]
impl SessionLedger for PaymentLedger {
    /// Cache first, table authoritative.
    async fn is_used(&self, session_id: &str) -> Result<bool, AppError> {
        if self.used_sessions.get(session_id).await.is_some() {
            return Ok(true);
        }

        let row: Option<PaymentRecord> = sqlx::query_as(
            r#"
            SELECT id, provider_session_id, search_type, search_value, amount_pence, status, used_at, created_at
            FROM payments
            WHERE provider_session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .context("Payment lookup failed")?;

        Ok(row.map(|r| r.used_at.is_some()).unwrap_or(false))
    }

    /// Marks the row used (guarded by `used_at IS NULL`) and upserts it, in
    /// one transaction.
    async fn consume(
        &self,
        session_id: &str,
        mode: SearchMode,
        search_value: &str,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE payments
            SET used_at = NOW(), status = 'used'
            WHERE provider_session_id = $1 AND used_at IS NULL
            "#,
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            // Row may not exist yet (webhook-less flow): insert it as used.
            let inserted = sqlx::query(
                r#"
                INSERT INTO payments (id, provider_session_id, search_type, search_value, amount_pence, status, used_at, created_at)
                VALUES ($1, $2, $3, $4, $5, 'used', NOW(), NOW())
                ON CONFLICT (provider_session_id) DO NOTHING
                "#,
            )
            .bind(uuid::Uuid::new_v4())
            .bind(session_id)
            .bind(mode.as_str())
            .bind(search_value)
            .bind(mode.price_pence())
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if inserted == 0 {
                // Existing row with used_at set: already spent.
                tx.rollback().await?;
                return Ok(false);
            }
        }

        tx.commit().await?;
        self.used_sessions
            .insert(session_id.to_string(), true)
            .await;
        Ok(true)
    }

    async fn record_pending(
        &self,
        session_id: &str,
        mode: SearchMode,
        search_value: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, provider_session_id, search_type, search_value, amount_pence, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
            ON CONFLICT (provider_session_id) DO UPDATE SET status = EXCLUDED.status
            "#,
        )
        .bind(uuid::Uuid::new_v4())
        .bind(session_id)
        .bind(mode.as_str())
        .bind(search_value)
        .bind(mode.price_pence())
        .execute(&self.pool)
        .await
        .context("Payment record failed")?;
        Ok(())
    }
}

// ============ Entitlement gate ============

/// Outcome of an entitlement check. A refusal is not an infrastructure
/// error: the caller gets a structured payment-required response.
#[derive(Debug)]
pub enum Entitlement {
    Granted,
    Refused(String),
}

/// Consolidated entitlement check, injected into the search boundary.
/// `Free` replaces the original's duplicated ungated pipeline; `Gated`
/// verifies and consumes one payment per search.
#[derive(Clone)]
pub enum EntitlementGate {
    Free,
    Gated {
        ledger: Arc<dyn SessionLedger>,
        verifier: Arc<dyn PaymentVerifier>,
    },
}

impl EntitlementGate {
    /// Check that the caller is entitled to run one search of `mode` for
    /// `search_value`, consuming the entitlement on success.
    pub async fn authorize(
        &self,
        mode: SearchMode,
        search_value: &str,
        session_id: Option<&str>,
    ) -> Result<Entitlement, AppError> {
        let (ledger, verifier) = match self {
            EntitlementGate::Free => return Ok(Entitlement::Granted),
            EntitlementGate::Gated { ledger, verifier } => (ledger, verifier),
        };

        let session_id = match session_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => {
                return Ok(Entitlement::Refused(
                    "Payment required. Please complete checkout to search.".to_string(),
                ))
            }
        };

        if ledger.is_used(session_id).await? {
            return Ok(Entitlement::Refused(
                "This payment has already been used. Please make a new payment to search again."
                    .to_string(),
            ));
        }

        let session = verifier.retrieve_session(session_id).await?;

        if !session.paid {
            return Ok(Entitlement::Refused(
                "Payment not completed. Please complete checkout to search.".to_string(),
            ));
        }

        if session.search_type != mode.as_str() {
            return Ok(Entitlement::Refused(
                "Payment was for a different search type. Please make a new payment.".to_string(),
            ));
        }

        if session.search_value.trim().to_lowercase() != search_value.trim().to_lowercase() {
            return Ok(Entitlement::Refused(
                "Payment was for a different search query. Please make a new payment.".to_string(),
            ));
        }

        // Consume exactly once; losing the race means someone else spent it.
        if !ledger.consume(session_id, mode, search_value).await? {
            return Ok(Entitlement::Refused(
                "This payment has already been used. Please make a new payment to search again."
                    .to_string(),
            ));
        }

        tracing::info!("Entitlement consumed for session {}", session_id);
        Ok(Entitlement::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn free_gate_always_grants() {
        let gate = EntitlementGate::Free;
        let decision = gate
            .authorize(SearchMode::Director, "Jane Doe", None)
            .await
            .unwrap();
        assert!(matches!(decision, Entitlement::Granted));
    }
}
