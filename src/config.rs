use serde::Deserialize;

pub const DEFAULT_OFFICER_REGISTRY_URL: &str = "https://api.company-information.service.gov.uk";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Companies House API key. Optional: director search is rejected with a
    /// configuration error when unset or left at a placeholder value.
    pub officer_registry_api_key: Option<String>,
    /// Base URL of the officer registry; overridable for tests.
    pub officer_registry_base_url: String,
    /// Payment provider secret key. Optional: when unset the service runs
    /// with free (ungated) searches.
    pub payment_secret_key: Option<String>,
    /// Public base URL used to build checkout redirect targets.
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable required"))
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port,
            officer_registry_api_key: std::env::var("COMPANIES_HOUSE_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            officer_registry_base_url: std::env::var("OFFICER_REGISTRY_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OFFICER_REGISTRY_URL.to_string()),
            payment_secret_key: std::env::var("PAYMENT_SECRET_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Database URL: {}...", redact(&config.database_url));
        tracing::debug!(
            "Officer registry base URL: {}",
            config.officer_registry_base_url
        );
        if config.officer_registry_api_key.is_some() {
            tracing::info!("Officer registry API key configured");
        } else {
            tracing::warn!("Officer registry API key not set; director search disabled");
        }
        if config.payment_secret_key.is_some() {
            tracing::info!("Payment provider configured; searches are payment-gated");
        } else {
            tracing::warn!("Payment provider not configured; searches are free");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// The officer registry key, rejecting obvious placeholders from sample
    /// env files.
    pub fn usable_officer_registry_key(&self) -> Option<&str> {
        self.officer_registry_api_key
            .as_deref()
            .filter(|k| *k != "your_api_key_here")
    }

    /// Whether the payment gate is active (a real provider key is present).
    pub fn payments_enabled(&self) -> bool {
        self.payment_secret_key
            .as_deref()
            .map(|k| k != "sk_test_your_secret_key_here")
            .unwrap_or(false)
    }
}

/// First 20 characters of a connection string, for log redaction.
fn redact(url: &str) -> String {
    url.chars().take(20).collect()
}
