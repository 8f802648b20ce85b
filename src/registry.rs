use crate::errors::{AppError, ResultExt};
use crate::models::PropertyRecord;
use async_trait::async_trait;
use sqlx::PgPool;

/// Row cap on the address path (matches the batch path).
pub const ADDRESS_RESULT_CAP: i64 = 500;
/// Row cap on the director batch path.
pub const BATCH_RESULT_CAP: i64 = 500;
/// Row cap on the name substring path. The name path is otherwise the one
/// unbounded query in the system; a short query like "LTD" would match most
/// of the table.
pub const NAME_RESULT_CAP: i64 = 2000;

/// Read-only queries over the properties/proprietors tables.
///
/// Contract for all query methods: input is pre-normalized by the caller
/// (`normalize::normalize_identifier` for registration numbers,
/// `normalize::normalize_text` for substring queries); every path returns
/// the same joined `PropertyRecord` row shape.
#[async_trait]
pub trait PropertyRegistry: Send + Sync {
    /// Exact match on normalized company registration number, ordered by
    /// property address. No cap: registration numbers are highly selective.
    async fn by_company_number(&self, key: &str) -> Result<Vec<PropertyRecord>, AppError>;

    /// Case-insensitive substring match on proprietor name, ordered by
    /// (proprietor name, address).
    async fn by_company_name(&self, name_key: &str) -> Result<Vec<PropertyRecord>, AppError>;

    /// Case-insensitive substring match on property address OR postcode
    /// (either field matching is sufficient), ordered by address.
    async fn by_address(&self, text_key: &str) -> Result<Vec<PropertyRecord>, AppError>;

    /// Batch variant of `by_company_number` for the director pipeline,
    /// ordered by (proprietor name, address).
    async fn by_company_numbers(&self, keys: &[String]) -> Result<Vec<PropertyRecord>, AppError>;

    /// Distinct non-blank proprietor names: the fuzzy-suggestion candidate
    /// universe.
    async fn proprietor_names(&self) -> Result<Vec<String>, AppError>;
}

/// SQL fragment normalizing a stored registration number the same way
/// `normalize_identifier` normalizes the query side. Symmetry here is the
/// load-bearing invariant of number and director search.
const NORMALIZED_REG_NO: &str = "UPPER(REPLACE(REPLACE(REPLACE(REPLACE(TRIM(pr.company_registration_no), '(', ''), ')', ''), ' ', ''), '-', ''))";

const RECORD_COLUMNS: &str = r#"
    p.id,
    p.title_number,
    p.tenure,
    p.property_address,
    p.district,
    p.county,
    p.region,
    p.postcode,
    p.price_paid,
    p.date_proprietor_added,
    pr.proprietor_name,
    pr.proprietorship_category,
    pr.address_line_1,
    pr.address_line_2,
    pr.address_line_3,
    pr.company_registration_no
"#;

/// Postgres-backed registry store.
pub struct PgRegistry {
    pool: PgPool,
}

impl PgRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRegistry for PgRegistry {
    async fn by_company_number(&self, key: &str) -> Result<Vec<PropertyRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM properties p
            INNER JOIN proprietors pr ON p.id = pr.property_id
            WHERE {NORMALIZED_REG_NO} = $1
            ORDER BY p.property_address
            "#
        );

        let rows = sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(key)
            .fetch_all(&self.pool)
            .await
            .context("Company number query failed")?;

        tracing::debug!("by_company_number({}) -> {} rows", key, rows.len());
        Ok(rows)
    }

    async fn by_company_name(&self, name_key: &str) -> Result<Vec<PropertyRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM properties p
            INNER JOIN proprietors pr ON p.id = pr.property_id
            WHERE UPPER(TRIM(pr.proprietor_name)) LIKE $1
            ORDER BY pr.proprietor_name, p.property_address
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(format!("%{}%", name_key))
            .bind(NAME_RESULT_CAP)
            .fetch_all(&self.pool)
            .await
            .context("Company name query failed")?;

        tracing::debug!("by_company_name({}) -> {} rows", name_key, rows.len());
        Ok(rows)
    }

    async fn by_address(&self, text_key: &str) -> Result<Vec<PropertyRecord>, AppError> {
        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM properties p
            INNER JOIN proprietors pr ON p.id = pr.property_id
            WHERE UPPER(TRIM(p.property_address)) LIKE $1
               OR UPPER(TRIM(p.postcode)) LIKE $1
            ORDER BY p.property_address
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(format!("%{}%", text_key))
            .bind(ADDRESS_RESULT_CAP)
            .fetch_all(&self.pool)
            .await
            .context("Address query failed")?;

        tracing::debug!("by_address({}) -> {} rows", text_key, rows.len());
        Ok(rows)
    }

    async fn by_company_numbers(&self, keys: &[String]) -> Result<Vec<PropertyRecord>, AppError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM properties p
            INNER JOIN proprietors pr ON p.id = pr.property_id
            WHERE {NORMALIZED_REG_NO} = ANY($1)
            ORDER BY pr.proprietor_name, p.property_address
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, PropertyRecord>(&sql)
            .bind(keys)
            .bind(BATCH_RESULT_CAP)
            .fetch_all(&self.pool)
            .await
            .context("Batch company number query failed")?;

        tracing::debug!("by_company_numbers({} keys) -> {} rows", keys.len(), rows.len());
        Ok(rows)
    }

    async fn proprietor_names(&self) -> Result<Vec<String>, AppError> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT proprietor_name
            FROM proprietors
            WHERE proprietor_name IS NOT NULL AND TRIM(proprietor_name) != ''
            ORDER BY proprietor_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Proprietor name query failed")?;

        Ok(names.into_iter().map(|(n,)| n).collect())
    }
}
