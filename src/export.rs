use crate::errors::AppError;
use crate::models::{DirectorAppointment, PropertyRecord};
use serde_json::json;

/// Fixed CSV column order for exported result sets.
pub const CSV_COLUMNS: [&str; 12] = [
    "title_number",
    "tenure",
    "property_address",
    "district",
    "county",
    "region",
    "postcode",
    "price_paid",
    "proprietor_name",
    "company_registration_no",
    "proprietorship_category",
    "date_proprietor_added",
];

/// Render an already-computed result set as CSV. Pure serialization: no new
/// search logic, blank cells for missing values.
pub fn to_csv(records: &[PropertyRecord]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(CSV_COLUMNS)
        .map_err(|e| AppError::InternalError(format!("CSV write failed: {}", e)))?;

    for record in records {
        let row = [
            record.title_number.clone(),
            record.tenure.clone().unwrap_or_default(),
            record.property_address.clone().unwrap_or_default(),
            record.district.clone().unwrap_or_default(),
            record.county.clone().unwrap_or_default(),
            record.region.clone().unwrap_or_default(),
            record.postcode.clone().unwrap_or_default(),
            record.price_paid.map(|p| p.to_string()).unwrap_or_default(),
            record.proprietor_name.clone().unwrap_or_default(),
            record.company_registration_no.clone().unwrap_or_default(),
            record.proprietorship_category.clone().unwrap_or_default(),
            record
                .date_proprietor_added
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ];
        writer
            .write_record(&row)
            .map_err(|e| AppError::InternalError(format!("CSV write failed: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::InternalError(format!("CSV write failed: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::InternalError(format!("CSV output not UTF-8: {}", e)))
}

/// Render an already-computed result set as a JSON document. The
/// directors-found list is included only for director-mode exports where it
/// is non-empty.
pub fn to_json(
    search_type: &str,
    search_value: &str,
    records: &[PropertyRecord],
    directors_found: Option<&[DirectorAppointment]>,
) -> serde_json::Value {
    let mut doc = json!({
        "search_type": search_type,
        "search_value": search_value,
        "count": records.len(),
        "properties": records,
    });

    if let Some(directors) = directors_found {
        if !directors.is_empty() {
            doc["directors_found"] = json!(directors);
        }
    }

    doc
}

/// Attachment filename for a CSV export: mode plus the first 20 characters
/// of the query, spaces replaced so the header stays well-formed.
pub fn csv_filename(search_type: &str, search_value: &str) -> String {
    let safe: String = search_value
        .trim()
        .chars()
        .take(20)
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("properties_{}_{}.csv", search_type, safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> PropertyRecord {
        PropertyRecord {
            id: 1,
            title_number: "TT12345".to_string(),
            tenure: Some("Freehold".to_string()),
            property_address: Some("1 High Street, Testville".to_string()),
            district: Some("TESTSHIRE".to_string()),
            county: None,
            region: Some("SOUTH EAST".to_string()),
            postcode: Some("SW1A 1AA".to_string()),
            price_paid: Some(250_000),
            date_proprietor_added: NaiveDate::from_ymd_opt(2019, 4, 1),
            proprietor_name: Some("ACME LIMITED".to_string()),
            proprietorship_category: Some("Limited Company".to_string()),
            address_line_1: None,
            address_line_2: None,
            address_line_3: None,
            company_registration_no: Some("00123456".to_string()),
        }
    }

    #[test]
    fn csv_has_fixed_header_and_blank_optionals() {
        let out = to_csv(&[record()]).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("TT12345,Freehold,"));
        // county is None -> empty cell between region-neighbouring commas
        assert!(row.contains(",TESTSHIRE,,SOUTH EAST,"));
        assert!(row.contains("00123456"));
        assert!(row.ends_with("2019-04-01"));
    }

    #[test]
    fn json_includes_directors_only_when_present() {
        let records = [record()];
        let without = to_json("name", "acme", &records, None);
        assert!(without.get("directors_found").is_none());
        assert_eq!(without["count"], 1);

        let directors = vec![DirectorAppointment {
            director_name: "JANE DOE".to_string(),
            company_number: "00123456".to_string(),
            company_name: "ACME LIMITED".to_string(),
            officer_role: "director".to_string(),
            appointed_on: "2015-01-01".to_string(),
            resigned_on: String::new(),
            company_status: "active".to_string(),
        }];
        let with = to_json("director", "jane doe", &records, Some(&directors));
        assert_eq!(with["directors_found"][0]["director_name"], "JANE DOE");
    }

    #[test]
    fn filename_is_sanitized_and_bounded() {
        assert_eq!(
            csv_filename("name", "Acme Holdings (North) Ltd"),
            "properties_name_Acme_Holdings_North.csv"
        );
    }
}
