//! Comparison report generation.
//!
//! Renders an [`AggregateResponse`] either as the JSON payload or as a
//! Markdown table with one column per provider.

use anyhow::Result;
use chrono::Utc;

use crate::models::{AggregateResponse, CanonicalPropertyRecord, ProviderResult};
use crate::standardizer::CanonicalField;

/// Generate the JSON payload.
pub fn generate_json_report(response: &AggregateResponse) -> Result<String> {
    serde_json::to_string_pretty(&response.to_payload()).map_err(Into::into)
}

/// Generate a complete Markdown comparison.
pub fn generate_markdown_report(address: &str, response: &AggregateResponse) -> String {
    let mut output = String::new();

    output.push_str("# Property Comparison\n\n");
    output.push_str(&generate_metadata_section(address, response));
    output.push_str(&generate_comparison_table(response));
    output.push_str(&generate_notes_section(response));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(address: &str, response: &AggregateResponse) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Requested Address:** {}\n", address));
    section.push_str(&format!(
        "- **Normalized Address:** {}\n",
        format_optional(response.normalized_address.as_deref())
    ));
    section.push_str(&format!(
        "- **Providers:** {} ({} failed)\n",
        response.len(),
        response.failed_count()
    ));
    section.push_str(&format!(
        "- **Generated:** {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    section
}

/// Generate the field-by-provider table.
fn generate_comparison_table(response: &AggregateResponse) -> String {
    let mut table = String::new();

    table.push_str("| Field |");
    for name in response.providers.keys() {
        table.push_str(&format!(" {} |", name));
    }
    table.push('\n');

    table.push_str("|:---|");
    for _ in response.providers.keys() {
        table.push_str(":---|");
    }
    table.push('\n');

    for field in CanonicalField::ALL {
        table.push_str(&format!("| {} |", field_label(field)));
        for result in response.providers.values() {
            let cell = match result {
                ProviderResult::Success { record, .. } => format_field(record, field),
                ProviderResult::Error { .. } => "—".to_string(),
            };
            table.push_str(&format!(" {} |", cell));
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

/// Per-provider notes: errors and cache hits.
fn generate_notes_section(response: &AggregateResponse) -> String {
    let mut notes = Vec::new();

    for (name, result) in &response.providers {
        match result {
            ProviderResult::Error { message } => {
                notes.push(format!("- ⚠️ **{}:** {}", name, message));
            }
            ProviderResult::Success { cached: true, .. } => {
                notes.push(format!("- **{}:** served from cache", name));
            }
            ProviderResult::Success { .. } => {}
        }
    }

    if notes.is_empty() {
        return String::new();
    }

    format!("## Notes\n\n{}\n", notes.join("\n"))
}

fn field_label(field: CanonicalField) -> &'static str {
    match field {
        CanonicalField::Address => "Address",
        CanonicalField::SquareFootage => "Square Footage",
        CanonicalField::LotSizeAcres => "Lot Size",
        CanonicalField::YearBuilt => "Year Built",
        CanonicalField::PropertyType => "Property Type",
        CanonicalField::Bedrooms => "Bedrooms",
        CanonicalField::Bathrooms => "Bathrooms",
        CanonicalField::RoomCount => "Room Count",
        CanonicalField::SepticSystem => "Septic System",
        CanonicalField::SalePrice => "Sale Price",
    }
}

fn format_field(record: &CanonicalPropertyRecord, field: CanonicalField) -> String {
    match field {
        CanonicalField::Address => format_optional(record.address.as_deref()),
        CanonicalField::SquareFootage => format_optional(record.square_footage.map(group_thousands)),
        CanonicalField::LotSizeAcres => format_lot_size(record.lot_size_acres),
        CanonicalField::YearBuilt => format_optional(record.year_built),
        CanonicalField::PropertyType => format_optional(record.property_type.as_deref()),
        CanonicalField::Bedrooms => format_optional(record.bedrooms),
        CanonicalField::Bathrooms => format_optional(record.bathrooms),
        CanonicalField::RoomCount => format_optional(record.room_count),
        CanonicalField::SepticSystem => format_boolean(record.septic_system),
        CanonicalField::SalePrice => format_price(record.sale_price),
    }
}

/// "N/A" for missing values.
pub fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}

/// e.g. "0.18 Acres".
pub fn format_lot_size(acres: Option<f64>) -> String {
    match acres {
        Some(acres) => format!("{:.2} Acres", acres),
        None => "N/A".to_string(),
    }
}

pub fn format_boolean(value: Option<bool>) -> String {
    match value {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => "N/A".to_string(),
    }
}

/// Whole dollars with thousands separators, e.g. "$1,250,000".
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(price) => format!("${}", group_thousands(price.round() as i64)),
        None => "N/A".to_string(),
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::new();

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
