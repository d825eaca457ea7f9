use crate::store::Customer;
use anyhow::{Result, anyhow};

pub const EXPORT_FILENAME: &str = "customers.csv";

const HEADER: [&str; 7] = [
    "ID",
    "Name",
    "Account",
    "Email",
    "Phone",
    "Created At",
    "Updated At",
];

/// One header row, then one row per customer. Missing values are empty
/// fields.
pub fn customers_csv(customers: &[Customer]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(HEADER)?;
    for c in customers {
        let id = c.id.to_string();
        writer.write_record([
            id.as_str(),
            c.name.as_str(),
            c.account.as_str(),
            c.email.as_deref().unwrap_or(""),
            c.phone.as_deref().unwrap_or(""),
            c.created_at.as_deref().unwrap_or(""),
            c.updated_at.as_deref().unwrap_or(""),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV export: {}", e))
}
