use crate::database::BestContactRow;
use crate::errors::Result;
use std::io::Write;
use tracing::info;

/// Write the best-contact-per-organization table.
pub fn write_results_csv(rows: &[BestContactRow], path: &str) -> Result<()> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::fs::File::create(path)?;
    writeln!(
        file,
        "organization,domain,contact_name,email,score,status,notes"
    )?;
    for row in rows {
        writeln!(
            file,
            "{},{},{},{},{:.1},{},{}",
            csv_field(&row.organization),
            csv_field(row.domain.as_deref().unwrap_or("")),
            csv_field(row.contact_name.as_deref().unwrap_or("")),
            csv_field(row.email.as_deref().unwrap_or("")),
            row.score,
            row.status,
            csv_field(&row.notes),
        )?;
    }

    info!("Exported {} result rows to {}", rows.len(), path);
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
