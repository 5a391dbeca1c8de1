use crate::errors::{OutreachError, Result};
use crate::models::Organization;
use tracing::info;

const NAME_COLUMNS: &[&str] = &["organization", "organization_name", "company", "company_name", "name"];
const DOMAIN_COLUMNS: &[&str] = &["domain", "company_domain", "organization_domain", "website"];

/// Load the input rows: one organization per line, domain optional. Rows
/// with an empty name are kept so the pipeline can report them as errors
/// instead of dropping them silently.
pub async fn read_organizations(path: &str) -> Result<Vec<Organization>> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        OutreachError::Config(format!("cannot read input file {path}: {e}"))
    })?;
    let organizations = parse_organizations(&content)?;
    info!("Loaded {} organizations from {}", organizations.len(), path);
    Ok(organizations)
}

pub fn parse_organizations(content: &str) -> Result<Vec<Organization>> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| OutreachError::invalid_input("input file is empty"))?;
    let columns: Vec<String> = parse_csv_line(header)
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .collect();

    let name_idx = columns
        .iter()
        .position(|c| NAME_COLUMNS.contains(&c.as_str()))
        .ok_or_else(|| {
            OutreachError::invalid_input(format!(
                "no organization column found in header: {header:?}"
            ))
        })?;
    let domain_idx = columns
        .iter()
        .position(|c| DOMAIN_COLUMNS.contains(&c.as_str()));

    let mut organizations = Vec::new();
    for line in lines {
        let fields = parse_csv_line(line);
        let name = fields.get(name_idx).map(|f| f.trim()).unwrap_or_default();
        let domain = domain_idx
            .and_then(|idx| fields.get(idx))
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        organizations.push(Organization::new(name, domain));
    }
    Ok(organizations)
}

// Minimal quote-aware CSV splitting; enough for the tabular input we accept.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_optional_domains() {
        let orgs = parse_organizations(
            "company_name,company_domain\nStripe,stripe.com\nAcme Corp,\n",
        )
        .unwrap();
        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[0].name, "Stripe");
        assert_eq!(orgs[0].domain.as_deref(), Some("stripe.com"));
        assert_eq!(orgs[1].name, "Acme Corp");
        assert_eq!(orgs[1].domain, None);
    }

    #[test]
    fn handles_quoted_fields_with_commas() {
        let orgs = parse_organizations(
            "organization,domain\n\"Acme, Inc.\",acme.com\n",
        )
        .unwrap();
        assert_eq!(orgs[0].name, "Acme, Inc.");
        assert_eq!(orgs[0].domain.as_deref(), Some("acme.com"));
    }

    #[test]
    fn accepts_headers_without_a_domain_column() {
        let orgs = parse_organizations("name\nStripe\n").unwrap();
        assert_eq!(orgs[0].name, "Stripe");
        assert_eq!(orgs[0].domain, None);
    }

    #[test]
    fn rejects_headers_without_an_organization_column() {
        assert!(parse_organizations("city,country\nParis,France\n").is_err());
        assert!(parse_organizations("").is_err());
    }

    #[test]
    fn keeps_rows_with_empty_names_for_error_reporting() {
        let orgs = parse_organizations("name,domain\n,stripe.com\n").unwrap();
        assert_eq!(orgs.len(), 1);
        assert!(orgs[0].name.is_empty());
    }

    #[test]
    fn splits_escaped_quotes() {
        let fields = parse_csv_line(r#""say ""hi""",b"#);
        assert_eq!(fields, vec![r#"say "hi""#.to_string(), "b".to_string()]);
    }
}
