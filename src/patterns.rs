use crate::errors::{OutreachError, Result};

// Conventional local-part shapes, most common first. The position in this
// list doubles as the scoring prior: a lower index means a more conventional
// address.
fn pattern_local_parts(first: &str, last: &str) -> Vec<String> {
    let f = first.chars().next().map(String::from).unwrap_or_default();
    let l = last.chars().next().map(String::from).unwrap_or_default();
    if last.is_empty() {
        return vec![first.to_string()];
    }
    vec![
        format!("{first}.{last}"),
        format!("{first}{last}"),
        format!("{f}{last}"),
        format!("{first}.{l}"),
        format!("{first}_{last}"),
        format!("{f}.{last}"),
        format!("{last}.{first}"),
        format!("{first}-{last}"),
        first.to_string(),
    ]
}

/// Expand a person's name into candidate addresses on `domain`, ordered by
/// conventionality. Pure and deterministic; never returns duplicates.
pub fn generate(name: &str, domain: &str) -> Result<Vec<String>> {
    let tokens: Vec<String> = name
        .split_whitespace()
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect();

    let first = tokens
        .first()
        .cloned()
        .ok_or_else(|| OutreachError::invalid_input(format!("name yields no tokens: {name:?}")))?;
    let last = if tokens.len() > 1 {
        tokens.last().cloned().unwrap_or_default()
    } else {
        String::new()
    };

    let domain = validate_domain(domain)?;

    let mut seen = std::collections::HashSet::new();
    let addresses = pattern_local_parts(&first, &last)
        .into_iter()
        .map(|local| format!("{local}@{domain}"))
        .filter(|addr| seen.insert(addr.clone()))
        .collect();

    Ok(addresses)
}

fn normalize_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

/// Accept only a bare host string: no scheme, path, port or userinfo.
fn validate_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().to_lowercase();
    let bad = domain.is_empty()
        || !domain.contains('.')
        || domain.contains("://")
        || domain.contains(['/', '@', ':', '?', '#', ' '])
        || domain.starts_with(['.', '-'])
        || domain.ends_with(['.', '-'])
        || !domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if bad {
        return Err(OutreachError::invalid_input(format!(
            "not a valid host: {domain:?}"
        )));
    }
    Ok(domain)
}
