//! Mail address normalization.
//!
//! Headers arrive as `"Jane Doe" <Jane@Example.com>`, bare addresses, or lists.
//! Matching against team members and deduplication both work on the
//! lowercase bare address.

use mailparse::{addrparse, MailAddr};

/// First address of a header value as a lowercase bare address.
///
/// Returns `None` when nothing that looks like `local@domain` can be found.
pub fn normalize_address(raw: &str) -> Option<String> {
    let parsed = addrparse(raw).ok().and_then(|list| {
        list.iter().find_map(|addr| match addr {
            MailAddr::Single(info) => Some(info.addr.clone()),
            MailAddr::Group(group) => group.addrs.first().map(|info| info.addr.clone()),
        })
    });

    let candidate = parsed.unwrap_or_else(|| fallback_extract(raw));
    let cleaned = candidate
        .trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '<' || c == '>')
        .trim()
        .to_lowercase();

    if is_plausible_address(&cleaned) {
        Some(cleaned)
    } else {
        None
    }
}

fn fallback_extract(raw: &str) -> String {
    if let (Some(start), Some(end)) = (raw.find('<'), raw.rfind('>')) {
        if start < end {
            return raw[start + 1..end].to_string();
        }
    }
    raw.replace('"', "")
}

fn is_plausible_address(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !addr.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// True when `address` ends with `@domain` (case-insensitive).
pub fn has_domain(address: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('@').to_lowercase();
    address
        .rsplit_once('@')
        .map(|(_, d)| d.to_lowercase() == domain)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_display_name_and_lowercases() {
        assert_eq!(
            normalize_address("\"Jane Doe\" <Jane.Doe@Example.COM>").as_deref(),
            Some("jane.doe@example.com")
        );
    }

    #[test]
    fn accepts_bare_address() {
        assert_eq!(
            normalize_address("  Support@Acme.io ").as_deref(),
            Some("support@acme.io")
        );
    }

    #[test]
    fn takes_first_address_of_a_list() {
        assert_eq!(
            normalize_address("a@one.com, b@two.com").as_deref(),
            Some("a@one.com")
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(normalize_address("undisclosed-recipients"), None);
        assert_eq!(normalize_address(""), None);
    }

    #[test]
    fn domain_match_is_case_insensitive() {
        assert!(has_domain("agent@GMAIL.com", "gmail.com"));
        assert!(has_domain("agent@gmail.com", "@gmail.com"));
        assert!(!has_domain("agent@company.com", "gmail.com"));
    }
}
