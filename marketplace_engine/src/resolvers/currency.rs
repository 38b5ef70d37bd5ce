/// The configured currency code, upper-cased, or `default` when it is missing or blank.
pub fn resolve_currency(configured: Option<&str>, default: &str) -> String {
    configured.map(str::trim).filter(|c| !c.is_empty()).unwrap_or(default).to_ascii_uppercase()
}
