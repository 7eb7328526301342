//! The route paths served by the API.

/// Log in with a username and password.
pub const LOG_IN: &str = "/auth/login";
/// Invalidate the current session.
pub const LOG_OUT: &str = "/auth/logout";
/// The acting user's transaction collection.
pub const TRANSACTIONS: &str = "/transactions";
/// A single transaction (PUT/DELETE) or a per-user listing (GET).
pub const TRANSACTION: &str = "/transactions/{id}";
/// Full-document import.
pub const IMPORT: &str = "/transactions/import";
/// Full-document export.
pub const EXPORT: &str = "/export";
/// The acting user's settings record.
pub const SETTINGS: &str = "/settings";
/// Full data clear.
pub const DATA: &str = "/data";
/// Summary statistics, trends and budget alerts for a trailing window.
pub const ANALYTICS_SUMMARY: &str = "/analytics/summary";
/// Spending anomaly detection for one category.
pub const ANALYTICS_ANOMALIES: &str = "/analytics/anomalies";

/// Replace the path parameter in an endpoint with a concrete value.
pub fn format_endpoint(endpoint: &str, value: &str) -> String {
    let start = endpoint.find('{').expect("endpoint has no path parameter");
    let end = endpoint.find('}').expect("endpoint has no path parameter");

    format!("{}{}{}", &endpoint[..start], value, &endpoint[end + 1..])
}

#[cfg(test)]
mod endpoint_tests {
    use super::{TRANSACTION, format_endpoint};

    #[test]
    fn format_endpoint_replaces_the_parameter() {
        assert_eq!(format_endpoint(TRANSACTION, "abc123"), "/transactions/abc123");
    }
}
