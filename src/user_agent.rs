//! Shared User-Agent string for vendor API traffic.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/partsync";

/// Default User-Agent for auth and listing requests.
#[must_use]
pub(crate) fn default_vendor_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("partsync/{version} (catalog-mirror; +{PROJECT_UA_URL})")
}
