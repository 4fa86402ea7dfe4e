use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Route group name -> ("METHOD /path" -> one-line description).
pub type RouteMap = BTreeMap<&'static str, BTreeMap<&'static str, &'static str>>;

/// Body of `GET /health`.
#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
    pub endpoints: RouteMap,
}

impl Health {
    pub fn ok(endpoints: RouteMap) -> Self {
        Self { status: "OK", timestamp: now_iso(), endpoints }
    }
}

/// Current UTC time as ISO-8601 with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_iso_is_utc_millis() {
        let ts = now_iso();
        assert!(ts.ends_with('Z'));
        // yyyy-mm-ddThh:mm:ss.mmmZ
        assert_eq!(ts.len(), 24);
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
