//! Payload types carried by the backchannel operations.
//!
//! On the wire these are positional tuples; the structs exist so callers
//! get named fields instead of `.0`/`.1` indexing. Conversions go through
//! the `*Wire` aliases via serde's `from`/`into`.

use serde::{Deserialize, Serialize};

type DashboardUrlsWire = (String, Option<String>);
type ResourceStateWire = (String, String, String, Vec<String>);
type PublishingActivityWire = (String, String, bool, bool);

/// Where the host's dashboard can be reached: the primary URL plus an
/// optional URL for an alternate access context (forwarded ports, remote
/// workspaces).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DashboardUrlsWire", into = "DashboardUrlsWire")]
pub struct DashboardUrls {
    pub base_url: String,
    pub alt_url: Option<String>,
}

impl From<DashboardUrlsWire> for DashboardUrls {
    fn from((base_url, alt_url): DashboardUrlsWire) -> Self {
        Self { base_url, alt_url }
    }
}

impl From<DashboardUrls> for DashboardUrlsWire {
    fn from(urls: DashboardUrls) -> Self {
        (urls.base_url, urls.alt_url)
    }
}

/// Point-in-time snapshot of one resource the host manages. Later snapshots
/// for the same `resource` supersede earlier ones; delivery order is the
/// authoritative order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResourceStateWire", into = "ResourceStateWire")]
pub struct ResourceState {
    pub resource: String,
    pub resource_type: String,
    pub state: String,
    pub endpoints: Vec<String>,
}

impl From<ResourceStateWire> for ResourceState {
    fn from((resource, resource_type, state, endpoints): ResourceStateWire) -> Self {
        Self {
            resource,
            resource_type,
            state,
            endpoints,
        }
    }
}

impl From<ResourceState> for ResourceStateWire {
    fn from(state: ResourceState) -> Self {
        (
            state.resource,
            state.resource_type,
            state.state,
            state.endpoints,
        )
    }
}

/// Progress update for one publishing activity. Once `is_complete` or
/// `is_error` is set the id should no longer be treated as active, though
/// the stream itself only ends when the host ends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PublishingActivityWire", into = "PublishingActivityWire")]
pub struct PublishingActivity {
    pub id: String,
    pub status_text: String,
    pub is_complete: bool,
    pub is_error: bool,
}

impl From<PublishingActivityWire> for PublishingActivity {
    fn from((id, status_text, is_complete, is_error): PublishingActivityWire) -> Self {
        Self {
            id,
            status_text,
            is_complete,
            is_error,
        }
    }
}

impl From<PublishingActivity> for PublishingActivityWire {
    fn from(activity: PublishingActivity) -> Self {
        (
            activity.id,
            activity.status_text,
            activity.is_complete,
            activity.is_error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dashboard_urls_decode_from_a_pair() {
        let urls: DashboardUrls =
            serde_json::from_value(json!(["http://localhost:18888/login?t=abc", null])).unwrap();
        assert_eq!(urls.base_url, "http://localhost:18888/login?t=abc");
        assert!(urls.alt_url.is_none());

        let urls: DashboardUrls = serde_json::from_value(json!([
            "http://localhost:18888/login?t=abc",
            "https://tunnel.example.dev/login?t=abc"
        ]))
        .unwrap();
        assert_eq!(
            urls.alt_url.as_deref(),
            Some("https://tunnel.example.dev/login?t=abc")
        );
    }

    #[test]
    fn dashboard_urls_encode_as_a_pair() {
        let value = serde_json::to_value(DashboardUrls {
            base_url: "http://localhost:18888".to_string(),
            alt_url: None,
        })
        .unwrap();
        assert_eq!(value, json!(["http://localhost:18888", null]));
    }

    #[test]
    fn resource_state_decodes_from_a_quad() {
        let state: ResourceState =
            serde_json::from_value(json!(["db", "Postgres", "Running", ["5432"]])).unwrap();
        assert_eq!(state.resource, "db");
        assert_eq!(state.resource_type, "Postgres");
        assert_eq!(state.state, "Running");
        assert_eq!(state.endpoints, vec!["5432"]);
    }

    #[test]
    fn resource_state_allows_empty_endpoints() {
        let state: ResourceState =
            serde_json::from_value(json!(["db", "Postgres", "Stopped", []])).unwrap();
        assert!(state.endpoints.is_empty());
    }

    #[test]
    fn publishing_activity_decodes_flags() {
        let activity: PublishingActivity =
            serde_json::from_value(json!(["push-image", "Pushing layer 3/7", false, false]))
                .unwrap();
        assert_eq!(activity.id, "push-image");
        assert!(!activity.is_complete);
        assert!(!activity.is_error);

        let failed: PublishingActivity =
            serde_json::from_value(json!(["push-image", "denied", false, true])).unwrap();
        assert!(failed.is_error);
    }

    #[test]
    fn wire_shape_survives_a_round_trip() {
        let original = ResourceState {
            resource: "cache".to_string(),
            resource_type: "Redis".to_string(),
            state: "Starting".to_string(),
            endpoints: vec!["6379".to_string()],
        };
        let value = serde_json::to_value(original.clone()).unwrap();
        assert!(value.is_array(), "must stay positional on the wire");
        let back: ResourceState = serde_json::from_value(value).unwrap();
        assert_eq!(back, original);
    }
}
