//! Endpoint discovery by trial.
//!
//! Tenants differ in which OData resources they expose, so the only way to
//! find out is to ask. This module builds candidate paths and probes them
//! one at a time through [`ApiClient::request`]. Nothing here changes the
//! client's behaviour; a probe is an ordinary uncached request.

use std::fmt;

use crate::api::{odata, ApiClient, RequestOptions};

pub const DEFAULT_BASE_PATHS: [&str; 8] = [
    "/learning/odatav4/public",
    "/learning/odatav4/restricted",
    "/learning/odata/v4",
    "/learning/odata",
    "/odata/v2",
    "/odata/v4",
    "/learning/public/v1",
    "/learning/admin/v1",
];

pub const DEFAULT_RESOURCES: [&str; 24] = [
    "learningHistory",
    "learning-history",
    "LearningHistory",
    "learning_history",
    "userLearning",
    "user-learning",
    "UserLearning",
    "learningEvent",
    "learning-event",
    "LearningEvent",
    "learning_event",
    "itemAssignment",
    "item-assignment",
    "ItemAssignment",
    "curriculum",
    "Curriculum",
    "certification",
    "Certification",
    "student",
    "Student",
    "users",
    "Users",
    "completions",
    "Completions",
];

/// Endpoints seen in vendor examples, tried as-is.
pub const KNOWN_ENDPOINTS: [&str; 8] = [
    "/learning/odatav4/public/admin/learningEvent/v1/recordLearningEvents",
    "/learning/odatav4/public/admin/learningHistory/v1",
    "/learning/odatav4/public/admin/user/v1",
    odata::STUDENT_SEARCH,
    odata::USER_LEARNING,
    odata::LEARNING_PLANS,
    odata::CURRICULUM,
    odata::ITEM_ASSIGNMENTS,
];

/// Endpoints scoped to one user, mostly the authenticated admin.
///
/// The tenants we have seen disagree on whether the user goes in a plain
/// query parameter, an OData `$filter`, or the path, so we try each.
pub fn user_endpoints(user_id: &str) -> Vec<String> {
    let filter = format!("userId eq '{user_id}'");
    vec![
        odata::with_query(odata::LEARNING_HISTORY, &[("userId", user_id)]),
        odata::with_query(odata::LEARNING_HISTORY, &[("$filter", filter.as_str())]),
        odata::with_query(odata::STUDENT_SEARCH, &[("userId", user_id)]),
        format!("/learning/odatav4/public/admin/user/v1/{user_id}"),
    ]
}

/// Every path shape tried for each base path and resource, in order.
pub fn candidate_endpoints(base_paths: &[&str], resources: &[&str]) -> Vec<String> {
    let mut candidates = Vec::with_capacity(base_paths.len() * resources.len() * 6);
    for base in base_paths {
        for resource in resources {
            candidates.extend([
                format!("{base}/{resource}"),
                format!("{base}/user/{resource}"),
                format!("{base}/admin/{resource}"),
                format!("{base}/{resource}/v1"),
                format!("{base}/user/{resource}/v1"),
                format!("{base}/admin/{resource}/v1"),
            ]);
        }
    }
    candidates
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 200 with a non-empty `value` array.
    DataFound { records: usize },
    NoData { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub endpoint: String,
    pub outcome: ProbeOutcome,
}

impl Probe {
    pub fn found_data(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::DataFound { .. })
    }
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ProbeOutcome::DataFound { records } => {
                write!(f, "FOUND   {} ({records} records)", self.endpoint)
            }
            ProbeOutcome::NoData { reason } => write!(f, "no data {} ({reason})", self.endpoint),
        }
    }
}

/// Requests `endpoint` once, bypassing the cache, and classifies the answer.
pub async fn probe(client: &ApiClient, endpoint: &str) -> Probe {
    // We want to know what the tenant says right now, not what it said
    // earlier, so the cache is skipped.
    //
    // Only a non-empty collection counts as a find. Any error (including a
    // failed authentication) is recorded as the reason there was no data.
    let outcome = match client.request(endpoint, RequestOptions::bypass_cache()).await {
        Ok(payload) => match odata::collection(&payload) {
            Some(records) if !records.is_empty() => ProbeOutcome::DataFound {
                records: records.len(),
            },
            Some(_) => ProbeOutcome::NoData {
                reason: "empty collection".to_string(),
            },
            None => ProbeOutcome::NoData {
                reason: "not a collection".to_string(),
            },
        },
        Err(error) => ProbeOutcome::NoData {
            reason: error.to_string(),
        },
    };

    Probe {
        endpoint: endpoint.to_string(),
        outcome,
    }
}

/// Probes each endpoint in turn. Failures are recorded, never fatal.
pub async fn explore<S: AsRef<str>>(client: &ApiClient, endpoints: &[S]) -> Vec<Probe> {
    // Probes run one after another. Each one stands alone, so a failure
    // (even an authentication failure) moves on to the next endpoint.
    let mut probes = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        let result = probe(client, endpoint.as_ref()).await;
        if result.found_data() {
            tracing::info!(endpoint = %result.endpoint, "Found data");
        } else {
            tracing::debug!(%result, "Probe came back empty");
        }
        probes.push(result);
    }
    probes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_cover_every_shape_in_order() {
        let candidates = candidate_endpoints(&["/odata/v4"], &["curriculum"]);

        assert_eq!(
            candidates,
            [
                "/odata/v4/curriculum",
                "/odata/v4/user/curriculum",
                "/odata/v4/admin/curriculum",
                "/odata/v4/curriculum/v1",
                "/odata/v4/user/curriculum/v1",
                "/odata/v4/admin/curriculum/v1",
            ]
        );
    }

    #[test]
    fn default_grid_size() {
        let candidates = candidate_endpoints(&DEFAULT_BASE_PATHS, &DEFAULT_RESOURCES);
        assert_eq!(candidates.len(), 8 * 24 * 6);
        assert!(candidates.contains(&"/learning/odatav4/public/user/learningHistory/v1".to_string()));
    }

    #[test]
    fn user_endpoints_cover_query_filter_and_path() {
        assert_eq!(
            user_endpoints("admin01"),
            [
                "/learning/odatav4/public/user/learningHistory/v1?userId=admin01",
                "/learning/odatav4/public/user/learningHistory/v1?%24filter=userId+eq+%27admin01%27",
                "/learning/odatav4/public/admin/searchStudent/v1?userId=admin01",
                "/learning/odatav4/public/admin/user/v1/admin01",
            ]
        );
    }

    #[test]
    fn user_id_is_encoded_in_query_parameters() {
        let endpoints = user_endpoints("jane doe&co");

        assert!(endpoints[0].ends_with("?userId=jane+doe%26co"));
        assert!(endpoints[2].ends_with("?userId=jane+doe%26co"));
    }

    #[test]
    fn known_endpoints_include_vendor_examples() {
        assert!(KNOWN_ENDPOINTS
            .contains(&"/learning/odatav4/public/admin/learningEvent/v1/recordLearningEvents"));
        assert!(KNOWN_ENDPOINTS.contains(&odata::CURRICULUM));
    }

    #[test]
    fn probe_display() {
        let found = Probe {
            endpoint: "/a".to_string(),
            outcome: ProbeOutcome::DataFound { records: 3 },
        };
        assert!(found.found_data());
        assert_eq!(found.to_string(), "FOUND   /a (3 records)");

        let empty = Probe {
            endpoint: "/b".to_string(),
            outcome: ProbeOutcome::NoData {
                reason: "empty collection".to_string(),
            },
        };
        assert!(!empty.found_data());
        assert_eq!(empty.to_string(), "no data /b (empty collection)");
    }
}
