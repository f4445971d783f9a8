//! Endpoint paths and helpers for the OData v4 public API.

use serde_json::Value;

pub const LEARNING_EVENTS: &str = "/learning/odatav4/public/admin/learningEvent/v1";
pub const LEARNING_HISTORY: &str = "/learning/odatav4/public/user/learningHistory/v1";
pub const USERS: &str = "/learning/odatav4/public/admin/user-service/v1";
pub const CURRICULUM: &str = "/learning/odatav4/public/user/curriculum/v1";
pub const STUDENT_SEARCH: &str = "/learning/odatav4/public/admin/searchStudent/v1";
pub const ITEM_ASSIGNMENTS: &str = "/learning/odatav4/public/user/itemAssignment/v1";
pub const LEARNING_PLANS: &str = "/learning/odatav4/public/user/learningplan-service/v1";
pub const USER_LEARNING: &str = "/learning/odatav4/public/user/userlearning-service/v1";

/// The endpoints the dashboards summarise, with a display name each.
pub const KNOWN_ENDPOINTS: [(&str, &str); 8] = [
    ("Learning events", LEARNING_EVENTS),
    ("Learning history", LEARNING_HISTORY),
    ("Users", USERS),
    ("Curriculum", CURRICULUM),
    ("Student search", STUDENT_SEARCH),
    ("Item assignments", ITEM_ASSIGNMENTS),
    ("Learning plans", LEARNING_PLANS),
    ("User learning", USER_LEARNING),
];

/// The records of a collection response, i.e. its `value` array.
pub fn collection(payload: &Value) -> Option<&Vec<Value>> {
    payload.get("value").and_then(Value::as_array)
}

/// Appends `params` to `path` as a query string.
///
/// The result is still a plain endpoint string, so it doubles as the cache
/// key for the request.
pub fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{query}")
}
