//! Cache identities and states shared by the query layer and its callers.

use crate::error::ShopdeskError;
use crate::resource::Resource;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Identity under which a query result is memoized.
///
/// `params` is the canonical JSON text of the query parameters. `serde_json`
/// maps keep their keys sorted, so two parameter objects with the same
/// content always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub resource: Resource,
    pub params: Option<String>,
}

impl QueryKey {
    /// Key for a resource queried without parameters, e.g. `["accounts"]`.
    pub fn resource(resource: Resource) -> Self {
        Self {
            resource,
            params: None,
        }
    }

    /// Key for a resource queried with a filter/pagination object.
    pub fn with_params<P: Serialize>(resource: Resource, params: &P) -> crate::error::Result<Self> {
        let value = serde_json::to_value(params)?;
        Ok(Self::from_value(resource, &value))
    }

    pub fn from_value(resource: Resource, params: &Value) -> Self {
        let params = match params {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.to_string()),
        };
        Self { resource, params }
    }

    /// Whether a mutation targeting `resource` affects this key.
    pub fn matches(&self, resource: Resource) -> bool {
        self.resource == resource
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.params {
            Some(params) => write!(f, "[\"{}\", {}]", self.resource, params),
            None => write!(f, "[\"{}\"]", self.resource),
        }
    }
}

/// Lifecycle status of a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// What a view sees for one query key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub status: QueryStatus,
    /// Last successfully fetched payload, kept while refetching or after an error.
    pub data: Option<Value>,
    pub error: Option<ShopdeskError>,
    /// Set while the data is known to predate a write or its freshness window.
    pub is_stale: bool,
}

impl QuerySnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}
