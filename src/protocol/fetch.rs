use alloc::{string::String, vec::Vec};

use super::Report;

/// Body of a report fetch call.
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub search: Vec<SearchParams>,
}

#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Milliseconds since the Unix epoch.
    pub start_date: i64,
    /// Milliseconds since the Unix epoch.
    pub end_date: i64,
    /// Base64 hashes of the advertisement keys to fetch reports for.
    pub ids: Vec<String>,
}

/// Body of a report fetch response.
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponse {
    #[cfg_attr(feature = "std", serde(default))]
    pub results: Vec<Report>,
}
