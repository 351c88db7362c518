use alloc::{collections::BTreeMap, string::String, vec::Vec};

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    accessory::{AirtagKeyDerivation, KeyDerivation},
    error::{DerivationError, ReportError},
    keys::{MainKey, SubKey, SubKeyType},
    owner,
    protocol::{FetchRequest, Report, SearchParams, TagData},
};

/// A beacon whose sub-keys could not be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFailure {
    pub key_id: String,
    pub error: DerivationError,
}

/// A fetched report that did not make it into the results.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportFailure {
    /// No sub-key of the query has the hash the report was filed under.
    #[error("no sub-key for report {report_id}")]
    Unmatched { report_id: String },
    /// The matching sub-key could not decode the report.
    #[error("unable to decode report {report_id}: {error}")]
    Undecodable {
        report_id: String,
        error: ReportError,
    },
}

/// A decoded report together with where it came from.
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[cfg_attr(feature = "std", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedReport {
    /// Id of the beacon the report belongs to.
    pub key_id: String,
    /// Base64 hash of the sub-key that decoded the report.
    pub sub_key_hash: String,
    pub kind: SubKeyType,
    pub published_at: Option<DateTime<Utc>>,
    pub tag_data: TagData,
    pub report: Report,
}

/// The sub-keys of a set of beacons for one time window, indexed by the hash the
/// report server files reports under.
#[derive(Debug, Clone)]
pub struct ReportQuery {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    sub_keys: BTreeMap<String, SubKey>,
    failures: Vec<KeyFailure>,
}

impl ReportQuery {
    /// Collect the sub-keys `keys` broadcast in the `window_hours` before `now`.
    ///
    /// A beacon whose derivation fails is recorded in [`Self::failures`] and
    /// skipped. If two sub-keys share a hash, the later one wins.
    pub fn build<'a>(
        keys: impl IntoIterator<Item = &'a MainKey>,
        window_hours: u32,
        lost_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let window = TimeDelta::try_hours(i64::from(window_hours)).unwrap_or(TimeDelta::MAX);

        Self::build_with(keys, window, lost_at, now, &AirtagKeyDerivation)
    }

    /// Like [`Self::build`], with an arbitrary window and key derivation.
    pub fn build_with<'a>(
        keys: impl IntoIterator<Item = &'a MainKey>,
        window: TimeDelta,
        lost_at: DateTime<Utc>,
        now: DateTime<Utc>,
        derivation: &impl KeyDerivation,
    ) -> Self {
        let start = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = now;

        let mut sub_keys = BTreeMap::new();
        let mut failures = Vec::new();

        for key in keys {
            let key_id = key.id();
            let derived = match key.sub_keys_with(start, end, lost_at, derivation) {
                Ok(derived) => derived,
                Err(error) => {
                    tracing::warn!(key = %key_id, %error, "unable to derive sub-keys");
                    failures.push(KeyFailure { key_id, error });
                    continue;
                }
            };

            tracing::debug!(key = %key_id, count = derived.len(), "derived sub-keys");

            for sub_key in derived {
                let hash = sub_key.id();
                if let Some(previous) = sub_keys.insert(hash.clone(), sub_key) {
                    tracing::warn!(
                        %hash,
                        previous_key = %previous.main_key_id,
                        key = %key_id,
                        "sub-key hash collision, keeping the later sub-key"
                    );
                }
            }
        }

        Self {
            start,
            end,
            sub_keys,
            failures,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Beacons left out of the query.
    pub fn failures(&self) -> &[KeyFailure] {
        &self.failures
    }

    pub fn sub_keys(&self) -> impl Iterator<Item = &SubKey> {
        self.sub_keys.values()
    }

    pub fn len(&self) -> usize {
        self.sub_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_keys.is_empty()
    }

    /// The sub-key a report with id `report_id` was filed under.
    pub fn sub_key(&self, report_id: &str) -> Option<&SubKey> {
        self.sub_keys.get(report_id)
    }

    /// One search over every sub-key hash, dated to whole seconds.
    pub fn fetch_request(&self) -> FetchRequest {
        FetchRequest {
            search: vec![SearchParams {
                start_date: self.start.timestamp().saturating_mul(1000),
                end_date: self.end.timestamp().saturating_mul(1000),
                ids: self.sub_keys.keys().cloned().collect(),
            }],
        }
    }

    /// Decode `reports` in order. Reports that fail are returned alongside and
    /// never stop the rest of the batch.
    pub fn decode_reports(&self, reports: &[Report]) -> (Vec<LocatedReport>, Vec<ReportFailure>) {
        let mut located = Vec::with_capacity(reports.len());
        let mut failures = Vec::new();

        for report in reports {
            let Some(sub_key) = self.sub_key(&report.id) else {
                tracing::warn!(report = %report.id, "no sub-key for report");
                failures.push(ReportFailure::Unmatched {
                    report_id: report.id.clone(),
                });
                continue;
            };

            match owner::decode(report, sub_key) {
                Ok(tag_data) => located.push(LocatedReport {
                    key_id: sub_key.main_key_id.clone(),
                    sub_key_hash: report.id.clone(),
                    kind: sub_key.kind,
                    published_at: report.published_at(),
                    tag_data,
                    report: report.clone(),
                }),
                Err(error) => {
                    tracing::warn!(report = %report.id, %error, "unable to decode report");
                    failures.push(ReportFailure::Undecodable {
                        report_id: report.id.clone(),
                        error,
                    });
                }
            }
        }

        (located, failures)
    }
}
