mod adv_key;
mod aes;
mod fetch;
mod report;

pub use adv_key::AdvertisementKey;
pub use aes::Aes;
pub use fetch::{FetchRequest, FetchResponse, SearchParams};
pub use report::{
    Coordinate, EncryptedReportPayload, Location, NormalizedPayload, PayloadVersion, Report,
    ReportData, TagData, CORE_DATA_EPOCH_OFFSET,
};
