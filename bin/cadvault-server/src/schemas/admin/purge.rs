use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PURGE_AGE_MINUTES: u32 = 60;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurgeRequest {
    /// Only pending records created at least this long ago are removed.
    #[serde(default = "default_age")]
    pub older_than_minutes: u32,
}

fn default_age() -> u32 {
    DEFAULT_PURGE_AGE_MINUTES
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PurgeResponse {
    pub purged: Vec<String>,
}
