use utoipa::OpenApi;

use crate::routes::{admin, health, v1};

#[derive(OpenApi)]
#[openapi(info(
    title = "cadvault-server",
    description = "CAD model library API: records, imports and viewer scenes",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(v1::api_docs());
    root.merge(admin::api_docs());
    root
}
