//! OpenAPI documentation configuration

use domain_images::ImagesApiDoc;
use utoipa::{Modify, OpenApi};

/// Combined OpenAPI documentation for all APIs
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Image Search API",
        version = "0.1.0",
        description = "Upload images and search them by natural-language text",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(crate::api::health::ready),
    modifiers(&ImagesPaths),
    tags(
        (name = "images", description = "Semantic image search"),
        (name = "health", description = "Readiness probes")
    )
)]
pub struct ApiDoc;

/// Image routes live at the root, so their document is merged rather than nested.
struct ImagesPaths;

impl Modify for ImagesPaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.merge(ImagesApiDoc::openapi());
    }
}
