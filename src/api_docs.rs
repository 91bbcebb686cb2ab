use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::playlists::list_playlists,
        api::likes::toggle_like,
        api::books::lookup_book,
        // Add other endpoints here as we document them
    ),
    tags(
        (name = "booxmix", description = "BooxMix API")
    )
)]
pub struct ApiDoc;
