use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the broadcast hub.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::subscribe,
    ),
    components(schemas(crate::dto::health::HealthResponse)),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events broadcast subscriptions"),
    )
)]
pub struct ApiDoc;
