/// Admission control for subscriber connections.
pub mod admission;
/// Publish and administration façade over the channel registry.
pub mod broadcast_service;
/// CORS policy evaluation.
pub mod cors;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Server-Sent Events stream wiring.
pub mod sse_service;
