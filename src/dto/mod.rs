/// Health check data structures.
pub mod health;
/// Server-Sent Events parameters and wire framing.
pub mod sse;
/// Request validation utilities.
pub mod validation;
