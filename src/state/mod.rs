use std::sync::Arc;

use crate::{
    config::AppConfig,
    services::{
        admission::{self, AdmissionPolicy},
        broadcast_service::BroadcastService,
        cors::CorsPolicy,
    },
};

pub type SharedState = Arc<AppState>;

/// Central application state wiring the broadcast hub to its adapters.
///
/// Constructed once at bootstrap; tests build fresh instances so nothing
/// leaks across them through process globals.
pub struct AppState {
    broadcast: BroadcastService,
    cors: CorsPolicy,
    admission: Arc<dyn AdmissionPolicy>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        let cors = CorsPolicy::new(
            config.allowed_origins().to_vec(),
            config.allow_credentials(),
        );
        let admission = admission::policy_from_config(&config);
        Arc::new(Self {
            broadcast: BroadcastService::new(),
            cors,
            admission,
        })
    }

    /// Publish and administration façade over the channel registry.
    pub fn broadcast_service(&self) -> &BroadcastService {
        &self.broadcast
    }

    /// CORS policy applied by the subscriber endpoint.
    pub fn cors_policy(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Admission hook deciding who may enter streaming mode.
    pub fn admission_policy(&self) -> &dyn AdmissionPolicy {
        self.admission.as_ref()
    }
}
