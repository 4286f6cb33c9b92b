use std::sync::Arc;

use checkin_domain::ports::{
    CheckInRepository, ConfigProvider, CredentialRenderer, EventRepository, HealthCheckService,
    RegistrationNotifier, RegistrationRepository,
};
use checkin_domain::RuntimeConfig;

use crate::{Metrics, RenderCache};

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub settings: Arc<dyn ConfigProvider>,
    pub events: Arc<dyn EventRepository>,
    pub registrations: Arc<dyn RegistrationRepository>,
    pub check_ins: Arc<dyn CheckInRepository>,
    pub renderer: Arc<dyn CredentialRenderer>,
    pub notifier: Arc<dyn RegistrationNotifier>,
    pub health: Arc<dyn HealthCheckService>,
    pub render_cache: Arc<RenderCache>,
    pub metrics: Arc<Metrics>,
}
