use mongodb::Database;
use promokit_config::Settings;
use promokit_services::{AuthService, PromoService, promo::PromoError};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub promo: Arc<PromoService>,
}

impl AppState {
    /// Production wiring: MongoDB-backed stores and the system clock.
    pub fn new(db: &Database, settings: Settings) -> Result<Self, PromoError> {
        let promo = Arc::new(PromoService::with_database(db, &settings)?);
        Ok(Self::with_service(settings, promo))
    }

    pub fn with_service(settings: Settings, promo: Arc<PromoService>) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        Self {
            settings,
            auth,
            promo,
        }
    }
}
