use chrono::{TimeZone, Utc};
use mongodb::{Client, Database, options::ClientOptions};
use promokit_api::{build_router, state::AppState};
use promokit_config::{AppSettings, DatabaseSettings, JwtSettings, PromoSettings, Settings};
use promokit_db::indexes::ensure_indexes;
use promokit_services::PromoService;
use promokit_services::promo::ManualClock;
use promokit_services::store::{MemoryAttemptStore, MemoryPromoStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// A running test application.
pub struct TestApp {
    pub addr: SocketAddr,
    pub base_url: String,
    pub settings: Settings,
    pub state: AppState,
    pub client: reqwest::Client,
    /// Set for servers spawned over in-memory stores.
    pub store: Option<Arc<MemoryPromoStore>>,
    pub clock: Option<Arc<ManualClock>>,
    /// Set for servers spawned against MongoDB.
    pub db: Option<Database>,
}

impl TestApp {
    /// Spawn a test server over in-memory stores and a manual clock
    /// starting at 2026-03-01 12:00 UTC.
    pub async fn spawn() -> Self {
        let settings = test_settings();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryPromoStore::with_clock(clock.clone()));

        let promo = PromoService::new(
            &settings,
            store.clone(),
            Arc::new(MemoryAttemptStore::new()),
            clock.clone(),
        )
        .expect("Failed to create PromoService");
        let state = AppState::with_service(settings.clone(), Arc::new(promo));

        let mut app = Self::serve(settings, state).await;
        app.store = Some(store);
        app.clock = Some(clock);
        app
    }

    /// Spawn a test server connected to MongoDB.
    ///
    /// Requires a replica set (transactions); defaults to
    /// mongodb://localhost:27017/?replicaSet=rs0.
    /// Set PROMOKIT__DATABASE__URL to override the connection string.
    /// Each test gets a unique database name for isolation.
    pub async fn spawn_mongo() -> Self {
        let db_name = format!("promokit_test_{}", uuid::Uuid::new_v4().simple());

        let mut settings = test_settings();
        if let Ok(url) = std::env::var("PROMOKIT__DATABASE__URL") {
            settings.database.url = url;
        }
        settings.database.name = db_name.clone();

        let client_options = ClientOptions::parse(&settings.database.url)
            .await
            .expect("Failed to parse MongoDB URL");
        let mongo_client =
            Client::with_options(client_options).expect("Failed to create MongoDB client");
        let db = mongo_client.database(&db_name);

        ensure_indexes(&db).await.expect("Failed to create indexes");

        let state = AppState::new(&db, settings.clone()).expect("Failed to create AppState");

        let mut app = Self::serve(settings, state).await;
        app.db = Some(db);
        app
    }

    async fn serve(settings: Settings, state: AppState) -> Self {
        let app = build_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            base_url: format!("http://{}", addr),
            settings,
            state,
            client: reqwest::Client::new(),
            store: None,
            clock: None,
            db: None,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// In-memory store backing this server. Panics for MongoDB servers.
    pub fn store(&self) -> &MemoryPromoStore {
        self.store.as_deref().expect("not an in-memory test app")
    }

    pub fn clock(&self) -> &ManualClock {
        self.clock.as_deref().expect("not an in-memory test app")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(db) = self.db.clone() {
            // Best effort cleanup: drop the test database
            tokio::spawn(async move {
                let _ = db.drop().await;
            });
        }
    }
}

fn test_settings() -> Settings {
    Settings {
        app: AppSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            cors_origins: vec![],
        },
        database: DatabaseSettings {
            url: "mongodb://localhost:27017/?replicaSet=rs0".to_string(),
            name: "promokit_test".to_string(),
            max_pool_size: Some(5),
            min_pool_size: Some(1),
        },
        jwt: JwtSettings {
            secret: "test-secret-key-for-jwt-signing-minimum-32-chars".to_string(),
            access_token_ttl_secs: 3600,
            issuer: "promokit".to_string(),
        },
        promo: PromoSettings {
            integrity_secret: Some("test-integrity-secret".to_string()),
            ..PromoSettings::default()
        },
    }
}
