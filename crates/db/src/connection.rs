use bson::{Document, doc};
use mongodb::{Client, Database, options::ClientOptions};
use promokit_config::Settings;
use tracing::{info, warn};

pub async fn connect(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse(&settings.database.url).await?;

    if let Some(max_pool) = settings.database.max_pool_size {
        client_options.max_pool_size = Some(max_pool);
    }
    if let Some(min_pool) = settings.database.min_pool_size {
        client_options.min_pool_size = Some(min_pool);
    }
    client_options.app_name = Some("promokit".to_string());

    let client = Client::with_options(client_options)?;

    let hello = client
        .database("admin")
        .run_command(doc! { "hello": 1 })
        .await?;

    if supports_transactions(&hello) {
        info!(
            db = %settings.database.name,
            replica_set = hello.get_str("setName").unwrap_or("-"),
            "Connected to MongoDB"
        );
    } else {
        warn!(
            db = %settings.database.name,
            "Connected to a standalone MongoDB; redemptions need a replica set and will fail"
        );
    }

    Ok(client.database(&settings.database.name))
}

/// Multi-document transactions need a replica set member or a mongos router.
pub fn supports_transactions(hello: &Document) -> bool {
    hello.contains_key("setName") || hello.get_str("msg").is_ok_and(|msg| msg == "isdbgrid")
}
