//! Remote SurrealDB connection setup.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Connection parameters for the credential store, read from the
/// environment at startup.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket address, host and port only (`127.0.0.1:8000`).
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "portico".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Open a root-authenticated WebSocket session scoped to the
/// configured namespace and database. The returned handle is cheap to
/// clone and shared by every repository.
pub async fn connect(config: &DbConfig) -> Result<Surreal<Client>, crate::DbError> {
    let db = Surreal::new::<Ws>(&config.url).await?;
    db.signin(Root {
        username: &config.username,
        password: &config.password,
    })
    .await?;
    db.use_ns(&config.namespace).use_db(&config.database).await?;

    info!(
        url = %config.url,
        namespace = %config.namespace,
        database = %config.database,
        "credential store connected"
    );

    Ok(db)
}
