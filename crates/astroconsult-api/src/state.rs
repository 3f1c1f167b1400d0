//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over the repository ports, but AppState pins them to
//! the SQLite implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use astroconsult_core::chat::MessageStore;
use astroconsult_core::consultation::SessionRegistry;
use astroconsult_core::gateway::ChatGateway;
use astroconsult_core::room::RoomFabric;
use astroconsult_infra::config::{load_server_config, resolve_data_dir};
use astroconsult_infra::sqlite::consultation::SqliteConsultationRepository;
use astroconsult_infra::sqlite::identity::SqliteIdentityProvider;
use astroconsult_infra::sqlite::message::SqliteMessageRepository;
use astroconsult_infra::sqlite::pool::{DatabasePool, database_url};
use astroconsult_infra::sqlite::user::SqliteUserRepository;
use astroconsult_types::config::ServerConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteRegistry =
    SessionRegistry<SqliteConsultationRepository, SqliteUserRepository, SqliteMessageRepository>;

pub type ConcreteGateway =
    ChatGateway<SqliteConsultationRepository, SqliteUserRepository, SqliteMessageRepository>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConcreteRegistry>,
    pub gateway: ConcreteGateway,
    pub fabric: Arc<RoomFabric>,
    pub identity: SqliteIdentityProvider,
    pub users: SqliteUserRepository,
    pub config: Arc<ServerConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_at(&resolve_data_dir()).await
    }

    /// Connect to `{data_dir}/astroconsult.db`, load `config.toml`, wire services.
    pub async fn init_at(data_dir: &Path) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let config = load_server_config(data_dir).await;

        let db_url = database_url(data_dir);
        let db_pool = DatabasePool::with_acquire_timeout(&db_url, config.db_acquire_timeout()).await?;

        let users = SqliteUserRepository::new(db_pool.clone());
        let messages = Arc::new(MessageStore::new(
            SqliteMessageRepository::new(db_pool.clone()),
            config.persist_timeout(),
        ));
        let registry = Arc::new(SessionRegistry::new(
            SqliteConsultationRepository::new(db_pool.clone()),
            users.clone(),
            Arc::clone(&messages),
            config.first_consultation_free_minutes,
        ));

        let fabric = Arc::new(RoomFabric::new());
        let gateway = ChatGateway::new(
            Arc::clone(&registry),
            messages,
            Arc::clone(&fabric),
            config.member_queue_capacity,
        );

        Ok(Self {
            registry,
            gateway,
            fabric,
            identity: SqliteIdentityProvider::new(db_pool),
            users,
            config: Arc::new(config),
            data_dir: data_dir.to_path_buf(),
        })
    }
}
