//! Service wiring: storage selection, id generation and the card clock.

use std::sync::Arc;

use domain::adapters::memory_repo::InMemoryStore;
use domain::service::KanbanService;
use domain::{
    Board, BoardRepository, Card, CardRepository, Clock, Column, ColumnRepository, CoreError,
    IdGenerator, KanbanStore,
};
use tracing::{error, info};

use crate::config::{Config, StorageProvider};

/// The service type the GraphQL schema resolves against.
pub type AppService = KanbanService<AnyStore, UuidIds, LocalClock>;

/// Random v4 UUIDs for every new record.
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Server local time, formatted as a human-readable stamp.
pub struct LocalClock;

impl Clock for LocalClock {
    fn timestamp(&self) -> String {
        http_common::created_stamp_now()
    }
}

// Store variants supported by this build (feature-gated).
enum StoreKind {
    Memory(InMemoryStore),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite_adapter::SqliteRepo),
    #[cfg(feature = "dynamo")]
    Dynamo(aws_dynamo::DynamoRepo),
}

/// Store chosen at startup from config.
pub struct AnyStore {
    kind: StoreKind,
}

impl AnyStore {
    pub fn memory() -> Self {
        Self {
            kind: StoreKind::Memory(InMemoryStore::new()),
        }
    }

    /// Short name of the backing store, for logs.
    pub fn provider(&self) -> &'static str {
        match &self.kind {
            StoreKind::Memory(_) => "memory",
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite(_) => "sqlite",
            #[cfg(feature = "dynamo")]
            StoreKind::Dynamo(_) => "dynamo",
        }
    }

    fn inner(&self) -> &dyn KanbanStore {
        match &self.kind {
            StoreKind::Memory(s) => s,
            #[cfg(feature = "sqlite")]
            StoreKind::Sqlite(s) => s,
            #[cfg(feature = "dynamo")]
            StoreKind::Dynamo(s) => s,
        }
    }
}

impl BoardRepository for AnyStore {
    fn get_board(&self, id: &str) -> Result<Option<Board>, CoreError> {
        self.inner().get_board(id)
    }

    fn scan_boards(&self) -> Result<Vec<Board>, CoreError> {
        self.inner().scan_boards()
    }

    fn put_board(&self, board: &Board) -> Result<(), CoreError> {
        self.inner().put_board(board)
    }

    fn delete_board(&self, id: &str) -> Result<(), CoreError> {
        self.inner().delete_board(id)
    }
}

impl ColumnRepository for AnyStore {
    fn get_column(&self, id: &str) -> Result<Option<Column>, CoreError> {
        self.inner().get_column(id)
    }

    fn scan_columns(&self) -> Result<Vec<Column>, CoreError> {
        self.inner().scan_columns()
    }

    fn scan_columns_by_board(&self, board: &str) -> Result<Vec<Column>, CoreError> {
        self.inner().scan_columns_by_board(board)
    }

    fn put_column(&self, column: &Column) -> Result<(), CoreError> {
        self.inner().put_column(column)
    }

    fn delete_column(&self, id: &str) -> Result<(), CoreError> {
        self.inner().delete_column(id)
    }
}

impl CardRepository for AnyStore {
    fn get_card(&self, id: &str) -> Result<Option<Card>, CoreError> {
        self.inner().get_card(id)
    }

    fn scan_cards(&self) -> Result<Vec<Card>, CoreError> {
        self.inner().scan_cards()
    }

    fn scan_cards_by_column(&self, column: &str) -> Result<Vec<Card>, CoreError> {
        self.inner().scan_cards_by_column(column)
    }

    fn put_card(&self, card: &Card) -> Result<(), CoreError> {
        self.inner().put_card(card)
    }

    fn delete_card(&self, id: &str) -> Result<(), CoreError> {
        self.inner().delete_card(id)
    }
}

// Construct a store based on config and feature flags. Falls back to memory
// when the provider is unavailable in this build or fails to initialize.
fn build_store(cfg: &Config) -> AnyStore {
    match cfg.storage_provider {
        StorageProvider::Memory => AnyStore::memory(),
        #[cfg(feature = "sqlite")]
        StorageProvider::Sqlite => {
            match sqlite_adapter::SqliteRepo::open_creating_dirs(&cfg.db_path) {
                Ok(r) => AnyStore {
                    kind: StoreKind::Sqlite(r),
                },
                Err(e) => {
                    error!(err = %e, path = %cfg.db_path.display(), "failed to open sqlite store; using memory");
                    AnyStore::memory()
                }
            }
        }
        #[cfg(feature = "dynamo")]
        StorageProvider::Dynamo => match aws_dynamo::DynamoRepo::from_env() {
            Ok(r) => AnyStore {
                kind: StoreKind::Dynamo(r),
            },
            Err(e) => {
                error!(err = %e, "failed to init dynamo store; using memory");
                AnyStore::memory()
            }
        },
        #[allow(unreachable_patterns)]
        ref other => {
            error!(provider = ?other, "storage provider not compiled into this build; using memory");
            AnyStore::memory()
        }
    }
}

/// Build the shared service from config.
pub fn build_service(cfg: &Config) -> Arc<AppService> {
    let store = build_store(cfg);
    info!(provider = store.provider(), "storage ready");
    Arc::new(KanbanService::new(store, UuidIds, LocalClock))
}

/// In-memory service, used by tests.
#[cfg(test)]
pub fn memory_service() -> Arc<AppService> {
    Arc::new(KanbanService::new(AnyStore::memory(), UuidIds, LocalClock))
}
