pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;

pub use store::{
    AnalyticsStore, ApplicationStore, JobStore, ParsedResumeStore, PlacementTotals, StudentStore,
};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by the persistence layer. Uniqueness violations arrive as
/// `Conflict` no matter which backend produced them.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    /// A foreign key named a row that does not exist.
    #[error("{0}")]
    MissingReference(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("stored record is invalid: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn from_sqlx(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::Conflict(conflict_message.to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference(format!(
                    "referenced record does not exist ({})",
                    db_err.constraint().unwrap_or("foreign key")
                ));
            }
        }
        StoreError::Database(err)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from_sqlx(err, "Record already exists")
    }
}

/// The stores the orchestrators depend on, bundled for wiring.
#[derive(Clone)]
pub struct Stores {
    pub students: std::sync::Arc<dyn StudentStore>,
    pub jobs: std::sync::Arc<dyn JobStore>,
    pub parsed_resumes: std::sync::Arc<dyn ParsedResumeStore>,
    pub applications: std::sync::Arc<dyn ApplicationStore>,
    pub analytics: std::sync::Arc<dyn AnalyticsStore>,
}

impl Stores {
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = std::sync::Arc::new(postgres::PgStore::new(pool));
        Self {
            students: store.clone(),
            jobs: store.clone(),
            parsed_resumes: store.clone(),
            applications: store.clone(),
            analytics: store,
        }
    }

    pub fn in_memory(store: std::sync::Arc<memory::MemoryStore>) -> Self {
        Self {
            students: store.clone(),
            jobs: store.clone(),
            parsed_resumes: store.clone(),
            applications: store.clone(),
            analytics: store,
        }
    }
}
