use crate::db::{DbPool, OrmConn, create_orm_conn};

/// Shared handle to the storage database. Every [`crate::store::Store`] holds a clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let orm = create_orm_conn(&pool);
        Self { pool, orm }
    }
}
