use crate::watchlist::KeyValueStore;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use std::path::Path;

const CURRENT_VERSION: usize = 1;

#[derive(Debug, Error)]
pub enum DbCreationError {
    #[error("failed to open sqlite db")]
    OpenDb(#[source] rusqlite::Error),
    #[error("failed to get current version")]
    GetVersion(#[source] rusqlite::Error),
    #[error("failed to start transaction")]
    StartTransaction(#[source] rusqlite::Error),
    #[error("failed to commit transaction")]
    CommitTransaction(#[source] rusqlite::Error),
    #[error("failed to create kv table")]
    CreateKvTable(#[source] rusqlite::Error),
    #[error("failed to set db version")]
    SetVersion(#[source] rusqlite::Error),
    #[error("db version {0} is newer than supported version {}", CURRENT_VERSION)]
    UnsupportedVersion(usize),
}

#[derive(Debug, Error)]
pub enum DbGetError {
    #[error("failed to prepare get value request")]
    Prepare(#[source] rusqlite::Error),
    #[error("failed to execute get value request")]
    Execute(#[source] rusqlite::Error),
}

#[derive(Debug, Error)]
#[error("failed to set value in db")]
pub struct DbSetError(#[source] rusqlite::Error);

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Get(#[from] DbGetError),
    #[error(transparent)]
    Set(#[from] DbSetError),
}

pub struct Db {
    connection: Connection,
}

impl Db {
    pub fn new(path: &Path) -> Result<Db, DbCreationError> {
        let mut connection = Connection::open(path).map_err(DbCreationError::OpenDb)?;

        initialize_connection(&mut connection)?;

        Ok(Db { connection })
    }

    #[cfg(test)]
    fn new_in_memory() -> Result<Db, DbCreationError> {
        let mut connection = Connection::open_in_memory().map_err(DbCreationError::OpenDb)?;

        initialize_connection(&mut connection)?;

        Ok(Db { connection })
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>, DbGetError> {
        let mut statement = self
            .connection
            .prepare("SELECT value FROM kv WHERE key = ?1")
            .map_err(DbGetError::Prepare)?;

        statement
            .query_row([key], |row| row.get(0))
            .optional()
            .map_err(DbGetError::Execute)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), DbSetError> {
        self.connection
            .execute(
                "
                INSERT OR REPLACE INTO kv(key, value)
                VALUES (?1, ?2)
                ",
                params![key, value],
            )
            .map_err(DbSetError)?;

        Ok(())
    }
}

impl KeyValueStore for Db {
    type Err = DbError;

    fn get(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.get_value(key)?)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), DbError> {
        Ok(self.set_value(key, value)?)
    }
}

fn initialize_v1_db(connection: &mut Connection) -> Result<(), DbCreationError> {
    let transaction = connection
        .transaction()
        .map_err(DbCreationError::StartTransaction)?;

    transaction
        .execute(
            "
            CREATE TABLE kv(
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            ",
            [],
        )
        .map_err(DbCreationError::CreateKvTable)?;

    transaction
        .pragma_update(None, "user_version", 1)
        .map_err(DbCreationError::SetVersion)?;

    transaction
        .commit()
        .map_err(DbCreationError::CommitTransaction)?;

    Ok(())
}

fn initialize_connection(connection: &mut Connection) -> Result<(), DbCreationError> {
    let version: usize = connection
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(DbCreationError::GetVersion)?;

    if version > CURRENT_VERSION {
        return Err(DbCreationError::UnsupportedVersion(version));
    }

    let upgrade_functions = [initialize_v1_db];

    for f in upgrade_functions.iter().skip(version) {
        f(connection)?;
    }

    Ok(())
}
