// Copyright 2023 Remi Bernotavicius

use crate::validation::ValidationErrors;
use derive_more::Display;
use diesel::result::{DatabaseErrorKind, QueryResult};
use std::path::PathBuf;
use thiserror::Error;

/// The kinds of record the catalog stores, used to say what was missing or duplicated.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum Entity {
    #[display("unit")]
    Unit,
    #[display("ingredient")]
    Ingredient,
    #[display("recipe")]
    Recipe,
    #[display("recipe ingredient")]
    RecipeIngredient,
}

#[derive(Error, Debug)]
pub enum Error {
    /// One or more fields failed validation. Nothing was written.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// A uniqueness constraint rejected the write. Nothing was written.
    #[error("{entity} already exists: {detail}")]
    Uniqueness { entity: Entity, detail: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i32 },

    /// Both records exist but the ingredient is not linked to the recipe.
    #[error("ingredient {ingredient_id} is not part of recipe {recipe_id}")]
    NotAttached { recipe_id: i32, ingredient_id: i32 },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("failed to connect to database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("failed to migrate database: {0}")]
    Migration(Box<dyn std::error::Error + Send + Sync + 'static>),

    #[error("database path {0:?} is not valid UTF-8")]
    InvalidDatabasePath(PathBuf),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("logger error: {0}")]
    Logger(#[from] log::SetLoggerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(entity: Entity, id: impl Into<i32>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) trait QueryResultExt<T> {
    /// Turns a unique constraint violation into [`Error::Uniqueness`]. Any other failure stays a
    /// database error.
    fn or_duplicate(self, entity: Entity, detail: impl FnOnce() -> String) -> Result<T>;
}

impl<T> QueryResultExt<T> for QueryResult<T> {
    fn or_duplicate(self, entity: Entity, detail: impl FnOnce() -> String) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info)) => {
                log::debug!("unique violation on {entity}: {}", info.message());
                Err(Error::Uniqueness {
                    entity,
                    detail: detail(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
