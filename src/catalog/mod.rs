// Copyright 2023 Remi Bernotavicius

use crate::database::models::AuthorId;

pub mod aggregate;
pub mod ingredient;
pub mod recipe;
pub mod unit;

/// Which owner's records a listing should return.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    Author(AuthorId),
}

impl From<Option<AuthorId>> for Scope {
    fn from(author: Option<AuthorId>) -> Self {
        author.map_or(Self::All, Self::Author)
    }
}
