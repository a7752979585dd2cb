// Copyright 2023 Remi Bernotavicius

//! Units, ingredients and recipes, with the weight and cost sums a recipe catalog displays.
//!
//! Ingredient weights are normalized to grams once, when a unit is first attached, and every
//! aggregate works on those gram values.

pub mod catalog;
pub mod config;
pub mod database;
pub mod error;
pub mod validation;

pub use error::{Error, Result};
