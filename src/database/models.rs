// Copyright 2023 Remi Bernotavicius

use derive_more::{Display, From, FromStr, Into};
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::{AsChangeset, Insertable};
use diesel_derive_newtype::DieselNewType;
use std::fmt;

/// Identifies the owner of catalog entries. Authentication lives outside of this crate, so this is
/// just an opaque number handed to us by the caller.
#[derive(
    DieselNewType, Debug, Display, From, Into, FromStr, Hash, PartialEq, Eq, Copy, Clone,
)]
pub struct AuthorId(i32);

#[derive(
    DieselNewType, Debug, Display, From, Into, FromStr, Hash, PartialEq, Eq, Copy, Clone,
)]
pub struct UnitId(i32);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::units)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub conversion_to_grams: f64,
    pub author_id: Option<AuthorId>,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::units)]
pub struct NewUnit<'a> {
    pub name: &'a str,
    pub conversion_to_grams: f64,
    pub author_id: Option<AuthorId>,
}

#[derive(
    DieselNewType, Debug, Display, From, Into, FromStr, Hash, PartialEq, Eq, Copy, Clone,
)]
pub struct IngredientId(i32);

/// A costed, weighed item. Once `is_converted` is set the weights are in grams and the unit factor
/// must never be applied to them again.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::ingredients)]
#[diesel(treat_none_as_null = true)]
pub struct Ingredient {
    pub id: IngredientId,
    pub title: String,
    pub raw_weight: f64,
    pub cooked_weight: f64,
    pub cost: f64,
    pub unit_id: Option<UnitId>,
    pub is_converted: bool,
    pub author_id: Option<AuthorId>,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Raw: {} g, Cooked: {} g, Cost: ${})",
            self.title, self.raw_weight, self.cooked_weight, self.cost
        )
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct NewIngredient<'a> {
    pub title: &'a str,
    pub raw_weight: f64,
    pub cooked_weight: f64,
    pub cost: f64,
    pub unit_id: Option<UnitId>,
    pub is_converted: bool,
    pub author_id: Option<AuthorId>,
}

#[derive(
    DieselNewType, Debug, Display, From, Into, FromStr, Hash, PartialEq, Eq, Copy, Clone,
)]
pub struct RecipeId(i32);

#[derive(Queryable, Selectable, Identifiable, Display, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
#[display("{title}")]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub author_id: Option<AuthorId>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe<'a> {
    pub title: &'a str,
    pub author_id: Option<AuthorId>,
}

#[derive(
    DieselNewType, Debug, Display, From, Into, FromStr, Hash, PartialEq, Eq, Copy, Clone,
)]
pub struct RecipeIngredientId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub added_at: chrono::NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct NewRecipeIngredient {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub added_at: chrono::NaiveDateTime,
}
