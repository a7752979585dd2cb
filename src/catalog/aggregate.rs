// Copyright 2023 Remi Bernotavicius

use super::recipe::{self, LinkedIngredient};
use crate::database;
use crate::database::models::{Ingredient, RecipeId};
use crate::error::{Entity, Error};
use crate::Result;
use derive_more::Display;
use diesel::dsl::sum;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use std::cmp::Ordering;
use strum::EnumIter;

impl LinkedIngredient {
    /// Ingredient weights are stored in grams already, so the unit is deliberately not consulted
    /// here.
    pub fn weight_in_grams(&self) -> f64 {
        self.ingredient.raw_weight
    }
}

#[derive(Debug, Display, EnumIter, Hash, Copy, Clone, PartialEq, Eq)]
pub enum Total {
    #[display("raw weight")]
    RawWeight,
    #[display("cooked weight")]
    CookedWeight,
    #[display("cost")]
    Cost,
}

impl Total {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::RawWeight | Self::CookedWeight => "g",
            Self::Cost => "$",
        }
    }
}

/// Sums over every ingredient of a recipe. All zero for a recipe without ingredients.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct RecipeTotals {
    pub raw_weight: f64,
    pub cooked_weight: f64,
    pub cost: f64,
}

impl RecipeTotals {
    pub fn get(&self, total: Total) -> f64 {
        match total {
            Total::RawWeight => self.raw_weight,
            Total::CookedWeight => self.cooked_weight,
            Total::Cost => self.cost,
        }
    }

    pub fn for_portions(&self, portions: u32) -> Self {
        let portions = f64::from(portions);
        Self {
            raw_weight: self.raw_weight * portions,
            cooked_weight: self.cooked_weight * portions,
            cost: self.cost * portions,
        }
    }
}

fn ensure_recipe(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<()> {
    if recipe::exists(conn, recipe_id)? {
        Ok(())
    } else {
        Err(Error::not_found(Entity::Recipe, recipe_id))
    }
}

pub fn totals(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<RecipeTotals> {
    use database::schema::{ingredients, recipe_ingredients};

    ensure_recipe(conn, recipe_id)?;

    let (raw_weight, cooked_weight, cost): (Option<f64>, Option<f64>, Option<f64>) =
        recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select((
                sum(ingredients::raw_weight),
                sum(ingredients::cooked_weight),
                sum(ingredients::cost),
            ))
            .get_result(conn)?;

    Ok(RecipeTotals {
        raw_weight: raw_weight.unwrap_or_default(),
        cooked_weight: cooked_weight.unwrap_or_default(),
        cost: cost.unwrap_or_default(),
    })
}

pub fn total_raw_weight(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<f64> {
    Ok(totals(conn, recipe_id)?.raw_weight)
}

pub fn total_cooked_weight(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<f64> {
    Ok(totals(conn, recipe_id)?.cooked_weight)
}

pub fn total_cost(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<f64> {
    Ok(totals(conn, recipe_id)?.cost)
}

pub fn total_weight_in_grams(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
) -> Result<f64> {
    let recipe = recipe::get(conn, recipe_id)?;
    Ok(recipe::links(conn, &recipe)?
        .iter()
        .map(LinkedIngredient::weight_in_grams)
        .sum())
}

fn collation_key(title: &str) -> String {
    title
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == 'ё' { 'е' } else { c })
        .collect()
}

/// Dictionary order for Latin and Cyrillic titles: case doesn't matter and `ё` sorts with `е`.
/// Titles that only differ in those respects fall back to plain code point order.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

pub fn ingredients_sorted(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
) -> Result<Vec<Ingredient>> {
    let recipe = recipe::get(conn, recipe_id)?;
    let mut ingredients: Vec<_> = recipe::links(conn, &recipe)?
        .into_iter()
        .map(|l| l.ingredient)
        .collect();
    ingredients.sort_by(|a, b| compare_titles(&a.title, &b.title));
    Ok(ingredients)
}

#[cfg(test)]
fn recipe_with(
    conn: &mut database::Connection,
    title: &str,
    ingredients: &[(&str, f64, f64, f64)],
) -> RecipeId {
    use super::ingredient::{self, IngredientForm};
    use super::recipe::RecipeForm;

    let recipe = recipe::create(conn, &RecipeForm::new(title)).unwrap();
    for &(name, raw, cooked, cost) in ingredients {
        let form = IngredientForm::new(name, raw, cooked, cost);
        let i = ingredient::create(conn, &form).unwrap();
        recipe::attach(conn, recipe.id, i.id).unwrap();
    }
    recipe.id
}

#[test]
fn parfait_weight() {
    let mut conn = database::test_connection();
    let parfait = recipe_with(
        &mut conn,
        "Парфе",
        &[("Мука", 100.0, 90.0, 50.0), ("Сахар", 80.0, 75.0, 40.0)],
    );

    assert_eq!(total_weight_in_grams(&mut conn, parfait).unwrap(), 180.0);
    assert_eq!(total_raw_weight(&mut conn, parfait).unwrap(), 180.0);
    assert_eq!(total_cooked_weight(&mut conn, parfait).unwrap(), 165.0);
    assert_eq!(total_cost(&mut conn, parfait).unwrap(), 90.0);
}

#[test]
fn empty_recipe_totals_are_zero() {
    let mut conn = database::test_connection();
    let empty = recipe_with(&mut conn, "Пусто", &[]);

    assert_eq!(total_weight_in_grams(&mut conn, empty).unwrap(), 0.0);
    assert_eq!(totals(&mut conn, empty).unwrap(), RecipeTotals::default());
    assert!(ingredients_sorted(&mut conn, empty).unwrap().is_empty());
}

#[test]
fn missing_recipe_is_not_found() {
    let mut conn = database::test_connection();
    let missing = RecipeId::from(5);

    for result in [
        total_weight_in_grams(&mut conn, missing),
        total_raw_weight(&mut conn, missing),
        total_cooked_weight(&mut conn, missing),
        total_cost(&mut conn, missing),
    ] {
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: Entity::Recipe,
                id: 5
            }
        ));
    }
    assert!(ingredients_sorted(&mut conn, missing).is_err());
}

#[test]
fn unit_is_not_applied_twice() {
    use super::ingredient::{self, IngredientForm};
    use super::recipe::RecipeForm;
    use super::unit::{self, UnitForm};

    let mut conn = database::test_connection();
    let spoon = unit::create(&mut conn, &UnitForm::new("spoon", 20.0)).unwrap();
    let form = IngredientForm::new("Йогурт", 200.0, 180.0, 50.0).unit(spoon.id);
    let yogurt = ingredient::create(&mut conn, &form).unwrap();
    let recipe = recipe::create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    recipe::attach(&mut conn, recipe.id, yogurt.id).unwrap();

    assert_eq!(total_weight_in_grams(&mut conn, recipe.id).unwrap(), 4000.0);
    assert_eq!(total_cooked_weight(&mut conn, recipe.id).unwrap(), 3600.0);
}

#[test]
fn totals_only_count_own_ingredients() {
    let mut conn = database::test_connection();
    let first = recipe_with(&mut conn, "Парфе", &[("Йогурт", 200.0, 180.0, 50.0)]);
    let second = recipe_with(&mut conn, "Торт", &[("Творог", 250.0, 230.0, 180.0)]);

    assert_eq!(total_raw_weight(&mut conn, first).unwrap(), 200.0);
    assert_eq!(total_raw_weight(&mut conn, second).unwrap(), 250.0);
}

#[test]
fn portions_scale_totals() {
    let mut conn = database::test_connection();
    let parfait = recipe_with(
        &mut conn,
        "Парфе",
        &[
            ("Йогурт", 200.0, 180.0, 50.0),
            ("Сливки", 100.0, 90.0, 100.0),
            ("Ягоды", 150.0, 150.0, 120.0),
            ("Мёд", 50.0, 50.0, 80.0),
            ("Мюсли", 60.0, 60.0, 40.0),
        ],
    );

    let totals = totals(&mut conn, parfait).unwrap();
    assert_eq!(
        totals,
        RecipeTotals {
            raw_weight: 560.0,
            cooked_weight: 530.0,
            cost: 390.0,
        }
    );
    let doubled = totals.for_portions(2);
    assert_eq!(doubled.get(Total::RawWeight), 1120.0);
    assert_eq!(doubled.get(Total::CookedWeight), 1060.0);
    assert_eq!(doubled.get(Total::Cost), 780.0);
    assert_eq!(totals.for_portions(0), RecipeTotals::default());
}

#[test]
fn sorted_regardless_of_attachment_order() {
    let titles = ["Сахар", "мёд", "Мука", "Ёжевика", "Apple"];
    let expected = ["Apple", "Ёжевика", "мёд", "Мука", "Сахар"];

    let mut conn = database::test_connection();
    for (n, recipe_title) in ["Парфе", "Торт", "Пирог", "Салат", "Суп"].iter().enumerate() {
        let mut order = titles;
        order.rotate_left(n);
        if n % 2 == 1 {
            order.reverse();
        }
        let ingredients: Vec<_> = order.iter().map(|&t| (t, 10.0, 10.0, 1.0)).collect();
        let recipe = recipe_with(&mut conn, recipe_title, &ingredients);

        let sorted: Vec<_> = ingredients_sorted(&mut conn, recipe)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(sorted, expected, "attached in order {order:?}");
    }
}

#[test]
fn title_comparison() {
    assert_eq!(compare_titles("apple", "Banana"), Ordering::Less);
    assert_eq!(compare_titles("Ёлка", "Жук"), Ordering::Less);
    assert_eq!(compare_titles("ёлка", "Дом"), Ordering::Greater);
    assert_eq!(compare_titles("Мука", "мука"), Ordering::Less);
    assert_eq!(compare_titles("Мука", "Мука"), Ordering::Equal);
}
