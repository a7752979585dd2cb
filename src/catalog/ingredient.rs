// Copyright 2023 Remi Bernotavicius

use super::{unit, Scope};
use crate::database;
use crate::database::models::{AuthorId, Ingredient, IngredientId, NewIngredient, Unit, UnitId};
use crate::error::{Entity, Error};
use crate::validation::{self, Validate, ValidationErrors};
use crate::Result;
use diesel::prelude::Connection as _;
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

/// Caller input for creating or editing an ingredient. Weights are in `unit` when one is given and
/// the ingredient hasn't been converted yet, otherwise in grams.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientForm {
    pub title: String,
    pub raw_weight: f64,
    pub cooked_weight: f64,
    pub cost: f64,
    pub unit: Option<UnitId>,
    pub author: Option<AuthorId>,
}

impl IngredientForm {
    pub fn new(title: impl Into<String>, raw_weight: f64, cooked_weight: f64, cost: f64) -> Self {
        Self {
            title: title.into(),
            raw_weight,
            cooked_weight,
            cost,
            unit: None,
            author: None,
        }
    }

    pub fn unit(mut self, unit: UnitId) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn author(mut self, author: AuthorId) -> Self {
        self.author = Some(author);
        self
    }
}

impl Validate for IngredientForm {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validation::check_title(
            &mut errors,
            "title",
            &self.title,
            validation::MAX_INGREDIENT_TITLE_LEN,
        );
        validation::check_min(&mut errors, "raw_weight", self.raw_weight);
        validation::check_min(&mut errors, "cooked_weight", self.cooked_weight);
        validation::check_min(&mut errors, "cost", self.cost);
        errors
    }
}

/// Checks a stored record before it is written back. Converted weights are grams produced by the
/// unit factor, so they only need to be positive and finite.
impl Validate for Ingredient {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validation::check_title(
            &mut errors,
            "title",
            &self.title,
            validation::MAX_INGREDIENT_TITLE_LEN,
        );
        if self.is_converted {
            validation::check_positive(&mut errors, "raw_weight", self.raw_weight);
            validation::check_positive(&mut errors, "cooked_weight", self.cooked_weight);
        } else {
            validation::check_min(&mut errors, "raw_weight", self.raw_weight);
            validation::check_min(&mut errors, "cooked_weight", self.cooked_weight);
        }
        validation::check_min(&mut errors, "cost", self.cost);
        errors
    }
}

impl Ingredient {
    /// Scales the weights into grams the first time a unit is present. Returns whether anything
    /// changed.
    fn apply_conversion(&mut self, unit: Option<&Unit>) -> bool {
        match unit {
            Some(unit) if !self.is_converted => {
                self.raw_weight *= unit.conversion_to_grams;
                self.cooked_weight *= unit.conversion_to_grams;
                self.is_converted = true;
                true
            }
            _ => false,
        }
    }
}

fn load_unit(conn: &mut database::Connection, unit_id: Option<UnitId>) -> Result<Option<Unit>> {
    unit_id.map(|u| unit::get(conn, u)).transpose()
}

pub fn create(conn: &mut database::Connection, form: &IngredientForm) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;

    form.validate().into_result()?;

    conn.transaction(|conn| {
        let unit = load_unit(conn, form.unit)?;
        let (raw, cooked) = match &unit {
            Some(u) => (
                form.raw_weight * u.conversion_to_grams,
                form.cooked_weight * u.conversion_to_grams,
            ),
            None => (form.raw_weight, form.cooked_weight),
        };

        // A large weight times a large factor can overflow.
        let mut errors = ValidationErrors::new();
        validation::check_positive(&mut errors, "raw_weight", raw);
        validation::check_positive(&mut errors, "cooked_weight", cooked);
        errors.into_result()?;

        let ingredient = diesel::insert_into(ingredients)
            .values(NewIngredient {
                title: &form.title,
                raw_weight: raw,
                cooked_weight: cooked,
                cost: form.cost,
                unit_id: form.unit,
                is_converted: unit.is_some(),
                author_id: form.author,
            })
            .returning(Ingredient::as_returning())
            .get_result(conn)?;

        if let Some(u) = &unit {
            log::debug!(
                "converted ingredient {} from {:?} at {} g each",
                ingredient.id,
                u.name,
                u.conversion_to_grams
            );
        }
        log::info!("created ingredient {}: {ingredient}", ingredient.id);
        Ok(ingredient)
    })
}

pub fn get(conn: &mut database::Connection, ingredient_id: IngredientId) -> Result<Ingredient> {
    use database::schema::ingredients::dsl::*;

    ingredients
        .select(Ingredient::as_select())
        .filter(id.eq(ingredient_id))
        .get_result(conn)
        .optional()?
        .ok_or_else(|| Error::not_found(Entity::Ingredient, ingredient_id))
}

pub fn list(conn: &mut database::Connection, scope: Scope) -> Result<Vec<Ingredient>> {
    use database::schema::ingredients::dsl::*;

    let mut query = ingredients.select(Ingredient::as_select()).into_boxed();
    if let Scope::Author(author) = scope {
        query = query.filter(author_id.eq(author));
    }
    Ok(query.order_by(id.asc()).load(conn)?)
}

/// Writes every field of `ingredient` back to storage. The unit factor is applied only if a unit
/// is attached and the record hasn't been converted before, so saving repeatedly is harmless.
/// Invalid fields fail with [`Error::Validation`] and leave storage untouched.
pub fn save(conn: &mut database::Connection, ingredient: &mut Ingredient) -> Result<()> {
    ingredient.validate().into_result()?;

    conn.transaction(|conn| {
        let unit = load_unit(conn, ingredient.unit_id)?;
        let mut converted = ingredient.clone();
        if converted.apply_conversion(unit.as_ref()) {
            log::debug!("converted ingredient {} on save", converted.id);
            converted.validate().into_result()?;
        }

        let updated = diesel::update(&converted).set(&converted).execute(conn)?;
        if updated == 0 {
            return Err(Error::not_found(Entity::Ingredient, converted.id));
        }
        *ingredient = converted;
        Ok(())
    })
}

/// Replaces the ingredient's fields with `form`. Weights in the form are taken as grams once the
/// ingredient has been converted.
pub fn update(
    conn: &mut database::Connection,
    ingredient_id: IngredientId,
    form: &IngredientForm,
) -> Result<Ingredient> {
    form.validate().into_result()?;

    conn.transaction(|conn| {
        let mut ingredient = get(conn, ingredient_id)?;
        ingredient.title = form.title.clone();
        ingredient.raw_weight = form.raw_weight;
        ingredient.cooked_weight = form.cooked_weight;
        ingredient.cost = form.cost;
        ingredient.unit_id = form.unit;
        save(conn, &mut ingredient)?;

        log::info!("updated ingredient {}: {ingredient}", ingredient.id);
        Ok(ingredient)
    })
}

/// Also detaches the ingredient from every recipe using it.
pub fn delete(conn: &mut database::Connection, ingredient_id: IngredientId) -> Result<()> {
    use database::schema::ingredients::dsl::*;

    let deleted = diesel::delete(ingredients.filter(id.eq(ingredient_id))).execute(conn)?;
    if deleted == 0 {
        return Err(Error::not_found(Entity::Ingredient, ingredient_id));
    }
    log::info!("deleted ingredient {ingredient_id}");
    Ok(())
}

#[cfg(test)]
fn spoon(conn: &mut database::Connection) -> Unit {
    unit::create(conn, &unit::UnitForm::new("spoon", 20.0)).unwrap()
}

#[test]
fn without_unit_values_are_kept() {
    let mut conn = database::test_connection();

    let flour = create(&mut conn, &IngredientForm::new("Мука", 100.0, 90.0, 50.0)).unwrap();
    assert_eq!(flour.raw_weight, 100.0);
    assert_eq!(flour.cooked_weight, 90.0);
    assert_eq!(flour.cost, 50.0);
    assert!(!flour.is_converted);
    assert_eq!(get(&mut conn, flour.id).unwrap(), flour);
}

#[test]
fn with_unit_weights_are_converted_once() {
    let mut conn = database::test_connection();
    let spoon = spoon(&mut conn);

    let form = IngredientForm::new("Йогурт", 200.0, 180.0, 50.0).unit(spoon.id);
    let mut yogurt = create(&mut conn, &form).unwrap();
    assert_eq!(yogurt.raw_weight, 4000.0);
    assert_eq!(yogurt.cooked_weight, 3600.0);
    assert_eq!(yogurt.cost, 50.0);
    assert!(yogurt.is_converted);

    save(&mut conn, &mut yogurt).unwrap();
    save(&mut conn, &mut yogurt).unwrap();
    assert_eq!(yogurt.raw_weight, 4000.0);

    // A fresh copy from storage must not convert again either.
    let mut reloaded = get(&mut conn, yogurt.id).unwrap();
    save(&mut conn, &mut reloaded).unwrap();
    let reloaded = get(&mut conn, yogurt.id).unwrap();
    assert_eq!(reloaded.raw_weight, 4000.0);
    assert_eq!(reloaded.cooked_weight, 3600.0);
}

#[test]
fn unit_attached_later_converts_on_save() {
    let mut conn = database::test_connection();
    let spoon = spoon(&mut conn);

    let mut honey = create(&mut conn, &IngredientForm::new("Мёд", 2.0, 2.0, 80.0)).unwrap();
    honey.unit_id = Some(spoon.id);
    save(&mut conn, &mut honey).unwrap();
    assert_eq!(honey.raw_weight, 40.0);
    assert!(honey.is_converted);

    save(&mut conn, &mut honey).unwrap();
    assert_eq!(get(&mut conn, honey.id).unwrap().raw_weight, 40.0);
}

#[test]
fn update_after_conversion_takes_grams() {
    let mut conn = database::test_connection();
    let spoon = spoon(&mut conn);

    let form = IngredientForm::new("Сливки", 5.0, 4.5, 100.0).unit(spoon.id);
    let cream = create(&mut conn, &form).unwrap();
    assert_eq!(cream.raw_weight, 100.0);

    let form = IngredientForm::new("Сливки", 120.0, 110.0, 90.0).unit(spoon.id);
    let cream = update(&mut conn, cream.id, &form).unwrap();
    assert_eq!(cream.raw_weight, 120.0);
    assert_eq!(cream.cooked_weight, 110.0);
    assert_eq!(cream.cost, 90.0);
}

#[test]
fn invalid_fields_are_all_reported() {
    let mut conn = database::test_connection();

    let form = IngredientForm::new("Sugar 2", 0.0, 0.05, -1.0);
    let Error::Validation(errors) = create(&mut conn, &form).unwrap_err() else {
        panic!("expected a validation error");
    };
    for field in ["title", "raw_weight", "cooked_weight", "cost"] {
        assert!(errors.has_field(field), "missing {field}");
    }
    assert!(list(&mut conn, Scope::All).unwrap().is_empty());
}

#[test]
fn save_rejects_invalid_fields() {
    let mut conn = database::test_connection();

    let sugar = create(&mut conn, &IngredientForm::new("Sugar", 80.0, 75.0, 40.0)).unwrap();
    let mut changed = sugar.clone();
    changed.title = "Sugar 2!".into();
    changed.raw_weight = -5.0;
    changed.cost = 0.0;

    let Error::Validation(errors) = save(&mut conn, &mut changed).unwrap_err() else {
        panic!("expected a validation error");
    };
    for field in ["title", "raw_weight", "cost"] {
        assert!(errors.has_field(field), "missing {field}");
    }
    assert!(!errors.has_field("cooked_weight"));
    assert_eq!(get(&mut conn, sugar.id).unwrap(), sugar);
}

#[test]
fn converted_weights_below_input_floor_can_be_saved() {
    let mut conn = database::test_connection();
    let pinch = unit::create(&mut conn, &unit::UnitForm::new("pinch", 0.5)).unwrap();

    let form = IngredientForm::new("Salt", 0.1, 0.1, 1.0).unit(pinch.id);
    let mut salt = create(&mut conn, &form).unwrap();
    assert_eq!(salt.raw_weight, 0.05);

    save(&mut conn, &mut salt).unwrap();
    assert_eq!(get(&mut conn, salt.id).unwrap().raw_weight, 0.05);
}

#[test]
fn overflowing_conversion_is_rejected() {
    let mut conn = database::test_connection();
    let huge = unit::create(&mut conn, &unit::UnitForm::new("huge", 1e300)).unwrap();

    let form = IngredientForm::new("Sugar", 1e10, 80.0, 40.0).unit(huge.id);
    let Error::Validation(errors) = create(&mut conn, &form).unwrap_err() else {
        panic!("expected a validation error");
    };
    assert!(errors.has_field("raw_weight"));
    assert!(!errors.has_field("cooked_weight"));
    assert!(list(&mut conn, Scope::All).unwrap().is_empty());

    let sugar = create(&mut conn, &IngredientForm::new("Sugar", 1e10, 80.0, 40.0)).unwrap();
    let mut changed = sugar.clone();
    changed.unit_id = Some(huge.id);
    assert!(matches!(
        save(&mut conn, &mut changed).unwrap_err(),
        Error::Validation(_)
    ));
    assert_eq!(get(&mut conn, sugar.id).unwrap(), sugar);
}

#[test]
fn changing_unit_factor_keeps_converted_weights() {
    let mut conn = database::test_connection();
    let spoon = spoon(&mut conn);

    let form = IngredientForm::new("Йогурт", 200.0, 180.0, 50.0).unit(spoon.id);
    let yogurt = create(&mut conn, &form).unwrap();
    assert_eq!(yogurt.raw_weight, 4000.0);

    unit::update(&mut conn, spoon.id, &unit::UnitForm::new("spoon", 50.0)).unwrap();

    let mut reloaded = get(&mut conn, yogurt.id).unwrap();
    assert_eq!(reloaded.raw_weight, 4000.0);
    save(&mut conn, &mut reloaded).unwrap();
    let reloaded = get(&mut conn, yogurt.id).unwrap();
    assert_eq!(reloaded.raw_weight, 4000.0);
    assert_eq!(reloaded.cooked_weight, 3600.0);

    // New ingredients pick up the new factor.
    let form = IngredientForm::new("Мёд", 2.0, 2.0, 80.0).unit(spoon.id);
    assert_eq!(create(&mut conn, &form).unwrap().raw_weight, 100.0);
}

#[test]
fn missing_unit_is_not_found() {
    let mut conn = database::test_connection();

    let form = IngredientForm::new("Ягоды", 150.0, 150.0, 120.0).unit(UnitId::from(42));
    assert!(matches!(
        create(&mut conn, &form).unwrap_err(),
        Error::NotFound {
            entity: Entity::Unit,
            id: 42
        }
    ));
    assert!(list(&mut conn, Scope::All).unwrap().is_empty());
}

#[test]
fn deleting_unit_keeps_ingredient() {
    let mut conn = database::test_connection();
    let spoon = spoon(&mut conn);

    let form = IngredientForm::new("Йогурт", 200.0, 180.0, 50.0).unit(spoon.id);
    let yogurt = create(&mut conn, &form).unwrap();
    unit::delete(&mut conn, spoon.id).unwrap();

    let mut yogurt = get(&mut conn, yogurt.id).unwrap();
    assert_eq!(yogurt.unit_id, None);
    assert_eq!(yogurt.raw_weight, 4000.0);

    save(&mut conn, &mut yogurt).unwrap();
    assert_eq!(yogurt.raw_weight, 4000.0);
}

#[test]
fn list_by_author_and_delete() {
    let mut conn = database::test_connection();
    let alice = AuthorId::from(7);

    let sugar = create(
        &mut conn,
        &IngredientForm::new("Sugar", 80.0, 75.0, 40.0).author(alice),
    )
    .unwrap();
    create(&mut conn, &IngredientForm::new("Flour", 100.0, 90.0, 50.0)).unwrap();

    let alices = list(&mut conn, Scope::Author(alice)).unwrap();
    assert_eq!(alices, vec![sugar.clone()]);
    assert_eq!(list(&mut conn, Scope::All).unwrap().len(), 2);

    delete(&mut conn, sugar.id).unwrap();
    assert!(matches!(
        get(&mut conn, sugar.id).unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        delete(&mut conn, sugar.id).unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[test]
fn display() {
    let mut conn = database::test_connection();
    let sugar = create(&mut conn, &IngredientForm::new("Sugar", 80.0, 75.5, 40.0)).unwrap();
    assert_eq!(
        sugar.to_string(),
        "Sugar (Raw: 80 g, Cooked: 75.5 g, Cost: $40)"
    );
}
