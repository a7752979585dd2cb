// Copyright 2023 Remi Bernotavicius

use super::Scope;
use crate::database;
use crate::database::models::{AuthorId, NewUnit, Unit, UnitId};
use crate::error::{Entity, Error, QueryResultExt as _};
use crate::validation::{self, Validate, ValidationErrors};
use crate::Result;
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

#[derive(Debug, Clone, PartialEq)]
pub struct UnitForm {
    pub name: String,
    pub conversion_to_grams: f64,
    pub author: Option<AuthorId>,
}

impl UnitForm {
    pub fn new(name: impl Into<String>, conversion_to_grams: f64) -> Self {
        Self {
            name: name.into(),
            conversion_to_grams,
            author: None,
        }
    }

    pub fn author(mut self, author: AuthorId) -> Self {
        self.author = Some(author);
        self
    }
}

impl Validate for UnitForm {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validation::check_name(
            &mut errors,
            "name",
            &self.name,
            validation::MAX_UNIT_NAME_LEN,
        );
        validation::check_min(&mut errors, "conversion_to_grams", self.conversion_to_grams);
        errors
    }
}

fn duplicate_name(form: &UnitForm) -> impl FnOnce() -> String + '_ {
    move || format!("a unit named {:?} already exists", form.name)
}

pub fn create(conn: &mut database::Connection, form: &UnitForm) -> Result<Unit> {
    use database::schema::units::dsl::*;

    form.validate().into_result()?;

    let unit = diesel::insert_into(units)
        .values(NewUnit {
            name: &form.name,
            conversion_to_grams: form.conversion_to_grams,
            author_id: form.author,
        })
        .returning(Unit::as_returning())
        .get_result(conn)
        .or_duplicate(Entity::Unit, duplicate_name(form))?;

    log::info!("created unit {} {:?}", unit.id, unit.name);
    Ok(unit)
}

pub fn get(conn: &mut database::Connection, unit_id: UnitId) -> Result<Unit> {
    use database::schema::units::dsl::*;

    units
        .select(Unit::as_select())
        .filter(id.eq(unit_id))
        .get_result(conn)
        .optional()?
        .ok_or_else(|| Error::not_found(Entity::Unit, unit_id))
}

pub fn list(conn: &mut database::Connection, scope: Scope) -> Result<Vec<Unit>> {
    use database::schema::units::dsl::*;

    let mut query = units.select(Unit::as_select()).into_boxed();
    if let Scope::Author(author) = scope {
        query = query.filter(author_id.eq(author));
    }
    Ok(query.order_by(name.asc()).load(conn)?)
}

/// Renames or re-scales a unit. Ingredients already converted with the old factor keep their gram
/// weights.
pub fn update(conn: &mut database::Connection, unit_id: UnitId, form: &UnitForm) -> Result<Unit> {
    use database::schema::units::dsl::*;

    form.validate().into_result()?;

    let unit = diesel::update(units.filter(id.eq(unit_id)))
        .set((
            name.eq(&form.name),
            conversion_to_grams.eq(form.conversion_to_grams),
        ))
        .returning(Unit::as_returning())
        .get_result(conn)
        .optional()
        .or_duplicate(Entity::Unit, duplicate_name(form))?
        .ok_or_else(|| Error::not_found(Entity::Unit, unit_id))?;

    log::info!("updated unit {} {:?}", unit.id, unit.name);
    Ok(unit)
}

/// Ingredients that referenced the unit lose the reference but are otherwise untouched.
pub fn delete(conn: &mut database::Connection, unit_id: UnitId) -> Result<()> {
    use database::schema::units::dsl::*;

    let deleted = diesel::delete(units.filter(id.eq(unit_id))).execute(conn)?;
    if deleted == 0 {
        return Err(Error::not_found(Entity::Unit, unit_id));
    }
    log::info!("deleted unit {unit_id}");
    Ok(())
}

#[test]
fn create_and_get() {
    let mut conn = database::test_connection();

    let spoon = create(&mut conn, &UnitForm::new("spoon", 20.0)).unwrap();
    assert_eq!(spoon.name, "spoon");
    assert_eq!(spoon.conversion_to_grams, 20.0);
    assert_eq!(spoon.author_id, None);

    assert_eq!(get(&mut conn, spoon.id).unwrap(), spoon);
}

#[test]
fn conversion_below_floor_is_rejected() {
    let mut conn = database::test_connection();

    let error = create(&mut conn, &UnitForm::new("pinch", 0.05)).unwrap_err();
    let Error::Validation(errors) = error else {
        panic!("unexpected error {error:?}");
    };
    assert!(errors.has_field("conversion_to_grams"));
    assert!(list(&mut conn, Scope::All).unwrap().is_empty());

    create(&mut conn, &UnitForm::new("pinch", 0.1)).unwrap();
}

#[test]
fn empty_and_long_names_are_rejected() {
    let mut conn = database::test_connection();

    for bad in ["", "  ", "a name that is far too long for a unit"] {
        let error = create(&mut conn, &UnitForm::new(bad, 1.0)).unwrap_err();
        assert!(matches!(error, Error::Validation(e) if e.has_field("name")));
    }
}

#[test]
fn names_are_unique_per_author() {
    let mut conn = database::test_connection();
    let alice = AuthorId::from(1);
    let bob = AuthorId::from(2);

    create(&mut conn, &UnitForm::new("cup", 240.0)).unwrap();
    let error = create(&mut conn, &UnitForm::new("cup", 250.0)).unwrap_err();
    assert!(matches!(
        error,
        Error::Uniqueness {
            entity: Entity::Unit,
            ..
        }
    ));

    create(&mut conn, &UnitForm::new("cup", 240.0).author(alice)).unwrap();
    create(&mut conn, &UnitForm::new("cup", 240.0).author(bob)).unwrap();
    let error = create(&mut conn, &UnitForm::new("cup", 1.0).author(alice)).unwrap_err();
    assert!(matches!(error, Error::Uniqueness { .. }));

    assert_eq!(list(&mut conn, Scope::All).unwrap().len(), 3);
    let alices = list(&mut conn, Scope::Author(alice)).unwrap();
    assert_eq!(alices.len(), 1);
    assert_eq!(alices[0].author_id, Some(alice));
}

#[test]
fn update_and_delete() {
    let mut conn = database::test_connection();

    let cup = create(&mut conn, &UnitForm::new("cup", 240.0)).unwrap();
    create(&mut conn, &UnitForm::new("spoon", 20.0)).unwrap();

    let cup = update(&mut conn, cup.id, &UnitForm::new("mug", 300.0)).unwrap();
    assert_eq!(cup.name, "mug");
    assert_eq!(get(&mut conn, cup.id).unwrap().conversion_to_grams, 300.0);

    let error = update(&mut conn, cup.id, &UnitForm::new("spoon", 1.0)).unwrap_err();
    assert!(matches!(error, Error::Uniqueness { .. }));
    assert_eq!(get(&mut conn, cup.id).unwrap().name, "mug");

    delete(&mut conn, cup.id).unwrap();
    assert!(matches!(
        get(&mut conn, cup.id).unwrap_err(),
        Error::NotFound {
            entity: Entity::Unit,
            ..
        }
    ));
    assert!(matches!(
        delete(&mut conn, cup.id).unwrap_err(),
        Error::NotFound { .. }
    ));
    assert!(matches!(
        update(&mut conn, cup.id, &UnitForm::new("cup", 1.0)).unwrap_err(),
        Error::NotFound { .. }
    ));
}
