// Copyright 2023 Remi Bernotavicius

use super::{ingredient, Scope};
use crate::database;
use crate::database::models::{
    AuthorId, Ingredient, IngredientId, NewRecipe, NewRecipeIngredient, Recipe, RecipeId,
    RecipeIngredient,
};
use crate::error::{Entity, Error, QueryResultExt as _};
use crate::validation::{self, Validate, ValidationErrors};
use crate::Result;
use diesel::prelude::Connection as _;
use diesel::prelude::OptionalExtension as _;
use diesel::BelongingToDsl as _;
use diesel::BoolExpressionMethods as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeForm {
    pub title: String,
    pub author: Option<AuthorId>,
}

impl RecipeForm {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: None,
        }
    }

    pub fn author(mut self, author: AuthorId) -> Self {
        self.author = Some(author);
        self
    }
}

impl Validate for RecipeForm {
    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validation::check_title(
            &mut errors,
            "title",
            &self.title,
            validation::MAX_RECIPE_TITLE_LEN,
        );
        errors
    }
}

fn duplicate_title(title: &str) -> impl FnOnce() -> String + '_ {
    move || format!("a recipe titled {title:?} already exists")
}

pub fn create(conn: &mut database::Connection, form: &RecipeForm) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;

    form.validate().into_result()?;

    let recipe = diesel::insert_into(recipes)
        .values(NewRecipe {
            title: &form.title,
            author_id: form.author,
        })
        .returning(Recipe::as_returning())
        .get_result(conn)
        .or_duplicate(Entity::Recipe, duplicate_title(&form.title))?;

    log::info!("created recipe {} {:?}", recipe.id, recipe.title);
    Ok(recipe)
}

pub fn get(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;

    recipes
        .select(Recipe::as_select())
        .filter(id.eq(recipe_id))
        .get_result(conn)
        .optional()?
        .ok_or_else(|| Error::not_found(Entity::Recipe, recipe_id))
}

pub fn exists(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<bool> {
    use database::schema::recipes::dsl::*;

    let count: i64 = recipes.filter(id.eq(recipe_id)).count().get_result(conn)?;
    Ok(count > 0)
}

pub fn list(conn: &mut database::Connection, scope: Scope) -> Result<Vec<Recipe>> {
    use database::schema::recipes::dsl::*;

    let mut query = recipes.select(Recipe::as_select()).into_boxed();
    if let Scope::Author(author) = scope {
        query = query.filter(author_id.eq(author));
    }
    Ok(query.order_by(id.asc()).load(conn)?)
}

pub fn rename(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    new_title: &str,
) -> Result<Recipe> {
    use database::schema::recipes::dsl::*;

    let mut errors = ValidationErrors::new();
    validation::check_title(
        &mut errors,
        "title",
        new_title,
        validation::MAX_RECIPE_TITLE_LEN,
    );
    errors.into_result()?;

    let recipe = diesel::update(recipes.filter(id.eq(recipe_id)))
        .set(title.eq(new_title))
        .returning(Recipe::as_returning())
        .get_result(conn)
        .optional()
        .or_duplicate(Entity::Recipe, duplicate_title(new_title))?
        .ok_or_else(|| Error::not_found(Entity::Recipe, recipe_id))?;

    log::info!("renamed recipe {} to {:?}", recipe.id, recipe.title);
    Ok(recipe)
}

/// Removes the recipe and its ingredient links. The ingredients themselves stay.
pub fn delete(conn: &mut database::Connection, recipe_id: RecipeId) -> Result<()> {
    use database::schema::recipes::dsl::*;

    let deleted = diesel::delete(recipes.filter(id.eq(recipe_id))).execute(conn)?;
    if deleted == 0 {
        return Err(Error::not_found(Entity::Recipe, recipe_id));
    }
    log::info!("deleted recipe {recipe_id}");
    Ok(())
}

fn already_attached(recipe: &Recipe, ingredient: &Ingredient) -> impl FnOnce() -> String {
    let message = format!(
        "{:?} is already part of recipe {:?}",
        ingredient.title, recipe.title
    );
    move || message
}

/// Adds `ingredient_id` to the recipe. A recipe lists each ingredient at most once; the storage
/// constraint is what rejects a second link, so concurrent attempts can't both succeed.
pub fn attach(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    ingredient_id: IngredientId,
) -> Result<RecipeIngredient> {
    use database::schema::recipe_ingredients::dsl;

    conn.transaction(|conn| {
        let recipe = get(conn, recipe_id)?;
        let ingredient = ingredient::get(conn, ingredient_id)?;

        let link = diesel::insert_into(dsl::recipe_ingredients)
            .values(NewRecipeIngredient {
                recipe_id,
                ingredient_id,
                added_at: chrono::Utc::now().naive_utc(),
            })
            .returning(RecipeIngredient::as_returning())
            .get_result(conn)
            .or_duplicate(
                Entity::RecipeIngredient,
                already_attached(&recipe, &ingredient),
            )?;

        log::info!(
            "attached ingredient {} to recipe {}",
            ingredient.id,
            recipe.id
        );
        Ok(link)
    })
}

/// Returns whether there was a link to remove.
pub fn detach(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    ingredient_id: IngredientId,
) -> Result<bool> {
    use database::schema::recipe_ingredients::dsl;

    let deleted = diesel::delete(
        dsl::recipe_ingredients.filter(
            dsl::recipe_id
                .eq(recipe_id)
                .and(dsl::ingredient_id.eq(ingredient_id)),
        ),
    )
    .execute(conn)?;

    if deleted > 0 {
        log::info!("detached ingredient {ingredient_id} from recipe {recipe_id}");
    } else {
        log::debug!("ingredient {ingredient_id} was not attached to recipe {recipe_id}");
    }
    Ok(deleted > 0)
}

/// Swaps one ingredient of the recipe for another, keeping the link's place in the listing.
pub fn replace(
    conn: &mut database::Connection,
    recipe_id: RecipeId,
    old_ingredient_id: IngredientId,
    new_ingredient_id: IngredientId,
) -> Result<RecipeIngredient> {
    use database::schema::recipe_ingredients::dsl;

    conn.transaction(|conn| {
        let recipe = get(conn, recipe_id)?;
        let new_ingredient = ingredient::get(conn, new_ingredient_id)?;

        let link = diesel::update(
            dsl::recipe_ingredients.filter(
                dsl::recipe_id
                    .eq(recipe_id)
                    .and(dsl::ingredient_id.eq(old_ingredient_id)),
            ),
        )
        .set(dsl::ingredient_id.eq(new_ingredient_id))
        .returning(RecipeIngredient::as_returning())
        .get_result(conn)
        .optional()
        .or_duplicate(
            Entity::RecipeIngredient,
            already_attached(&recipe, &new_ingredient),
        )?
        .ok_or(Error::NotAttached {
            recipe_id: recipe_id.into(),
            ingredient_id: old_ingredient_id.into(),
        })?;

        log::info!(
            "replaced ingredient {old_ingredient_id} with {new_ingredient_id} in recipe {recipe_id}"
        );
        Ok(link)
    })
}

/// A recipe's link to one of its ingredients, with the ingredient loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedIngredient {
    pub link: RecipeIngredient,
    pub ingredient: Ingredient,
}

/// The recipe's links together with their ingredients, oldest link first.
pub fn links(conn: &mut database::Connection, recipe: &Recipe) -> Result<Vec<LinkedIngredient>> {
    use database::schema::{ingredients, recipe_ingredients};

    Ok(RecipeIngredient::belonging_to(recipe)
        .inner_join(ingredients::table)
        .select((RecipeIngredient::as_select(), Ingredient::as_select()))
        .order_by(recipe_ingredients::id.asc())
        .load(conn)?
        .into_iter()
        .map(|(link, ingredient)| LinkedIngredient { link, ingredient })
        .collect())
}

#[cfg(test)]
fn add_ingredient(conn: &mut database::Connection, title: &str) -> Ingredient {
    ingredient::create(
        conn,
        &ingredient::IngredientForm::new(title, 100.0, 90.0, 10.0),
    )
    .unwrap()
}

#[test]
fn create_validates_title() {
    let mut conn = database::test_connection();

    let parfait = create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    assert_eq!(parfait.to_string(), "Парфе");
    assert!(exists(&mut conn, parfait.id).unwrap());

    for bad in ["", "Парфе с ягодами и сливками.", "Recipe 1"] {
        let error = create(&mut conn, &RecipeForm::new(bad)).unwrap_err();
        assert!(matches!(error, Error::Validation(e) if e.has_field("title")));
    }
    assert_eq!(list(&mut conn, Scope::All).unwrap().len(), 1);
}

#[test]
fn titles_are_unique_per_author() {
    let mut conn = database::test_connection();
    let alice = AuthorId::from(1);

    create(&mut conn, &RecipeForm::new("Pancakes")).unwrap();
    assert!(matches!(
        create(&mut conn, &RecipeForm::new("Pancakes")).unwrap_err(),
        Error::Uniqueness {
            entity: Entity::Recipe,
            ..
        }
    ));

    let alices = create(&mut conn, &RecipeForm::new("Pancakes").author(alice)).unwrap();
    assert_eq!(
        list(&mut conn, Scope::Author(alice)).unwrap(),
        vec![alices]
    );
    assert_eq!(list(&mut conn, Scope::All).unwrap().len(), 2);
}

#[test]
fn rename_and_delete() {
    let mut conn = database::test_connection();

    let recipe = create(&mut conn, &RecipeForm::new("Pancakes")).unwrap();
    create(&mut conn, &RecipeForm::new("Waffles")).unwrap();

    let recipe = rename(&mut conn, recipe.id, "Crepes").unwrap();
    assert_eq!(get(&mut conn, recipe.id).unwrap().title, "Crepes");

    assert!(matches!(
        rename(&mut conn, recipe.id, "Waffles").unwrap_err(),
        Error::Uniqueness { .. }
    ));
    assert!(matches!(
        rename(&mut conn, recipe.id, "").unwrap_err(),
        Error::Validation(_)
    ));

    delete(&mut conn, recipe.id).unwrap();
    assert!(!exists(&mut conn, recipe.id).unwrap());
    assert!(matches!(
        get(&mut conn, recipe.id).unwrap_err(),
        Error::NotFound {
            entity: Entity::Recipe,
            ..
        }
    ));
    assert!(matches!(
        rename(&mut conn, recipe.id, "Pancakes").unwrap_err(),
        Error::NotFound { .. }
    ));
}

#[test]
fn attach_twice_is_rejected() {
    let mut conn = database::test_connection();

    let recipe = create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    let yogurt = add_ingredient(&mut conn, "Йогурт");

    let link = attach(&mut conn, recipe.id, yogurt.id).unwrap();
    assert_eq!(link.recipe_id, recipe.id);
    assert_eq!(link.ingredient_id, yogurt.id);

    assert!(matches!(
        attach(&mut conn, recipe.id, yogurt.id).unwrap_err(),
        Error::Uniqueness {
            entity: Entity::RecipeIngredient,
            ..
        }
    ));

    let links = links(&mut conn, &recipe).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].link, link);
    assert_eq!(links[0].ingredient, yogurt);
}

#[test]
fn attach_missing_side_is_not_found() {
    let mut conn = database::test_connection();

    let recipe = create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    let yogurt = add_ingredient(&mut conn, "Йогурт");

    assert!(matches!(
        attach(&mut conn, recipe.id, IngredientId::from(99)).unwrap_err(),
        Error::NotFound {
            entity: Entity::Ingredient,
            id: 99
        }
    ));
    assert!(matches!(
        attach(&mut conn, RecipeId::from(99), yogurt.id).unwrap_err(),
        Error::NotFound {
            entity: Entity::Recipe,
            id: 99
        }
    ));
}

#[test]
fn detach_is_idempotent() {
    let mut conn = database::test_connection();

    let recipe = create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    let yogurt = add_ingredient(&mut conn, "Йогурт");
    attach(&mut conn, recipe.id, yogurt.id).unwrap();

    assert!(detach(&mut conn, recipe.id, yogurt.id).unwrap());
    assert!(!detach(&mut conn, recipe.id, yogurt.id).unwrap());
    assert!(links(&mut conn, &recipe).unwrap().is_empty());

    attach(&mut conn, recipe.id, yogurt.id).unwrap();
}

#[test]
fn replace_keeps_uniqueness() {
    let mut conn = database::test_connection();

    let recipe = create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    let yogurt = add_ingredient(&mut conn, "Йогурт");
    let cream = add_ingredient(&mut conn, "Сливки");
    let honey = add_ingredient(&mut conn, "Мёд");
    let first = attach(&mut conn, recipe.id, yogurt.id).unwrap();
    attach(&mut conn, recipe.id, cream.id).unwrap();

    let replaced = replace(&mut conn, recipe.id, yogurt.id, honey.id).unwrap();
    assert_eq!(replaced.id, first.id);
    assert_eq!(replaced.ingredient_id, honey.id);

    assert!(matches!(
        replace(&mut conn, recipe.id, honey.id, cream.id).unwrap_err(),
        Error::Uniqueness { .. }
    ));
    let error = replace(&mut conn, recipe.id, yogurt.id, cream.id).unwrap_err();
    assert_eq!(
        error.to_string(),
        format!("ingredient {} is not part of recipe {}", yogurt.id, recipe.id)
    );
    assert!(matches!(error, Error::NotAttached { .. }));
    assert!(matches!(
        replace(&mut conn, recipe.id, honey.id, IngredientId::from(99)).unwrap_err(),
        Error::NotFound {
            entity: Entity::Ingredient,
            id: 99
        }
    ));

    let titles: Vec<_> = links(&mut conn, &recipe)
        .unwrap()
        .into_iter()
        .map(|l| l.ingredient.title)
        .collect();
    assert_eq!(titles, ["Мёд", "Сливки"]);
}

#[test]
fn deletes_cascade_to_links() {
    let mut conn = database::test_connection();

    let parfait = create(&mut conn, &RecipeForm::new("Парфе")).unwrap();
    let cake = create(&mut conn, &RecipeForm::new("Торт")).unwrap();
    let yogurt = add_ingredient(&mut conn, "Йогурт");
    let cream = add_ingredient(&mut conn, "Сливки");
    for r in [&parfait, &cake] {
        attach(&mut conn, r.id, yogurt.id).unwrap();
        attach(&mut conn, r.id, cream.id).unwrap();
    }

    ingredient::delete(&mut conn, yogurt.id).unwrap();
    assert_eq!(links(&mut conn, &parfait).unwrap().len(), 1);
    assert_eq!(links(&mut conn, &cake).unwrap().len(), 1);

    delete(&mut conn, parfait.id).unwrap();
    assert_eq!(links(&mut conn, &parfait).unwrap().len(), 0);
    assert_eq!(links(&mut conn, &cake).unwrap().len(), 1);
    assert_eq!(ingredient::get(&mut conn, cream.id).unwrap(), cream);
}
