// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use log::LevelFilter;
use recipe_catalog::catalog::aggregate::{self, Total};
use recipe_catalog::catalog::ingredient::{self, IngredientForm};
use recipe_catalog::catalog::recipe::{self, RecipeForm};
use recipe_catalog::catalog::unit::{self, UnitForm};
use recipe_catalog::config::{self, Settings};
use recipe_catalog::database;
use recipe_catalog::database::models::{AuthorId, IngredientId, RecipeId, UnitId};
use recipe_catalog::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Keeps units, ingredients and recipes, and adds up their weights and costs")]
struct Args {
    /// SQLite database to use instead of the one in the data directory.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Create records for, and list only the records of, this author.
    #[arg(long, global = true)]
    author: Option<AuthorId>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(subcommand)]
    Unit(UnitCommand),
    #[command(subcommand)]
    Ingredient(IngredientCommand),
    #[command(subcommand)]
    Recipe(RecipeCommand),
}

#[derive(Debug, Subcommand)]
enum UnitCommand {
    Add {
        name: String,
        conversion_to_grams: f64,
    },
    List,
    Edit {
        id: UnitId,
        name: String,
        conversion_to_grams: f64,
    },
    Delete {
        id: UnitId,
    },
}

#[derive(Debug, Subcommand)]
enum IngredientCommand {
    /// Weights are in `--unit` when given, otherwise in grams.
    Add {
        title: String,
        raw_weight: f64,
        cooked_weight: f64,
        cost: f64,
        #[arg(long)]
        unit: Option<UnitId>,
    },
    List,
    Edit {
        id: IngredientId,
        title: String,
        raw_weight: f64,
        cooked_weight: f64,
        cost: f64,
        #[arg(long)]
        unit: Option<UnitId>,
    },
    Delete {
        id: IngredientId,
    },
}

#[derive(Debug, Subcommand)]
enum RecipeCommand {
    Add {
        title: String,
    },
    List,
    Rename {
        id: RecipeId,
        title: String,
    },
    Delete {
        id: RecipeId,
    },
    Attach {
        recipe_id: RecipeId,
        ingredient_id: IngredientId,
    },
    Detach {
        recipe_id: RecipeId,
        ingredient_id: IngredientId,
    },
    Replace {
        recipe_id: RecipeId,
        old_ingredient_id: IngredientId,
        new_ingredient_id: IngredientId,
    },
    /// Prints the ingredients in alphabetical order followed by the totals.
    Show {
        id: RecipeId,
        #[arg(long, default_value_t = 1)]
        portions: u32,
    },
}

fn ingredient_form(
    title: String,
    raw_weight: f64,
    cooked_weight: f64,
    cost: f64,
    unit: Option<UnitId>,
    author: Option<AuthorId>,
) -> IngredientForm {
    IngredientForm {
        title,
        raw_weight,
        cooked_weight,
        cost,
        unit,
        author,
    }
}

fn run_unit(
    conn: &mut database::Connection,
    author: Option<AuthorId>,
    command: UnitCommand,
) -> Result<()> {
    match command {
        UnitCommand::Add {
            name,
            conversion_to_grams,
        } => {
            let form = UnitForm {
                name,
                conversion_to_grams,
                author,
            };
            let u = unit::create(conn, &form)?;
            println!("added unit {}", u.id);
        }
        UnitCommand::List => {
            for u in unit::list(conn, author.into())? {
                println!("{}\t{}\t{} g", u.id, u.name, u.conversion_to_grams);
            }
        }
        UnitCommand::Edit {
            id,
            name,
            conversion_to_grams,
        } => {
            let form = UnitForm {
                name,
                conversion_to_grams,
                author,
            };
            unit::update(conn, id, &form)?;
        }
        UnitCommand::Delete { id } => unit::delete(conn, id)?,
    }
    Ok(())
}

fn run_ingredient(
    conn: &mut database::Connection,
    author: Option<AuthorId>,
    command: IngredientCommand,
) -> Result<()> {
    match command {
        IngredientCommand::Add {
            title,
            raw_weight,
            cooked_weight,
            cost,
            unit,
        } => {
            let form = ingredient_form(title, raw_weight, cooked_weight, cost, unit, author);
            let i = ingredient::create(conn, &form)?;
            println!("added ingredient {}: {i}", i.id);
        }
        IngredientCommand::List => {
            for i in ingredient::list(conn, author.into())? {
                println!("{}\t{i}", i.id);
            }
        }
        IngredientCommand::Edit {
            id,
            title,
            raw_weight,
            cooked_weight,
            cost,
            unit,
        } => {
            let form = ingredient_form(title, raw_weight, cooked_weight, cost, unit, author);
            let i = ingredient::update(conn, id, &form)?;
            println!("{}\t{i}", i.id);
        }
        IngredientCommand::Delete { id } => ingredient::delete(conn, id)?,
    }
    Ok(())
}

fn show_recipe(conn: &mut database::Connection, id: RecipeId, portions: u32) -> Result<()> {
    let r = recipe::get(conn, id)?;
    println!("{r}");
    for i in aggregate::ingredients_sorted(conn, id)? {
        println!("  {i}");
    }

    println!(
        "total weight: {} g",
        aggregate::total_weight_in_grams(conn, id)?
    );
    let totals = aggregate::totals(conn, id)?.for_portions(portions);
    for total in Total::iter() {
        println!(
            "{total} ({portions} portions): {} {}",
            totals.get(total),
            total.suffix()
        );
    }
    Ok(())
}

fn run_recipe(
    conn: &mut database::Connection,
    author: Option<AuthorId>,
    command: RecipeCommand,
) -> Result<()> {
    match command {
        RecipeCommand::Add { title } => {
            let r = recipe::create(conn, &RecipeForm { title, author })?;
            println!("added recipe {}", r.id);
        }
        RecipeCommand::List => {
            for r in recipe::list(conn, author.into())? {
                println!("{}\t{r}", r.id);
            }
        }
        RecipeCommand::Rename { id, title } => {
            recipe::rename(conn, id, &title)?;
        }
        RecipeCommand::Delete { id } => recipe::delete(conn, id)?,
        RecipeCommand::Attach {
            recipe_id,
            ingredient_id,
        } => {
            recipe::attach(conn, recipe_id, ingredient_id)?;
        }
        RecipeCommand::Detach {
            recipe_id,
            ingredient_id,
        } => {
            if !recipe::detach(conn, recipe_id, ingredient_id)? {
                println!("ingredient {ingredient_id} is not part of recipe {recipe_id}");
            }
        }
        RecipeCommand::Replace {
            recipe_id,
            old_ingredient_id,
            new_ingredient_id,
        } => {
            recipe::replace(conn, recipe_id, old_ingredient_id, new_ingredient_id)?;
        }
        RecipeCommand::Show { id, portions } => show_recipe(conn, id, portions)?,
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let data_path = config::data_path()?;
    let settings = Settings::load(&data_path.join(config::CONFIG_FILE_NAME))?;

    let database_path = match args.database {
        Some(database) => database,
        None => settings.database_path(&data_path)?,
    };
    let author = args.author.or_else(|| settings.author());
    log::debug!("using database {database_path:?}, author {author:?}");

    let mut conn = database::establish_connection(database_path)?;
    match args.commands {
        Commands::Unit(command) => run_unit(&mut conn, author, command),
        Commands::Ingredient(command) => run_ingredient(&mut conn, author, command),
        Commands::Recipe(command) => run_recipe(&mut conn, author, command),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()?;

    if let Err(error) = run(args) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
    Ok(())
}
