use std::str::FromStr;

use anyhow::Result;
use catalog::{
    basic_models::{format_price, CookingTime, IngredientFields, RecipeFields},
    forms::Choice,
};
use rusqlite::{params, types::Type, Connection};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::database::{Database, FromRow};

pub fn sqlite_current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn serialize_price<S: Serializer>(price: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_price(price))
}

#[derive(Debug, Serialize, Clone)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_staff: bool,
    pub created_on: String,
}

impl FromRow for User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get("user_id")?,
            username: row.get("username")?,
            password_hash: row.get("password_hash")?,
            is_staff: row.get("is_staff")?,
            created_on: row.get("created_on")?,
        })
    }
}

impl User {
    pub fn get_by_id(db: &Database, user_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows("SELECT * FROM User WHERE user_id = ?", params![user_id])?
            .pop())
    }

    pub fn get_by_username(db: &Database, username: &str) -> Result<Option<Self>> {
        Ok(db
            .collect_rows("SELECT * FROM User WHERE username = ?", params![username])?
            .pop())
    }

    pub fn list_all(db: &Database) -> Result<Vec<Self>> {
        db.collect_rows("SELECT * FROM User ORDER BY username", [])
    }

    /// Add a user. The password must already be hashed.
    pub fn push(db: &Database, username: &str, password_hash: &str, is_staff: bool) -> Result<i64> {
        let conn = db.pool.get()?;
        conn.execute(
            "INSERT INTO User (username, password_hash, is_staff, created_on) VALUES (?, ?, ?, ?)",
            params![username, password_hash, is_staff, sqlite_current_timestamp()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_password_hash(db: &Database, user_id: i64, password_hash: &str) -> Result<()> {
        let conn = db.pool.get()?;
        conn.execute(
            "UPDATE User SET password_hash = ? WHERE user_id = ?",
            params![password_hash, user_id],
        )?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Ingredient {
    pub ingredient_id: i64,
    pub name: String,
    pub weight: u32,
    pub weight_ready: u32,
    #[serde(serialize_with = "serialize_price")]
    pub price: Decimal,
}

impl FromRow for Ingredient {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let price: String = row.get("price")?;
        let price = Decimal::from_str(&price).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
        })?;
        Ok(Self {
            ingredient_id: row.get("ingredient_id")?,
            name: row.get("name")?,
            weight: row.get("weight")?,
            weight_ready: row.get("weight_ready")?,
            price,
        })
    }
}

impl Ingredient {
    /// All ingredients, oldest first.
    pub fn list_all(db: &Database) -> Result<Vec<Self>> {
        db.collect_rows("SELECT * FROM Ingredient ORDER BY ingredient_id", [])
    }

    pub fn get_by_id(db: &Database, ingredient_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows(
                "SELECT * FROM Ingredient WHERE ingredient_id = ?",
                params![ingredient_id],
            )?
            .pop())
    }

    pub fn count(db: &Database) -> Result<usize> {
        db.count("SELECT COUNT(*) FROM Ingredient", [])
    }

    /// Options for the ingredient selects, along with the ids they allow.
    pub fn choices(db: &Database) -> Result<(Vec<i64>, Vec<Choice>)> {
        Ok(Self::list_all(db)?
            .into_iter()
            .map(|i| (i.ingredient_id, Choice::new(i.ingredient_id, i.name)))
            .unzip())
    }

    pub fn push(db: &Database, fields: &IngredientFields) -> Result<i64> {
        let conn = db.pool.get()?;
        conn.execute(
            "INSERT INTO Ingredient (name, weight, weight_ready, price) VALUES (?, ?, ?, ?)",
            params![
                fields.name,
                fields.weight,
                fields.weight_ready,
                format_price(&fields.price)
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(db: &Database, ingredient_id: i64, fields: &IngredientFields) -> Result<bool> {
        let conn = db.pool.get()?;
        let changed = conn.execute(
            "UPDATE Ingredient SET name = ?, weight = ?, weight_ready = ?, price = ?
            WHERE ingredient_id = ?",
            params![
                fields.name,
                fields.weight,
                fields.weight_ready,
                format_price(&fields.price),
                ingredient_id
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete an ingredient. Its links to recipes go with it.
    pub fn delete(db: &Database, ingredient_id: i64) -> Result<bool> {
        let conn = db.pool.get()?;
        let changed = conn.execute(
            "DELETE FROM Ingredient WHERE ingredient_id = ?",
            params![ingredient_id],
        )?;
        Ok(changed > 0)
    }

    pub fn fields(&self) -> IngredientFields {
        IngredientFields {
            name: self.name.clone(),
            weight: self.weight,
            weight_ready: self.weight_ready,
            price: self.price,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Recipe {
    pub recipe_id: i64,
    pub title: String,
    pub description: String,
    pub created_on: String,
    pub image: Option<String>,
    pub cooking_time: CookingTime,
    pub author_id: Option<i64>,
}

impl FromRow for Recipe {
    /// Create a new recipe from an sql row, provided by rusqlite, using named columns.
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            recipe_id: row.get("recipe_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            created_on: row.get("created_on")?,
            image: row.get("image")?,
            cooking_time: CookingTime::from_seconds(row.get("cooking_time")?),
            author_id: row.get("author_id")?,
        })
    }
}

impl Recipe {
    pub fn count(db: &Database) -> Result<usize> {
        db.count("SELECT COUNT(*) FROM Recipe", [])
    }

    /// One page of recipes in title order.
    pub fn list_page(db: &Database, offset: usize, limit: usize) -> Result<Vec<Self>> {
        db.collect_rows(
            "SELECT * FROM Recipe ORDER BY title, recipe_id LIMIT ? OFFSET ?",
            params![limit as i64, offset as i64],
        )
    }

    pub fn list_all(db: &Database) -> Result<Vec<Self>> {
        db.collect_rows("SELECT * FROM Recipe ORDER BY title, recipe_id", [])
    }

    /// Get a recipe by ID
    pub fn get_by_id(db: &Database, recipe_id: i64) -> Result<Option<Self>> {
        Ok(db
            .collect_rows(
                "SELECT * FROM Recipe WHERE recipe_id = ?",
                params![recipe_id],
            )?
            .pop())
    }

    /// The recipe's ingredients, alphabetically.
    pub fn get_ingredients(&self, db: &Database) -> Result<Vec<Ingredient>> {
        db.collect_rows(
            "SELECT Ingredient.*
            FROM RecipeIngredient
            JOIN Ingredient ON Ingredient.ingredient_id = RecipeIngredient.ingredient_id
            WHERE RecipeIngredient.recipe_id = ?
            ORDER BY Ingredient.name, Ingredient.ingredient_id",
            params![self.recipe_id],
        )
    }

    pub fn is_authored_by(&self, user: &User) -> bool {
        self.author_id == Some(user.user_id)
    }

    /// The editable columns, as the recipe form expects them.
    pub fn fields(&self, db: &Database) -> Result<RecipeFields> {
        Ok(RecipeFields {
            title: self.title.clone(),
            description: self.description.clone(),
            cooking_time: self.cooking_time,
            ingredient_ids: RecipeIngredient::list_for_recipe(db, self.recipe_id)?
                .into_iter()
                .map(|link| link.ingredient_id)
                .collect(),
        })
    }

    /// Add a new recipe and link its ingredients, all or nothing.
    pub fn push(
        db: &Database,
        fields: &RecipeFields,
        image: Option<&str>,
        author_id: Option<i64>,
    ) -> Result<i64> {
        let mut conn = db.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO Recipe (title, description, created_on, image, cooking_time, author_id)
            VALUES (?, ?, ?, ?, ?, ?)",
            params![
                fields.title,
                fields.description,
                sqlite_current_timestamp(),
                image,
                fields.cooking_time.as_seconds(),
                author_id
            ],
        )?;
        let recipe_id = tx.last_insert_rowid();
        for ingredient_id in &fields.ingredient_ids {
            RecipeIngredient::link(&tx, recipe_id, *ingredient_id)?;
        }
        tx.commit()?;
        Ok(recipe_id)
    }

    /// Overwrite the editable columns and make the ingredient links match `fields`.
    ///
    /// The stored image is only replaced when `image` is given.
    pub fn update(
        db: &Database,
        recipe_id: i64,
        fields: &RecipeFields,
        image: Option<&str>,
    ) -> Result<()> {
        let mut conn = db.pool.get()?;
        let tx = conn.transaction()?;
        Self::write_fields(&tx, recipe_id, fields, image)?;
        tx.commit()?;
        Ok(())
    }

    /// Like [`Recipe::update`], also reassigning the author in the same transaction.
    pub fn update_with_author(
        db: &Database,
        recipe_id: i64,
        fields: &RecipeFields,
        author_id: Option<i64>,
    ) -> Result<()> {
        let mut conn = db.pool.get()?;
        let tx = conn.transaction()?;
        Self::write_fields(&tx, recipe_id, fields, None)?;
        tx.execute(
            "UPDATE Recipe SET author_id = ? WHERE recipe_id = ?",
            params![author_id, recipe_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn write_fields(
        conn: &Connection,
        recipe_id: i64,
        fields: &RecipeFields,
        image: Option<&str>,
    ) -> Result<()> {
        conn.execute(
            "UPDATE Recipe SET title = ?, description = ?, cooking_time = ?, image = COALESCE(?, image)
            WHERE recipe_id = ?",
            params![
                fields.title,
                fields.description,
                fields.cooking_time.as_seconds(),
                image,
                recipe_id
            ],
        )?;
        RecipeIngredient::set_for_recipe(conn, recipe_id, &fields.ingredient_ids)
    }

    /// Delete a recipe. Its ingredient links go with it; the image file stays.
    pub fn delete(db: &Database, recipe_id: i64) -> Result<bool> {
        let conn = db.pool.get()?;
        let changed = conn.execute("DELETE FROM Recipe WHERE recipe_id = ?", params![recipe_id])?;
        Ok(changed > 0)
    }
}

/// Raised when a recipe is linked to the same ingredient twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Recipe ingredient with this Recipe and Ingredient already exists.")]
pub struct DuplicateLink {
    pub recipe_id: i64,
    pub ingredient_id: i64,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub recipe_ingredient_id: i64,
    pub recipe_id: i64,
    pub ingredient_id: i64,
}

impl FromRow for RecipeIngredient {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            recipe_ingredient_id: row.get("recipe_ingredient_id")?,
            recipe_id: row.get("recipe_id")?,
            ingredient_id: row.get("ingredient_id")?,
        })
    }
}

impl RecipeIngredient {
    /// Link a recipe to an ingredient. Fails with [`DuplicateLink`] if they are already linked.
    pub fn push(db: &Database, recipe_id: i64, ingredient_id: i64) -> Result<i64> {
        let conn = db.pool.get()?;
        Self::link(&conn, recipe_id, ingredient_id)
    }

    pub fn list_for_recipe(db: &Database, recipe_id: i64) -> Result<Vec<Self>> {
        db.collect_rows(
            "SELECT * FROM RecipeIngredient WHERE recipe_id = ? ORDER BY recipe_ingredient_id",
            params![recipe_id],
        )
    }

    pub fn count(db: &Database) -> Result<usize> {
        db.count("SELECT COUNT(*) FROM RecipeIngredient", [])
    }

    fn link(conn: &Connection, recipe_id: i64, ingredient_id: i64) -> Result<i64> {
        match conn.execute(
            "INSERT INTO RecipeIngredient (recipe_id, ingredient_id) VALUES (?, ?)",
            params![recipe_id, ingredient_id],
        ) {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(DuplicateLink {
                    recipe_id,
                    ingredient_id,
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drop links not in `ingredient_ids` and add the missing ones.
    fn set_for_recipe(conn: &Connection, recipe_id: i64, ingredient_ids: &[i64]) -> Result<()> {
        let existing = {
            let mut stmt =
                conn.prepare("SELECT ingredient_id FROM RecipeIngredient WHERE recipe_id = ?")?;
            let ids = stmt
                .query_map(params![recipe_id], |row| row.get::<_, i64>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        for stale in existing.iter().filter(|id| !ingredient_ids.contains(id)) {
            conn.execute(
                "DELETE FROM RecipeIngredient WHERE recipe_id = ? AND ingredient_id = ?",
                params![recipe_id, stale],
            )?;
        }
        for new in ingredient_ids.iter().filter(|id| !existing.contains(id)) {
            Self::link(conn, recipe_id, *new)?;
        }
        Ok(())
    }
}
