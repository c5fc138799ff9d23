//! In-memory store used by the domain tests.
//!
//! Transactions snapshot the whole store and restore it when the closure
//! fails, which matches the rollback behavior of the PostgreSQL scopes.

use super::{
    CartRepo, IngredientRepo, LedgerRepo, MembershipRepo, RecipeRepo, RecipeSet, TagRepo,
    Transact,
};
use crate::models::{Ingredient, LedgerEntry, LedgerLine, NewRecipe, RecipeChanges};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::QueryResult;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRecipe {
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub users: BTreeSet<Uuid>,
    pub recipes: BTreeMap<Uuid, MemoryRecipe>,
    pub tags: BTreeSet<Uuid>,
    /// (recipe, tag) pairs
    pub recipe_tags: BTreeSet<(Uuid, Uuid)>,
    pub ingredients: BTreeMap<Uuid, Ingredient>,
    pub ledger: Vec<LedgerEntry>,
    pub cart: BTreeSet<(Uuid, Uuid)>,
    pub favorites: BTreeSet<(Uuid, Uuid)>,
    pub follows: BTreeSet<(Uuid, Uuid)>,
    /// Makes the next `insert_ledger` fail after the delete already ran.
    pub fail_next_ledger_insert: bool,
}

fn unique_violation(detail: &str) -> DieselError {
    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, Box::new(detail.to_string()))
}

fn foreign_key_violation(detail: &str) -> DieselError {
    DieselError::DatabaseError(
        DatabaseErrorKind::ForeignKeyViolation,
        Box::new(detail.to_string()),
    )
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.users.insert(id);
        id
    }

    /// Adds a recipe owned by a fresh author.
    pub fn add_recipe(&mut self) -> Uuid {
        let author_id = self.add_user();
        self.add_recipe_by(author_id)
    }

    pub fn add_recipe_by(&mut self, author_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.recipes.insert(
            id,
            MemoryRecipe {
                author_id,
                name: "Recipe".to_string(),
                text: "Cook it".to_string(),
                cooking_time: 10,
                image: None,
            },
        );
        id
    }

    pub fn add_tag(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.tags.insert(id);
        id
    }

    pub fn tags_of(&self, recipe_id: Uuid) -> BTreeSet<Uuid> {
        self.recipe_tags
            .iter()
            .filter(|(recipe, _)| *recipe == recipe_id)
            .map(|(_, tag)| *tag)
            .collect()
    }

    pub fn add_ingredient(&mut self, name: &str, measurement_unit: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.ingredients.insert(
            id,
            Ingredient {
                id,
                name: name.to_string(),
                measurement_unit: measurement_unit.to_string(),
            },
        );
        id
    }

    /// Writes ledger rows directly, bypassing validation.
    pub fn seed_ledger(&mut self, recipe_id: Uuid, rows: &[(Uuid, i32)]) {
        for &(ingredient_id, amount) in rows {
            self.ledger.push(LedgerEntry {
                recipe_id,
                ingredient_id,
                amount,
            });
        }
    }

    fn set_mut(&mut self, set: RecipeSet) -> &mut BTreeSet<(Uuid, Uuid)> {
        match set {
            RecipeSet::Cart => &mut self.cart,
            RecipeSet::Favorites => &mut self.favorites,
        }
    }

    fn scoped<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }
}

impl Transact for MemoryStore {
    fn write_tx<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DieselError>,
    {
        self.scoped(f)
    }

    fn read_snapshot<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<DieselError>,
    {
        self.scoped(f)
    }
}

impl IngredientRepo for MemoryStore {
    fn find_ingredients(&mut self, ids: &[Uuid]) -> QueryResult<Vec<Ingredient>> {
        Ok(ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| self.ingredients.get(id).cloned())
            .collect())
    }
}

impl LedgerRepo for MemoryStore {
    fn lock_recipe(&mut self, recipe_id: Uuid) -> QueryResult<bool> {
        Ok(self.recipes.contains_key(&recipe_id))
    }

    fn ledger_entries(&mut self, recipe_id: Uuid) -> QueryResult<Vec<LedgerEntry>> {
        Ok(self
            .ledger
            .iter()
            .filter(|entry| entry.recipe_id == recipe_id)
            .copied()
            .collect())
    }

    fn ledger_lines(&mut self, recipe_ids: &[Uuid]) -> QueryResult<Vec<LedgerLine>> {
        Ok(self
            .ledger
            .iter()
            .filter(|entry| recipe_ids.contains(&entry.recipe_id))
            .filter_map(|entry| {
                self.ingredients
                    .get(&entry.ingredient_id)
                    .map(|ingredient| LedgerLine {
                        recipe_id: entry.recipe_id,
                        ingredient_id: entry.ingredient_id,
                        name: ingredient.name.clone(),
                        measurement_unit: ingredient.measurement_unit.clone(),
                        amount: entry.amount,
                    })
            })
            .collect())
    }

    fn delete_ledger(&mut self, recipe_id: Uuid) -> QueryResult<usize> {
        let before = self.ledger.len();
        self.ledger.retain(|entry| entry.recipe_id != recipe_id);
        Ok(before - self.ledger.len())
    }

    fn insert_ledger(&mut self, entries: &[LedgerEntry]) -> QueryResult<usize> {
        if std::mem::take(&mut self.fail_next_ledger_insert) {
            return Err(DieselError::BrokenTransactionManager);
        }
        for entry in entries {
            let duplicate = self.ledger.iter().any(|existing| {
                existing.recipe_id == entry.recipe_id
                    && existing.ingredient_id == entry.ingredient_id
            });
            if duplicate {
                return Err(unique_violation("recipe_ingredients_pkey"));
            }
            self.ledger.push(*entry);
        }
        Ok(entries.len())
    }
}

impl RecipeRepo for MemoryStore {
    fn insert_recipe(&mut self, recipe: &NewRecipe<'_>) -> QueryResult<Uuid> {
        if !self.users.contains(&recipe.author_id) {
            return Err(foreign_key_violation("recipes_author_id_fkey"));
        }
        let id = Uuid::new_v4();
        self.recipes.insert(
            id,
            MemoryRecipe {
                author_id: recipe.author_id,
                name: recipe.name.to_string(),
                text: recipe.text.to_string(),
                cooking_time: recipe.cooking_time,
                image: recipe.image.map(str::to_string),
            },
        );
        Ok(id)
    }

    fn recipe_author(&mut self, recipe_id: Uuid) -> QueryResult<Option<Uuid>> {
        Ok(self.recipes.get(&recipe_id).map(|recipe| recipe.author_id))
    }

    fn lock_recipe_author(&mut self, recipe_id: Uuid) -> QueryResult<Option<Uuid>> {
        self.recipe_author(recipe_id)
    }

    fn update_recipe_row(
        &mut self,
        recipe_id: Uuid,
        changes: &RecipeChanges<'_>,
    ) -> QueryResult<usize> {
        let Some(recipe) = self.recipes.get_mut(&recipe_id) else {
            return Ok(0);
        };
        if let Some(name) = changes.name {
            recipe.name = name.to_string();
        }
        if let Some(text) = changes.text {
            recipe.text = text.to_string();
        }
        if let Some(cooking_time) = changes.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        if let Some(image) = changes.image {
            recipe.image = image.map(str::to_string);
        }
        Ok(1)
    }

    fn delete_recipe_row(&mut self, recipe_id: Uuid) -> QueryResult<usize> {
        if self.recipes.remove(&recipe_id).is_none() {
            return Ok(0);
        }
        // ON DELETE CASCADE
        self.ledger.retain(|entry| entry.recipe_id != recipe_id);
        self.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
        self.cart.retain(|(_, recipe)| *recipe != recipe_id);
        self.favorites.retain(|(_, recipe)| *recipe != recipe_id);
        Ok(1)
    }
}

impl TagRepo for MemoryStore {
    fn existing_tag_ids(&mut self, ids: &[Uuid]) -> QueryResult<Vec<Uuid>> {
        Ok(ids
            .iter()
            .filter(|id| self.tags.contains(id))
            .copied()
            .collect())
    }

    fn set_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[Uuid]) -> QueryResult<()> {
        self.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
        for &tag_id in tag_ids {
            if !self.recipe_tags.insert((recipe_id, tag_id)) {
                return Err(unique_violation("recipe_tags_pkey"));
            }
        }
        Ok(())
    }
}

impl CartRepo for MemoryStore {
    fn cart_recipe_ids(&mut self, user_id: Uuid) -> QueryResult<Vec<Uuid>> {
        Ok(self
            .cart
            .iter()
            .filter(|(user, _)| *user == user_id)
            .map(|(_, recipe)| *recipe)
            .collect())
    }
}

impl MembershipRepo for MemoryStore {
    fn recipe_exists(&mut self, recipe_id: Uuid) -> QueryResult<bool> {
        Ok(self.recipes.contains_key(&recipe_id))
    }

    fn user_exists(&mut self, user_id: Uuid) -> QueryResult<bool> {
        Ok(self.users.contains(&user_id))
    }

    fn add_to_set(
        &mut self,
        set: RecipeSet,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> QueryResult<bool> {
        if !self.users.contains(&user_id) || !self.recipes.contains_key(&recipe_id) {
            return Err(foreign_key_violation("membership references a missing row"));
        }
        Ok(self.set_mut(set).insert((user_id, recipe_id)))
    }

    fn remove_from_set(
        &mut self,
        set: RecipeSet,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> QueryResult<bool> {
        Ok(self.set_mut(set).remove(&(user_id, recipe_id)))
    }

    fn add_follow(&mut self, follower_id: Uuid, author_id: Uuid) -> QueryResult<bool> {
        if !self.users.contains(&follower_id) || !self.users.contains(&author_id) {
            return Err(foreign_key_violation("follows references a missing user"));
        }
        Ok(self.follows.insert((follower_id, author_id)))
    }

    fn remove_follow(&mut self, follower_id: Uuid, author_id: Uuid) -> QueryResult<bool> {
        Ok(self.follows.remove(&(follower_id, author_id)))
    }
}
