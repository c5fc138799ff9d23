//! Repository traits the domain operations are written against.
//!
//! Every trait is implemented on the connection handle itself, so callers pass
//! the handle (and with it the current transaction) explicitly. `pg` holds the
//! PostgreSQL implementation; tests use the in-memory store in `memory`.

#[cfg(test)]
pub mod memory;
mod pg;

use crate::models::{Ingredient, LedgerEntry, LedgerLine, NewRecipe, RecipeChanges};
use diesel::QueryResult;
use uuid::Uuid;

/// Transaction scopes.
pub trait Transact: Sized {
    /// Serializable read-write transaction, rolled back when `f` fails.
    fn write_tx<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<diesel::result::Error>;

    /// Read-only transaction observing a single snapshot.
    fn read_snapshot<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<diesel::result::Error>;
}

pub trait IngredientRepo {
    /// Returns the catalog entries among `ids` that exist, in no particular order.
    fn find_ingredients(&mut self, ids: &[Uuid]) -> QueryResult<Vec<Ingredient>>;
}

pub trait LedgerRepo {
    /// Locks the recipe row for the rest of the transaction.
    /// Returns false when the recipe does not exist.
    fn lock_recipe(&mut self, recipe_id: Uuid) -> QueryResult<bool>;

    fn ledger_entries(&mut self, recipe_id: Uuid) -> QueryResult<Vec<LedgerEntry>>;

    /// Ledger rows of all given recipes joined with their catalog entries.
    fn ledger_lines(&mut self, recipe_ids: &[Uuid]) -> QueryResult<Vec<LedgerLine>>;

    fn delete_ledger(&mut self, recipe_id: Uuid) -> QueryResult<usize>;

    fn insert_ledger(&mut self, entries: &[LedgerEntry]) -> QueryResult<usize>;
}

/// The recipe row itself. Tags and ledger live in their own repos.
pub trait RecipeRepo {
    fn insert_recipe(&mut self, recipe: &NewRecipe<'_>) -> QueryResult<Uuid>;

    /// Author of the recipe, or `None` when it does not exist.
    fn recipe_author(&mut self, recipe_id: Uuid) -> QueryResult<Option<Uuid>>;

    /// Like `recipe_author`, but also locks the row for the rest of the transaction.
    fn lock_recipe_author(&mut self, recipe_id: Uuid) -> QueryResult<Option<Uuid>>;

    fn update_recipe_row(&mut self, recipe_id: Uuid, changes: &RecipeChanges<'_>)
        -> QueryResult<usize>;

    /// Deletes the recipe; its ledger, tags, cart and favorite rows go with it.
    fn delete_recipe_row(&mut self, recipe_id: Uuid) -> QueryResult<usize>;
}

pub trait TagRepo {
    /// Returns the ids among `ids` that name an existing tag.
    fn existing_tag_ids(&mut self, ids: &[Uuid]) -> QueryResult<Vec<Uuid>>;

    /// Replaces the recipe's tag set with `tag_ids`.
    fn set_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[Uuid]) -> QueryResult<()>;
}

pub trait CartRepo {
    fn cart_recipe_ids(&mut self, user_id: Uuid) -> QueryResult<Vec<Uuid>>;
}

/// Per-user recipe sets sharing the same membership semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeSet {
    Cart,
    Favorites,
}

impl RecipeSet {
    pub fn label(self) -> &'static str {
        match self {
            RecipeSet::Cart => "shopping cart",
            RecipeSet::Favorites => "favorites",
        }
    }
}

pub trait MembershipRepo {
    fn recipe_exists(&mut self, recipe_id: Uuid) -> QueryResult<bool>;

    fn user_exists(&mut self, user_id: Uuid) -> QueryResult<bool>;

    /// Inserts the pair unless present. Returns false when it already existed.
    /// A missing user or recipe fails with a foreign key violation.
    fn add_to_set(&mut self, set: RecipeSet, user_id: Uuid, recipe_id: Uuid)
        -> QueryResult<bool>;

    /// Returns false when the pair was absent.
    fn remove_from_set(
        &mut self,
        set: RecipeSet,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> QueryResult<bool>;

    fn add_follow(&mut self, follower_id: Uuid, author_id: Uuid) -> QueryResult<bool>;

    fn remove_follow(&mut self, follower_id: Uuid, author_id: Uuid) -> QueryResult<bool>;
}
