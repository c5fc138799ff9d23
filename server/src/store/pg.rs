use super::{
    CartRepo, IngredientRepo, LedgerRepo, MembershipRepo, RecipeRepo, RecipeSet, TagRepo,
    Transact,
};
use crate::models::{
    Ingredient, LedgerEntry, LedgerLine, NewRecipe, NewRecipeTag, RecipeChanges,
};
use crate::schema::{
    cart_entries, favorites, follows, ingredients, recipe_ingredients, recipe_tags, recipes, tags,
    users,
};
use diesel::prelude::*;
use uuid::Uuid;

/// Span counted per request by `telemetry::DbQueryCountingLayer`.
macro_rules! db_query {
    ($op:literal) => {
        tracing::info_span!("db.query", op = $op).entered()
    };
}

impl Transact for PgConnection {
    fn write_tx<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<diesel::result::Error>,
    {
        self.build_transaction().serializable().run(f)
    }

    fn read_snapshot<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<diesel::result::Error>,
    {
        self.build_transaction().repeatable_read().read_only().run(f)
    }
}

impl IngredientRepo for PgConnection {
    fn find_ingredients(&mut self, ids: &[Uuid]) -> QueryResult<Vec<Ingredient>> {
        let _span = db_query!("find_ingredients");
        ingredients::table
            .filter(ingredients::id.eq_any(ids))
            .select(Ingredient::as_select())
            .load(self)
    }
}

impl LedgerRepo for PgConnection {
    fn lock_recipe(&mut self, recipe_id: Uuid) -> QueryResult<bool> {
        let _span = db_query!("lock_recipe");
        recipes::table
            .find(recipe_id)
            .select(recipes::id)
            .for_update()
            .first::<Uuid>(self)
            .optional()
            .map(|found| found.is_some())
    }

    fn ledger_entries(&mut self, recipe_id: Uuid) -> QueryResult<Vec<LedgerEntry>> {
        let _span = db_query!("ledger_entries");
        recipe_ingredients::table
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select(LedgerEntry::as_select())
            .load(self)
    }

    fn ledger_lines(&mut self, recipe_ids: &[Uuid]) -> QueryResult<Vec<LedgerLine>> {
        let _span = db_query!("ledger_lines");
        recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq_any(recipe_ids))
            .select((
                recipe_ingredients::recipe_id,
                recipe_ingredients::ingredient_id,
                ingredients::name,
                ingredients::measurement_unit,
                recipe_ingredients::amount,
            ))
            .load(self)
    }

    fn delete_ledger(&mut self, recipe_id: Uuid) -> QueryResult<usize> {
        let _span = db_query!("delete_ledger");
        diesel::delete(
            recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)),
        )
        .execute(self)
    }

    fn insert_ledger(&mut self, entries: &[LedgerEntry]) -> QueryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let _span = db_query!("insert_ledger");
        diesel::insert_into(recipe_ingredients::table)
            .values(entries)
            .execute(self)
    }
}

impl RecipeRepo for PgConnection {
    fn insert_recipe(&mut self, recipe: &NewRecipe<'_>) -> QueryResult<Uuid> {
        let _span = db_query!("insert_recipe");
        diesel::insert_into(recipes::table)
            .values(recipe)
            .returning(recipes::id)
            .get_result(self)
    }

    fn recipe_author(&mut self, recipe_id: Uuid) -> QueryResult<Option<Uuid>> {
        let _span = db_query!("recipe_author");
        recipes::table
            .find(recipe_id)
            .select(recipes::author_id)
            .first(self)
            .optional()
    }

    fn lock_recipe_author(&mut self, recipe_id: Uuid) -> QueryResult<Option<Uuid>> {
        let _span = db_query!("lock_recipe_author");
        recipes::table
            .find(recipe_id)
            .select(recipes::author_id)
            .for_update()
            .first(self)
            .optional()
    }

    fn update_recipe_row(
        &mut self,
        recipe_id: Uuid,
        changes: &RecipeChanges<'_>,
    ) -> QueryResult<usize> {
        let _span = db_query!("update_recipe_row");
        diesel::update(recipes::table.find(recipe_id))
            .set(changes)
            .execute(self)
    }

    fn delete_recipe_row(&mut self, recipe_id: Uuid) -> QueryResult<usize> {
        let _span = db_query!("delete_recipe_row");
        diesel::delete(recipes::table.find(recipe_id)).execute(self)
    }
}

impl TagRepo for PgConnection {
    fn existing_tag_ids(&mut self, ids: &[Uuid]) -> QueryResult<Vec<Uuid>> {
        let _span = db_query!("existing_tag_ids");
        tags::table
            .filter(tags::id.eq_any(ids))
            .select(tags::id)
            .load(self)
    }

    fn set_recipe_tags(&mut self, recipe_id: Uuid, tag_ids: &[Uuid]) -> QueryResult<()> {
        let _span = db_query!("set_recipe_tags");
        diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
            .execute(self)?;

        let rows: Vec<NewRecipeTag> = tag_ids
            .iter()
            .map(|&tag_id| NewRecipeTag { recipe_id, tag_id })
            .collect();
        if !rows.is_empty() {
            diesel::insert_into(recipe_tags::table)
                .values(&rows)
                .execute(self)?;
        }
        Ok(())
    }
}

impl CartRepo for PgConnection {
    fn cart_recipe_ids(&mut self, user_id: Uuid) -> QueryResult<Vec<Uuid>> {
        let _span = db_query!("cart_recipe_ids");
        cart_entries::table
            .filter(cart_entries::user_id.eq(user_id))
            .select(cart_entries::recipe_id)
            .load(self)
    }
}

impl MembershipRepo for PgConnection {
    fn recipe_exists(&mut self, recipe_id: Uuid) -> QueryResult<bool> {
        let _span = db_query!("recipe_exists");
        diesel::select(diesel::dsl::exists(recipes::table.find(recipe_id))).get_result(self)
    }

    fn user_exists(&mut self, user_id: Uuid) -> QueryResult<bool> {
        let _span = db_query!("user_exists");
        diesel::select(diesel::dsl::exists(users::table.find(user_id))).get_result(self)
    }

    fn add_to_set(
        &mut self,
        set: RecipeSet,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> QueryResult<bool> {
        let _span = db_query!("add_to_set");
        // The primary key on (user_id, recipe_id) decides races between requests
        let inserted = match set {
            RecipeSet::Cart => diesel::insert_into(cart_entries::table)
                .values((
                    cart_entries::user_id.eq(user_id),
                    cart_entries::recipe_id.eq(recipe_id),
                ))
                .on_conflict_do_nothing()
                .execute(self)?,
            RecipeSet::Favorites => diesel::insert_into(favorites::table)
                .values((
                    favorites::user_id.eq(user_id),
                    favorites::recipe_id.eq(recipe_id),
                ))
                .on_conflict_do_nothing()
                .execute(self)?,
        };
        Ok(inserted == 1)
    }

    fn remove_from_set(
        &mut self,
        set: RecipeSet,
        user_id: Uuid,
        recipe_id: Uuid,
    ) -> QueryResult<bool> {
        let _span = db_query!("remove_from_set");
        let deleted = match set {
            RecipeSet::Cart => diesel::delete(
                cart_entries::table
                    .filter(cart_entries::user_id.eq(user_id))
                    .filter(cart_entries::recipe_id.eq(recipe_id)),
            )
            .execute(self)?,
            RecipeSet::Favorites => diesel::delete(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq(recipe_id)),
            )
            .execute(self)?,
        };
        Ok(deleted > 0)
    }

    fn add_follow(&mut self, follower_id: Uuid, author_id: Uuid) -> QueryResult<bool> {
        let _span = db_query!("add_follow");
        let inserted = diesel::insert_into(follows::table)
            .values((
                follows::follower_id.eq(follower_id),
                follows::author_id.eq(author_id),
            ))
            .on_conflict_do_nothing()
            .execute(self)?;
        Ok(inserted == 1)
    }

    fn remove_follow(&mut self, follower_id: Uuid, author_id: Uuid) -> QueryResult<bool> {
        let _span = db_query!("remove_follow");
        let deleted = diesel::delete(
            follows::table
                .filter(follows::follower_id.eq(follower_id))
                .filter(follows::author_id.eq(author_id)),
        )
        .execute(self)?;
        Ok(deleted > 0)
    }
}
