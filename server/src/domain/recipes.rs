//! Recipe writes: the recipe row, its tag set and its ledger commit together.

use super::ledger::{replace_ingredients, replace_within, validate_entries, IngredientAmount};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{LedgerEntry, NewRecipe, RecipeChanges};
use crate::store::{IngredientRepo, LedgerRepo, RecipeRepo, TagRepo, Transact};
use chrono::Utc;
use std::collections::HashSet;
use uuid::Uuid;

pub const MAX_NAME_LENGTH: usize = 200;
/// Width of the `recipes.image` column.
pub const MAX_IMAGE_LENGTH: usize = 500;

#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: Option<String>,
    pub tag_ids: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub tag_ids: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

pub fn validate_name(name: &str) -> ServiceResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ServiceError::validation(format!(
            "Name cannot be longer than {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

pub fn validate_text(text: &str) -> ServiceResult<&str> {
    if text.trim().is_empty() {
        return Err(ServiceError::validation("Text cannot be empty"));
    }
    Ok(text)
}

pub fn validate_cooking_time(minutes: i64) -> ServiceResult<i32> {
    if minutes < 1 {
        return Err(ServiceError::validation(
            "Cooking time must be at least 1 minute",
        ));
    }
    i32::try_from(minutes).map_err(|_| ServiceError::validation("Cooking time is too large"))
}

pub fn validate_image(image: &str) -> ServiceResult<&str> {
    if image.chars().count() > MAX_IMAGE_LENGTH {
        return Err(ServiceError::validation(format!(
            "Image reference cannot be longer than {MAX_IMAGE_LENGTH} characters"
        )));
    }
    Ok(image)
}

/// A recipe needs at least one ingredient on top of the ledger rules.
pub fn validate_ingredient_list(entries: &[IngredientAmount]) -> ServiceResult<()> {
    if entries.is_empty() {
        return Err(ServiceError::validation(
            "At least one ingredient is required",
        ));
    }
    validate_entries(entries)
}

fn assign_tags<C: TagRepo>(conn: &mut C, recipe_id: Uuid, tag_ids: &[Uuid]) -> ServiceResult<()> {
    let mut seen = HashSet::new();
    let unique: Vec<Uuid> = tag_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    let existing: HashSet<Uuid> = conn.existing_tag_ids(&unique)?.into_iter().collect();
    if let Some(missing) = unique.iter().find(|id| !existing.contains(id)) {
        return Err(ServiceError::not_found("Tag", *missing));
    }

    conn.set_recipe_tags(recipe_id, &unique)?;
    Ok(())
}

fn ensure_author(author_id: Option<Uuid>, user_id: Uuid, recipe_id: Uuid) -> ServiceResult<()> {
    match author_id {
        None => Err(ServiceError::not_found("Recipe", recipe_id)),
        Some(author_id) if author_id != user_id => Err(ServiceError::Forbidden(
            "Only the author can modify this recipe".to_string(),
        )),
        Some(_) => Ok(()),
    }
}

/// Inserts the recipe, its tags and its ledger in one transaction.
pub fn create_recipe<C>(conn: &mut C, author_id: Uuid, draft: &RecipeDraft) -> ServiceResult<Uuid>
where
    C: RecipeRepo + TagRepo + LedgerRepo + IngredientRepo + Transact,
{
    let name = validate_name(&draft.name)?;
    let text = validate_text(&draft.text)?;
    let cooking_time = validate_cooking_time(draft.cooking_time)?;
    let image = draft.image.as_deref().map(validate_image).transpose()?;
    validate_ingredient_list(&draft.ingredients)?;

    let recipe_id = conn.write_tx(|conn| {
        let recipe_id = conn.insert_recipe(&NewRecipe {
            author_id,
            name,
            text,
            cooking_time,
            image,
        })?;

        assign_tags(conn, recipe_id, &draft.tag_ids)?;
        replace_within(conn, recipe_id, &draft.ingredients)?;

        Ok::<_, ServiceError>(recipe_id)
    })?;

    tracing::info!(recipe_id = %recipe_id, author_id = %author_id, "recipe created");
    Ok(recipe_id)
}

pub fn update_recipe<C>(
    conn: &mut C,
    user_id: Uuid,
    recipe_id: Uuid,
    patch: &RecipePatch,
) -> ServiceResult<()>
where
    C: RecipeRepo + TagRepo + LedgerRepo + IngredientRepo + Transact,
{
    let name = patch.name.as_deref().map(validate_name).transpose()?;
    let text = patch.text.as_deref().map(validate_text).transpose()?;
    let cooking_time = patch
        .cooking_time
        .map(validate_cooking_time)
        .transpose()?;
    let image = patch.image.as_deref().map(validate_image).transpose()?;
    if let Some(ref ingredients) = patch.ingredients {
        validate_ingredient_list(ingredients)?;
    }

    conn.write_tx(|conn| {
        let author_id = conn.lock_recipe_author(recipe_id)?;
        ensure_author(author_id, user_id, recipe_id)?;

        let changes = RecipeChanges {
            name,
            text,
            cooking_time,
            image: image.map(Some),
            updated_at: Some(Utc::now()),
        };
        conn.update_recipe_row(recipe_id, &changes)?;

        if let Some(ref tag_ids) = patch.tag_ids {
            assign_tags(conn, recipe_id, tag_ids)?;
        }
        if let Some(ref ingredients) = patch.ingredients {
            replace_within(conn, recipe_id, ingredients)?;
        }

        Ok::<_, ServiceError>(())
    })?;

    tracing::info!(recipe_id = %recipe_id, "recipe updated");
    Ok(())
}

/// Replaces only the ingredient list. The author never changes, so the
/// ownership check can run before the replacer's own transaction.
pub fn replace_recipe_ingredients<C>(
    conn: &mut C,
    user_id: Uuid,
    recipe_id: Uuid,
    entries: &[IngredientAmount],
) -> ServiceResult<Vec<LedgerEntry>>
where
    C: RecipeRepo + LedgerRepo + IngredientRepo + Transact,
{
    validate_ingredient_list(entries)?;

    let author_id = conn.recipe_author(recipe_id)?;
    ensure_author(author_id, user_id, recipe_id)?;

    let committed = replace_ingredients(conn, recipe_id, entries)?;
    tracing::info!(recipe_id = %recipe_id, count = committed.len(), "recipe ingredients replaced");
    Ok(committed)
}

pub fn delete_recipe<C>(conn: &mut C, user_id: Uuid, recipe_id: Uuid) -> ServiceResult<()>
where
    C: RecipeRepo + Transact,
{
    conn.write_tx(|conn| {
        let author_id = conn.lock_recipe_author(recipe_id)?;
        ensure_author(author_id, user_id, recipe_id)?;
        // Ledger, tags, cart and favorite rows cascade
        conn.delete_recipe_row(recipe_id)?;
        Ok::<_, ServiceError>(())
    })?;

    tracing::info!(recipe_id = %recipe_id, "recipe deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn amount(amount: i64) -> IngredientAmount {
        IngredientAmount {
            ingredient_id: Uuid::new_v4(),
            amount,
        }
    }

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(validate_name("  Borscht ").unwrap(), "Borscht");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(validate_name("   ").unwrap_err().kind(), "validation");
    }

    #[test]
    fn test_long_name_rejected() {
        let name = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_name(&name).is_err());
        assert!(validate_name(&name[..MAX_NAME_LENGTH]).is_ok());
    }

    #[test]
    fn test_empty_text_rejected() {
        assert!(validate_text("\n\t").is_err());
        assert_eq!(validate_text("Mix well").unwrap(), "Mix well");
    }

    #[test]
    fn test_cooking_time_bounds() {
        assert!(validate_cooking_time(0).is_err());
        assert!(validate_cooking_time(-3).is_err());
        assert_eq!(validate_cooking_time(1).unwrap(), 1);
        assert!(validate_cooking_time(i64::from(i32::MAX) + 1).is_err());
    }

    #[test]
    fn test_ingredient_list_required() {
        assert_eq!(
            validate_ingredient_list(&[]).unwrap_err().to_string(),
            "At least one ingredient is required"
        );
        assert!(validate_ingredient_list(&[amount(3)]).is_ok());
        assert!(validate_ingredient_list(&[amount(0)]).is_err());
    }

    #[test]
    fn test_image_length_bounds() {
        assert!(validate_image(&"a".repeat(MAX_IMAGE_LENGTH)).is_ok());
        assert_eq!(
            validate_image(&"a".repeat(MAX_IMAGE_LENGTH + 1))
                .unwrap_err()
                .kind(),
            "validation"
        );
    }

    struct Fixture {
        store: MemoryStore,
        author: Uuid,
        flour: Uuid,
        egg: Uuid,
        breakfast: Uuid,
    }

    fn fixture() -> Fixture {
        let mut store = MemoryStore::new();
        let author = store.add_user();
        let flour = store.add_ingredient("Flour", "g");
        let egg = store.add_ingredient("Egg", "pcs");
        let breakfast = store.add_tag();
        Fixture {
            store,
            author,
            flour,
            egg,
            breakfast,
        }
    }

    fn entry(ingredient_id: Uuid, amount: i64) -> IngredientAmount {
        IngredientAmount {
            ingredient_id,
            amount,
        }
    }

    fn draft(f: &Fixture) -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_string(),
            text: "Whisk and fry".to_string(),
            cooking_time: 20,
            image: Some("recipes/pancakes.png".to_string()),
            tag_ids: vec![f.breakfast],
            ingredients: vec![entry(f.flour, 200), entry(f.egg, 2)],
        }
    }

    fn ledger_of(store: &MemoryStore, recipe_id: Uuid) -> Vec<(Uuid, i32)> {
        let mut rows: Vec<(Uuid, i32)> = store
            .ledger
            .iter()
            .filter(|row| row.recipe_id == recipe_id)
            .map(|row| (row.ingredient_id, row.amount))
            .collect();
        rows.sort();
        rows
    }

    #[test]
    fn test_create_commits_row_tags_and_ledger() {
        let mut f = fixture();
        let d = draft(&f);

        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();

        let stored = &f.store.recipes[&recipe_id];
        assert_eq!(stored.author_id, f.author);
        assert_eq!(stored.name, "Pancakes");
        assert_eq!(stored.image.as_deref(), Some("recipes/pancakes.png"));
        assert_eq!(f.store.tags_of(recipe_id), [f.breakfast].into_iter().collect());

        let mut expected = vec![(f.flour, 200), (f.egg, 2)];
        expected.sort();
        assert_eq!(ledger_of(&f.store, recipe_id), expected);
    }

    #[test]
    fn test_create_with_unknown_ingredient_leaves_nothing() {
        let mut f = fixture();
        let mut d = draft(&f);
        let ghost = Uuid::new_v4();
        d.ingredients.push(entry(ghost, 1));

        let err = create_recipe(&mut f.store, f.author, &d).unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert!(err.to_string().contains(&ghost.to_string()));
        assert!(f.store.recipes.is_empty());
        assert!(f.store.recipe_tags.is_empty());
        assert!(f.store.ledger.is_empty());
    }

    #[test]
    fn test_create_with_unknown_tag_leaves_nothing() {
        let mut f = fixture();
        let mut d = draft(&f);
        d.tag_ids.push(Uuid::new_v4());

        let err = create_recipe(&mut f.store, f.author, &d).unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert!(f.store.recipes.is_empty());
        assert!(f.store.recipe_tags.is_empty());
    }

    #[test]
    fn test_create_rolls_back_when_ledger_insert_fails() {
        let mut f = fixture();
        let d = draft(&f);
        f.store.fail_next_ledger_insert = true;

        let err = create_recipe(&mut f.store, f.author, &d).unwrap_err();

        assert_eq!(err.kind(), "storage");
        assert!(f.store.recipes.is_empty());
        assert!(f.store.recipe_tags.is_empty());
    }

    #[test]
    fn test_create_rejects_oversized_image_before_writing() {
        let mut f = fixture();
        let mut d = draft(&f);
        d.image = Some("a".repeat(600));

        let err = create_recipe(&mut f.store, f.author, &d).unwrap_err();

        assert_eq!(err.kind(), "validation");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(f.store.recipes.is_empty());
    }

    #[test]
    fn test_create_duplicate_tags_are_collapsed() {
        let mut f = fixture();
        let mut d = draft(&f);
        d.tag_ids = vec![f.breakfast, f.breakfast];

        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();
        assert_eq!(f.store.tags_of(recipe_id).len(), 1);
    }

    #[test]
    fn test_update_without_ingredients_keeps_ledger() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();
        let before = ledger_of(&f.store, recipe_id);

        let patch = RecipePatch {
            name: Some("Crepes".to_string()),
            tag_ids: Some(Vec::new()),
            ..Default::default()
        };
        update_recipe(&mut f.store, f.author, recipe_id, &patch).unwrap();

        let stored = &f.store.recipes[&recipe_id];
        assert_eq!(stored.name, "Crepes");
        assert_eq!(stored.text, "Whisk and fry");
        assert_eq!(stored.image.as_deref(), Some("recipes/pancakes.png"));
        assert!(f.store.tags_of(recipe_id).is_empty());
        assert_eq!(ledger_of(&f.store, recipe_id), before);
    }

    #[test]
    fn test_update_replaces_ingredients() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();

        let patch = RecipePatch {
            ingredients: Some(vec![entry(f.egg, 3)]),
            ..Default::default()
        };
        update_recipe(&mut f.store, f.author, recipe_id, &patch).unwrap();

        assert_eq!(ledger_of(&f.store, recipe_id), vec![(f.egg, 3)]);
        assert_eq!(f.store.tags_of(recipe_id).len(), 1);
    }

    #[test]
    fn test_update_by_other_user_is_forbidden() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();
        let stranger = f.store.add_user();

        let patch = RecipePatch {
            name: Some("Stolen".to_string()),
            ingredients: Some(vec![entry(f.egg, 1)]),
            ..Default::default()
        };
        let err = update_recipe(&mut f.store, stranger, recipe_id, &patch).unwrap_err();

        assert_eq!(err.kind(), "forbidden");
        assert_eq!(f.store.recipes[&recipe_id].name, "Pancakes");
        assert_eq!(ledger_of(&f.store, recipe_id).len(), 2);
    }

    #[test]
    fn test_update_with_unknown_tag_rolls_back_fields() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();

        let patch = RecipePatch {
            name: Some("Crepes".to_string()),
            tag_ids: Some(vec![Uuid::new_v4()]),
            ..Default::default()
        };
        let err = update_recipe(&mut f.store, f.author, recipe_id, &patch).unwrap_err();

        assert_eq!(err.kind(), "not_found");
        assert_eq!(f.store.recipes[&recipe_id].name, "Pancakes");
        assert_eq!(f.store.tags_of(recipe_id), [f.breakfast].into_iter().collect());
    }

    #[test]
    fn test_update_missing_recipe() {
        let mut f = fixture();
        let err = update_recipe(&mut f.store, f.author, Uuid::new_v4(), &RecipePatch::default())
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_update_rejects_oversized_image() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();

        let patch = RecipePatch {
            image: Some("b".repeat(MAX_IMAGE_LENGTH + 1)),
            ..Default::default()
        };
        let err = update_recipe(&mut f.store, f.author, recipe_id, &patch).unwrap_err();

        assert_eq!(err.kind(), "validation");
        assert_eq!(
            f.store.recipes[&recipe_id].image.as_deref(),
            Some("recipes/pancakes.png")
        );
    }

    #[test]
    fn test_replace_ingredients_checks_author() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();
        let stranger = f.store.add_user();

        let err = replace_recipe_ingredients(&mut f.store, stranger, recipe_id, &[entry(f.egg, 1)])
            .unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert_eq!(ledger_of(&f.store, recipe_id).len(), 2);

        let committed =
            replace_recipe_ingredients(&mut f.store, f.author, recipe_id, &[entry(f.egg, 1)])
                .unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(ledger_of(&f.store, recipe_id), vec![(f.egg, 1)]);
    }

    #[test]
    fn test_replace_ingredients_requires_one_entry() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();

        let err = replace_recipe_ingredients(&mut f.store, f.author, recipe_id, &[]).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert_eq!(ledger_of(&f.store, recipe_id).len(), 2);
    }

    #[test]
    fn test_delete_is_author_only_and_cascades() {
        let mut f = fixture();
        let d = draft(&f);
        let recipe_id = create_recipe(&mut f.store, f.author, &d).unwrap();
        let stranger = f.store.add_user();
        f.store.cart.insert((stranger, recipe_id));
        f.store.favorites.insert((stranger, recipe_id));

        let err = delete_recipe(&mut f.store, stranger, recipe_id).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
        assert!(f.store.recipes.contains_key(&recipe_id));

        delete_recipe(&mut f.store, f.author, recipe_id).unwrap();
        assert!(f.store.recipes.is_empty());
        assert!(f.store.ledger.is_empty());
        assert!(f.store.recipe_tags.is_empty());
        assert!(f.store.cart.is_empty());
        assert!(f.store.favorites.is_empty());

        let err = delete_recipe(&mut f.store, f.author, recipe_id).unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
