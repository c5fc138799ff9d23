//! Wholesale replacement of a recipe's ingredient ledger.

use super::catalog::resolve_ingredients;
use crate::error::{ServiceError, ServiceResult};
use crate::models::LedgerEntry;
use crate::store::{IngredientRepo, LedgerRepo, Transact};
use std::collections::HashSet;
use uuid::Uuid;

/// One requested ledger row. `amount` is checked before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: Uuid,
    pub amount: i64,
}

/// Rejects non-positive or oversized amounts and repeated ingredients.
pub fn validate_entries(entries: &[IngredientAmount]) -> ServiceResult<()> {
    let mut seen = HashSet::with_capacity(entries.len());

    for entry in entries {
        if entry.amount <= 0 {
            return Err(ServiceError::validation(format!(
                "Amount for ingredient {} must be a positive integer",
                entry.ingredient_id
            )));
        }
        if entry.amount > i64::from(i32::MAX) {
            return Err(ServiceError::validation(format!(
                "Amount for ingredient {} is too large",
                entry.ingredient_id
            )));
        }
        if !seen.insert(entry.ingredient_id) {
            return Err(ServiceError::validation(format!(
                "Ingredient {} is listed more than once",
                entry.ingredient_id
            )));
        }
    }

    Ok(())
}

/// Replaces the ledger inside a transaction the caller already holds.
///
/// Locks the recipe row, resolves every ingredient, then deletes and
/// reinserts. Any failure leaves it to the caller's transaction to roll back.
pub fn replace_within<C>(
    conn: &mut C,
    recipe_id: Uuid,
    entries: &[IngredientAmount],
) -> ServiceResult<Vec<LedgerEntry>>
where
    C: LedgerRepo + IngredientRepo,
{
    validate_entries(entries)?;

    if !conn.lock_recipe(recipe_id)? {
        return Err(ServiceError::not_found("Recipe", recipe_id));
    }

    let ids: Vec<Uuid> = entries.iter().map(|e| e.ingredient_id).collect();
    resolve_ingredients(conn, &ids)?;

    let removed = conn.delete_ledger(recipe_id)?;

    let rows: Vec<LedgerEntry> = entries
        .iter()
        .map(|entry| LedgerEntry {
            recipe_id,
            ingredient_id: entry.ingredient_id,
            // validate_entries bounds the amount to i32
            amount: entry.amount as i32,
        })
        .collect();
    conn.insert_ledger(&rows)?;

    tracing::debug!(
        recipe_id = %recipe_id,
        removed,
        inserted = rows.len(),
        "replaced recipe ingredients"
    );

    Ok(rows)
}

/// Replaces a recipe's ledger in its own serializable transaction.
///
/// Either every entry is committed or the previous ledger stays untouched.
pub fn replace_ingredients<C>(
    conn: &mut C,
    recipe_id: Uuid,
    entries: &[IngredientAmount],
) -> ServiceResult<Vec<LedgerEntry>>
where
    C: LedgerRepo + IngredientRepo + Transact,
{
    validate_entries(entries)?;
    conn.write_tx(|conn| replace_within(conn, recipe_id, entries))
}
