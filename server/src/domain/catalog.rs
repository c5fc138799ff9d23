use crate::error::{ServiceError, ServiceResult};
use crate::models::Ingredient;
use crate::store::IngredientRepo;
use std::collections::HashMap;
use uuid::Uuid;

/// Resolves every id against the catalog.
///
/// Fails with `NotFound` naming the first id (in request order) that has no
/// catalog entry.
pub fn resolve_ingredients<C: IngredientRepo>(
    conn: &mut C,
    ids: &[Uuid],
) -> ServiceResult<HashMap<Uuid, Ingredient>> {
    let found: HashMap<Uuid, Ingredient> = conn
        .find_ingredients(ids)?
        .into_iter()
        .map(|ingredient| (ingredient.id, ingredient))
        .collect();

    if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
        return Err(ServiceError::not_found("Ingredient", *missing));
    }

    Ok(found)
}
