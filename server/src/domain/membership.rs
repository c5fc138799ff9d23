//! Cart, favorites and follow toggles.
//!
//! Each pair is either present or absent. Adding a present pair and removing
//! an absent one are errors, never silent no-ops.

use crate::error::{ServiceError, ServiceResult};
use crate::store::{MembershipRepo, RecipeSet};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

/// The insert referenced a row that is gone, e.g. a recipe deleted by another request.
fn is_missing_reference(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

pub fn add_recipe<C: MembershipRepo>(
    conn: &mut C,
    set: RecipeSet,
    user_id: Uuid,
    recipe_id: Uuid,
) -> ServiceResult<()> {
    // A missing or concurrently deleted recipe surfaces as a foreign key violation
    let inserted = match conn.add_to_set(set, user_id, recipe_id) {
        Ok(inserted) => inserted,
        Err(err) if is_missing_reference(&err) => {
            return Err(ServiceError::not_found("Recipe", recipe_id))
        }
        Err(err) => return Err(err.into()),
    };

    if !inserted {
        return Err(ServiceError::AlreadyExists(format!(
            "Recipe is already in your {}",
            set.label()
        )));
    }

    tracing::info!(user_id = %user_id, recipe_id = %recipe_id, set = set.label(), "recipe added");
    Ok(())
}

pub fn remove_recipe<C: MembershipRepo>(
    conn: &mut C,
    set: RecipeSet,
    user_id: Uuid,
    recipe_id: Uuid,
) -> ServiceResult<()> {
    if !conn.recipe_exists(recipe_id)? {
        return Err(ServiceError::not_found("Recipe", recipe_id));
    }

    if !conn.remove_from_set(set, user_id, recipe_id)? {
        return Err(ServiceError::NotFound(format!(
            "Recipe is not in your {}",
            set.label()
        )));
    }

    tracing::info!(user_id = %user_id, recipe_id = %recipe_id, set = set.label(), "recipe removed");
    Ok(())
}

pub fn follow<C: MembershipRepo>(conn: &mut C, user_id: Uuid, author_id: Uuid) -> ServiceResult<()> {
    if user_id == author_id {
        return Err(ServiceError::SelfFollow);
    }

    let inserted = match conn.add_follow(user_id, author_id) {
        Ok(inserted) => inserted,
        Err(err) if is_missing_reference(&err) => {
            return Err(ServiceError::not_found("User", author_id))
        }
        Err(err) => return Err(err.into()),
    };

    if !inserted {
        return Err(ServiceError::AlreadyExists(
            "You are already following this author".to_string(),
        ));
    }

    tracing::info!(user_id = %user_id, author_id = %author_id, "followed author");
    Ok(())
}

pub fn unfollow<C: MembershipRepo>(
    conn: &mut C,
    user_id: Uuid,
    author_id: Uuid,
) -> ServiceResult<()> {
    if !conn.user_exists(author_id)? {
        return Err(ServiceError::not_found("User", author_id));
    }

    if !conn.remove_follow(user_id, author_id)? {
        return Err(ServiceError::NotFound(
            "You are not following this author".to_string(),
        ));
    }

    tracing::info!(user_id = %user_id, author_id = %author_id, "unfollowed author");
    Ok(())
}
