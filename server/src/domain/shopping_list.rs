//! Shopping list built from the recipes in a user's cart.

use crate::error::ServiceResult;
use crate::models::LedgerLine;
use crate::store::{CartRepo, LedgerRepo, Transact};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ShoppingListLine {
    pub ingredient_id: Uuid,
    pub name: String,
    pub total_amount: i64,
    pub measurement_unit: String,
}

/// Sums amounts per ingredient across every recipe in the user's cart.
///
/// Cart and ledger are read in one snapshot. Lines come out sorted by
/// ingredient name, then unit, then id. An empty cart yields no lines.
pub fn aggregate<C>(conn: &mut C, user_id: Uuid) -> ServiceResult<Vec<ShoppingListLine>>
where
    C: CartRepo + LedgerRepo + Transact,
{
    conn.read_snapshot(|conn| {
        let recipe_ids = conn.cart_recipe_ids(user_id)?;
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        let lines = conn.ledger_lines(&recipe_ids)?;
        tracing::debug!(
            user_id = %user_id,
            recipes = recipe_ids.len(),
            rows = lines.len(),
            "aggregating shopping list"
        );
        Ok(accumulate(lines))
    })
}

/// Groups ledger rows by ingredient and sums their amounts.
pub fn accumulate(lines: impl IntoIterator<Item = LedgerLine>) -> Vec<ShoppingListLine> {
    let mut totals: HashMap<Uuid, ShoppingListLine> = HashMap::new();

    for line in lines {
        totals
            .entry(line.ingredient_id)
            .and_modify(|total| total.total_amount += i64::from(line.amount))
            .or_insert_with(|| ShoppingListLine {
                ingredient_id: line.ingredient_id,
                name: line.name,
                total_amount: i64::from(line.amount),
                measurement_unit: line.measurement_unit,
            });
    }

    let mut result: Vec<ShoppingListLine> = totals.into_values().collect();
    result.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
            .then_with(|| a.ingredient_id.cmp(&b.ingredient_id))
    });
    result
}

/// Plain-text download format, one `<name> <amount> <unit>` line per ingredient.
pub fn render_text(lines: &[ShoppingListLine]) -> String {
    let mut text = String::new();
    for line in lines {
        let _ = writeln!(
            text,
            "{} {} {}",
            line.name, line.total_amount, line.measurement_unit
        );
    }
    text
}
