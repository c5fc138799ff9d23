//! Catalog import for `--seed <path>`.
//!
//! Reads `{"ingredients": [{"name", "measurement_unit"}], "tags": [{"name", "color", "slug"}]}`.
//! Rows that already exist are skipped, so a seed file can be applied repeatedly.

use crate::models::{NewIngredient, NewTag};
use crate::schema::{ingredients, tags};
use diesel::prelude::*;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Storage(#[from] diesel::result::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub tags: Vec<NewTag>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub ingredients: usize,
    pub tags: usize,
}

impl SeedFile {
    pub fn parse(json: &str) -> Result<Self, SeedError> {
        let mut file: SeedFile = serde_json::from_str(json)?;
        for ingredient in &mut file.ingredients {
            ingredient.name = ingredient.name.trim().to_string();
            ingredient.measurement_unit = ingredient.measurement_unit.trim().to_string();
        }
        file.ingredients
            .retain(|i| !i.name.is_empty() && !i.measurement_unit.is_empty());
        Ok(file)
    }
}

pub fn load(path: &Path) -> Result<SeedFile, SeedError> {
    SeedFile::parse(&std::fs::read_to_string(path)?)
}

pub fn apply(conn: &mut PgConnection, file: &SeedFile) -> Result<SeedReport, SeedError> {
    let report = conn.transaction(|conn| {
        let mut report = SeedReport::default();
        if !file.ingredients.is_empty() {
            report.ingredients = diesel::insert_into(ingredients::table)
                .values(&file.ingredients)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        if !file.tags.is_empty() {
            report.tags = diesel::insert_into(tags::table)
                .values(&file.tags)
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        Ok::<_, diesel::result::Error>(report)
    })?;

    tracing::info!(
        ingredients = report.ingredients,
        tags = report.tags,
        skipped = file.ingredients.len() + file.tags.len() - report.ingredients - report.tags,
        "catalog seeded"
    );
    Ok(report)
}
