//! `types` command: list the registered types

use super::output::{self, OutputFormat};
use anyhow::Result;
use serde_json::json;
use sqlcoerce_eval::{CastEngine, TypeCatalog};
use tabled::Tabled;

#[derive(Debug, Tabled)]
pub struct TypeRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Base")]
    pub base: String,
    #[tabled(rename = "Stored as")]
    pub physical: String,
    #[tabled(rename = "Equivalent to")]
    pub equivalent_to: String,
    #[tabled(rename = "Aliases")]
    pub aliases: String,
}

/// One row per registered type, built-ins first
pub fn rows(catalog: &TypeCatalog) -> Vec<TypeRow> {
    catalog
        .types()
        .map(|ty| TypeRow {
            name: ty.name().to_string(),
            base: ty.base().to_string(),
            physical: ty.physical().to_string(),
            equivalent_to: ty.equivalent_to().unwrap_or("").to_string(),
            aliases: catalog.aliases_of(ty.name()).join(", "),
        })
        .collect()
}

pub fn list(engine: &CastEngine, format: OutputFormat) -> Result<()> {
    let rows = rows(&engine.snapshot());
    match format {
        OutputFormat::Json => {
            let types: Vec<_> = rows
                .iter()
                .map(|row| {
                    json!({
                        "name": row.name,
                        "base": row.base,
                        "physical": row.physical,
                        "equivalent_to": row.equivalent_to,
                        "aliases": row.aliases,
                    })
                })
                .collect();
            output::print_json(&json!(types))
        }
        OutputFormat::Pretty => {
            println!("{}", output::table(rows));
            Ok(())
        }
    }
}
