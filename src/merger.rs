use crate::loader::SurveyLoader;
use crate::models::{Config, Table, YearSchema};
use anyhow::{bail, Result};
use log::{debug, info};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub table: Table,
    pub rows_per_year: Vec<(u16, usize)>,
    pub dropped_columns: Vec<String>,
}

pub struct SurveyMerger<'a> {
    pub config: &'a Config,
}

impl<'a> SurveyMerger<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Load every configured year, harmonize and tag it, then concatenate and prune.
    pub fn merge(&self, data_dir: &Path) -> Result<MergeOutcome> {
        if self.config.years.is_empty() {
            bail!("No years configured, nothing to merge");
        }

        let loader = SurveyLoader::new(&self.config.missing_markers);
        let mut yearly_tables = Vec::with_capacity(self.config.years.len());
        let mut rows_per_year = Vec::with_capacity(self.config.years.len());

        for schema in &self.config.years {
            let table = loader.load_year(data_dir, schema.year)?;
            let table = harmonize_year(table, schema, &self.config.year_column);
            info!("{}: {} rows, {} columns", schema.year, table.len(), table.headers.len());
            rows_per_year.push((schema.year, table.len()));
            yearly_tables.push(table);
        }

        let mut table = concat_tables(yearly_tables);
        let dropped_columns = table.drop_columns(&self.config.dropped_columns);
        debug!("Dropped columns: {:?}", dropped_columns);

        Ok(MergeOutcome {
            table,
            rows_per_year,
            dropped_columns,
        })
    }
}

/// Rename the year's raw columns to canonical names and tag every row with the year.
pub fn harmonize_year(mut table: Table, schema: &YearSchema, year_column: &str) -> Table {
    table.rename_columns(&schema.column_renames);
    table.set_constant_column(year_column, &schema.year.to_string());
    table
}

/// Stack tables row-wise over the union of their columns (first-appearance order).
/// Cells for columns a source table lacks are missing.
pub fn concat_tables(tables: Vec<Table>) -> Table {
    let mut combined = Table::default();
    for table in &tables {
        for header in &table.headers {
            if combined.column_index(header).is_none() {
                combined.headers.push(header.clone());
            }
        }
    }
    combined.rows.reserve(tables.iter().map(Table::len).sum());

    for table in tables {
        let positions: Vec<usize> = table
            .headers
            .iter()
            .map(|h| combined.column_index(h).unwrap_or_default())
            .collect();

        for row in table.rows {
            let mut combined_row = vec![None; combined.headers.len()];
            for (cell, &position) in row.into_iter().zip(&positions) {
                if combined_row[position].is_none() {
                    combined_row[position] = cell;
                }
            }
            combined.rows.push(combined_row);
        }
    }

    combined
}
