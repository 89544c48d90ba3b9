use crate::models::{parse_cell, Table};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer};
use log::debug;
use std::path::{Path, PathBuf};

pub struct SurveyLoader<'a> {
    missing_markers: &'a [String],
}

impl<'a> SurveyLoader<'a> {
    pub fn new(missing_markers: &'a [String]) -> Self {
        Self { missing_markers }
    }

    /// Path of the source file for `year` inside `data_dir`.
    pub fn year_path(data_dir: &Path, year: u16) -> PathBuf {
        data_dir.join(format!("{}.csv", year))
    }

    pub fn load_year(&self, data_dir: &Path, year: u16) -> Result<Table> {
        self.load_file(&Self::year_path(data_dir, year))
    }

    pub fn load_file(&self, file_path: &Path) -> Result<Table> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of: {}", file_path.display()))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mut table = Table::new(headers);

        for (line, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Malformed record {} in: {}", line + 1, file_path.display())
            })?;
            table.rows.push(
                record
                    .iter()
                    .map(|field| parse_cell(field, self.missing_markers))
                    .collect(),
            );
        }

        debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            file_path.display()
        );
        Ok(table)
    }
}

/// Write `table` with a header row; missing cells become empty fields.
pub fn write_table(table: &Table, file_path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(file_path)
        .with_context(|| format!("Failed to create file: {}", file_path.display()))?;

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }

    writer.flush()?;
    Ok(())
}
