use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data_directory: String,
    pub output_file: String,
    pub entity_column: String,
    pub category_column: String,
    pub year_column: String,
    // Falls back to the number of configured years
    pub expected_occurrences: Option<usize>,
    pub missing_markers: Vec<String>,
    pub dropped_columns: Vec<String>,
    pub manual_categories: BTreeMap<String, String>,
    pub years: Vec<YearSchema>,
}

/// One source file (`{year}.csv`) and the renames that bring its header to the canonical names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearSchema {
    pub year: u16,
    #[serde(default)]
    pub column_renames: BTreeMap<String, String>,
}

impl YearSchema {
    pub fn new(year: u16, renames: &[(&str, &str)]) -> Self {
        Self {
            year,
            column_renames: renames
                .iter()
                .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
                .collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ranked_schema = [
            ("Overall rank", "Happiness Rank"),
            ("Country or region", "Country"),
            ("Score", "Happiness Score"),
            ("GDP per capita", "Economy (GDP per Capita)"),
            ("Social support", "Family"),
            ("Healthy life expectancy", "Health (Life Expectancy)"),
            ("Freedom to make life choices", "Freedom"),
            ("Perceptions of corruption", "Trust (Government Corruption)"),
        ];

        Self {
            data_directory: "data".to_string(),
            output_file: "2015_2019_combined.csv".to_string(),
            entity_column: "Country".to_string(),
            category_column: "Region".to_string(),
            year_column: "Year".to_string(),
            expected_occurrences: None,
            missing_markers: [
                "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
                "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
            ]
            .iter()
            .map(|m| m.to_string())
            .collect(),
            dropped_columns: vec![
                "Family".to_string(),
                "Trust (Government Corruption)".to_string(),
                "Lower Confidence Interval".to_string(),
                "Upper Confidence Interval".to_string(),
                "Whisker.high".to_string(),
                "Whisker.low".to_string(),
                "Happiness Rank".to_string(),
                "Standard Error".to_string(),
                "Dystopia Residual".to_string(),
            ],
            manual_categories: [
                ("Gambia", "Sub-Saharan Africa"),
                ("Hong Kong S.A.R., China", "Eastern Asia"),
                ("North Macedonia", "Central and Eastern Europe"),
                ("Northern Cyprus", "Middle East and Northern Africa"),
                ("Taiwan Province of China", "Eastern Asia"),
                ("Trinidad & Tobago", "Latin America and Caribbean"),
            ]
            .iter()
            .map(|(country, region)| (country.to_string(), region.to_string()))
            .collect(),
            years: vec![
                // 2015 and 2016 already use the canonical names
                YearSchema::new(2015, &[]),
                YearSchema::new(2016, &[]),
                YearSchema::new(
                    2017,
                    &[
                        ("Happiness.Rank", "Happiness Rank"),
                        ("Happiness.Score", "Happiness Score"),
                        ("Economy..GDP.per.Capita.", "Economy (GDP per Capita)"),
                        ("Health..Life.Expectancy.", "Health (Life Expectancy)"),
                        ("Trust..Government.Corruption.", "Trust (Government Corruption)"),
                        ("Dystopia.Residual", "Dystopia Residual"),
                    ],
                ),
                YearSchema::new(2018, &ranked_schema),
                YearSchema::new(2019, &ranked_schema),
            ],
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    pub fn expected_occurrences(&self) -> usize {
        self.expected_occurrences.unwrap_or(self.years.len())
    }
}

/// In-memory delimited table. Every row has exactly one cell per header; `None` is a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    #[cfg(test)]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Replace every header named in `renames`; entries for absent columns are ignored.
    pub fn rename_columns(&mut self, renames: &BTreeMap<String, String>) {
        for header in self.headers.iter_mut() {
            if let Some(canonical) = renames.get(header.as_str()) {
                *header = canonical.clone();
            }
        }
    }

    /// Fill `name` with `value` in every row, appending the column if it does not exist yet.
    pub fn set_constant_column(&mut self, name: &str, value: &str) {
        let index = self.ensure_column(name);
        for row in self.rows.iter_mut() {
            row[index] = Some(value.to_string());
        }
    }

    /// Index of `name`, appending an all-missing column when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.headers.push(name.to_string());
        for row in self.rows.iter_mut() {
            row.push(None);
        }
        self.headers.len() - 1
    }

    /// Remove the named columns that exist and return the names actually removed.
    pub fn drop_columns(&mut self, names: &[String]) -> Vec<String> {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !names.iter().any(|n| n == h))
            .collect();
        if keep.iter().all(|k| *k) {
            return Vec::new();
        }

        let dropped = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(h, _)| h.clone())
            .collect();

        self.headers = retain_by_mask(std::mem::take(&mut self.headers), &keep);
        for row in self.rows.iter_mut() {
            *row = retain_by_mask(std::mem::take(row), &keep);
        }
        dropped
    }

    pub fn count_missing(&self, column: &str) -> usize {
        match self.column_index(column) {
            Some(index) => self.rows.iter().filter(|row| row[index].is_none()).count(),
            None => self.rows.len(),
        }
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| if *k { Some(item) } else { None })
        .collect()
}

/// Turn a raw CSV field into a cell: blank text and configured markers become missing.
pub fn parse_cell(raw: &str, missing_markers: &[String]) -> Option<String> {
    if raw.trim().is_empty() || missing_markers.iter().any(|m| m == raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(vec!["Country or region".to_string(), "Score".to_string()]);
        table.rows.push(vec![Some("Finland".to_string()), Some("7.769".to_string())]);
        table.rows.push(vec![Some("Denmark".to_string()), None]);
        table
    }

    #[test]
    fn rename_ignores_unknown_columns() {
        let mut table = sample();
        let schema = YearSchema::new(
            2019,
            &[("Country or region", "Country"), ("Overall rank", "Happiness Rank")],
        );
        table.rename_columns(&schema.column_renames);
        assert_eq!(table.headers, vec!["Country", "Score"]);
        assert_eq!(table.value(0, "Country"), Some("Finland"));
    }

    #[test]
    fn constant_column_is_appended_then_overwritten() {
        let mut table = sample();
        table.set_constant_column("Year", "2018");
        assert_eq!(table.headers.last().map(String::as_str), Some("Year"));
        table.set_constant_column("Year", "2019");
        assert_eq!(table.headers.len(), 3);
        assert!(table.rows.iter().all(|r| r[2].as_deref() == Some("2019")));
    }

    #[test]
    fn drop_columns_is_tolerant() {
        let mut table = sample();
        let dropped = table.drop_columns(&["Score".to_string(), "Whisker.low".to_string()]);
        assert_eq!(dropped, vec!["Score"]);
        assert_eq!(table.headers, vec!["Country or region"]);
        assert!(table.rows.iter().all(|r| r.len() == 1));

        assert!(table.drop_columns(&["Whisker.low".to_string()]).is_empty());
    }

    #[test]
    fn missing_markers_become_null() {
        let markers = Config::default().missing_markers;
        assert_eq!(parse_cell("  ", &markers), None);
        assert_eq!(parse_cell("NaN", &markers), None);
        assert_eq!(parse_cell("Namibia", &markers).as_deref(), Some("Namibia"));
    }

    #[test]
    fn default_config_survives_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.years.len(), 5);
        assert_eq!(parsed.expected_occurrences(), 5);
        assert_eq!(
            parsed.years[3].column_renames.get("Country or region").map(String::as_str),
            Some("Country")
        );
        assert!(parsed.years[0].column_renames.is_empty());
    }
}
