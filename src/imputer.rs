use crate::models::Table;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct ImputationSummary {
    pub missing_before: usize,
    pub missing_after_lookup: usize,
    pub missing_after_manual: usize,
    pub needing_manual: Vec<String>, // entities still missing after the lookup stage
    pub unresolved: Vec<String>,
    pub distinct_categories: Vec<String>,
}

pub struct CategoryImputer<'a> {
    pub entity_column: &'a str,
    pub category_column: &'a str,
    pub manual_categories: &'a BTreeMap<String, String>,
}

impl<'a> CategoryImputer<'a> {
    pub fn new(
        entity_column: &'a str,
        category_column: &'a str,
        manual_categories: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            entity_column,
            category_column,
            manual_categories,
        }
    }

    /// Most frequent category per entity, from rows where both are present.
    /// Ties go to the value that first appeared earliest in row order.
    pub fn build_category_map(&self, table: &Table) -> HashMap<String, String> {
        let (Some(entity_idx), Some(category_idx)) = (
            table.column_index(self.entity_column),
            table.column_index(self.category_column),
        ) else {
            return HashMap::new();
        };

        // Per entity: distinct categories in encounter order with their counts
        let mut tallies: HashMap<&str, Vec<(&str, usize)>> = HashMap::new();
        for row in &table.rows {
            if let (Some(entity), Some(category)) = (&row[entity_idx], &row[category_idx]) {
                let tally = tallies.entry(entity.as_str()).or_default();
                match tally.iter_mut().find(|(value, _)| *value == category.as_str()) {
                    Some((_, count)) => *count += 1,
                    None => tally.push((category.as_str(), 1)),
                }
            }
        }

        tallies
            .into_iter()
            .filter_map(|(entity, tally)| {
                let mut best: Option<(&str, usize)> = None;
                for (value, count) in tally {
                    if best.map_or(true, |(_, best_count)| count > best_count) {
                        best = Some((value, count));
                    }
                }
                best.map(|(value, _)| (entity.to_string(), value.to_string()))
            })
            .collect()
    }

    /// Fill missing categories from the derived map, then from the manual table.
    pub fn impute(&self, table: &mut Table) -> ImputationSummary {
        let category_idx = table.ensure_column(self.category_column);
        let entity_idx = table.column_index(self.entity_column);

        let mut summary = ImputationSummary {
            missing_before: table.count_missing(self.category_column),
            ..Default::default()
        };

        let category_map = self.build_category_map(table);
        debug!("Derived {} {} assignments", category_map.len(), self.category_column);

        if let Some(entity_idx) = entity_idx {
            for row in table.rows.iter_mut() {
                if row[category_idx].is_some() {
                    continue;
                }
                if let Some(category) = row[entity_idx].as_ref().and_then(|e| category_map.get(e)) {
                    row[category_idx] = Some(category.clone());
                }
            }
        }
        summary.missing_after_lookup = table.count_missing(self.category_column);
        summary.needing_manual = self.entities_missing_category(table);
        info!(
            "Missing '{}' values: {} before, {} after lookup",
            self.category_column, summary.missing_before, summary.missing_after_lookup
        );

        if let Some(entity_idx) = entity_idx {
            for row in table.rows.iter_mut() {
                if row[category_idx].is_some() {
                    continue;
                }
                if let Some(category) = row[entity_idx]
                    .as_ref()
                    .and_then(|e| self.manual_categories.get(e))
                {
                    row[category_idx] = Some(category.clone());
                }
            }
        }
        summary.missing_after_manual = table.count_missing(self.category_column);
        summary.unresolved = self.entities_missing_category(table);
        info!(
            "Missing '{}' values after manual assignments: {}",
            self.category_column, summary.missing_after_manual
        );

        summary.distinct_categories = table
            .rows
            .iter()
            .filter_map(|row| row[category_idx].as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        summary
    }

    /// Sorted distinct entities that still have a row without a category.
    fn entities_missing_category(&self, table: &Table) -> Vec<String> {
        let (Some(entity_idx), Some(category_idx)) = (
            table.column_index(self.entity_column),
            table.column_index(self.category_column),
        ) else {
            return Vec::new();
        };

        table
            .rows
            .iter()
            .filter(|row| row[category_idx].is_none())
            .filter_map(|row| row[entity_idx].as_deref())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;

    fn table(rows: &[(&str, Option<&str>, &str)]) -> Table {
        let mut table = Table::new(vec![
            "Country".to_string(),
            "Region".to_string(),
            "Year".to_string(),
        ]);
        for (country, region, year) in rows {
            table.rows.push(vec![
                Some(country.to_string()),
                region.map(str::to_string),
                Some(year.to_string()),
            ]);
        }
        table
    }

    #[test]
    fn fills_every_year_from_a_single_known_region() {
        let config = Config::default();
        let mut combined = table(&[
            ("Finland", Some("Western Europe"), "2015"),
            ("Finland", None, "2016"),
            ("Finland", None, "2017"),
            ("Finland", None, "2018"),
            ("Finland", None, "2019"),
        ]);

        let summary = CategoryImputer::new("Country", "Region", &config.manual_categories)
            .impute(&mut combined);

        assert_eq!(summary.missing_before, 4);
        assert_eq!(summary.missing_after_lookup, 0);
        assert!(combined
            .rows
            .iter()
            .all(|row| row[1].as_deref() == Some("Western Europe")));
    }

    #[test]
    fn manual_table_covers_entities_never_labelled() {
        let config = Config::default();
        let mut combined = table(&[
            ("Gambia", None, "2015"),
            ("Gambia", None, "2016"),
            ("Gambia", None, "2017"),
            ("Gambia", None, "2018"),
            ("Gambia", None, "2019"),
            ("Narnia", None, "2019"),
        ]);

        let summary = CategoryImputer::new("Country", "Region", &config.manual_categories)
            .impute(&mut combined);

        assert_eq!(summary.missing_after_lookup, 6);
        assert_eq!(summary.needing_manual, vec!["Gambia", "Narnia"]);
        assert_eq!(summary.missing_after_manual, 1);
        assert_eq!(summary.unresolved, vec!["Narnia"]);
        for row in &combined.rows[..5] {
            assert_eq!(row[1].as_deref(), Some("Sub-Saharan Africa"));
        }
        assert_eq!(combined.rows[5][1], None);
        assert_eq!(summary.distinct_categories, vec!["Sub-Saharan Africa"]);
    }

    #[test]
    fn manual_table_never_overwrites_known_values() {
        let mut manual = BTreeMap::new();
        manual.insert("Taiwan".to_string(), "Eastern Asia".to_string());
        let mut combined = table(&[
            ("Taiwan", Some("Eastern Asia"), "2015"),
            ("Taiwan", Some("Eastern Asia"), "2016"),
            ("Taiwan", Some("East Asia"), "2017"),
        ]);

        CategoryImputer::new("Country", "Region", &manual).impute(&mut combined);
        assert_eq!(combined.rows[2][1].as_deref(), Some("East Asia"));
    }

    #[test]
    fn mode_picks_most_frequent_then_first_seen() {
        let manual = BTreeMap::new();
        let imputer = CategoryImputer::new("Country", "Region", &manual);
        let combined = table(&[
            ("Cyprus", Some("Western Europe"), "2015"),
            ("Cyprus", Some("Middle East"), "2016"),
            ("Cyprus", Some("Middle East"), "2017"),
            ("Turkey", Some("Middle East"), "2015"),
            ("Turkey", Some("Europe"), "2016"),
            ("Turkey", None, "2017"),
        ]);

        let map = imputer.build_category_map(&combined);
        assert_eq!(map.get("Cyprus").map(String::as_str), Some("Middle East"));
        assert_eq!(map.get("Turkey").map(String::as_str), Some("Middle East"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn absent_category_column_is_created() {
        let config = Config::default();
        let mut combined = Table::new(vec!["Country".to_string()]);
        combined.rows.push(vec![Some("Gambia".to_string())]);

        let summary = CategoryImputer::new("Country", "Region", &config.manual_categories)
            .impute(&mut combined);
        assert_eq!(summary.missing_before, 1);
        assert_eq!(combined.value(0, "Region"), Some("Sub-Saharan Africa"));
    }
}
