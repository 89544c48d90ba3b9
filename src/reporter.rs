use crate::models::Table;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct QualityReport {
    pub total_rows: usize,
    pub expected_occurrences: usize,
    pub occurrences: Vec<(String, usize)>, // count descending, ties in first-seen order
    pub unexpected_occurrences: Vec<(String, usize)>,
    pub incomplete_rows: Vec<usize>,
}

impl QualityReport {
    pub fn unexpected_total(&self) -> usize {
        self.unexpected_occurrences.len()
    }
}

pub struct QualityReporter<'a> {
    pub entity_column: &'a str,
    pub expected_occurrences: usize,
}

impl<'a> QualityReporter<'a> {
    pub fn new(entity_column: &'a str, expected_occurrences: usize) -> Self {
        Self {
            entity_column,
            expected_occurrences,
        }
    }

    pub fn analyze(&self, table: &Table) -> QualityReport {
        let occurrences = self.count_occurrences(table);
        let unexpected_occurrences = occurrences
            .iter()
            .filter(|(_, count)| *count != self.expected_occurrences)
            .cloned()
            .collect();

        let incomplete_rows = table
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(Option::is_none))
            .map(|(index, _)| index)
            .collect();

        QualityReport {
            total_rows: table.len(),
            expected_occurrences: self.expected_occurrences,
            occurrences,
            unexpected_occurrences,
            incomplete_rows,
        }
    }

    fn count_occurrences(&self, table: &Table) -> Vec<(String, usize)> {
        let Some(entity_idx) = table.column_index(self.entity_column) else {
            return Vec::new();
        };

        let mut order: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();
        for entity in table.rows.iter().filter_map(|row| row[entity_idx].as_deref()) {
            match order.get(entity) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    order.insert(entity, counts.len());
                    counts.push((entity.to_string(), 1));
                }
            }
        }

        // Stable sort keeps first-seen order among equal counts
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }
}
