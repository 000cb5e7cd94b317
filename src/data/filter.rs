use serde::{Deserialize, Serialize};

use super::model::{CacheTable, SampleKey, SampleRecord};
use crate::error::{EemError, Result};

// ---------------------------------------------------------------------------
// Selection: which records a query runs on
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// Every record in table order.
    #[default]
    All,
    /// Explicit table positions, in the given order.
    Indices(Vec<usize>),
    /// Every record of one (Batch, Name).
    Sample(SampleKey),
    /// Every record of each key, in key order.
    Samples(Vec<SampleKey>),
}

/// Return the table indices a selection resolves to.
///
/// Keys that match nothing contribute no indices; positions past the end of
/// the table are an error.
pub fn selected_indices(table: &CacheTable, selection: &Selection) -> Result<Vec<usize>> {
    match selection {
        Selection::All => Ok((0..table.len()).collect()),
        Selection::Indices(indices) => {
            if let Some(bad) = indices.iter().find(|&&i| i >= table.len()) {
                return Err(EemError::InvalidSelection(format!(
                    "index {bad} outside a table of {} records",
                    table.len()
                )));
            }
            Ok(indices.clone())
        }
        Selection::Sample(key) => Ok(table.indices_of(std::slice::from_ref(key))),
        Selection::Samples(keys) => Ok(table.indices_of(keys)),
    }
}

/// Resolve a selection to records that share identical axes.
///
/// An empty result or any axis mismatch is a consistency error; records are
/// never truncated to a common subset.
pub fn consistent_records<'a>(
    table: &'a CacheTable,
    selection: &Selection,
) -> Result<Vec<&'a SampleRecord>> {
    let records: Vec<&SampleRecord> = selected_indices(table, selection)?
        .into_iter()
        .filter_map(|i| table.get(i))
        .collect();

    let Some(first) = records.first() else {
        return Err(EemError::Consistency("no records selected".into()));
    };
    if let Some(odd) = records.iter().find(|r| !r.same_axes(first)) {
        return Err(EemError::Consistency(format!(
            "axes of '{}' differ from '{}'",
            odd.key(),
            first.key()
        )));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::record;

    fn table() -> CacheTable {
        CacheTable::from_records(vec![
            record("a.csv", "S1", vec![250, 260], vec![300, 310]),
            record("a.csv", "S2", vec![250, 260], vec![300, 310]),
            record("b.csv", "S1", vec![250, 260], vec![300, 310, 320]),
        ])
    }

    #[test]
    fn resolves_each_selection_kind() {
        let table = table();
        assert_eq!(selected_indices(&table, &Selection::All).unwrap(), vec![0, 1, 2]);
        assert_eq!(
            selected_indices(&table, &Selection::Indices(vec![2, 0])).unwrap(),
            vec![2, 0]
        );
        assert_eq!(
            selected_indices(&table, &Selection::Sample(SampleKey::new("a.csv", "S2"))).unwrap(),
            vec![1]
        );
        assert_eq!(
            selected_indices(
                &table,
                &Selection::Samples(vec![SampleKey::new("b.csv", "S1"), SampleKey::new("x", "y")])
            )
            .unwrap(),
            vec![2]
        );
    }

    #[test]
    fn out_of_range_index_is_invalid() {
        let err = selected_indices(&table(), &Selection::Indices(vec![3])).unwrap_err();
        assert!(matches!(err, EemError::InvalidSelection(_)));
    }

    #[test]
    fn mismatched_axes_are_inconsistent() {
        let err = consistent_records(&table(), &Selection::Indices(vec![0, 2])).unwrap_err();
        assert!(matches!(err, EemError::Consistency(_)));
        assert!(err.to_string().starts_with("data incomplete"));
    }

    #[test]
    fn empty_selection_is_inconsistent() {
        let err = consistent_records(&table(), &Selection::Indices(vec![])).unwrap_err();
        assert!(matches!(err, EemError::Consistency(_)));
    }

    #[test]
    fn matching_axes_pass() {
        let table = table();
        let records = consistent_records(&table, &Selection::Indices(vec![1, 0])).unwrap();
        assert_eq!(records[0].name, "S2");
        assert_eq!(records[1].name, "S1");
    }
}
