use crate::data::Dataset;

/// Retain rows where at least one column's text rendering contains the
/// needle as a case-insensitive substring. An empty needle keeps everything.
///
/// Always computed from the full dataset, never from a previous filtered
/// result, so repeated applications with the same needle are idempotent.
pub fn filter_rows(data: &Dataset, needle: &str) -> Dataset {
    if needle.is_empty() {
        return data.clone();
    }

    let needle = needle.to_lowercase();
    let rows = data
        .rows
        .iter()
        .filter(|row| {
            row.iter()
                .any(|value| value.to_string().to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();

    Dataset {
        columns: data.columns.clone(),
        rows,
    }
}
