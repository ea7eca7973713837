use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::data::Dataset;
use crate::palette::ColorPalette;

/// The chart-ready structure: a unified x-axis domain plus named numeric
/// series, one value per label.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    pub fill_color: FillColor,
    pub border_color: String,
    pub fill: bool,
}

/// Cosmetic fill styling: one color for the whole series, or one per point
/// (used by the ungrouped mode so pie-style charts get distinct slices).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FillColor {
    Single(String),
    PerPoint(Vec<String>),
}

impl ChartSeries {
    pub fn empty() -> Self {
        Self {
            labels: Vec::new(),
            series: Vec::new(),
        }
    }
}

/// Convert rows plus an axis/group configuration into a chart series
/// structure.
///
/// Ungrouped: one label per input row, in input order, duplicates kept; a
/// single series named after the y column whose values are the numeric
/// coercion of y (unparseable values stay NaN).
///
/// Grouped: labels are the distinct x values, deduplicated and sorted
/// ascending; one series per distinct group value in first-encounter order.
/// Each cell takes the y of the first record in the group whose x matches
/// the label, defaulting to 0 when absent or non-numeric. The two modes
/// deliberately differ on duplicate x handling.
pub fn build_series(
    data: &Dataset,
    x_col: &str,
    y_col: &str,
    group_col: Option<&str>,
) -> Result<ChartSeries> {
    if data.rows.is_empty() {
        return Ok(ChartSeries::empty());
    }

    let x_idx = data.column_index(x_col)?;
    let y_idx = data.column_index(y_col)?;

    match group_col {
        Some(group) => {
            let group_idx = data.column_index(group)?;
            Ok(build_grouped(data, x_idx, y_idx, group_idx))
        }
        None => Ok(build_flat(data, x_idx, y_idx, y_col)),
    }
}

fn build_flat(data: &Dataset, x_idx: usize, y_idx: usize, y_col: &str) -> ChartSeries {
    let palette = ColorPalette::category10();

    let mut labels = Vec::with_capacity(data.rows.len());
    let mut values = Vec::with_capacity(data.rows.len());
    for row in &data.rows {
        labels.push(row[x_idx].to_string());
        values.push(row[y_idx].as_number());
    }

    let point_colors: Vec<String> = (0..labels.len())
        .map(|i| palette.color(i).to_string())
        .collect();

    ChartSeries {
        labels,
        series: vec![Series {
            name: y_col.to_string(),
            values,
            fill_color: FillColor::PerPoint(point_colors),
            border_color: palette.color(0).to_string(),
            fill: false,
        }],
    }
}

fn build_grouped(data: &Dataset, x_idx: usize, y_idx: usize, group_idx: usize) -> ChartSeries {
    // Group points by the group column, tracking first-appearance order of
    // the group keys; the label domain is the sorted set of x values.
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<(String, f64)>> = HashMap::new();
    let mut label_set: BTreeSet<String> = BTreeSet::new();

    for row in &data.rows {
        let group_key = row[group_idx].to_string();
        let x = row[x_idx].to_string();
        let y = row[y_idx].as_number();

        if !groups.contains_key(&group_key) {
            group_order.push(group_key.clone());
        }
        groups.entry(group_key).or_default().push((x.clone(), y));
        label_set.insert(x);
    }

    let labels: Vec<String> = label_set.into_iter().collect();
    let palette = ColorPalette::category10();

    let series = group_order
        .iter()
        .enumerate()
        .map(|(idx, key)| {
            let points = &groups[key];
            let values = labels
                .iter()
                .map(|label| {
                    // First matching record wins; absent or non-numeric
                    // cells default to 0.
                    points
                        .iter()
                        .find(|(x, _)| x == label)
                        .map(|&(_, y)| y)
                        .filter(|y| y.is_finite())
                        .unwrap_or(0.0)
                })
                .collect();

            Series {
                name: key.clone(),
                values,
                fill_color: FillColor::Single(palette.color(idx).to_string()),
                border_color: palette.color(idx).to_string(),
                fill: false,
            }
        })
        .collect();

    ChartSeries { labels, series }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_csv;

    fn sales_data() -> Dataset {
        decode_csv(
            "month,region,sales\n2024-01,east,100\n2024-01,west,50\n2024-02,east,80\n"
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_dataset_yields_empty_structure() {
        let data = decode_csv("month,sales\n".as_bytes()).unwrap();
        let chart = build_series(&data, "month", "sales", None).unwrap();
        assert!(chart.labels.is_empty());
        assert!(chart.series.is_empty());

        // Regardless of axis selection, even a bogus one.
        let chart = build_series(&data, "nope", "nah", Some("neither")).unwrap();
        assert!(chart.labels.is_empty());
    }

    #[test]
    fn test_ungrouped_preserves_order_and_duplicates() {
        let data = sales_data();
        let chart = build_series(&data, "month", "sales", None).unwrap();

        assert_eq!(chart.labels, vec!["2024-01", "2024-01", "2024-02"]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].name, "sales");
        assert_eq!(chart.series[0].values, vec![100.0, 50.0, 80.0]);
    }

    #[test]
    fn test_ungrouped_non_numeric_stays_nan() {
        let data = decode_csv("x,y\na,10\nb,oops\n".as_bytes()).unwrap();
        let chart = build_series(&data, "x", "y", None).unwrap();
        assert_eq!(chart.series[0].values[0], 10.0);
        assert!(chart.series[0].values[1].is_nan());
    }

    #[test]
    fn test_grouped_scenario() {
        let data = sales_data();
        let chart = build_series(&data, "month", "sales", Some("region")).unwrap();

        assert_eq!(chart.labels, vec!["2024-01", "2024-02"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "east");
        assert_eq!(chart.series[0].values, vec![100.0, 80.0]);
        assert_eq!(chart.series[1].name, "west");
        assert_eq!(chart.series[1].values, vec![50.0, 0.0]);
    }

    #[test]
    fn test_grouped_labels_sorted_and_deduplicated() {
        let data = decode_csv("x,y,g\nc,1,a\na,2,a\nb,3,b\na,4,b\n".as_bytes()).unwrap();
        let chart = build_series(&data, "x", "y", Some("g")).unwrap();

        assert_eq!(chart.labels, vec!["a", "b", "c"]);
        for series in &chart.series {
            assert_eq!(series.values.len(), chart.labels.len());
        }
    }

    #[test]
    fn test_grouped_series_in_first_encounter_order() {
        let data = decode_csv("x,y,g\n1,10,zebra\n2,20,ant\n3,30,zebra\n".as_bytes()).unwrap();
        let chart = build_series(&data, "x", "y", Some("g")).unwrap();
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["zebra", "ant"]);
    }

    #[test]
    fn test_grouped_first_match_wins_on_duplicate_x() {
        let data = decode_csv("x,y,g\na,1,g1\na,2,g1\n".as_bytes()).unwrap();
        let chart = build_series(&data, "x", "y", Some("g")).unwrap();
        assert_eq!(chart.series[0].values, vec![1.0]);
    }

    #[test]
    fn test_grouped_non_numeric_defaults_to_zero() {
        let data = decode_csv("x,y,g\na,oops,g1\n".as_bytes()).unwrap();
        let chart = build_series(&data, "x", "y", Some("g")).unwrap();
        assert_eq!(chart.series[0].values, vec![0.0]);
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let data = sales_data();
        let err = build_series(&data, "nope", "sales", None).unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(build_series(&data, "month", "sales", Some("nope")).is_err());
    }

    #[test]
    fn test_colors_are_deterministic() {
        let data = sales_data();
        let a = build_series(&data, "month", "sales", Some("region")).unwrap();
        let b = build_series(&data, "month", "sales", Some("region")).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_serializes_to_camel_case() {
        let data = sales_data();
        let chart = build_series(&data, "month", "sales", Some("region")).unwrap();
        let json = serde_json::to_value(&chart).unwrap();
        assert!(json["series"][0]["fillColor"].is_string());
        assert_eq!(json["series"][0]["fill"], false);
    }
}
