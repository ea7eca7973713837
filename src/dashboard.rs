use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;

use crate::data::Dataset;
use crate::decode;
use crate::filter;
use crate::series::{build_series, ChartSeries};

/// The user's chosen x column, y column and optional grouping column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSelection {
    pub x: String,
    pub y: String,
    pub group: Option<String>,
}

/// Owned dashboard state: the current dataset, the filter text, the cached
/// filtered view and the axis selection.
///
/// Everything is rebuild-on-change: loading a file replaces the dataset
/// wholesale (and only on decode success), filter changes recompute the
/// filtered view from the full dataset, and each selection setter merges a
/// single changed field into the owned selection.
#[derive(Debug, Default)]
pub struct Dashboard {
    dataset: Dataset,
    filtered: Dataset,
    filter: String,
    selection: Option<AxisSelection>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a file and replace the dataset. On failure the prior state is
    /// left untouched; on success the axis selection resets to the first
    /// two columns (or the single column twice, if there is only one).
    pub fn load_path(&mut self, path: &Path) -> Result<()> {
        let dataset = decode::decode_path(path)?;
        log::info!(
            "loaded {} rows x {} columns from '{}'",
            dataset.rows.len(),
            dataset.columns.len(),
            path.display()
        );

        self.selection = default_selection(&dataset);
        self.dataset = dataset;
        self.refresh_filtered();
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.dataset.columns
    }

    pub fn selection(&self) -> Option<&AxisSelection> {
        self.selection.as_ref()
    }

    pub fn filtered(&self) -> &Dataset {
        &self.filtered
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = text.to_string();
        self.refresh_filtered();
    }

    pub fn set_x(&mut self, column: &str) -> Result<()> {
        self.dataset.column_index(column)?;
        self.selection_mut()?.x = column.to_string();
        Ok(())
    }

    pub fn set_y(&mut self, column: &str) -> Result<()> {
        self.dataset.column_index(column)?;
        self.selection_mut()?.y = column.to_string();
        Ok(())
    }

    pub fn set_group(&mut self, column: Option<&str>) -> Result<()> {
        if let Some(column) = column {
            self.dataset.column_index(column)?;
        }
        self.selection_mut()?.group = column.map(|c| c.to_string());
        Ok(())
    }

    /// Build the chart series structure for the current filtered view and
    /// axis selection.
    pub fn chart_series(&self) -> Result<ChartSeries> {
        let selection = self
            .selection
            .as_ref()
            .ok_or_else(|| anyhow!("No dataset loaded"))?;
        build_series(
            &self.filtered,
            &selection.x,
            &selection.y,
            selection.group.as_deref(),
        )
        .context("Failed to build chart series")
    }

    /// Default chart title, "<y> vs <x>".
    pub fn title(&self) -> String {
        match &self.selection {
            Some(s) => format!("{} vs {}", s.y, s.x),
            None => "vizboard".to_string(),
        }
    }

    /// Serialize the filtered view as comma-separated text: header row,
    /// then one line per row, values joined in column order. Embedded
    /// commas are not escaped (known limitation, kept from the original
    /// export format).
    pub fn export_csv(&self) -> String {
        let mut out = self.dataset.columns.join(",");
        for row in &self.filtered.rows {
            out.push('\n');
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push_str(&line.join(","));
        }
        out
    }

    fn selection_mut(&mut self) -> Result<&mut AxisSelection> {
        match self.selection.as_mut() {
            Some(selection) => Ok(selection),
            None => bail!("No dataset loaded"),
        }
    }

    fn refresh_filtered(&mut self) {
        self.filtered = filter::filter_rows(&self.dataset, &self.filter);
    }
}

fn default_selection(dataset: &Dataset) -> Option<AxisSelection> {
    match dataset.columns.len() {
        0 => None,
        1 => Some(AxisSelection {
            x: dataset.columns[0].clone(),
            y: dataset.columns[0].clone(),
            group: None,
        }),
        _ => Some(AxisSelection {
            x: dataset.columns[0].clone(),
            y: dataset.columns[1].clone(),
            group: None,
        }),
    }
}
