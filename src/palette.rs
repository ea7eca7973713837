use std::collections::HashMap;

/// Deterministic categorical color palette.
///
/// Colors are assigned by index (cycling), so the same dataset always gets
/// the same styling; equality comparisons in tests stay on labels/values.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<String>,
}

impl ColorPalette {
    /// The d3 "category10" scheme.
    pub fn category10() -> Self {
        Self {
            colors: [
                "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b",
                "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    pub fn color(&self, index: usize) -> &str {
        &self.colors[index % self.colors.len()]
    }

    /// Assign one color per key, in the order given.
    pub fn assign_colors(&self, keys: &[String]) -> HashMap<String, String> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| (key.clone(), self.color(i).to_string()))
            .collect()
    }
}
