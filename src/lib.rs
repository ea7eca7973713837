// Library exports for vizboard

pub mod dashboard;
pub mod data;
pub mod decode;
pub mod filter;
pub mod palette;
pub mod render;
pub mod series;

pub use dashboard::{AxisSelection, Dashboard};
pub use data::{Dataset, Value};
pub use render::{ChartKind, RenderOptions};
pub use series::{build_series, ChartSeries, FillColor, Series};
