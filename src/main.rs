use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use vizboard::dashboard::Dashboard;
use vizboard::render::{self, ChartKind, RenderOptions};

#[derive(Parser, Debug)]
#[command(name = "vizboard")]
#[command(about = "Render dashboard charts from tabular files (CSV/Excel/JSON)", long_about = None)]
struct Args {
    /// Input table (.csv, .xlsx, .xls or .json)
    input: PathBuf,

    /// X-axis column (defaults to the first column)
    #[arg(long)]
    x: Option<String>,

    /// Y-axis column (defaults to the second column)
    #[arg(long)]
    y: Option<String>,

    /// Optional grouping column (one series per distinct value)
    #[arg(long)]
    group: Option<String>,

    /// Case-insensitive substring filter applied across all columns
    #[arg(long, default_value = "")]
    filter: String,

    /// Chart type
    #[arg(long, value_enum, default_value_t = ChartKind::Line)]
    chart: ChartKind,

    /// Chart title (defaults to "<y> vs <x>")
    #[arg(long)]
    title: Option<String>,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Output PNG path
    #[arg(short, long, default_value = "chart.png")]
    output: PathBuf,

    /// Also export the filtered rows as CSV to this path
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "dashboard_data.csv")]
    export: Option<PathBuf>,

    /// Print the chart series structure as JSON instead of rendering
    #[arg(long)]
    dump_series: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut dashboard = Dashboard::new();
    dashboard
        .load_path(&args.input)
        .with_context(|| format!("Failed to load '{}'", args.input.display()))?;

    dashboard.set_filter(&args.filter);
    if let Some(x) = &args.x {
        dashboard.set_x(x)?;
    }
    if let Some(y) = &args.y {
        dashboard.set_y(y)?;
    }
    if let Some(group) = &args.group {
        dashboard.set_group(Some(group))?;
    }

    if let Some(path) = &args.export {
        fs::write(path, dashboard.export_csv())
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        log::info!("exported filtered rows to '{}'", path.display());
    }

    let series = dashboard.chart_series()?;

    if args.dump_series {
        let json =
            serde_json::to_string_pretty(&series).context("Failed to serialize chart series")?;
        println!("{}", json);
        return Ok(());
    }

    let title = args.title.clone().unwrap_or_else(|| dashboard.title());
    let options = RenderOptions {
        width: args.width,
        height: args.height,
    };
    let png_bytes = render::render_chart(&series, args.chart, &title, &options)
        .context("Failed to render chart")?;

    fs::write(&args.output, &png_bytes)
        .with_context(|| format!("Failed to write '{}'", args.output.display()))?;
    log::info!("wrote chart to '{}'", args.output.display());

    Ok(())
}
