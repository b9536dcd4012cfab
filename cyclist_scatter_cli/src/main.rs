use std::fs;
use std::fs::File;
use std::io::{self, Write};
use std::panic;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use cyclist_scatter::scale::{format_mm_ss, format_year};
use cyclist_scatter::{
    build_chart, fetch_dataset, load_dataset_file, render_page, Category, Chart, ChartConfig,
    Dataset, DEFAULT_DATASET_URL,
};
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Alpe d'Huez doping scatter plot CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the dataset and write the chart page plus optional SVG/PNG/CSV
    Render(RenderArgs),
    /// Print extents, scale domains, tick counts and category totals
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Dataset URL
    #[arg(long, default_value = DEFAULT_DATASET_URL, value_hint = ValueHint::Url)]
    url: String,

    /// Read the dataset from a local JSON file instead of the network
    #[arg(long, conflicts_with = "url", value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output HTML page path (`-` for stdout)
    #[arg(short, long, default_value = "chart.html", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Skip writing the HTML page
    #[arg(long, action = ArgAction::SetTrue)]
    no_page: bool,

    /// Output SVG path
    #[arg(long, value_hint = ValueHint::FilePath)]
    svg: Option<PathBuf>,

    /// Output PNG preview path
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Output CSV of mark positions (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Report path (defaults to stdout)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Render(args) => args.verbose,
        Command::Inspect(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Render(args) => handle_render(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

/// Load once, either from disk or with a single GET on a current-thread runtime.
fn load_dataset(source: &SourceArgs) -> Result<Dataset> {
    if let Some(path) = source.input.as_ref() {
        info!("reading dataset from {}", path.display());
        return load_dataset_file(path)
            .with_context(|| format!("failed to load dataset from {}", path.display()));
    }
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime
        .block_on(fetch_dataset(&source.url))
        .with_context(|| format!("failed to fetch dataset from {}", source.url))
}

fn chart_config(source: &SourceArgs) -> ChartConfig {
    ChartConfig {
        dataset_url: source.url.clone(),
        ..ChartConfig::default()
    }
}

fn handle_render(args: RenderArgs) -> Result<()> {
    if args.no_page && args.svg.is_none() && args.png.is_none() && args.csv.is_none() {
        return Err(anyhow!("nothing to render: --no-page given without --svg/--png/--csv"));
    }

    let dataset = load_dataset(&args.source)?;
    info!(
        records = dataset.len(),
        alleged = dataset.count(Category::Allegation),
        "dataset loaded"
    );
    let chart = build_chart(dataset, chart_config(&args.source))?;

    if !args.no_page {
        write_text(&args.output, &render_page(&chart))?;
        info!("wrote page to {}", args.output.display());
    }

    if let Some(path) = args.svg.as_ref() {
        let svg = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}",
            chart.render_svg()
        );
        write_text(path, &svg)?;
        info!("wrote SVG to {}", path.display());
    }

    if let Some(path) = args.png.as_ref() {
        match render_png_guard(&chart, path) {
            Ok(()) => info!("wrote PNG preview to {}", path.display()),
            Err(err) => warn!("PNG preview skipped: {err}"),
        }
    }

    if let Some(path) = args.csv.as_ref() {
        if path.as_os_str() == "-" {
            write_marks_stdout(&chart)?;
        } else {
            write_marks_csv(&chart, path)?;
            info!("wrote mark table to {}", path.display());
        }
    }

    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let dataset = load_dataset(&args.source)?;
    let chart = build_chart(dataset, chart_config(&args.source))?;
    let report = inspect_report(&chart);
    match args.output.as_ref() {
        Some(path) => {
            write_text(path, &report)?;
            info!("wrote report to {}", path.display());
        }
        None => print!("{report}"),
    }
    Ok(())
}

fn inspect_report(chart: &Chart) -> String {
    let dataset = chart.dataset();
    let config = chart.config();
    let scales = chart.scales();
    let (min_year, max_year) = dataset.year_extent();
    let (min_secs, max_secs) = dataset.seconds_extent();
    let (x0, x1) = scales.x.domain();
    let (y0, y1) = scales.y.domain();
    let mut lines = vec![
        format!("source: {}", config.dataset_url),
        format!("records: {}", dataset.len()),
        format!(
            "no allegations: {}",
            dataset.count(Category::NoAllegation)
        ),
        format!("alleged: {}", dataset.count(Category::Allegation)),
        format!("year extent: {min_year}..{max_year} (niced {x0}..{x1})"),
        format!(
            "time extent: {}..{} (niced {}..{})",
            format_mm_ss(min_secs),
            format_mm_ss(max_secs),
            format_mm_ss(y0),
            format_mm_ss(y1)
        ),
        format!(
            "x ticks: {} every {} years, {} gridlines",
            scales.x.ticks(config.x_tick_years).len(),
            config.x_tick_years,
            scales.x.ticks(config.x_grid_years).len()
        ),
        format!(
            "y ticks: {} every {} s",
            scales.y.ticks(config.y_tick_seconds).len(),
            config.y_tick_seconds
        ),
    ];
    if let Some(fastest) = dataset.records().iter().min_by_key(|r| r.seconds) {
        lines.push(format!(
            "fastest: {} ({}) {} in {}",
            fastest.name, fastest.nationality, fastest.time, fastest.year
        ));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    if path.as_os_str() == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(contents.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[derive(Serialize)]
struct MarkRow<'a> {
    index: usize,
    name: &'a str,
    nationality: &'a str,
    year: i32,
    seconds: u32,
    time: &'a str,
    category: &'static str,
    cx: f64,
    cy: f64,
}

fn write_marks_stdout(chart: &Chart) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    write_mark_rows(chart, &mut writer)
}

fn write_marks_csv(chart: &Chart, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_mark_rows(chart, &mut writer)
}

fn write_mark_rows<W: Write>(chart: &Chart, writer: &mut csv::Writer<W>) -> Result<()> {
    for (mark, record) in chart.marks().iter().zip(chart.dataset().records()) {
        writer.serialize(MarkRow {
            index: mark.index,
            name: &record.name,
            nationality: &record.nationality,
            year: mark.year,
            seconds: mark.seconds,
            time: &record.time,
            category: mark.category.as_str(),
            cx: (mark.cx * 1000.0).round() / 1000.0,
            cy: (mark.cy * 1000.0).round() / 1000.0,
        })?;
    }
    writer.flush()?;
    Ok(())
}

fn preview_color(category: Category) -> RGBColor {
    match category {
        Category::NoAllegation => RGBColor(0, 0, 0),
        Category::Allegation => RGBColor(255, 165, 0),
    }
}

/// Font lookup in plotters can panic on hosts without system fonts.
fn render_png_guard(chart: &Chart, path: &Path) -> Result<(), String> {
    let render = || -> Result<(), String> {
        let layout = chart.config().layout;
        let backend = BitMapBackend::new(path, (layout.width as u32, layout.height as u32));
        draw_preview(backend.into_drawing_area(), chart).map_err(|e| format!("plotting error: {e}"))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

/// Static raster version of the chart: same domains, colors and legend, Y
/// axis flipped so faster times are on top.
fn draw_preview<DB>(root: DrawingArea<DB, plotters::coord::Shift>, chart: &Chart) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let config = chart.config();
    let scales = chart.scales();
    let (x0, x1) = scales.x.domain();
    let (y0, y1) = scales.y.domain();
    // Plot against negated seconds so the smallest time is highest.
    let y_range = -(y1 as f64)..-(y0 as f64);

    root.fill(&WHITE)?;
    let mut plot = ChartBuilder::on(&root)
        .margin(20)
        .caption(
            &config.title,
            FontDesc::new(FontFamily::SansSerif, 22.0, FontStyle::Bold),
        )
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(x0 as f64..x1 as f64, y_range)?;

    let x_labels = ((x1 - x0) as u32 / config.x_tick_years.max(1)) as usize + 1;
    let y_labels = ((y1 - y0) / config.y_tick_seconds.max(1)) as usize + 1;
    plot.configure_mesh()
        .x_labels(x_labels)
        .y_labels(y_labels)
        .x_desc(config.x_caption.as_str())
        .y_desc(config.y_caption.as_str())
        .x_label_formatter(&|v| format_year(v.round() as i32))
        .y_label_formatter(&|v| format_mm_ss((-v).round().max(0.0) as u32))
        .light_line_style(&BLACK.mix(0.05))
        .bold_line_style(&BLACK.mix(0.2))
        .label_style(FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal))
        .draw()?;

    let radius = chart.config().layout.mark_radius as i32;
    let marks = chart.marks();
    for (category, label) in [
        (Category::NoAllegation, "No doping allegations"),
        (Category::Allegation, "Recorded doping allegations"),
    ] {
        let color = preview_color(category);
        let points: Vec<(f64, f64)> = marks
            .iter()
            .filter(|m| m.category == category)
            .map(|m| (m.year as f64, -(m.seconds as f64)))
            .collect();
        debug!(category = category.as_str(), points = points.len(), "drawing preview series");
        plot.draw_series(
            points
                .iter()
                .map(|&p| Circle::new(p, radius, color.filled())),
        )?
        .label(label)
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }
    plot.draw_series(marks.iter().map(|m| {
        Circle::new(
            (m.year as f64, -(m.seconds as f64)),
            radius,
            BLACK.stroke_width(1),
        )
    }))?;

    plot.configure_series_labels()
        .background_style(&WHITE)
        .border_style(&BLACK)
        .label_font(FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal).color(&BLACK))
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cyclist_scatter::parse_dataset;

    const SAMPLE: &str = r#"[
        {"Time":"36:50","Seconds":2210,"Name":"Marco Pantani","Year":1995,"Nationality":"ITA","Doping":"Alleged drug use during 1995 due to high hematocrit levels","URL":""},
        {"Time":"39:00","Seconds":2340,"Name":"A","Year":2015,"Nationality":"FR","Doping":"","URL":""}
    ]"#;

    fn chart() -> Chart {
        let dataset = parse_dataset(SAMPLE.as_bytes()).unwrap();
        build_chart(dataset, ChartConfig::default()).unwrap()
    }

    #[test]
    fn mark_rows_serialize_one_line_per_record() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        write_mark_rows(&chart(), &mut writer).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "index,name,nationality,year,seconds,time,category,cx,cy"
        );
        assert!(lines[1].starts_with("0,Marco Pantani,ITA,1995,2210,36:50,alleged,"));
        assert!(lines[2].starts_with("1,A,FR,2015,2340,39:00,none,"));
    }

    #[test]
    fn loads_dataset_from_file_and_writes_page() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("cyclist-data.json");
        fs::write(&input, SAMPLE).unwrap();
        let source = SourceArgs {
            url: DEFAULT_DATASET_URL.to_string(),
            input: Some(input),
        };
        let dataset = load_dataset(&source).unwrap();
        assert_eq!(dataset.len(), 2);

        let out = dir.path().join("nested").join("chart.html");
        let chart = build_chart(dataset, chart_config(&source)).unwrap();
        write_text(&out, &render_page(&chart)).unwrap();
        let html = fs::read_to_string(&out).unwrap();
        assert!(html.contains("id=\"x-axis\""));
        assert_eq!(html.matches("class=\"dot\"").count(), 2);
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceArgs {
            url: DEFAULT_DATASET_URL.to_string(),
            input: Some(dir.path().join("absent.json")),
        };
        let err = load_dataset(&source).unwrap_err();
        assert!(err.to_string().contains("failed to load dataset"));
    }

    #[test]
    fn inspect_report_lists_domains() {
        let report = inspect_report(&chart());
        assert!(report.contains("records: 2"));
        assert!(report.contains("alleged: 1"));
        assert!(report.contains("niced 1994..2016"));
        assert!(report.contains("fastest: Marco Pantani (ITA) 36:50 in 1995"));
    }
}
