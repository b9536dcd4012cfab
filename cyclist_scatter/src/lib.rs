//! Scatter plot of the fastest Alpe d'Huez ascents against year, colored by
//! doping-allegation status.
//!
//! Pipeline: load [`Dataset`] -> [`ChartScales`] -> marks, axes, gridlines,
//! legend -> hover tooltip. [`build_chart`] runs every step after loading.

pub mod axis;
pub mod page;
pub mod render;
pub mod scale;
pub mod svg;
pub mod tooltip;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub use page::render_page;
pub use render::Mark;
pub use scale::{ChartScales, DurationScale, YearScale};
pub use tooltip::{TooltipContent, TooltipEvent, TooltipPosition, TooltipState};

pub const DEFAULT_DATASET_URL: &str =
    "https://raw.githubusercontent.com/freeCodeCamp/ProjectReferenceData/master/cyclist-data.json";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("dataset request failed: {0}")]
    Http(String),
    #[error("malformed dataset: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset contains no records")]
    EmptyDataset,
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// One ascent as served by the dataset endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaceRecord {
    pub year: i32,
    /// Display time, `MM:SS`.
    pub time: String,
    pub seconds: u32,
    pub name: String,
    pub nationality: String,
    /// Empty when no allegation is recorded.
    #[serde(default)]
    pub doping: String,
    #[serde(rename = "URL", default)]
    pub url: String,
}

impl RaceRecord {
    pub fn category(&self) -> Category {
        if self.doping.is_empty() {
            Category::NoAllegation
        } else {
            Category::Allegation
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    NoAllegation,
    Allegation,
}

impl Category {
    pub const HIGHLIGHT: &'static str = "rgb(248, 190, 83)";

    pub fn mark_fill(self) -> &'static str {
        match self {
            Category::NoAllegation => "black",
            Category::Allegation => "orange",
        }
    }

    pub fn legend_fill(self) -> &'static str {
        match self {
            Category::NoAllegation => "black",
            Category::Allegation => Self::HIGHLIGHT,
        }
    }

    pub fn tooltip_background(self) -> &'static str {
        match self {
            Category::NoAllegation => "white",
            Category::Allegation => Self::HIGHLIGHT,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::NoAllegation => "none",
            Category::Allegation => "alleged",
        }
    }
}

/// Immutable, non-empty list of records loaded once per session.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    records: Vec<RaceRecord>,
}

impl Dataset {
    pub fn new(records: Vec<RaceRecord>) -> Result<Self, ChartError> {
        if records.is_empty() {
            return Err(ChartError::EmptyDataset);
        }
        for record in &records {
            match parse_time_display(&record.time) {
                Some(secs) if secs != record.seconds => warn!(
                    name = %record.name,
                    year = record.year,
                    "display time {} disagrees with {} seconds",
                    record.time,
                    record.seconds
                ),
                None => debug!(name = %record.name, "unparsable display time {:?}", record.time),
                _ => {}
            }
        }
        Ok(Self { records })
    }

    pub fn records(&self) -> &[RaceRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&RaceRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn year_extent(&self) -> (i32, i32) {
        // Non-empty by construction.
        scale::extent(self.records.iter().map(|r| r.year)).unwrap_or((0, 0))
    }

    pub fn seconds_extent(&self) -> (u32, u32) {
        scale::extent(self.records.iter().map(|r| r.seconds)).unwrap_or((0, 0))
    }

    pub fn count(&self, category: Category) -> usize {
        self.records
            .iter()
            .filter(|r| r.category() == category)
            .count()
    }
}

/// Parse `MM:SS` into seconds.
pub fn parse_time_display(time: &str) -> Option<u32> {
    let (mm, ss) = time.trim().split_once(':')?;
    let minutes: u32 = mm.parse().ok()?;
    let seconds: u32 = ss.parse().ok()?;
    if seconds >= 60 {
        return None;
    }
    Some(minutes * 60 + seconds)
}

/// Decode a JSON array of records.
pub fn parse_dataset(input: &[u8]) -> Result<Dataset, ChartError> {
    let records: Vec<RaceRecord> = serde_json::from_slice(input)?;
    debug!(records = records.len(), "decoded dataset");
    Dataset::new(records)
}

pub fn load_dataset_file(path: &Path) -> Result<Dataset, ChartError> {
    let bytes = std::fs::read(path)?;
    parse_dataset(&bytes)
}

/// One GET, no retry.
#[cfg(feature = "fetch")]
pub async fn fetch_dataset(url: &str) -> Result<Dataset, ChartError> {
    tracing::info!(url, "fetching dataset");
    let response = reqwest::get(url)
        .await
        .map_err(|e| ChartError::Http(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ChartError::Http(format!("{url} returned {status}")));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| ChartError::Http(e.to_string()))?;
    parse_dataset(&body)
}

/// Fixed drawing-surface geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub mark_radius: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            width: 850.0,
            height: 500.0,
            margin: 50.0,
            mark_radius: 5.0,
        }
    }
}

impl Layout {
    pub fn plot_width(&self) -> f64 {
        self.width - 2.0 * self.margin
    }

    pub fn plot_height(&self) -> f64 {
        self.height - 2.0 * self.margin
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub dataset_url: String,
    pub title: String,
    pub description: String,
    pub x_caption: String,
    pub y_caption: String,
    pub x_tick_years: u32,
    pub x_grid_years: u32,
    pub y_tick_seconds: u32,
    pub layout: Layout,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            title: "Doping in Professional Bicycle Racing".to_string(),
            description: "35 Fastest times up Alpe d'Huez (1994-2015)".to_string(),
            x_caption: "Year".to_string(),
            y_caption: "Time in Minutes".to_string(),
            x_tick_years: 2,
            x_grid_years: 1,
            y_tick_seconds: 15,
            layout: Layout::default(),
        }
    }
}

/// Everything needed to draw and interact with the plot.
#[derive(Clone, Debug)]
pub struct Chart {
    config: ChartConfig,
    dataset: Dataset,
    scales: ChartScales,
    marks: Vec<Mark>,
}

impl Chart {
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn scales(&self) -> &ChartScales {
        &self.scales
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn svg(&self) -> svg::Element {
        render::render_svg(&self.dataset, &self.marks, &self.scales, &self.config)
    }

    pub fn render_svg(&self) -> String {
        self.svg().render()
    }

    /// Pointer-enter event for the mark at `index`.
    pub fn enter_event(&self, index: usize, page_x: f64, page_y: f64) -> Option<TooltipEvent<'_>> {
        let record = self.dataset.get(index)?;
        Some(TooltipEvent::Enter {
            record,
            page_x,
            page_y,
        })
    }
}

/// Build scales and marks for a loaded dataset.
pub fn build_chart(dataset: Dataset, config: ChartConfig) -> Result<Chart, ChartError> {
    let scales = ChartScales::from_dataset(&dataset, &config.layout)?;
    let marks = render::layout_marks(&dataset, &scales);
    debug!(
        marks = marks.len(),
        x_domain = ?scales.x.domain(),
        y_domain = ?scales.y.domain(),
        "chart built"
    );
    Ok(Chart {
        config,
        dataset,
        scales,
        marks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"Time":"36:50","Place":1,"Seconds":2210,"Name":"Marco Pantani","Year":1995,"Nationality":"ITA","Doping":"Alleged drug use during 1995 due to high hematocrit levels","URL":"https://en.wikipedia.org/wiki/Marco_Pantani#Alleged_drug_use"},
        {"Time":"39:00","Place":2,"Seconds":2340,"Name":"A","Year":2015,"Nationality":"FR","Doping":"","URL":""},
        {"Time":"40:07","Place":3,"Seconds":2407,"Name":"B","Year":1994,"Nationality":"ESP","Doping":"","URL":""}
    ]"#;

    #[test]
    fn parses_dataset_fields() {
        let data = parse_dataset(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.len(), 3);
        let first = &data.records()[0];
        assert_eq!(first.year, 1995);
        assert_eq!(first.seconds, 2210);
        assert_eq!(first.nationality, "ITA");
        assert!(first.url.starts_with("https://en.wikipedia.org"));
        assert_eq!(data.year_extent(), (1994, 2015));
        assert_eq!(data.seconds_extent(), (2210, 2407));
        assert_eq!(data.count(Category::Allegation), 1);
        assert_eq!(data.count(Category::NoAllegation), 2);
    }

    #[test]
    fn rejects_empty_and_malformed_input() {
        assert!(matches!(parse_dataset(b"[]"), Err(ChartError::EmptyDataset)));
        assert!(matches!(parse_dataset(b"{not json"), Err(ChartError::Json(_))));
        assert!(matches!(
            parse_dataset(br#"[{"Year":"x","Seconds":1,"Time":"00:01","Name":"n","Nationality":"n"}]"#),
            Err(ChartError::Json(_))
        ));
    }

    #[test]
    fn missing_doping_defaults_to_empty() {
        let data =
            parse_dataset(br#"[{"Year":2000,"Seconds":60,"Time":"01:00","Name":"n","Nationality":"n"}]"#)
                .unwrap();
        assert_eq!(data.records()[0].category(), Category::NoAllegation);
    }

    #[test]
    fn parses_display_time() {
        assert_eq!(parse_time_display("39:00"), Some(2340));
        assert_eq!(parse_time_display("36:50"), Some(2210));
        assert_eq!(parse_time_display("36:75"), None);
        assert_eq!(parse_time_display("nope"), None);
    }

    #[test]
    fn end_to_end_clean_record() {
        let data = parse_dataset(
            br#"[{"Year":2015,"Seconds":2340,"Doping":"","Name":"A","Nationality":"FR","Time":"39:00"}]"#,
        )
        .unwrap();
        let chart = build_chart(data, ChartConfig::default()).unwrap();
        let svg = chart.svg();
        let dot = svg.find_by_class("dot")[0];
        assert_eq!(dot.get_attr("data-xvalue"), Some("2015"));
        assert_eq!(dot.get_attr("data-yvalue"), Some("2340"));
        assert_eq!(dot.get_attr("fill"), Some(Category::NoAllegation.mark_fill()));

        let mut tooltip = TooltipState::default();
        tooltip.apply(chart.enter_event(0, 10.0, 10.0).unwrap());
        assert!(tooltip.content().unwrap().html.contains("No Doping Allegations"));
    }

    #[test]
    fn end_to_end_alleged_record() {
        let data = parse_dataset(SAMPLE.as_bytes()).unwrap();
        let chart = build_chart(data, ChartConfig::default()).unwrap();
        let mut tooltip = TooltipState::default();
        tooltip.apply(chart.enter_event(0, 0.0, 0.0).unwrap());
        let content = tooltip.content().unwrap();
        assert_eq!(content.background, Category::HIGHLIGHT);
        assert!(content
            .html
            .contains("Alleged drug use during 1995 due to high hematocrit levels"));
        assert!(chart.enter_event(99, 0.0, 0.0).is_none());
    }

    #[test]
    fn marks_match_records_and_categories() {
        let data = parse_dataset(SAMPLE.as_bytes()).unwrap();
        let chart = build_chart(data, ChartConfig::default()).unwrap();
        for (mark, record) in chart.marks().iter().zip(chart.dataset().records()) {
            assert_eq!(mark.year, record.year);
            assert_eq!(mark.seconds, record.seconds);
            assert_eq!(mark.category, record.category());
        }
        assert_eq!(chart.scales().x.domain(), (1994, 2016));
        assert_eq!(chart.scales().y.domain(), (2205, 2415));
    }
    #[test]
    fn extreme_years_fail_to_build() {
        let record = |year| RaceRecord {
            year,
            time: "39:00".into(),
            seconds: 2340,
            name: "A".into(),
            nationality: "FR".into(),
            doping: String::new(),
            url: String::new(),
        };
        let data = Dataset::new(vec![record(i32::MIN), record(i32::MAX)]).unwrap();
        let result = build_chart(data, ChartConfig::default());
        assert!(matches!(result, Err(ChartError::InvalidRecord(_))));
    }

    #[cfg(feature = "fetch")]
    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    /// Answer a single request on a local port with a canned response.
    #[cfg(feature = "fetch")]
    fn serve_once(response: String) -> (String, std::thread::JoinHandle<()>) {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/cyclist-data.json", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf);
            stream.write_all(response.as_bytes()).unwrap();
        });
        (url, handle)
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn fetch_decodes_successful_response() {
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            SAMPLE.len(),
            SAMPLE
        );
        let (url, server) = serve_once(response);
        let data = block_on(fetch_dataset(&url)).unwrap();
        server.join().unwrap();
        assert_eq!(data.len(), 3);
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn fetch_rejects_non_success_status() {
        let response = String::from(
            "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        );
        let (url, server) = serve_once(response);
        let result = block_on(fetch_dataset(&url));
        server.join().unwrap();
        match result {
            Err(ChartError::Http(msg)) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn fetch_reports_connection_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/cyclist-data.json", listener.local_addr().unwrap());
        drop(listener);
        let result = block_on(fetch_dataset(&url));
        assert!(matches!(result, Err(ChartError::Http(_))));
    }
}
