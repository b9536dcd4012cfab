//! Marks, captions, legend, and assembly of the full SVG document.

use serde::Serialize;

use crate::axis::{x_axis, x_grid, y_axis, y_grid};
use crate::scale::ChartScales;
use crate::svg::{px, Element};
use crate::tooltip::TooltipContent;
use crate::{Category, ChartConfig, Dataset};

pub const LEGEND_WIDTH: f64 = 220.0;
pub const LEGEND_HEIGHT: f64 = 60.0;
const LEGEND_SWATCH: f64 = 10.0;
pub const NO_ALLEGATIONS_LABEL: &str = "No doping allegations";
pub const ALLEGATIONS_LABEL: &str = "Recorded doping allegations";

/// One plotted point. `year`/`seconds` are the raw record values, `cx`/`cy`
/// the pixel position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mark {
    pub index: usize,
    pub year: i32,
    pub seconds: u32,
    pub cx: f64,
    pub cy: f64,
    pub category: Category,
}

pub fn layout_marks(dataset: &Dataset, scales: &ChartScales) -> Vec<Mark> {
    dataset
        .records()
        .iter()
        .enumerate()
        .map(|(index, record)| Mark {
            index,
            year: record.year,
            seconds: record.seconds,
            cx: scales.x.apply(record.year),
            cy: scales.y.apply(record.seconds),
            category: record.category(),
        })
        .collect()
}

/// Circles for every mark, carrying the data attributes hover handlers and
/// external probes read.
pub fn draw_marks(marks: &[Mark], dataset: &Dataset, radius: f64) -> Vec<Element> {
    marks
        .iter()
        .zip(dataset.records())
        .map(|(mark, record)| {
            let tooltip = TooltipContent::for_record(record);
            Element::new("circle")
                .attr("class", "dot")
                .attr("data-index", mark.index)
                .attr("data-xvalue", mark.year)
                .attr("data-yvalue", mark.seconds)
                .attr("data-tooltip", tooltip.html)
                .attr("data-background", tooltip.background)
                .attr("cx", px(mark.cx))
                .attr("cy", px(mark.cy))
                .attr("r", px(radius))
                .attr("fill", mark.category.mark_fill())
                .attr("stroke", "black")
                .attr("stroke-width", 1)
        })
        .collect()
}

fn caption_style() -> &'static str {
    "text-anchor: middle; font-weight: bold; font-size: 0.8rem;"
}

pub fn x_label(config: &ChartConfig) -> Element {
    let layout = &config.layout;
    Element::new("text")
        .attr("id", "x-label")
        .attr("style", caption_style())
        .attr(
            "transform",
            format!(
                "translate({},{})",
                px(layout.width / 2.0),
                px(layout.height - layout.margin / 4.0)
            ),
        )
        .text(config.x_caption.clone())
}

pub fn y_label(config: &ChartConfig) -> Element {
    let layout = &config.layout;
    Element::new("text")
        .attr("id", "y-label")
        .attr("style", caption_style())
        .attr("transform", "rotate(-90)")
        .attr("x", px(-layout.height / 2.0))
        .attr("y", px(layout.margin - layout.margin / 1.3))
        .text(config.y_caption.clone())
}

/// Static two-entry color key in the upper right of the plot.
pub fn legend(config: &ChartConfig) -> Element {
    let layout = &config.layout;
    let left = layout.width - layout.margin - LEGEND_WIDTH;
    let top = layout.margin;
    let entries = [
        (Category::NoAllegation, NO_ALLEGATIONS_LABEL, 45.0, 35.0),
        (Category::Allegation, ALLEGATIONS_LABEL, 25.0, 15.0),
    ];

    let mut group = Element::new("g").attr("class", "legend").child(
        Element::new("rect")
            .attr("id", "legend")
            .attr("width", px(LEGEND_WIDTH))
            .attr("height", px(LEGEND_HEIGHT))
            .attr("transform", format!("translate({},{})", px(left), px(top)))
            .attr("fill", "white")
            .attr("stroke", "black"),
    );
    for (category, label, swatch_rise, text_rise) in entries {
        group = group
            .child(
                Element::new("rect")
                    .attr("class", "legend-icon")
                    .attr("width", px(LEGEND_SWATCH))
                    .attr("height", px(LEGEND_SWATCH))
                    .attr("fill", category.legend_fill())
                    .attr(
                        "transform",
                        format!(
                            "translate({},{})",
                            px(left + 15.0),
                            px(top + LEGEND_HEIGHT - swatch_rise)
                        ),
                    ),
            )
            .child(
                Element::new("text")
                    .attr("class", "legend-text")
                    .attr("font-family", "Roboto")
                    .attr(
                        "transform",
                        format!(
                            "translate({},{})",
                            px(left + 35.0),
                            px(top + LEGEND_HEIGHT - text_rise)
                        ),
                    )
                    .text(label),
            );
    }
    group
}

/// The whole drawing surface, in paint order: marks, axes with captions,
/// gridlines, legend.
pub fn render_svg(
    dataset: &Dataset,
    marks: &[Mark],
    scales: &ChartScales,
    config: &ChartConfig,
) -> Element {
    let layout = &config.layout;
    Element::new("svg")
        .attr("xmlns", "http://www.w3.org/2000/svg")
        .attr("width", px(layout.width))
        .attr("height", px(layout.height))
        .children(draw_marks(marks, dataset, layout.mark_radius))
        .child(x_axis(scales, config))
        .child(x_label(config))
        .child(y_axis(scales, config))
        .child(y_label(config))
        .child(y_grid(scales, config))
        .child(x_grid(scales, config))
        .child(legend(config))
}
