//! Axes and gridlines derived from the chart scales.

use crate::scale::{format_mm_ss, format_year, ChartScales};
use crate::svg::{px, Element};
use crate::ChartConfig;

/// Length of the outward tick marks on labelled axes.
pub const TICK_SIZE: f64 = 6.0;
/// Gap between a tick mark and its label.
const TICK_PADDING: f64 = 3.0;
pub const GRID_OPACITY: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orient {
    Bottom,
    Left,
}

#[derive(Clone, Debug)]
pub struct Tick {
    /// Pixel offset along the axis.
    pub offset: f64,
    pub label: String,
}

#[derive(Clone, Debug)]
pub struct Axis {
    pub orient: Orient,
    pub ticks: Vec<Tick>,
    /// Signed tick length; negative values point into the plot.
    pub tick_size: f64,
    pub range: (f64, f64),
    pub show_domain: bool,
}

impl Axis {
    pub fn x(scales: &ChartScales, every_years: u32) -> Self {
        let ticks = scales
            .x
            .ticks(every_years)
            .into_iter()
            .map(|year| Tick {
                offset: scales.x.apply(year),
                label: format_year(year),
            })
            .collect();
        Self {
            orient: Orient::Bottom,
            ticks,
            tick_size: TICK_SIZE,
            range: scales.x.range(),
            show_domain: true,
        }
    }

    pub fn y(scales: &ChartScales, every_seconds: u32) -> Self {
        let ticks = scales
            .y
            .ticks(every_seconds)
            .into_iter()
            .map(|secs| Tick {
                offset: scales.y.apply(secs),
                label: format_mm_ss(secs),
            })
            .collect();
        Self {
            orient: Orient::Left,
            ticks,
            tick_size: TICK_SIZE,
            range: scales.y.range(),
            show_domain: true,
        }
    }

    /// Same tick positions, labels hidden, ticks stretched across `span`.
    pub fn into_grid(mut self, span: f64) -> Self {
        for tick in &mut self.ticks {
            tick.label.clear();
        }
        self.tick_size = -span;
        self.show_domain = false;
        self
    }

    pub fn render(&self) -> Element {
        let (anchor, ticks): (&str, Vec<Element>) = match self.orient {
            Orient::Bottom => ("middle", self.ticks.iter().map(|t| self.bottom_tick(t)).collect()),
            Orient::Left => ("end", self.ticks.iter().map(|t| self.left_tick(t)).collect()),
        };
        let mut group = Element::new("g")
            .attr("fill", "none")
            .attr("font-size", 10)
            .attr("font-family", "sans-serif")
            .attr("text-anchor", anchor);
        if self.show_domain {
            group = group.child(
                Element::new("path")
                    .attr("class", "domain")
                    .attr("stroke", "currentColor")
                    .attr("d", self.domain_path()),
            );
        }
        group.children(ticks)
    }

    fn domain_path(&self) -> String {
        let (r0, r1) = self.range;
        let outer = px(self.tick_size);
        match self.orient {
            Orient::Bottom => format!("M{},{}V0H{}V{}", px(r0), outer, px(r1), outer),
            Orient::Left => format!("M-{},{}H0V{}H-{}", outer, px(r0), px(r1), outer),
        }
    }

    fn bottom_tick(&self, tick: &Tick) -> Element {
        let mut g = Element::new("g")
            .attr("class", "tick")
            .attr("transform", format!("translate({},0)", px(tick.offset)))
            .child(
                Element::new("line")
                    .attr("stroke", "currentColor")
                    .attr("y2", px(self.tick_size)),
            );
        if !tick.label.is_empty() {
            g = g.child(
                Element::new("text")
                    .attr("fill", "currentColor")
                    .attr("y", px(self.tick_size.max(0.0) + TICK_PADDING))
                    .attr("dy", "0.71em")
                    .text(tick.label.clone()),
            );
        }
        g
    }

    fn left_tick(&self, tick: &Tick) -> Element {
        let mut g = Element::new("g")
            .attr("class", "tick")
            .attr("transform", format!("translate(0,{})", px(tick.offset)))
            .child(
                Element::new("line")
                    .attr("stroke", "currentColor")
                    .attr("x2", px(-self.tick_size)),
            );
        if !tick.label.is_empty() {
            g = g.child(
                Element::new("text")
                    .attr("fill", "currentColor")
                    .attr("x", px(-(self.tick_size.max(0.0) + TICK_PADDING)))
                    .attr("dy", "0.32em")
                    .text(tick.label.clone()),
            );
        }
        g
    }
}

/// Bottom axis group, anchored on the lower plot edge.
pub fn x_axis(scales: &ChartScales, config: &ChartConfig) -> Element {
    let layout = &config.layout;
    Axis::x(scales, config.x_tick_years)
        .render()
        .attr("id", "x-axis")
        .attr(
            "transform",
            format!("translate(0,{})", px(layout.height - layout.margin)),
        )
}

/// Left axis group, anchored on the left plot edge.
pub fn y_axis(scales: &ChartScales, config: &ChartConfig) -> Element {
    Axis::y(scales, config.y_tick_seconds)
        .render()
        .attr("id", "y-axis")
        .attr("transform", format!("translate({},0)", px(config.layout.margin)))
}

/// Vertical gridlines, one per year.
pub fn x_grid(scales: &ChartScales, config: &ChartConfig) -> Element {
    let layout = &config.layout;
    Axis::x(scales, config.x_grid_years)
        .into_grid(layout.plot_height())
        .render()
        .attr("class", "grid")
        .attr(
            "transform",
            format!("translate(0,{})", px(layout.height - layout.margin)),
        )
        .attr("opacity", GRID_OPACITY)
}

/// Horizontal gridlines on the Y tick positions.
pub fn y_grid(scales: &ChartScales, config: &ChartConfig) -> Element {
    let layout = &config.layout;
    Axis::y(scales, config.y_tick_seconds)
        .into_grid(layout.plot_width())
        .render()
        .attr("class", "grid")
        .attr("transform", format!("translate({},0)", px(layout.margin)))
        .attr("opacity", GRID_OPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{DurationScale, YearScale};

    fn scales() -> ChartScales {
        ChartScales {
            x: YearScale::new(1994, 2015, (50.0, 800.0)).unwrap(),
            y: DurationScale::new(2210, 2407, (50.0, 450.0)).unwrap(),
        }
    }

    #[test]
    fn x_axis_labels_every_two_years() {
        let axis = x_axis(&scales(), &ChartConfig::default());
        assert_eq!(axis.get_attr("transform"), Some("translate(0,450)"));
        let labels: Vec<String> = axis
            .find_by_class("tick")
            .iter()
            .map(|t| t.text_content())
            .collect();
        assert_eq!(labels.first().map(String::as_str), Some("1994"));
        assert_eq!(labels.get(1).map(String::as_str), Some("1996"));
        assert_eq!(labels.len(), 12);
    }

    #[test]
    fn y_axis_labels_are_mm_ss() {
        let axis = y_axis(&scales(), &ChartConfig::default());
        let ticks = axis.find_by_class("tick");
        assert!(!ticks.is_empty());
        for tick in ticks {
            let label = tick.text_content();
            let (mm, ss) = label.split_once(':').expect("colon separated");
            assert_eq!(mm.len(), 2);
            assert_eq!(ss.len(), 2);
            assert!(mm.chars().chain(ss.chars()).all(|c| c.is_ascii_digit()));
            assert_eq!(ss.parse::<u32>().unwrap() % 15, 0);
        }
    }

    #[test]
    fn grids_span_the_plot_without_labels() {
        let config = ChartConfig::default();
        let x = x_grid(&scales(), &config);
        let y = y_grid(&scales(), &config);
        assert_eq!(x.get_attr("opacity"), Some("0.2"));
        assert_eq!(x.find_by_class("tick").len(), 23);
        assert!(x.find_by_class("domain").is_empty());
        assert!(x.descendants().iter().all(|e| e.tag() != "text"));
        let line = x.descendants().into_iter().find(|e| e.tag() == "line").unwrap();
        assert_eq!(line.get_attr("y2"), Some("-400"));
        let line = y.descendants().into_iter().find(|e| e.tag() == "line").unwrap();
        assert_eq!(line.get_attr("x2"), Some("750"));
    }

    #[test]
    fn domain_path_follows_range() {
        let axis = Axis::x(&scales(), 2);
        assert_eq!(axis.domain_path(), "M50,6V0H800V6");
        let axis = Axis::y(&scales(), 15);
        assert_eq!(axis.domain_path(), "M-6,50H0V450H-6");
    }
}
