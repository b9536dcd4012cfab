//! Standalone HTML page: static scaffold, the SVG, and the hover overlay.

use crate::svg::escape_text;
use crate::tooltip::{TooltipState, TOOLTIP_OFFSET_X, TOOLTIP_OFFSET_Y};
use crate::Chart;

const PAGE_STYLE: &str = r#"
      body { font-family: Roboto, -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0; background: #f4f4f4; }
      #chart { display: flex; flex-direction: column; align-items: center; padding: 2rem 0; }
      #title { margin: 0 0 0.25rem; text-align: center; }
      #description { margin: 0 0 1rem; color: #444; }
      #container { background: white; box-shadow: 0 2px 8px rgba(0, 0, 0, 0.15); }
      .tooltip { padding: 0.5rem; border: 1px solid black; border-radius: 4px; font-size: 0.8rem; pointer-events: none; }
"#;

/// Mirrors [`TooltipState::apply`] for a browser without the wasm front-end.
fn hover_script() -> String {
    format!(
        r##"
      (function () {{
        var tip = document.getElementById("tooltip");
        document.querySelectorAll("#container .dot").forEach(function (dot) {{
          dot.addEventListener("mouseover", function (event) {{
            tip.innerHTML = dot.getAttribute("data-tooltip");
            tip.setAttribute("data-year", dot.getAttribute("data-xvalue"));
            tip.style.background = dot.getAttribute("data-background");
            tip.style.left = (event.pageX + {dx}) + "px";
            tip.style.top = (event.pageY - {rise}) + "px";
            tip.style.visibility = "visible";
          }});
          dot.addEventListener("mousemove", function (event) {{
            tip.style.left = (event.pageX + {dx}) + "px";
            tip.style.top = (event.pageY - {rise}) + "px";
          }});
          dot.addEventListener("mouseout", function () {{
            tip.style.visibility = "hidden";
          }});
        }});
      }})();
"##,
        dx = TOOLTIP_OFFSET_X,
        rise = -TOOLTIP_OFFSET_Y
    )
}

/// Render the complete HTML document for a built chart.
pub fn render_page(chart: &Chart) -> String {
    let config = chart.config();
    let svg = chart.svg().render();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{style}</style>
  </head>
  <body>
    <div id="chart">
      <h1 id="title">{title}</h1>
      <p id="description">{description}</p>
      <div id="container">
{svg}        <div id="tooltip" class="tooltip" style="{tooltip_style}"></div>
      </div>
    </div>
    <script>{script}</script>
  </body>
</html>
"#,
        title = escape_text(&config.title),
        description = escape_text(&config.description),
        style = PAGE_STYLE,
        svg = svg,
        tooltip_style = TooltipState::Hidden.style(),
        script = hover_script(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_chart, ChartConfig, Dataset, RaceRecord};

    fn chart() -> Chart {
        let dataset = Dataset::new(vec![RaceRecord {
            year: 2015,
            time: "39:00".into(),
            seconds: 2340,
            name: "A".into(),
            nationality: "FR".into(),
            doping: String::new(),
            url: String::new(),
        }])
        .unwrap();
        build_chart(dataset, ChartConfig::default()).unwrap()
    }

    #[test]
    fn page_has_scaffold_and_hidden_tooltip() {
        let html = render_page(&chart());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1 id=\"title\">Doping in Professional Bicycle Racing</h1>"));
        assert!(html.contains("<p id=\"description\">35 Fastest times up Alpe d'Huez (1994-2015)</p>"));
        assert!(html.contains("id=\"tooltip\""));
        assert!(html.contains("visibility: hidden"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn hover_script_uses_pointer_offsets() {
        let script = hover_script();
        assert!(script.contains("event.pageX + 20"));
        assert!(script.contains("event.pageY - 20"));
    }

    #[test]
    fn page_embeds_full_hover_script() {
        let html = render_page(&chart());
        assert!(html.contains(r##"document.querySelectorAll("#container .dot")"##));
        assert!(html.contains("tip.style.visibility = \"hidden\";"));
        assert!(html.trim_end().ends_with("</html>"));
    }
}
