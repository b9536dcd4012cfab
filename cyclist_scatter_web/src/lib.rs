use leptos::*;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use cyclist_scatter::{
    build_chart, parse_dataset, Chart, ChartConfig, TooltipEvent, TooltipState,
};

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_err(value: JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, String> {
    let window = web_sys::window().ok_or("no window")?;
    let value = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(js_err)?;
    let response: Response = value.dyn_into().map_err(js_err)?;
    if !response.ok() {
        return Err(format!("{url} returned {}", response.status()));
    }
    let buf = JsFuture::from(response.array_buffer().map_err(js_err)?)
        .await
        .map_err(js_err)?;
    Ok(js_sys::Uint8Array::new(&buf).to_vec())
}

async fn load_chart(config: ChartConfig) -> Result<Chart, String> {
    let bytes = fetch_bytes(&config.dataset_url).await?;
    let dataset = parse_dataset(&bytes).map_err(|e| e.to_string())?;
    build_chart(dataset, config).map_err(|e| e.to_string())
}

/// Dataset index of the mark under the event, if the target is a mark.
fn mark_index(ev: &web_sys::MouseEvent) -> Option<usize> {
    let element = ev.target()?.dyn_into::<web_sys::Element>().ok()?;
    element.get_attribute("data-index")?.parse().ok()
}

#[component]
pub fn App() -> impl IntoView {
    let config = ChartConfig::default();
    let (status, set_status) = create_signal(String::from("Loading dataset…"));
    let (chart, set_chart) = create_signal(Option::<Chart>::None);
    let (tooltip, set_tooltip) = create_signal(TooltipState::Hidden);

    spawn_local({
        let config = config.clone();
        async move {
            match load_chart(config).await {
                Ok(loaded) => {
                    set_status.set(format!("{} ascents", loaded.dataset().len()));
                    set_chart.set(Some(loaded));
                }
                Err(err) => set_status.set(format!("Could not load dataset: {err}")),
            }
        }
    });

    // Marks are drawn from markup, so pointer events are delegated from the
    // container and routed through the tooltip state.
    let on_over = move |ev: leptos::ev::MouseEvent| {
        let Some(index) = mark_index(&ev) else {
            return;
        };
        let (x, y) = (ev.page_x() as f64, ev.page_y() as f64);
        chart.with_untracked(|loaded| {
            if let Some(event) = loaded.as_ref().and_then(|c| c.enter_event(index, x, y)) {
                set_tooltip.update(|t| t.apply(event));
            }
        });
    };
    let on_move = move |ev: leptos::ev::MouseEvent| {
        if mark_index(&ev).is_some() {
            set_tooltip.update(|t| {
                t.apply(TooltipEvent::Move {
                    page_x: ev.page_x() as f64,
                    page_y: ev.page_y() as f64,
                })
            });
        }
    };
    let on_out = move |ev: leptos::ev::MouseEvent| {
        if mark_index(&ev).is_some() {
            set_tooltip.update(|t| t.apply(TooltipEvent::Leave));
        }
    };

    let svg_markup = move || {
        chart.with(|loaded| loaded.as_ref().map(Chart::render_svg).unwrap_or_default())
    };
    let tooltip_style = move || tooltip.with(TooltipState::style);
    let tooltip_html =
        move || tooltip.with(|t| t.content().map(|c| c.html.clone()).unwrap_or_default());
    let tooltip_year =
        move || tooltip.with(|t| t.content().map(|c| c.data_year.to_string()));

    view! {
        <main id="chart">
            <h1 id="title">{config.title.clone()}</h1>
            <p id="description">{config.description.clone()}</p>
            <div
                id="container"
                on:mouseover=on_over
                on:mousemove=on_move
                on:mouseout=on_out
            >
                <div class="surface" inner_html=svg_markup></div>
                <div
                    id="tooltip"
                    class="tooltip"
                    style=tooltip_style
                    data-year=tooltip_year
                    inner_html=tooltip_html
                ></div>
            </div>
            <p class="note">{move || status.get()}</p>
            <p class="note">{format!("v{APP_VERSION}")}</p>
        </main>
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    leptos::mount_to_body(|| view! { <App/> });
}
