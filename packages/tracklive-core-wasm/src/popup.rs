use geo_types::Coord;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::models::Feature;
use crate::module_state::ModuleState;

/// Fixed DOM id of the popup content element.
pub const POPUP_CONTENT_ID: &str = "popup-content";
/// Fixed DOM id of the popup close control.
pub const POPUP_CLOSER_ID: &str = "popup-closer";

/// Block title for features picked on the route layer.
pub const TITLE_ROUTE: &str = "Planning";
/// Block title for features picked on the trace layer.
pub const TITLE_TRACE: &str = "Checkin";

// One formatted entry in the popup, derived from a picked feature's
// attributes. Absent attributes simply omit their line.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentBlock {
    pub title: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub message: Option<String>,
}

impl ContentBlock {
    pub fn from_feature(title: &str, feature: &Feature) -> Self {
        ContentBlock {
            title: title.to_string(),
            date: feature.attribute("date"),
            time: feature.attribute("time"),
            message: feature.attribute("message"),
        }
    }

    /// Render the block. A lone time still gets the "Date:" label, matching
    /// the wire format's loose date/time split.
    pub fn to_html(&self) -> String {
        let bold = |text: &str| format!("<span class=\"bold\">{}</span>", text);

        let mut lines: Vec<String> = Vec::new();
        match (&self.date, &self.time) {
            (Some(date), Some(time)) => lines.push(format!("{} {} {}", bold("Date:"), date, time)),
            (Some(date), None) => lines.push(format!("{} {}", bold("Date:"), date)),
            (None, Some(time)) => lines.push(format!("{} {}", bold("Date:"), time)),
            (None, None) => {}
        }
        if let Some(message) = &self.message {
            lines.push(format!("{} {}", bold("Message:"), message));
        }

        format!("<h3>{}</h3>{}<br>\n", self.title, lines.join("<br>\n"))
    }
}

// At most one popup is visible at any time. Every transition recomputes the
// full content list; nothing is appended across a Closed boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum PopupState {
    Closed,
    Open {
        anchor: Coord<f64>,
        blocks: Vec<ContentBlock>,
    },
}

impl PopupState {
    /// Map single-click transition. A click that picked features opens (or
    /// re-opens) the popup at the click coordinate with exactly those
    /// blocks; a click that picked nothing closes it.
    pub fn on_click(&mut self, anchor: Coord<f64>, blocks: Vec<ContentBlock>) {
        *self = if blocks.is_empty() {
            PopupState::Closed
        } else {
            PopupState::Open { anchor, blocks }
        };
    }

    /// Close-control transition.
    pub fn on_closer(&mut self) {
        *self = PopupState::Closed;
    }

    pub fn anchor(&self) -> Option<Coord<f64>> {
        match self {
            PopupState::Closed => None,
            PopupState::Open { anchor, .. } => Some(*anchor),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, PopupState::Open { .. })
    }

    /// The complete popup content. Closed renders as the empty string.
    pub fn content_html(&self) -> String {
        match self {
            PopupState::Closed => String::new(),
            PopupState::Open { blocks, .. } => {
                blocks.iter().map(ContentBlock::to_html).collect()
            }
        }
    }
}

// A hit-test result from the rendering library. The picking order of `hits`
// is whatever the library reports for the click pixel; it is not guaranteed
// stable across releases and is passed through as-is.
#[derive(Deserialize)]
pub struct PickedFeature {
    pub layer: String,
    pub feature: Feature,
}

fn blocks_from_hits(hits: &[PickedFeature]) -> Vec<ContentBlock> {
    hits.iter()
        .filter_map(|hit| {
            let title = match hit.layer.as_str() {
                "route" => TITLE_ROUTE,
                "trace" => TITLE_TRACE,
                // Hits on anything but the two feed layers are not pickable
                _ => return None,
            };
            Some(ContentBlock::from_feature(title, &hit.feature))
        })
        .collect()
}

/// Map single-click handler. `hits` is the renderer's feature-at-pixel list
/// for the click, in its own picking order.
#[wasm_bindgen]
pub fn handle_map_click(x: f64, y: f64, hits: JsValue) -> Result<(), JsValue> {
    let hits: Vec<PickedFeature> = serde_wasm_bindgen::from_value(hits)?;
    let blocks = blocks_from_hits(&hits);
    ModuleState::with_mut(|state| state.popup.on_click(Coord { x, y }, blocks));
    sync_popup_dom()
}

/// Wire the popup close control. On activation the popup closes and the
/// control releases input focus.
pub fn wire_popup_closer() -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let closer: HtmlElement = document
        .get_element_by_id(POPUP_CLOSER_ID)
        .ok_or_else(|| JsValue::from_str("popup closer element missing"))?
        .dyn_into()
        .map_err(|_| JsValue::from_str("popup closer is not an html element"))?;

    let closer_for_blur = closer.clone();
    let onclick = Closure::<dyn FnMut()>::new(move || {
        ModuleState::with_mut(|state| state.popup.on_closer());
        let _ = sync_popup_dom();
        closer_for_blur.blur().ok();
    });
    closer.set_onclick(Some(onclick.as_ref().unchecked_ref()));
    // Lives for the page, like the connection callbacks
    onclick.forget();
    Ok(())
}

// Push the current popup state into the DOM and the overlay. The content
// element is always rewritten wholesale from the computed block list.
fn sync_popup_dom() -> Result<(), JsValue> {
    let (anchor, html) = ModuleState::with(|state| (state.popup.anchor(), state.popup.content_html()));

    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let content = document
        .get_element_by_id(POPUP_CONTENT_ID)
        .ok_or_else(|| JsValue::from_str("popup content element missing"))?;
    content.set_inner_html(&html);

    match anchor {
        Some(coord) => crate::set_overlay_position(coord.x, coord.y, true),
        None => crate::set_overlay_position(0.0, 0.0, false),
    }
    Ok(())
}
