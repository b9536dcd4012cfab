//! Hover tooltip shared by all marks.
//!
//! One overlay, two states. Pointer events are folded into the state with
//! [`TooltipState::apply`]; nothing else mutates it.

use serde::{Deserialize, Serialize};

use crate::svg::escape_text;
use crate::{Category, RaceRecord};

/// Pixel offset of the overlay from the pointer, right of and above it.
pub const TOOLTIP_OFFSET_X: f64 = 20.0;
pub const TOOLTIP_OFFSET_Y: f64 = -20.0;
pub const NO_ALLEGATIONS_TEXT: &str = "No Doping Allegations";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TooltipContent {
    /// Inner HTML; record fields are escaped.
    pub html: String,
    pub background: String,
    /// Raw year of the hovered record.
    pub data_year: i32,
}

impl TooltipContent {
    pub fn for_record(record: &RaceRecord) -> Self {
        let category = record.category();
        let note = if category == Category::Allegation {
            escape_text(&record.doping)
        } else {
            NO_ALLEGATIONS_TEXT.to_string()
        };
        let html = format!(
            "{}: {}<br>Year: {}, Time: {}<br><br>{}",
            escape_text(&record.name),
            escape_text(&record.nationality),
            record.year,
            escape_text(&record.time),
            note
        );
        Self {
            html,
            background: category.tooltip_background().to_string(),
            data_year: record.year,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TooltipPosition {
    pub left: f64,
    pub top: f64,
}

impl TooltipPosition {
    /// Overlay position for a pointer at page coordinates.
    pub fn near_pointer(page_x: f64, page_y: f64) -> Self {
        Self {
            left: page_x + TOOLTIP_OFFSET_X,
            top: page_y + TOOLTIP_OFFSET_Y,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TooltipEvent<'a> {
    Enter {
        record: &'a RaceRecord,
        page_x: f64,
        page_y: f64,
    },
    Move {
        page_x: f64,
        page_y: f64,
    },
    Leave,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum TooltipState {
    #[default]
    Hidden,
    Visible {
        content: TooltipContent,
        position: TooltipPosition,
    },
}

impl TooltipState {
    pub fn is_visible(&self) -> bool {
        matches!(self, TooltipState::Visible { .. })
    }

    pub fn content(&self) -> Option<&TooltipContent> {
        match self {
            TooltipState::Visible { content, .. } => Some(content),
            TooltipState::Hidden => None,
        }
    }

    /// Fold one pointer event into the state.
    pub fn apply(&mut self, event: TooltipEvent<'_>) {
        match event {
            TooltipEvent::Enter {
                record,
                page_x,
                page_y,
            } => {
                *self = TooltipState::Visible {
                    content: TooltipContent::for_record(record),
                    position: TooltipPosition::near_pointer(page_x, page_y),
                };
            }
            TooltipEvent::Move { page_x, page_y } => {
                if let TooltipState::Visible { position, .. } = self {
                    *position = TooltipPosition::near_pointer(page_x, page_y);
                }
            }
            TooltipEvent::Leave => *self = TooltipState::Hidden,
        }
    }

    /// Inline CSS for the overlay element.
    pub fn style(&self) -> String {
        let base = "position: absolute; z-index: 10;";
        match self {
            TooltipState::Hidden => format!("{base} visibility: hidden;"),
            TooltipState::Visible { content, position } => format!(
                "{base} visibility: visible; background: {}; left: {}px; top: {}px;",
                content.background, position.left, position.top
            ),
        }
    }
}
