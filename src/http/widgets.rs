//! Widget fragment endpoints.

use axum::extract::{Query, State};
use serde::Deserialize;

use crate::widgets::{LocationDropdownTemplate, LocationModalTemplate, LocationSwitcherTemplate, SwitcherStyle};

use super::{AppState, Shopper};

/// Accepts the shortcode spellings: `true`, `1`, `yes`.
fn flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        None => default,
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SwitcherParams { pub style: Option<String>, pub show_labels: Option<String> }

pub async fn switcher(State(state): State<AppState>, shopper: Shopper, Query(p): Query<SwitcherParams>) -> LocationSwitcherTemplate {
    let nonce = state.shop().switch_nonce(shopper.session()).await;
    LocationSwitcherTemplate::new(
        shopper.location(),
        SwitcherStyle::parse(p.style.as_deref()),
        flag(p.show_labels.as_deref(), true),
        state.shop().settings().show_indicator,
        nonce,
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct DropdownParams { pub show_currency: Option<String> }

pub async fn dropdown(State(state): State<AppState>, shopper: Shopper, Query(p): Query<DropdownParams>) -> LocationDropdownTemplate {
    let nonce = state.shop().switch_nonce(shopper.session()).await;
    LocationDropdownTemplate::new(shopper.location(), flag(p.show_currency.as_deref(), false), nonce)
}

pub async fn modal(State(state): State<AppState>, shopper: Shopper) -> LocationModalTemplate {
    let nonce = state.shop().switch_nonce(shopper.session()).await;
    LocationModalTemplate::new(shopper.location(), shopper.ctx.needs_prompt(), nonce)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_parsing() {
        assert!(flag(Some("Yes"), false));
        assert!(!flag(Some("0"), true));
        assert!(flag(None, true));
    }
}
