//! Location picker widgets rendered as HTML fragments.
//!
//! Every widget posts to `/location/switch` with the visitor's nonce.

use askama::Template;
use askama_web::WebTemplate;

use crate::domain::value_objects::Location;

/// One selectable location as the templates see it.
#[derive(Clone, Debug)]
pub struct LocationOption {
    pub code: &'static str,
    pub short: String,
    pub name: &'static str,
    pub flag: &'static str,
    pub currency: &'static str,
    pub symbol: &'static str,
    pub selected: bool,
}

impl LocationOption {
    fn new(location: Location, current: Location) -> Self {
        let currency = location.currency();
        Self {
            code: location.code(),
            short: location.code().to_ascii_uppercase(),
            name: location.name(),
            flag: location.flag(),
            currency: currency.code(),
            symbol: currency.symbol(),
            selected: location == current,
        }
    }
}

fn options(current: Location) -> Vec<LocationOption> {
    Location::ALL.iter().map(|&l| LocationOption::new(l, current)).collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SwitcherStyle { #[default] Dropdown, Buttons }

impl SwitcherStyle {
    /// Unknown styles fall back to the dropdown.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("buttons") => Self::Buttons,
            _ => Self::Dropdown,
        }
    }

    fn as_str(self) -> &'static str {
        match self { Self::Dropdown => "dropdown", Self::Buttons => "buttons" }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "widgets/location_switcher.html")]
pub struct LocationSwitcherTemplate {
    pub style: &'static str,
    pub dropdown: bool,
    pub show_labels: bool,
    pub show_indicator: bool,
    pub current: LocationOption,
    pub options: Vec<LocationOption>,
    pub nonce: String,
}

impl LocationSwitcherTemplate {
    pub fn new(current: Location, style: SwitcherStyle, show_labels: bool, show_indicator: bool, nonce: String) -> Self {
        Self {
            style: style.as_str(),
            dropdown: style == SwitcherStyle::Dropdown,
            show_labels,
            show_indicator,
            current: LocationOption::new(current, current),
            options: options(current),
            nonce,
        }
    }
}

/// Compact header picker.
#[derive(Template, WebTemplate)]
#[template(path = "widgets/location_dropdown.html")]
pub struct LocationDropdownTemplate {
    pub show_currency: bool,
    pub current: LocationOption,
    pub options: Vec<LocationOption>,
    pub nonce: String,
}

impl LocationDropdownTemplate {
    pub fn new(current: Location, show_currency: bool, nonce: String) -> Self {
        Self { show_currency, current: LocationOption::new(current, current), options: options(current), nonce }
    }
}

/// First-visit picker. Starts open when the visitor has no stored location.
#[derive(Template, WebTemplate)]
#[template(path = "widgets/location_modal.html")]
pub struct LocationModalTemplate {
    pub open: bool,
    pub options: Vec<LocationOption>,
    pub nonce: String,
}

impl LocationModalTemplate {
    pub fn new(current: Location, open: bool, nonce: String) -> Self {
        Self { open, options: options(current), nonce }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropdown_marks_current_location() {
        let html = LocationSwitcherTemplate::new(Location::Au, SwitcherStyle::Dropdown, true, false, "n0nce".into()).render().unwrap();
        assert!(html.contains("style-dropdown"));
        assert!(html.contains(r#"<option value="au" selected>"#));
        assert!(html.contains(r#"<option value="bd">"#));
        assert!(html.contains(r#"name="nonce" value="n0nce""#));
        assert!(!html.contains("wc-location-indicator"));
    }

    #[test]
    fn test_buttons_with_and_without_labels() {
        let html = LocationSwitcherTemplate::new(Location::Bd, SwitcherStyle::parse(Some("buttons")), true, true, String::new()).render().unwrap();
        assert!(html.contains(r#"value="bd" class="wc-location-btn active""#));
        assert!(html.contains(r#"<span class="label">Australia</span>"#));
        assert!(html.contains("Shopping from"));

        let bare = LocationSwitcherTemplate::new(Location::Bd, SwitcherStyle::Buttons, false, true, String::new()).render().unwrap();
        assert!(!bare.contains(r#"class="label""#));
    }

    #[test]
    fn test_unknown_style_is_dropdown() {
        assert_eq!(SwitcherStyle::parse(Some("carousel")), SwitcherStyle::Dropdown);
        assert_eq!(SwitcherStyle::parse(None), SwitcherStyle::Dropdown);
    }

    #[test]
    fn test_header_dropdown_currency() {
        let html = LocationDropdownTemplate::new(Location::Au, true, String::new()).render().unwrap();
        assert!(html.contains("(A$ AUD)"));
        assert!(html.contains("(৳ BDT)"));
        let plain = LocationDropdownTemplate::new(Location::Au, false, String::new()).render().unwrap();
        assert!(!plain.contains("AUD"));
        assert!(plain.contains("AU"));
    }

    #[test]
    fn test_modal_lists_both_locations() {
        let html = LocationModalTemplate::new(Location::Bd, true, String::new()).render().unwrap();
        assert!(html.contains("display: flex"));
        assert!(html.contains("Prices in BDT (৳)"));
        assert!(html.contains("Prices in AUD (A$)"));
        assert!(LocationModalTemplate::new(Location::Bd, false, String::new()).render().unwrap().contains("display: none"));
    }
}
