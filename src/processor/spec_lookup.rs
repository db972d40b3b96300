use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

use super::text_utils::{UNKNOWN, compile_selector, stripped_text};
use crate::error::Result;

/// Quick-spec keys and the `dt` label text each is read from.
pub const QUICK_SPECS: &[(&str, &str)] = &[
    ("exteriorColor", "Exterior Color"),
    ("interiorColor", "Interior Color"),
    ("drivetrain", "Drivetrain"),
    ("engine", "Engine"),
    ("bodySeating", "Body/Seating"),
    ("vin", "VIN"),
    ("stockNumber", "Stock Number"),
    ("fuelEconomy", "Fuel Economy"),
    ("transmission", "Transmission"),
];

/// Text of the first `sibling` element that follows a `label` element whose
/// text matches `label_text`.
///
/// Labels whose text equals `label_text` are preferred; a label that merely
/// contains it is used only when no exact label has a matching sibling.
pub fn label_adjacent_text(
    document: &Html,
    label: &Selector,
    label_text: &str,
    sibling: &Selector,
) -> Option<String> {
    let labels: Vec<(ElementRef, String)> = document
        .select(label)
        .map(|el| (el, stripped_text(el)))
        .filter(|(_, text)| text.contains(label_text))
        .collect();

    let exact = labels.iter().filter(|(_, text)| text == label_text);
    let partial = labels.iter().filter(|(_, text)| text != label_text);

    exact
        .chain(partial)
        .find_map(|(el, _)| next_matching_sibling(*el, sibling))
        .map(stripped_text)
}

fn next_matching_sibling<'a>(element: ElementRef<'a>, sibling: &Selector) -> Option<ElementRef<'a>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|candidate| sibling.matches(candidate))
}

/// Selectors for the two labelled layouts found on detail pages.
pub struct SpecSelectors {
    dt: Selector,
    dd: Selector,
    span: Selector,
    spec_detail: Selector,
}

impl SpecSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dt: compile_selector("dt")?,
            dd: compile_selector("dd")?,
            span: compile_selector("span")?,
            spec_detail: compile_selector("span.spec-item-detail")?,
        })
    }

    /// `dt`/`dd` quick-spec table. Missing labels are simply absent.
    pub fn quick_specs(&self, document: &Html) -> HashMap<String, String> {
        QUICK_SPECS
            .iter()
            .filter_map(|(key, label)| {
                label_adjacent_text(document, &self.dt, label, &self.dd)
                    .map(|value| (key.to_string(), value))
            })
            .collect()
    }

    /// `<span>Label:</span><span class="spec-item-detail">value</span>`,
    /// `"Unknown"` when absent.
    pub fn spec_detail(&self, document: &Html, label: &str) -> String {
        label_adjacent_text(document, &self.span, label, &self.spec_detail)
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_FIXTURE: &str = r#"
        <html><body>
          <dl class="quick-specs">
            <dt>Exterior Color</dt><dd>Platinum White Pearl</dd>
            <dt>Engine</dt><dd> 2.0L I-4 </dd>
            <dt>Engine Notes</dt><dd>Should not win</dd>
            <dt>Body/Seating</dt><dd>Sedan/5 seats</dd>
            <dt>Fuel Economy</dt><dd>30/37 mpg</dd>
            <dt>Transmission</dt>
          </dl>
          <ul class="specs">
            <li><span>Horsepower:</span><span class="spec-item-detail">158hp @ 6,500RPM</span></li>
            <li><span>Torque:</span><span class="other">noise</span><span class="spec-item-detail">138 lb-ft</span></li>
            <li><span>Wheelbase:</span></li>
          </ul>
        </body></html>
    "#;

    #[test]
    fn test_quick_specs_read_next_dd() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        let specs = SpecSelectors::new().unwrap().quick_specs(&doc);

        assert_eq!(specs["exteriorColor"], "Platinum White Pearl");
        assert_eq!(specs["engine"], "2.0L I-4");
        assert_eq!(specs["bodySeating"], "Sedan/5 seats");
        assert_eq!(specs["fuelEconomy"], "30/37 mpg");
        assert!(!specs.contains_key("interiorColor"));
        assert!(!specs.contains_key("drivetrain"));
    }

    #[test]
    fn test_label_without_sibling_is_absent() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        let specs = SpecSelectors::new().unwrap().quick_specs(&doc);
        assert!(!specs.contains_key("transmission"));
    }

    #[test]
    fn test_spec_detail_skips_non_matching_siblings() {
        let doc = Html::parse_document(DETAIL_FIXTURE);
        let selectors = SpecSelectors::new().unwrap();

        assert_eq!(selectors.spec_detail(&doc, "Horsepower:"), "158hp @ 6,500RPM");
        assert_eq!(selectors.spec_detail(&doc, "Torque:"), "138 lb-ft");
        assert_eq!(selectors.spec_detail(&doc, "Wheelbase:"), "Unknown");
        assert_eq!(selectors.spec_detail(&doc, "Curb weight:"), "Unknown");
    }

    #[test]
    fn test_exact_label_preferred_over_partial() {
        let doc = Html::parse_fragment(
            r#"<dl><dt>Engine displacement</dt><dd>2.0 L</dd><dt>Engine</dt><dd>I-4</dd></dl>"#,
        );
        let dt = compile_selector("dt").unwrap();
        let dd = compile_selector("dd").unwrap();

        assert_eq!(label_adjacent_text(&doc, &dt, "Engine", &dd).as_deref(), Some("I-4"));
        assert_eq!(
            label_adjacent_text(&doc, &dt, "displacement", &dd).as_deref(),
            Some("2.0 L")
        );
    }
}
