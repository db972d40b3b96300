use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::{info, warn};

use super::feature_classifier::categorize_features;
use super::spec_lookup::SpecSelectors;
use super::text_utils::{
    UNKNOWN, body_style, compile_selector, derive_trim, parse_fuel_economy, seating_capacity,
    stripped_text,
};
use crate::config::PlaceholderConfig;
use crate::error::{Result, ScrapeError};
use crate::fetcher::PageRenderer;
use crate::models::{EnrichedListing, FeatureBuckets, Specification, SummaryListing};

/// Single-value spec labels read from `span` / `span.spec-item-detail` pairs.
pub const SPEC_LABELS: &[&str] = &[
    "Horsepower:",
    "Engine displacement:",
    "Torque:",
    "Fuel tank capacity:",
    "Exterior length:",
    "Exterior body width:",
    "Exterior height:",
    "Wheelbase:",
    "Curb weight:",
    "Interior maximum rear cargo volume:",
];

/// Everything read from one detail page, before it is merged with the
/// summary listing.
#[derive(Debug, Clone, Default)]
pub struct DetailPage {
    pub quick_specs: HashMap<String, String>,
    pub spec_details: HashMap<String, String>,
    pub features: FeatureBuckets,
}

impl DetailPage {
    fn quick(&self, key: &str) -> Option<&str> {
        self.quick_specs.get(key).map(String::as_str)
    }

    fn quick_or_unknown(&self, key: &str) -> String {
        self.quick(key).unwrap_or(UNKNOWN).to_string()
    }

    fn detail(&self, label: &str) -> String {
        self.spec_details
            .get(label)
            .cloned()
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

/// Compiled once per enricher and shared by every detail page it parses.
pub struct DetailSelectors {
    specs: SpecSelectors,
    li: Selector,
}

impl DetailSelectors {
    pub fn new() -> Result<Self> {
        Ok(Self {
            specs: SpecSelectors::new()?,
            li: compile_selector("li")?,
        })
    }
}

/// Parse quick specs, labelled spec details and the classified feature list.
pub fn parse_detail_page(html: &str, selectors: &DetailSelectors) -> DetailPage {
    let document = Html::parse_document(html);

    let features = document
        .select(&selectors.li)
        .map(stripped_text)
        .filter(|text| !text.is_empty());

    DetailPage {
        quick_specs: selectors.specs.quick_specs(&document),
        spec_details: SPEC_LABELS
            .iter()
            .map(|label| (label.to_string(), selectors.specs.spec_detail(&document, label)))
            .collect(),
        features: categorize_features(features),
    }
}

pub fn build_specification(
    listing: &SummaryListing,
    page: &DetailPage,
    placeholders: &PlaceholderConfig,
) -> Specification {
    let (mpg_city, mpg_highway) = parse_fuel_economy(page.quick("fuelEconomy"));
    let body_seating = page.quick("bodySeating");

    Specification {
        trim: derive_trim(&listing.make, &listing.model),
        body_style: body_style(body_seating),
        doors: placeholders.doors.clone(),
        engine: page.quick_or_unknown("engine"),
        engine_size: page.detail("Engine displacement:"),
        cylinders: placeholders.cylinders.clone(),
        valves: placeholders.valves.clone(),
        horsepower: page.detail("Horsepower:"),
        torque: page.detail("Torque:"),
        compression: placeholders.compression.clone(),
        fuel_system: placeholders.fuel_system.clone(),
        transmission: page.quick_or_unknown("transmission"),
        drivetrain: page.quick_or_unknown("drivetrain"),
        fuel_type: placeholders.fuel_type.clone(),
        fuel_capacity: page.detail("Fuel tank capacity:"),
        mpg_city,
        mpg_highway,
        emission_rating: placeholders.emission_rating.clone(),
        seating_capacity: seating_capacity(body_seating),
        cargo_capacity: page.detail("Interior maximum rear cargo volume:"),
        wheelbase: page.detail("Wheelbase:"),
        length: page.detail("Exterior length:"),
        width: page.detail("Exterior body width:"),
        height: page.detail("Exterior height:"),
        curb_weight: page.detail("Curb weight:"),
        ground_clearance: placeholders.ground_clearance.clone(),
        warranty_basic: placeholders.warranty_basic.clone(),
        warranty_powertrain: placeholders.warranty_powertrain.clone(),
        warranty_roadside: placeholders.warranty_roadside.clone(),
        build_location: placeholders.build_location.clone(),
        country_of_origin: placeholders.country_of_origin.clone(),
        safety_features: placeholders.safety_features.clone(),
        features: page.features.clone(),
    }
}

/// Visits each listing's detail page in order and merges what it finds.
pub struct DetailEnricher {
    ready_selector: String,
    placeholders: PlaceholderConfig,
    selectors: DetailSelectors,
}

impl DetailEnricher {
    pub fn new(ready_selector: impl Into<String>, placeholders: PlaceholderConfig) -> Result<Self> {
        Ok(Self {
            ready_selector: ready_selector.into(),
            placeholders,
            selectors: DetailSelectors::new()?,
        })
    }

    /// Never fails: a listing whose page cannot be loaded or parsed is kept
    /// with empty options and the error text.
    pub async fn enrich(
        &self,
        renderer: &mut PageRenderer,
        listings: &[SummaryListing],
    ) -> Vec<EnrichedListing> {
        info!("🔍 Enriching {} listings from their detail pages", listings.len());
        let mut records = Vec::with_capacity(listings.len());

        for listing in listings {
            match self.enrich_one(renderer, listing).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("⚠️ Error extracting details for car ID {}: {}", listing.id, e);
                    records.push(EnrichedListing::degraded(listing.clone(), e.to_string()));
                }
            }
        }

        let failed = records.iter().filter(|r| r.is_degraded()).count();
        info!(
            "✅ Enrichment finished: {} ok, {} degraded",
            records.len() - failed,
            failed
        );
        records
    }

    pub async fn enrich_one(
        &self,
        renderer: &mut PageRenderer,
        listing: &SummaryListing,
    ) -> Result<EnrichedListing> {
        if listing.detail_url.is_empty() {
            return Err(ScrapeError::navigation(format!(
                "car ID {} has no detail URL",
                listing.id
            )));
        }

        renderer.navigate(&listing.detail_url).await?;
        renderer.wait_for_marker(&self.ready_selector).await?;
        let document = renderer.document().await?;

        let page = parse_detail_page(&document.html, &self.selectors);
        let options = build_specification(listing, &page, &self.placeholders);

        let mut enriched = listing.clone();
        enriched.color = page.quick_or_unknown("exteriorColor");
        Ok(EnrichedListing::enriched(enriched, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::mock_driver::{MockDriver, test_settings};
    use crate::models::data_models::tests::sample_listing;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <dl>
            <dt>Exterior Color</dt><dd>Meteorite Gray Metallic</dd>
            <dt>Drivetrain</dt><dd>FWD</dd>
            <dt>Engine</dt><dd>1.5L I-4 Turbo</dd>
            <dt>Transmission</dt><dd>CVT</dd>
            <dt>Body/Seating</dt><dd>Sedan/5 seats</dd>
            <dt>Fuel Economy</dt><dd>31/38 mpg</dd>
          </dl>
          <ul class="features">
            <li>Bluetooth Hands-Free Link</li>
            <li>Heated Front Seats</li>
            <li>LED Fog Lights</li>
            <li>Adaptive Cruise Control</li>
            <li>Power Windows</li>
            <li>Moonroof</li>
            <li>   </li>
          </ul>
          <ul class="specs">
            <li><span>Horsepower:</span><span class="spec-item-detail">180hp @ 6,000RPM</span></li>
            <li><span>Curb weight:</span><span class="spec-item-detail">3,077 lbs</span></li>
          </ul>
        </body></html>
    "#;

    fn enricher() -> DetailEnricher {
        DetailEnricher::new("body", PlaceholderConfig::default()).unwrap()
    }

    fn parse(html: &str) -> DetailPage {
        parse_detail_page(html, &DetailSelectors::new().unwrap())
    }

    #[test]
    fn test_parse_detail_page() {
        let page = parse(DETAIL_PAGE);

        assert_eq!(page.quick("drivetrain"), Some("FWD"));
        assert_eq!(page.quick("interiorColor"), None);
        assert_eq!(page.detail("Horsepower:"), "180hp @ 6,000RPM");
        assert_eq!(page.detail("Wheelbase:"), "Unknown");

        // two spec rows are list items too and land in optional
        assert_eq!(page.features.total(), 8);
        assert_eq!(page.features.tech_features, vec!["Bluetooth Hands-Free Link"]);
        assert_eq!(page.features.standard_equipment, vec!["Power Windows"]);
    }

    #[test]
    fn test_build_specification_defaults_and_placeholders() {
        let page = parse(DETAIL_PAGE);
        let spec = build_specification(&sample_listing(1), &page, &PlaceholderConfig::default());

        assert_eq!(spec.trim, "Civic Sport");
        assert_eq!(spec.body_style, "Sedan");
        assert_eq!(spec.seating_capacity, "5");
        assert_eq!(spec.mpg_city, "31");
        assert_eq!(spec.mpg_highway, "38");
        assert_eq!(spec.engine, "1.5L I-4 Turbo");
        assert_eq!(spec.curb_weight, "3,077 lbs");
        assert_eq!(spec.torque, "Unknown");
        assert_eq!(spec.doors, "4");
        assert_eq!(spec.build_location, "Marysville, OH");
        assert_eq!(spec.safety_features, vec!["Lane departure", "Security system"]);
    }

    #[test]
    fn test_empty_page_yields_unknowns() {
        let page = parse("<html><body></body></html>");
        let spec = build_specification(&sample_listing(1), &page, &PlaceholderConfig::default());

        assert_eq!(spec.engine, "Unknown");
        assert_eq!(spec.body_style, "Unknown");
        assert_eq!(spec.mpg_city, "Unknown");
        assert_eq!(spec.horsepower, "Unknown");
        assert_eq!(spec.features.total(), 0);
    }

    #[tokio::test]
    async fn test_enrich_sets_color_and_keeps_identity() {
        let listing = sample_listing(1);
        let driver = MockDriver::new().route(&listing.detail_url, vec![DETAIL_PAGE]);
        let mut renderer = PageRenderer::new(Box::new(driver), test_settings());

        let records = enricher().enrich(&mut renderer, &[listing.clone()]).await;

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(!record.is_degraded());
        assert_eq!(record.listing.color, "Meteorite Gray Metallic");
        assert_eq!(record.listing.vin, listing.vin);
        assert_eq!(record.listing.id, listing.id);
        assert_eq!(record.options.as_ref().unwrap().transmission, "CVT");
    }

    #[tokio::test]
    async fn test_unreachable_detail_page_degrades_and_batch_continues() {
        let first = sample_listing(1);
        let mut second = sample_listing(2);
        second.detail_url = "https://example.com/new/Honda/2024-Honda-Accord.htm".to_string();
        second.vin = "1HGCY2F50RA000002".to_string();

        let driver = MockDriver::new()
            .failing(&first.detail_url)
            .route(&second.detail_url, vec![DETAIL_PAGE]);
        let log = driver.log();
        let mut renderer = PageRenderer::new(Box::new(driver), test_settings());

        let records = enricher().enrich(&mut renderer, &[first.clone(), second]).await;

        assert_eq!(records.len(), 2);
        let degraded = &records[0];
        assert!(degraded.is_degraded());
        assert!(degraded.options.is_none());
        assert!(!degraded.error.as_deref().unwrap().is_empty());
        assert_eq!(degraded.listing, first);

        assert!(!records[1].is_degraded());
        assert_eq!(log.lock().unwrap().visited.len(), 2);
    }

    #[tokio::test]
    async fn test_listing_without_detail_url_degrades() {
        let mut listing = sample_listing(7);
        listing.detail_url.clear();
        let driver = MockDriver::new();
        let log = driver.log();
        let mut renderer = PageRenderer::new(Box::new(driver), test_settings());

        let records = enricher().enrich(&mut renderer, &[listing]).await;

        assert!(records[0].is_degraded());
        assert!(records[0].error.as_deref().unwrap().contains("no detail URL"));
        assert!(log.lock().unwrap().visited.is_empty());
    }

    #[tokio::test]
    async fn test_missing_ready_marker_degrades_listing() {
        let first = sample_listing(1);
        let mut second = sample_listing(2);
        second.detail_url = "https://example.com/new/Honda/2024-Honda-Accord.htm".to_string();
        let ready_page = DETAIL_PAGE.replace("<body>", r#"<body><div class="vdp"></div>"#);

        let driver = MockDriver::new()
            .route(&first.detail_url, vec![DETAIL_PAGE])
            .route(&second.detail_url, vec![&ready_page]);
        let mut renderer = PageRenderer::new(Box::new(driver), test_settings());
        let enricher = DetailEnricher::new("div.vdp", PlaceholderConfig::default()).unwrap();

        let records = enricher.enrich(&mut renderer, &[first, second]).await;

        assert!(records[0].is_degraded());
        let error = records[0].error.as_deref().unwrap();
        assert!(error.contains("div.vdp"), "unexpected error: {}", error);
        assert!(!records[1].is_degraded());
        assert_eq!(records[1].listing.color, "Meteorite Gray Metallic");
    }

    #[test]
    fn test_shared_selectors_parse_successive_pages() {
        let selectors = DetailSelectors::new().unwrap();
        let other = DETAIL_PAGE.replace("FWD", "AWD");

        let first = parse_detail_page(DETAIL_PAGE, &selectors);
        let second = parse_detail_page(&other, &selectors);

        assert_eq!(first.quick("drivetrain"), Some("FWD"));
        assert_eq!(second.quick("drivetrain"), Some("AWD"));
        assert_eq!(second.features.total(), first.features.total());
    }
}
