use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use url::Url;

use super::text_utils::{UNKNOWN, compile_selector, parse_price, parse_title, strip_label, stripped_text};
use crate::config::{SelectorConfig, SiteConfig};
use crate::error::{Result, ScrapeError};
use crate::fetcher::PageRenderer;
use crate::models::{Condition, SummaryListing};

/// Fields read from one listing card, before an identifier is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFields {
    pub year: i32,
    pub make: String,
    pub model: String,
    pub price: f64,
    pub vin: String,
    pub stock_number: String,
    pub detail_url: String,
}

/// Outcome of parsing one card: `Ok(None)` means the card had no title and
/// is ignored.
pub type CardOutcome = Result<Option<CardFields>>;

/// Everything parsed from one rendered inventory page.
#[derive(Debug)]
pub struct ListingPage {
    pub card_ids: Vec<String>,
    pub cards: Vec<(String, CardOutcome)>,
}

/// Listings from a paginated crawl and the number of pages they came from.
#[derive(Debug)]
pub struct ListingCrawl {
    pub listings: Vec<SummaryListing>,
    pub pages: usize,
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    link: Selector,
    vin: Selector,
    stock: Selector,
    price: Selector,
}

impl CardSelectors {
    fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            card: compile_selector(&config.card)?,
            title: compile_selector(&config.title)?,
            link: compile_selector(&config.detail_link)?,
            vin: compile_selector(&config.vin)?,
            stock: compile_selector(&config.stock_number)?,
            price: compile_selector(&config.price)?,
        })
    }
}

/// Walks every inventory page, following the "next" control until it is
/// absent, disabled, fails, or the page repeats cards already seen.
pub struct ListingExtractor {
    selectors: SelectorConfig,
    compiled: CardSelectors,
    base_url: Option<Url>,
    condition: Condition,
}

impl ListingExtractor {
    pub fn new(site: &SiteConfig, selectors: &SelectorConfig) -> Result<Self> {
        let base_url = match Url::parse(&site.base_url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Base URL {:?} is not absolute ({}); detail links will be empty", site.base_url, e);
                None
            }
        };

        Ok(Self {
            selectors: selectors.clone(),
            compiled: CardSelectors::compile(selectors)?,
            base_url,
            condition: site.condition,
        })
    }

    pub async fn extract_all_listings(
        &self,
        renderer: &mut PageRenderer,
        start_url: &str,
    ) -> Result<Vec<SummaryListing>> {
        let crawl = self.crawl_pages(renderer, start_url).await?;
        info!(
            "✅ Collected {} listings across {} pages",
            crawl.listings.len(),
            crawl.pages
        );
        Ok(crawl.listings)
    }

    /// Paginated crawl. `pages` counts only pages whose cards were accepted.
    pub async fn crawl_pages(&self, renderer: &mut PageRenderer, start_url: &str) -> Result<ListingCrawl> {
        info!("🔍 Starting to scrape car listings from {}", start_url);

        renderer.navigate(start_url).await?;
        renderer.wait_for_marker(&self.selectors.grid_ready).await?;
        renderer.scroll_to_bottom().await?;

        let mut listings = Vec::new();
        let mut next_id: u32 = 1;
        let mut pages = 0;
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut previous_ids: Option<HashSet<String>> = None;

        loop {
            let page = pages + 1;
            let document = match renderer.document().await {
                Ok(doc) => doc,
                Err(e) if page > 1 => {
                    warn!("Could not read page {}, ending crawl: {}", page, e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let parsed = self.parse_listing_page(&document.html);
            info!("📄 Found {} cars on page {}", parsed.card_ids.len(), page);

            let page_ids: HashSet<String> = parsed.card_ids.iter().cloned().collect();
            if is_repeated_page(&page_ids, &seen_ids, previous_ids.as_ref()) {
                warn!("⚠️ Page {} repeats cards already seen; treating it as the last page", page);
                break;
            }
            pages = page;

            for (card_id, outcome) in parsed.cards {
                match outcome {
                    Ok(Some(fields)) => {
                        debug!(
                            "Processing car ID: {} {} {} {} {}",
                            next_id, fields.year, fields.make, fields.model, fields.vin
                        );
                        listings.push(self.to_listing(next_id, fields));
                        next_id += 1;
                    }
                    Ok(None) => debug!("Card {} has no title, skipping", card_id),
                    Err(e) => warn!("Error processing car ID {} (card {}): {}", next_id, card_id, e),
                }
            }

            let advanced = self.advance(renderer, &page_ids).await;
            seen_ids.extend(page_ids.iter().cloned());
            previous_ids = Some(page_ids);

            match advanced {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!("⚠️ Error clicking Next, ending crawl: {}", e);
                    break;
                }
            }
        }

        Ok(ListingCrawl { listings, pages })
    }

    /// Returns `Ok(false)` when there is no further page.
    async fn advance(&self, renderer: &mut PageRenderer, current_ids: &HashSet<String>) -> Result<bool> {
        let next = match renderer.find_element(&self.selectors.next_page).await? {
            Some(next) => next,
            None => {
                info!("No Next button found, likely the last page");
                return Ok(false);
            }
        };

        if next.has_class(&self.selectors.disabled_class) {
            info!("🛑 Next button is disabled. Stopping.");
            return Ok(false);
        }

        info!("Clicking next page: {}", next.href.as_deref().unwrap_or("<no href>"));
        renderer.click(&self.selectors.next_page).await?;
        renderer.wait_for_marker(&self.selectors.grid_ready).await?;
        self.wait_for_new_cards(renderer, current_ids).await?;
        renderer.scroll_to_bottom().await?;
        Ok(true)
    }

    /// The grid marker survives a click, so poll until the card set differs
    /// from the page just read. A grid that never changes is left to the
    /// repeat check.
    async fn wait_for_new_cards(&self, renderer: &mut PageRenderer, current_ids: &HashSet<String>) -> Result<()> {
        let timeout = renderer.settings().ready_timeout;
        let poll = renderer.settings().poll_interval;
        let deadline = Instant::now() + timeout;

        loop {
            let document = renderer.document().await?;
            let ids: HashSet<String> = self
                .parse_listing_page(&document.html)
                .card_ids
                .into_iter()
                .collect();
            if &ids != current_ids {
                return Ok(());
            }
            if Instant::now() >= deadline {
                debug!("Grid still shows the previous cards after {:?}", timeout);
                return Ok(());
            }
            sleep(poll).await;
        }
    }

    /// Parse every non-placeholder card bearing an identifier attribute.
    pub fn parse_listing_page(&self, html: &str) -> ListingPage {
        let document = Html::parse_document(html);
        let mut card_ids = Vec::new();
        let mut cards = Vec::new();

        for card in document.select(&self.compiled.card) {
            let Some(card_id) = card
                .value()
                .attr(&self.selectors.card_id_attr)
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                continue;
            };
            if card.value().classes().any(|c| c == self.selectors.placeholder_class) {
                continue;
            }

            card_ids.push(card_id.to_string());
            cards.push((card_id.to_string(), self.parse_card(card)));
        }

        ListingPage { card_ids, cards }
    }

    fn parse_card(&self, card: ElementRef) -> CardOutcome {
        let Some(title_el) = card.select(&self.compiled.title).next() else {
            return Ok(None);
        };
        let title = parse_title(&stripped_text(title_el))?;

        let href = card
            .select(&self.compiled.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| ScrapeError::parse("card has no detail link"))?;

        let vin = card
            .select(&self.compiled.vin)
            .next()
            .map(|el| strip_label(&stripped_text(el), &self.selectors.vin_label))
            .ok_or_else(|| ScrapeError::parse("card has no VIN element"))?;

        let stock_number = card
            .select(&self.compiled.stock)
            .next()
            .map(|el| strip_label(&stripped_text(el), &self.selectors.stock_label))
            .ok_or_else(|| ScrapeError::parse("card has no stock number element"))?;

        let price = match card.select(&self.compiled.price).next() {
            Some(el) => parse_price(&stripped_text(el))?,
            None => 0.0,
        };

        Ok(Some(CardFields {
            year: title.year,
            make: title.make,
            model: title.model,
            price,
            vin,
            stock_number,
            detail_url: self.resolve_detail_url(href),
        }))
    }

    /// Root-relative links are made absolute; anything else becomes empty.
    fn resolve_detail_url(&self, href: &str) -> String {
        let href = href.trim();
        if !href.starts_with('/') || href.starts_with("//") {
            return String::new();
        }
        self.base_url
            .as_ref()
            .and_then(|base| base.join(href).ok())
            .map(String::from)
            .unwrap_or_default()
    }

    fn to_listing(&self, id: u32, fields: CardFields) -> SummaryListing {
        SummaryListing {
            id,
            make: fields.make,
            model: fields.model,
            year: fields.year,
            price: fields.price,
            mileage: 0,
            color: UNKNOWN.to_string(),
            vin: fields.vin,
            stock_number: fields.stock_number,
            condition: self.condition,
            detail_url: fields.detail_url,
        }
    }
}

/// A page is terminal when its card set equals the previous page's, or when
/// it is non-empty and contains no card not already seen.
fn is_repeated_page(
    page_ids: &HashSet<String>,
    seen_ids: &HashSet<String>,
    previous_ids: Option<&HashSet<String>>,
) -> bool {
    if previous_ids == Some(page_ids) {
        return true;
    }
    !page_ids.is_empty() && page_ids.is_subset(seen_ids)
}
