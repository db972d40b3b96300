pub mod detail_enricher;
pub mod feature_classifier;
pub mod listing_extractor;
pub mod llm_normalizer;
pub mod spec_lookup;
pub mod text_utils;

pub use detail_enricher::{
    DetailEnricher, DetailPage, DetailSelectors, build_specification, parse_detail_page,
};
pub use feature_classifier::{FEATURE_RULES, FeatureBucket, categorize_features, classify_feature};
pub use listing_extractor::{CardFields, ListingCrawl, ListingExtractor, ListingPage};
pub use llm_normalizer::{TextNormalizer, chunk_html, to_normalized};
pub use spec_lookup::{QUICK_SPECS, SpecSelectors, label_adjacent_text};
