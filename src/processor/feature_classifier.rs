use crate::models::FeatureBuckets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureBucket {
    Technology,
    Interior,
    Exterior,
    Performance,
    Standard,
    Optional,
}

/// Ordered keyword table. The first bucket with a keyword contained in the
/// lowercased feature text wins; text matching none lands in `Optional`.
pub const FEATURE_RULES: &[(FeatureBucket, &[&str])] = &[
    (FeatureBucket::Technology, &["bluetooth", "radio", "connect", "infotain"]),
    (FeatureBucket::Interior, &["seat", "climate", "mirror", "temperature"]),
    (FeatureBucket::Exterior, &["headlight", "fog", "grille", "tail"]),
    (FeatureBucket::Performance, &["suspension", "steering", "cruise", "handling"]),
    (FeatureBucket::Standard, &["window", "door", "lock", "brake", "alarm"]),
];

pub fn classify_feature(feature: &str) -> FeatureBucket {
    let lower = feature.to_lowercase();
    FEATURE_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(bucket, _)| *bucket)
        .unwrap_or(FeatureBucket::Optional)
}

pub fn categorize_features<I, S>(features: I) -> FeatureBuckets
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut buckets = FeatureBuckets::default();
    for feature in features {
        let feature = feature.into();
        let target = match classify_feature(&feature) {
            FeatureBucket::Technology => &mut buckets.tech_features,
            FeatureBucket::Interior => &mut buckets.interior_features,
            FeatureBucket::Exterior => &mut buckets.exterior_features,
            FeatureBucket::Performance => &mut buckets.performance_features,
            FeatureBucket::Standard => &mut buckets.standard_equipment,
            FeatureBucket::Optional => &mut buckets.optional_equipment,
        };
        target.push(feature);
    }
    buckets
}
