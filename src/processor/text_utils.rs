use scraper::{ElementRef, Selector};

use crate::error::{Result, ScrapeError};

pub const UNKNOWN: &str = "Unknown";

/// Year, make and model split out of a card title such as
/// `"2024 Honda Civic Sport"`.
#[derive(Debug, Clone, PartialEq)]
pub struct TitleParts {
    pub year: i32,
    pub make: String,
    pub model: String,
}

pub fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::parse(format!("invalid selector `{}`: {:?}", css, e)))
}

/// Concatenate the element's text nodes, each trimmed, with no separator.
pub fn stripped_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn strip_label(text: &str, label: &str) -> String {
    text.replace(label, "").trim().to_string()
}

/// `"$32,450"` -> `32450.0`. Currency symbols, thousands separators and
/// whitespace are dropped; negative or non-numeric values are rejected.
pub fn parse_price(text: &str) -> Result<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',') && !c.is_whitespace())
        .collect();

    let price: f64 = cleaned
        .parse()
        .map_err(|_| ScrapeError::parse(format!("price is not numeric: {:?}", text)))?;

    if !price.is_finite() || price < 0.0 {
        return Err(ScrapeError::parse(format!("invalid price value: {}", text)));
    }
    Ok(price)
}

pub fn parse_title(title: &str) -> Result<TitleParts> {
    let tokens: Vec<&str> = title.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ScrapeError::parse(format!(
            "title needs year, make and model: {:?}",
            title
        )));
    }

    let year = tokens[0]
        .parse::<i32>()
        .map_err(|_| ScrapeError::parse(format!("title year is not a number: {:?}", tokens[0])))?;

    Ok(TitleParts {
        year,
        make: tokens[1].to_string(),
        model: tokens[2..].join(" "),
    })
}

/// `"24/32 mpg"` -> `("24", "32")`. Without a `/` both sides are unknown.
pub fn parse_fuel_economy(text: Option<&str>) -> (String, String) {
    match text.and_then(|t| t.split_once('/')) {
        Some((city, rest)) => {
            let highway = rest.split('/').next().unwrap_or(rest);
            (first_token(city), first_token(highway))
        }
        None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
    }
}

/// Model text with the make removed, e.g. make `Honda`, model
/// `Honda Civic Sport` -> `Civic Sport`.
pub fn derive_trim(make: &str, model: &str) -> String {
    if make.is_empty() {
        return model.trim().to_string();
    }
    model.replace(make, "").trim().to_string()
}

/// `"Sedan/5 seats"` -> `"Sedan"`
pub fn body_style(body_seating: Option<&str>) -> String {
    let text = body_seating.unwrap_or(UNKNOWN);
    text.split('/').next().unwrap_or(text).to_string()
}

/// `"Sedan/5 seats"` -> `"5"`
pub fn seating_capacity(body_seating: Option<&str>) -> String {
    let text = body_seating.unwrap_or(UNKNOWN);
    text.rsplit('/').next().map(first_token).unwrap_or_else(|| UNKNOWN.to_string())
}

fn first_token(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or(UNKNOWN)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_price_parsing() {
        assert_eq!(parse_price("$32,450").unwrap(), 32450.0);
        assert_eq!(parse_price(" $1,024.99 ").unwrap(), 1024.99);
        assert_eq!(parse_price("27000").unwrap(), 27000.0);

        assert!(parse_price("Call for price").is_err());
        assert!(parse_price("").is_err());
        assert!(parse_price("-$5").is_err());
    }

    #[test]
    fn test_title_parsing() {
        let parts = parse_title("2024 Honda Civic Sport").unwrap();
        assert_eq!(parts.year, 2024);
        assert_eq!(parts.make, "Honda");
        assert_eq!(parts.model, "Civic Sport");

        let parts = parse_title("  2025   Honda  CR-V  EX-L AWD ").unwrap();
        assert_eq!(parts.model, "CR-V EX-L AWD");

        assert!(parse_title("New Honda Civic").is_err());
        assert!(parse_title("2024 Honda").is_err());
    }

    #[test]
    fn test_label_stripping() {
        assert_eq!(strip_label("VIN1HGCV1F34JA123456", "VIN"), "1HGCV1F34JA123456");
        assert_eq!(strip_label("Stock # H12345 ", "Stock #"), "H12345");
    }

    #[test]
    fn test_stripped_text_joins_without_separator() {
        let html = Html::parse_fragment(r#"<li class="vin"><span> VIN </span>
            1HGCV1F34JA123456 </li>"#);
        let selector = compile_selector("li.vin").unwrap();
        let li = html.select(&selector).next().unwrap();
        assert_eq!(stripped_text(li), "VIN1HGCV1F34JA123456");
    }

    #[test]
    fn test_fuel_economy_parsing() {
        assert_eq!(parse_fuel_economy(Some("24/32 mpg")), ("24".to_string(), "32".to_string()));
        assert_eq!(
            parse_fuel_economy(Some("30 City / 37 Hwy")),
            ("30".to_string(), "37".to_string())
        );
        assert_eq!(parse_fuel_economy(Some("32 mpg")), ("Unknown".to_string(), "Unknown".to_string()));
        assert_eq!(parse_fuel_economy(None), ("Unknown".to_string(), "Unknown".to_string()));
        assert_eq!(parse_fuel_economy(Some("/")), ("Unknown".to_string(), "Unknown".to_string()));
    }

    #[test]
    fn test_trim_and_body_seating() {
        assert_eq!(derive_trim("Honda", "Civic Sport"), "Civic Sport");
        assert_eq!(derive_trim("Honda", "Honda Civic Sport"), "Civic Sport");

        assert_eq!(body_style(Some("Sedan/5 seats")), "Sedan");
        assert_eq!(seating_capacity(Some("Sedan/5 seats")), "5");
        assert_eq!(body_style(None), "Unknown");
        assert_eq!(seating_capacity(None), "Unknown");
        assert_eq!(seating_capacity(Some("SUV/")), "Unknown");
    }

    #[test]
    fn test_invalid_selector_is_parse_failure() {
        assert!(matches!(compile_selector("li[["), Err(ScrapeError::ParseFailure(_))));
    }
}
