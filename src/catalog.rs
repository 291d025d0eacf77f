use regex::Regex;
use reqwest::Url;

use crate::domain::{AuthorityName, CatalogEntry};
use crate::error::DatapointsError;

const NAME_PATTERN: &str = r#"govuk-!-width-four-fifths">\s*(.*?)\s*</"#;
const LINK_PATTERN: &str = r#"<a\s[^>]*?href="([^"]+?\.zip)""#;

/// Extracts the authority catalog from the INSPIRE download page.
///
/// Names and archive links are paired by position. A page that lists names
/// without links yields name-only entries; a page where the two counts differ
/// is rejected rather than zipped into misaligned pairs.
pub fn parse_listing(html: &str, listing_url: &str) -> Result<Vec<CatalogEntry>, DatapointsError> {
    let names = extract_matches(html, &compile(NAME_PATTERN)?);
    if names.is_empty() {
        return Err(DatapointsError::CatalogUnavailable(
            "no authority names found on the download page".to_string(),
        ));
    }
    let links = extract_matches(html, &compile(LINK_PATTERN)?);

    if links.is_empty() {
        return names
            .iter()
            .map(|name| Ok(CatalogEntry::named(name.parse::<AuthorityName>()?)))
            .collect();
    }

    if links.len() != names.len() {
        return Err(DatapointsError::CatalogMismatch {
            names: names.len(),
            links: links.len(),
        });
    }

    let base = Url::parse(listing_url)
        .map_err(|err| DatapointsError::CatalogUnavailable(format!("{listing_url}: {err}")))?;
    names
        .iter()
        .zip(&links)
        .map(|(name, link)| {
            let url = base
                .join(link)
                .map_err(|err| DatapointsError::CatalogUnavailable(format!("{link}: {err}")))?;
            Ok(CatalogEntry {
                name: name.parse()?,
                source_url: Some(url.to_string()),
            })
        })
        .collect()
}

fn compile(pattern: &str) -> Result<Regex, DatapointsError> {
    Regex::new(pattern).map_err(|err| DatapointsError::CatalogUnavailable(err.to_string()))
}

fn extract_matches(text: &str, regex: &Regex) -> Vec<String> {
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .collect()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_entities() {
        assert_eq!(decode_entities("King&#39;s Lynn &amp; West"), "King's Lynn & West");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }
}
