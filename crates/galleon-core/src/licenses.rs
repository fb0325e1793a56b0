//! Licenses that uploaders can choose from.

use serde::Serialize;

/// A content license identified by its URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    pub abbreviation: String,
    pub name: String,
    pub uri: String,
}

impl License {
    fn new(abbreviation: &str, name: &str, uri: &str) -> Self {
        Self {
            abbreviation: abbreviation.to_string(),
            name: name.to_string(),
            uri: uri.to_string(),
        }
    }
}

const SORTED_LICENSES: &[(&str, &str, &str)] = &[
    ("All rights reserved", "No license specified", ""),
    (
        "CC BY 3.0",
        "Creative Commons Attribution Unported 3.0",
        "http://creativecommons.org/licenses/by/3.0/",
    ),
    (
        "CC BY-SA 3.0",
        "Creative Commons Attribution-ShareAlike Unported 3.0",
        "http://creativecommons.org/licenses/by-sa/3.0/",
    ),
    (
        "CC BY-ND 3.0",
        "Creative Commons Attribution-NoDerivs 3.0 Unported",
        "http://creativecommons.org/licenses/by-nd/3.0/",
    ),
    (
        "CC BY-NC 3.0",
        "Creative Commons Attribution-NonCommercial Unported 3.0",
        "http://creativecommons.org/licenses/by-nc/3.0/",
    ),
    (
        "CC BY-NC-SA 3.0",
        "Creative Commons Attribution-NonCommercial-ShareAlike 3.0 Unported",
        "http://creativecommons.org/licenses/by-nc-sa/3.0/",
    ),
    (
        "CC BY-NC-ND 3.0",
        "Creative Commons Attribution-NonCommercial-NoDerivs 3.0 Unported",
        "http://creativecommons.org/licenses/by-nc-nd/3.0/",
    ),
    (
        "CC0 1.0",
        "Creative Commons CC0 1.0 Universal",
        "http://creativecommons.org/publicdomain/zero/1.0/",
    ),
    (
        "Public Domain",
        "Public Domain",
        "http://creativecommons.org/publicdomain/mark/1.0/",
    ),
];

/// All supported licenses in display order.
pub fn sorted_licenses() -> Vec<License> {
    SORTED_LICENSES
        .iter()
        .map(|(abbr, name, uri)| License::new(abbr, name, uri))
        .collect()
}

/// Look up a license by URI. Unknown URIs yield a license named after the URI.
pub fn get_license_by_url(url: &str) -> License {
    SORTED_LICENSES
        .iter()
        .find(|(_, _, uri)| *uri == url)
        .map(|(abbr, name, uri)| License::new(abbr, name, uri))
        .unwrap_or_else(|| License::new(url, url, url))
}
