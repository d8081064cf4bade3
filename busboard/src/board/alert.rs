//! Announcement alert matching
//!
//! Announcements are free text ("West campus bus delayed"), route names
//! are codes and place names ("West-JT"). Both sides are normalized the
//! same way and an announcement alerts the user when it contains their
//! normalized route name.

/// Short shuttle/company codes that appear in route names but never in
/// announcements.
pub static DEFAULT_STRIP_CODES: [&str; 4] = ["jt", "ac", "lc", "pw"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicy {
    strip: Vec<String>,
}

impl Default for AlertPolicy {
    fn default() -> AlertPolicy {
        AlertPolicy::new(DEFAULT_STRIP_CODES.iter().map(|c| c.to_string()))
    }
}

impl AlertPolicy {
    pub fn new<I: IntoIterator<Item = String>>(codes: I) -> AlertPolicy {
        AlertPolicy {
            strip: codes
                .into_iter()
                .map(|c| c.to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// Lower-case, drop whitespace, drop every strip code, drop hyphens.
    pub fn normalize(&self, text: &str) -> String {
        let mut out: String = text
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        for code in &self.strip {
            out = out.replace(code.as_str(), "");
        }
        out.replace('-', "")
    }

    /// An empty normalized route name never matches.
    pub fn matches(&self, announcement: &str, route_name: &str) -> bool {
        let route = self.normalize(route_name);
        !route.is_empty() && self.normalize(announcement).contains(&route)
    }
}
