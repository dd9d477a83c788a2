//! Display-name derivation for workflow files.
//!
//! `0007_Send_HTTP_Request.json` becomes `Send HTTP Request`; brand names and
//! acronyms keep their canonical spelling. The exception tables are data in
//! [`NamingRules`] and can be extended through [`NamingConfig`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::config::NamingConfig;

const DEFAULT_ACRONYMS: &[&str] = &[
    "HTTP", "HTTPS", "API", "URL", "JSON", "XML", "RSS", "AI", "ML", "SQL", "PDF", "CSV", "FTP",
    "SMTP", "IMAP", "OAuth", "JWT", "REST", "SOAP", "AWS", "GCP",
];

const DEFAULT_BRANDS: &[(&str, &str)] = &[
    ("github", "GitHub"),
    ("gitlab", "GitLab"),
    ("linkedin", "LinkedIn"),
    ("youtube", "YouTube"),
    ("facebook", "Facebook"),
    ("instagram", "Instagram"),
    ("whatsapp", "WhatsApp"),
    ("telegram", "Telegram"),
    ("discord", "Discord"),
    ("slack", "Slack"),
    ("openai", "OpenAI"),
    ("anthropic", "Anthropic"),
    ("n8n", "n8n"),
];

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+[-_]").expect("static regex is valid"));

/// Acronym and brand exception tables.
#[derive(Debug, Clone)]
pub struct NamingRules {
    /// Uppercase token → canonical acronym spelling.
    acronyms: HashMap<String, String>,
    /// Lowercase token → brand spelling.
    brands: HashMap<String, String>,
}

impl Default for NamingRules {
    fn default() -> Self {
        let acronyms = DEFAULT_ACRONYMS
            .iter()
            .map(|a| (a.to_uppercase(), a.to_string()))
            .collect();
        let brands = DEFAULT_BRANDS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NamingRules { acronyms, brands }
    }
}

impl NamingRules {
    /// Built-in tables extended (and overridden) by configured entries.
    pub fn from_config(config: &NamingConfig) -> Self {
        let mut rules = NamingRules::default();
        for acronym in &config.acronyms {
            rules
                .acronyms
                .insert(acronym.to_uppercase(), acronym.clone());
        }
        for (token, display) in &config.brands {
            rules.brands.insert(token.to_lowercase(), display.clone());
        }
        rules
    }

    fn render_token(&self, token: &str) -> String {
        if let Some(acronym) = self.acronyms.get(&token.to_uppercase()) {
            return acronym.clone();
        }
        if let Some(brand) = self.brands.get(&token.to_lowercase()) {
            return brand.clone();
        }
        capitalize(token)
    }

    /// Derives a display name from a filename or title.
    ///
    /// Never returns an empty string: if cleanup leaves nothing, the stem
    /// (filename without suffix) is returned as-is.
    pub fn display_name(&self, raw: &str, suffix: &str) -> String {
        let stem = strip_suffix(raw.trim(), suffix);
        let without_number = LEADING_NUMBER.replace(stem, "");
        let spaced = without_number.replace(['_', '-'], " ");
        let name = spaced
            .split_whitespace()
            .map(|token| self.render_token(token))
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            if stem.is_empty() {
                raw.to_string()
            } else {
                stem.to_string()
            }
        } else {
            name
        }
    }
}

/// Removes a trailing `suffix`, ignoring ASCII case.
pub fn strip_suffix<'a>(raw: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() || raw.len() < suffix.len() {
        return raw;
    }
    let split = raw.len() - suffix.len();
    match (raw.get(..split), raw.get(split..)) {
        (Some(head), Some(tail)) if tail.eq_ignore_ascii_case(suffix) => head,
        _ => raw,
    }
}

/// Appends `suffix` unless `raw` already ends with it (ASCII case-insensitive).
pub fn ensure_suffix(raw: &str, suffix: &str) -> String {
    if strip_suffix(raw, suffix).len() != raw.len() {
        raw.to_string()
    } else {
        format!("{raw}{suffix}")
    }
}

fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> String {
        NamingRules::default().display_name(raw, ".json")
    }

    #[test]
    fn strips_numeric_prefix_and_keeps_acronyms() {
        assert_eq!(name("0007_Send_HTTP_Request.json"), "Send HTTP Request");
    }

    #[test]
    fn brand_names_use_canonical_spelling() {
        assert_eq!(name("linkedin_post_scheduler.json"), "LinkedIn Post Scheduler");
        assert_eq!(name("n8n-github-sync.json"), "n8n GitHub Sync");
        assert_eq!(name("openai_chat.JSON"), "OpenAI Chat");
    }

    #[test]
    fn mixed_case_acronyms_keep_their_form() {
        assert_eq!(name("oauth-token-refresh.json"), "OAuth Token Refresh");
        assert_eq!(name("ai_agent.json"), "AI Agent");
    }

    #[test]
    fn separators_and_whitespace_collapse() {
        assert_eq!(name("  daily__report--EMAIL  .json"), "Daily Report Email");
    }

    #[test]
    fn only_one_leading_number_is_removed() {
        assert_eq!(name("12-34_backup.json"), "34 Backup");
        assert_eq!(name("2024 report.json"), "2024 Report");
    }

    #[test]
    fn empty_cleanup_falls_back_to_stem() {
        assert_eq!(name("___.json"), "___");
        assert_eq!(name(".json"), ".json");
    }

    #[test]
    fn clean_names_are_fixed_points() {
        for raw in ["0007_Send_HTTP_Request.json", "linkedin_post_scheduler.json"] {
            let once = name(raw);
            assert_eq!(name(&once), once);
        }
    }

    #[test]
    fn configured_tables_extend_defaults() {
        let mut config = NamingConfig::default();
        config.acronyms.push("CRM".into());
        config.brands.insert("hubspot".into(), "HubSpot".into());
        let rules = NamingRules::from_config(&config);
        assert_eq!(rules.display_name("hubspot_crm_sync.json", ".json"), "HubSpot CRM Sync");
        assert_eq!(rules.display_name("slack_alert", ".json"), "Slack Alert");
    }

    #[test]
    fn suffix_helpers() {
        assert_eq!(strip_suffix("a.JSON", ".json"), "a");
        assert_eq!(strip_suffix("a.yaml", ".json"), "a.yaml");
        assert_eq!(ensure_suffix("flow", ".json"), "flow.json");
        assert_eq!(ensure_suffix("flow.Json", ".json"), "flow.Json");
    }
}
