use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::policy::PolicyRecords;

/// `sources` values that mean "nothing to fetch".
const SOURCE_SENTINELS: [&str; 2] = ["None found", "See notes below"];

/// Curators paste URLs mid-sentence; these dangle off the end.
const TRAILING_PUNCTUATION: [char; 5] = ['.', ',', ';', ':', ')'];

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("url pattern"))
}

/// Extracts at most `max` well-formed URLs from the `sources` fields of the
/// jurisdiction's policy records.
///
/// `category` filters records (`"all"` matches everything); sentinel
/// sources are skipped entirely; trailing punctuation is stripped;
/// duplicates are dropped keeping first-seen order. This bounds the
/// fallback fetch to a small, cheap set.
pub fn select_relevant_urls(
    jurisdiction: &str,
    category: &str,
    records: &PolicyRecords,
    max: usize,
) -> Vec<String> {
    let Some(entry) = records.jurisdiction(jurisdiction) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for policy in entry
        .policies
        .iter()
        .filter(|p| category == "all" || p.category == category)
    {
        let Some(sources) = policy.sources.as_deref() else {
            continue;
        };
        if SOURCE_SENTINELS.contains(&sources.trim()) {
            continue;
        }

        for found in url_pattern().find_iter(sources) {
            let candidate = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if candidate.is_empty() || Url::parse(candidate).is_err() {
                continue;
            }
            if seen.insert(candidate.to_string()) {
                urls.push(candidate.to_string());
                if urls.len() >= max {
                    return urls;
                }
            }
        }
    }

    urls
}
