use chrono::{Local, NaiveDate};
use tracing::info;
use url::form_urlencoded;

use crate::matching::score;
use crate::models::{Digest, DigestEntry, Job, Preferences};
use crate::store::{DigestArchive, Storage};

pub const DIGEST_SIZE: usize = 10;

/// Today's date key in the local time zone.
pub fn today_key() -> NaiveDate {
    Local::now().date_naive()
}

pub fn parse_date_key(value: &str) -> chrono::ParseResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
}

/// Ranks the whole catalog: score descending, then most recent, then catalog
/// order. Not filtered by the minimum match score.
pub fn generate(catalog: &[Job], prefs: &Preferences, date: NaiveDate) -> Digest {
    let mut ranked: Vec<DigestEntry> = catalog
        .iter()
        .map(|job| DigestEntry {
            job: job.clone(),
            match_score: score(job, prefs),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.match_score
            .cmp(&a.match_score)
            .then(a.job.posted_days_ago.cmp(&b.job.posted_days_ago))
    });
    ranked.truncate(DIGEST_SIZE);

    Digest { date, jobs: ranked }
}

/// Persisted digests, one per date.
pub struct DigestStore<'a> {
    storage: &'a mut Storage,
}

impl<'a> DigestStore<'a> {
    pub fn new(storage: &'a mut Storage) -> Self {
        Self { storage }
    }

    pub fn lookup(&mut self, date: NaiveDate) -> Option<Digest> {
        let key = date.format("%Y-%m-%d").to_string();
        self.storage.load::<DigestArchive>().0.remove(&key)
    }

    /// Returns the stored digest for `date`, generating and saving one if
    /// none exists. The flag is true when the stored digest was reused.
    pub fn get_or_generate(
        &mut self,
        catalog: &[Job],
        prefs: &Preferences,
        date: NaiveDate,
    ) -> (Digest, bool) {
        if let Some(existing) = self.lookup(date) {
            return (existing, true);
        }
        (self.regenerate(catalog, prefs, date), false)
    }

    /// Generates and replaces whatever is stored for `date`.
    pub fn regenerate(&mut self, catalog: &[Job], prefs: &Preferences, date: NaiveDate) -> Digest {
        let digest = generate(catalog, prefs, date);
        let mut archive: DigestArchive = self.storage.load();
        archive.0.insert(digest.date_key(), digest.clone());
        self.storage.save(&archive);
        info!(date = %digest.date_key(), jobs = digest.jobs.len(), "digest generated");
        digest
    }

    /// Stored date keys, oldest first.
    pub fn dates(&mut self) -> Vec<String> {
        self.storage.load::<DigestArchive>().0.into_keys().collect()
    }
}

/// Plain-text rendering for copying or emailing.
pub fn to_clipboard_text(digest: &Digest) -> String {
    let mut text = String::new();

    text.push_str("Top 10 Jobs For You - 9AM Digest\n");
    text.push_str(&format!("Date: {}\n\n", digest.date_key()));

    if digest.jobs.is_empty() {
        text.push_str("No matching roles today. Check again tomorrow.\n\n");
    }

    for (i, entry) in digest.jobs.iter().enumerate() {
        let job = &entry.job;
        text.push_str(&format!("{}. {} at {}\n", i + 1, job.title, job.company));
        text.push_str(&format!(
            "   Location: {} | Experience: {} | Posted: {}\n",
            job.location,
            job.experience,
            job.posted_label()
        ));
        text.push_str(&format!("   Match Score: {}%\n", entry.match_score));
        if !job.apply_url.is_empty() {
            text.push_str(&format!("   Apply: {}\n", job.apply_url));
        }
        text.push('\n');
    }

    text.push_str("This digest was generated based on your preferences.\n");
    text
}

/// Mail-compose link carrying the clipboard text as the body.
pub fn mailto_link(digest: &Digest, recipient: Option<&str>) -> String {
    let subject = format!("My 9AM Job Digest - {}", digest.date_key());
    format!(
        "mailto:{}?subject={}&body={}",
        recipient.map(str::trim).unwrap_or(""),
        encode_component(&subject),
        encode_component(&to_clipboard_text(digest))
    )
}

fn encode_component(value: &str) -> String {
    // form encoding writes spaces as '+' and escapes literal '+' as %2B
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::matching::tests::job;
    use crate::models::Experience;

    fn date(s: &str) -> NaiveDate {
        parse_date_key(s).unwrap()
    }

    /// Even-numbered jobs have "Rust" in the title; older jobs further down.
    fn ranked_catalog(count: usize) -> Vec<Job> {
        (0..count)
            .map(|i| Job {
                title: if i % 2 == 0 { "Rust Engineer".into() } else { "Engineer".into() },
                source: if i % 3 == 0 { "LinkedIn".into() } else { "Naukri".into() },
                posted_days_ago: (i as u32) * 2,
                ..job(&format!("job-{:02}", i))
            })
            .collect()
    }

    fn prefs_for_ranking() -> Preferences {
        Preferences {
            role_keywords: vec!["rust".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_keeps_top_ten_sorted() {
        let catalog = ranked_catalog(15);
        let digest = generate(&catalog, &prefs_for_ranking(), date("2026-03-01"));
        assert_eq!(digest.jobs.len(), 10);
        for pair in digest.jobs.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
            if pair[0].match_score == pair[1].match_score {
                assert!(pair[0].job.posted_days_ago <= pair[1].job.posted_days_ago);
            }
        }
        assert_eq!(digest.jobs[0].job.id, "job-00");
    }

    #[test]
    fn test_generate_ranks_best_match_first() {
        let catalog: Vec<Job> = (0..15u8)
            .map(|i| Job {
                skills: vec![format!("skill-{}", i)],
                ..job(&format!("s{}", i))
            })
            .collect();
        let prefs = Preferences {
            skills: vec!["skill-3".into()],
            experience_level: Some(Experience::ThreeToFive),
            ..Default::default()
        };
        let digest = generate(&catalog, &prefs, date("2026-03-01"));
        assert_eq!(digest.jobs.len(), 10);
        assert_eq!(digest.jobs[0].job.id, "s3");
        assert_eq!(digest.jobs[0].match_score, 25);
        assert!(digest.jobs[1..].iter().all(|e| e.match_score == 10));
    }

    #[test]
    fn test_generate_small_catalog_not_padded() {
        let digest = generate(&ranked_catalog(3), &prefs_for_ranking(), date("2026-03-01"));
        assert_eq!(digest.jobs.len(), 3);

        let empty = generate(&[], &prefs_for_ranking(), date("2026-03-01"));
        assert!(empty.jobs.is_empty());
    }

    #[test]
    fn test_generate_ignores_min_match_score() {
        let prefs = Preferences {
            min_match_score: 100,
            ..Default::default()
        };
        let digest = generate(&ranked_catalog(4), &prefs, date("2026-03-01"));
        assert_eq!(digest.jobs.len(), 4);
    }

    #[test]
    fn test_generate_is_deterministic() {
        let catalog = ranked_catalog(12);
        let a = generate(&catalog, &prefs_for_ranking(), date("2026-03-01"));
        let b = generate(&catalog, &prefs_for_ranking(), date("2026-03-01"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_lookup_after_generate_round_trips_through_sqlite() {
        let mut storage = Storage::new(Box::new(Database::open_in_memory().unwrap()));
        let catalog = ranked_catalog(5);
        let day = date("2026-03-01");

        let generated = DigestStore::new(&mut storage).regenerate(&catalog, &prefs_for_ranking(), day);

        let mut store = DigestStore::new(&mut storage);
        assert_eq!(store.lookup(day), Some(generated));
        assert_eq!(store.lookup(date("2026-03-02")), None);
    }

    #[test]
    fn test_get_or_generate_reuses_cached_digest() {
        let mut storage = Storage::in_memory();
        let mut store = DigestStore::new(&mut storage);
        let day = date("2026-03-01");

        let (first, cached) = store.get_or_generate(&ranked_catalog(5), &prefs_for_ranking(), day);
        assert!(!cached);

        let (second, cached) = store.get_or_generate(&ranked_catalog(12), &Preferences::default(), day);
        assert!(cached);
        assert_eq!(first, second);
    }

    #[test]
    fn test_regenerate_replaces_existing() {
        let mut storage = Storage::in_memory();
        let mut store = DigestStore::new(&mut storage);
        let day = date("2026-03-01");

        store.get_or_generate(&ranked_catalog(5), &prefs_for_ranking(), day);
        let replaced = store.regenerate(&ranked_catalog(2), &prefs_for_ranking(), day);
        assert_eq!(store.lookup(day), Some(replaced));
        assert_eq!(store.dates(), vec!["2026-03-01"]);
    }

    #[test]
    fn test_dates_sorted() {
        let mut storage = Storage::in_memory();
        let mut store = DigestStore::new(&mut storage);
        store.regenerate(&[], &Preferences::default(), date("2026-03-02"));
        store.regenerate(&[], &Preferences::default(), date("2026-02-27"));
        assert_eq!(store.dates(), vec!["2026-02-27", "2026-03-02"]);
    }

    #[test]
    fn test_clipboard_text_contents() {
        let digest = generate(&ranked_catalog(2), &prefs_for_ranking(), date("2026-03-01"));
        let text = to_clipboard_text(&digest);

        assert!(text.starts_with("Top 10 Jobs For You"));
        assert!(text.contains("Date: 2026-03-01"));
        assert!(text.contains("1. Rust Engineer at Initech"));
        assert!(text.contains("Location: Pune | Experience: 3-5 | Posted: Today"));
        assert!(text.contains("2. Engineer at Initech"));
        assert!(text.contains("Posted: 2 days ago"));
        assert!(text.contains("Match Score: 35%"));
        assert!(text.trim_end().ends_with("based on your preferences."));
        assert_eq!(text, to_clipboard_text(&digest));
    }

    #[test]
    fn test_clipboard_text_empty_digest() {
        let digest = generate(&[], &Preferences::default(), date("2026-03-01"));
        assert!(to_clipboard_text(&digest).contains("No matching roles today"));
    }

    #[test]
    fn test_mailto_link_encoding() {
        let digest = generate(&ranked_catalog(1), &prefs_for_ranking(), date("2026-03-01"));
        let link = mailto_link(&digest, Some("me@example.com"));
        assert!(link.starts_with("mailto:me@example.com?subject=My%209AM%20Job%20Digest%20-%202026-03-01&body="));
        assert!(!link.contains(' '));
        assert!(!link.contains('\n'));
        assert!(link.contains("%0A"));

        let anonymous = mailto_link(&digest, None);
        assert!(anonymous.starts_with("mailto:?subject="));
    }

    #[test]
    fn test_parse_date_key() {
        assert!(parse_date_key("2026-03-01").is_ok());
        assert!(parse_date_key("03/01/2026").is_err());
    }
}
