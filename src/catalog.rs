use anyhow::{Context, Result, anyhow};
use std::collections::HashSet;
use std::path::Path;
use strsim::jaro_winkler;

use crate::models::Job;

const BUNDLED_CATALOG: &str = include_str!("../data/jobs.json");

/// Loads the job catalog from `path`, or the bundled sample catalog.
pub fn load(path: Option<&Path>) -> Result<Vec<Job>> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
            parse(&raw).with_context(|| format!("Invalid catalog: {}", path.display()))
        }
        None => parse(BUNDLED_CATALOG).context("Invalid bundled catalog"),
    }
}

pub fn parse(raw: &str) -> Result<Vec<Job>> {
    let jobs: Vec<Job> = serde_json::from_str(raw).context("Failed to parse catalog JSON")?;
    let mut seen = HashSet::new();
    for job in &jobs {
        if !seen.insert(job.id.as_str()) {
            return Err(anyhow!("Duplicate job id '{}' in catalog", job.id));
        }
    }
    Ok(jobs)
}

pub fn find<'a>(catalog: &'a [Job], id: &str) -> Option<&'a Job> {
    catalog.iter().find(|job| job.id == id)
}

/// Closest known id to `id`, for "did you mean" hints.
pub fn closest_id<'a>(catalog: &'a [Job], id: &str) -> Option<&'a str> {
    catalog
        .iter()
        .map(|job| (job.id.as_str(), jaro_winkler(&job.id, id)))
        .filter(|(_, similarity)| *similarity >= 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::tests::job;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = load(None).unwrap();
        assert!(catalog.len() >= 15);
        assert!(find(&catalog, "jt-001").is_some());
    }

    #[test]
    fn test_parse_rejects_duplicate_ids() {
        let raw = r#"[
            {"id": "a", "title": "T", "company": "C", "location": "L", "mode": "Remote",
             "experience": "5+", "source": "Indeed", "postedDaysAgo": 1},
            {"id": "a", "title": "T2", "company": "C", "location": "L", "mode": "Onsite",
             "experience": "5+", "source": "Indeed", "postedDaysAgo": 2}
        ]"#;
        let err = parse(raw).unwrap_err();
        assert!(err.to_string().contains("Duplicate job id 'a'"));
    }

    #[test]
    fn test_parse_rejects_unknown_mode() {
        let raw = r#"[{"id": "a", "title": "T", "company": "C", "location": "L",
            "mode": "Spaceship", "experience": "5+", "source": "Indeed", "postedDaysAgo": 1}]"#;
        assert!(parse(raw).is_err());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = load(Some(Path::new("/nonexistent/jobs.json")));
        assert!(result.is_err());
    }

    #[test]
    fn test_closest_id() {
        let catalog = vec![job("react-engineer"), job("data-analyst")];
        assert_eq!(closest_id(&catalog, "react-enginer"), Some("react-engineer"));
        assert_eq!(closest_id(&catalog, "zzzzzz"), None);
    }
}
