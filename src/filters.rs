use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::models::{Experience, JobStatus, Mode, ParseLabelError, ScoredJob};
use crate::store::StatusMap;

static INTEGER_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Latest,
    Match,
    Salary,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Latest => "latest",
            SortKey::Match => "match",
            SortKey::Salary => "salary",
        }
    }

    /// Cycles latest -> match -> salary -> latest.
    pub fn next(&self) -> Self {
        match self {
            SortKey::Latest => SortKey::Match,
            SortKey::Match => SortKey::Salary,
            SortKey::Salary => SortKey::Latest,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "latest" => Ok(SortKey::Latest),
            "match" | "score" => Ok(SortKey::Match),
            "salary" => Ok(SortKey::Salary),
            _ => Err(ParseLabelError {
                kind: "sort key",
                value: s.to_string(),
                expected: "latest, match, salary",
            }),
        }
    }
}

/// Active list filters. Empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobFilters {
    pub keyword: Option<String>,
    pub location: Option<String>,
    pub experience: Option<Experience>,
    pub mode: Option<Mode>,
    pub source: Option<String>,
    pub status: Option<JobStatus>,
    /// Hide jobs scoring below the preferences' minimum match score.
    pub only_matches: bool,
    pub sort: SortKey,
}

impl JobFilters {
    pub fn is_empty(&self) -> bool {
        active(&self.keyword).is_none()
            && active(&self.location).is_none()
            && self.experience.is_none()
            && self.mode.is_none()
            && active(&self.source).is_none()
            && self.status.is_none()
            && !self.only_matches
    }

    fn matches(&self, scored: &ScoredJob, statuses: &StatusMap) -> bool {
        let job = &scored.job;

        if let Some(keyword) = active(&self.keyword) {
            let keyword = keyword.to_lowercase();
            let hit = job.title.to_lowercase().contains(&keyword)
                || job.company.to_lowercase().contains(&keyword)
                || job.skills.iter().any(|s| s.to_lowercase().contains(&keyword));
            if !hit {
                return false;
            }
        }

        if let Some(location) = active(&self.location) {
            if !job.location.to_lowercase().contains(&location.to_lowercase()) {
                return false;
            }
        }

        if self.experience.is_some_and(|e| e != job.experience) {
            return false;
        }

        if self.mode.is_some_and(|m| m != job.mode) {
            return false;
        }

        if let Some(source) = active(&self.source) {
            if job.source != source {
                return false;
            }
        }

        if let Some(status) = self.status {
            if statuses.get(&job.id) != status {
                return false;
            }
        }

        true
    }
}

fn active(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// First integer token in a salary string ("10-15 LPA" -> 10); 0 when none.
pub fn salary_value(salary_range: &str) -> u64 {
    INTEGER_TOKEN
        .find(salary_range)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Filters and sorts the scored catalog. Ties keep catalog order.
pub fn apply(
    jobs: &[ScoredJob],
    filters: &JobFilters,
    statuses: &StatusMap,
    min_match_score: u8,
) -> Vec<ScoredJob> {
    let mut result: Vec<ScoredJob> = jobs
        .iter()
        .filter(|j| !filters.only_matches || j.match_score >= min_match_score)
        .filter(|j| filters.matches(j, statuses))
        .cloned()
        .collect();

    match filters.sort {
        SortKey::Latest => result.sort_by_key(|j| j.job.posted_days_ago),
        SortKey::Match => result.sort_by(|a, b| b.match_score.cmp(&a.match_score)),
        SortKey::Salary => result.sort_by(|a, b| {
            salary_value(&b.job.salary_range).cmp(&salary_value(&a.job.salary_range))
        }),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::classify;
    use crate::matching::tests::job;
    use crate::models::Job;

    fn scored(job: Job, score: u8) -> ScoredJob {
        ScoredJob {
            job,
            match_score: score,
            match_color: classify(score),
        }
    }

    fn catalog() -> Vec<ScoredJob> {
        vec![
            scored(
                Job {
                    title: "React Developer".into(),
                    company: "Acme".into(),
                    location: "Bangalore".into(),
                    mode: Mode::Remote,
                    experience: Experience::OneToThree,
                    skills: vec!["TypeScript".into()],
                    salary_range: "10-15 LPA".into(),
                    source: "LinkedIn".into(),
                    posted_days_ago: 3,
                    ..job("a")
                },
                85,
            ),
            scored(
                Job {
                    title: "Data Analyst".into(),
                    company: "Globex".into(),
                    location: "Hyderabad".into(),
                    mode: Mode::Hybrid,
                    experience: Experience::Fresher,
                    skills: vec!["SQL".into(), "Python".into()],
                    salary_range: "₹3-5 LPA".into(),
                    source: "Indeed".into(),
                    posted_days_ago: 0,
                    ..job("b")
                },
                30,
            ),
            scored(
                Job {
                    title: "Platform Engineer".into(),
                    company: "React Labs".into(),
                    location: "Bangalore Urban".into(),
                    mode: Mode::Onsite,
                    experience: Experience::FivePlus,
                    skills: vec!["Go".into()],
                    salary_range: "Not disclosed".into(),
                    source: "Naukri".into(),
                    posted_days_ago: 3,
                    ..job("c")
                },
                55,
            ),
            scored(
                Job {
                    title: "SRE".into(),
                    location: "Chennai".into(),
                    salary_range: "25-35 LPA".into(),
                    posted_days_ago: 1,
                    ..job("d")
                },
                40,
            ),
        ]
    }

    fn ids(jobs: &[ScoredJob]) -> Vec<&str> {
        jobs.iter().map(|j| j.job.id.as_str()).collect()
    }

    #[test]
    fn test_no_filters_sorts_latest_first() {
        let result = apply(&catalog(), &JobFilters::default(), &StatusMap::default(), 40);
        assert_eq!(ids(&result), vec!["b", "d", "a", "c"]);
    }

    #[test]
    fn test_keyword_matches_title_company_or_skill() {
        let filters = JobFilters {
            keyword: Some("react".into()),
            ..Default::default()
        };
        let result = apply(&catalog(), &filters, &StatusMap::default(), 40);
        assert_eq!(ids(&result), vec!["a", "c"]);

        let filters = JobFilters {
            keyword: Some("python".into()),
            ..Default::default()
        };
        let result = apply(&catalog(), &filters, &StatusMap::default(), 40);
        assert_eq!(ids(&result), vec!["b"]);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let filters = JobFilters {
            location: Some("bangalore".into()),
            mode: Some(Mode::Onsite),
            ..Default::default()
        };
        let result = apply(&catalog(), &filters, &StatusMap::default(), 40);
        assert_eq!(ids(&result), vec!["c"]);

        let filters = JobFilters {
            experience: Some(Experience::Fresher),
            source: Some("LinkedIn".into()),
            ..Default::default()
        };
        assert!(apply(&catalog(), &filters, &StatusMap::default(), 40).is_empty());
    }

    #[test]
    fn test_blank_fields_are_inactive() {
        let filters = JobFilters {
            keyword: Some("  ".into()),
            source: Some(String::new()),
            ..Default::default()
        };
        assert!(filters.is_empty());
        assert_eq!(apply(&catalog(), &filters, &StatusMap::default(), 40).len(), 4);
    }

    #[test]
    fn test_status_filter_defaults_to_not_applied() {
        let mut statuses = StatusMap::default();
        statuses.0.insert("a".into(), JobStatus::Applied);
        statuses.0.insert("ghost".into(), JobStatus::Applied);

        let applied = JobFilters {
            status: Some(JobStatus::Applied),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&catalog(), &applied, &statuses, 40)), vec!["a"]);

        let not_applied = JobFilters {
            status: Some(JobStatus::NotApplied),
            ..Default::default()
        };
        assert_eq!(
            ids(&apply(&catalog(), &not_applied, &statuses, 40)),
            vec!["b", "d", "c"]
        );
    }

    #[test]
    fn test_only_matches_uses_min_score() {
        let filters = JobFilters {
            only_matches: true,
            sort: SortKey::Match,
            ..Default::default()
        };
        let result = apply(&catalog(), &filters, &StatusMap::default(), 40);
        assert_eq!(ids(&result), vec!["a", "c", "d"]);

        let result = apply(&catalog(), &filters, &StatusMap::default(), 60);
        assert_eq!(ids(&result), vec!["a"]);
    }

    #[test]
    fn test_sort_by_salary_unparsable_as_zero() {
        let filters = JobFilters {
            sort: SortKey::Salary,
            ..Default::default()
        };
        let result = apply(&catalog(), &filters, &StatusMap::default(), 40);
        assert_eq!(ids(&result), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_latest_ties_keep_catalog_order() {
        let result = apply(&catalog(), &JobFilters::default(), &StatusMap::default(), 40);
        // "a" and "c" are both 3 days old
        assert_eq!(&ids(&result)[2..], &["a", "c"]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let filters = JobFilters {
            keyword: Some("e".into()),
            only_matches: true,
            ..Default::default()
        };
        let statuses = StatusMap::default();
        let once = apply(&catalog(), &filters, &statuses, 40);
        let twice = apply(&once, &filters, &statuses, 40);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_salary_value() {
        assert_eq!(salary_value("10-15 LPA"), 10);
        assert_eq!(salary_value("₹3-5 LPA"), 3);
        assert_eq!(salary_value("$120k - $150k"), 120);
        assert_eq!(salary_value("Competitive"), 0);
        assert_eq!(salary_value(""), 0);
    }

    #[test]
    fn test_sort_key_parse_and_cycle() {
        assert_eq!("Match".parse::<SortKey>().unwrap(), SortKey::Match);
        assert!("random".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Salary.next(), SortKey::Latest);
    }
}
