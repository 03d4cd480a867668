use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Remote,
    Hybrid,
    Onsite,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Remote => "Remote",
            Mode::Hybrid => "Hybrid",
            Mode::Onsite => "Onsite",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(Mode::Remote),
            "hybrid" => Ok(Mode::Hybrid),
            "onsite" | "on-site" => Ok(Mode::Onsite),
            _ => Err(ParseLabelError {
                kind: "mode",
                value: s.to_string(),
                expected: "Remote, Hybrid, Onsite",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Experience {
    Fresher,
    #[serde(rename = "0-1")]
    ZeroToOne,
    #[serde(rename = "1-3")]
    OneToThree,
    #[serde(rename = "3-5")]
    ThreeToFive,
    #[serde(rename = "5+")]
    FivePlus,
}

impl Experience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Experience::Fresher => "Fresher",
            Experience::ZeroToOne => "0-1",
            Experience::OneToThree => "1-3",
            Experience::ThreeToFive => "3-5",
            Experience::FivePlus => "5+",
        }
    }
}

impl fmt::Display for Experience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Experience {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Fresher" | "fresher" => Ok(Experience::Fresher),
            "0-1" => Ok(Experience::ZeroToOne),
            "1-3" => Ok(Experience::OneToThree),
            "3-5" => Ok(Experience::ThreeToFive),
            "5+" => Ok(Experience::FivePlus),
            _ => Err(ParseLabelError {
                kind: "experience level",
                value: s.to_string(),
                expected: "Fresher, 0-1, 1-3, 3-5, 5+",
            }),
        }
    }
}

/// A posting from the catalog. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub mode: Mode,
    pub experience: Experience,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub salary_range: String,
    pub source: String,
    pub posted_days_ago: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub apply_url: String,
}

impl Job {
    pub fn posted_label(&self) -> String {
        match self.posted_days_ago {
            0 => "Today".to_string(),
            1 => "1 day ago".to_string(),
            n => format!("{} days ago", n),
        }
    }
}

pub const DEFAULT_MIN_MATCH_SCORE: u8 = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub role_keywords: Vec<String>,
    #[serde(default)]
    pub preferred_locations: Vec<String>,
    #[serde(default)]
    pub preferred_mode: Vec<Mode>,
    #[serde(
        default,
        deserialize_with = "empty_as_any",
        serialize_with = "any_as_empty"
    )]
    pub experience_level: Option<Experience>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default = "default_min_match_score")]
    pub min_match_score: u8,
}

fn default_min_match_score() -> u8 {
    DEFAULT_MIN_MATCH_SCORE
}

fn empty_as_any<'de, D>(deserializer: D) -> Result<Option<Experience>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => label.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

fn any_as_empty<S>(value: &Option<Experience>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(value.map(|e| e.as_str()).unwrap_or(""))
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            role_keywords: Vec::new(),
            preferred_locations: Vec::new(),
            preferred_mode: Vec::new(),
            experience_level: None,
            skills: Vec::new(),
            min_match_score: DEFAULT_MIN_MATCH_SCORE,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("minimum match score must be between 0 and 100, got {0}")]
    MinMatchScoreOutOfRange(u32),
}

impl Preferences {
    /// Trims list entries, drops blanks and case-insensitive duplicates.
    pub fn normalized(mut self) -> Self {
        self.role_keywords = clean_list(self.role_keywords);
        self.preferred_locations = clean_list(self.preferred_locations);
        self.skills = clean_list(self.skills);
        let mut modes: Vec<Mode> = Vec::new();
        for mode in self.preferred_mode {
            if !modes.contains(&mode) {
                modes.push(mode);
            }
        }
        self.preferred_mode = modes;
        self
    }

    pub fn validate(&self) -> Result<(), PreferenceError> {
        if self.min_match_score > 100 {
            return Err(PreferenceError::MinMatchScoreOutOfRange(
                self.min_match_score as u32,
            ));
        }
        Ok(())
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if out.iter().any(|s| s.eq_ignore_ascii_case(trimmed)) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

/// Splits a comma-separated form value into a list ("React, Node" -> ["React", "Node"]).
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTier {
    Green,
    Amber,
    Neutral,
    Grey,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Green => "green",
            MatchTier::Amber => "amber",
            MatchTier::Neutral => "neutral",
            MatchTier::Grey => "grey",
        }
    }
}

/// A catalog job with its derived match score. A view, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredJob {
    pub job: Job,
    pub match_score: u8,
    pub match_color: MatchTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    #[default]
    NotApplied,
    Applied,
    Rejected,
    Selected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::NotApplied => "not-applied",
            JobStatus::Applied => "applied",
            JobStatus::Rejected => "rejected",
            JobStatus::Selected => "selected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::NotApplied => "Not Applied",
            JobStatus::Applied => "Applied",
            JobStatus::Rejected => "Rejected",
            JobStatus::Selected => "Selected",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            JobStatus::NotApplied => "neutral",
            JobStatus::Applied => "blue",
            JobStatus::Rejected => "red",
            JobStatus::Selected => "green",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "not-applied" => Ok(JobStatus::NotApplied),
            "applied" => Ok(JobStatus::Applied),
            "rejected" => Ok(JobStatus::Rejected),
            "selected" => Ok(JobStatus::Selected),
            _ => Err(ParseLabelError {
                kind: "status",
                value: s.to_string(),
                expected: "not-applied, applied, rejected, selected",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryItem {
    pub job_id: String,
    pub status: JobStatus,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub company: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestEntry {
    pub job: Job,
    pub match_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub date: NaiveDate,
    pub jobs: Vec<DigestEntry>,
}

impl Digest {
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}
