//! Preference-based match scoring.
//!
//! Every rule is evaluated independently and the points are summed. The rule
//! weights add up to exactly 100, so the final clamp never changes a score
//! produced by these rules.

use crate::models::{Job, MatchTier, Preferences, ScoredJob};

pub const TITLE_KEYWORD_POINTS: u8 = 25;
pub const DESCRIPTION_KEYWORD_POINTS: u8 = 15;
pub const LOCATION_POINTS: u8 = 15;
pub const MODE_POINTS: u8 = 10;
pub const EXPERIENCE_POINTS: u8 = 10;
pub const SKILL_POINTS: u8 = 15;
pub const RECENCY_POINTS: u8 = 5;
pub const SOURCE_POINTS: u8 = 5;

pub const RECENT_DAYS: u32 = 2;
pub const TRUSTED_SOURCE: &str = "LinkedIn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    TitleKeyword,
    DescriptionKeyword,
    Location,
    Mode,
    Experience,
    SkillOverlap,
    Recency,
    TrustedSource,
}

impl MatchRule {
    pub fn points(&self) -> u8 {
        match self {
            MatchRule::TitleKeyword => TITLE_KEYWORD_POINTS,
            MatchRule::DescriptionKeyword => DESCRIPTION_KEYWORD_POINTS,
            MatchRule::Location => LOCATION_POINTS,
            MatchRule::Mode => MODE_POINTS,
            MatchRule::Experience => EXPERIENCE_POINTS,
            MatchRule::SkillOverlap => SKILL_POINTS,
            MatchRule::Recency => RECENCY_POINTS,
            MatchRule::TrustedSource => SOURCE_POINTS,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            MatchRule::TitleKeyword => "role keyword in title",
            MatchRule::DescriptionKeyword => "role keyword in description",
            MatchRule::Location => "preferred location",
            MatchRule::Mode => "preferred work mode",
            MatchRule::Experience => "experience level",
            MatchRule::SkillOverlap => "matching skill",
            MatchRule::Recency => "posted in the last 2 days",
            MatchRule::TrustedSource => "trusted source",
        }
    }
}

/// The rules that fire for `job` under `prefs`, in table order.
pub fn breakdown(job: &Job, prefs: &Preferences) -> Vec<MatchRule> {
    let mut rules = Vec::new();

    let title = job.title.to_lowercase();
    let description = job.description.to_lowercase();
    let keywords: Vec<String> = prefs
        .role_keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.iter().any(|k| title.contains(k.as_str())) {
        rules.push(MatchRule::TitleKeyword);
    }
    if keywords.iter().any(|k| description.contains(k.as_str())) {
        rules.push(MatchRule::DescriptionKeyword);
    }

    let location = job.location.to_lowercase();
    let location_match = prefs
        .preferred_locations
        .iter()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty())
        .any(|l| location == l || location.contains(l.as_str()));
    if location_match {
        rules.push(MatchRule::Location);
    }

    if prefs.preferred_mode.contains(&job.mode) {
        rules.push(MatchRule::Mode);
    }

    if prefs.experience_level == Some(job.experience) {
        rules.push(MatchRule::Experience);
    }

    let skill_match = job.skills.iter().any(|job_skill| {
        prefs
            .skills
            .iter()
            .any(|user_skill| job_skill.to_lowercase() == user_skill.to_lowercase())
    });
    if skill_match {
        rules.push(MatchRule::SkillOverlap);
    }

    if job.posted_days_ago <= RECENT_DAYS {
        rules.push(MatchRule::Recency);
    }

    if job.source == TRUSTED_SOURCE {
        rules.push(MatchRule::TrustedSource);
    }

    rules
}

/// Match score in `0..=100`.
pub fn score(job: &Job, prefs: &Preferences) -> u8 {
    let total: u32 = breakdown(job, prefs)
        .iter()
        .map(|rule| rule.points() as u32)
        .sum();
    total.min(100) as u8
}

pub fn classify(score: u8) -> MatchTier {
    match score {
        80.. => MatchTier::Green,
        60..=79 => MatchTier::Amber,
        40..=59 => MatchTier::Neutral,
        _ => MatchTier::Grey,
    }
}

pub fn score_job(job: &Job, prefs: &Preferences) -> ScoredJob {
    let match_score = score(job, prefs);
    ScoredJob {
        job: job.clone(),
        match_score,
        match_color: classify(match_score),
    }
}

/// Scores the whole catalog, keeping catalog order.
pub fn score_catalog(catalog: &[Job], prefs: &Preferences) -> Vec<ScoredJob> {
    catalog.iter().map(|job| score_job(job, prefs)).collect()
}
