use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::filters::{self, JobFilters};
use crate::matching;
use crate::models::{Job, JobStatus, MatchTier, ScoredJob};
use crate::saved::SavedJobs;
use crate::status::StatusTracker;
use crate::store::{StatusMap, Storage};

struct AppState {
    scored: Vec<ScoredJob>,
    jobs: Vec<ScoredJob>,
    filters: JobFilters,
    min_match_score: u8,
    statuses: StatusMap,
    saved: Vec<String>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(scored: Vec<ScoredJob>, filters: JobFilters, min_match_score: u8) -> Self {
        Self {
            scored,
            jobs: Vec::new(),
            filters,
            min_match_score,
            statuses: StatusMap::default(),
            saved: Vec::new(),
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current_job(&self) -> Option<&Job> {
        self.jobs.get(self.selected).map(|s| &s.job)
    }

    fn current(&self) -> Option<&ScoredJob> {
        self.jobs.get(self.selected)
    }

    /// Re-reads tracked state and re-applies filters, keeping the selection in range.
    fn refresh(&mut self, storage: &mut Storage) {
        self.statuses = StatusTracker::new(storage).statuses();
        self.saved = SavedJobs::new(storage).ids();
        self.jobs = filters::apply(&self.scored, &self.filters, &self.statuses, self.min_match_score);
        if self.selected >= self.jobs.len() {
            self.selected = self.jobs.len().saturating_sub(1);
        }
    }

    fn set_status(&mut self, storage: &mut Storage, status: JobStatus) {
        let Some(job) = self.current_job() else { return };
        let (id, title, company) = (job.id.clone(), job.title.clone(), job.company.clone());
        StatusTracker::new(storage).set_status(&id, status, &title, &company);
        self.refresh(storage);
    }

    fn toggle_saved(&mut self, storage: &mut Storage) {
        let Some(job) = self.current_job() else { return };
        let id = job.id.clone();
        SavedJobs::new(storage).toggle(&id);
        self.refresh(storage);
    }

    fn next(&mut self) {
        if !self.jobs.is_empty() && self.selected < self.jobs.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

pub fn run_browse(storage: &mut Storage, catalog: &[Job], filters: JobFilters) -> Result<()> {
    let prefs = storage.preferences();
    let scored = matching::score_catalog(catalog, &prefs);
    if scored.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    let mut state = AppState::new(scored, filters, prefs.min_match_score);
    state.refresh(storage);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, storage);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    storage: &mut Storage,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        list_state.select(if state.jobs.is_empty() { None } else { Some(state.selected) });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('n') => state.set_status(storage, JobStatus::NotApplied),
                KeyCode::Char('a') => state.set_status(storage, JobStatus::Applied),
                KeyCode::Char('x') => state.set_status(storage, JobStatus::Rejected),
                KeyCode::Char('s') => state.set_status(storage, JobStatus::Selected),
                KeyCode::Char('b') => state.toggle_saved(storage),
                KeyCode::Char('m') => {
                    state.filters.only_matches = !state.filters.only_matches;
                    state.selected = 0;
                    state.refresh(storage);
                }
                KeyCode::Char('o') => {
                    state.filters.sort = state.filters.sort.next();
                    state.selected = 0;
                    state.refresh(storage);
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn tier_color(tier: MatchTier) -> Color {
    match tier {
        MatchTier::Green => Color::Green,
        MatchTier::Amber => Color::Yellow,
        MatchTier::Neutral => Color::White,
        MatchTier::Grey => Color::DarkGray,
    }
}

fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::NotApplied => Color::Gray,
        JobStatus::Applied => Color::Blue,
        JobStatus::Rejected => Color::Red,
        JobStatus::Selected => Color::Green,
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(60),
        ])
        .split(frame.area());

    // Left panel: job list
    let items: Vec<ListItem> = state
        .jobs
        .iter()
        .map(|scored| {
            let job = &scored.job;
            let status_icon = match state.statuses.get(&job.id) {
                JobStatus::NotApplied => " ",
                JobStatus::Applied => "+",
                JobStatus::Rejected => "x",
                JobStatus::Selected => "*",
            };
            let saved_icon = if state.saved.contains(&job.id) { "#" } else { " " };
            let title: String = if job.title.chars().count() > 30 {
                format!("{}...", job.title.chars().take(27).collect::<String>())
            } else {
                job.title.clone()
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}{} ", status_icon, saved_icon)),
                Span::styled(
                    format!("{:>3}% ", scored.match_score),
                    Style::default().fg(tier_color(scored.match_color)),
                ),
                Span::raw(format!("{} | {}", title, job.company)),
            ]))
        })
        .collect();

    let title = format!(
        " Jobs ({}/{}) sort:{}{} ",
        state.jobs.len(),
        state.scored.len(),
        state.filters.sort,
        if state.filters.only_matches {
            format!(" >= {}%", state.min_match_score)
        } else {
            String::new()
        }
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  a:applied x:rejected s:selected n:not applied  b:save  m:matches o:sort  q:quit"
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn build_detail<'a>(state: &'a AppState) -> Text<'a> {
    let Some(scored) = state.current() else {
        return if state.filters.only_matches {
            Text::raw("No jobs at or above your minimum match score. Press m to show all.")
        } else {
            Text::raw("No job selected")
        };
    };
    let job = &scored.job;

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &job.title,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", job.company)));

    lines.push(Line::from(Span::styled(
        format!("Match: {}% ({})", scored.match_score, scored.match_color.as_str()),
        Style::default().fg(tier_color(scored.match_color)),
    )));

    let status = state.statuses.get(&job.id);
    lines.push(Line::from(Span::styled(
        format!("Status: {}", status.label()),
        Style::default().fg(status_color(status)),
    )));
    if state.saved.contains(&job.id) {
        lines.push(Line::from("Saved"));
    }

    lines.push(Line::from(format!("Location: {} ({})", job.location, job.mode)));
    lines.push(Line::from(format!("Experience: {}", job.experience)));
    if !job.salary_range.is_empty() {
        lines.push(Line::from(format!("Salary: {}", job.salary_range)));
    }
    lines.push(Line::from(format!("Source: {} | Posted: {}", job.source, job.posted_label())));
    if !job.apply_url.is_empty() {
        lines.push(Line::from(format!("Apply: {}", job.apply_url)));
    }

    lines.push(Line::from(""));

    if !job.skills.is_empty() {
        lines.push(Line::from(Span::styled(
            "Skills",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("  {}", job.skills.join(", "))));
        lines.push(Line::from(""));
    }

    if !job.description.is_empty() {
        lines.push(Line::from(Span::styled(
            "Description",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&job.description, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    } else {
        lines.push(Line::from(Span::styled(
            "(No description)",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_catalog(storage: &mut Storage) -> AppState {
        let catalog = crate::catalog::load(None).unwrap();
        let scored = matching::score_catalog(&catalog, &storage.preferences());
        let mut state = AppState::new(scored, JobFilters::default(), 40);
        state.refresh(storage);
        state
    }

    #[test]
    fn test_set_status_records_and_refreshes() {
        let mut storage = Storage::in_memory();
        let mut state = state_with_catalog(&mut storage);
        let id = state.current_job().unwrap().id.clone();

        state.set_status(&mut storage, JobStatus::Applied);
        assert_eq!(state.statuses.get(&id), JobStatus::Applied);
        assert_eq!(StatusTracker::new(&mut storage).get_status(&id), JobStatus::Applied);
    }

    #[test]
    fn test_status_filter_hides_updated_job() {
        let mut storage = Storage::in_memory();
        let mut state = state_with_catalog(&mut storage);
        state.filters.status = Some(JobStatus::NotApplied);
        state.refresh(&mut storage);
        let before = state.jobs.len();

        state.set_status(&mut storage, JobStatus::Rejected);
        assert_eq!(state.jobs.len(), before - 1);
        assert!(state.selected < state.jobs.len());
    }

    #[test]
    fn test_toggle_saved() {
        let mut storage = Storage::in_memory();
        let mut state = state_with_catalog(&mut storage);
        let id = state.current_job().unwrap().id.clone();

        state.toggle_saved(&mut storage);
        assert!(state.saved.contains(&id));
        state.toggle_saved(&mut storage);
        assert!(!state.saved.contains(&id));
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut storage = Storage::in_memory();
        let mut state = state_with_catalog(&mut storage);
        state.prev();
        assert_eq!(state.selected, 0);
        for _ in 0..100 {
            state.next();
        }
        assert_eq!(state.selected, state.jobs.len() - 1);
    }
}
