use anyhow::{Result, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;
use serde::Deserialize;

use crate::text::{TeamNameCleaner, WeekLabelParser};

/// One scheduled or played match. Scores live inside the status so a fixture
/// can only carry them when it was actually played.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub id: Option<i64>,
    pub week: u32,
    pub date: Option<NaiveDate>,
    pub kickoff: Option<NaiveTime>,
    pub home: String,
    pub away: String,
    pub status: FixtureStatus,
    pub home_logo: Option<String>,
    pub away_logo: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureStatus {
    Played { home_score: u32, away_score: u32 },
    Scheduled,
    Voided,
}

impl Fixture {
    pub fn involves(&self, team: &str) -> bool {
        self.home == team || self.away == team
    }

    pub fn opponent(&self, team: &str) -> Option<&str> {
        if self.home == team {
            Some(&self.away)
        } else if self.away == team {
            Some(&self.home)
        } else {
            None
        }
    }

    /// Goals for/against from the given team's perspective, played fixtures only.
    pub fn score_for(&self, team: &str) -> Option<(u32, u32)> {
        let FixtureStatus::Played { home_score, away_score } = self.status else {
            return None;
        };
        if self.home == team {
            Some((home_score, away_score))
        } else if self.away == team {
            Some((away_score, home_score))
        } else {
            None
        }
    }

    pub fn is_played(&self) -> bool {
        matches!(self.status, FixtureStatus::Played { .. })
    }
}

/// Season-to-date counters for one team within one division.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStanding {
    pub team: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl TeamStanding {
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    pub fn goal_difference(&self) -> i32 {
        self.goals_for as i32 - self.goals_against as i32
    }
}

/// One entry in a team's weekly form timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct FormEntry {
    pub week: u32,
    pub date: Option<NaiveDate>,
    pub outcome: FormOutcome,
}

/// Scores are from the team's own perspective.
#[derive(Debug, Clone, PartialEq)]
pub enum FormOutcome {
    Win { opponent: String, score: (u32, u32) },
    Draw { opponent: String, score: (u32, u32) },
    Loss { opponent: String, score: (u32, u32) },
    Voided { opponent: String },
    Upcoming { opponent: String },
    NoMatch,
}

impl FormOutcome {
    /// Badge letter: W/D/L/V, with N covering both "no match" and "not yet played".
    pub fn code(&self) -> char {
        match self {
            FormOutcome::Win { .. } => 'W',
            FormOutcome::Draw { .. } => 'D',
            FormOutcome::Loss { .. } => 'L',
            FormOutcome::Voided { .. } => 'V',
            FormOutcome::Upcoming { .. } | FormOutcome::NoMatch => 'N',
        }
    }
}

/// The earliest upcoming fixture for a team, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct NextFixture {
    pub opponent: String,
    pub week: u32,
    pub date: NaiveDate,
    pub kickoff: Option<NaiveTime>,
}

/// One ranked line of the league table with its display extras.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub position: u32,
    pub standing: TeamStanding,
    pub form: Vec<FormEntry>,
    pub next: Option<NextFixture>,
    pub logo: Option<String>,
}

/// A division's computed table, ranked best to worst.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandingsTable {
    pub rows: Vec<TableRow>,
}

impl StandingsTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fixture record as the league API returns it. Every field is optional or
/// defaulted because the upstream feed omits whatever does not apply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFixture {
    pub id: Option<i64>,
    pub week_name: Option<String>,
    pub start_date: Option<String>,
    pub home_team_name: Option<String>,
    pub away_team_name: Option<String>,
    pub home_team_score: Option<i64>,
    pub away_team_score: Option<i64>,
    pub is_voided: bool,
    pub is_canceled: bool,
    pub is_finished: bool,
    pub is_scheduled: bool,
    pub home_team_logo: Option<String>,
    pub away_team_logo: Option<String>,
}

/// Turns raw API records into [`Fixture`]s, dropping malformed ones so a
/// single bad record never takes the whole division down.
pub struct FixtureParser {
    cleaner: TeamNameCleaner,
    weeks: WeekLabelParser,
}

impl FixtureParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cleaner: TeamNameCleaner::new()?,
            weeks: WeekLabelParser::new()?,
        })
    }

    pub fn parse_all(&self, raws: Vec<RawFixture>) -> Vec<Fixture> {
        let total = raws.len();
        let mut fixtures = Vec::with_capacity(total);
        for raw in raws {
            match self.parse(&raw) {
                Ok(fixture) => fixtures.push(fixture),
                Err(e) => warn!("skipping fixture record {:?}: {e:#}", raw.id),
            }
        }
        if fixtures.len() < total {
            warn!("dropped {} of {} fixture records", total - fixtures.len(), total);
        }
        fixtures
    }

    pub fn parse(&self, raw: &RawFixture) -> Result<Fixture> {
        let home = self.required_team(raw.home_team_name.as_deref(), "home")?;
        let away = self.required_team(raw.away_team_name.as_deref(), "away")?;

        let week_label = match raw.week_name.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => bail!("missing week label"),
        };
        let Some(week) = self.weeks.week_number(week_label) else {
            bail!("unparsable week label {week_label:?}");
        };

        let (date, kickoff) = parse_start_date(raw.start_date.as_deref());
        let status = parse_status(raw)?;

        Ok(Fixture {
            id: raw.id,
            week,
            date,
            kickoff,
            home,
            away,
            status,
            home_logo: clean_url(raw.home_team_logo.as_deref()),
            away_logo: clean_url(raw.away_team_logo.as_deref()),
        })
    }

    fn required_team(&self, name: Option<&str>, side: &str) -> Result<String> {
        let cleaned = self.cleaner.clean(name.unwrap_or(""));
        if cleaned.is_empty() {
            bail!("missing {side} team name");
        }
        Ok(cleaned)
    }
}

/// Voided/canceled wins over everything else; a pair of scores means the match
/// was played; a finished fixture with no score yet stays scheduled so it can
/// never leak into the accumulation.
fn parse_status(raw: &RawFixture) -> Result<FixtureStatus> {
    if raw.is_voided || raw.is_canceled {
        return Ok(FixtureStatus::Voided);
    }
    match (raw.home_team_score, raw.away_team_score) {
        (Some(home), Some(away)) => {
            let (Ok(home_score), Ok(away_score)) = (u32::try_from(home), u32::try_from(away))
            else {
                bail!("invalid score {home}-{away}");
            };
            Ok(FixtureStatus::Played { home_score, away_score })
        }
        _ => {
            if raw.is_finished {
                warn!("fixture {:?} marked finished without both scores", raw.id);
            }
            Ok(FixtureStatus::Scheduled)
        }
    }
}

/// The feed serves either a bare ISO date or a full timestamp; a value that is
/// neither just means "no date yet".
fn parse_start_date(value: Option<&str>) -> (Option<NaiveDate>, Option<NaiveTime>) {
    let Some(text) = value.map(str::trim).filter(|t| !t.is_empty()) else {
        return (None, None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return (Some(date), None);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return (Some(dt.date_naive()), Some(dt.time()));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return (Some(dt.date()), Some(dt.time()));
    }
    warn!("unparsable fixture date {text:?}");
    (None, None)
}

fn clean_url(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
