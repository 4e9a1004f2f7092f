use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use log::debug;

use crate::models::{
    Fixture, FixtureStatus, FormEntry, FormOutcome, NextFixture, StandingsTable, TableRow,
    TeamStanding,
};

pub const DEFAULT_FORM_WINDOW: usize = 9;

/// Pure league-table computer. Everything it produces is a function of the
/// fixture list and the reference date, so the same inputs always give the
/// same table regardless of where the fixtures came from.
pub struct StandingsComputer {
    form_window: usize,
}

impl StandingsComputer {
    pub fn new(form_window: usize) -> Self {
        Self { form_window }
    }

    pub fn compute(&self, fixtures: Vec<Fixture>, today: NaiveDate) -> StandingsTable {
        let fixtures = normalize(fixtures);
        if fixtures.is_empty() {
            return StandingsTable::default();
        }

        let standings = accumulate(&fixtures);
        let weeks = form_weeks(&fixtures);
        let week_dates = week_dates(&fixtures);
        let logos = team_logos(&fixtures);

        let mut rows = Vec::with_capacity(standings.len());
        for (position, standing) in rank(standings).into_iter().enumerate() {
            let form = self.form_timeline(&fixtures, &week_dates, &standing.team, &weeks);
            let next = next_fixture(&fixtures, &standing.team, today);
            let logo = logos.get(&standing.team).cloned();
            rows.push(TableRow {
                position: position as u32 + 1,
                standing,
                form,
                next,
                logo,
            });
        }
        StandingsTable { rows }
    }

    /// One entry per form week, trimmed to the most recent `form_window`
    /// entries. Entries carry the week date so the tooltip can show it even
    /// when the team had no match.
    fn form_timeline(
        &self,
        fixtures: &[Fixture],
        week_dates: &BTreeMap<u32, NaiveDate>,
        team: &str,
        weeks: &[u32],
    ) -> Vec<FormEntry> {
        let mut entries = Vec::with_capacity(weeks.len());
        for &week in weeks {
            let date = week_dates.get(&week).copied();
            let outcome = fixtures
                .iter()
                .find(|f| f.week == week && f.involves(team))
                .map_or(FormOutcome::NoMatch, |f| outcome_for(f, team));
            entries.push(FormEntry { week, date, outcome });
        }
        if entries.len() > self.form_window {
            entries.split_off(entries.len() - self.form_window)
        } else {
            entries
        }
    }
}

impl Default for StandingsComputer {
    fn default() -> Self {
        Self::new(DEFAULT_FORM_WINDOW)
    }
}

/// Dedup then sort into canonical order. Records carrying a source id dedup
/// on it; the rest fall back to the (week, home, away) pairing. First
/// occurrence wins either way.
fn normalize(fixtures: Vec<Fixture>) -> Vec<Fixture> {
    let mut seen_ids = HashSet::new();
    let mut seen_pairings = HashSet::new();
    let mut out = Vec::with_capacity(fixtures.len());
    for fixture in fixtures {
        let fresh = match fixture.id {
            Some(id) => seen_ids.insert(id),
            None => seen_pairings.insert((fixture.week, fixture.home.clone(), fixture.away.clone())),
        };
        if fresh {
            out.push(fixture);
        } else {
            debug!(
                "dropping duplicate fixture: week {} {} vs {}",
                fixture.week, fixture.home, fixture.away
            );
        }
    }
    // Undated fixtures sort after dated ones within their week.
    out.sort_by_key(|f| {
        (
            f.week,
            f.date.is_none(),
            f.date,
            f.kickoff.is_none(),
            f.kickoff,
            f.id,
        )
    });
    out
}

/// Season counters over played fixtures only. Voided and scheduled fixtures
/// still register the team so it gets a (possibly all-zero) row.
fn accumulate(fixtures: &[Fixture]) -> BTreeMap<String, TeamStanding> {
    let mut standings = BTreeMap::new();
    for fixture in fixtures {
        for team in [&fixture.home, &fixture.away] {
            standings
                .entry(team.clone())
                .or_insert_with(|| TeamStanding::new(team.clone()));
        }
    }
    for fixture in fixtures {
        let FixtureStatus::Played { home_score, away_score } = fixture.status else {
            continue;
        };
        for (team, scored, conceded) in [
            (&fixture.home, home_score, away_score),
            (&fixture.away, away_score, home_score),
        ] {
            let Some(standing) = standings.get_mut(team) else {
                continue;
            };
            standing.played += 1;
            standing.goals_for += scored;
            standing.goals_against += conceded;
            match scored.cmp(&conceded) {
                std::cmp::Ordering::Greater => {
                    standing.won += 1;
                    standing.points += 3;
                }
                std::cmp::Ordering::Equal => {
                    standing.drawn += 1;
                    standing.points += 1;
                }
                std::cmp::Ordering::Less => standing.lost += 1,
            }
        }
    }
    standings
}

/// Weeks the form timeline covers: every week number present in the fixture
/// set, except a trailing week where nothing has been played yet. A lone
/// first week is kept even when unplayed.
fn form_weeks(fixtures: &[Fixture]) -> Vec<u32> {
    let mut weeks: Vec<u32> = fixtures.iter().map(|f| f.week).collect();
    weeks.sort_unstable();
    weeks.dedup();
    if let Some(&last) = weeks.last() {
        if weeks.len() > 1 && !fixtures.iter().any(|f| f.week == last && f.is_played()) {
            weeks.pop();
        }
    }
    weeks
}

/// Points, then goal difference, then goals scored, then name so equal
/// records always land in the same order.
fn rank(standings: BTreeMap<String, TeamStanding>) -> Vec<TeamStanding> {
    let mut ranked: Vec<TeamStanding> = standings.into_values().collect();
    ranked.sort_by_key(|s| {
        (
            Reverse(s.points),
            Reverse(s.goal_difference()),
            Reverse(s.goals_for),
            s.team.clone(),
        )
    });
    ranked
}

fn outcome_for(fixture: &Fixture, team: &str) -> FormOutcome {
    let opponent = fixture.opponent(team).unwrap_or_default().to_string();
    match fixture.status {
        FixtureStatus::Played { .. } => {
            let Some((scored, conceded)) = fixture.score_for(team) else {
                return FormOutcome::NoMatch;
            };
            let score = (scored, conceded);
            match scored.cmp(&conceded) {
                std::cmp::Ordering::Greater => FormOutcome::Win { opponent, score },
                std::cmp::Ordering::Equal => FormOutcome::Draw { opponent, score },
                std::cmp::Ordering::Less => FormOutcome::Loss { opponent, score },
            }
        }
        FixtureStatus::Voided => FormOutcome::Voided { opponent },
        FixtureStatus::Scheduled => FormOutcome::Upcoming { opponent },
    }
}

/// Earliest dated upcoming fixture on or after `today`. Scheduled fixtures
/// without a date cannot be "next" because they cannot be ordered.
fn next_fixture(fixtures: &[Fixture], team: &str, today: NaiveDate) -> Option<NextFixture> {
    fixtures
        .iter()
        .filter(|f| f.status == FixtureStatus::Scheduled && f.involves(team))
        .filter_map(|f| f.date.map(|date| (date, f)))
        .filter(|(date, _)| *date >= today)
        .min_by_key(|(date, f)| (*date, f.kickoff.is_none(), f.kickoff, f.week))
        .map(|(date, f)| NextFixture {
            opponent: f.opponent(team).unwrap_or_default().to_string(),
            week: f.week,
            date,
            kickoff: f.kickoff,
        })
}

/// Each week is dated by its first dated fixture in canonical order.
fn week_dates(fixtures: &[Fixture]) -> BTreeMap<u32, NaiveDate> {
    let mut dates = BTreeMap::new();
    for fixture in fixtures {
        if let Some(date) = fixture.date {
            dates.entry(fixture.week).or_insert(date);
        }
    }
    dates
}

/// Badge logo per team, first fixture carrying one wins.
fn team_logos(fixtures: &[Fixture]) -> BTreeMap<String, String> {
    let mut logos = BTreeMap::new();
    for fixture in fixtures {
        if let Some(logo) = &fixture.home_logo {
            logos.entry(fixture.home.clone()).or_insert_with(|| logo.clone());
        }
        if let Some(logo) = &fixture.away_logo {
            logos.entry(fixture.away.clone()).or_insert_with(|| logo.clone());
        }
    }
    logos
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, day).unwrap()
    }

    fn played(week: u32, home: &str, away: &str, home_score: u32, away_score: u32) -> Fixture {
        Fixture {
            id: None,
            week,
            date: Some(date(week)),
            kickoff: None,
            home: home.to_string(),
            away: away.to_string(),
            status: FixtureStatus::Played { home_score, away_score },
            home_logo: None,
            away_logo: None,
        }
    }

    fn scheduled(week: u32, home: &str, away: &str, on: Option<NaiveDate>) -> Fixture {
        Fixture {
            id: None,
            week,
            date: on,
            kickoff: None,
            home: home.to_string(),
            away: away.to_string(),
            status: FixtureStatus::Scheduled,
            home_logo: None,
            away_logo: None,
        }
    }

    fn voided(week: u32, home: &str, away: &str) -> Fixture {
        Fixture {
            id: None,
            week,
            date: Some(date(week)),
            kickoff: None,
            home: home.to_string(),
            away: away.to_string(),
            status: FixtureStatus::Voided,
            home_logo: None,
            away_logo: None,
        }
    }

    fn row<'a>(table: &'a StandingsTable, team: &str) -> &'a TableRow {
        table
            .rows
            .iter()
            .find(|r| r.standing.team == team)
            .unwrap_or_else(|| panic!("no row for {team}"))
    }

    fn codes(row: &TableRow) -> String {
        row.form.iter().map(|e| e.outcome.code()).collect()
    }

    #[test]
    fn points_and_goal_difference_follow_results() {
        let table = StandingsComputer::default().compute(
            vec![
                played(1, "A", "B", 3, 1),
                played(2, "B", "A", 2, 2),
                played(3, "A", "C", 0, 1),
            ],
            date(20),
        );
        let a = &row(&table, "A").standing;
        assert_eq!((a.played, a.won, a.drawn, a.lost), (3, 1, 1, 1));
        assert_eq!(a.points, 4);
        assert_eq!((a.goals_for, a.goals_against), (5, 4));
        assert_eq!(a.goal_difference(), 1);
        let c = &row(&table, "C").standing;
        assert_eq!(c.points, 3);
        assert_eq!(c.played, 1);
    }

    #[test]
    fn voided_fixtures_count_nowhere_but_show_in_form() {
        let table = StandingsComputer::default().compute(
            vec![voided(1, "A", "B"), played(2, "A", "B", 1, 0)],
            date(20),
        );
        let a = row(&table, "A");
        assert_eq!(a.standing.played, 1);
        assert_eq!(a.standing.points, 3);
        assert_eq!(codes(a), "VW");
        assert_eq!(
            a.form[0].outcome,
            FormOutcome::Voided { opponent: "B".to_string() }
        );
    }

    #[test]
    fn lone_voided_week_still_shows_as_v() {
        let table = StandingsComputer::default().compute(vec![voided(1, "A", "B")], date(20));
        let a = row(&table, "A");
        assert_eq!((a.standing.played, a.standing.points), (0, 0));
        assert_eq!(codes(a), "V");
        assert_eq!(codes(row(&table, "B")), "V");
    }

    #[test]
    fn fully_tied_records_fall_back_to_name_order() {
        // A beats C 1-0 and B beats D 1-0: A and B end up identical.
        let table = StandingsComputer::default().compute(
            vec![played(1, "B", "D", 1, 0), played(1, "A", "C", 1, 0)],
            date(20),
        );
        let order: Vec<&str> = table.rows.iter().map(|r| r.standing.team.as_str()).collect();
        assert_eq!(order, ["A", "B", "C", "D"]);
        assert_eq!(row(&table, "A").position, 1);
        assert_eq!(row(&table, "D").position, 4);
    }

    #[test]
    fn ranking_prefers_points_then_gd_then_gf() {
        let table = StandingsComputer::default().compute(
            vec![
                played(1, "A", "X", 1, 0), // A: 3pts, GD+1, GF1
                played(1, "B", "Y", 3, 1), // B: 3pts, GD+2, GF3
                played(2, "C", "X", 4, 2), // C: 3pts, GD+2, GF4
            ],
            date(20),
        );
        let order: Vec<&str> = table.rows.iter().map(|r| r.standing.team.as_str()).collect();
        assert_eq!(&order[..3], ["C", "B", "A"]);
    }

    #[test]
    fn form_window_keeps_only_the_latest_weeks() {
        let mut fixtures: Vec<Fixture> = (1..=12).map(|w| played(w, "A", "B", 1, 0)).collect();
        fixtures.push(played(13, "C", "D", 1, 0));
        fixtures.push(scheduled(13, "A", "B", Some(date(28))));
        let table = StandingsComputer::new(9).compute(fixtures, date(20));
        let a = row(&table, "A");
        assert_eq!(a.form.len(), 9);
        // Window covers weeks 5..=13, with A's week 13 fixture still upcoming.
        assert_eq!(a.form[0].week, 5);
        assert_eq!(codes(a), "WWWWWWWWN");
    }

    #[test]
    fn weeks_without_a_match_fill_with_n() {
        let table = StandingsComputer::default().compute(
            vec![
                played(1, "A", "B", 1, 0),
                played(3, "A", "B", 0, 0),
                played(3, "C", "D", 2, 0),
            ],
            date(20),
        );
        // Only weeks 1 and 3 exist in the data; C sat out week 1.
        assert_eq!(codes(row(&table, "A")), "WD");
        assert_eq!(codes(row(&table, "C")), "NW");
    }

    #[test]
    fn next_fixture_is_earliest_on_or_after_today() {
        let mut future_voided = voided(2, "A", "G");
        future_voided.date = Some(date(14));
        let table = StandingsComputer::default().compute(
            vec![
                played(1, "A", "B", 2, 2),
                scheduled(2, "A", "C", Some(date(5))),  // already past
                future_voided, // dated before E's fixture but voided
                scheduled(4, "A", "D", Some(date(25))), // later than week 3
                scheduled(3, "E", "A", Some(date(18))),
                scheduled(5, "A", "F", None), // undated, never "next"
            ],
            date(10),
        );
        let next = row(&table, "A").next.clone().unwrap();
        assert_eq!(next.opponent, "E");
        assert_eq!(next.week, 3);
        assert_eq!(next.date, date(18));
        assert!(row(&table, "B").next.is_none());
    }

    #[test]
    fn same_day_next_fixtures_order_by_kickoff() {
        let mut early = scheduled(2, "A", "C", Some(date(15)));
        early.kickoff = NaiveTime::from_hms_opt(9, 0, 0);
        let mut late = scheduled(3, "A", "D", Some(date(15)));
        late.kickoff = NaiveTime::from_hms_opt(11, 0, 0);
        let table = StandingsComputer::default().compute(vec![late, early], date(10));
        assert_eq!(row(&table, "A").next.clone().unwrap().opponent, "C");
    }

    #[test]
    fn trailing_unplayed_week_is_not_form() {
        let table = StandingsComputer::default().compute(
            vec![
                played(1, "A", "B", 1, 0),
                played(2, "A", "B", 1, 1),
                scheduled(3, "A", "B", Some(date(25))),
            ],
            date(20),
        );
        // Week 3 has no played fixtures yet, so form stops at week 2.
        assert_eq!(codes(row(&table, "A")), "WD");
    }

    #[test]
    fn trailing_week_survives_once_anything_is_played() {
        let table = StandingsComputer::default().compute(
            vec![
                played(1, "A", "B", 1, 0),
                played(2, "C", "D", 2, 0),
                scheduled(2, "A", "B", Some(date(25))),
            ],
            date(20),
        );
        assert_eq!(codes(row(&table, "A")), "WN");
        assert_eq!(codes(row(&table, "C")), "NW");
    }

    #[test]
    fn duplicate_records_count_once() {
        let mut by_id = played(1, "A", "B", 2, 0);
        by_id.id = Some(7);
        let table = StandingsComputer::default().compute(
            vec![by_id.clone(), by_id, played(1, "C", "D", 1, 0), played(1, "C", "D", 1, 0)],
            date(20),
        );
        assert_eq!(row(&table, "A").standing.played, 1);
        assert_eq!(row(&table, "C").standing.played, 1);
        assert_eq!(row(&table, "C").standing.goals_for, 1);
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let table = StandingsComputer::default().compute(vec![], date(20));
        assert!(table.is_empty());
    }

    #[test]
    fn scheduled_only_teams_get_zero_rows() {
        let table = StandingsComputer::default().compute(
            vec![scheduled(1, "A", "B", Some(date(25)))],
            date(20),
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(row(&table, "A").standing.points, 0);
        assert_eq!(row(&table, "A").standing.played, 0);
        assert_eq!(codes(row(&table, "A")), "N");
    }

    #[test]
    fn first_logo_seen_sticks() {
        let mut first = played(1, "A", "B", 1, 0);
        first.home_logo = Some("first.png".to_string());
        let mut second = played(2, "B", "A", 0, 0);
        second.away_logo = Some("second.png".to_string());
        let table = StandingsComputer::default().compute(vec![second, first], date(20));
        assert_eq!(row(&table, "A").logo.as_deref(), Some("first.png"));
        assert_eq!(row(&table, "B").logo, None);
    }

    #[test]
    fn form_entries_carry_the_week_date() {
        let undated = scheduled(2, "C", "D", None);
        let table = StandingsComputer::default().compute(
            vec![played(1, "A", "B", 1, 0), played(2, "A", "B", 2, 0), undated],
            date(20),
        );
        let c = row(&table, "C");
        // C sat out week 1 and its own week 2 fixture is undated; both entries
        // still carry the dates the weeks happened on.
        assert_eq!(c.form[0].date, Some(date(1)));
        assert_eq!(c.form[1].date, Some(date(2)));
    }
}
