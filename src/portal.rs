use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use log::{debug, info, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::api::FixtureSource;
use crate::config::Division;
use crate::models::{Fixture, FixtureStatus, StandingsTable};
use crate::text::{TeamNameCleaner, WeekLabelParser, collapse_whitespace};

/// One line of the league table as the portal itself prints it. Used only to
/// reconcile against the computed standings, never for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficialRow {
    pub position: u32,
    pub team: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i32,
    pub points: u32,
}

/// Fixtures parsed from one saved week page.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedWeek {
    pub week: u32,
    pub date: Option<NaiveDate>,
    pub fixtures: Vec<Fixture>,
}

struct PageSelectors {
    official_rows: Selector,
    fallback_rows: Selector,
    cells: Selector,
    week_header: Selector,
    fixture_cards: Selector,
    score_box: Selector,
    score_parts: Selector,
    images: Selector,
}

impl PageSelectors {
    fn new() -> Self {
        // Fixed CSS literals, parsing cannot fail.
        Self {
            official_rows: Selector::parse("app-league-group-table tr").unwrap(),
            fallback_rows: Selector::parse("table tr").unwrap(),
            cells: Selector::parse("td").unwrap(),
            week_header: Selector::parse("app-fixture-list p.text-xs").unwrap(),
            fixture_cards: Selector::parse("app-fixture-list app-single-fixture").unwrap(),
            score_box: Selector::parse("div.flex.flex-row.items-center.justify-center.gap-2")
                .unwrap(),
            score_parts: Selector::parse("p").unwrap(),
            images: Selector::parse("img").unwrap(),
        }
    }
}

/// Parses saved portal pages: the tournament page for the official table and
/// the week-by-week fixture pages.
pub struct SnapshotParser {
    selectors: PageSelectors,
    cleaner: TeamNameCleaner,
    weeks: WeekLabelParser,
    voided_marker: Regex,
    goals_split: Regex,
}

impl SnapshotParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            selectors: PageSelectors::new(),
            cleaner: TeamNameCleaner::new()?,
            weeks: WeekLabelParser::new()?,
            voided_marker: Regex::new(r"(?i)\bvoided\b")?,
            goals_split: Regex::new(r"^(\d+)\s*/\s*(\d+)")?,
        })
    }

    /// Rows need at least 9 cells and a numeric position; anything else is a
    /// header or filler and gets skipped.
    pub fn parse_official_table(&self, html: &str) -> Vec<OfficialRow> {
        let document = Html::parse_document(html);
        let mut rows: Vec<ElementRef> = document.select(&self.selectors.official_rows).collect();
        if rows.is_empty() {
            rows = document.select(&self.selectors.fallback_rows).collect();
        }

        let mut table = Vec::new();
        for row in rows {
            let cells: Vec<ElementRef> = row.select(&self.selectors.cells).collect();
            if cells.len() < 9 {
                continue;
            }
            let Ok(position) = cell_text(cells[0]).parse::<u32>() else {
                continue;
            };
            let team = self.cleaner.clean(&cell_text(cells[1]));
            if team.is_empty() {
                continue;
            }
            let (Ok(played), Ok(won), Ok(drawn), Ok(lost)) = (
                cell_text(cells[2]).parse::<u32>(),
                cell_text(cells[3]).parse::<u32>(),
                cell_text(cells[4]).parse::<u32>(),
                cell_text(cells[5]).parse::<u32>(),
            ) else {
                continue;
            };
            let goals = cell_text(cells[6]);
            let Some(caps) = self.goals_split.captures(&goals) else {
                continue;
            };
            let (Ok(goals_for), Ok(goals_against)) =
                (caps[1].parse::<u32>(), caps[2].parse::<u32>())
            else {
                continue;
            };
            let goal_difference = cell_text(cells[7])
                .parse::<i32>()
                .unwrap_or(goals_for as i32 - goals_against as i32);
            let points = cell_text(cells[8]).parse::<u32>().unwrap_or(0);

            table.push(OfficialRow {
                position,
                team,
                played,
                won,
                drawn,
                lost,
                goals_for,
                goals_against,
                goal_difference,
                points,
            });
        }
        table
    }

    /// `None` when the page has no parseable week header.
    pub fn parse_week_page(&self, html: &str) -> Option<ParsedWeek> {
        let document = Html::parse_document(html);
        let header = document
            .select(&self.selectors.week_header)
            .next()
            .map(cell_text)?;
        let week = self.weeks.week_number(&header)?;
        let date = header_date(&header);

        let mut fixtures = Vec::new();
        for card in document.select(&self.selectors.fixture_cards) {
            match self.parse_fixture_card(card, week, date) {
                Some(fixture) => fixtures.push(fixture),
                None => debug!("week {week}: fixture card without two team names, skipped"),
            }
        }
        Some(ParsedWeek { week, date, fixtures })
    }

    fn parse_fixture_card(
        &self,
        card: ElementRef,
        week: u32,
        date: Option<NaiveDate>,
    ) -> Option<Fixture> {
        // Team names are the text nodes tagged with the (Dn) suffix.
        let mut names = card
            .text()
            .filter(|t| self.cleaner.has_division_tag(t))
            .map(|t| self.cleaner.clean(t));
        let home = names.next()?;
        let away = names.next()?;

        let voided = card.text().any(|t| self.voided_marker.is_match(t));
        let status = if voided {
            FixtureStatus::Voided
        } else {
            match self.parse_score_box(card) {
                Some((home_score, away_score)) => FixtureStatus::Played { home_score, away_score },
                None => FixtureStatus::Scheduled,
            }
        };

        // First image belongs to the home side, last to the away side.
        let images: Vec<ElementRef> = card.select(&self.selectors.images).collect();
        let (home_logo, away_logo) = if images.len() >= 2 {
            (logo_src(images.first()), logo_src(images.last()))
        } else {
            (None, None)
        };

        Some(Fixture {
            id: None,
            week,
            date,
            kickoff: None,
            home,
            away,
            status,
            home_logo,
            away_logo,
        })
    }

    /// The score sits in a dedicated flex box as three `<p>` tags: home
    /// goals, a dash, away goals. Anything else means not played yet.
    fn parse_score_box(&self, card: ElementRef) -> Option<(u32, u32)> {
        let score_box = card.select(&self.selectors.score_box).next()?;
        let parts: Vec<String> = score_box
            .select(&self.selectors.score_parts)
            .map(cell_text)
            .collect();
        if parts.len() < 3 || !matches!(parts[1].as_str(), "-" | "–") {
            return None;
        }
        Some((parts[0].parse().ok()?, parts[2].parse().ok()?))
    }
}

fn cell_text(node: ElementRef) -> String {
    collapse_whitespace(&node.text().collect::<Vec<_>>().join(" "))
}

fn logo_src(image: Option<&ElementRef>) -> Option<String> {
    image
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
}

/// Week headers read like "Week 7 - 12 Oct 2025"; the date is whatever
/// follows the first dash.
fn header_date(header: &str) -> Option<NaiveDate> {
    let text = match header.split_once('-') {
        Some((_, rest)) => rest.trim(),
        None => header.trim(),
    };
    for format in ["%d %b %Y", "%d %B %Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    debug!("no date in week header {header:?}");
    None
}

/// Saved portal pages on disk, one subdirectory per league id holding
/// `tournament.html` plus any number of `week*.html` pages.
pub struct PortalSnapshot {
    dir: PathBuf,
    parser: SnapshotParser,
}

impl PortalSnapshot {
    pub fn new(dir: PathBuf) -> Result<Self> {
        if !dir.is_dir() {
            bail!("snapshot directory {} does not exist", dir.display());
        }
        Ok(Self { dir, parser: SnapshotParser::new()? })
    }

    fn division_dir(&self, division: &Division) -> PathBuf {
        self.dir.join(division.league_id.to_string())
    }

    /// The portal's own league table, when the snapshot includes the
    /// tournament page.
    pub async fn official_table(&self, division: &Division) -> Result<Option<Vec<OfficialRow>>> {
        let path = self.division_dir(division).join("tournament.html");
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(Some(self.parser.parse_official_table(&html))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

impl FixtureSource for PortalSnapshot {
    async fn division_fixtures(&self, division: &Division) -> Result<Vec<Fixture>> {
        let dir = self.division_dir(division);
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("failed to read snapshot directory {}", dir.display()))?;

        let mut week_files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with("week") && name.ends_with(".html") {
                week_files.push(path);
            }
        }
        week_files.sort();

        let mut fixtures = Vec::new();
        let mut seen_weeks = HashSet::new();
        for path in week_files {
            let html = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let Some(parsed) = self.parser.parse_week_page(&html) else {
                warn!("{}: no week header found, skipping", path.display());
                continue;
            };
            if !seen_weeks.insert(parsed.week) {
                debug!("{}: week {} already parsed, skipping", path.display(), parsed.week);
                continue;
            }
            fixtures.extend(parsed.fixtures);
        }
        info!("{}: {} fixtures from snapshot", division.title, fixtures.len());
        Ok(fixtures)
    }
}

/// Compares the portal's printed counters with the computed ones and logs a
/// warning per disagreeing team. Returns the mismatch count. The report shows
/// the computed figures either way.
pub fn cross_check(official: &[OfficialRow], computed: &StandingsTable) -> usize {
    let mut mismatches = 0;
    for official_row in official {
        let Some(row) = computed
            .rows
            .iter()
            .find(|r| r.standing.team == official_row.team)
        else {
            warn!(
                "{}: listed in the official table but absent from the fixtures",
                official_row.team
            );
            mismatches += 1;
            continue;
        };
        let s = &row.standing;
        let computed_counters =
            (s.played, s.won, s.drawn, s.lost, s.goals_for, s.goals_against, s.points);
        let official_counters = (
            official_row.played,
            official_row.won,
            official_row.drawn,
            official_row.lost,
            official_row.goals_for,
            official_row.goals_against,
            official_row.points,
        );
        if computed_counters != official_counters {
            warn!(
                "{}: official {:?} vs computed {:?}",
                official_row.team, official_counters, computed_counters
            );
            mismatches += 1;
        }
    }
    info!("cross-check complete, {mismatches} mismatch(es); report shows computed figures");
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TableRow, TeamStanding};

    const OFFICIAL_PAGE: &str = r#"
        <app-league-group-table>
          <table>
            <tr><th>#</th><th>Club</th><th>P</th><th>W</th><th>D</th><th>L</th>
                <th>GF / GA</th><th>GD</th><th>PTS</th></tr>
            <tr><td>Pos</td><td>Club</td><td>P</td><td>W</td><td>D</td><td>L</td>
                <td>GF / GA</td><td>GD</td><td>PTS</td></tr>
            <tr><td>1</td><td>Falcons FC (D3)</td><td>5</td><td>4</td><td>0</td><td>1</td>
                <td>12 / 7</td><td>+5</td><td>12</td></tr>
            <tr><td>2</td><td>Desert United (D3)</td><td>5</td><td>2</td><td>1</td><td>2</td>
                <td>9 / 9</td><td>n/a</td><td>7</td></tr>
          </table>
        </app-league-group-table>
    "#;

    fn week_page(header: &str, cards: &str) -> String {
        format!(
            "<app-fixture-list><p class=\"text-xs\">{header}</p>{cards}</app-fixture-list>"
        )
    }

    fn played_card() -> &'static str {
        r#"<app-single-fixture>
             <img src="https://cdn/falcons.png" />
             <p>Falcons FC (D3)</p>
             <div class="flex flex-row items-center justify-center gap-2">
               <p>2</p><p>–</p><p>1</p>
             </div>
             <p>Desert United (D3)</p>
             <img src="https://cdn/desert.png" />
           </app-single-fixture>"#
    }

    #[test]
    fn official_table_rows_parse_and_headers_skip() {
        let parser = SnapshotParser::new().unwrap();
        let rows = parser.parse_official_table(OFFICIAL_PAGE);
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            OfficialRow {
                position: 1,
                team: "Falcons FC".to_string(),
                played: 5,
                won: 4,
                drawn: 0,
                lost: 1,
                goals_for: 12,
                goals_against: 7,
                goal_difference: 5,
                points: 12,
            }
        );
        // Unreadable GD column falls back to GF - GA.
        assert_eq!(rows[1].goal_difference, 0);
        assert_eq!(rows[1].points, 7);
    }

    #[test]
    fn week_page_parses_played_fixture() {
        let parser = SnapshotParser::new().unwrap();
        let page = week_page("Week 7 - 12 Oct 2025", played_card());
        let parsed = parser.parse_week_page(&page).unwrap();
        assert_eq!(parsed.week, 7);
        assert_eq!(parsed.date, Some(NaiveDate::from_ymd_opt(2025, 10, 12).unwrap()));
        assert_eq!(parsed.fixtures.len(), 1);
        let fixture = &parsed.fixtures[0];
        assert_eq!(fixture.home, "Falcons FC");
        assert_eq!(fixture.away, "Desert United");
        assert_eq!(fixture.status, FixtureStatus::Played { home_score: 2, away_score: 1 });
        assert_eq!(fixture.home_logo.as_deref(), Some("https://cdn/falcons.png"));
        assert_eq!(fixture.away_logo.as_deref(), Some("https://cdn/desert.png"));
        assert_eq!(fixture.date, parsed.date);
    }

    #[test]
    fn voided_marker_beats_a_score() {
        let parser = SnapshotParser::new().unwrap();
        let card = r#"<app-single-fixture>
             <p>Falcons FC (D3)</p>
             <div class="flex flex-row items-center justify-center gap-2">
               <p>3</p><p>-</p><p>0</p>
             </div>
             <p>Desert United (D3)</p>
             <span>VOIDED</span>
           </app-single-fixture>"#;
        let parsed = parser.parse_week_page(&week_page("Week 3 - 21 Sep 2025", card)).unwrap();
        assert_eq!(parsed.fixtures[0].status, FixtureStatus::Voided);
    }

    #[test]
    fn card_without_score_box_is_scheduled() {
        let parser = SnapshotParser::new().unwrap();
        let card = r#"<app-single-fixture>
             <p>Falcons FC (D3)</p>
             <p>Desert United (D3)</p>
           </app-single-fixture>"#;
        let parsed = parser.parse_week_page(&week_page("Week 9 - 02 Nov 2025", card)).unwrap();
        let fixture = &parsed.fixtures[0];
        assert_eq!(fixture.status, FixtureStatus::Scheduled);
        assert_eq!(fixture.home_logo, None);
    }

    #[test]
    fn card_without_two_tagged_names_is_dropped() {
        let parser = SnapshotParser::new().unwrap();
        let card = "<app-single-fixture><p>Falcons FC (D3)</p></app-single-fixture>";
        let parsed = parser.parse_week_page(&week_page("Week 2 - 14 Sep 2025", card)).unwrap();
        assert!(parsed.fixtures.is_empty());
    }

    #[test]
    fn headerless_page_yields_none() {
        let parser = SnapshotParser::new().unwrap();
        assert!(parser.parse_week_page("<div>nothing here</div>").is_none());
        let no_number = week_page("Finals day", played_card());
        assert!(parser.parse_week_page(&no_number).is_none());
    }

    #[test]
    fn undated_header_still_parses_the_week() {
        let parser = SnapshotParser::new().unwrap();
        let parsed = parser.parse_week_page(&week_page("Week 5", played_card())).unwrap();
        assert_eq!(parsed.week, 5);
        assert_eq!(parsed.date, None);
    }

    fn computed_row(team: &str, points: u32) -> TableRow {
        TableRow {
            position: 1,
            standing: TeamStanding {
                team: team.to_string(),
                played: 5,
                won: 4,
                drawn: 0,
                lost: 1,
                goals_for: 12,
                goals_against: 7,
                points,
            },
            form: Vec::new(),
            next: None,
            logo: None,
        }
    }

    #[test]
    fn cross_check_counts_disagreements() {
        let official = vec![
            OfficialRow {
                position: 1,
                team: "Falcons FC".to_string(),
                played: 5,
                won: 4,
                drawn: 0,
                lost: 1,
                goals_for: 12,
                goals_against: 7,
                goal_difference: 5,
                points: 12,
            },
            OfficialRow {
                position: 2,
                team: "Desert United".to_string(),
                played: 5,
                won: 4,
                drawn: 0,
                lost: 1,
                goals_for: 12,
                goals_against: 7,
                goal_difference: 5,
                points: 9,
            },
            OfficialRow {
                position: 3,
                team: "Ghost Team".to_string(),
                played: 0,
                won: 0,
                drawn: 0,
                lost: 0,
                goals_for: 0,
                goals_against: 0,
                goal_difference: 0,
                points: 0,
            },
        ];
        let computed = StandingsTable {
            rows: vec![computed_row("Falcons FC", 12), computed_row("Desert United", 12)],
        };
        // Desert United points differ and Ghost Team is missing entirely.
        assert_eq!(cross_check(&official, &computed), 2);
        assert_eq!(cross_check(&official[..1], &computed), 0);
    }
}
