use chrono::NaiveDate;

use crate::config::Division;
use crate::models::{FormEntry, FormOutcome, StandingsTable, TableRow};
use crate::text::{escape_attr, escape_html};

/// One division's computed table paired with its tab identity.
pub struct DivisionSection<'a> {
    pub division: Division,
    pub table: &'a StandingsTable,
}

/// The full tabbed report document.
pub fn render_report(sections: &[DivisionSection]) -> String {
    let tabs = render_tabs(sections);
    let panels: String = sections.iter().map(render_panel).collect();
    PAGE_TEMPLATE
        .replace("{{TABS}}", &tabs)
        .replace("{{PANELS}}", &panels)
}

/// The default division's panel, ready to drop into the email body.
pub fn inline_summary(sections: &[DivisionSection]) -> Option<String> {
    sections.iter().find(|s| s.division.is_default()).map(render_panel)
}

/// Wraps an HTML fragment in the dark-theme shell the report uses, so the
/// inline table looks the same in the mail client. Full documents pass
/// through untouched.
pub fn wrap_email_html(body: &str) -> String {
    let trimmed = body.trim_start();
    let is_document = trimmed
        .get(..9)
        .is_some_and(|p| p.eq_ignore_ascii_case("<!doctype"))
        || trimmed.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("<html"));
    if is_document {
        return body.to_string();
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\" />\n{INLINE_EMAIL_CSS}\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

fn render_tabs(sections: &[DivisionSection]) -> String {
    let mut tabs = String::from("<div class='tab-bar'>");
    for section in sections {
        let active = if section.division.is_default() { " active" } else { "" };
        tabs.push_str(&format!(
            "<button class='tab-btn{active}' onclick=\"showDivision('{}', this)\">{}</button>",
            section.division.panel_id, section.division.title
        ));
    }
    tabs.push_str("</div>");
    tabs
}

fn render_panel(section: &DivisionSection) -> String {
    let style = if section.division.is_default() { "display:block;" } else { "display:none;" };
    let body = if section.table.is_empty() {
        "<p>No fixture data available for this division.</p>".to_string()
    } else {
        let rows: String = section.table.rows.iter().map(render_row).collect();
        format!("<table><thead>{TABLE_HEADER}</thead><tbody>{rows}</tbody></table>")
    };
    format!(
        "<div id='{}' class='division-panel' style='{}'><h2>YFL Dubai — {}</h2>{}</div>",
        section.division.panel_id, style, section.division.title, body
    )
}

const TABLE_HEADER: &str = "<tr><th>#</th><th>Club</th><th>P</th><th>W</th><th>D</th><th>L</th><th>GF / GA</th><th>GD</th><th>PTS</th><th>Form</th><th>Next Fixture</th></tr>";

fn render_row(row: &TableRow) -> String {
    let s = &row.standing;
    let gd = s.goal_difference();
    let gd_class = if gd > 0 { "gd-pos" } else if gd < 0 { "gd-neg" } else { "gd-zero" };
    let gd_text = if gd > 0 { format!("+{gd}") } else { gd.to_string() };
    let form: String = row.form.iter().map(badge).collect();
    let (next_main, next_meta) = match &row.next {
        Some(next) => (
            format!("v {}", escape_html(&next.opponent)),
            format!("Week {} — {}", next.week, format_date(Some(next.date))),
        ),
        None => ("No upcoming fixture".to_string(), "—".to_string()),
    };

    format!(
        "<tr>\
         <td class='pos'>{}</td>\
         <td class='team'>{}</td>\
         <td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
         <td>{} / {}</td>\
         <td class='gd {gd_class}'>{gd_text}</td>\
         <td class='pts'>{}</td>\
         <td class='form-cell'>{form}</td>\
         <td class='next-cell'><span class='next-main'>{next_main}</span>\
         <span class='next-meta'>{next_meta}</span></td>\
         </tr>",
        row.position,
        team_cell(row),
        s.played,
        s.won,
        s.drawn,
        s.lost,
        s.goals_for,
        s.goals_against,
        s.points,
    )
}

fn team_cell(row: &TableRow) -> String {
    let name = escape_html(&row.standing.team);
    match &row.logo {
        Some(url) => format!(
            "<div class='team-cell'><img class='team-logo' src='{}' alt='{} logo' /><span>{name}</span></div>",
            escape_attr(url),
            escape_attr(&row.standing.team),
        ),
        None => format!("<div class='team-cell'><span>{name}</span></div>"),
    }
}

/// A bordered circle with the outcome letter; voided weeks get the striped
/// fill. Details go in the hover tooltip.
fn badge(entry: &FormEntry) -> String {
    let code = entry.outcome.code();
    let color = badge_color(code);
    let tip = escape_attr(&tooltip(entry));
    let fill = if matches!(entry.outcome, FormOutcome::Voided { .. }) {
        "background:repeating-linear-gradient(45deg,#9ca3af 0,#9ca3af 4px,#e5e7eb 4px,#e5e7eb 8px);color:#020617;".to_string()
    } else {
        format!("background:#020617;color:{color};")
    };
    format!(
        "<span title='{tip}' style='display:inline-flex;align-items:center;justify-content:center;\
         width:24px;height:24px;border-radius:999px;border:2px solid {color};\
         font-size:11px;font-weight:700;margin-right:4px;{fill}'>{code}</span>"
    )
}

fn badge_color(code: char) -> &'static str {
    match code {
        'W' => "#22c55e",
        'D' => "#eab308",
        'L' => "#ef4444",
        'N' | 'V' => "#9ca3af",
        _ => "#ffffff",
    }
}

fn tooltip(entry: &FormEntry) -> String {
    let when = format!("Week {} — {}", entry.week, format_date(entry.date));
    match &entry.outcome {
        FormOutcome::Win { opponent, score } => {
            format!("Win\nvs {opponent}\nScore: {}–{}\n{when}", score.0, score.1)
        }
        FormOutcome::Draw { opponent, score } => {
            format!("Draw\nvs {opponent}\nScore: {}–{}\n{when}", score.0, score.1)
        }
        FormOutcome::Loss { opponent, score } => {
            format!("Loss\nvs {opponent}\nScore: {}–{}\n{when}", score.0, score.1)
        }
        FormOutcome::Voided { opponent } => format!("Voided match\nvs {opponent}\n{when}"),
        FormOutcome::Upcoming { opponent } => {
            format!("Not yet played (scheduled)\nvs {opponent}\n{when}")
        }
        FormOutcome::NoMatch => format!("No match played\n{when}"),
    }
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d %b %Y").to_string()).unwrap_or_default()
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8" />
<title>YFL Dubai — U11 Form Guide</title>
<style>
body {
  background:#020617;
  color:#e5e7eb;
  font-family:system-ui,-apple-system,BlinkMacSystemFont,"Segoe UI",sans-serif;
  padding:20px;
}
h1 {
  margin:0 0 8px 0;
}
h2 {
  margin:16px 0 8px 0;
}
p {
  margin:0 0 12px 0;
  color:#9ca3af;
}
table {
  width:100%;
  border-collapse:collapse;
  font-size:14px;
}
th,td {
  padding:6px 8px;
  border-bottom:1px solid #334155;
}
thead {
  background:#0f172a;
}
tbody tr:nth-child(even) { background:#0b1120; }
tbody tr:nth-child(odd)  { background:#111827; }
td.form-cell { max-width:360px; }
.gd-pos { color:#22c55e; font-weight:700; }
.gd-neg { color:#ef4444; font-weight:700; }
.gd-zero { color:#9ca3af; }
.next-main { font-weight:700; display:block; }
.next-meta { color:#9ca3af; font-size:12px; display:block; }
.pos { color:#9ca3af; }
.pts { font-weight:700; }
.team-cell {
  display:flex;
  align-items:center;
  gap:8px;
}
.team-logo {
  width:28px;
  height:28px;
  border-radius:50%;
  object-fit:cover;
  background:#0f172a;
}

/* Tabs */
.tab-bar {
  display:flex;
  gap:10px;
  margin-bottom:16px;
}
.tab-btn {
  padding:8px 18px;
  border-radius:999px;
  border:1px solid #4b5563;
  background:#111827;
  color:#e5e7eb;
  font-size:14px;
  font-weight:600;
  cursor:pointer;
  transition:all 0.15s ease-out;
}
.tab-btn:hover {
  background:#1f2937;
}
.tab-btn.active {
  background:#e5e7eb;
  color:#111827;
  border-color:#e5e7eb;
}
.division-panel {
  margin-top:8px;
}
</style>
<script>
function showDivision(id, btn) {
  document.querySelectorAll('.division-panel').forEach(function(el){
    el.style.display = 'none';
  });
  var panel = document.getElementById(id);
  if (panel) {
    panel.style.display = 'block';
  }
  document.querySelectorAll('.tab-btn').forEach(function(b){
    b.classList.remove('active');
  });
  if (btn) {
    btn.classList.add('active');
  }
}
</script>
</head>
<body>
<h1>YFL Dubai — Under 11 Form Guide</h1>
{{TABS}}
{{PANELS}}
</body>
</html>
"#;

const INLINE_EMAIL_CSS: &str = r#"<style>
body {
  background:#020617;
  color:#e5e7eb;
  font-family:system-ui,-apple-system,BlinkMacSystemFont,"Segoe UI",sans-serif;
  padding:20px;
  margin:0;
}
h1 {
  margin:0 0 8px 0;
}
h2 {
  margin:16px 0 8px 0;
}
p {
  margin:0 0 12px 0;
  color:#9ca3af;
}
table {
  width:100%;
  border-collapse:collapse;
  font-size:14px;
}
th,td {
  padding:6px 8px;
  border-bottom:1px solid #334155;
}
thead {
  background:#0f172a;
}
tbody tr:nth-child(even) { background:#0b1120; }
tbody tr:nth-child(odd)  { background:#111827; }
td.form-cell { max-width:360px; }
.gd-pos { color:#22c55e; font-weight:700; }
.gd-neg { color:#ef4444; font-weight:700; }
.gd-zero { color:#9ca3af; }
.next-main { font-weight:700; display:block; }
.next-meta { color:#9ca3af; font-size:12px; display:block; }
.pos { color:#9ca3af; }
.pts { font-weight:700; }
.team-cell {
  display:flex;
  align-items:center;
  gap:8px;
}
.team-logo {
  width:28px;
  height:28px;
  border-radius:50%;
  object-fit:cover;
  background:#0f172a;
}
.division-panel {
  margin-top:8px;
}
</style>"#;
