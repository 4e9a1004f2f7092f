use anyhow::Context;
use chrono::Local;
use dotenv::dotenv;
use formguide::{
    ApiClient, Config, DEFAULT_REPORT_FILE, DIVISIONS, Division, DivisionSection, Fixture,
    FixtureSource, GmailMailer, PortalSnapshot, REPORT_SUBJECT, SourceConfig, StandingsComputer,
    StandingsTable, cross_check, inline_summary, render_report,
};
use futures::future::join_all;
use log::{LevelFilter, error, info, warn};

/// Where this run's fixtures come from.
enum DataSource {
    Api(ApiClient),
    Snapshot(PortalSnapshot),
}

impl FixtureSource for DataSource {
    async fn division_fixtures(&self, division: &Division) -> anyhow::Result<Vec<Fixture>> {
        match self {
            DataSource::Api(client) => client.division_fixtures(division).await,
            DataSource::Snapshot(snapshot) => snapshot.division_fixtures(division).await,
        }
    }
}

async fn division_tables(source: &DataSource, computer: &StandingsComputer) -> Vec<StandingsTable> {
    let today = Local::now().date_naive();
    let fetches = DIVISIONS.iter().map(|division| source.division_fixtures(division));
    let mut tables = Vec::with_capacity(DIVISIONS.len());
    for (division, fetched) in DIVISIONS.iter().zip(join_all(fetches).await) {
        let table = match fetched {
            Ok(fixtures) => computer.compute(fixtures, today),
            Err(e) => {
                error!("{}: fetch failed: {e:#}", division.title);
                StandingsTable::default()
            }
        };
        if table.is_empty() {
            warn!("{}: no fixture data, rendering a placeholder panel", division.title);
        }
        tables.push(table);
    }
    tables
}

/// Snapshot runs also carry the portal's own table; reconcile against it so
/// silent fixture gaps show up in the logs.
async fn reconcile_with_portal(snapshot: &PortalSnapshot, tables: &[StandingsTable]) {
    for (division, table) in DIVISIONS.iter().zip(tables) {
        match snapshot.official_table(division).await {
            Ok(Some(official)) => {
                info!("{}: cross-checking computed table against the portal's", division.title);
                cross_check(&official, table);
            }
            Ok(None) => {
                info!("{}: no tournament page in snapshot, skipping cross-check", division.title);
            }
            Err(e) => warn!("{}: failed to read official table: {e:#}", division.title),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    let config = Config::load()?;
    let source = match &config.source {
        SourceConfig::Api { token } => DataSource::Api(ApiClient::new(token.clone())?),
        SourceConfig::Snapshot { dir } => {
            info!("using portal snapshot at {}", dir.display());
            DataSource::Snapshot(PortalSnapshot::new(dir.clone())?)
        }
    };

    let computer = StandingsComputer::new(config.form_window);
    let tables = division_tables(&source, &computer).await;
    if let DataSource::Snapshot(snapshot) = &source {
        reconcile_with_portal(snapshot, &tables).await;
    }

    let sections: Vec<DivisionSection> = DIVISIONS
        .iter()
        .zip(&tables)
        .map(|(division, table)| DivisionSection { division: *division, table })
        .collect();

    let html = render_report(&sections);
    tokio::fs::write(&config.report_path, &html)
        .await
        .with_context(|| format!("failed to write {}", config.report_path.display()))?;
    info!("report written to {}", config.report_path.display());

    match &config.mail {
        Some(mail) => {
            let inline = inline_summary(&sections).unwrap_or_default();
            let attachment_name = config
                .report_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_REPORT_FILE);
            let mailer = GmailMailer::new(mail.auth.clone())?;
            mailer
                .send(&mail.receivers, REPORT_SUBJECT, &inline, attachment_name, &html)
                .await
                .context("failed to send the report email")?;
        }
        None => warn!("EMAIL_RECEIVERS not set, skipping the email step"),
    }

    Ok(())
}
