mod api;
mod config;
mod mail;
mod models;
mod portal;
mod ratelimit;
mod report;
mod standings;
mod text;

pub use api::{ApiClient, FixtureSource};
pub use config::{Config, DEFAULT_REPORT_FILE, DIVISIONS, Division, GmailAuth, MailConfig, SourceConfig};
pub use mail::{GmailMailer, REPORT_SUBJECT};
pub use models::{
    Fixture, FixtureParser, FixtureStatus, FormEntry, FormOutcome, NextFixture, RawFixture,
    StandingsTable, TableRow, TeamStanding,
};
pub use portal::{OfficialRow, PortalSnapshot, SnapshotParser, cross_check};
pub use report::{DivisionSection, inline_summary, render_report, wrap_email_html};
pub use standings::{DEFAULT_FORM_WINDOW, StandingsComputer};
