use std::path::PathBuf;

use anyhow::{Context, bail};
use log::warn;
use serde::{Deserialize, de::DeserializeOwned};

use crate::standings::DEFAULT_FORM_WINDOW;

pub const API_BASE: &str = "https://api.sportstack.ai/api/v1";
pub const ORGANIZER: &str = "yfl";
pub const COMPETITION_ID: u32 = 4;

pub const DEFAULT_REPORT_FILE: &str = "yfl_u11_form_guide.html";

/// One tracked division: its league id on the API side and its tab identity
/// in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Division {
    pub league_id: u32,
    pub title: &'static str,
    pub panel_id: &'static str,
}

pub const DIVISIONS: [Division; 3] = [
    Division { league_id: 90, title: "U11 Division 1", panel_id: "panel-div1" },
    Division { league_id: 91, title: "U11 Division 2", panel_id: "panel-div2" },
    Division { league_id: 92, title: "U11 Division 3", panel_id: "panel-div3" },
];

impl Division {
    /// Division 3 opens as the visible tab and goes inline into the email.
    pub fn is_default(&self) -> bool {
        self.league_id == 92
    }
}

/// Everything the pipeline reads from the environment, raw.
#[derive(Debug, Default, Deserialize)]
struct PipelineEnv {
    sportstack_api_token: Option<String>,
    snapshot_dir: Option<String>,
    form_window: Option<usize>,
    report_path: Option<String>,
    email_receivers: Option<String>,
    gmail_client_id: Option<String>,
    gmail_client_secret: Option<String>,
    gmail_refresh_token: Option<String>,
    gmail_access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Live league API with a bearer token.
    Api { token: String },
    /// Saved portal pages on disk, one directory per league id.
    Snapshot { dir: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GmailAuth {
    /// Pre-issued access token, used as-is.
    AccessToken(String),
    /// Refresh-token exchange at send time.
    Refresh {
        client_id: String,
        client_secret: String,
        refresh_token: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub receivers: Vec<String>,
    pub auth: GmailAuth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: SourceConfig,
    pub form_window: usize,
    pub report_path: PathBuf,
    /// `None` means build and write the report but skip the email step.
    pub mail: Option<MailConfig>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_env(PipelineEnv::load_from_env()?)
    }

    fn from_env(env: PipelineEnv) -> anyhow::Result<Self> {
        let source = match non_empty(env.snapshot_dir) {
            Some(dir) => SourceConfig::Snapshot { dir: PathBuf::from(dir) },
            None => match non_empty(env.sportstack_api_token) {
                Some(token) => SourceConfig::Api { token },
                None => bail!("set SPORTSTACK_API_TOKEN for the live API or SNAPSHOT_DIR for saved portal pages"),
            },
        };

        let form_window = match env.form_window {
            None => DEFAULT_FORM_WINDOW,
            Some(0) => {
                warn!("FORM_WINDOW must be at least 1, using default {DEFAULT_FORM_WINDOW}");
                DEFAULT_FORM_WINDOW
            }
            Some(n) => n,
        };

        let report_path = PathBuf::from(
            non_empty(env.report_path).unwrap_or_else(|| DEFAULT_REPORT_FILE.to_string()),
        );

        let mail = match parse_receivers(env.email_receivers.as_deref()) {
            receivers if receivers.is_empty() => None,
            receivers => {
                let auth = match non_empty(env.gmail_access_token) {
                    Some(token) => GmailAuth::AccessToken(token),
                    None => GmailAuth::Refresh {
                        client_id: non_empty(env.gmail_client_id)
                            .context("EMAIL_RECEIVERS is set but GMAIL_CLIENT_ID is missing")?,
                        client_secret: non_empty(env.gmail_client_secret)
                            .context("EMAIL_RECEIVERS is set but GMAIL_CLIENT_SECRET is missing")?,
                        refresh_token: non_empty(env.gmail_refresh_token)
                            .context("EMAIL_RECEIVERS is set but GMAIL_REFRESH_TOKEN is missing")?,
                    },
                };
                Some(MailConfig { receivers, auth })
            }
        };

        Ok(Config { source, form_window, report_path, mail })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_receivers(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
