use anyhow::{Context, Result, bail};
use log::{debug, info};
use reqwest::{Client, ClientBuilder, header};

use crate::config::{API_BASE, COMPETITION_ID, Division, ORGANIZER};
use crate::models::{Fixture, FixtureParser, RawFixture};
use crate::ratelimit::RateLimiter;

/// Per-division supply of fixtures. The pipeline runs the same way against
/// the live API, a saved portal snapshot or a canned list in tests.
#[allow(async_fn_in_trait)]
pub trait FixtureSource {
    async fn division_fixtures(&self, division: &Division) -> Result<Vec<Fixture>>;
}

/// Client for the league's JSON API.
pub struct ApiClient {
    client: Client,
    rate_limiter: RateLimiter,
    parser: FixtureParser,
    token: String,
}

impl ApiClient {
    pub fn new(token: String) -> Result<Self> {
        if token.trim().is_empty() {
            bail!("api token is empty");
        }
        let client = ClientBuilder::new().build()?;
        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(),
            parser: FixtureParser::new()?,
            token,
        })
    }

    fn fixtures_url(league_id: u32) -> String {
        format!(
            "{API_BASE}/organizer/{ORGANIZER}/parent/fixtures?league_id={league_id}&competition_id={COMPETITION_ID}"
        )
    }

    async fn fetch_raw(&self, league_id: u32) -> Result<Vec<RawFixture>> {
        self.rate_limiter.wait_until_ready().await;

        let url = Self::fixtures_url(league_id);
        debug!("GET {url}");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("fixtures request failed for league {league_id}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("fixtures request for league {league_id} returned {status}: {body}");
        }

        response
            .json::<Vec<RawFixture>>()
            .await
            .with_context(|| format!("malformed fixtures payload for league {league_id}"))
    }
}

impl FixtureSource for ApiClient {
    async fn division_fixtures(&self, division: &Division) -> Result<Vec<Fixture>> {
        let raws = self.fetch_raw(division.league_id).await?;
        info!("{}: {} fixture records fetched", division.title, raws.len());
        Ok(self.parser.parse_all(raws))
    }
}
