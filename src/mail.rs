use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::Utc;
use log::{debug, info};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;

use crate::config::GmailAuth;
use crate::report;

pub const REPORT_SUBJECT: &str = "YFL Weekly U11 Form Guide (All Divisions)";

const PLAIN_FALLBACK: &str = "This email requires an HTML-compatible client.";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

const MIXED_BOUNDARY: &str = "=_formguide_mixed";
const ALT_BOUNDARY: &str = "=_formguide_alt";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Sends the report through the Gmail REST API on behalf of the
/// authenticated account.
pub struct GmailMailer {
    client: Client,
    auth: GmailAuth,
}

impl GmailMailer {
    pub fn new(auth: GmailAuth) -> Result<Self> {
        Ok(Self { client: ClientBuilder::new().build()?, auth })
    }

    /// Sends one email: HTML body (wrapped in the report CSS shell when it is
    /// a fragment), plain-text fallback, and the full report attached as
    /// `text/html`. Returns the Gmail message id.
    pub async fn send(
        &self,
        receivers: &[String],
        subject: &str,
        body_html: &str,
        attachment_name: &str,
        attachment_html: &str,
    ) -> Result<String> {
        if receivers.is_empty() {
            bail!("no receivers to send to");
        }
        let token = self.access_token().await?;

        let mime = build_mime(
            &receivers.join(", "),
            subject,
            &Utc::now().to_rfc2822(),
            &report::wrap_email_html(body_html),
            attachment_name,
            attachment_html,
        );
        let raw = URL_SAFE.encode(mime.as_bytes());

        let response = self
            .client
            .post(SEND_URL)
            .bearer_auth(&token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .context("gmail send request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("gmail send returned {status}: {body}");
        }

        let sent = response
            .json::<SendResponse>()
            .await
            .context("malformed gmail send response")?;
        let id = sent.id.unwrap_or_else(|| "unknown".to_string());
        info!("email sent, message id: {id}");
        Ok(id)
    }

    async fn access_token(&self) -> Result<String> {
        match &self.auth {
            GmailAuth::AccessToken(token) => Ok(token.clone()),
            GmailAuth::Refresh { client_id, client_secret, refresh_token } => {
                debug!("exchanging refresh token for an access token");
                let response = self
                    .client
                    .post(TOKEN_URL)
                    .form(&[
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("refresh_token", refresh_token.as_str()),
                        ("grant_type", "refresh_token"),
                    ])
                    .send()
                    .await
                    .context("gmail token exchange request failed")?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    bail!("gmail token exchange returned {status}: {body}");
                }
                let token = response
                    .json::<TokenResponse>()
                    .await
                    .context("malformed gmail token response")?;
                Ok(token.access_token)
            }
        }
    }
}

/// RFC 2822 message: a plain/HTML alternative pair plus the report attached
/// as `text/html`, both HTML parts base64-encoded.
fn build_mime(
    to: &str,
    subject: &str,
    date: &str,
    body_html: &str,
    attachment_name: &str,
    attachment_html: &str,
) -> String {
    let mut msg = String::new();
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str(&format!("To: {to}\r\n"));
    msg.push_str(&format!("Subject: {subject}\r\n"));
    msg.push_str(&format!("Date: {date}\r\n"));
    msg.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{MIXED_BOUNDARY}\"\r\n\r\n"
    ));

    msg.push_str(&format!("--{MIXED_BOUNDARY}\r\n"));
    msg.push_str(&format!(
        "Content-Type: multipart/alternative; boundary=\"{ALT_BOUNDARY}\"\r\n\r\n"
    ));

    msg.push_str(&format!("--{ALT_BOUNDARY}\r\n"));
    msg.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
    msg.push_str("Content-Transfer-Encoding: 7bit\r\n\r\n");
    msg.push_str(PLAIN_FALLBACK);
    msg.push_str("\r\n\r\n");

    msg.push_str(&format!("--{ALT_BOUNDARY}\r\n"));
    msg.push_str("Content-Type: text/html; charset=\"utf-8\"\r\n");
    msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    msg.push_str(&chunked_base64(body_html.as_bytes()));
    msg.push_str(&format!("--{ALT_BOUNDARY}--\r\n\r\n"));

    msg.push_str(&format!("--{MIXED_BOUNDARY}\r\n"));
    msg.push_str(&format!(
        "Content-Type: text/html; charset=\"utf-8\"; name=\"{attachment_name}\"\r\n"
    ));
    msg.push_str(&format!(
        "Content-Disposition: attachment; filename=\"{attachment_name}\"\r\n"
    ));
    msg.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
    msg.push_str(&chunked_base64(attachment_html.as_bytes()));
    msg.push_str(&format!("--{MIXED_BOUNDARY}--\r\n"));

    msg
}

/// Standard base64 wrapped at 76 columns as transfer encoding requires.
fn chunked_base64(data: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / 38 + 2);
    let mut rest = encoded.as_str();
    while rest.len() > 76 {
        let (line, tail) = rest.split_at(76);
        out.push_str(line);
        out.push_str("\r\n");
        rest = tail;
    }
    out.push_str(rest);
    out.push_str("\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn mime_carries_alternative_and_attachment() {
        let msg = build_mime(
            "a@x.com, b@y.com",
            REPORT_SUBJECT,
            "Mon, 24 Aug 2026 08:00:00 +0000",
            "<html><body>inline</body></html>",
            "yfl_u11_form_guide.html",
            "<html><body>full report</body></html>",
        );
        assert!(msg.starts_with("MIME-Version: 1.0\r\n"));
        assert!(msg.contains("To: a@x.com, b@y.com\r\n"));
        assert!(msg.contains("Subject: YFL Weekly U11 Form Guide (All Divisions)\r\n"));
        assert!(msg.contains("Content-Type: multipart/mixed;"));
        assert!(msg.contains("Content-Type: multipart/alternative;"));
        assert!(msg.contains(PLAIN_FALLBACK));
        assert!(msg.contains("Content-Disposition: attachment; filename=\"yfl_u11_form_guide.html\""));
        assert!(msg.trim_end().ends_with(&format!("--{MIXED_BOUNDARY}--")));

        let inline_b64 = STANDARD.encode("<html><body>inline</body></html>");
        assert!(msg.contains(&inline_b64));
    }

    #[test]
    fn base64_lines_stay_within_76_columns() {
        let long_html = "<p>form guide</p>".repeat(100);
        let encoded = chunked_base64(long_html.as_bytes());
        assert!(encoded.lines().all(|line| line.len() <= 76));
        let rejoined: String = encoded.lines().collect();
        assert_eq!(
            STANDARD.decode(rejoined).unwrap(),
            long_html.as_bytes()
        );
    }

    #[test]
    fn short_payloads_are_a_single_line() {
        let encoded = chunked_base64(b"tiny");
        assert_eq!(encoded.lines().count(), 1);
        assert!(encoded.ends_with("\r\n"));
    }
}
