//! Remote activity source
//!
//! The pipeline only sees two seams: something that hands out an access
//! token, and something that returns one page of activities. The Strava
//! implementations below are thin blocking HTTP clients behind them.

use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::{StravaCredentials, StravaSettings};
use crate::error::SourceError;
use crate::logging::redact;

/// Supplies a bearer token for the activity listing
pub trait CredentialProvider {
    fn access_token(&self) -> Result<String, SourceError>;
}

/// One page of the activity listing (pages are 1-based)
///
/// Elements are raw JSON objects, decoded one at a time during normalization.
pub trait ActivitySource {
    fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Value>, SourceError>;
}

/// Fetch every page until an empty or short page
pub fn fetch_all<S: ActivitySource + ?Sized>(
    source: &S,
    per_page: u32,
) -> Result<Vec<Value>, SourceError> {
    fetch_all_with_progress(source, per_page, |_, _| {})
}

/// Like [`fetch_all`], calling `on_page(page, batch_len)` after each page
pub fn fetch_all_with_progress<S, F>(
    source: &S,
    per_page: u32,
    mut on_page: F,
) -> Result<Vec<Value>, SourceError>
where
    S: ActivitySource + ?Sized,
    F: FnMut(u32, usize),
{
    let per_page = per_page.max(1);
    let mut activities = Vec::new();
    let mut page = 1;

    loop {
        let batch = source.fetch_page(page, per_page)?;
        let count = batch.len();
        tracing::debug!(page, activities = count, "Fetched activity page");
        on_page(page, count);
        activities.extend(batch);

        if count < per_page as usize {
            break;
        }
        page += 1;
    }

    tracing::info!(pages = page, activities = activities.len(), "Activity listing complete");
    Ok(activities)
}

fn http_client(timeout_secs: u64) -> Result<Client, SourceError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

/// Exchanges a long-lived refresh token for a short-lived access token
pub struct RefreshTokenProvider {
    client: Client,
    token_url: String,
    credentials: StravaCredentials,
}

impl RefreshTokenProvider {
    pub fn new(
        credentials: StravaCredentials,
        settings: &StravaSettings,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            token_url: settings.token_url.clone(),
            credentials,
        })
    }
}

impl CredentialProvider for RefreshTokenProvider {
    fn access_token(&self) -> Result<String, SourceError> {
        tracing::debug!(
            client_id = %redact(&self.credentials.client_id),
            url = %self.token_url,
            "Refreshing access token"
        );

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SourceError::TokenRefresh {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json()?;
        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(SourceError::MissingAccessToken)?;

        tracing::info!(expires_in = ?token.expires_in, "Access token obtained");
        Ok(access_token)
    }
}

/// Blocking client for `GET /athlete/activities`
pub struct StravaClient {
    client: Client,
    api_base: String,
    access_token: String,
    /// Unix timestamp; only activities started after it are listed
    after: i64,
}

impl StravaClient {
    pub fn new(
        access_token: String,
        settings: &StravaSettings,
        after: NaiveDate,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            access_token,
            after: after
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp())
                .unwrap_or(0),
        })
    }

    /// Obtain a token from `provider` and build the client
    pub fn connect<P: CredentialProvider + ?Sized>(
        provider: &P,
        settings: &StravaSettings,
        after: NaiveDate,
        timeout_secs: u64,
    ) -> Result<Self, SourceError> {
        let token = provider.access_token()?;
        Self::new(token, settings, after, timeout_secs)
    }
}

impl ActivitySource for StravaClient {
    fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<Value>, SourceError> {
        let url = format!("{}/athlete/activities", self.api_base);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("after", self.after.to_string()),
            ])
            .send()?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(SourceError::NotAuthenticated);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SourceError::Listing {
                page,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json()?)
    }
}
