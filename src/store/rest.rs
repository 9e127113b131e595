//! PostgREST-backed roster table `players(id, codename)`

use reqwest::Client;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

use super::{RosterEntry, RosterError};

const TABLE: &str = "players";

/// REST client for the persistent player roster
#[derive(Clone)]
pub struct RestRoster {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestRoster {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Get the REST API URL for the roster table
    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, TABLE)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RosterError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RosterError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, query: &str) -> Result<Vec<T>, RosterError> {
        let url = format!("{}?{}", self.rest_url(), query);
        let response = self
            .authed(self.client.get(&url))
            .send()
            .await
            .map_err(RosterError::Request)?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(RosterError::Parse)
    }

    pub async fn lookup_codename(&self, player_id: u32) -> Result<Option<String>, RosterError> {
        let rows: Vec<RosterEntry> = self
            .get(&format!("id=eq.{}&select=id,codename", player_id))
            .await?;
        Ok(rows.into_iter().next().map(|row| row.codename))
    }

    /// Insert or update on the `id` primary key
    pub async fn upsert(&self, player_id: u32, codename: &str) -> Result<(), RosterError> {
        #[derive(Serialize)]
        struct Row<'a> {
            id: u32,
            codename: &'a str,
        }

        let response = self
            .authed(self.client.post(self.rest_url()))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .query(&[("on_conflict", "id")])
            .json(&Row {
                id: player_id,
                codename,
            })
            .send()
            .await
            .map_err(RosterError::Request)?;

        Self::check(response).await.map(|_| ())
    }

    pub async fn list(&self) -> Result<Vec<RosterEntry>, RosterError> {
        self.get("select=id,codename&order=id.asc").await
    }

    pub async fn clear(&self) -> Result<(), RosterError> {
        // PostgREST refuses unfiltered deletes
        let url = format!("{}?id=gte.0", self.rest_url());
        let response = self
            .authed(self.client.delete(&url))
            .send()
            .await
            .map_err(RosterError::Request)?;

        Self::check(response).await.map(|_| ())
    }

    pub async fn count(&self) -> Result<usize, RosterError> {
        let rows: Vec<IgnoredAny> = self.get("select=id").await?;
        Ok(rows.len())
    }

    /// Reachability probe used by the health endpoint
    pub async fn ping(&self) -> Result<(), RosterError> {
        self.get::<IgnoredAny>("select=id&limit=1")
            .await
            .map(|_| ())
    }
}
