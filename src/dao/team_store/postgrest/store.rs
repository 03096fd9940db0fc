use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, header};
use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    models::{ChallengeEntity, TeamEntity, TeamPatch, UserEntity, UserPatch},
    storage::StorageResult,
    team_store::TeamStore,
};

use super::{
    config::RestConfig,
    error::{RestDaoError, RestResult},
    models::{
        CHALLENGES_TABLE, InsertTeamBody, InsertedIdRow, TEAM_TABLE, TeamPatchBody, TeamVetoRow,
        USER_TABLE, UserPatchBody, eq_filter, not_in_filter,
    },
};

/// Team store backed by a hosted relational database exposed through a
/// PostgREST-style HTTP dialect.
#[derive(Clone)]
pub struct PostgrestTeamStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
}

impl PostgrestTeamStore {
    /// Build the HTTP client and verify the store answers.
    pub async fn connect(config: RestConfig) -> RestResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| RestDaoError::ClientBuilder { source })?;

        let store = Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: config.api_key.map(Arc::<str>::from),
        };

        store.probe().await?;
        Ok(store)
    }

    fn request(&self, method: Method, table: &str, filters: &[String]) -> reqwest::RequestBuilder {
        let mut url = format!("{}/{}", self.base_url, table);
        if !filters.is_empty() {
            url.push('?');
            url.push_str(&filters.join("&"));
        }

        let mut builder = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            builder = builder
                .header("apikey", key.as_ref())
                .bearer_auth(key.as_ref());
        }
        builder
    }

    /// Cheap probe asking the challenges table for a single id.
    async fn probe(&self) -> RestResult<()> {
        let filters = ["select=id".to_string(), "limit=1".to_string()];
        self.get_rows::<serde_json::Value>(CHALLENGES_TABLE, &filters)
            .await
            .map(|_| ())
    }

    async fn get_rows<T>(&self, table: &str, filters: &[String]) -> RestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, table, filters)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: table.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestDaoError::RequestStatus {
                path: table.to_string(),
                status,
            });
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| RestDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })
    }

    async fn patch_rows<B>(&self, table: &str, filter: String, body: &B) -> RestResult<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .request(Method::PATCH, table, &[filter])
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: table.to_string(),
                source,
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RestDaoError::RequestStatus {
                path: table.to_string(),
                status,
            })
        }
    }

    async fn insert_returning_id<B>(&self, table: &'static str, body: &B) -> RestResult<i64>
    where
        B: Serialize + ?Sized,
    {
        let filters = ["select=id".to_string()];
        let response = self
            .request(Method::POST, table, &filters)
            .header(header::CONTENT_TYPE, "application/json")
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await
            .map_err(|source| RestDaoError::RequestSend {
                path: table.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestDaoError::RequestStatus {
                path: table.to_string(),
                status,
            });
        }

        let rows = response.json::<Vec<InsertedIdRow>>().await.map_err(|source| {
            RestDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            }
        })?;

        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or(RestDaoError::EmptyInsertReturn { table })
    }
}

impl TeamStore for PostgrestTeamStore {
    fn select_challenges(
        &self,
        exclude: Vec<i64>,
    ) -> BoxFuture<'static, StorageResult<Vec<ChallengeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut filters = vec!["select=*".to_string()];
            if let Some(filter) = not_in_filter("id", &exclude) {
                filters.push(filter);
            }
            store
                .get_rows::<ChallengeEntity>(CHALLENGES_TABLE, &filters)
                .await
                .map_err(Into::into)
        })
    }

    fn find_team(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filters = [
                "select=*".to_string(),
                eq_filter("id", id),
                "limit=1".to_string(),
            ];
            let rows = store.get_rows::<TeamEntity>(TEAM_TABLE, &filters).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn update_team(&self, id: i64, patch: TeamPatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let body = TeamPatchBody::from(patch);
            store
                .patch_rows(TEAM_TABLE, eq_filter("id", id), &body)
                .await
                .map_err(Into::into)
        })
    }

    fn select_team_veto(
        &self,
        id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<OffsetDateTime>>> {
        let store = self.clone();
        Box::pin(async move {
            let filters = [
                "select=veto_until".to_string(),
                eq_filter("id", id),
                "limit=1".to_string(),
            ];
            let rows = store.get_rows::<TeamVetoRow>(TEAM_TABLE, &filters).await?;
            Ok(rows.into_iter().next().and_then(|row| row.veto_until))
        })
    }

    fn insert_team(&self, name: String, coins: f64) -> BoxFuture<'static, StorageResult<i64>> {
        let store = self.clone();
        Box::pin(async move {
            let body = InsertTeamBody {
                name,
                coins,
                challenges_completed: Vec::new(),
            };
            store
                .insert_returning_id(TEAM_TABLE, &body)
                .await
                .map_err(Into::into)
        })
    }

    fn list_teams(&self) -> BoxFuture<'static, StorageResult<Vec<TeamEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filters = ["select=*".to_string(), "order=id.asc".to_string()];
            store
                .get_rows::<TeamEntity>(TEAM_TABLE, &filters)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filters = [
                "select=*".to_string(),
                eq_filter("id", id),
                "limit=1".to_string(),
            ];
            let rows = store.get_rows::<UserEntity>(USER_TABLE, &filters).await?;
            Ok(rows.into_iter().next())
        })
    }

    fn update_user(&self, id: Uuid, patch: UserPatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let body = UserPatchBody::from(patch);
            store
                .patch_rows(USER_TABLE, eq_filter("id", id), &body)
                .await
                .map_err(Into::into)
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filters = ["select=*".to_string(), "order=created_at.asc".to_string()];
            store
                .get_rows::<UserEntity>(USER_TABLE, &filters)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.probe().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.probe().await.map_err(Into::into) })
    }
}
