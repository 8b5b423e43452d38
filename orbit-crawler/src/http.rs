use crate::error::ProviderError;
use crate::source::{AccountId, ConnectionStream, GraphDataSource, PopularityRecord};
use futures::{StreamExt, stream};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";
pub const DEFAULT_PAGE_SIZE: usize = 5000;

const FRIENDS_PATH: &str = "friends/ids.json";
const FOLLOWERS_PATH: &str = "followers/ids.json";

#[derive(Debug, Deserialize)]
struct UserObject {
    id: AccountId,
    #[serde(default)]
    screen_name: Option<String>,
    #[serde(default)]
    followers_count: u64,
}

#[derive(Debug, Deserialize)]
struct IdsPage {
    ids: Vec<AccountId>,
    #[serde(default)]
    next_cursor: i64,
}

struct PageState {
    cursor: i64,
    buffer: VecDeque<AccountId>,
    exhausted: bool,
}

/// Provider speaking the cursor-paginated v1.1 REST shape
/// (`users/show`, `friends/ids`, `followers/ids`, `users/lookup`).
pub struct HttpGraphSource {
    client: Client,
    base: String,
    token: Option<String>,
    page_size: usize,
}

impl HttpGraphSource {
    pub fn new(base: &str) -> Result<Self, ProviderError> {
        Self::with_timeout(base, 30)
    }

    pub fn with_timeout(base: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        Url::parse(base).map_err(|e| {
            ProviderError::InvalidRequest(format!("Invalid API base {}: {}", base, e))
        })?;

        let client = Client::builder()
            .user_agent("Orbit/0.1 (https://github.com/trapdoorsec/orbit)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs / 2))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Ids requested per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&format!("{}/{}", self.base, path))
            .map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        debug!("GET {}", url);
        let mut request = self.client.get(url.clone());
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status, url.path()));
        }

        response.json::<T>().await.map_err(|e| {
            ProviderError::Provider(format!("Invalid response from {}: {}", url.path(), e))
        })
    }

    fn status_error(status: StatusCode, path: &str) -> ProviderError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ProviderError::Forbidden(format!("{} returned {}", path, status))
            }
            StatusCode::NOT_FOUND => ProviderError::NotFound(path.to_string()),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
            StatusCode::BAD_REQUEST => {
                ProviderError::InvalidRequest(format!("{} returned {}", path, status))
            }
            s => ProviderError::Provider(format!("{} returned {}", path, s)),
        }
    }

    async fn fetch_page(
        &self,
        path: &str,
        id: AccountId,
        cursor: i64,
    ) -> Result<IdsPage, ProviderError> {
        let url = self.endpoint(
            path,
            &[
                ("user_id", id.to_string()),
                ("cursor", cursor.to_string()),
                ("count", self.page_size.to_string()),
            ],
        )?;
        self.get_json(url).await
    }

    /// Walk the cursor chain lazily. A failed page is reported as an error
    /// item and requested again on the next poll.
    fn listing(&self, path: &'static str, id: AccountId) -> ConnectionStream<'_> {
        let initial = PageState {
            cursor: -1,
            buffer: VecDeque::new(),
            exhausted: false,
        };

        stream::unfold(initial, move |mut state| async move {
            loop {
                if let Some(next) = state.buffer.pop_front() {
                    return Some((Ok(next), state));
                }
                if state.exhausted {
                    return None;
                }

                match self.fetch_page(path, id, state.cursor).await {
                    Ok(page) => {
                        debug!("{} page for {}: {} ids", path, id, page.ids.len());
                        state.buffer.extend(page.ids);
                        if page.next_cursor == 0 || page.next_cursor == state.cursor {
                            state.exhausted = true;
                        } else {
                            state.cursor = page.next_cursor;
                        }
                    }
                    Err(e) => return Some((Err(e), state)),
                }
            }
        })
        .boxed()
    }
}

impl GraphDataSource for HttpGraphSource {
    async fn resolve_account(&self, handle: &str) -> Result<AccountId, ProviderError> {
        let url = self.endpoint("users/show.json", &[("screen_name", handle.to_string())])?;
        let user: UserObject = self.get_json(url).await.map_err(|e| match e {
            ProviderError::NotFound(_) => ProviderError::NotFound(handle.to_string()),
            other => other,
        })?;

        info!(
            "Username: {} -> screen name: {} (id {})",
            handle,
            user.screen_name.as_deref().unwrap_or("?"),
            user.id
        );
        Ok(user.id)
    }

    fn outbound_connections(&self, id: AccountId) -> ConnectionStream<'_> {
        self.listing(FRIENDS_PATH, id)
    }

    fn inbound_connections(&self, id: AccountId) -> ConnectionStream<'_> {
        self.listing(FOLLOWERS_PATH, id)
    }

    async fn lookup_popularity(
        &self,
        ids: &[AccountId],
    ) -> Result<Vec<PopularityRecord>, ProviderError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = self.endpoint("users/lookup.json", &[("user_id", joined)])?;
        let users: Vec<UserObject> = match self.get_json(url).await {
            // None of the requested accounts exist any more
            Err(ProviderError::NotFound(_)) => Vec::new(),
            other => other?,
        };

        Ok(users
            .into_iter()
            .map(|user| PopularityRecord::new(user.id, user.followers_count))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path, query_param},
    };

    async fn collect(stream: ConnectionStream<'_>) -> Vec<Result<AccountId, ProviderError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_resolve_account() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/show.json"))
            .and(query_param("screen_name", "POTUS"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": 822215679726100480u64,
                    "screen_name": "POTUS"
                })),
            )
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let id = source.resolve_account("POTUS").await.unwrap();
        assert_eq!(id, AccountId(822215679726100480));
    }

    #[tokio::test]
    async fn test_resolve_unknown_account() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/show.json"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let result = source.resolve_account("ghost").await;
        assert_eq!(result, Err(ProviderError::NotFound("ghost".to_string())));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/show.json"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 5})))
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri())
            .unwrap()
            .with_token("s3cret");
        assert_eq!(source.resolve_account("five").await, Ok(AccountId(5)));
    }

    #[tokio::test]
    async fn test_listing_follows_cursors() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/friends/ids.json"))
            .and(query_param("user_id", "1"))
            .and(query_param("cursor", "-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ids": [2, 3], "next_cursor": 77})),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/friends/ids.json"))
            .and(query_param("cursor", "77"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ids": [4], "next_cursor": 0})),
            )
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let items = collect(source.outbound_connections(AccountId(1))).await;
        assert_eq!(items, vec![Ok(AccountId(2)), Ok(AccountId(3)), Ok(AccountId(4))]);
    }

    #[tokio::test]
    async fn test_page_size_sets_count() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/followers/ids.json"))
            .and(query_param("count", "200"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ids": [8], "next_cursor": 0})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri())
            .unwrap()
            .with_page_size(200);
        let items = collect(source.inbound_connections(AccountId(1))).await;
        assert_eq!(items, vec![Ok(AccountId(8))]);
    }

    #[tokio::test]
    async fn test_rate_limited_page_is_requested_again() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/followers/ids.json"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/followers/ids.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ids": [9], "next_cursor": 0})),
            )
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let items = collect(source.inbound_connections(AccountId(1))).await;
        assert_eq!(items, vec![Err(ProviderError::RateLimited), Ok(AccountId(9))]);
    }

    #[tokio::test]
    async fn test_private_listing_is_forbidden() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/friends/ids.json"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let mut stream = source.outbound_connections(AccountId(1));
        assert!(matches!(
            stream.next().await,
            Some(Err(ProviderError::Forbidden(_)))
        ));
    }

    #[tokio::test]
    async fn test_lookup_popularity() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/lookup.json"))
            .and(query_param("user_id", "2,3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 3, "followers_count": 30},
                {"id": 2, "followers_count": 20}
            ])))
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let records = source
            .lookup_popularity(&[AccountId(2), AccountId(3)])
            .await
            .unwrap();
        assert_eq!(
            records,
            vec![
                PopularityRecord::new(AccountId(3), 30),
                PopularityRecord::new(AccountId(2), 20)
            ]
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_transient() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/lookup.json"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let source = HttpGraphSource::new(&mock_server.uri()).unwrap();
        let error = source.lookup_popularity(&[AccountId(2)]).await.unwrap_err();
        assert!(error.is_transient());
    }

    #[test]
    fn test_invalid_base_is_rejected() {
        assert!(matches!(
            HttpGraphSource::new("not a url"),
            Err(ProviderError::InvalidRequest(_))
        ));
    }
}
