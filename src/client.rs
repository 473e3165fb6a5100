use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://v2.api.noroff.dev/social/";
pub const API_KEY_HEADER: &str = "X-Noroff-API-Key";

/// Characters escaped when a caller-supplied value becomes a path segment
/// (usernames, reaction symbols).
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Yields the current bearer token, if a session is active.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("server error: {0}")]
    Server(String),
    #[error("network error: {0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

/// Per-request header toggles, everything on by default.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions {
    pub auth_token: bool,
    pub api_key: bool,
    pub content_type: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            auth_token: true,
            api_key: true,
            content_type: true,
        }
    }
}

/// Outcome of a successful request: either a JSON document or an explicit
/// no-content marker for 204 responses.
#[derive(Debug, Clone)]
pub enum Parsed {
    Json(Value),
    NoContent,
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct Client {
    http: HttpClient,
    base_url: Url,
    api_key: Option<String>,
    user_agent: String,
    tokens: Arc<dyn TokenProvider>,
}

impl Client {
    pub fn new(tokens: Arc<dyn TokenProvider>, config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            return Err(Error::Validation("client user agent required".into()));
        }
        let mut base = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|err| Error::Validation(format!("invalid base url {base}: {err}")))?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Client {
            http,
            base_url,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            user_agent: config.user_agent,
            tokens,
        })
    }

    /// Issues one request against the API. Non-2xx responses are collapsed
    /// into a single typed error carrying the server's best human-readable
    /// message; a 204 resolves to [`Parsed::NoContent`].
    pub fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
        body: Option<&Value>,
        opts: RequestOptions,
    ) -> Result<Parsed> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| Error::Validation(format!("invalid path {path}: {err}")))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }

        debug!(%method, %url, "api request");
        let mut req = self.http.request(method, url);
        req = req.header(USER_AGENT, self.user_agent.clone());
        if opts.auth_token {
            if let Some(token) = self.tokens.token() {
                req = req.header(AUTHORIZATION, format!("Bearer {token}"));
            }
        }
        if opts.api_key {
            if let Some(key) = &self.api_key {
                req = req.header(API_KEY_HEADER, key.clone());
            }
        }
        if let Some(body) = body {
            if opts.content_type {
                req = req.header(CONTENT_TYPE, "application/json");
            }
            req = req.body(serde_json::to_vec(body).map_err(|err| {
                Error::Validation(format!("unserializable request body: {err}"))
            })?);
        }

        let resp = req.send()?;
        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(Parsed::NoContent);
        }
        if status.is_success() {
            let value = resp
                .json::<Value>()
                .map_err(|err| Error::Server(format!("malformed response body: {err}")))?;
            return Ok(Parsed::Json(value));
        }

        let body = resp.text().unwrap_or_default();
        warn!(status = status.as_u16(), "api request failed");
        Err(normalize_error(status, &body))
    }

    fn get_json<T: DeserializeOwned>(&self, parsed: Parsed) -> Result<T> {
        match parsed {
            Parsed::Json(value) => serde_json::from_value(value)
                .map_err(|err| Error::Server(format!("unexpected response shape: {err}"))),
            Parsed::NoContent => Err(Error::Server("unexpected empty response".into())),
        }
    }

    // -- posts ------------------------------------------------------------

    pub fn get_post(&self, id: i64) -> Result<Post> {
        let params = [
            ("_author", "true".to_string()),
            ("_comments", "true".to_string()),
            ("_reactions", "true".to_string()),
        ];
        let parsed = self.request(
            Method::GET,
            &format!("posts/{id}"),
            &params,
            None,
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Post> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    pub fn list_posts(&self, limit: u32, page: u32, tag: Option<&str>) -> Result<Listing<Post>> {
        self.fetch_post_page("posts", limit, page, tag)
    }

    pub fn list_posts_by_user(
        &self,
        username: &str,
        limit: u32,
        page: u32,
        tag: Option<&str>,
    ) -> Result<Listing<Post>> {
        if username.trim().is_empty() {
            return Err(Error::Validation("username is required".into()));
        }
        let path = format!("profiles/{}/posts", encode_segment(username));
        self.fetch_post_page(&path, limit, page, tag)
    }

    fn fetch_post_page(
        &self,
        path: &str,
        limit: u32,
        page: u32,
        tag: Option<&str>,
    ) -> Result<Listing<Post>> {
        if limit == 0 || page == 0 {
            return Err(Error::Validation(
                "limit and page must be positive".into(),
            ));
        }
        let mut params = vec![
            ("limit", limit.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(tag) = tag {
            params.push(("_tag", tag.to_string()));
        }
        params.push(("_author", "true".to_string()));
        params.push(("_reactions", "true".to_string()));
        let parsed = self.request(Method::GET, path, &params, None, RequestOptions::default())?;
        self.get_json(parsed)
    }

    pub fn search_posts(&self, query: &str) -> Result<Listing<Post>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("search query must not be empty".into()));
        }
        let params = [
            ("q", query.to_string()),
            ("_author", "true".to_string()),
            ("_reactions", "true".to_string()),
        ];
        let parsed = self.request(
            Method::GET,
            "posts/search",
            &params,
            None,
            RequestOptions::default(),
        )?;
        self.get_json(parsed)
    }

    pub fn create_post(&self, post: &NewPost) -> Result<Post> {
        if post.title.trim().is_empty() {
            return Err(Error::Validation("post title is required".into()));
        }
        let body = serde_json::to_value(post)
            .map_err(|err| Error::Validation(format!("unserializable post: {err}")))?;
        let parsed = self.request(
            Method::POST,
            "posts",
            &[],
            Some(&body),
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Post> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    pub fn update_post(&self, id: i64, patch: &PostPatch) -> Result<Post> {
        let body = serde_json::to_value(patch)
            .map_err(|err| Error::Validation(format!("unserializable patch: {err}")))?;
        let parsed = self.request(
            Method::PUT,
            &format!("posts/{id}"),
            &[],
            Some(&body),
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Post> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    /// Idempotent from the caller's perspective: a post that is already
    /// gone resolves the same as a fresh 204. Authorization failures still
    /// surface.
    pub fn delete_post(&self, id: i64) -> Result<()> {
        let result = self.request(
            Method::DELETE,
            &format!("posts/{id}"),
            &[],
            None,
            RequestOptions::default(),
        );
        match result {
            Ok(_) => Ok(()),
            Err(Error::NotFound(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    // -- reactions --------------------------------------------------------

    /// Toggles `symbol` on a post and returns the server's full updated
    /// reaction set. Callers replace their local reaction state wholesale;
    /// the server alone computes membership under concurrent reactions.
    pub fn toggle_reaction(&self, post_id: i64, symbol: &str) -> Result<Vec<Reaction>> {
        if symbol.trim().is_empty() {
            return Err(Error::Validation("reaction symbol is required".into()));
        }
        let path = format!("posts/{post_id}/react/{}", encode_segment(symbol));
        let opts = RequestOptions {
            content_type: false,
            ..RequestOptions::default()
        };
        let parsed = self.request(Method::PUT, &path, &[], None, opts)?;
        let envelope: Envelope<ReactionPayload> = self.get_json(parsed)?;
        Ok(envelope.data.reactions)
    }

    // -- comments ---------------------------------------------------------

    /// Comments in server order; the API does not guarantee ordering, so
    /// display layers sort by creation time themselves.
    pub fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>> {
        let params = [("_comments", "true".to_string())];
        let parsed = self.request(
            Method::GET,
            &format!("posts/{post_id}"),
            &params,
            None,
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Post> = self.get_json(parsed)?;
        Ok(envelope.data.comments)
    }

    pub fn add_comment(&self, post_id: i64, body: &str) -> Result<Comment> {
        let body = body.trim();
        if body.is_empty() {
            return Err(Error::Validation("comment body must not be empty".into()));
        }
        let payload = serde_json::json!({ "body": body });
        let parsed = self.request(
            Method::POST,
            &format!("posts/{post_id}/comment"),
            &[],
            Some(&payload),
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Comment> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    pub fn delete_comment(&self, post_id: i64, comment_id: i64) -> Result<()> {
        self.request(
            Method::DELETE,
            &format!("posts/{post_id}/comment/{comment_id}"),
            &[],
            None,
            RequestOptions::default(),
        )?;
        Ok(())
    }

    // -- profiles ---------------------------------------------------------

    pub fn get_profile(&self, username: &str) -> Result<Profile> {
        if username.trim().is_empty() {
            return Err(Error::Validation("username is required".into()));
        }
        let params = [
            ("_followers", "true".to_string()),
            ("_following", "true".to_string()),
        ];
        let parsed = self.request(
            Method::GET,
            &format!("profiles/{}", encode_segment(username)),
            &params,
            None,
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Profile> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    pub fn update_profile(&self, username: &str, patch: &ProfilePatch) -> Result<Profile> {
        let body = serde_json::to_value(patch)
            .map_err(|err| Error::Validation(format!("unserializable patch: {err}")))?;
        let parsed = self.request(
            Method::PUT,
            &format!("profiles/{}", encode_segment(username)),
            &[],
            Some(&body),
            RequestOptions::default(),
        )?;
        let envelope: Envelope<Profile> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    pub fn follow(&self, username: &str) -> Result<FollowLists> {
        self.follow_toggle(username, "follow")
    }

    pub fn unfollow(&self, username: &str) -> Result<FollowLists> {
        self.follow_toggle(username, "unfollow")
    }

    fn follow_toggle(&self, username: &str, action: &str) -> Result<FollowLists> {
        if username.trim().is_empty() {
            return Err(Error::Validation("username is required".into()));
        }
        let path = format!("profiles/{}/{action}", encode_segment(username));
        let opts = RequestOptions {
            content_type: false,
            ..RequestOptions::default()
        };
        let parsed = self.request(Method::PUT, &path, &[], None, opts)?;
        let envelope: Envelope<FollowLists> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    // -- auth -------------------------------------------------------------

    pub fn login(&self, email: &str, password: &str) -> Result<AuthPayload> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::Validation("email and password are required".into()));
        }
        let payload = serde_json::json!({ "email": email, "password": password });
        let opts = RequestOptions {
            auth_token: false,
            api_key: false,
            content_type: true,
        };
        let parsed = self.request(Method::POST, "auth/login", &[], Some(&payload), opts)?;
        let envelope: Envelope<AuthPayload> = self.get_json(parsed)?;
        Ok(envelope.data)
    }

    pub fn register(&self, account: &NewAccount) -> Result<ProfileSummary> {
        if account.name.trim().is_empty()
            || account.email.trim().is_empty()
            || account.password.is_empty()
        {
            return Err(Error::Validation(
                "name, email, and password are required".into(),
            ));
        }
        let body = serde_json::to_value(account)
            .map_err(|err| Error::Validation(format!("unserializable account: {err}")))?;
        let opts = RequestOptions {
            auth_token: false,
            api_key: false,
            content_type: true,
        };
        let parsed = self.request(Method::POST, "auth/register", &[], Some(&body), opts)?;
        let envelope: Envelope<ProfileSummary> = self.get_json(parsed)?;
        Ok(envelope.data)
    }
}

fn normalize_error(status: StatusCode, body: &str) -> Error {
    let message = extract_message(body)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));
    match status.as_u16() {
        401 => Error::Auth(message),
        403 => Error::Forbidden(message),
        404 => Error::NotFound(message),
        409 => Error::Conflict(message),
        _ => Error::Server(message),
    }
}

/// Best-effort extraction of a human-readable message from an API error
/// body. Priority: `errors[0].message`, scalar `error`, then `message`.
fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(first) = value
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
    {
        if let Some(message) = first.get("message").and_then(Value::as_str) {
            return Some(message.to_string());
        }
    }
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Some(error.to_string());
    }
    value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

// -- wire models ----------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PageMeta {
    pub current_page: u32,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub is_first_page: bool,
    pub is_last_page: bool,
    pub page_count: u32,
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Listing<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileSummary {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<Media>,
    #[serde(default)]
    pub banner: Option<Media>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Reaction {
    pub symbol: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub reactors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReactionPayload {
    #[serde(default)]
    reactions: Vec<Reaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Comment {
    pub id: i64,
    #[serde(default, rename = "postId")]
    pub post_id: i64,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PostCounts {
    pub comments: i64,
    pub reactions: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<ProfileSummary>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, rename = "_count")]
    pub counts: PostCounts,
}

impl Post {
    /// Sum of reaction counts across every symbol on the post.
    pub fn reaction_total(&self) -> i64 {
        self.reactions.iter().map(|reaction| reaction.count).sum()
    }

    pub fn viewer_has_reacted(&self, symbol: &str, viewer: &str) -> bool {
        self.reactions
            .iter()
            .find(|reaction| reaction.symbol == symbol)
            .map(|reaction| reaction.reactors.iter().any(|name| name == viewer))
            .unwrap_or(false)
    }

    pub fn comment_count(&self) -> i64 {
        self.counts.comments.max(self.comments.len() as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewPost {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Partial update; omitted fields are left unchanged server-side.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<Media>,
    #[serde(default)]
    pub banner: Option<Media>,
    #[serde(default)]
    pub followers: Vec<ProfileSummary>,
    #[serde(default)]
    pub following: Vec<ProfileSummary>,
    #[serde(default, rename = "_count")]
    pub counts: ProfileCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileCounts {
    pub posts: i64,
    pub followers: i64,
    pub following: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Media>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FollowLists {
    #[serde(default)]
    pub followers: Vec<ProfileSummary>,
    #[serde(default)]
    pub following: Vec<ProfileSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthPayload {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "accessToken")]
    pub token: String,
    #[serde(default)]
    pub avatar: Option<Media>,
    #[serde(default)]
    pub banner: Option<Media>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Media>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoToken;

    impl TokenProvider for NoToken {
        fn token(&self) -> Option<String> {
            None
        }
    }

    fn offline_client() -> Client {
        // Unroutable port: any attempted request fails as a network error,
        // so a Validation result proves the call short-circuited.
        Client::new(
            Arc::new(NoToken),
            ClientConfig {
                base_url: Some("http://127.0.0.1:9/".into()),
                user_agent: "mingle-test/0".into(),
                timeout: Some(Duration::from_millis(200)),
                ..ClientConfig::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn message_extraction_priority() {
        let body = r#"{"errors":[{"message":"first"}],"error":"second","message":"third"}"#;
        assert_eq!(extract_message(body).as_deref(), Some("first"));

        let body = r#"{"error":"second","message":"third"}"#;
        assert_eq!(extract_message(body).as_deref(), Some("second"));

        let body = r#"{"message":"third"}"#;
        assert_eq!(extract_message(body).as_deref(), Some("third"));

        assert_eq!(extract_message("not json"), None);
        assert_eq!(extract_message("{}"), None);
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            normalize_error(StatusCode::UNAUTHORIZED, "{}"),
            Error::Auth(_)
        ));
        assert!(matches!(
            normalize_error(StatusCode::FORBIDDEN, "{}"),
            Error::Forbidden(_)
        ));
        assert!(matches!(
            normalize_error(StatusCode::NOT_FOUND, "{}"),
            Error::NotFound(_)
        ));
        assert!(matches!(
            normalize_error(StatusCode::CONFLICT, "{}"),
            Error::Conflict(_)
        ));
        assert!(matches!(
            normalize_error(StatusCode::INTERNAL_SERVER_ERROR, "{}"),
            Error::Server(_)
        ));
    }

    #[test]
    fn fallback_message_carries_status() {
        let err = normalize_error(StatusCode::BAD_GATEWAY, "");
        assert_eq!(err.to_string(), "server error: request failed with status 502");
    }

    #[test]
    fn blank_title_fails_before_network() {
        let client = offline_client();
        let result = client.create_post(&NewPost {
            title: "  ".into(),
            body: Some("x".into()),
            ..NewPost::default()
        });
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn empty_search_fails_before_network() {
        let client = offline_client();
        assert!(matches!(
            client.search_posts("   "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn blank_comment_fails_before_network() {
        let client = offline_client();
        assert!(matches!(
            client.add_comment(1, "  \n "),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn zero_page_is_rejected() {
        let client = offline_client();
        assert!(matches!(
            client.list_posts(12, 0, None),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn decodes_post_listing_envelope() {
        let raw = r#"{
            "data": [{
                "id": 7,
                "title": "Hello",
                "body": null,
                "tags": ["travel"],
                "author": {"name": "ida", "avatar": {"url": "http://a/i.png", "alt": ""}},
                "created": "2024-05-01T12:00:00.000Z",
                "reactions": [
                    {"symbol": "❤️", "count": 2, "reactors": ["ida", "bo"]},
                    {"symbol": "👍", "count": 1, "reactors": ["bo"]}
                ],
                "_count": {"comments": 3, "reactions": 3}
            }],
            "meta": {"currentPage": 1, "isFirstPage": true, "isLastPage": false,
                     "nextPage": 2, "previousPage": null, "pageCount": 4, "totalCount": 40}
        }"#;
        let listing: Listing<Post> = serde_json::from_str(raw).unwrap();
        assert_eq!(listing.data.len(), 1);
        let post = &listing.data[0];
        assert_eq!(post.reaction_total(), 3);
        assert!(post.viewer_has_reacted("❤️", "bo"));
        assert!(!post.viewer_has_reacted("👍", "ida"));
        assert_eq!(post.comment_count(), 3);
        assert_eq!(listing.meta.next_page, Some(2));
        assert!(!listing.meta.is_last_page);
    }

    #[test]
    fn patch_omits_unset_fields() {
        let patch = PostPatch {
            title: Some("new".into()),
            ..PostPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"title": "new"}));
    }

    #[test]
    fn reaction_symbol_is_escaped() {
        assert_eq!(encode_segment("❤️"), "%E2%9D%A4%EF%B8%8F");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
    }
}
