//! reqwest-backed [`AccountFetcher`] talking to Instagram's web and mobile APIs.

use super::types::{
    AccountInfo, AccountSnapshot, Comment, Connection, DownloadKind, LikedPost, Post, ProfileInfo, SavedPost, Story,
};
use super::{AccountFetcher, SessionId};
use crate::core::config::InstagramConfig;
use crate::core::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// GraphQL query for the timeline media of a user.
const POSTS_QUERY_HASH: &str = "69cba40317214236af40e7efa697781d";
const FOLLOWERS_QUERY_HASH: &str = "c76146de99bb02f6415203be841dd25a";
const FOLLOWING_QUERY_HASH: &str = "d04b0a864b4b54837c0d870b0e77e076";

/// Public post links always point at the canonical host.
const PERMALINK_BASE: &str = "https://www.instagram.com/p";

const SESSION_UNUSABLE: &str = "Session invalid. Account endpoint unreachable or not JSON";

/// Instagram media type code for videos.
const MEDIA_TYPE_VIDEO: u64 = 2;

pub struct InstagramClient {
    http: reqwest::Client,
    config: InstagramConfig,
}

impl InstagramClient {
    pub fn new(config: InstagramConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("X-IG-App-ID", header_value(&config.app_id)?);
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            header::REFERER,
            header_value(&format!("{}/", config.web_base.trim_end_matches('/')))?,
        );

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { http, config })
    }

    fn web_url(&self, path: &str) -> String {
        format!("{}{}", self.config.web_base.trim_end_matches('/'), path)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Authenticated GET returning the decoded JSON body.
    ///
    /// Non-success statuses surface as `AppError::Http` carrying the status.
    async fn get_json(
        &self,
        session: &SessionId,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> AppResult<Value> {
        let mut cookie = HeaderValue::from_str(&format!("sessionid={}", session.expose()))
            .map_err(|_| AppError::InvalidInput("Invalid session ID format".to_string()))?;
        cookie.set_sensitive(true);

        let response = self
            .http
            .get(url)
            .query(query)
            .header(header::COOKIE, cookie)
            .timeout(timeout)
            .send()
            .await
            .map_err(upstream_error)?
            .error_for_status()?;

        response.json::<Value>().await.map_err(upstream_error)
    }

    async fn fetch_account(&self, session: &SessionId) -> AppResult<AccountInfo> {
        let url = self.web_url("/api/v1/accounts/current_user/");
        let body = self
            .get_json(session, &url, &[("edit", "true")], self.config.request_timeout())
            .await
            .map_err(session_rejected)?;

        let user = body
            .get("user")
            .filter(|u| u.is_object())
            .ok_or_else(|| AppError::Unauthorized("Session invalid. No account in response".to_string()))?;

        let account = AccountInfo {
            user_id: id_at(user, "/pk"),
            username: str_at(user, "/username"),
            full_name: str_at(user, "/full_name"),
            email: str_or(user, "/email", "Not available"),
            phone: str_or(user, "/phone_number", "Not available"),
            is_private: bool_at(user, "/is_private"),
            is_verified: bool_at(user, "/is_verified"),
            is_business: bool_at(user, "/is_business"),
            profile_pic: str_at(user, "/hd_profile_pic_url_info/url"),
            bio: str_at(user, "/biography"),
            website: str_at(user, "/external_url"),
            followers: u64_at(user, "/follower_count"),
            following: u64_at(user, "/following_count"),
            posts: u64_at(user, "/media_count"),
        };

        if account.user_id.is_empty() || account.username.is_empty() {
            return Err(AppError::Unauthorized(
                "Session invalid. Account has no id or username".to_string(),
            ));
        }
        Ok(account)
    }

    async fn fetch_profile(&self, session: &SessionId, username: &str) -> AppResult<ProfileInfo> {
        let url = self.web_url("/api/v1/users/web_profile_info/");
        let body = self
            .get_json(session, &url, &[("username", username)], self.config.request_timeout())
            .await?;
        let user = body.pointer("/data/user").unwrap_or(&Value::Null);

        Ok(ProfileInfo {
            id: id_at(user, "/id"),
            full_name: str_at(user, "/full_name"),
            category: str_at(user, "/category_name"),
            is_professional: bool_at(user, "/is_professional"),
            highlight_count: u64_at(user, "/highlight_reel_count"),
            has_clips: bool_at(user, "/has_clips"),
            has_guides: bool_at(user, "/has_guides"),
            public_email: str_at(user, "/public_email"),
            public_phone: str_at(user, "/public_phone_number"),
            whatsapp_linked: bool_at(user, "/is_whatsapp_linked"),
        })
    }

    /// Walks a GraphQL edge connection of `user_id`, up to `pages` pages.
    ///
    /// A failed page ends the walk; nodes gathered so far are returned.
    async fn graphql_nodes(
        &self,
        session: &SessionId,
        query_hash: &str,
        edge: &str,
        user_id: &str,
        pages: usize,
        page_size: usize,
    ) -> Vec<Value> {
        let url = self.web_url("/graphql/query/");
        let mut nodes = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..pages {
            let variables = serde_json::json!({
                "id": user_id,
                "first": page_size,
                "after": cursor,
            })
            .to_string();
            let query = [("query_hash", query_hash), ("variables", variables.as_str())];

            let body = match self
                .get_json(session, &url, &query, self.config.request_timeout())
                .await
            {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(edge, page, "GraphQL page failed, keeping {} nodes: {}", nodes.len(), e);
                    break;
                }
            };

            let connection = body
                .get("data")
                .and_then(|d| d.get("user"))
                .and_then(|u| u.get(edge))
                .unwrap_or(&Value::Null);
            if let Some(edges) = connection.get("edges").and_then(Value::as_array) {
                nodes.extend(edges.iter().filter_map(|e| e.get("node")).cloned());
            }

            let next = connection
                .pointer("/page_info/has_next_page")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            cursor = connection
                .pointer("/page_info/end_cursor")
                .and_then(Value::as_str)
                .map(String::from);
            if !next || cursor.is_none() {
                break;
            }
            if page + 1 < pages {
                tokio::time::sleep(self.config.page_delay()).await;
            }
        }

        nodes
    }

    async fn fetch_posts(&self, session: &SessionId, user_id: &str) -> Vec<Post> {
        self.graphql_nodes(
            session,
            POSTS_QUERY_HASH,
            "edge_owner_to_timeline_media",
            user_id,
            self.config.posts_pages,
            self.config.posts_page_size,
        )
        .await
        .iter()
        .filter_map(post_from_node)
        .collect()
    }

    async fn fetch_connections(&self, session: &SessionId, user_id: &str, query_hash: &str, edge: &str) -> Vec<Connection> {
        self.graphql_nodes(
            session,
            query_hash,
            edge,
            user_id,
            self.config.follow_pages,
            self.config.follow_page_size,
        )
        .await
        .iter()
        .filter_map(connection_from_node)
        .collect()
    }

    async fn fetch_stories(&self, session: &SessionId, user_id: &str) -> AppResult<Vec<Story>> {
        let url = self.api_url("/api/v1/feed/reels_media/");
        let body = self
            .get_json(session, &url, &[("reel_ids", user_id)], self.config.request_timeout())
            .await?;

        let items = body
            .get("reels")
            .and_then(|reels| reels.get(user_id))
            .and_then(|reel| reel.get("items"))
            .and_then(Value::as_array);

        Ok(items
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let id = id_at(item, "/id");
                        if id.is_empty() {
                            return None;
                        }
                        let is_video = u64_at(item, "/media_type") == MEDIA_TYPE_VIDEO;
                        let url = if is_video {
                            str_at(item, "/video_versions/0/url")
                        } else {
                            str_at(item, "/image_versions2/candidates/0/url")
                        };
                        Some(Story {
                            id,
                            is_video,
                            url,
                            timestamp: i64_at(item, "/taken_at"),
                            expires_at: i64_at(item, "/expiring_at"),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_liked(&self, session: &SessionId) -> AppResult<Vec<LikedPost>> {
        let url = self.web_url("/api/v1/feed/liked/");
        let body = self.get_json(session, &url, &[], self.config.request_timeout()).await?;

        Ok(items(&body, "items", self.config.liked_limit)
            .map(|item| LikedPost {
                id: id_at(item, "/id"),
                shortcode: str_at(item, "/code"),
                username: str_at(item, "/user/username"),
                caption: str_at(item, "/caption/text"),
                like_timestamp: i64_at(item, "/like_ts"),
                media_url: str_at(item, "/image_versions2/candidates/0/url"),
            })
            .collect())
    }

    async fn fetch_saved(&self, session: &SessionId) -> AppResult<Vec<SavedPost>> {
        let url = self.api_url("/api/v1/feed/saved/");
        let body = self.get_json(session, &url, &[], self.config.request_timeout()).await?;

        Ok(items(&body, "items", self.config.saved_limit)
            .map(|item| {
                // The saved feed wraps each post in `media`; older payloads do not.
                let media = item.get("media").unwrap_or(item);
                SavedPost {
                    id: id_at(media, "/id"),
                    shortcode: str_at(media, "/code"),
                    username: str_at(media, "/user/username"),
                    caption: str_at(media, "/caption/text"),
                }
            })
            .collect())
    }

    async fn fetch_comments(&self, session: &SessionId, post_id: &str) -> AppResult<Vec<Comment>> {
        let url = self.web_url(&format!("/api/v1/media/{}/comments/", post_id));
        let body = self.get_json(session, &url, &[], self.config.comment_timeout()).await?;

        Ok(items(&body, "comments", self.config.comments_per_post)
            .map(|comment| Comment {
                post_id: post_id.to_string(),
                comment_id: id_at(comment, "/pk"),
                username: str_at(comment, "/user/username"),
                text: str_at(comment, "/text"),
                timestamp: i64_at(comment, "/created_at"),
            })
            .collect())
    }
}

#[async_trait]
impl AccountFetcher for InstagramClient {
    async fn fetch_snapshot(&self, session: &SessionId) -> AppResult<AccountSnapshot> {
        let started = Instant::now();
        tracing::info!(session = %session.preview(), "Fetching account snapshot");

        let account = self.fetch_account(session).await?;
        let user_id = account.user_id.clone();
        let username = account.username.clone();
        let mut snapshot = AccountSnapshot {
            account,
            ..Default::default()
        };

        match self.fetch_profile(session, &username).await {
            Ok(profile) => snapshot.profile = profile,
            Err(e) => tracing::warn!(%username, "Profile fetch failed: {}", e),
        }

        let posts = self.fetch_posts(session, &user_id).await;
        for post in &posts {
            snapshot.record_download(DownloadKind::Post, &post.download_url, &post.id);
        }
        snapshot.posts = posts;

        snapshot.followers = self
            .fetch_connections(session, &user_id, FOLLOWERS_QUERY_HASH, "edge_followed_by")
            .await;
        snapshot.following = self
            .fetch_connections(session, &user_id, FOLLOWING_QUERY_HASH, "edge_follow")
            .await;

        match self.fetch_stories(session, &user_id).await {
            Ok(stories) => {
                for story in &stories {
                    snapshot.record_download(DownloadKind::Story, &story.url, &story.id);
                }
                snapshot.stories = stories;
            }
            Err(e) => tracing::warn!("Stories fetch failed: {}", e),
        }

        match self.fetch_liked(session).await {
            Ok(liked) => snapshot.liked_posts = liked,
            Err(e) => tracing::warn!("Liked posts fetch failed: {}", e),
        }

        match self.fetch_saved(session).await {
            Ok(saved) => snapshot.saved = saved,
            Err(e) => tracing::warn!("Saved posts fetch failed: {}", e),
        }

        let post_ids: Vec<String> = snapshot
            .posts
            .iter()
            .take(self.config.comment_posts)
            .map(|p| p.id.clone())
            .collect();
        for (i, post_id) in post_ids.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.config.comment_delay()).await;
            }
            match self.fetch_comments(session, post_id).await {
                Ok(comments) => snapshot.comments.extend(comments),
                Err(e) => tracing::warn!(%post_id, "Comments fetch failed: {}", e),
            }
        }

        snapshot.finish(started.elapsed().as_secs_f64());
        tracing::info!(
            username = %snapshot.account.username,
            posts = snapshot.stats.total_posts,
            downloads = snapshot.stats.total_downloads,
            "Account snapshot ready in {:.2}s",
            snapshot.stats.processing_time
        );
        Ok(snapshot)
    }

    async fn probe_public(&self, username: &str) -> AppResult<bool> {
        let url = self.web_url(&format!("/{}/", username));
        let response = match self.http.get(&url).query(&[("__a", "1")]).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(upstream_error(e)),
            Err(e) => {
                tracing::warn!(%username, "Public profile probe failed: {}", e);
                return Err(AppError::NotFound("Test failed".to_string()));
            }
        };
        let exists = response.status().is_success();
        tracing::debug!(%username, status = %response.status(), exists, "Public profile probe");
        Ok(exists)
    }
}

fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| AppError::Internal(format!("Invalid header value {:?}: {}", value, e)))
}

/// Any failure of the account endpoint other than a timeout means the session
/// cannot be used. The upstream URL stays in the log, out of the message.
fn session_rejected(err: AppError) -> AppError {
    match err {
        AppError::Timeout(_) => err,
        AppError::Http(e) => match e.status() {
            Some(status) => AppError::Unauthorized(format!("Session invalid. Status: {}", status.as_u16())),
            None => {
                tracing::warn!("Account fetch failed: {}", e);
                AppError::Unauthorized(SESSION_UNUSABLE.to_string())
            }
        },
        other => {
            tracing::warn!("Account fetch failed: {}", other);
            AppError::Unauthorized(SESSION_UNUSABLE.to_string())
        }
    }
}

/// Timeouts become [`AppError::Timeout`]; everything else stays an HTTP error.
fn upstream_error(e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::Timeout("Instagram did not answer in time".to_string())
    } else {
        AppError::Http(e)
    }
}

fn post_from_node(node: &Value) -> Option<Post> {
    let shortcode = node.get("shortcode")?.as_str()?.to_string();
    let is_video = bool_at(node, "/is_video");
    let download_url = if is_video {
        str_at(node, "/video_url")
    } else {
        node.get("display_resources")
            .and_then(Value::as_array)
            .and_then(|resources| resources.last())
            .map(|r| str_at(r, "/src"))
            .unwrap_or_default()
    };

    Some(Post {
        id: id_at(node, "/id"),
        download_url,
        is_video,
        likes: u64_at(node, "/edge_liked_by/count"),
        comments: u64_at(node, "/edge_media_to_comment/count"),
        caption: str_at(node, "/edge_media_to_caption/edges/0/node/text"),
        timestamp: i64_at(node, "/taken_at_timestamp"),
        permalink: format!("{}/{}/", PERMALINK_BASE, shortcode),
        shortcode,
    })
}

fn connection_from_node(node: &Value) -> Option<Connection> {
    let id = id_at(node, "/id");
    if id.is_empty() {
        return None;
    }
    Some(Connection {
        id,
        username: str_at(node, "/username"),
        full_name: str_at(node, "/full_name"),
        profile_pic: str_at(node, "/profile_pic_url"),
        is_verified: bool_at(node, "/is_verified"),
        is_private: bool_at(node, "/is_private"),
    })
}

/// First `limit` objects of the array under `key`.
fn items<'a>(body: &'a Value, key: &str, limit: usize) -> impl Iterator<Item = &'a Value> {
    body.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
        .take(limit)
}

fn str_at(value: &Value, pointer: &str) -> String {
    str_or(value, pointer, "")
}

fn str_or(value: &Value, pointer: &str, default: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Ids arrive as strings or numbers depending on the endpoint.
fn id_at(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn u64_at(value: &Value, pointer: &str) -> u64 {
    value.pointer(pointer).and_then(Value::as_u64).unwrap_or(0)
}

fn i64_at(value: &Value, pointer: &str) -> i64 {
    value.pointer(pointer).and_then(Value::as_i64).unwrap_or(0)
}

fn bool_at(value: &Value, pointer: &str) -> bool {
    value.pointer(pointer).and_then(Value::as_bool).unwrap_or(false)
}
