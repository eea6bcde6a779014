//! Account snapshot returned by `/sessionid={credential}`.

use serde::Serialize;

/// Logged-in account, from `accounts/current_user`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountInfo {
    pub user_id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub is_private: bool,
    pub is_verified: bool,
    pub is_business: bool,
    pub profile_pic: String,
    pub bio: String,
    pub website: String,
    pub followers: u64,
    pub following: u64,
    pub posts: u64,
}

/// Public profile fields, from `users/web_profile_info`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileInfo {
    pub id: String,
    pub full_name: String,
    pub category: String,
    pub is_professional: bool,
    pub highlight_count: u64,
    pub has_clips: bool,
    pub has_guides: bool,
    pub public_email: String,
    pub public_phone: String,
    pub whatsapp_linked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: String,
    pub shortcode: String,
    /// `video_url` for videos, the largest `display_resources` entry for images.
    pub download_url: String,
    pub is_video: bool,
    pub likes: u64,
    pub comments: u64,
    pub caption: String,
    pub timestamp: i64,
    pub permalink: String,
}

/// Entry of the followers or following list.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_pic: String,
    pub is_verified: bool,
    pub is_private: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Story {
    pub id: String,
    pub is_video: bool,
    pub url: String,
    pub timestamp: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LikedPost {
    pub id: String,
    pub shortcode: String,
    pub username: String,
    pub caption: String,
    pub like_timestamp: i64,
    pub media_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedPost {
    pub id: String,
    pub shortcode: String,
    pub username: String,
    pub caption: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub post_id: String,
    pub comment_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadKind {
    Post,
    Story,
}

/// Downloadable media URL collected from posts and stories.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadLink {
    #[serde(rename = "type")]
    pub kind: DownloadKind,
    pub url: String,
    /// Id of the post or story the URL belongs to.
    pub source_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotStats {
    pub total_posts: usize,
    pub total_followers: usize,
    pub total_following: usize,
    pub total_stories: usize,
    pub total_liked: usize,
    pub total_saved: usize,
    pub total_comments: usize,
    pub total_downloads: usize,
    /// Seconds spent fetching, rounded to 2 decimals.
    pub processing_time: f64,
}

/// Everything gathered for one session.
///
/// Only `account` is guaranteed; every other section may be partial when an
/// upstream page failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountSnapshot {
    pub account: AccountInfo,
    pub profile: ProfileInfo,
    pub posts: Vec<Post>,
    pub followers: Vec<Connection>,
    pub following: Vec<Connection>,
    pub stories: Vec<Story>,
    pub liked_posts: Vec<LikedPost>,
    pub saved: Vec<SavedPost>,
    pub comments: Vec<Comment>,
    pub downloads: Vec<DownloadLink>,
    pub stats: SnapshotStats,
}

impl AccountSnapshot {
    pub(crate) fn record_download(&mut self, kind: DownloadKind, url: &str, source_id: &str) {
        if url.is_empty() {
            return;
        }
        self.downloads.push(DownloadLink {
            kind,
            url: url.to_string(),
            source_id: source_id.to_string(),
        });
    }

    /// Recount every list and stamp the elapsed time.
    pub(crate) fn finish(&mut self, elapsed_secs: f64) {
        self.stats = SnapshotStats {
            total_posts: self.posts.len(),
            total_followers: self.followers.len(),
            total_following: self.following.len(),
            total_stories: self.stories.len(),
            total_liked: self.liked_posts.len(),
            total_saved: self.saved.len(),
            total_comments: self.comments.len(),
            total_downloads: self.downloads.len(),
            processing_time: (elapsed_secs * 100.0).round() / 100.0,
        };
    }
}
