use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ChannelProfile, ChannelStats, Comment, CommentDetails, Like, LikeTarget, NewUser, NewVideo,
    OwnerProfile, Page, Playlist, PlaylistDetails, Tweet, User, UserSecrets, Video, VideoDetails,
    VideoQuery,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type Result<T> = ::std::result::Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find(&self, id: &str) -> Result<Option<User>>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_secrets(&self, id: &str) -> Result<Option<UserSecrets>>;

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()>;
    /// Replaces the stored refresh token only if it still equals `expected`.
    async fn rotate_refresh_token(&self, id: &str, expected: &str, next: &str) -> Result<bool>;
    async fn set_password(&self, id: &str, password_hash: &str) -> Result<()>;

    async fn update_account(&self, id: &str, full_name: &str, email: &str) -> Result<Option<User>>;
    async fn set_avatar(&self, id: &str, url: &str) -> Result<Option<User>>;
    async fn set_cover_image(&self, id: &str, url: &str) -> Result<Option<User>>;

    async fn channel_profile(&self, username: &str, viewer: &str) -> Result<Option<ChannelProfile>>;
    /// Most recently watched first; other users' drafts are left out.
    async fn watch_history(&self, id: &str) -> Result<Vec<VideoDetails>>;
    async fn record_watch(&self, id: &str, video: &str) -> Result<()>;
}

#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn create(&self, video: NewVideo) -> Result<Video>;
    async fn find(&self, id: &str) -> Result<Option<Video>>;
    async fn find_owned(&self, id: &str, owner: &str) -> Result<Option<Video>>;
    async fn details(&self, id: &str) -> Result<Option<VideoDetails>>;
    async fn list(&self, query: VideoQuery) -> Result<Vec<VideoDetails>>;
    /// Newest first; unpublished videos only when `include_unpublished`.
    async fn by_owner(&self, owner: &str, include_unpublished: bool) -> Result<Vec<Video>>;

    /// `thumbnail` of `None` keeps the current one.
    async fn update_owned(
        &self,
        id: &str,
        owner: &str,
        title: &str,
        description: &str,
        thumbnail: Option<&str>,
    ) -> Result<Option<Video>>;
    async fn toggle_publish(&self, id: &str, owner: &str) -> Result<Option<Video>>;
    async fn increment_views(&self, id: &str) -> Result<()>;
    /// Removes the video, its comments, and every reference to either.
    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool>;

    async fn channel_stats(&self, owner: &str) -> Result<ChannelStats>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(&self, video: &str, owner: &str, content: &str) -> Result<Comment>;
    async fn find(&self, id: &str) -> Result<Option<Comment>>;
    /// Oldest first.
    async fn for_video(&self, video: &str, page: Page) -> Result<Vec<CommentDetails>>;
    async fn update_owned(&self, id: &str, owner: &str, content: &str) -> Result<Option<Comment>>;
    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool>;
}

#[async_trait]
pub trait TweetRepository: Send + Sync {
    async fn create(&self, owner: &str, content: &str) -> Result<Tweet>;
    async fn find(&self, id: &str) -> Result<Option<Tweet>>;
    /// Newest first.
    async fn by_owner(&self, owner: &str) -> Result<Vec<Tweet>>;
    async fn update_owned(&self, id: &str, owner: &str, content: &str) -> Result<Option<Tweet>>;
    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Adds `target_id` if absent, removes it if present, in one step.
    async fn toggle(&self, user: &str, target: LikeTarget, target_id: &str) -> Result<Like>;
    async fn liked_videos(&self, user: &str) -> Result<Vec<VideoDetails>>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Returns whether the subscriber follows the channel afterwards.
    async fn toggle(&self, subscriber: &str, channel: &str) -> Result<bool>;
    async fn subscribers(&self, channel: &str) -> Result<Vec<OwnerProfile>>;
    async fn subscribed_channels(&self, subscriber: &str) -> Result<Vec<OwnerProfile>>;
}

#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    async fn create(&self, owner: &str, name: &str, description: &str) -> Result<Playlist>;
    async fn find(&self, id: &str) -> Result<Option<Playlist>>;
    async fn find_owned(&self, id: &str, owner: &str) -> Result<Option<Playlist>>;
    /// Expanded videos exclude drafts `viewer` does not own.
    async fn details(&self, id: &str, viewer: &str) -> Result<Option<PlaylistDetails>>;
    async fn by_owner(&self, owner: &str, viewer: &str) -> Result<Vec<PlaylistDetails>>;
    async fn update_owned(
        &self,
        id: &str,
        owner: &str,
        name: &str,
        description: &str,
    ) -> Result<Option<Playlist>>;
    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool>;
    /// `None` when the video is already in the playlist.
    async fn add_video(&self, id: &str, owner: &str, video: &str) -> Result<Option<Playlist>>;
    /// `None` when the video is not in the playlist.
    async fn remove_video(&self, id: &str, owner: &str, video: &str) -> Result<Option<Playlist>>;
}
