use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{
    CommentRepository, LikeRepository, PlaylistRepository, RepositoryError, Result,
    SubscriptionRepository, TweetRepository, UserRepository, VideoRepository,
};
use crate::ids::new_object_id;
use crate::models::{
    ChannelProfile, ChannelStats, Comment, CommentDetails, Like, LikeTarget, NewUser, NewVideo,
    OwnerProfile, Page, Playlist, PlaylistDetails, Subscription, Tweet, User, UserSecrets, Video,
    VideoDetails, VideoQuery, VideoSort,
};

struct UserRecord {
    user: User,
    password_hash: String,
    refresh_token: Option<String>,
}

#[derive(Default)]
struct Collections {
    users: Vec<UserRecord>,
    videos: Vec<Video>,
    comments: Vec<Comment>,
    tweets: Vec<Tweet>,
    likes: Vec<Like>,
    subscriptions: Vec<Subscription>,
    playlists: Vec<Playlist>,
}

impl Collections {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().map(|r| &r.user).find(|u| u.id == id)
    }

    fn user_record_mut(&mut self, id: &str) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|r| r.user.id == id)
    }

    fn video_details(&self, video: &Video) -> Option<VideoDetails> {
        let owner = self.user(&video.owner)?;
        Some(VideoDetails::new(video.clone(), OwnerProfile::from(owner)))
    }

    /// Expands `ids` in order, skipping missing videos and drafts `viewer` does not own.
    fn details_for_ids<'a>(
        &self,
        ids: impl Iterator<Item = &'a String>,
        viewer: &str,
    ) -> Vec<VideoDetails> {
        ids.filter_map(|id| self.videos.iter().find(|v| &v.id == id))
            .filter(|v| v.is_published || v.owner == viewer)
            .filter_map(|v| self.video_details(v))
            .collect()
    }

    fn playlist_details(&self, playlist: &Playlist, viewer: &str) -> PlaylistDetails {
        let videos = self.details_for_ids(playlist.videos.iter(), viewer);
        PlaylistDetails::new(playlist.clone(), videos)
    }

    fn ensure_unique(&self, id: Option<&str>, username: Option<&str>, email: Option<&str>) -> Result<()> {
        let others = self.users.iter().filter(|r| Some(r.user.id.as_str()) != id);
        for record in others {
            if username == Some(record.user.username.as_str()) {
                return Err(RepositoryError::Conflict(
                    "User with this username already exists".into(),
                ));
            }
            if email == Some(record.user.email.as_str()) {
                return Err(RepositoryError::Conflict(
                    "User with this email already exists".into(),
                ));
            }
        }
        Ok(())
    }

    fn unlike(&mut self, target: LikeTarget, ids: &[String]) {
        for like in self.likes.iter_mut() {
            let targets = like.targets_mut(target);
            let before = targets.len();
            targets.retain(|t| !ids.contains(t));
            if targets.len() != before {
                like.updated_at = Utc::now();
            }
        }
    }
}

fn skip_count(page: Page) -> usize {
    usize::try_from(page.offset()).unwrap_or(usize::MAX)
}

/// In-process store holding every collection behind one lock, so each
/// repository call observes and mutates a consistent snapshot.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut db = self.inner.lock().await;
        db.ensure_unique(None, Some(&user.username), Some(&user.email))?;

        let now = Utc::now();
        let created = User {
            id: new_object_id(),
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        db.users.push(UserRecord {
            user: created.clone(),
            password_hash: user.password_hash,
            refresh_token: None,
        });
        Ok(created)
    }

    async fn find(&self, id: &str) -> Result<Option<User>> {
        Ok(self.inner.lock().await.user(id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let db = self.inner.lock().await;
        Ok(db
            .users
            .iter()
            .find(|r| r.user.username == username)
            .map(|r| r.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let db = self.inner.lock().await;
        Ok(db
            .users
            .iter()
            .find(|r| r.user.email == email)
            .map(|r| r.user.clone()))
    }

    async fn find_secrets(&self, id: &str) -> Result<Option<UserSecrets>> {
        let db = self.inner.lock().await;
        Ok(db
            .users
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| UserSecrets {
                id: r.user.id.clone(),
                password_hash: r.password_hash.clone(),
                refresh_token: r.refresh_token.clone(),
            }))
    }

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()> {
        let mut db = self.inner.lock().await;
        if let Some(record) = db.user_record_mut(id) {
            record.refresh_token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn rotate_refresh_token(&self, id: &str, expected: &str, next: &str) -> Result<bool> {
        let mut db = self.inner.lock().await;
        match db.user_record_mut(id) {
            Some(record) if record.refresh_token.as_deref() == Some(expected) => {
                record.refresh_token = Some(next.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_password(&self, id: &str, password_hash: &str) -> Result<()> {
        let mut db = self.inner.lock().await;
        if let Some(record) = db.user_record_mut(id) {
            record.password_hash = password_hash.to_string();
            record.user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_account(&self, id: &str, full_name: &str, email: &str) -> Result<Option<User>> {
        let mut db = self.inner.lock().await;
        db.ensure_unique(Some(id), None, Some(email))?;
        Ok(db.user_record_mut(id).map(|record| {
            record.user.full_name = full_name.to_string();
            record.user.email = email.to_string();
            record.user.updated_at = Utc::now();
            record.user.clone()
        }))
    }

    async fn set_avatar(&self, id: &str, url: &str) -> Result<Option<User>> {
        let mut db = self.inner.lock().await;
        Ok(db.user_record_mut(id).map(|record| {
            record.user.avatar = url.to_string();
            record.user.updated_at = Utc::now();
            record.user.clone()
        }))
    }

    async fn set_cover_image(&self, id: &str, url: &str) -> Result<Option<User>> {
        let mut db = self.inner.lock().await;
        Ok(db.user_record_mut(id).map(|record| {
            record.user.cover_image = url.to_string();
            record.user.updated_at = Utc::now();
            record.user.clone()
        }))
    }

    async fn channel_profile(&self, username: &str, viewer: &str) -> Result<Option<ChannelProfile>> {
        let db = self.inner.lock().await;
        let user = match db.users.iter().find(|r| r.user.username == username) {
            Some(record) => &record.user,
            None => return Ok(None),
        };

        let subs = &db.subscriptions;
        Ok(Some(ChannelProfile {
            id: user.id.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            subscribers_count: subs.iter().filter(|s| s.channel == user.id).count() as i64,
            channels_subscribed_to_count: subs.iter().filter(|s| s.subscriber == user.id).count()
                as i64,
            is_subscribed: subs
                .iter()
                .any(|s| s.channel == user.id && s.subscriber == viewer),
        }))
    }

    async fn watch_history(&self, id: &str) -> Result<Vec<VideoDetails>> {
        let db = self.inner.lock().await;
        Ok(match db.user(id) {
            Some(user) => db.details_for_ids(user.watch_history.iter().rev(), id),
            None => Vec::new(),
        })
    }

    async fn record_watch(&self, id: &str, video: &str) -> Result<()> {
        let mut db = self.inner.lock().await;
        if let Some(record) = db.user_record_mut(id) {
            let history = &mut record.user.watch_history;
            history.retain(|v| v != video);
            history.push(video.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for MemoryStore {
    async fn create(&self, video: NewVideo) -> Result<Video> {
        let now = Utc::now();
        let created = Video {
            id: new_object_id(),
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: 0,
            is_published: true,
            owner: video.owner,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.videos.push(created.clone());
        Ok(created)
    }

    async fn find(&self, id: &str) -> Result<Option<Video>> {
        let db = self.inner.lock().await;
        Ok(db.videos.iter().find(|v| v.id == id).cloned())
    }

    async fn find_owned(&self, id: &str, owner: &str) -> Result<Option<Video>> {
        let db = self.inner.lock().await;
        Ok(db
            .videos
            .iter()
            .find(|v| v.id == id && v.owner == owner)
            .cloned())
    }

    async fn details(&self, id: &str) -> Result<Option<VideoDetails>> {
        let db = self.inner.lock().await;
        Ok(db
            .videos
            .iter()
            .find(|v| v.id == id)
            .and_then(|v| db.video_details(v)))
    }

    async fn list(&self, query: VideoQuery) -> Result<Vec<VideoDetails>> {
        let db = self.inner.lock().await;
        let search = query.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<&Video> = db
            .videos
            .iter()
            .filter(|v| v.is_published || v.owner == query.viewer)
            .filter(|v| query.owner.as_deref().map_or(true, |o| v.owner == o))
            .filter(|v| match &search {
                Some(needle) => {
                    v.title.to_lowercase().contains(needle)
                        || v.description.to_lowercase().contains(needle)
                }
                None => true,
            })
            .collect();

        match query.sort_by {
            VideoSort::CreatedAt => matches.sort_by_key(|v| v.created_at),
            VideoSort::Views => matches.sort_by_key(|v| v.views),
            VideoSort::Duration => matches.sort_by(|a, b| a.duration.total_cmp(&b.duration)),
            VideoSort::Title => matches.sort_by(|a, b| a.title.cmp(&b.title)),
        }
        if !query.ascending {
            matches.reverse();
        }

        Ok(matches
            .into_iter()
            .skip(skip_count(query.page))
            .take(query.page.limit as usize)
            .filter_map(|v| db.video_details(v))
            .collect())
    }

    async fn by_owner(&self, owner: &str, include_unpublished: bool) -> Result<Vec<Video>> {
        let db = self.inner.lock().await;
        Ok(db
            .videos
            .iter()
            .rev()
            .filter(|v| v.owner == owner && (v.is_published || include_unpublished))
            .cloned()
            .collect())
    }

    async fn update_owned(
        &self,
        id: &str,
        owner: &str,
        title: &str,
        description: &str,
        thumbnail: Option<&str>,
    ) -> Result<Option<Video>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .videos
            .iter_mut()
            .find(|v| v.id == id && v.owner == owner)
            .map(|video| {
                video.title = title.to_string();
                video.description = description.to_string();
                if let Some(thumbnail) = thumbnail {
                    video.thumbnail = thumbnail.to_string();
                }
                video.updated_at = Utc::now();
                video.clone()
            }))
    }

    async fn toggle_publish(&self, id: &str, owner: &str) -> Result<Option<Video>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .videos
            .iter_mut()
            .find(|v| v.id == id && v.owner == owner)
            .map(|video| {
                video.is_published = !video.is_published;
                video.updated_at = Utc::now();
                video.clone()
            }))
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        let mut db = self.inner.lock().await;
        if let Some(video) = db.videos.iter_mut().find(|v| v.id == id) {
            video.views += 1;
        }
        Ok(())
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut db = self.inner.lock().await;
        let before = db.videos.len();
        db.videos.retain(|v| !(v.id == id && v.owner == owner));
        if db.videos.len() == before {
            return Ok(false);
        }

        let comment_ids: Vec<String> = db
            .comments
            .iter()
            .filter(|c| c.video == id)
            .map(|c| c.id.clone())
            .collect();
        db.comments.retain(|c| c.video != id);

        db.unlike(LikeTarget::Video, &[id.to_string()]);
        db.unlike(LikeTarget::Comment, &comment_ids);

        let now = Utc::now();
        for playlist in db.playlists.iter_mut() {
            if playlist.videos.iter().any(|v| v == id) {
                playlist.videos.retain(|v| v != id);
                playlist.updated_at = now;
            }
        }
        for record in db.users.iter_mut() {
            record.user.watch_history.retain(|v| v != id);
        }
        Ok(true)
    }

    async fn channel_stats(&self, owner: &str) -> Result<ChannelStats> {
        let db = self.inner.lock().await;
        let owned: Vec<&Video> = db.videos.iter().filter(|v| v.owner == owner).collect();
        let total_likes = db
            .likes
            .iter()
            .flat_map(|l| l.videos.iter())
            .filter(|liked| owned.iter().any(|v| &v.id == *liked))
            .count();

        Ok(ChannelStats {
            total_views: owned.iter().map(|v| v.views).sum(),
            total_videos: owned.len() as i64,
            total_subscribers: db.subscriptions.iter().filter(|s| s.channel == owner).count()
                as i64,
            total_likes: total_likes as i64,
        })
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, video: &str, owner: &str, content: &str) -> Result<Comment> {
        let now = Utc::now();
        let comment = Comment {
            id: new_object_id(),
            content: content.to_string(),
            video: video.to_string(),
            owner: owner.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find(&self, id: &str) -> Result<Option<Comment>> {
        let db = self.inner.lock().await;
        Ok(db.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn for_video(&self, video: &str, page: Page) -> Result<Vec<CommentDetails>> {
        let db = self.inner.lock().await;
        Ok(db
            .comments
            .iter()
            .filter(|c| c.video == video)
            .filter_map(|c| {
                let owner = db.user(&c.owner)?;
                Some(CommentDetails {
                    id: c.id.clone(),
                    content: c.content.clone(),
                    video: c.video.clone(),
                    owner: OwnerProfile::from(owner),
                    created_at: c.created_at,
                    updated_at: c.updated_at,
                })
            })
            .skip(skip_count(page))
            .take(page.limit as usize)
            .collect())
    }

    async fn update_owned(&self, id: &str, owner: &str, content: &str) -> Result<Option<Comment>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .comments
            .iter_mut()
            .find(|c| c.id == id && c.owner == owner)
            .map(|comment| {
                comment.content = content.to_string();
                comment.updated_at = Utc::now();
                comment.clone()
            }))
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut db = self.inner.lock().await;
        let before = db.comments.len();
        db.comments.retain(|c| !(c.id == id && c.owner == owner));
        let deleted = db.comments.len() != before;
        if deleted {
            db.unlike(LikeTarget::Comment, &[id.to_string()]);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl TweetRepository for MemoryStore {
    async fn create(&self, owner: &str, content: &str) -> Result<Tweet> {
        let now = Utc::now();
        let tweet = Tweet {
            id: new_object_id(),
            content: content.to_string(),
            owner: owner.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.tweets.push(tweet.clone());
        Ok(tweet)
    }

    async fn find(&self, id: &str) -> Result<Option<Tweet>> {
        let db = self.inner.lock().await;
        Ok(db.tweets.iter().find(|t| t.id == id).cloned())
    }

    async fn by_owner(&self, owner: &str) -> Result<Vec<Tweet>> {
        let db = self.inner.lock().await;
        Ok(db
            .tweets
            .iter()
            .rev()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect())
    }

    async fn update_owned(&self, id: &str, owner: &str, content: &str) -> Result<Option<Tweet>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .tweets
            .iter_mut()
            .find(|t| t.id == id && t.owner == owner)
            .map(|tweet| {
                tweet.content = content.to_string();
                tweet.updated_at = Utc::now();
                tweet.clone()
            }))
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut db = self.inner.lock().await;
        let before = db.tweets.len();
        db.tweets.retain(|t| !(t.id == id && t.owner == owner));
        let deleted = db.tweets.len() != before;
        if deleted {
            db.unlike(LikeTarget::Tweet, &[id.to_string()]);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn toggle(&self, user: &str, target: LikeTarget, target_id: &str) -> Result<Like> {
        let mut db = self.inner.lock().await;
        let now = Utc::now();

        let index = match db.likes.iter().position(|l| l.liked_by == user) {
            Some(index) => index,
            None => {
                db.likes.push(Like {
                    id: new_object_id(),
                    liked_by: user.to_string(),
                    videos: Vec::new(),
                    tweets: Vec::new(),
                    comments: Vec::new(),
                    created_at: now,
                    updated_at: now,
                });
                db.likes.len() - 1
            }
        };

        let like = &mut db.likes[index];
        let targets = like.targets_mut(target);
        match targets.iter().position(|t| t == target_id) {
            Some(pos) => {
                targets.remove(pos);
            }
            None => targets.push(target_id.to_string()),
        }
        like.updated_at = now;
        Ok(like.clone())
    }

    async fn liked_videos(&self, user: &str) -> Result<Vec<VideoDetails>> {
        let db = self.inner.lock().await;
        let liked = match db.likes.iter().find(|l| l.liked_by == user) {
            Some(like) => like,
            None => return Ok(Vec::new()),
        };
        Ok(db.details_for_ids(liked.videos.iter(), user))
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn toggle(&self, subscriber: &str, channel: &str) -> Result<bool> {
        let mut db = self.inner.lock().await;
        let before = db.subscriptions.len();
        db.subscriptions
            .retain(|s| !(s.subscriber == subscriber && s.channel == channel));
        if db.subscriptions.len() != before {
            return Ok(false);
        }

        db.subscriptions.push(Subscription {
            id: new_object_id(),
            subscriber: subscriber.to_string(),
            channel: channel.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn subscribers(&self, channel: &str) -> Result<Vec<OwnerProfile>> {
        let db = self.inner.lock().await;
        Ok(db
            .subscriptions
            .iter()
            .rev()
            .filter(|s| s.channel == channel)
            .filter_map(|s| db.user(&s.subscriber).map(OwnerProfile::from))
            .collect())
    }

    async fn subscribed_channels(&self, subscriber: &str) -> Result<Vec<OwnerProfile>> {
        let db = self.inner.lock().await;
        Ok(db
            .subscriptions
            .iter()
            .rev()
            .filter(|s| s.subscriber == subscriber)
            .filter_map(|s| db.user(&s.channel).map(OwnerProfile::from))
            .collect())
    }
}

#[async_trait]
impl PlaylistRepository for MemoryStore {
    async fn create(&self, owner: &str, name: &str, description: &str) -> Result<Playlist> {
        let now = Utc::now();
        let playlist = Playlist {
            id: new_object_id(),
            name: name.to_string(),
            description: description.to_string(),
            owner: owner.to_string(),
            videos: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn find(&self, id: &str) -> Result<Option<Playlist>> {
        let db = self.inner.lock().await;
        Ok(db.playlists.iter().find(|p| p.id == id).cloned())
    }

    async fn find_owned(&self, id: &str, owner: &str) -> Result<Option<Playlist>> {
        let db = self.inner.lock().await;
        Ok(db
            .playlists
            .iter()
            .find(|p| p.id == id && p.owner == owner)
            .cloned())
    }

    async fn details(&self, id: &str, viewer: &str) -> Result<Option<PlaylistDetails>> {
        let db = self.inner.lock().await;
        Ok(db
            .playlists
            .iter()
            .find(|p| p.id == id)
            .map(|p| db.playlist_details(p, viewer)))
    }

    async fn by_owner(&self, owner: &str, viewer: &str) -> Result<Vec<PlaylistDetails>> {
        let db = self.inner.lock().await;
        Ok(db
            .playlists
            .iter()
            .rev()
            .filter(|p| p.owner == owner)
            .map(|p| db.playlist_details(p, viewer))
            .collect())
    }

    async fn update_owned(
        &self,
        id: &str,
        owner: &str,
        name: &str,
        description: &str,
    ) -> Result<Option<Playlist>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .playlists
            .iter_mut()
            .find(|p| p.id == id && p.owner == owner)
            .map(|playlist| {
                playlist.name = name.to_string();
                playlist.description = description.to_string();
                playlist.updated_at = Utc::now();
                playlist.clone()
            }))
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut db = self.inner.lock().await;
        let before = db.playlists.len();
        db.playlists.retain(|p| !(p.id == id && p.owner == owner));
        Ok(db.playlists.len() != before)
    }

    async fn add_video(&self, id: &str, owner: &str, video: &str) -> Result<Option<Playlist>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .playlists
            .iter_mut()
            .find(|p| p.id == id && p.owner == owner && !p.videos.iter().any(|v| v == video))
            .map(|playlist| {
                playlist.videos.push(video.to_string());
                playlist.updated_at = Utc::now();
                playlist.clone()
            }))
    }

    async fn remove_video(&self, id: &str, owner: &str, video: &str) -> Result<Option<Playlist>> {
        let mut db = self.inner.lock().await;
        Ok(db
            .playlists
            .iter_mut()
            .find(|p| p.id == id && p.owner == owner && p.videos.iter().any(|v| v == video))
            .map(|playlist| {
                playlist.videos.retain(|v| v != video);
                playlist.updated_at = Utc::now();
                playlist.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            full_name: name.to_uppercase(),
            avatar: format!("http://media/{}.png", name),
            cover_image: String::new(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_video(owner: &str, title: &str) -> NewVideo {
        NewVideo {
            video_file: format!("http://media/{}.mp4", title),
            thumbnail: format!("http://media/{}.png", title),
            title: title.to_string(),
            description: format!("about {}", title),
            duration: 12.5,
            owner: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username_and_email() {
        let store = MemoryStore::new();
        UserRepository::create(&store, new_user("alice")).await.unwrap();

        let err = UserRepository::create(&store, new_user("alice")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("username")));

        let mut other = new_user("bob");
        other.email = "alice@example.com".to_string();
        let err = UserRepository::create(&store, other).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(msg) if msg.contains("email")));
    }

    #[tokio::test]
    async fn refresh_rotation_is_compare_and_swap() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, new_user("alice")).await.unwrap();
        store.set_refresh_token(&user.id, Some("first")).await.unwrap();

        assert!(store.rotate_refresh_token(&user.id, "first", "second").await.unwrap());
        assert!(!store.rotate_refresh_token(&user.id, "first", "third").await.unwrap());

        let secrets = store.find_secrets(&user.id).await.unwrap().unwrap();
        assert_eq!(secrets.refresh_token.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn like_toggle_adds_then_removes() {
        let store = MemoryStore::new();
        let like = LikeRepository::toggle(&store, "u1", LikeTarget::Tweet, "t1").await.unwrap();
        assert_eq!(like.tweets, vec!["t1".to_string()]);

        let like = LikeRepository::toggle(&store, "u1", LikeTarget::Tweet, "t1").await.unwrap();
        assert!(like.tweets.is_empty());
        assert_eq!(store.inner.lock().await.likes.len(), 1);
    }

    #[tokio::test]
    async fn watching_again_moves_video_to_front_of_history() {
        let store = MemoryStore::new();
        let owner = UserRepository::create(&store, new_user("owner")).await.unwrap();
        let first = VideoRepository::create(&store, new_video(&owner.id, "first")).await.unwrap();
        let second = VideoRepository::create(&store, new_video(&owner.id, "second")).await.unwrap();

        store.record_watch(&owner.id, &first.id).await.unwrap();
        store.record_watch(&owner.id, &second.id).await.unwrap();
        store.record_watch(&owner.id, &first.id).await.unwrap();

        let history = store.watch_history(&owner.id).await.unwrap();
        let ids: Vec<_> = history.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn deleting_video_prunes_references() {
        let store = MemoryStore::new();
        let owner = UserRepository::create(&store, new_user("owner")).await.unwrap();
        let viewer = UserRepository::create(&store, new_user("viewer")).await.unwrap();
        let video = VideoRepository::create(&store, new_video(&owner.id, "clip")).await.unwrap();
        let comment = CommentRepository::create(&store, &video.id, &viewer.id, "nice")
            .await
            .unwrap();
        let playlist = PlaylistRepository::create(&store, &viewer.id, "mine", "")
            .await
            .unwrap();

        store.add_video(&playlist.id, &viewer.id, &video.id).await.unwrap();
        LikeRepository::toggle(&store, &viewer.id, LikeTarget::Video, &video.id).await.unwrap();
        LikeRepository::toggle(&store, &viewer.id, LikeTarget::Comment, &comment.id).await.unwrap();
        store.record_watch(&viewer.id, &video.id).await.unwrap();

        assert!(!VideoRepository::delete_owned(&store, &video.id, &viewer.id).await.unwrap());
        assert!(VideoRepository::delete_owned(&store, &video.id, &owner.id).await.unwrap());

        assert!(CommentRepository::find(&store, &comment.id).await.unwrap().is_none());
        {
            let db = store.inner.lock().await;
            let like = db.likes.iter().find(|l| l.liked_by == viewer.id).unwrap();
            assert!(like.videos.is_empty() && like.comments.is_empty());
        }
        let playlist = PlaylistRepository::find(&store, &playlist.id).await.unwrap().unwrap();
        assert!(playlist.videos.is_empty());
        assert!(store.watch_history(&viewer.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_hides_other_users_drafts_and_sorts_before_paging() {
        let store = MemoryStore::new();
        let owner = UserRepository::create(&store, new_user("owner")).await.unwrap();
        let viewer = UserRepository::create(&store, new_user("viewer")).await.unwrap();
        for title in ["b", "c", "a"] {
            VideoRepository::create(&store, new_video(&owner.id, title)).await.unwrap();
        }
        let draft = VideoRepository::create(&store, new_video(&owner.id, "draft")).await.unwrap();
        store.toggle_publish(&draft.id, &owner.id).await.unwrap();

        let query = |viewer: &str, number| VideoQuery {
            viewer: viewer.to_string(),
            owner: None,
            search: None,
            sort_by: VideoSort::Title,
            ascending: true,
            page: Page::new(Some(number), Some(2)),
        };

        let titles = |videos: Vec<VideoDetails>| {
            videos.into_iter().map(|v| v.title).collect::<Vec<_>>()
        };
        assert_eq!(titles(store.list(query(&viewer.id, 1)).await.unwrap()), vec!["a", "b"]);
        assert_eq!(titles(store.list(query(&viewer.id, 2)).await.unwrap()), vec!["c"]);
        assert_eq!(
            titles(store.list(query(&owner.id, 2)).await.unwrap()),
            vec!["c", "draft"]
        );
    }

    #[tokio::test]
    async fn playlist_add_is_idempotent_and_remove_requires_membership() {
        let store = MemoryStore::new();
        let playlist = PlaylistRepository::create(&store, "owner", "mix", "").await.unwrap();

        assert!(store.add_video(&playlist.id, "owner", "v1").await.unwrap().is_some());
        assert!(store.add_video(&playlist.id, "owner", "v1").await.unwrap().is_none());
        assert!(store.add_video(&playlist.id, "intruder", "v2").await.unwrap().is_none());

        assert!(store.remove_video(&playlist.id, "owner", "v2").await.unwrap().is_none());
        let updated = store.remove_video(&playlist.id, "owner", "v1").await.unwrap().unwrap();
        assert!(updated.videos.is_empty());
    }

    #[tokio::test]
    async fn subscription_toggle_flips_state() {
        let store = MemoryStore::new();
        assert!(SubscriptionRepository::toggle(&store, "a", "b").await.unwrap());
        assert!(!SubscriptionRepository::toggle(&store, "a", "b").await.unwrap());
        assert!(store.subscribers("b").await.unwrap().is_empty());
    }
}
