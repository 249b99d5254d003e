use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{
    CommentRepository, LikeRepository, PlaylistRepository, RepositoryError, Result,
    SubscriptionRepository, TweetRepository, UserRepository, VideoRepository,
};
use crate::ids::new_object_id;
use crate::models::{
    ChannelProfile, ChannelStats, Comment, CommentDetails, Like, LikeTarget, NewUser, NewVideo,
    OwnerProfile, Page, Playlist, PlaylistDetails, Tweet, User, UserSecrets, Video, VideoDetails,
    VideoQuery,
};

macro_rules! user_columns {
    () => {
        "id, username, email, full_name, avatar, cover_image, watch_history, created_at, updated_at"
    };
}

macro_rules! video_columns {
    () => {
        "id, video_file, thumbnail, title, description, duration, views, is_published, owner, created_at, updated_at"
    };
}

// Expects `videos v` and its owner joined as `users u`.
macro_rules! video_details_columns {
    () => {
        "v.id, v.video_file, v.thumbnail, v.title, v.description, v.duration, v.views, \
         v.is_published, v.created_at, v.updated_at, u.id AS owner_id, \
         u.username AS owner_username, u.full_name AS owner_full_name, u.avatar AS owner_avatar"
    };
}

macro_rules! comment_columns {
    () => {
        "id, content, video, owner, created_at, updated_at"
    };
}

macro_rules! tweet_columns {
    () => {
        "id, content, owner, created_at, updated_at"
    };
}

macro_rules! like_columns {
    () => {
        "id, liked_by, videos, tweets, comments, created_at, updated_at"
    };
}

macro_rules! playlist_columns {
    () => {
        "id, name, description, owner, videos, created_at, updated_at"
    };
}

/// PostgreSQL-backed store; every repository trait is implemented on it.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> ::std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn playlist_videos(&self, playlist: &str, viewer: &str) -> Result<Vec<VideoDetails>> {
        let rows = sqlx::query_as::<_, VideoDetailsRow>(concat!(
            "SELECT ",
            video_details_columns!(),
            " FROM playlists p \
             CROSS JOIN LATERAL unnest(p.videos) WITH ORDINALITY AS pv(video_id, position) \
             JOIN videos v ON v.id = pv.video_id \
             JOIN users u ON u.id = v.owner \
             WHERE p.id = $1 AND (v.is_published OR v.owner = $2) ORDER BY pv.position"
        ))
        .bind(playlist)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VideoDetails::from).collect())
    }
}

#[derive(FromRow)]
struct VideoDetailsRow {
    id: String,
    video_file: String,
    thumbnail: String,
    title: String,
    description: String,
    duration: f64,
    views: i64,
    is_published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_id: String,
    owner_username: String,
    owner_full_name: String,
    owner_avatar: String,
}

impl From<VideoDetailsRow> for VideoDetails {
    fn from(row: VideoDetailsRow) -> Self {
        VideoDetails {
            id: row.id,
            video_file: row.video_file,
            thumbnail: row.thumbnail,
            title: row.title,
            description: row.description,
            duration: row.duration,
            views: row.views,
            is_published: row.is_published,
            owner: OwnerProfile {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar: row.owner_avatar,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CommentDetailsRow {
    id: String,
    content: String,
    video: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_id: String,
    owner_username: String,
    owner_full_name: String,
    owner_avatar: String,
}

impl From<CommentDetailsRow> for CommentDetails {
    fn from(row: CommentDetailsRow) -> Self {
        CommentDetails {
            id: row.id,
            content: row.content,
            video: row.video,
            owner: OwnerProfile {
                id: row.owner_id,
                username: row.owner_username,
                full_name: row.owner_full_name,
                avatar: row.owner_avatar,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn map_unique(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            let message = db.message();
            if message.contains("users_username_key") {
                return RepositoryError::Conflict("User with this username already exists".into());
            }
            if message.contains("users_email_key") {
                return RepositoryError::Conflict("User with this email already exists".into());
            }
            return RepositoryError::Conflict("Record already exists".into());
        }
    }
    RepositoryError::Database(err)
}

fn sql_offset(page: Page) -> i64 {
    i64::try_from(page.offset()).unwrap_or(i64::MAX)
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (id, username, email, full_name, avatar, cover_image, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            user_columns!()
        ))
        .bind(new_object_id())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.avatar)
        .bind(&user.cover_image)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique)
    }

    async fn find(&self, id: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(concat!("SELECT ", user_columns!(), " FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_secrets(&self, id: &str) -> Result<Option<UserSecrets>> {
        Ok(sqlx::query_as::<_, UserSecrets>(
            "SELECT id, password_hash, refresh_token FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE users SET refresh_token = $2 WHERE id = $1")
            .bind(id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate_refresh_token(&self, id: &str, expected: &str, next: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $3 WHERE id = $1 AND refresh_token = $2",
        )
        .bind(id)
        .bind(expected)
        .bind(next)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_password(&self, id: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_account(&self, id: &str, full_name: &str, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET full_name = $2, email = $3, updated_at = now() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique)
    }

    async fn set_avatar(&self, id: &str, url: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET avatar = $2, updated_at = now() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn set_cover_image(&self, id: &str, url: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(concat!(
            "UPDATE users SET cover_image = $2, updated_at = now() WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn channel_profile(&self, username: &str, viewer: &str) -> Result<Option<ChannelProfile>> {
        Ok(sqlx::query_as::<_, ChannelProfile>(
            "SELECT u.id, u.username, u.full_name, u.email, u.avatar, u.cover_image, \
               (SELECT COUNT(*) FROM subscriptions s WHERE s.channel = u.id) AS subscribers_count, \
               (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber = u.id) AS channels_subscribed_to_count, \
               EXISTS (SELECT 1 FROM subscriptions s WHERE s.channel = u.id AND s.subscriber = $2) AS is_subscribed \
             FROM users u WHERE u.username = $1",
        )
        .bind(username)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn watch_history(&self, id: &str) -> Result<Vec<VideoDetails>> {
        let rows = sqlx::query_as::<_, VideoDetailsRow>(concat!(
            "SELECT ",
            video_details_columns!(),
            " FROM users w \
             CROSS JOIN LATERAL unnest(w.watch_history) WITH ORDINALITY AS h(video_id, position) \
             JOIN videos v ON v.id = h.video_id \
             JOIN users u ON u.id = v.owner \
             WHERE w.id = $1 AND (v.is_published OR v.owner = $1) ORDER BY h.position DESC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VideoDetails::from).collect())
    }

    async fn record_watch(&self, id: &str, video: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET watch_history = array_append(array_remove(watch_history, $2), $2) \
             WHERE id = $1",
        )
        .bind(id)
        .bind(video)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for PgStore {
    async fn create(&self, video: NewVideo) -> Result<Video> {
        Ok(sqlx::query_as::<_, Video>(concat!(
            "INSERT INTO videos (id, video_file, thumbnail, title, description, duration, owner) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            video_columns!()
        ))
        .bind(new_object_id())
        .bind(&video.video_file)
        .bind(&video.thumbnail)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.duration)
        .bind(&video.owner)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find(&self, id: &str) -> Result<Option<Video>> {
        Ok(sqlx::query_as::<_, Video>(concat!("SELECT ", video_columns!(), " FROM videos WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_owned(&self, id: &str, owner: &str) -> Result<Option<Video>> {
        Ok(sqlx::query_as::<_, Video>(concat!(
            "SELECT ",
            video_columns!(),
            " FROM videos WHERE id = $1 AND owner = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn details(&self, id: &str) -> Result<Option<VideoDetails>> {
        let row = sqlx::query_as::<_, VideoDetailsRow>(concat!(
            "SELECT ",
            video_details_columns!(),
            " FROM videos v JOIN users u ON u.id = v.owner WHERE v.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(VideoDetails::from))
    }

    async fn list(&self, query: VideoQuery) -> Result<Vec<VideoDetails>> {
        let mut builder = QueryBuilder::<Postgres>::new(concat!(
            "SELECT ",
            video_details_columns!(),
            " FROM videos v JOIN users u ON u.id = v.owner WHERE (v.is_published OR v.owner = "
        ));
        builder.push_bind(query.viewer).push(")");

        if let Some(owner) = query.owner {
            builder.push(" AND v.owner = ").push_bind(owner);
        }
        if let Some(search) = query.search {
            let pattern = like_pattern(&search);
            builder
                .push(" AND (v.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR v.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        let direction = if query.ascending { "ASC" } else { "DESC" };
        builder.push(format!(
            " ORDER BY v.{column} {direction}, v.id {direction}",
            column = query.sort_by.column(),
            direction = direction
        ));
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(query.page.limit))
            .push(" OFFSET ")
            .push_bind(sql_offset(query.page));

        let rows = builder
            .build_query_as::<VideoDetailsRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(VideoDetails::from).collect())
    }

    async fn by_owner(&self, owner: &str, include_unpublished: bool) -> Result<Vec<Video>> {
        Ok(sqlx::query_as::<_, Video>(concat!(
            "SELECT ",
            video_columns!(),
            " FROM videos WHERE owner = $1 AND (is_published OR $2) ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .bind(include_unpublished)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_owned(
        &self,
        id: &str,
        owner: &str,
        title: &str,
        description: &str,
        thumbnail: Option<&str>,
    ) -> Result<Option<Video>> {
        Ok(sqlx::query_as::<_, Video>(concat!(
            "UPDATE videos SET title = $3, description = $4, thumbnail = COALESCE($5, thumbnail), \
             updated_at = now() WHERE id = $1 AND owner = $2 RETURNING ",
            video_columns!()
        ))
        .bind(id)
        .bind(owner)
        .bind(title)
        .bind(description)
        .bind(thumbnail)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn toggle_publish(&self, id: &str, owner: &str) -> Result<Option<Video>> {
        Ok(sqlx::query_as::<_, Video>(concat!(
            "UPDATE videos SET is_published = NOT is_published, updated_at = now() \
             WHERE id = $1 AND owner = $2 RETURNING ",
            video_columns!()
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn increment_views(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE videos SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM videos WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let comment_ids: Vec<String> =
            sqlx::query_scalar("DELETE FROM comments WHERE video = $1 RETURNING id")
                .bind(id)
                .fetch_all(&mut tx)
                .await?;

        sqlx::query(
            "UPDATE likes SET videos = array_remove(videos, $1), \
               comments = ARRAY(SELECT c FROM unnest(comments) AS c WHERE NOT (c = ANY($2))), \
               updated_at = now() \
             WHERE $1 = ANY(videos) OR comments && $2",
        )
        .bind(id)
        .bind(&comment_ids[..])
        .execute(&mut tx)
        .await?;

        sqlx::query(
            "UPDATE playlists SET videos = array_remove(videos, $1), updated_at = now() \
             WHERE $1 = ANY(videos)",
        )
        .bind(id)
        .execute(&mut tx)
        .await?;

        sqlx::query(
            "UPDATE users SET watch_history = array_remove(watch_history, $1) \
             WHERE $1 = ANY(watch_history)",
        )
        .bind(id)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn channel_stats(&self, owner: &str) -> Result<ChannelStats> {
        Ok(sqlx::query_as::<_, ChannelStats>(
            "SELECT \
               (SELECT COALESCE(SUM(views), 0)::BIGINT FROM videos WHERE owner = $1) AS total_views, \
               (SELECT COUNT(*) FROM videos WHERE owner = $1) AS total_videos, \
               (SELECT COUNT(*) FROM subscriptions WHERE channel = $1) AS total_subscribers, \
               (SELECT COUNT(*) FROM likes l \
                  CROSS JOIN LATERAL unnest(l.videos) AS lv(video_id) \
                  JOIN videos v ON v.id = lv.video_id \
                WHERE v.owner = $1) AS total_likes",
        )
        .bind(owner)
        .fetch_one(&self.pool)
        .await?)
    }
}

#[async_trait]
impl CommentRepository for PgStore {
    async fn create(&self, video: &str, owner: &str, content: &str) -> Result<Comment> {
        Ok(sqlx::query_as::<_, Comment>(concat!(
            "INSERT INTO comments (id, content, video, owner) VALUES ($1, $2, $3, $4) RETURNING ",
            comment_columns!()
        ))
        .bind(new_object_id())
        .bind(content)
        .bind(video)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find(&self, id: &str) -> Result<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(concat!("SELECT ", comment_columns!(), " FROM comments WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn for_video(&self, video: &str, page: Page) -> Result<Vec<CommentDetails>> {
        let rows = sqlx::query_as::<_, CommentDetailsRow>(
            "SELECT c.id, c.content, c.video, c.created_at, c.updated_at, u.id AS owner_id, \
               u.username AS owner_username, u.full_name AS owner_full_name, u.avatar AS owner_avatar \
             FROM comments c JOIN users u ON u.id = c.owner \
             WHERE c.video = $1 ORDER BY c.created_at ASC, c.id ASC LIMIT $2 OFFSET $3",
        )
        .bind(video)
        .bind(i64::from(page.limit))
        .bind(sql_offset(page))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CommentDetails::from).collect())
    }

    async fn update_owned(&self, id: &str, owner: &str, content: &str) -> Result<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(concat!(
            "UPDATE comments SET content = $3, updated_at = now() WHERE id = $1 AND owner = $2 RETURNING ",
            comment_columns!()
        ))
        .bind(id)
        .bind(owner)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut tx)
            .await?
            .rows_affected();
        if deleted == 1 {
            sqlx::query(
                "UPDATE likes SET comments = array_remove(comments, $1), updated_at = now() \
                 WHERE $1 = ANY(comments)",
            )
            .bind(id)
            .execute(&mut tx)
            .await?;
        }
        tx.commit().await?;
        Ok(deleted == 1)
    }
}

#[async_trait]
impl TweetRepository for PgStore {
    async fn create(&self, owner: &str, content: &str) -> Result<Tweet> {
        Ok(sqlx::query_as::<_, Tweet>(concat!(
            "INSERT INTO tweets (id, content, owner) VALUES ($1, $2, $3) RETURNING ",
            tweet_columns!()
        ))
        .bind(new_object_id())
        .bind(content)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find(&self, id: &str) -> Result<Option<Tweet>> {
        Ok(sqlx::query_as::<_, Tweet>(concat!("SELECT ", tweet_columns!(), " FROM tweets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn by_owner(&self, owner: &str) -> Result<Vec<Tweet>> {
        Ok(sqlx::query_as::<_, Tweet>(concat!(
            "SELECT ",
            tweet_columns!(),
            " FROM tweets WHERE owner = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_owned(&self, id: &str, owner: &str, content: &str) -> Result<Option<Tweet>> {
        Ok(sqlx::query_as::<_, Tweet>(concat!(
            "UPDATE tweets SET content = $3, updated_at = now() WHERE id = $1 AND owner = $2 RETURNING ",
            tweet_columns!()
        ))
        .bind(id)
        .bind(owner)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query("DELETE FROM tweets WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut tx)
            .await?
            .rows_affected();
        if deleted == 1 {
            sqlx::query(
                "UPDATE likes SET tweets = array_remove(tweets, $1), updated_at = now() \
                 WHERE $1 = ANY(tweets)",
            )
            .bind(id)
            .execute(&mut tx)
            .await?;
        }
        tx.commit().await?;
        Ok(deleted == 1)
    }
}

#[async_trait]
impl LikeRepository for PgStore {
    async fn toggle(&self, user: &str, target: LikeTarget, target_id: &str) -> Result<Like> {
        sqlx::query("INSERT INTO likes (id, liked_by) VALUES ($1, $2) ON CONFLICT (liked_by) DO NOTHING")
            .bind(new_object_id())
            .bind(user)
            .execute(&self.pool)
            .await?;

        // Evaluated against the locked row; concurrent toggles serialize.
        let sql = format!(
            "UPDATE likes SET {column} = CASE WHEN $2 = ANY({column}) \
               THEN array_remove({column}, $2) ELSE array_append({column}, $2) END, \
               updated_at = now() \
             WHERE liked_by = $1 RETURNING {returning}",
            column = target.column(),
            returning = like_columns!()
        );
        Ok(sqlx::query_as::<_, Like>(&sql)
            .bind(user)
            .bind(target_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn liked_videos(&self, user: &str) -> Result<Vec<VideoDetails>> {
        let rows = sqlx::query_as::<_, VideoDetailsRow>(concat!(
            "SELECT ",
            video_details_columns!(),
            " FROM likes l \
             CROSS JOIN LATERAL unnest(l.videos) WITH ORDINALITY AS lv(video_id, position) \
             JOIN videos v ON v.id = lv.video_id \
             JOIN users u ON u.id = v.owner \
             WHERE l.liked_by = $1 AND (v.is_published OR v.owner = $1) \
             ORDER BY lv.position"
        ))
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(VideoDetails::from).collect())
    }
}

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn toggle(&self, subscriber: &str, channel: &str) -> Result<bool> {
        let removed = sqlx::query("DELETE FROM subscriptions WHERE subscriber = $1 AND channel = $2")
            .bind(subscriber)
            .bind(channel)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if removed > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO subscriptions (id, subscriber, channel) VALUES ($1, $2, $3) \
             ON CONFLICT (subscriber, channel) DO NOTHING",
        )
        .bind(new_object_id())
        .bind(subscriber)
        .bind(channel)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    async fn subscribers(&self, channel: &str) -> Result<Vec<OwnerProfile>> {
        Ok(sqlx::query_as::<_, OwnerProfile>(
            "SELECT u.id, u.username, u.full_name, u.avatar FROM subscriptions s \
             JOIN users u ON u.id = s.subscriber \
             WHERE s.channel = $1 ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(channel)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn subscribed_channels(&self, subscriber: &str) -> Result<Vec<OwnerProfile>> {
        Ok(sqlx::query_as::<_, OwnerProfile>(
            "SELECT u.id, u.username, u.full_name, u.avatar FROM subscriptions s \
             JOIN users u ON u.id = s.channel \
             WHERE s.subscriber = $1 ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(subscriber)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl PlaylistRepository for PgStore {
    async fn create(&self, owner: &str, name: &str, description: &str) -> Result<Playlist> {
        Ok(sqlx::query_as::<_, Playlist>(concat!(
            "INSERT INTO playlists (id, name, description, owner) VALUES ($1, $2, $3, $4) RETURNING ",
            playlist_columns!()
        ))
        .bind(new_object_id())
        .bind(name)
        .bind(description)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn find(&self, id: &str) -> Result<Option<Playlist>> {
        Ok(sqlx::query_as::<_, Playlist>(concat!("SELECT ", playlist_columns!(), " FROM playlists WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_owned(&self, id: &str, owner: &str) -> Result<Option<Playlist>> {
        Ok(sqlx::query_as::<_, Playlist>(concat!(
            "SELECT ",
            playlist_columns!(),
            " FROM playlists WHERE id = $1 AND owner = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn details(&self, id: &str, viewer: &str) -> Result<Option<PlaylistDetails>> {
        match PlaylistRepository::find(self, id).await? {
            Some(playlist) => {
                let videos = self.playlist_videos(&playlist.id, viewer).await?;
                Ok(Some(PlaylistDetails::new(playlist, videos)))
            }
            None => Ok(None),
        }
    }

    async fn by_owner(&self, owner: &str, viewer: &str) -> Result<Vec<PlaylistDetails>> {
        let playlists = sqlx::query_as::<_, Playlist>(concat!(
            "SELECT ",
            playlist_columns!(),
            " FROM playlists WHERE owner = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            let videos = self.playlist_videos(&playlist.id, viewer).await?;
            details.push(PlaylistDetails::new(playlist, videos));
        }
        Ok(details)
    }

    async fn update_owned(
        &self,
        id: &str,
        owner: &str,
        name: &str,
        description: &str,
    ) -> Result<Option<Playlist>> {
        Ok(sqlx::query_as::<_, Playlist>(concat!(
            "UPDATE playlists SET name = $3, description = $4, updated_at = now() \
             WHERE id = $1 AND owner = $2 RETURNING ",
            playlist_columns!()
        ))
        .bind(id)
        .bind(owner)
        .bind(name)
        .bind(description)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_owned(&self, id: &str, owner: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_video(&self, id: &str, owner: &str, video: &str) -> Result<Option<Playlist>> {
        Ok(sqlx::query_as::<_, Playlist>(concat!(
            "UPDATE playlists SET videos = array_append(videos, $3), updated_at = now() \
             WHERE id = $1 AND owner = $2 AND NOT ($3 = ANY(videos)) RETURNING ",
            playlist_columns!()
        ))
        .bind(id)
        .bind(owner)
        .bind(video)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn remove_video(&self, id: &str, owner: &str, video: &str) -> Result<Option<Playlist>> {
        Ok(sqlx::query_as::<_, Playlist>(concat!(
            "UPDATE playlists SET videos = array_remove(videos, $3), updated_at = now() \
             WHERE id = $1 AND owner = $2 AND $3 = ANY(videos) RETURNING ",
            playlist_columns!()
        ))
        .bind(id)
        .bind(owner)
        .bind(video)
        .fetch_optional(&self.pool)
        .await?)
    }
}
