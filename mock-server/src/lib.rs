use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Media {
    pub uri: String,
    pub kind: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: Author,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub views: u64,
    /// The author for personal posts, the community for community posts.
    #[serde(skip)]
    pub owner: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<Post>,
    pub total_pages: u32,
    pub current_page: u32,
}

/// Fields accepted by create and update, from JSON or multipart.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInput {
    pub user_id: Option<String>,
    pub content: Option<String>,
    pub community_id: Option<String>,
    #[serde(skip)]
    pub media: Option<Media>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub user_id: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Posts, newest first.
pub type Db = Arc<RwLock<Vec<Post>>>;

/// Error responses carry `{"message": ...}`, like the real backend.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "post not found")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

pub fn app() -> Router {
    Router::new()
        .merge(feed_routes("/api/posts", Db::default()))
        .merge(feed_routes("/api/communities/posts", Db::default()))
        .route("/api/communities/join/{id}", post(request_join))
}

/// The endpoint family shared by personal and community lists.
fn feed_routes(base: &str, db: Db) -> Router {
    Router::new()
        .route(base, post(create_post))
        .route(
            &format!("{base}/{{id}}"),
            get(list_posts).put(update_post).delete(delete_post),
        )
        .route(&format!("{base}/like/{{id}}"), put(toggle_like))
        .route(&format!("{base}/comment/{{id}}"), post(add_comment))
        .route(&format!("{base}/share/{{id}}"), put(share_post))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_posts(
    State(db): State<Db>,
    Path(owner): Path<String>,
    Query(query): Query<PageQuery>,
) -> Json<PostPage> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);
    let posts = db.read().await;
    let owned: Vec<&Post> = posts.iter().filter(|p| p.owner == owner).collect();
    let total_pages = owned.len().div_ceil(limit as usize) as u32;
    let start = (page as usize - 1).saturating_mul(limit as usize);
    Json(PostPage {
        posts: owned
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect(),
        total_pages,
        current_page: page,
    })
}

async fn create_post(State(db): State<Db>, req: Request) -> Result<(StatusCode, Json<Post>), AppError> {
    let input = read_input(req).await?;
    let user_id = input
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::new(StatusCode::BAD_REQUEST, "userId is required"))?;
    let content = input.content.filter(|c| !c.trim().is_empty());
    if content.is_none() && input.media.is_none() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "post is empty"));
    }
    let post = Post {
        id: Uuid::new_v4().simple().to_string(),
        author: Author {
            id: user_id.clone(),
            name: user_id.clone(),
            avatar: None,
        },
        content,
        media: input.media,
        likes: Vec::new(),
        comments: Vec::new(),
        shares: 0,
        views: 0,
        owner: input.community_id.unwrap_or(user_id),
    };
    tracing::info!(id = %post.id, owner = %post.owner, "post created");
    db.write().await.insert(0, post.clone());
    Ok((StatusCode::CREATED, Json(post)))
}

async fn update_post(
    State(db): State<Db>,
    Path(id): Path<String>,
    req: Request,
) -> Result<Json<Post>, AppError> {
    let input = read_input(req).await?;
    let mut posts = db.write().await;
    let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(AppError::not_found)?;
    if let Some(content) = input.content {
        post.content = Some(content);
    }
    if let Some(media) = input.media {
        post.media = Some(media);
    }
    Ok(Json(post.clone()))
}

async fn delete_post(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut posts = db.write().await;
    let before = posts.len();
    posts.retain(|p| p.id != id);
    if posts.len() == before {
        return Err(AppError::not_found());
    }
    tracing::info!(%id, "post deleted");
    Ok(Json(json!({})))
}

async fn toggle_like(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UserRef>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut posts = db.write().await;
    let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(AppError::not_found)?;
    let message = match post.likes.iter().position(|u| *u == input.user_id) {
        Some(at) => {
            post.likes.remove(at);
            "unliked"
        }
        None => {
            post.likes.push(input.user_id);
            "liked"
        }
    };
    Ok(Json(json!({ "message": message })))
}

async fn add_comment(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    if input.content.trim().is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "comment is empty"));
    }
    let mut posts = db.write().await;
    let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(AppError::not_found)?;
    let comment = Comment {
        user_id: input.user_id,
        content: input.content,
        created_at: Utc::now(),
    };
    post.comments.push(comment.clone());
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn share_post(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut posts = db.write().await;
    let post = posts.iter_mut().find(|p| p.id == id).ok_or_else(AppError::not_found)?;
    post.shares += 1;
    Ok(Json(json!({ "message": "shared" })))
}

async fn request_join(
    Path(community_id): Path<String>,
    Json(input): Json<UserRef>,
) -> Result<Json<serde_json::Value>, AppError> {
    if input.user_id.trim().is_empty() {
        return Err(AppError::new(StatusCode::BAD_REQUEST, "userId is required"));
    }
    tracing::info!(%community_id, user_id = %input.user_id, "join requested");
    Ok(Json(json!({ "message": "join request sent" })))
}

/// Accept either a JSON body or `multipart/form-data` with an optional
/// `media` file part.
async fn read_input(req: Request) -> Result<PostInput, AppError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));
    if !is_multipart {
        let Json(input) = Json::<PostInput>::from_request(req, &())
            .await
            .map_err(|e| AppError::new(e.status(), e.body_text()))?;
        return Ok(input);
    }

    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| AppError::new(e.status(), e.body_text()))?;
    let mut input = PostInput::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "media" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let kind = match field.content_type() {
                Some(ct) if ct.starts_with("video/") => "video",
                _ => "image",
            };
            field
                .bytes()
                .await
                .map_err(|e| AppError::new(e.status(), e.body_text()))?;
            input.media = Some(Media {
                uri: format!("/uploads/{}-{file_name}", Uuid::new_v4().simple()),
                kind: kind.to_string(),
            });
            continue;
        }
        let value = field
            .text()
            .await
            .map_err(|e| AppError::new(e.status(), e.body_text()))?;
        match name.as_str() {
            "userId" => input.user_id = Some(value),
            "content" => input.content = Some(value),
            "communityId" => input.community_id = Some(value),
            _ => {}
        }
    }
    Ok(input)
}
