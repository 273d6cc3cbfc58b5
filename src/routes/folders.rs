use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Folder, FolderInput, Item, ItemQuery},
    response::{respond, Envelope},
};
use actix_web::{delete, get, http::StatusCode, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

const FOLDER_COLUMNS: &str = "id, name, user_id, created_at";

/// Resolves the database id of the authenticated user.
///
/// An access token may outlive its account, so a missing row is treated as
/// an authentication failure.
pub(crate) async fn current_user_id(
    pool: &PgPool,
    user: &AuthenticatedUser,
) -> Result<i64, AppError> {
    let row = sqlx::query_as::<_, (i64,)>("SELECT id FROM users WHERE username = $1")
        .bind(user.username())
        .fetch_optional(pool)
        .await?;

    match row {
        Some((id,)) => Ok(id),
        None => {
            log::warn!("token subject {} has no account", user.username());
            Err(AppError::Unauthorized("unauthorized".into()))
        }
    }
}

/// Loads a folder owned by `user_id`; folders of other users read as missing.
pub(crate) async fn owned_folder(
    pool: &PgPool,
    folder_id: i64,
    user_id: i64,
) -> Result<Folder, AppError> {
    sqlx::query_as::<_, Folder>(&format!(
        "SELECT {} FROM folders WHERE id = $1 AND user_id = $2",
        FOLDER_COLUMNS
    ))
    .bind(folder_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("folder not found".into()))
}

/// Lists the folders of the authenticated user, newest first.
#[get("")]
pub async fn list_folders(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let user_id = current_user_id(&pool, &user).await?;

    let folders = sqlx::query_as::<_, Folder>(&format!(
        "SELECT {} FROM folders WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        FOLDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&**pool)
    .await?;

    Ok(respond(StatusCode::OK, folders))
}

/// Creates a folder for the authenticated user.
///
/// ## Responses:
/// - `201 Created`: the new folder.
/// - `422 Unprocessable Entity`: the name is empty or longer than 100 characters.
#[post("")]
pub async fn create_folder(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    folder_data: web::Json<FolderInput>,
) -> Result<impl Responder, AppError> {
    folder_data.validate()?;
    let user_id = current_user_id(&pool, &user).await?;

    let folder = sqlx::query_as::<_, Folder>(&format!(
        "INSERT INTO folders (name, user_id) VALUES ($1, $2) RETURNING {}",
        FOLDER_COLUMNS
    ))
    .bind(&folder_data.name)
    .bind(user_id)
    .fetch_one(&**pool)
    .await?;

    log::info!("user {} created folder {}", user.username(), folder.id);
    Ok(respond(StatusCode::CREATED, folder))
}

/// Renames a folder.
#[put("/{id}")]
pub async fn update_folder(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    folder_id: web::Path<i64>,
    folder_data: web::Json<FolderInput>,
) -> Result<impl Responder, AppError> {
    folder_data.validate()?;
    let user_id = current_user_id(&pool, &user).await?;

    let folder = sqlx::query_as::<_, Folder>(&format!(
        "UPDATE folders SET name = $1 WHERE id = $2 AND user_id = $3 RETURNING {}",
        FOLDER_COLUMNS
    ))
    .bind(&folder_data.name)
    .bind(folder_id.into_inner())
    .bind(user_id)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("folder not found".into()))?;

    Ok(respond(StatusCode::OK, folder))
}

/// Deletes a folder together with its items.
#[delete("/{id}")]
pub async fn delete_folder(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    folder_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let user_id = current_user_id(&pool, &user).await?;

    let result = sqlx::query("DELETE FROM folders WHERE id = $1 AND user_id = $2")
        .bind(folder_id.into_inner())
        .bind(user_id)
        .execute(&**pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("folder not found".into()));
    }

    Ok(HttpResponse::Ok().json(Envelope::ok_empty()))
}

/// Lists the items of one folder, newest first.
///
/// ## Query Parameters:
/// - `limit` (optional): page size, default 50, at most 100.
/// - `before` (optional): RFC 3339 timestamp; only items created earlier are
///   returned.
/// - `before_id` (optional): with `before`, also returns items created at
///   exactly `before` whose id is smaller. Pass the `created_at` and `id` of
///   the last item to get the next page.
#[get("/{id}/items")]
pub async fn list_folder_items(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    folder_id: web::Path<i64>,
    query: web::Query<ItemQuery>,
) -> Result<impl Responder, AppError> {
    let user_id = current_user_id(&pool, &user).await?;
    let folder = owned_folder(&pool, folder_id.into_inner(), user_id).await?;

    let items = sqlx::query_as::<_, Item>(
        "SELECT id, external_id, title, description, folder_id, created_at \
         FROM items \
         WHERE folder_id = $1 AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3::bigint)) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $4",
    )
    .bind(folder.id)
    .bind(query.before)
    .bind(query.cursor_id())
    .bind(query.page_size())
    .fetch_all(&**pool)
    .await?;

    Ok(respond(StatusCode::OK, items))
}
