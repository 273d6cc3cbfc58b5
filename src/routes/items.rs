use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Item, ItemInput, ItemQuery, ItemUpdate},
    response::{respond, Envelope},
    routes::folders::{current_user_id, owned_folder},
};
use actix_web::{delete, get, http::StatusCode, post, put, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

const ITEM_COLUMNS: &str = "id, external_id, title, description, folder_id, created_at";

/// Lists every item of the authenticated user across all folders, newest first.
///
/// Takes the same `limit`/`before`/`before_id` parameters as the per-folder listing.
#[get("")]
pub async fn list_items(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    query: web::Query<ItemQuery>,
) -> Result<impl Responder, AppError> {
    let user_id = current_user_id(&pool, &user).await?;

    let items = sqlx::query_as::<_, Item>(
        "SELECT i.id, i.external_id, i.title, i.description, i.folder_id, i.created_at \
         FROM items i \
         JOIN folders f ON f.id = i.folder_id \
         WHERE f.user_id = $1 AND ($2::timestamptz IS NULL OR (i.created_at, i.id) < ($2, $3::bigint)) \
         ORDER BY i.created_at DESC, i.id DESC \
         LIMIT $4",
    )
    .bind(user_id)
    .bind(query.before)
    .bind(query.cursor_id())
    .bind(query.page_size())
    .fetch_all(&**pool)
    .await?;

    Ok(respond(StatusCode::OK, items))
}

/// Creates an item in one of the user's folders.
///
/// ## Responses:
/// - `201 Created`: the new item, including its generated `external_id`.
/// - `404 Not Found`: the folder does not exist or belongs to someone else.
/// - `422 Unprocessable Entity`: title or description out of bounds.
#[post("")]
pub async fn create_item(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    item_data: web::Json<ItemInput>,
) -> Result<impl Responder, AppError> {
    item_data.validate()?;
    let user_id = current_user_id(&pool, &user).await?;
    let folder = owned_folder(&pool, item_data.folder_id, user_id).await?;

    let item = sqlx::query_as::<_, Item>(&format!(
        "INSERT INTO items (external_id, title, description, folder_id) \
         VALUES ($1, $2, $3, $4) RETURNING {}",
        ITEM_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&item_data.title)
    .bind(&item_data.description)
    .bind(folder.id)
    .fetch_one(&**pool)
    .await?;

    Ok(respond(StatusCode::CREATED, item))
}

/// Updates an item. Fields left out of the body keep their current value.
#[put("/{id}")]
pub async fn update_item(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    item_id: web::Path<i64>,
    item_data: web::Json<ItemUpdate>,
) -> Result<impl Responder, AppError> {
    item_data.validate()?;
    let user_id = current_user_id(&pool, &user).await?;
    let item_id = item_id.into_inner();

    // Ownership goes through the folder the item currently sits in.
    let owned = sqlx::query_as::<_, (i64,)>(
        "SELECT i.id FROM items i JOIN folders f ON f.id = i.folder_id \
         WHERE i.id = $1 AND f.user_id = $2",
    )
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(&**pool)
    .await?;
    if owned.is_none() {
        return Err(AppError::NotFound("item not found".into()));
    }

    if let Some(target) = item_data.folder_id {
        owned_folder(&pool, target, user_id).await?;
    }

    let item = sqlx::query_as::<_, Item>(&format!(
        "UPDATE items SET \
             title = COALESCE($1, title), \
             description = COALESCE($2, description), \
             folder_id = COALESCE($3, folder_id) \
         WHERE id = $4 RETURNING {}",
        ITEM_COLUMNS
    ))
    .bind(&item_data.title)
    .bind(&item_data.description)
    .bind(item_data.folder_id)
    .bind(item_id)
    .fetch_one(&**pool)
    .await?;

    Ok(respond(StatusCode::OK, item))
}

/// Deletes an item.
#[delete("/{id}")]
pub async fn delete_item(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    item_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let user_id = current_user_id(&pool, &user).await?;

    let result = sqlx::query(
        "DELETE FROM items i USING folders f \
         WHERE i.id = $1 AND i.folder_id = f.id AND f.user_id = $2",
    )
    .bind(item_id.into_inner())
    .bind(user_id)
    .execute(&**pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("item not found".into()));
    }

    Ok(HttpResponse::Ok().json(Envelope::ok_empty()))
}
