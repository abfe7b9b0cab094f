use actix_web::{HttpResponse, Result, http::header, web};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;

/// Avatars are public so they can be used directly in `<img>` tags
pub async fn get_avatar(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user_id = path.into_inner();
    let (bytes, content_type) = state
        .avatar_storage
        .load(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Avatar not found"))?;

    Ok(HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(bytes))
}
