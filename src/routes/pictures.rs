use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppError;
use crate::models::picture::EditStatus;
use crate::models::user::UserView;
use crate::models::DataResponse;
use crate::state::AppState;

/// Read-only view of who is editing a picture and how many clients watch it.
pub async fn get_edit_status(
    State(state): State<AppState>,
    Path(picture_id): Path<String>,
) -> Result<Json<DataResponse<EditStatus>>, AppError> {
    let picture_id = picture_id
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("invalid picture id".to_string()))?;

    let holder = state.arbiter.holder(picture_id);
    Ok(Json(DataResponse {
        data: EditStatus {
            picture_id: picture_id.to_string(),
            editing: holder.is_some(),
            user: holder.as_ref().map(|h| UserView::from(&h.user)),
            watchers: state.registry.watcher_count(picture_id),
        },
    }))
}
