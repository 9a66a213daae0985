//! Multipart upload handling for incident feature collections.
//!
//! Validation happens before any parsing: the file name must carry a
//! `.json`/`.geojson` extension and the size must be within the
//! configured limit. Only then is the file stored, recorded in
//! `uploaded_files`, and handed to the ingestion pipeline. A processing
//! failure after storage leaves the record with `processed = 0`, so
//! failed uploads stay around for inspection.

use actix_multipart::form::{MultipartForm, tempfile::TempFile, text::Text};
use actix_web::{HttpResponse, web};
use water_watch_dashboard::{DashboardError, ingest, queries};
use water_watch_server_models::UploadResponse;

use crate::AppState;

/// The incident upload form: the feature collection file plus an
/// optional acting-user id supplied by the auth layer.
#[derive(MultipartForm)]
pub struct UploadForm {
    /// The uploaded `.json`/`.geojson` file.
    pub file: TempFile,
    /// Acting user, when known.
    pub user_id: Option<Text<i64>>,
}

/// Returns whether the file name carries an accepted extension.
fn allowed_upload_name(name: &str) -> bool {
    name.ends_with(".json") || name.ends_with(".geojson")
}

fn validation_error(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "message": message,
    }))
}

/// `POST /dashboard/upload/`
pub async fn upload_incidents(
    state: web::Data<AppState>,
    MultipartForm(form): MultipartForm<UploadForm>,
) -> HttpResponse {
    let Some(file_name) = form.file.file_name.clone().filter(|n| !n.is_empty()) else {
        return validation_error("Only JSON and GeoJSON files are allowed.");
    };

    if !allowed_upload_name(&file_name) {
        return validation_error("Only JSON and GeoJSON files are allowed.");
    }

    if form.file.size > state.config.upload.max_bytes {
        return validation_error("File size must be under 10MB.");
    }

    let uploaded_by = form.user_id.as_ref().map(|id| id.0);

    match process_upload(&state, &form.file, &file_name, uploaded_by).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => HttpResponse::Ok().json(serde_json::json!({
            "success": false,
            "message": format!("Error processing file: {e}"),
        })),
    }
}

/// Stores the file, records the upload, and runs the ingestion
/// pipeline over its contents.
async fn process_upload(
    state: &web::Data<AppState>,
    file: &TempFile,
    file_name: &str,
    uploaded_by: Option<i64>,
) -> Result<UploadResponse, DashboardError> {
    let db = state.db.as_ref();
    let upload_dir = &state.config.upload.dir;

    std::fs::create_dir_all(upload_dir)?;
    let stored_path = upload_dir.join(format!("{}-{file_name}", uuid::Uuid::new_v4()));
    std::fs::copy(file.file.path(), &stored_path)?;

    let upload_id =
        queries::insert_uploaded_file(db, &stored_path.to_string_lossy(), uploaded_by).await?;

    let raw = std::fs::read_to_string(&stored_path)?;
    let data: serde_json::Value = serde_json::from_str(&raw)?;

    let report = ingest::ingest_feature_collection(db, &data, uploaded_by).await?;

    queries::mark_upload_processed(db, upload_id, report.added).await?;

    let total = queries::count_incidents(db).await?;

    Ok(UploadResponse {
        success: true,
        added: report.added,
        duplicates: report.duplicates,
        total,
    })
}
