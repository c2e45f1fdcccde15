//! Upload endpoints
//!
//! - POST /upload        (field `image`)
//! - POST /upload-video  (field `video`)
//! - POST /upload-file   (field `file`)
//!
//! All three share one handler; they differ only in the entry they take
//! from [`UPLOAD_ROUTES`].

use axum::{
    Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    response::Json,
    routing::post,
};
use serde::Serialize;

use crate::AppState;
use crate::error::{self, AppError, NO_FILE_MESSAGE};
use crate::metrics::{
    ORPHANED_ASSETS_TOTAL, UPLOAD_BYTES_TOTAL, UPLOAD_DURATION_SECONDS, UPLOADS_TOTAL,
};
use crate::storage::{ResourceKind, UploadedAsset};

/// One upload endpoint
#[derive(Debug, Clone, Copy)]
pub struct UploadRoute {
    pub path: &'static str,
    /// Multipart field that must carry the file
    pub field: &'static str,
    pub kind: ResourceKind,
    /// Error body when the field is absent
    pub missing_file_message: &'static str,
}

pub static UPLOAD_ROUTES: [UploadRoute; 3] = [
    UploadRoute {
        path: "/upload",
        field: "image",
        kind: ResourceKind::Image,
        missing_file_message: NO_FILE_MESSAGE,
    },
    UploadRoute {
        path: "/upload-video",
        field: "video",
        kind: ResourceKind::Video,
        missing_file_message: NO_FILE_MESSAGE,
    },
    UploadRoute {
        path: "/upload-file",
        field: "file",
        kind: ResourceKind::Raw,
        missing_file_message: NO_FILE_MESSAGE,
    },
];

/// Successful upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Create upload router
///
/// Registers one POST route per entry of [`UPLOAD_ROUTES`].
pub fn upload_router() -> Router<AppState> {
    UPLOAD_ROUTES.iter().fold(Router::new(), |router, route| {
        router.route(
            route.path,
            post(
                move |State(state): State<AppState>,
                      multipart: Result<Multipart, MultipartRejection>| async move {
                    upload(&state, route, multipart).await
                },
            ),
        )
    })
}

/// Read the first file part named `field_name`, buffering it fully
///
/// Non-file parts, other names and any further files are drained and ignored.
/// A request that is not multipart at all has no file.
async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
    field_name: &str,
) -> error::Result<Option<Vec<u8>>> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(%rejection, "Request body is not multipart");
            return Ok(None);
        }
    };

    let mut file = None;
    while let Some(field) = multipart.next_field().await? {
        if file.is_some() || field.name() != Some(field_name) || field.file_name().is_none() {
            continue;
        }
        file = Some(field.bytes().await?.to_vec());
    }

    Ok(file)
}

/// Upload handler shared by every route
///
/// 1. Buffer the file
/// 2. Upload it to the media store
/// 3. Save its URL in the record store
async fn upload(
    state: &AppState,
    route: &UploadRoute,
    multipart: Result<Multipart, MultipartRejection>,
) -> error::Result<Json<UploadResponse>> {
    let kind = route.kind;
    let outcome = |outcome: &str| {
        UPLOADS_TOTAL
            .with_label_values(&[kind.as_str(), outcome])
            .inc();
    };

    let Some(data) = read_file_field(multipart, route.field).await? else {
        outcome("missing_file");
        return Err(AppError::MissingFile(route.missing_file_message));
    };
    let size = data.len();

    let uploaded = {
        let _timer = UPLOAD_DURATION_SECONDS
            .with_label_values(&[kind.as_str()])
            .start_timer();
        state.media.upload(data, kind).await
    };
    let asset = match uploaded {
        Ok(asset) => asset,
        Err(error) => {
            outcome("provider_error");
            return Err(error.into());
        }
    };
    UPLOAD_BYTES_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc_by(size as u64);

    if let Err(error) = state.records.save(&asset.url).await {
        outcome("store_error");
        handle_orphan(state, &asset).await;
        return Err(error.into());
    }

    outcome("success");
    tracing::info!(%kind, size, url = %asset.url, "Upload stored");

    Ok(Json(UploadResponse { url: asset.url }))
}

/// The asset is hosted but has no record
///
/// Left in place unless `uploads.cleanup_orphans` is set; cleanup is best effort.
async fn handle_orphan(state: &AppState, asset: &UploadedAsset) {
    if state.config.uploads.cleanup_orphans {
        match state.media.destroy(asset).await {
            Ok(()) => {
                tracing::info!(url = %asset.url, "Destroyed asset whose record could not be saved");
                return;
            }
            Err(error) => {
                tracing::error!(url = %asset.url, %error, "Failed to destroy orphaned asset");
            }
        }
    }

    ORPHANED_ASSETS_TOTAL
        .with_label_values(&[asset.kind.as_str()])
        .inc();
    tracing::warn!(
        kind = %asset.kind,
        url = %asset.url,
        public_id = %asset.public_id,
        "Asset uploaded but its record was not saved"
    );
}
