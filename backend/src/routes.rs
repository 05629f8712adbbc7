use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{HttpResponse, web};
use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use log::info;
use shared::{HealthResponse, MessageResponse, UploadResponse};

use crate::error::ApiError;
use crate::inference::Predictor;
use crate::render;
use crate::storage::{ImageStore, ReportStore};

/// Largest accepted upload, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimit(pub usize);

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)))
        .service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource(["/upload", "/upload/"]).route(web::post().to(upload_image)))
        .service(web::resource("/predict/{image_id}").route(web::post().to(predict_image)))
        .service(web::resource(["/reports", "/reports/"]).route(web::get().to(list_reports)))
        .service(web::resource("/reports/{report_id}").route(web::get().to(get_report)))
        .service(
            web::resource("/reports/{report_id}/download").route(web::get().to(download_report)),
        )
        .service(web::resource("/reports/{report_id}/view").route(web::get().to(view_report)))
        .service(web::resource("/images/{image_id}").route(web::get().to(get_image)));
}

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse {
        message: "Welcome to the Bone Disease Detection API".into(),
    })
}

async fn health(predictor: web::Data<Predictor>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "OK".into(),
        model_loaded: predictor.is_loaded(),
    })
}

async fn upload_image(
    images: web::Data<ImageStore>,
    limit: web::Data<UploadLimit>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let bad_payload = |e: actix_multipart::MultipartError| {
        ApiError::BadRequest(format!("Invalid multipart payload: {}", e))
    };

    while let Some(mut field) = payload.try_next().await.map_err(bad_payload)? {
        if field.name() != Some("file") {
            while field.try_next().await.map_err(bad_payload)?.is_some() {}
            continue;
        }

        let mime_type = field
            .content_type()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_default();
        if !mime_type.starts_with("image/") {
            return Err(ApiError::BadRequest("File must be an image".into()));
        }

        let original_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(String::from);

        let mut image_data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_payload)? {
            if image_data.len() + chunk.len() > limit.0 {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File exceeds the {} byte upload limit",
                    limit.0
                )));
            }
            image_data.extend_from_slice(&chunk);
        }

        let stored = images
            .save(&image_data, original_name.as_deref(), &mime_type)
            .await
            .map_err(|e| ApiError::Internal(format!("Error uploading file: {}", e)))?;

        info!(
            "Stored image {} ({} bytes, {})",
            stored.filename,
            image_data.len(),
            mime_type
        );

        return Ok(HttpResponse::Ok().json(UploadResponse {
            image_id: stored.image_id,
            filename: stored.filename,
            message: "Image uploaded successfully".into(),
        }));
    }

    Err(ApiError::BadRequest("No file uploaded".into()))
}

async fn predict_image(
    path: web::Path<String>,
    predictor: web::Data<Predictor>,
    images: web::Data<ImageStore>,
    reports: web::Data<ReportStore>,
) -> Result<HttpResponse, ApiError> {
    let image_id = path.into_inner();

    if !predictor.is_loaded() {
        return Err(crate::inference::InferenceError::ModelNotLoaded.into());
    }

    let image_path = images.resolve(&image_id)?;
    let image_data = tokio::fs::read(&image_path)
        .await
        .map_err(|e| ApiError::Internal(format!("Error during prediction: {}", e)))?;

    let model = predictor.clone();
    let prediction = web::block(move || model.predict(&image_data)).await??;

    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let record = reports
        .save(prediction.into_report(image_id, timestamp))
        .await
        .map_err(|e| ApiError::Internal(format!("Error saving report: {}", e)))?;

    info!(
        "Report {} for image {}: {} ({:.2}%)",
        record.report_id,
        record.report.image_id,
        record.report.predicted_class,
        record.report.confidence
    );

    Ok(HttpResponse::Ok().json(record))
}

async fn list_reports(reports: web::Data<ReportStore>) -> Result<HttpResponse, ApiError> {
    let records = reports.list().await?;
    Ok(HttpResponse::Ok().json(records))
}

async fn get_report(
    path: web::Path<String>,
    reports: web::Data<ReportStore>,
) -> Result<HttpResponse, ApiError> {
    let record = reports.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(record))
}

async fn download_report(
    path: web::Path<String>,
    reports: web::Data<ReportStore>,
) -> Result<HttpResponse, ApiError> {
    let record = reports.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"report-{}.txt\"", record.report_id),
        ))
        .body(render::plain_text(&record)))
}

async fn view_report(
    path: web::Path<String>,
    reports: web::Data<ReportStore>,
) -> Result<HttpResponse, ApiError> {
    let record = reports.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render::html(&record)))
}

async fn get_image(
    path: web::Path<String>,
    images: web::Data<ImageStore>,
) -> Result<NamedFile, ApiError> {
    let image_id = path.into_inner();
    let image_path = images.resolve(&image_id)?;
    NamedFile::open_async(&image_path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(format!("Image with ID {} not found", image_id))
        } else {
            ApiError::Internal(format!("Error reading image: {}", e))
        }
    })
}
