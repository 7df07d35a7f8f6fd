use actix_multipart::{Field, Multipart};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, Responder, Scope, get, post, web};
use chrono::Utc;
use futures_util::StreamExt;
use tracing::info;

use crate::application::feed_service::FeedService;
use crate::data::feed_store::FsFeedStore;
use crate::domain::error::DomainError;
use crate::domain::post::accepted_extension;
use crate::infrastructure::classifier::HttpImageClassifier;
use crate::presentation::dto::{FeedResponse, HealthResponse};

const MAX_IMAGE_BYTES: usize = 16 * 1024 * 1024;

type Service = FeedService<FsFeedStore, HttpImageClassifier>;

pub fn scope() -> Scope {
    web::scope("/api")
        .service(health)
        .service(get_posts)
        .service(get_image)
        .service(create_post)
}

#[post("/posts")]
async fn create_post(
    req: HttpRequest,
    service: web::Data<Service>,
    mut payload: Multipart,
) -> Result<HttpResponse, DomainError> {
    let mut image = Vec::new();
    let mut original_filename = None;
    let mut username = None;
    let mut caption = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| DomainError::InvalidUpload(e.to_string()))?;
        let name = field.name().to_string();
        match name.as_str() {
            "image" => {
                if let Some(filename) = field.content_disposition().get_filename() {
                    original_filename = Some(filename.to_string());
                }
                while let Some(chunk) = field.next().await {
                    let chunk = chunk.map_err(|e| DomainError::InvalidUpload(e.to_string()))?;
                    if image.len() + chunk.len() > MAX_IMAGE_BYTES {
                        return Err(DomainError::InvalidUpload(
                            "image exceeds the 16 MiB upload limit".into(),
                        ));
                    }
                    image.extend_from_slice(&chunk);
                }
            }
            "username" => username = Some(read_text_field(&mut field).await?),
            "caption" => caption = Some(read_text_field(&mut field).await?),
            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| DomainError::InvalidUpload(e.to_string()))?;
                }
            }
        }
    }

    let original_filename = original_filename
        .ok_or_else(|| DomainError::InvalidUpload("missing image file part".into()))?;

    let record = service
        .submit_post(image, &original_filename, username, caption)
        .await?;

    info!(
        request_id = %request_id(&req),
        storage_key = %record.storage_key,
        label = %record.label,
        "post created"
    );

    Ok(HttpResponse::Created().json(record))
}

#[get("/posts")]
async fn get_posts(
    req: HttpRequest,
    service: web::Data<Service>,
) -> Result<HttpResponse, DomainError> {
    let posts = service.list_posts().await?;

    info!(
        request_id = %request_id(&req),
        total = posts.len(),
        "feed retrieved"
    );

    Ok(HttpResponse::Ok().json(FeedResponse {
        total: posts.len(),
        posts,
    }))
}

#[get("/posts/{storage_key}/image")]
async fn get_image(
    service: web::Data<Service>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let storage_key = path.into_inner();
    let artifact = service.artifact(&storage_key).await?;
    let bytes = tokio::fs::read(&artifact).await?;

    Ok(HttpResponse::Ok()
        .content_type(image_mime(&storage_key))
        .insert_header((
            "Content-Disposition",
            format!("inline; filename=\"{}\"", storage_key),
        ))
        .body(bytes))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

async fn read_text_field(field: &mut Field) -> Result<String, DomainError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| DomainError::InvalidUpload(e.to_string()))?;
        data.extend_from_slice(&chunk);
    }
    String::from_utf8(data)
        .map_err(|_| DomainError::InvalidUpload("form field is not valid utf-8".into()))
}

fn image_mime(storage_key: &str) -> mime::Mime {
    match accepted_extension(storage_key).as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<crate::presentation::middleware::RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}
