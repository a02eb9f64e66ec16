use crate::config::AppConfig;
use crate::error::AppError;
use crate::exif_writer::{self, ExifEdit};
use crate::gallery;
use crate::gps;
use crate::views;
use crate::walker;
use actix_files::NamedFile;
use actix_web::http::header;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fields posted by the edit form. Empty strings count as "not provided".
#[derive(Deserialize, Debug, Default)]
pub struct ModifyForm {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn fulls_directory(config: &AppConfig) -> PathBuf {
    PathBuf::from(&config.server.fulls_directory)
}

fn image_path(dir: &Path, filename: &str) -> Result<PathBuf, AppError> {
    let path = dir.join(filename);
    if walker::is_plain_filename(filename) && path.is_file() {
        Ok(path)
    } else {
        Err(AppError::NotFound(format!(
            "File '{}' not found in the '{}' directory.",
            filename,
            dir.display()
        )))
    }
}

impl ModifyForm {
    /// Validates the form into an edit. GPS is only set when both coordinates
    /// are present.
    fn to_edit(&self, software: &str) -> Result<ExifEdit, AppError> {
        let position = match (non_empty(&self.latitude), non_empty(&self.longitude)) {
            (Some(lat), Some(lon)) => {
                let (latitude, longitude) = match (lat.parse::<f64>(), lon.parse::<f64>()) {
                    (Ok(latitude), Ok(longitude)) => (latitude, longitude),
                    _ => {
                        return Err(AppError::InvalidInput(
                            "Invalid latitude or longitude format. Please enter numbers.".to_string(),
                        ))
                    }
                };
                gps::validate_position(latitude, longitude)?;
                Some((latitude, longitude))
            }
            (None, None) => None,
            _ => {
                log::debug!("Only one coordinate provided; GPS left untouched");
                None
            }
        };

        Ok(ExifEdit {
            position,
            artist: non_empty(&self.artist).map(str::to_string),
            copyright: non_empty(&self.copyright).map(str::to_string),
            software: Some(software.to_string()),
            date_time_original: None,
        })
    }
}

async fn index(app_config: web::Data<AppConfig>) -> Result<HttpResponse, AppError> {
    let dir = fulls_directory(&app_config);
    let extensions = app_config.gallery_extensions();
    log::debug!("Rendering gallery for {:?}", dir);

    let entries = web::block(move || gallery::list_gallery(&dir, &extensions)).await??;
    log::trace!("Gallery has {} entries", entries.len());

    Ok(HttpResponse::Ok()
        .content_type(mime::TEXT_HTML_UTF_8)
        .body(views::gallery_page(&entries).into_string()))
}

async fn serve_image(
    path: web::Path<String>,
    app_config: web::Data<AppConfig>,
) -> Result<NamedFile, AppError> {
    let filename = path.into_inner();
    log::debug!("Received request for image: {}", filename);

    let guessed = mime_guess::from_path(&filename).first_or_octet_stream();
    if guessed.type_() != mime::IMAGE {
        return Err(AppError::NotFound(format!("'{}' is not an image", filename)));
    }
    let image_path = image_path(&fulls_directory(&app_config), &filename)?;
    log::trace!("Attempting to serve image from: {:?}", image_path);
    Ok(NamedFile::open_async(&image_path).await?)
}

async fn get_exif_gps(
    path: web::Path<String>,
    app_config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let filename = path.into_inner();
    log::debug!("Received EXIF lookup for: {}", filename);

    let dir = fulls_directory(&app_config);
    let summary = web::block(move || gallery::lookup(&dir, &filename)).await??;
    Ok(HttpResponse::Ok().json(summary))
}

async fn modify_exif(
    form: web::Form<ModifyForm>,
    app_config: web::Data<AppConfig>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    log::debug!("Received EXIF modification: {:?}", form);

    let filename = non_empty(&form.filename)
        .ok_or_else(|| AppError::InvalidInput("No filename provided for modification.".to_string()))?
        .to_string();
    let image_path = image_path(&fulls_directory(&app_config), &filename)?;
    let edit = form.to_edit(&app_config.server.software_tag)?;

    web::block(move || exif_writer::write_exif(&image_path, &edit))
        .await
        .map_err(AppError::from)
        .and_then(|written| written)
        .map_err(|e| {
            log::error!("EXIF modification of {} failed: {}", filename, e);
            AppError::Generic(format!("An error occurred during EXIF modification: {}", e))
        })?;
    log::info!("Updated EXIF for {}", filename);

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/"))
        .finish())
}

/// Registers every route; shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/fulls/{filename}").route(web::get().to(serve_image)))
        .service(web::resource("/get_exif_gps/{filename}").route(web::get().to(get_exif_gps)))
        .service(web::resource("/modify_exif").route(web::post().to(modify_exif)));
}

pub async fn start_web_server(config: Arc<AppConfig>) -> std::io::Result<()> {
    let dir = fulls_directory(&config);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        log::info!("Created directory: {:?}", dir);
    }

    let bind = (config.server.host.clone(), config.server.port);
    let config_data = web::Data::from(config);

    log::info!("Starting web server on {}:{}", bind.0, bind.1);
    log::debug!("Serving images from {:?}", dir);

    HttpServer::new(move || App::new().app_data(config_data.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}
