use crate::catalog::Catalog;
use crate::config::PrepareConfig;
use crate::error::AppError;
use crate::metadata::{self, FlatTags, ERROR_KEY};
use crate::samples;
use crate::thumbnails;
use crate::walker;
use chrono::{DateTime, Local, NaiveDateTime};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Counts from one `prepare` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrepareReport {
    pub samples_created: usize,
    pub renamed: usize,
    pub images: usize,
    pub thumbnails_written: usize,
    pub thumbnails_skipped: usize,
    pub metadata_extracted: usize,
    pub metadata_skipped: usize,
    pub failures: usize,
}

/// Work for one image. Each job reads one input and writes one independent output.
#[derive(Debug, Clone)]
struct ImageJob {
    name: String,
    source: PathBuf,
    thumbnail: Option<PathBuf>,
    extract_metadata: bool,
}

#[derive(Debug)]
struct JobOutcome {
    name: String,
    thumbnail: Option<Result<(), String>>,
    metadata: Option<FlatTags>,
}

/// Runs the whole pipeline: samples, extension normalization, ordering,
/// thumbnails and metadata on the worker pool, then the catalog merge.
pub fn run_prepare(config: &PrepareConfig) -> Result<PrepareReport, AppError> {
    let fulls = config.fulls_directory();
    let thumbs = config.thumbs_directory();
    for dir in [&fulls, &thumbs, &config.metadata_directory()] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            log::debug!("Created directory: {:?}", dir);
        }
    }

    let mut report = PrepareReport::default();
    if config.sample_images > 0 {
        report.samples_created = samples::create_sample_images(
            &fulls,
            config.sample_images,
            config.sample_width,
            config.sample_height,
            config.jpeg_quality,
        )?
        .len();
    }

    report.renamed = walker::normalize_extensions(&fulls)?;

    let jpeg_only: HashSet<String> = [walker::JPEG_EXTENSION.to_string()].into_iter().collect();
    let paths = walker::list_images(&fulls, &jpeg_only)?;
    let pool = worker_pool(config)?;
    let ordered = order_by_capture_time(&pool, paths);
    report.images = ordered.len();
    log::info!("Preparing {} images from {:?}", ordered.len(), fulls);

    let mut catalog = if config.check {
        Catalog::load(&config.catalog_path())?
    } else {
        Catalog::default()
    };

    let mut jobs = Vec::new();
    for (name, source) in &ordered {
        let thumbnail_path = thumbs.join(format!("{}.{}", name, walker::JPEG_EXTENSION));
        let thumbnail = if config.check && thumbnail_path.exists() {
            report.thumbnails_skipped += 1;
            None
        } else {
            Some(thumbnail_path)
        };
        let extract_metadata = if config.check && catalog.is_complete(name) {
            report.metadata_skipped += 1;
            false
        } else {
            true
        };
        if thumbnail.is_some() || extract_metadata {
            jobs.push(ImageJob {
                name: name.clone(),
                source: source.clone(),
                thumbnail,
                extract_metadata,
            });
        } else {
            log::trace!("Nothing to do for {}", name);
        }
    }

    for outcome in start_processing(&pool, config, jobs)? {
        if let Some(tags) = outcome.metadata {
            report.metadata_extracted += 1;
            if tags.contains_key(ERROR_KEY) {
                report.failures += 1;
            }
            catalog.insert(outcome.name.clone(), tags);
        }
        match outcome.thumbnail {
            Some(Ok(())) => report.thumbnails_written += 1,
            Some(Err(message)) => {
                report.failures += 1;
                catalog.record_error(&outcome.name, format!("Could not create thumbnail: {}", message));
            }
            None => {}
        }
    }

    let names: Vec<String> = ordered.into_iter().map(|(name, _)| name).collect();
    catalog.retain(&names.iter().cloned().collect());
    catalog.image_order = names;
    catalog.save(&config.catalog_path())?;

    log::info!("Preparation finished: {:?}", report);
    Ok(report)
}

/// Pool of `config.workers` threads; zero means one per CPU.
fn worker_pool(config: &PrepareConfig) -> Result<ThreadPool, AppError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| AppError::Generic(format!("Could not start worker pool: {}", e)))
}

/// Runs `jobs` on `pool` and hands the outcomes back once every worker is
/// done. Completion order is not preserved.
fn start_processing(
    pool: &ThreadPool,
    config: &PrepareConfig,
    jobs: Vec<ImageJob>,
) -> Result<Vec<JobOutcome>, AppError> {
    if jobs.is_empty() {
        log::info!("All images already processed.");
        return Ok(Vec::new());
    }

    log::info!(
        "Starting image processing of {} jobs with {} workers",
        jobs.len(),
        pool.current_num_threads()
    );

    let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
    pool.install(|| {
        jobs.par_iter().try_for_each_with(outcome_tx, |tx, job| {
            log::debug!("Processing image started for: {:?}", job.source);
            tx.send(process_image(config, job))?;
            log::debug!("Processing image finished for: {:?}", job.source);
            Ok::<(), AppError>(())
        })
    })?;

    let outcomes: Vec<JobOutcome> = outcome_rx.iter().collect();
    log::info!("All images processed.");
    Ok(outcomes)
}

fn process_image(config: &PrepareConfig, job: &ImageJob) -> JobOutcome {
    let thumbnail = job.thumbnail.as_ref().map(|target| {
        thumbnails::create_thumbnail(
            &job.source,
            target,
            config.thumbnail_width,
            config.thumbnail_height,
            config.jpeg_quality,
        )
        .map_err(|e| {
            log::warn!("Failed to create thumbnail for {:?}: {}", job.source, e);
            e.to_string()
        })
    });
    let metadata = if job.extract_metadata {
        Some(extract_metadata(&job.source))
    } else {
        None
    };
    JobOutcome {
        name: job.name.clone(),
        thumbnail,
        metadata,
    }
}

/// Allowlisted EXIF fields plus file size and pixel dimensions. Failures are
/// recorded under `Error` rather than returned.
pub fn extract_metadata(path: &Path) -> FlatTags {
    log::trace!("Extracting EXIF data for image: {:?}", path);
    let mut tags = match metadata::read_exif(path) {
        Ok(Some(exif)) => metadata::catalog_fields(&exif),
        Ok(None) => FlatTags::new(),
        Err(e) => {
            log::warn!("Error reading EXIF for {:?}: {}", path, e);
            let mut tags = FlatTags::new();
            tags.insert(ERROR_KEY.to_string(), format!("Could not read EXIF: {}", e));
            tags
        }
    };

    match image::image_dimensions(path) {
        Ok((width, height)) => {
            tags.insert("Image Width".to_string(), width.to_string());
            tags.insert("Image Height".to_string(), height.to_string());
        }
        Err(e) => {
            log::warn!("Could not get dimensions for {:?}: {}", path, e);
            tags.entry(ERROR_KEY.to_string())
                .or_insert_with(|| format!("Could not read image: {}", e));
        }
    }

    match std::fs::metadata(path) {
        Ok(file) => {
            tags.insert("File Size".to_string(), file.len().to_string());
        }
        Err(e) => {
            tags.entry(ERROR_KEY.to_string())
                .or_insert_with(|| format!("Could not stat file: {}", e));
        }
    }
    tags
}

/// EXIF capture time, else file modification time.
fn capture_key(path: &Path) -> Option<NaiveDateTime> {
    let from_exif = match metadata::read_exif(path) {
        Ok(exif) => exif.as_ref().and_then(metadata::capture_time),
        Err(e) => {
            log::debug!("No capture time for {:?}: {}", path, e);
            None
        }
    };
    from_exif.or_else(|| {
        std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(|modified| DateTime::<Local>::from(modified).naive_local())
    })
}

/// `(base name, path)` sorted by capture time, then name. Files without any
/// timestamp go last. Timestamps are read on `pool`.
fn order_by_capture_time(pool: &ThreadPool, paths: Vec<PathBuf>) -> Vec<(String, PathBuf)> {
    let mut keyed: Vec<(Option<NaiveDateTime>, String, PathBuf)> = pool.install(|| {
        paths
            .into_par_iter()
            .filter_map(|path| {
                let name = path.file_stem()?.to_string_lossy().into_owned();
                Some((capture_key(&path), name, path))
            })
            .collect()
    });
    keyed.sort_by(|a, b| match (&a.0, &b.0) {
        (Some(x), Some(y)) => x.cmp(y).then_with(|| a.1.cmp(&b.1)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(&b.1),
    });
    keyed.into_iter().map(|(_, name, path)| (name, path)).collect()
}
