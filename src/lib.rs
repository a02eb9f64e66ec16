//! Photo gallery preparation: a local EXIF editing web form and a batch
//! pipeline producing thumbnails plus an aggregate `metadata.json`.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod exif_writer;
pub mod gallery;
pub mod gps;
pub mod metadata;
pub mod processor;
pub mod samples;
pub mod thumbnails;
pub mod views;
pub mod walker;
pub mod web_server;
