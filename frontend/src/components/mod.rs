//! UI Components for the Waybill Extractor application.
//!
//! This module contains all Leptos components organized by function:
//!
//! # Layout Components
//! - [`Header`] - Navigation bar with the theme toggle
//! - [`ThemeToggle`] - Light/dark switch
//! - [`Hero`] - Main title and description
//! - [`Footer`] - Page footer
//!
//! # Feature Components
//! - [`UploadSection`] - Model choice, drag & drop, process and download
//! - [`FileList`] - Selected files with previews

mod file_list;
mod footer;
mod header;
mod hero;
mod theme_toggle;
mod uploader;

pub use file_list::*;
pub use footer::*;
pub use header::*;
pub use hero::*;
pub use theme_toggle::*;
pub use uploader::*;
