use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::splitter::{ProjectBundle, SCRIPT_PATH, STYLESHEET_PATH};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Packages a bundle into an in-memory ZIP with the fixed folder layout.
/// Any failure aborts the whole archive; a partial archive is never
/// returned.
pub fn package(bundle: &ProjectBundle) -> Result<Vec<u8>, ExportError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("index.html", options)?;
    writer.write_all(bundle.index_html.as_bytes())?;

    writer.start_file("README.md", options)?;
    writer.write_all(bundle.readme.as_bytes())?;

    for dir in ProjectBundle::asset_dirs() {
        writer.add_directory(*dir, options)?;
    }

    writer.start_file(STYLESHEET_PATH, options)?;
    writer.write_all(bundle.styles_css.as_bytes())?;

    writer.start_file(SCRIPT_PATH, options)?;
    writer.write_all(bundle.script_js.as_bytes())?;

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
