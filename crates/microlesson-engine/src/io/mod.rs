pub mod html;
pub mod markdown;

use crate::editing::{Document, EditError, Placeholders};
use relative_path::RelativePath;
use std::fs;
use std::path::{Path, PathBuf};

pub use html::to_html;
pub use markdown::parse_lesson;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid lessons directory: {0}")]
    InvalidLessonsDir(String),
    #[error("Could not import lesson: {0}")]
    Import(#[from] EditError),
}

/// Read a file below the lessons root
pub fn read_file(relative_path: &RelativePath, lessons_root: &Path) -> Result<String, IoError> {
    let absolute_path = relative_path.to_path(lessons_root);
    if !absolute_path.exists() {
        return Err(IoError::NotFound(absolute_path));
    }
    fs::read_to_string(&absolute_path).map_err(IoError::Io)
}

/// Write a file below the lessons root, creating parent directories
pub fn write_file(
    relative_path: &RelativePath,
    lessons_root: &Path,
    content: &str,
) -> Result<(), IoError> {
    let absolute_path = relative_path.to_path(lessons_root);

    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent).map_err(IoError::Io)?;
    }

    fs::write(&absolute_path, content).map_err(IoError::Io)
}

/// Load a Markdown lesson into a document
pub fn read_lesson(
    relative_path: &RelativePath,
    lessons_root: &Path,
    placeholders: &Placeholders,
) -> Result<Document, IoError> {
    let markdown = read_file(relative_path, lessons_root)?;
    Ok(parse_lesson(&markdown, placeholders)?)
}

/// Serialize a document to HTML and write it below the lessons root
pub fn write_html(
    relative_path: &RelativePath,
    lessons_root: &Path,
    doc: &Document,
) -> Result<(), IoError> {
    write_file(relative_path, lessons_root, &to_html(doc))
}

/// All Markdown lessons below the root, sorted
pub fn scan_lessons(lessons_root: &Path) -> Result<Vec<PathBuf>, IoError> {
    if !lessons_root.exists() {
        return Err(IoError::InvalidLessonsDir(
            "lessons directory not found".to_string(),
        ));
    }

    let mut files = Vec::new();
    scan_directory_recursive(lessons_root, &mut files)?;
    files.sort();
    Ok(files)
}

fn scan_directory_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), IoError> {
    let entries = fs::read_dir(dir).map_err(IoError::Io)?;

    for entry in entries {
        let entry = entry.map_err(IoError::Io)?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, files)?;
        } else if let Some(ext) = path.extension()
            && ext == "md"
        {
            files.push(path);
        }
    }

    Ok(())
}

pub fn validate_lessons_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidLessonsDir(
            "Directory does not exist".to_string(),
        ));
    }

    Ok(())
}
