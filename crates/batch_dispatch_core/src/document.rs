use chrono::{DateTime, SecondsFormat, Utc};

use crate::contract::Document;
use crate::error::PipelineError;

/// Builds the metadata document for one listed object key.
///
/// `timestamp` records when the document was produced, not the object's
/// stored modification time.
pub fn transform_path(path: &str, now: DateTime<Utc>) -> Result<Document, PipelineError> {
    if path.trim().is_empty() {
        return Err(PipelineError::validation("file path cannot be empty"));
    }

    let file_name = file_name(path);
    Ok(Document {
        file_path: path.to_string(),
        file_extension: file_extension(file_name).to_string(),
        file_name: file_name.to_string(),
        timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Transforms every path in order, stamping each at its own transformation time.
pub fn transform_paths<I, S>(paths: I) -> Result<Vec<Document>, PipelineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    paths
        .into_iter()
        .map(|path| transform_path(path.as_ref(), Utc::now()))
        .collect()
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn file_extension(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .unwrap_or("")
}
