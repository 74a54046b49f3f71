use crate::contract::{message_id, Batch, Document};
use crate::error::PipelineError;

/// Packs documents into batches whose compact JSON body stays within
/// `max_message_bytes`.
///
/// Greedy first-fit: documents keep their order, a batch is closed as soon as
/// the next document would push it over the ceiling, and nothing is repacked.
/// A document that cannot fit even on its own fails the whole build.
pub fn build_batches(
    documents: impl IntoIterator<Item = Document>,
    max_message_bytes: usize,
) -> Result<Vec<Batch>, PipelineError> {
    let mut batches = Vec::new();
    let mut current: Vec<Document> = Vec::new();
    let mut current_bytes = 0usize;

    for (index, document) in documents.into_iter().enumerate() {
        let document_bytes = serde_json::to_vec(&document)?.len();
        let sequence = batches.len() + 1;

        let candidate = batch_wire_size(
            &message_id(sequence),
            current.len() + 1,
            current_bytes + document_bytes,
        )?;
        if candidate <= max_message_bytes {
            current.push(document);
            current_bytes += document_bytes;
            continue;
        }

        if current.is_empty() {
            return Err(oversized(index, &document, candidate, max_message_bytes));
        }

        batches.push(Batch::new(sequence, std::mem::take(&mut current)));

        let solo = batch_wire_size(&message_id(sequence + 1), 1, document_bytes)?;
        if solo > max_message_bytes {
            return Err(oversized(index, &document, solo, max_message_bytes));
        }
        current.push(document);
        current_bytes = document_bytes;
    }

    if !current.is_empty() {
        let sequence = batches.len() + 1;
        batches.push(Batch::new(sequence, current));
    }

    Ok(batches)
}

/// Exact compact JSON length of a batch holding `document_count` documents
/// whose individual encodings sum to `documents_bytes`.
pub fn batch_wire_size(
    message_id: &str,
    document_count: usize,
    documents_bytes: usize,
) -> Result<usize, PipelineError> {
    let envelope = serde_json::to_vec(&Batch {
        message_id: message_id.to_string(),
        document_count,
        documents: Vec::new(),
    })?
    .len();
    let separators = document_count.saturating_sub(1);
    Ok(envelope + documents_bytes + separators)
}

pub fn serialized_size(batch: &Batch) -> Result<usize, PipelineError> {
    Ok(serde_json::to_vec(batch)?.len())
}

fn oversized(index: usize, document: &Document, size_bytes: usize, max_bytes: usize) -> PipelineError {
    PipelineError::OversizedDocument {
        index,
        file_path: document.file_path.clone(),
        size_bytes,
        max_bytes,
    }
}
