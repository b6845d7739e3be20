use crate::common::{ApiError, ApiResult, UserId};
use crate::kernel::document_text::{extract_text, DocumentFormat};

use super::metadata::extract_metadata;
use super::models::NewLaw;

/// An uploaded file plus the optional overrides sent with it
#[derive(Debug, Clone, Default)]
pub struct UploadInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub title: Option<String>,
    pub so_hieu: Option<String>,
    pub document_type: Option<String>,
    pub uploaded_by: Option<UserId>,
}

/// Check the extension against the allow-list
pub fn validate_file_name(file_name: &str) -> ApiResult<DocumentFormat> {
    DocumentFormat::from_file_name(file_name).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Định dạng tệp không được hỗ trợ. Chỉ chấp nhận: {}",
            DocumentFormat::ALLOWED_EXTENSIONS.join(", ")
        ))
    })
}

/// Validate, extract text and metadata, and build the row to insert.
///
/// CPU-bound (PDF parsing): call from a blocking task.
pub fn prepare_upload(input: UploadInput, max_bytes: usize) -> ApiResult<NewLaw> {
    let format = validate_file_name(&input.file_name)?;

    if input.bytes.is_empty() {
        return Err(ApiError::bad_request("Tệp tải lên không có dữ liệu"));
    }
    if input.bytes.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "Tệp vượt quá dung lượng cho phép ({} MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    let content = extract_text(format, &input.bytes).map_err(|e| {
        tracing::warn!(error = %e, file_name = %input.file_name, "Text extraction failed");
        ApiError::bad_request("Không thể đọc nội dung tệp. Vui lòng kiểm tra lại định dạng tệp")
    })?;
    if content.is_empty() {
        return Err(ApiError::bad_request(
            "Không trích xuất được nội dung văn bản từ tệp",
        ));
    }

    let metadata = extract_metadata(&content);
    tracing::debug!(
        file_name = %input.file_name,
        so_hieu = ?metadata.so_hieu,
        document_type = ?metadata.document_type,
        "Extracted law metadata"
    );

    let title = non_blank(input.title)
        .or(metadata.title)
        .unwrap_or_else(|| file_stem(&input.file_name));

    Ok(NewLaw {
        title,
        so_hieu: non_blank(input.so_hieu).or(metadata.so_hieu),
        document_type: non_blank(input.document_type).or(metadata.document_type),
        issuing_body: metadata.issuing_body,
        issued_date: metadata.issued_date,
        effective_date: metadata.effective_date,
        signer: metadata.signer,
        content,
        file_name: Some(input.file_name),
        created_by: input.uploaded_by,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn file_stem(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    base.rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(base)
        .replace(['_', '-'], " ")
        .trim()
        .to_string()
}
