use lopdf::Document;
use tracing::debug;

pub(in crate::application::use_cases::document_extraction) fn parse_pdf(
    bytes: &[u8],
) -> Result<String, String> {
    let document = Document::load_mem(bytes).map_err(|e| format!("failed to load PDF: {}", e))?;

    let mut text = String::new();
    for (page_num, page_id) in document.get_pages() {
        match document.extract_text(&[page_num]) {
            Ok(page_text) => text.push_str(&page_text),
            // Pages without a text layer contribute nothing.
            Err(e) => debug!("No text on PDF page {} ({:?}): {}", page_num, page_id, e),
        }
    }

    Ok(text)
}
