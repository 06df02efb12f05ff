pub(in crate::application::use_cases::document_extraction) fn parse_txt(
    bytes: &[u8],
) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| format!("file is not valid UTF-8 text: {}", e))
}
