/// Merges typed text with text extracted from uploads into one input.
pub fn combine(raw_text: &str, extracted_texts: &[String]) -> String {
    let file_text = extracted_texts.join("\n\n");
    format!("{}\n\n{}", raw_text.trim(), file_text.trim())
        .trim()
        .to_string()
}
