pub(super) mod docx;
pub(super) mod pdf;
pub(super) mod txt;
