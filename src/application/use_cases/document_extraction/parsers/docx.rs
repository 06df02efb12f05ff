use docx_rs::{
    DocumentChild, Docx, InsertChild, Paragraph, ParagraphChild, Run, RunChild, Table,
    TableCell, TableCellContent, TableChild, TableRow, TableRowChild,
};

pub(in crate::application::use_cases::document_extraction) fn parse_docx(
    bytes: &[u8],
) -> Result<String, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| format!("failed to read document: {}", e))?;
    Ok(document_text(&docx))
}

fn document_text(docx: &Docx) -> String {
    let mut lines = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            DocumentChild::Table(table) => table_lines(table, &mut lines),
            _ => {}
        }
    }
    lines.join("\n")
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut buffer = String::new();
    for child in &paragraph.children {
        paragraph_child_text(child, &mut buffer);
    }
    buffer
}

fn paragraph_child_text(child: &ParagraphChild, buffer: &mut String) {
    match child {
        ParagraphChild::Run(run) => run_text(run, buffer),
        ParagraphChild::Hyperlink(link) => {
            for link_child in &link.children {
                paragraph_child_text(link_child, buffer);
            }
        }
        ParagraphChild::Insert(insert) => {
            for insert_child in &insert.children {
                if let InsertChild::Run(run) = insert_child {
                    run_text(run, buffer);
                }
            }
        }
        _ => {}
    }
}

fn run_text(run: &Run, buffer: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(text) => buffer.push_str(&text.text),
            RunChild::Tab(_) => buffer.push('\t'),
            RunChild::Break(_) => buffer.push('\n'),
            _ => {}
        }
    }
}

fn table_lines(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        let text = row_text(row);
        if !text.trim().is_empty() {
            lines.push(text);
        }
    }
}

fn row_text(row: &TableRow) -> String {
    row.cells
        .iter()
        .map(|cell| {
            let TableRowChild::TableCell(cell) = cell;
            cell_text(cell)
        })
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn cell_text(cell: &TableCell) -> String {
    let mut parts = Vec::new();
    for content in &cell.children {
        match content {
            TableCellContent::Paragraph(paragraph) => {
                let text = paragraph_text(paragraph);
                if !text.trim().is_empty() {
                    parts.push(text);
                }
            }
            TableCellContent::Table(table) => {
                let mut nested = Vec::new();
                table_lines(table, &mut nested);
                if !nested.is_empty() {
                    parts.push(nested.join(" "));
                }
            }
            _ => {}
        }
    }
    parts.join(" ")
}
