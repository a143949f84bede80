use anyhow::Context;
use calamine::{open_workbook_from_rs, Data, DataType, Reader, Xlsx};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::model::{Kind, StudentDraft, TeacherDraft};

/// Column headers recognized on import, in template order. Any other column
/// in an uploaded sheet is ignored.
pub const STUDENT_HEADERS: [&str; 12] = [
    "Name",
    "Class",
    "Roll No",
    "Admission No",
    "Father's Name",
    "Date of Birth",
    "Aadhar No",
    "Phone",
    "Blood Group",
    "Address",
    "APAAR ID",
    "Photo URL",
];

pub const TEACHER_HEADERS: [&str; 11] = [
    "Name",
    "Designation",
    "Subject",
    "Date of Joining",
    "Date of Birth",
    "Aadhar No",
    "Phone",
    "Blood Group",
    "Address",
    "Teacher ID",
    "Photo URL",
];

/// Parses the first sheet of an `.xlsx` workbook into student drafts.
/// The first row is the header; recognized columns map by name, a recognized
/// column absent from a row yields the empty string. A header-only sheet
/// yields zero drafts (whether that is an error is the caller's policy).
pub fn parse_student_sheet(bytes: &[u8]) -> anyhow::Result<Vec<StudentDraft>> {
    let rows = first_sheet_rows(bytes)?;
    let Some((header, data)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let cols = column_map(header);

    let mut drafts = Vec::new();
    for row in data {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        drafts.push(StudentDraft {
            name: field(&cols, row, "Name"),
            class_name: field(&cols, row, "Class"),
            roll_no: field(&cols, row, "Roll No"),
            admission_no: field(&cols, row, "Admission No"),
            father_name: field(&cols, row, "Father's Name"),
            dob: date_field(&cols, row, "Date of Birth"),
            aadhar: field(&cols, row, "Aadhar No"),
            phone: field(&cols, row, "Phone"),
            blood_group: field(&cols, row, "Blood Group"),
            address: field(&cols, row, "Address"),
            apaar_id: field(&cols, row, "APAAR ID"),
            photo_url: field(&cols, row, "Photo URL"),
        });
    }
    Ok(drafts)
}

pub fn parse_teacher_sheet(bytes: &[u8]) -> anyhow::Result<Vec<TeacherDraft>> {
    let rows = first_sheet_rows(bytes)?;
    let Some((header, data)) = rows.split_first() else {
        return Ok(Vec::new());
    };
    let cols = column_map(header);

    let mut drafts = Vec::new();
    for row in data {
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }
        drafts.push(TeacherDraft {
            name: field(&cols, row, "Name"),
            designation: field(&cols, row, "Designation"),
            subject: field(&cols, row, "Subject"),
            doj: date_field(&cols, row, "Date of Joining"),
            dob: date_field(&cols, row, "Date of Birth"),
            aadhar: field(&cols, row, "Aadhar No"),
            phone: field(&cols, row, "Phone"),
            blood_group: field(&cols, row, "Blood Group"),
            address: field(&cols, row, "Address"),
            teacher_id: field(&cols, row, "Teacher ID"),
            photo_url: field(&cols, row, "Photo URL"),
            principal_sign_url: String::new(),
        });
    }
    Ok(drafts)
}

fn first_sheet_rows(bytes: &[u8]) -> anyhow::Result<Vec<Vec<Data>>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> =
        open_workbook_from_rs(cursor).context("file is not a readable .xlsx workbook")?;
    let sheet_names = workbook.sheet_names().to_owned();
    let first = sheet_names
        .first()
        .context("workbook contains no sheets")?
        .clone();
    let range = workbook
        .worksheet_range(&first)
        .context("failed to read first sheet")?;
    Ok(range.rows().map(|r| r.to_vec()).collect())
}

fn column_map(header: &[Data]) -> HashMap<String, usize> {
    let mut cols = HashMap::new();
    for (idx, cell) in header.iter().enumerate() {
        let name = cell_text(cell);
        if name.is_empty() {
            continue;
        }
        // First occurrence wins if a header repeats.
        cols.entry(name).or_insert(idx);
    }
    cols
}

fn field(cols: &HashMap<String, usize>, row: &[Data], name: &str) -> String {
    cols.get(name)
        .and_then(|&idx| row.get(idx))
        .map(cell_text)
        .unwrap_or_default()
}

fn date_field(cols: &HashMap<String, usize>, row: &[Data], name: &str) -> String {
    let Some(cell) = cols.get(name).and_then(|&idx| row.get(idx)) else {
        return String::new();
    };
    if cell.is_datetime() {
        // Native spreadsheet date cell (stored as a serial number).
        return cell
            .as_date()
            .map(|d| d.format("%d-%m-%Y").to_string())
            .unwrap_or_default();
    }
    normalize_date(&cell_text(cell))
}

fn cell_text(cell: &Data) -> String {
    if cell.is_empty() {
        return String::new();
    }
    match cell.as_string() {
        Some(s) => s.trim().to_string(),
        None => cell.to_string().trim().to_string(),
    }
}

/// Best-effort date reformatter for textual cells. A value already shaped
/// `DD-MM-YYYY` is kept verbatim; a value parseable as a calendar date in a
/// common interchange format is reformatted; anything else becomes empty.
pub fn normalize_date(value: &str) -> String {
    let v = value.trim();
    if v.is_empty() {
        return String::new();
    }
    if is_ddmmyyyy_shaped(v) {
        return v.to_string();
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(v, fmt) {
            return d.format("%d-%m-%Y").to_string();
        }
    }
    String::new()
}

fn is_ddmmyyyy_shaped(v: &str) -> bool {
    let b = v.as_bytes();
    b.len() == 10
        && b[2] == b'-'
        && b[5] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 2 || i == 5 || c.is_ascii_digit())
}

/// Writes a downloadable import template: one sheet, header row only.
pub fn write_template(kind: Kind, out_path: &Path) -> anyhow::Result<()> {
    let headers: Vec<String> = match kind {
        Kind::Student => STUDENT_HEADERS.iter().map(|h| h.to_string()).collect(),
        Kind::Teacher => TEACHER_HEADERS.iter().map(|h| h.to_string()).collect(),
    };
    write_workbook(out_path, kind.sheet_name(), &[headers])
}

/// Writes a minimal single-sheet `.xlsx` workbook with inline-string cells.
/// An xlsx file is a zip of sheet XML, so this reuses the zip writer rather
/// than pulling in a spreadsheet-authoring dependency.
pub fn write_workbook(
    out_path: &Path,
    sheet_name: &str,
    rows: &[Vec<String>],
) -> anyhow::Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
    }
    let file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;

    let mut zip = ZipWriter::new(file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(ROOT_RELS_XML.as_bytes())?;

    zip.start_file("xl/workbook.xml", opts)?;
    zip.write_all(workbook_xml(sheet_name).as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", opts)?;
    zip.write_all(WORKBOOK_RELS_XML.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", opts)?;
    zip.write_all(sheet_xml(rows).as_bytes())?;

    zip.finish().context("failed to finalize workbook")?;
    Ok(())
}

const CONTENT_TYPES_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
    "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
    "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
    "<Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
    "<Override PartName=\"/xl/worksheets/sheet1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
    "</Types>"
);

const ROOT_RELS_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"xl/workbook.xml\"/>",
    "</Relationships>"
);

const WORKBOOK_RELS_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
    "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet1.xml\"/>",
    "</Relationships>"
);

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" ",
            "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
            "<sheets><sheet name=\"{}\" sheetId=\"1\" r:id=\"rId1\"/></sheets>",
            "</workbook>"
        ),
        escape_xml(sheet_name)
    )
}

fn sheet_xml(rows: &[Vec<String>]) -> String {
    let mut xml = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
        "<sheetData>"
    ));
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!("<row r=\"{}\">", r + 1));
        for (c, value) in row.iter().enumerate() {
            // Empty cells are omitted entirely so readers see them as blank.
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                "<c r=\"{}{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                column_ref(c),
                r + 1,
                escape_xml(value)
            ));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

// 0 -> A, 25 -> Z, 26 -> AA.
fn column_ref(mut idx: usize) -> String {
    let mut s = String::new();
    loop {
        s.insert(0, (b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    s
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
