//! Regex-based metadata extraction for Vietnamese legal documents.
//!
//! Works on the plain text produced by `kernel::document_text`. Every field is
//! optional: a miss leaves the column empty and the editor can fill it in
//! from the dashboard.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // 25/2017/QĐ-UBND, 100/2015/NĐ-CP, 45/2019/QH14, 01/2021/TTLT-BTC-BTP
    pub static ref DOCUMENT_NUMBER_REGEX: Regex = Regex::new(
        r"(?i)\b\d{1,4}/\d{4}/(?:TTLT|UBTVQH|QĐ|NĐ|TT|NQ|CT|QH|PL|KH|HD|TB|CV|L)\d{0,2}(?:-[\p{L}\d]+)*"
    ).unwrap();

    static ref DOCUMENT_NUMBER_LINE_REGEX: Regex = Regex::new(
        r"(?i)\bsố\s*:?\s*(\d{1,4}/\d{4}/[\p{L}\d\-]+)"
    ).unwrap();

    // "..., ngày 12 tháng 5 năm 2017"
    static ref ISSUED_DATE_REGEX: Regex = Regex::new(
        r"(?i)ngày\s+(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})"
    ).unwrap();

    // "có hiệu lực thi hành kể từ ngày 01 tháng 7 năm 2017" or "... từ ngày 01/7/2017"
    static ref EFFECTIVE_DATE_REGEX: Regex = Regex::new(
        r"(?i)có\s+hiệu\s+lực[^.\n]{0,40}?(\d{1,2})\s*(?:tháng\s*|/)(\d{1,2})\s*(?:năm\s*|/)(\d{4})"
    ).unwrap();

    static ref ISSUING_BODY_REGEX: Regex = Regex::new(
        r"^(ỦY BAN THƯỜNG VỤ QUỐC HỘI|ỦY BAN NHÂN DÂN|UỶ BAN NHÂN DÂN|HỘI ĐỒNG NHÂN DÂN|THỦ TƯỚNG CHÍNH PHỦ|CHÍNH PHỦ|QUỐC HỘI|TÒA ÁN NHÂN DÂN TỐI CAO|VIỆN KIỂM SÁT NHÂN DÂN TỐI CAO|NGÂN HÀNG NHÀ NƯỚC(?: VIỆT NAM)?|BỘ [\p{Lu} ,]+|UBND[\p{Lu} ]*)"
    ).unwrap();

    static ref LOCALITY_REGEX: Regex = Regex::new(
        r"^(TỈNH|THÀNH PHỐ|QUẬN|HUYỆN|THỊ XÃ|XÃ|PHƯỜNG)\s+[\p{Lu} ]+"
    ).unwrap();

    static ref SIGNER_TITLE_REGEX: Regex = Regex::new(
        r"^(?:TM\.|KT\.|Q\.|TL\.|TUQ\.|CHỦ TỊCH|PHÓ CHỦ TỊCH|BỘ TRƯỞNG|THỨ TRƯỞNG|THỦ TƯỚNG|PHÓ THỦ TƯỚNG|GIÁM ĐỐC|CHÁNH ÁN|VIỆN TRƯỞNG|THỐNG ĐỐC)"
    ).unwrap();

    // Nguyễn Văn An
    static ref PERSON_NAME_REGEX: Regex = Regex::new(
        r"^\p{Lu}\p{Ll}*(?:\s+\p{Lu}\p{Ll}*){1,5}$"
    ).unwrap();
}

/// Heading line → display name
const DOCUMENT_TYPES: &[(&str, &str)] = &[
    ("THÔNG TƯ LIÊN TỊCH", "Thông tư liên tịch"),
    ("HIẾN PHÁP", "Hiến pháp"),
    ("BỘ LUẬT", "Bộ luật"),
    ("LUẬT", "Luật"),
    ("PHÁP LỆNH", "Pháp lệnh"),
    ("NGHỊ ĐỊNH", "Nghị định"),
    ("NGHỊ QUYẾT", "Nghị quyết"),
    ("THÔNG TƯ", "Thông tư"),
    ("QUYẾT ĐỊNH", "Quyết định"),
    ("CHỈ THỊ", "Chỉ thị"),
    ("KẾ HOẠCH", "Kế hoạch"),
    ("CÔNG VĂN", "Công văn"),
];

/// Document number code → display name
const CODE_TYPES: &[(&str, &str)] = &[
    ("TTLT", "Thông tư liên tịch"),
    ("UBTVQH", "Nghị quyết"),
    ("QĐ", "Quyết định"),
    ("NĐ", "Nghị định"),
    ("TT", "Thông tư"),
    ("NQ", "Nghị quyết"),
    ("CT", "Chỉ thị"),
    ("QH", "Luật"),
    ("PL", "Pháp lệnh"),
    ("KH", "Kế hoạch"),
    ("CV", "Công văn"),
];

/// Lines scanned for header fields (issuing body, heading, title)
const HEADER_LINES: usize = 40;

/// Metadata recovered from a document's text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LawMetadata {
    pub title: Option<String>,
    pub so_hieu: Option<String>,
    pub document_type: Option<String>,
    pub issuing_body: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub signer: Option<String>,
}

/// All document numbers mentioned in `text`, upper-cased, in order, deduplicated
pub fn find_document_numbers(text: &str) -> Vec<String> {
    let mut numbers: Vec<String> = Vec::new();
    for m in DOCUMENT_NUMBER_REGEX.find_iter(text) {
        let number = m.as_str().to_uppercase();
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }
    numbers
}

pub fn extract_metadata(text: &str) -> LawMetadata {
    let lines: Vec<String> = text
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect();
    let header: Vec<&str> = lines.iter().take(HEADER_LINES).map(String::as_str).collect();

    let so_hieu = extract_so_hieu(text);
    let heading = find_heading(&header);
    let document_type = heading
        .map(|(_, name)| name.to_string())
        .or_else(|| so_hieu.as_deref().and_then(type_from_number));

    LawMetadata {
        title: heading.and_then(|(index, name)| extract_title(&header, index, name)),
        issuing_body: extract_issuing_body(&header)
            .or_else(|| so_hieu.as_deref().and_then(body_from_number)),
        issued_date: capture_date(&ISSUED_DATE_REGEX, text),
        effective_date: capture_date(&EFFECTIVE_DATE_REGEX, text),
        signer: extract_signer(&lines),
        so_hieu,
        document_type,
    }
}

fn extract_so_hieu(text: &str) -> Option<String> {
    if let Some(caps) = DOCUMENT_NUMBER_LINE_REGEX.captures(text) {
        return Some(caps[1].trim_end_matches('-').to_uppercase());
    }
    find_document_numbers(text).into_iter().next()
}

/// Index and display name of the first heading line ("QUYẾT ĐỊNH", "LUẬT", ...)
fn find_heading(header: &[&str]) -> Option<(usize, &'static str)> {
    header.iter().enumerate().find_map(|(index, line)| {
        DOCUMENT_TYPES
            .iter()
            .find(|(heading, _)| *line == *heading)
            .map(|(_, name)| (index, *name))
    })
}

fn type_from_number(so_hieu: &str) -> Option<String> {
    let code = so_hieu.splitn(3, '/').nth(2)?;
    let prefix: String = code
        .split('-')
        .next()?
        .chars()
        .take_while(|c| !c.is_ascii_digit())
        .collect();
    CODE_TYPES
        .iter()
        .find(|(c, _)| *c == prefix)
        .map(|(_, name)| name.to_string())
}

fn body_from_number(so_hieu: &str) -> Option<String> {
    let upper = so_hieu.to_uppercase();
    if upper.ends_with("-UBND") {
        Some("Ủy ban nhân dân".to_string())
    } else if upper.ends_with("-CP") || upper.ends_with("-TTG") {
        Some("Chính phủ".to_string())
    } else if upper.contains("/QH") {
        Some("Quốc hội".to_string())
    } else if upper.ends_with("-BTC") {
        Some("Bộ Tài chính".to_string())
    } else {
        None
    }
}

fn extract_issuing_body(header: &[&str]) -> Option<String> {
    for (index, line) in header.iter().enumerate() {
        // Two-column headers flatten to "ỦY BAN NHÂN DÂN CỘNG HÒA XÃ HỘI ..."
        let left = strip_national_motto(line);
        let Some(m) = ISSUING_BODY_REGEX.find(left) else {
            continue;
        };

        let mut body = m.as_str().trim().trim_end_matches(',').to_string();
        if let Some(next) = header.get(index + 1) {
            let next = strip_national_motto(next);
            if let Some(locality) = LOCALITY_REGEX.find(next) {
                body.push(' ');
                body.push_str(locality.as_str().trim());
            }
        }
        return Some(body);
    }
    None
}

fn strip_national_motto(line: &str) -> &str {
    ["CỘNG HÒA", "CỘNG HOÀ", "Độc lập", "ĐỘC LẬP"]
        .iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .map(|pos| line[..pos].trim())
        .unwrap_or(line)
}

fn extract_title(header: &[&str], heading_index: usize, type_name: &str) -> Option<String> {
    let subject = header.get(heading_index + 1)?;
    if DOCUMENT_NUMBER_LINE_REGEX.is_match(subject) || subject.starts_with("Căn cứ") {
        return None;
    }
    Some(format!("{} {}", type_name, sentence_case(subject)))
}

/// "VỀ VIỆC BAN HÀNH QUY CHẾ" → "về việc ban hành quy chế"; mixed case is kept
fn sentence_case(line: &str) -> String {
    let has_lowercase = line.chars().any(|c| c.is_lowercase());
    if has_lowercase {
        let mut chars = line.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        line.to_lowercase()
    }
}

fn capture_date(regex: &Regex, text: &str) -> Option<NaiveDate> {
    let caps = regex.captures(text)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Name line under the last signature title in the closing block
fn extract_signer(lines: &[String]) -> Option<String> {
    let tail_start = lines.len().saturating_sub(20);
    let tail = &lines[tail_start..];

    let after_title = tail
        .iter()
        .rposition(|line| SIGNER_TITLE_REGEX.is_match(line))
        .map(|pos| pos + 1)
        .unwrap_or(0);

    tail[after_title..]
        .iter()
        .find(|line| PERSON_NAME_REGEX.is_match(line))
        .or_else(|| {
            tail.iter()
                .rev()
                .take(10)
                .find(|line| PERSON_NAME_REGEX.is_match(line))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DECISION: &str = "ỦY BAN NHÂN DÂN CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM
TỈNH ĐỒNG NAI Độc lập - Tự do - Hạnh phúc
Số: 25/2017/QĐ-UBND Đồng Nai, ngày 12 tháng 5 năm 2017

QUYẾT ĐỊNH
VỀ VIỆC BAN HÀNH QUY ĐỊNH QUẢN LÝ CHẤT THẢI RẮN

ỦY BAN NHÂN DÂN TỈNH ĐỒNG NAI
Căn cứ Luật Tổ chức chính quyền địa phương ngày 19 tháng 6 năm 2015;

Điều 1. Ban hành kèm theo Quyết định này Quy định quản lý chất thải rắn.
Điều 2. Quyết định này có hiệu lực thi hành kể từ ngày 01 tháng 7 năm 2017.

TM. ỦY BAN NHÂN DÂN
KT. CHỦ TỊCH
PHÓ CHỦ TỊCH

Nguyễn Văn An
";

    #[test]
    fn extracts_decision_metadata() {
        let meta = extract_metadata(DECISION);

        assert_eq!(meta.so_hieu.as_deref(), Some("25/2017/QĐ-UBND"));
        assert_eq!(meta.document_type.as_deref(), Some("Quyết định"));
        assert_eq!(
            meta.issuing_body.as_deref(),
            Some("ỦY BAN NHÂN DÂN TỈNH ĐỒNG NAI")
        );
        assert_eq!(meta.issued_date, NaiveDate::from_ymd_opt(2017, 5, 12));
        assert_eq!(meta.effective_date, NaiveDate::from_ymd_opt(2017, 7, 1));
        assert_eq!(meta.signer.as_deref(), Some("Nguyễn Văn An"));
        assert_eq!(
            meta.title.as_deref(),
            Some("Quyết định về việc ban hành quy định quản lý chất thải rắn")
        );
    }

    #[test]
    fn effective_date_accepts_slash_format() {
        let meta = extract_metadata("Nghị định này có hiệu lực từ ngày 15/02/2020.");
        assert_eq!(meta.effective_date, NaiveDate::from_ymd_opt(2020, 2, 15));
    }

    #[test]
    fn document_type_falls_back_to_number_code() {
        let meta = extract_metadata("Nghị định 100/2019/NĐ-CP quy định xử phạt");
        assert_eq!(meta.so_hieu.as_deref(), Some("100/2019/NĐ-CP"));
        assert_eq!(meta.document_type.as_deref(), Some("Nghị định"));
        assert_eq!(meta.issuing_body.as_deref(), Some("Chính phủ"));
    }

    #[test]
    fn finds_law_numbers_without_suffix() {
        assert_eq!(
            find_document_numbers("Luật 45/2019/QH14 và Nghị định 145/2020/nđ-cp"),
            vec!["45/2019/QH14".to_string(), "145/2020/NĐ-CP".to_string()]
        );
    }

    #[test]
    fn invalid_dates_are_dropped() {
        let meta = extract_metadata("Hà Nội, ngày 31 tháng 2 năm 2020");
        assert_eq!(meta.issued_date, None);
    }

    #[test]
    fn empty_text_yields_empty_metadata() {
        assert_eq!(extract_metadata(""), LawMetadata::default());
    }
}
