//! Rule-based query classification.
//!
//! Pure pattern matching on the lower-cased, trimmed message. The first rule
//! that fires decides the kind:
//! greeting, explicit document number, follow-up, legal keyword, general.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::domains::laws::metadata::find_document_numbers;
use crate::kernel::HistoryTurn;

/// Messages shorter than this (in characters) count as follow-ups when there is history
pub const SHORT_FOLLOW_UP_CHARS: usize = 50;

/// Optional sentence-final particles after a greeting
const GREETING_PARTICLES: &str = r"(\s+(nhé|nha|nhe|ạ|ơi|à))?";

lazy_static! {
    static ref GREETING_PATTERNS: Vec<Regex> = [
        r"^(xin\s+)?chào(\s+(bạn|anh|chị|em|ad|admin|bot|trợ lý))?",
        r"^chào\s+buổi\s+(sáng|trưa|chiều|tối)(\s+(bạn|anh|chị))?",
        r"^(hi|hello|hey|helo|hallo)(\s+(there|bạn|bot|ad))?",
        r"^(alo|a lô|a lo)(\s+alo)*",
        r"^good\s+(morning|afternoon|evening)",
        r"^(xin\s+)?chào\s+(mọi người|cả nhà)",
    ]
    .iter()
    .map(|p| Regex::new(&format!("{}{}$", p, GREETING_PARTICLES)).unwrap())
    .collect();

    static ref FOLLOW_UP_PATTERNS: Vec<Regex> = [
        r"^(tóm lại|tóm tắt|vậy thì|vậy còn|thế còn|còn nếu|còn trường hợp|nếu vậy|như vậy)",
        r"(nói rõ hơn|giải thích thêm|giải thích rõ|chi tiết hơn|cụ thể hơn|ví dụ thêm)",
        r"(câu trả lời (trên|trước)|ở trên|vừa rồi|vừa nói|bạn vừa|điều đó|vấn đề này|trường hợp này)",
        r"^(tại sao|vì sao|sao lại)\s*\??$",
        r"(what about|and if|tell me more|explain more)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref LEGAL_KEYWORD_REGEX: Regex = Regex::new(&format!(
        r"\b(?:{})\b",
        LEGAL_KEYWORDS
            .iter()
            .map(|kw| regex::escape(kw))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .unwrap();

    /// Article, clause, point, chapter or section followed by its number
    static ref STRUCTURE_REFERENCE_REGEX: Regex =
        Regex::new(r"\b(điều|khoản|điểm|chương|mục)\s+(\d+|[ivxlc]+\b|[a-zđ]\b)").unwrap();

    static ref SUMMARY_REGEX: Regex =
        Regex::new(r"(tóm lại|tóm tắt|ngắn gọn|tổng kết|summary|summari[sz]e|tl;dr)").unwrap();

    static ref SOURCE_REQUEST_REGEX: Regex = Regex::new(
        r"(nguồn|trích dẫn|căn cứ|link|đường dẫn|văn bản gốc|tài liệu tham khảo|tham chiếu|\bsources?\b|\breferences?\b|\bcite\b|citation)"
    )
    .unwrap();
}

/// Whole-word markers of a legal-domain question
pub const LEGAL_KEYWORDS: &[&str] = &[
    // Document kinds
    "luật", "bộ luật", "nghị định", "nghị quyết", "thông tư", "quyết định", "chỉ thị",
    "pháp lệnh", "hiến pháp", "văn bản", "công văn", "thông tư liên tịch",
    // Procedure and rights
    "quy định", "pháp luật", "pháp lý", "hiệu lực", "ban hành", "thủ tục", "hồ sơ",
    "giấy phép", "đăng ký", "quyền", "nghĩa vụ", "trách nhiệm", "xử phạt", "vi phạm",
    "hành chính", "khiếu nại", "tố cáo", "khởi kiện", "tranh chấp", "tòa án", "bản án",
    "hợp đồng", "bồi thường", "thừa kế", "di chúc", "ly hôn", "kết hôn", "hộ tịch",
    "đất đai", "sổ đỏ", "quyền sử dụng đất", "nhà ở", "xây dựng", "doanh nghiệp",
    "thuế", "lao động", "bảo hiểm", "tiền lương", "hình sự", "dân sự", "tội",
    "công an", "ủy ban", "ubnd", "chính phủ", "quốc hội", "bộ trưởng", "cơ quan",
    "mức phạt", "phí", "lệ phí", "môi trường", "giao thông", "cư trú", "căn cước",
    // English
    "law", "laws", "lawyer", "legal", "decree", "circular", "regulation", "contract", "court", "penalty",
    "tax", "license",
];

/// What the message is, by first matching rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Greeting,
    FollowUp,
    Legal,
    General,
}

impl std::fmt::Display for QueryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKind::Greeting => write!(f, "greeting"),
            QueryKind::FollowUp => write!(f, "follow_up"),
            QueryKind::Legal => write!(f, "legal"),
            QueryKind::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAnalysis {
    pub kind: QueryKind,
    /// A legal keyword or document number appears anywhere in the message
    pub is_legal_related: bool,
    pub wants_sources: bool,
    pub wants_summary: bool,
    /// Upper-cased document numbers found in the message
    pub document_numbers: Vec<String>,
}

impl QueryAnalysis {
    pub fn is_greeting(&self) -> bool {
        self.kind == QueryKind::Greeting
    }

    pub fn is_follow_up(&self) -> bool {
        self.kind == QueryKind::FollowUp
    }
}

pub fn classify(query: &str, history: &[HistoryTurn]) -> QueryAnalysis {
    let normalized = normalize(query);
    let document_numbers = find_document_numbers(query);
    let has_legal_keyword = contains_legal_keyword(&normalized);
    let is_legal_related = has_legal_keyword || !document_numbers.is_empty();

    let kind = if is_greeting(&normalized) {
        QueryKind::Greeting
    } else if !document_numbers.is_empty() {
        QueryKind::Legal
    } else if is_follow_up(&normalized, history) {
        QueryKind::FollowUp
    } else if has_legal_keyword {
        QueryKind::Legal
    } else {
        QueryKind::General
    };

    QueryAnalysis {
        kind,
        is_legal_related: kind != QueryKind::Greeting && is_legal_related,
        wants_sources: SOURCE_REQUEST_REGEX.is_match(&normalized),
        wants_summary: SUMMARY_REGEX.is_match(&normalized),
        document_numbers,
    }
}

/// Lower-case, trim, collapse whitespace and drop trailing punctuation
fn normalize(query: &str) -> String {
    query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '!' | '.' | ',' | '?' | '~' | ':' | ')'))
        .trim()
        .to_string()
}

fn is_greeting(normalized: &str) -> bool {
    GREETING_PATTERNS.iter().any(|re| re.is_match(normalized))
}

fn is_follow_up(normalized: &str, history: &[HistoryTurn]) -> bool {
    if history.is_empty() {
        return false;
    }
    FOLLOW_UP_PATTERNS.iter().any(|re| re.is_match(normalized))
        || normalized.chars().count() < SHORT_FOLLOW_UP_CHARS
}

fn contains_legal_keyword(normalized: &str) -> bool {
    LEGAL_KEYWORD_REGEX.is_match(normalized) || STRUCTURE_REFERENCE_REGEX.is_match(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> HistoryTurn {
        HistoryTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    fn history() -> Vec<HistoryTurn> {
        vec![
            turn("user", "Thủ tục đăng ký kết hôn gồm những gì?"),
            turn("assistant", "Hồ sơ gồm tờ khai và giấy tờ tùy thân."),
        ]
    }

    #[test]
    fn greetings_win_regardless_of_history() {
        for greeting in ["chào bạn", "Hi", "  Xin chào!  ", "hello", "Chào buổi sáng", "alo"] {
            assert_eq!(classify(greeting, &[]).kind, QueryKind::Greeting, "{}", greeting);
            assert_eq!(classify(greeting, &history()).kind, QueryKind::Greeting);
        }
    }

    #[test]
    fn greetings_may_end_with_a_particle() {
        for greeting in ["chào bạn nhé", "xin chào bạn ạ", "chào ad ơi", "hello nha"] {
            assert_eq!(classify(greeting, &[]).kind, QueryKind::Greeting, "{}", greeting);
        }
        assert_eq!(classify("chào bạn nhé, luật đất đai", &[]).kind, QueryKind::Legal);
    }

    #[test]
    fn greeting_with_a_question_is_not_a_greeting() {
        let analysis = classify("chào bạn, cho hỏi về luật đất đai", &[]);
        assert_eq!(analysis.kind, QueryKind::Legal);
    }

    #[test]
    fn document_number_makes_query_legal() {
        let analysis = classify("Quyết định 25/2017/QĐ-UBND nói gì?", &history());
        assert_eq!(analysis.kind, QueryKind::Legal);
        assert!(analysis.is_legal_related);
        assert_eq!(analysis.document_numbers, vec!["25/2017/QĐ-UBND".to_string()]);
    }

    #[test]
    fn bare_document_number_is_legal_related() {
        let analysis = classify("25/2017/QĐ-UBND", &[]);
        assert_eq!(analysis.kind, QueryKind::Legal);
        assert!(analysis.is_legal_related);
    }

    #[test]
    fn follow_up_needs_history() {
        assert_eq!(classify("tóm lại là sao", &history()).kind, QueryKind::FollowUp);
        assert_eq!(classify("tóm lại là sao", &[]).kind, QueryKind::General);
    }

    #[test]
    fn short_message_with_history_is_follow_up() {
        let analysis = classify("còn phí bao nhiêu", &history());
        assert_eq!(analysis.kind, QueryKind::FollowUp);
        assert!(analysis.is_legal_related);
    }

    #[test]
    fn long_legal_question_with_history_is_legal() {
        let query = "Người lao động nghỉ việc không báo trước thì phải bồi thường những khoản nào theo bộ luật lao động";
        assert_eq!(classify(query, &history()).kind, QueryKind::Legal);
    }

    #[test]
    fn unrelated_question_is_general() {
        let analysis = classify("Hôm nay trời có mưa ở Sài Gòn không vậy bạn ơi", &[]);
        assert_eq!(analysis.kind, QueryKind::General);
        assert!(!analysis.is_legal_related);
    }

    #[test]
    fn keywords_match_whole_words_only() {
        for query in [
            "tôi muốn gọi taxi",
            "quán cà phê ở phía trước",
            "địa điểm du lịch đẹp",
            "mục đích chuyến đi là gì",
        ] {
            let analysis = classify(query, &[]);
            assert_eq!(analysis.kind, QueryKind::General, "{}", query);
            assert!(!analysis.is_legal_related, "{}", query);
        }

        assert!(classify("mức thuế thu nhập cá nhân", &[]).is_legal_related);
        assert!(classify("tax on rental income", &[]).is_legal_related);
    }

    #[test]
    fn numbered_structure_references_are_legal() {
        for query in ["Điều 5 nói về gì", "điểm a khoản 2", "nội dung chương II"] {
            assert_eq!(classify(query, &[]).kind, QueryKind::Legal, "{}", query);
        }
    }

    #[test]
    fn detects_source_and_summary_requests() {
        let analysis = classify("cho tôi xin nguồn văn bản gốc", &[]);
        assert!(analysis.wants_sources);

        let analysis = classify("Tóm tắt giúp tôi", &history());
        assert!(analysis.wants_summary);
        assert!(analysis.is_follow_up());
        assert!(!analysis.wants_sources);
    }
}
