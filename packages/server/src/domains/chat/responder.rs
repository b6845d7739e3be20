//! Reply text assembly for answers produced without the workflow.

use serde_json::{json, Value};

use super::ranking::ScoredLaw;

pub const GREETING_RESPONSE: &str = "Xin chào! Tôi là trợ lý pháp luật. \
Bạn có thể hỏi tôi về luật, nghị định, thông tư, quyết định hoặc các thủ tục pháp lý. \
Tôi có thể giúp gì cho bạn hôm nay?";

pub const OUT_OF_SCOPE_RESPONSE: &str = "Xin lỗi, câu hỏi của bạn có vẻ không thuộc lĩnh vực pháp luật. \
Tôi chỉ hỗ trợ tra cứu văn bản pháp luật và giải đáp các vấn đề pháp lý. \
Bạn vui lòng đặt câu hỏi liên quan đến pháp luật nhé.";

pub const NO_RESULTS_RESPONSE: &str = "Xin lỗi, tôi chưa tìm thấy văn bản pháp luật phù hợp với câu hỏi của bạn. \
Bạn có thể thử diễn đạt lại, thêm từ khóa cụ thể hoặc số hiệu văn bản (ví dụ: 25/2017/QĐ-UBND).";

/// Sentences kept when summarising the previous answer
pub const SUMMARY_SENTENCES: usize = 3;

const EXCERPT_CHARS: usize = 200;

/// Public path of a law's detail page
pub fn law_url(law: &ScoredLaw) -> String {
    format!("/laws/{}", law.law.id)
}

/// First sentences of the previous answer
pub fn follow_up_summary(previous_answer: &str) -> String {
    let sentences = first_sentences(previous_answer, SUMMARY_SENTENCES);
    format!("Tóm tắt nội dung đã trao đổi:\n\n{}", sentences.join(" "))
}

/// Numbered listing of local search results
pub fn local_search_response(query: &str, results: &[ScoredLaw], keywords: &[String]) -> String {
    let mut text = format!(
        "Tôi tìm thấy {} văn bản liên quan đến \"{}\":\n",
        results.len(),
        query.trim()
    );

    for (index, result) in results.iter().enumerate() {
        let law = &result.law;
        text.push_str(&format!("\n{}. **{}**\n", index + 1, law.title));
        if let Some(so_hieu) = &law.so_hieu {
            text.push_str(&format!("   - Số hiệu: {}\n", so_hieu));
        }
        if let Some(body) = &law.issuing_body {
            text.push_str(&format!("   - Cơ quan ban hành: {}\n", body));
        }
        if let Some(date) = law.issued_date {
            text.push_str(&format!("   - Ngày ban hành: {}\n", date.format("%d/%m/%Y")));
        }
        if let Some(content) = law.content.as_deref() {
            let excerpt = excerpt(content, keywords);
            if !excerpt.is_empty() {
                text.push_str(&format!("   - Trích đoạn: {}\n", excerpt));
            }
        }
    }

    text.push_str("\nBạn có thể hỏi chi tiết hơn về văn bản nào ở trên.");
    text
}

/// "Nguồn tham khảo" block with detail links
pub fn append_source_links(mut text: String, results: &[ScoredLaw]) -> String {
    if results.is_empty() {
        return text;
    }
    text.push_str("\n\n**Nguồn tham khảo:**\n");
    for result in results {
        let label = match &result.law.so_hieu {
            Some(so_hieu) => format!("{} ({})", result.law.title, so_hieu),
            None => result.law.title.clone(),
        };
        text.push_str(&format!("- [{}]({})\n", label, law_url(result)));
    }
    text.truncate(text.trim_end().len());
    text
}

/// Structured source entry returned next to the reply text
pub fn source_entry(result: &ScoredLaw) -> Value {
    let law = &result.law;
    json!({
        "id": law.id,
        "title": law.title,
        "so_hieu": law.so_hieu,
        "document_type": law.document_type,
        "issuing_body": law.issuing_body,
        "issued_date": law.issued_date,
        "score": result.score,
        "url": law_url(result),
    })
}

fn first_sentences(text: &str, count: usize) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            push_sentence(&mut sentences, &mut current);
        } else {
            current.push(c);
            let at_boundary = chars.peek().map_or(true, |next| next.is_whitespace());
            if matches!(c, '.' | '!' | '?') && at_boundary {
                push_sentence(&mut sentences, &mut current);
            }
        }
        if sentences.len() == count {
            return sentences;
        }
    }
    push_sentence(&mut sentences, &mut current);
    sentences.truncate(count);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim().trim_start_matches(['-', '*', '#', ' ']).trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
    current.clear();
}

/// Window of content around the first keyword hit, or the opening
fn excerpt(content: &str, keywords: &[String]) -> String {
    let flattened = content.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = flattened.chars().collect();
    if chars.is_empty() {
        return String::new();
    }

    let lower: Vec<char> = chars.iter().flat_map(|c| c.to_lowercase()).collect();
    // Lower-casing can change the length; only search when it did not
    let start = if lower.len() == chars.len() {
        let haystack: String = lower.iter().collect();
        keywords
            .iter()
            .filter_map(|kw| haystack.find(kw.as_str()))
            .min()
            .map(|byte| haystack[..byte].chars().count())
            .map(|pos| pos.saturating_sub(EXCERPT_CHARS / 4))
            .unwrap_or(0)
    } else {
        0
    };

    let end = (start + EXCERPT_CHARS).min(chars.len());
    let mut snippet: String = chars[start..end].iter().collect();
    if start > 0 {
        snippet.insert_str(0, "...");
    }
    if end < chars.len() {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::common::LawId;
    use crate::domains::laws::models::Law;

    fn scored(title: &str, so_hieu: Option<&str>, content: &str) -> ScoredLaw {
        ScoredLaw {
            law: Law {
                id: LawId::new(),
                title: title.to_string(),
                so_hieu: so_hieu.map(String::from),
                document_type: Some("Luật".to_string()),
                issuing_body: Some("Quốc hội".to_string()),
                issued_date: NaiveDate::from_ymd_opt(2013, 11, 29),
                effective_date: None,
                signer: None,
                content: Some(content.to_string()),
                file_name: None,
                status: "active".to_string(),
                created_by: None,
                created_at: Utc::now(),
            },
            score: 12,
        }
    }

    #[test]
    fn summary_keeps_first_three_sentences() {
        let previous = "Câu một. Câu hai!\n- Câu ba? Câu bốn. Câu năm.";
        assert_eq!(
            follow_up_summary(previous),
            "Tóm tắt nội dung đã trao đổi:\n\nCâu một. Câu hai! Câu ba?"
        );
    }

    #[test]
    fn summary_does_not_split_numbers() {
        let sentences = first_sentences("Mức phạt là 1.500.000 đồng. Áp dụng từ 2020", 3);
        assert_eq!(sentences, vec!["Mức phạt là 1.500.000 đồng.", "Áp dụng từ 2020"]);
    }

    #[test]
    fn listing_has_no_links() {
        let results = vec![scored("Luật Đất đai", Some("45/2013/QH13"), "Luật này quy định về đất đai")];
        let text = local_search_response("đất đai", &results, &["đất".to_string()]);

        assert!(text.contains("1. **Luật Đất đai**"));
        assert!(text.contains("Số hiệu: 45/2013/QH13"));
        assert!(text.contains("Ngày ban hành: 29/11/2013"));
        assert!(!text.contains("/laws/"));
        assert!(!text.contains("Nguồn tham khảo"));
    }

    #[test]
    fn source_links_point_at_detail_pages() {
        let results = vec![scored("Luật Đất đai", Some("45/2013/QH13"), "")];
        let text = append_source_links("Trả lời".to_string(), &results);

        let expected = format!(
            "Trả lời\n\n**Nguồn tham khảo:**\n- [Luật Đất đai (45/2013/QH13)](/laws/{})",
            results[0].law.id
        );
        assert_eq!(text, expected);
        assert_eq!(append_source_links("x".to_string(), &[]), "x");
    }

    #[test]
    fn excerpt_centres_on_keyword() {
        let content = format!("{} đất đai {}", "a ".repeat(200), "b ".repeat(200));
        let snippet = excerpt(&content, &["đất".to_string()]);
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("đất đai"));
    }

    #[test]
    fn source_entry_carries_url_and_score() {
        let result = scored("Luật Đất đai", None, "");
        let entry = source_entry(&result);
        assert_eq!(entry["score"], 12);
        assert_eq!(entry["url"], format!("/laws/{}", result.law.id));
    }
}
