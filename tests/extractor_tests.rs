use std::num::NonZeroUsize;

use search_server::extractor::{ExtractOptions, HtmlExtractor, truncate_to_bytes};

const BASEBALL: &str = include_str!("fixtures/baseball.html");
const MENUS: &str = include_str!("fixtures/menus.html");

mod test_helpers {
    use super::*;

    pub fn extractor(strip_html_menus: bool, max_text_bytes: Option<usize>) -> HtmlExtractor {
        HtmlExtractor::new(ExtractOptions {
            strip_html_menus,
            max_text_bytes: max_text_bytes.and_then(NonZeroUsize::new),
        })
    }
}

use test_helpers::*;

#[cfg(test)]
mod title_tests {
    use super::*;

    #[test]
    fn test_title_from_title_element() {
        let extracted = extractor(false, None).extract(BASEBALL);
        assert_eq!(extracted.title.as_deref(), Some("Baseball - Wikipedia"));
    }

    #[test]
    fn test_title_entities_and_line_breaks() {
        let extracted = extractor(false, None).extract(MENUS);
        assert_eq!(extracted.title.as_deref(), Some("Fish & Chips Recipes"));
    }

    #[test]
    fn test_missing_title_is_none() {
        let extracted = extractor(false, None).extract("<html><body><p>Just text</p></body></html>");
        assert!(extracted.title.is_none());
        assert_eq!(extracted.text, "Just text");
    }

    #[test]
    fn test_title_not_repeated_in_text() {
        let extracted = extractor(false, None).extract(BASEBALL);
        assert!(!extracted.text.contains("Baseball - Wikipedia"));
        assert!(extracted.text.starts_with("Main page"));
    }
}

#[cfg(test)]
mod text_tests {
    use super::*;

    #[test]
    fn test_scripts_and_styles_removed() {
        let extracted = extractor(false, None).extract(BASEBALL);
        assert!(!extracted.text.contains("dataLayer"));
        assert!(!extracted.text.contains("font-family"));
    }

    #[test]
    fn test_paragraph_whitespace_collapsed() {
        let extracted = extractor(false, None).extract(BASEBALL);
        assert!(extracted.text.contains(
            "Baseball is a bat-and-ball sport played between two teams of nine players each, taking turns batting and fielding."
        ));
    }

    #[test]
    fn test_blocks_become_lines() {
        let html = "<div>first</div><div>second <b>bold</b></div><p>third</p>";
        let extracted = extractor(false, None).extract(html);
        assert_eq!(extracted.text, "first\nsecond bold\nthird");
    }

    #[test]
    fn test_inline_elements_do_not_split_words() {
        let extracted = extractor(false, None).extract("<p>foo<b>bar</b> baz</p>");
        assert_eq!(extracted.text, "foobar baz");
    }

    #[test]
    fn test_table_cells_are_separated() {
        let html = "<table><tr><td>Team</td><td>Wins</td></tr><tr><td>Cubs</td><td>92</td></tr></table>";
        let extracted = extractor(false, None).extract(html);
        assert_eq!(extracted.text, "Team Wins\nCubs 92");
    }

    #[test]
    fn test_malformed_html_degrades_gracefully() {
        let extracted = extractor(false, None).extract("<div><p>unclosed <b>tags<div></span>");
        assert_eq!(extracted.text, "unclosed tags");
    }

    #[test]
    fn test_empty_and_non_html_input() {
        let extracted = extractor(true, Some(10)).extract("");
        assert!(extracted.title.is_none());
        assert!(extracted.text.is_empty());

        let extracted = extractor(false, None).extract("\u{0}\u{1}<<<>>>");
        assert!(extracted.title.is_none());
    }
}

#[cfg(test)]
mod menu_tests {
    use super::*;

    #[test]
    fn test_nav_block_kept_without_stripping() {
        let extracted = extractor(false, None).extract(BASEBALL);
        assert!(extracted.text.contains("Random article"));
        assert!(extracted.text.contains("Privacy policy"));
    }

    #[test]
    fn test_nav_block_removed_with_stripping() {
        let extracted = extractor(true, None).extract(BASEBALL);
        assert!(!extracted.text.contains("Main page"));
        assert!(!extracted.text.contains("Random article"));
        assert!(!extracted.text.contains("Privacy policy"));
        assert!(extracted.text.contains("Baseball is a bat-and-ball sport"));
        assert_eq!(extracted.title.as_deref(), Some("Baseball - Wikipedia"));
    }

    #[test]
    fn test_class_role_and_link_cluster_menus() {
        let kept = extractor(false, None).extract(MENUS);
        for word in ["Home", "Starters", "Desserts"] {
            assert!(kept.text.contains(word), "{word} should be kept");
        }

        let stripped = extractor(true, None).extract(MENUS);
        for word in ["Home", "Contact", "Starters", "Mains", "Desserts", "Snacks"] {
            assert!(!stripped.text.contains(word), "{word} should be stripped");
        }
    }

    #[test]
    fn test_article_content_survives_stripping() {
        let stripped = extractor(true, None).extract(MENUS);
        assert!(stripped.text.contains("Beer batter"));
        assert!(stripped.text.contains("rest the batter for thirty minutes before frying"));
        assert!(stripped.text.contains("Use a neutral oil heated to 180 degrees."));
    }
}

#[cfg(test)]
mod truncation_tests {
    use super::*;

    #[test]
    fn test_text_never_exceeds_budget() {
        for max in [1, 5, 17, 64, 200] {
            let extracted = extractor(false, Some(max)).extract(BASEBALL);
            assert!(extracted.text.len() <= max, "{} > {max}", extracted.text.len());
        }
    }

    #[test]
    fn test_truncation_on_char_boundary() {
        let html = "<p>ééééé</p>";
        for max in 1..=10 {
            let extracted = extractor(false, Some(max)).extract(html);
            assert!(extracted.text.len() <= max);
            assert_eq!(extracted.text.len() % 2, 0, "split inside a character");
            assert!(extracted.text.chars().all(|c| c == 'é'));
        }
    }

    #[test]
    fn test_unbounded_by_default() {
        let full = extractor(false, None).extract(BASEBALL);
        assert!(full.text.len() > 200);
    }

    #[test]
    fn test_truncate_helper_with_emoji() {
        let mut s = "ok 👍".to_string();
        truncate_to_bytes(&mut s, 5);
        assert_eq!(s, "ok ");
    }
}
