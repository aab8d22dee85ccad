//! Reading time estimation

use super::post::ContentGroup;

/// Default reading speed
pub const WORDS_PER_MINUTE: usize = 200;

/// Count words across every heading and body block of a post.
///
/// Words are the pieces produced by splitting on a single space, so runs of
/// spaces and empty strings each still contribute one piece. Images and
/// embeds carry no text and are not counted.
pub fn word_count(groups: &[ContentGroup]) -> usize {
    groups
        .iter()
        .map(|group| {
            let heading = count_pieces(&group.heading);
            let body: usize = group
                .body
                .iter()
                .filter_map(|block| block.text())
                .map(count_pieces)
                .sum();
            heading + body
        })
        .sum()
}

/// Estimated minutes to read a post, rounded up
pub fn reading_time(groups: &[ContentGroup], words_per_minute: usize) -> usize {
    word_count(groups).div_ceil(words_per_minute.max(1))
}

fn count_pieces(text: &str) -> usize {
    text.split(' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::richtext::{ImageBlock, RichTextBlock};

    fn group(heading: &str, paragraphs: &[&str]) -> ContentGroup {
        ContentGroup {
            heading: heading.to_string(),
            body: paragraphs
                .iter()
                .map(|p| RichTextBlock::paragraph(*p))
                .collect(),
        }
    }

    #[test]
    fn test_word_count() {
        let groups = vec![
            group("Proin et varius", &["Nullam dolor sapien", "vulputate eu"]),
            group("Cras", &["one two three four"]),
        ];
        assert_eq!(word_count(&groups), 3 + 3 + 2 + 1 + 4);
    }

    #[test]
    fn test_split_semantics() {
        // empty strings and double spaces count the way a single-space split does
        assert_eq!(word_count(&[group("", &[])]), 1);
        assert_eq!(word_count(&[group("a  b", &[""])]), 3 + 1);
    }

    #[test]
    fn test_non_text_blocks_are_skipped() {
        let groups = vec![ContentGroup {
            heading: "Gallery".to_string(),
            body: vec![RichTextBlock::Image(ImageBlock {
                url: "https://images.prismic.io/a.png".to_string(),
                alt: None,
                copyright: None,
                link_to: None,
            })],
        }];
        assert_eq!(word_count(&groups), 1);
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let words = vec!["word"; 201].join(" ");
        let groups = vec![group("", &[words.as_str()])];
        // 1 (empty heading) + 201
        assert_eq!(word_count(&groups), 202);
        assert_eq!(reading_time(&groups, WORDS_PER_MINUTE), 2);
        assert_eq!(reading_time(&groups, 202), 1);
        assert_eq!(reading_time(&[], WORDS_PER_MINUTE), 0);
    }

    #[test]
    fn test_zero_speed_is_clamped() {
        let groups = vec![group("one two", &[])];
        assert_eq!(reading_time(&groups, 0), 2);
    }
}
