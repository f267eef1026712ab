//! Search query construction

/// Lower-case `s` and drop every character that is not alphanumeric
pub fn lower_and_strip_non_alphanumeric(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Field-filtered search query, `track:<title> artist:<artist>`
pub fn search_query(title: &str, artist: &str) -> String {
    format!(
        "track:{} artist:{}",
        lower_and_strip_non_alphanumeric(title),
        lower_and_strip_non_alphanumeric(artist)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_and_case_are_stripped() {
        assert_eq!(search_query("Wonderwall!!", "Oasis"), "track:wonderwall artist:oasis");
    }

    #[test]
    fn test_spaces_are_removed() {
        assert_eq!(
            search_query("Don't Look Back in Anger", "Oasis"),
            "track:dontlookbackinanger artist:oasis"
        );
    }

    #[test]
    fn test_non_ascii_letters_are_kept() {
        assert_eq!(lower_and_strip_non_alphanumeric("Björk - Jóga"), "björkjóga");
    }
}
