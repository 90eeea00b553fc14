use crate::engine::dictionary::Dictionary;

/// Candidate corrections for a lowercase `word`, closest first.
pub fn generate(word: &str, dictionary: &Dictionary, max_suggestions: usize) -> Vec<String> {
    if max_suggestions == 0 {
        return Vec::new();
    }

    let mut suggestions: Vec<String> = Vec::new();
    let len = word.chars().count();

    // 1. Prefix matches within two edits.
    if len >= 3 {
        let mut prefix_matches = dictionary.words_with_prefix(char_prefix(word, 3));
        prefix_matches.sort_by_key(|w| edit_distance(word, w));

        for candidate in prefix_matches {
            if suggestions.len() >= max_suggestions || edit_distance(word, &candidate) > 2 {
                break;
            }
            suggestions.push(candidate);
        }
    }

    // 2. Single-edit transformations (deletions, transpositions, common swaps).
    for transform in generate_transformations(word) {
        if suggestions.len() >= max_suggestions {
            break;
        }
        if dictionary.contains(&transform) && !suggestions.contains(&transform) {
            suggestions.push(transform);
        }
    }

    // 3. Shorter prefix, wider distance.
    if suggestions.len() < max_suggestions && len >= 2 {
        let mut prefix_matches = dictionary.words_with_prefix(char_prefix(word, 2));
        prefix_matches.sort_by_key(|w| edit_distance(word, w));

        for candidate in prefix_matches {
            if suggestions.len() >= max_suggestions {
                break;
            }
            if edit_distance(word, &candidate) <= 3 && !suggestions.contains(&candidate) {
                suggestions.push(candidate);
            }
        }
    }

    // 4. Bounded scan for very short words, where prefixes say little.
    if suggestions.len() < max_suggestions && len <= 3 {
        let mut candidates: Vec<(usize, String)> = dictionary
            .words_near_length(len, 100)
            .into_iter()
            .filter_map(|w| {
                let dist = edit_distance(word, &w);
                (dist <= 2 && !suggestions.contains(&w)).then_some((dist, w))
            })
            .collect();
        candidates.sort_by_key(|(dist, _)| *dist);

        for (_, candidate) in candidates {
            if suggestions.len() >= max_suggestions {
                break;
            }
            suggestions.push(candidate);
        }
    }

    suggestions.truncate(max_suggestions);
    suggestions
}

/// Re-apply the capitalization of `original` to a lowercase suggestion.
pub fn match_case(original: &str, suggestion: &str) -> String {
    let mut chars = original.chars();
    let first_upper = chars.next().map_or(false, char::is_uppercase);
    let all_upper = original.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase);

    if all_upper && original.chars().count() > 1 {
        suggestion.to_uppercase()
    } else if first_upper {
        let mut out = String::with_capacity(suggestion.len());
        let mut rest = suggestion.chars();
        if let Some(first) = rest.next() {
            out.extend(first.to_uppercase());
        }
        out.extend(rest);
        out
    } else {
        suggestion.to_string()
    }
}

fn char_prefix(word: &str, n: usize) -> &str {
    let end = word.char_indices().nth(n).map(|(i, _)| i).unwrap_or(word.len());
    &word[..end]
}

/// Calculate Levenshtein distance between two strings
fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Generate common transformations of a word
fn generate_transformations(word: &str) -> Vec<String> {
    let mut transformations = Vec::new();
    let chars: Vec<char> = word.chars().collect();

    // Deletions
    for i in 0..chars.len() {
        let mut new_word = chars.clone();
        new_word.remove(i);
        transformations.push(new_word.iter().collect());
    }

    // Transpositions (swap adjacent)
    for i in 0..chars.len().saturating_sub(1) {
        let mut new_word = chars.clone();
        new_word.swap(i, i + 1);
        transformations.push(new_word.iter().collect());
    }

    // Replacements (common typos)
    let common_replacements = [
        ('a', 'e'),
        ('e', 'i'),
        ('i', 'o'),
        ('o', 'u'),
        ('b', 'v'),
        ('c', 'k'),
        ('f', 'v'),
        ('g', 'j'),
        ('m', 'n'),
        ('s', 'z'),
        ('t', 'd'),
    ];

    for (i, &ch) in chars.iter().enumerate() {
        for &(from, to) in &common_replacements {
            if ch == from {
                let mut new_word = chars.clone();
                new_word[i] = to;
                transformations.push(new_word.iter().collect());
            }
        }
    }

    transformations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("hello", "hello"), 0);
        assert_eq!(edit_distance("hello", "hallo"), 1);
        assert_eq!(edit_distance("hello", "world"), 4);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("exmaple", "example"), 2);
    }

    #[test]
    fn test_transformations() {
        let transforms = generate_transformations("hello");
        assert!(transforms.contains(&"hllo".to_string())); // deletion
        assert!(transforms.contains(&"ehllo".to_string())); // transposition
    }

    #[test]
    fn test_generate_finds_transposition() {
        let dict = Dictionary::from_words(&["example", "sentence", "sample"]).unwrap();
        let suggestions = generate("exmaple", &dict, 3);
        assert_eq!(suggestions.first().map(String::as_str), Some("example"));

        let suggestions = generate("sentnce", &dict, 3);
        assert!(suggestions.contains(&"sentence".to_string()));
    }

    #[test]
    fn test_non_ascii_prefix() {
        let dict = Dictionary::from_words(&["über", "übel"]).unwrap();
        assert!(!generate("übr", &dict, 2).is_empty());
    }

    #[test]
    fn test_match_case() {
        assert_eq!(match_case("Exmaple", "example"), "Example");
        assert_eq!(match_case("TEH", "the"), "THE");
        assert_eq!(match_case("sentnce", "sentence"), "sentence");
    }
}
