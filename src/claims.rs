use unicode_segmentation::UnicodeSegmentation;

/// Sentence prefixes that mark a question or hedge rather than a claim.
const NON_CLAIM_PREFIXES: [&str; 10] =
    ["what", "why", "how", "when", "where", "who", "is", "are", "do", "can"];

pub fn segment_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn word_count(sentence: &str) -> usize {
    sentence.split_whitespace().count()
}

/// Pull candidate factual statements out of free text.
///
/// A sentence qualifies when it has more than four words, ends with a period,
/// and does not open with an interrogative or auxiliary token. When nothing
/// qualifies but the text does have sentences, the filter loosens to every
/// sentence longer than three words so evidence search still has material.
pub fn extract_claims(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let sentences = segment_sentences(text);

    let claims: Vec<String> = sentences
        .iter()
        .filter(|s| {
            let lowered = s.to_lowercase();
            word_count(s) > 4
                && s.ends_with('.')
                && !NON_CLAIM_PREFIXES.iter().any(|p| lowered.starts_with(p))
        })
        .cloned()
        .collect();

    if claims.is_empty() && !sentences.is_empty() {
        return sentences.into_iter().filter(|s| word_count(s) > 3).collect();
    }

    claims
}
