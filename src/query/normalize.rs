//! Phrase-level normalization passes. Each pass is a pure function that
//! expands one phrase into zero or more rewritten phrases; composition and
//! deduplication live in the executor.

fn push_unique(out: &mut Vec<String>, candidate: String) {
    if !out.contains(&candidate) {
        out.push(candidate);
    }
}

/// Trim, fold CR/LF/TAB into spaces, collapse repeated spaces.
pub fn cleanup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if matches!(c, ' ' | '\r' | '\n' | '\t') {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(c);
    }
    out
}

/// Collapse runs of three or more identical characters, yielding the
/// original plus the 2-repeat and 1-repeat collapses when they differ.
pub fn repeat_forms(text: &str) -> Vec<String> {
    let mut out = vec![text.to_string()];
    let two = collapse_runs(text, 2);
    let one = collapse_runs(text, 1);
    push_unique(&mut out, two);
    push_unique(&mut out, one);
    out
}

fn collapse_runs(text: &str, keep: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let mut j = i;
        while j < chars.len() && chars[j] == chars[i] {
            j += 1;
        }
        let emit = if j - i >= 3 { keep } else { j - i };
        for _ in 0..emit {
            out.push(chars[i]);
        }
        i = j;
    }
    out
}

/// Hyphen/underscore and camel-case separator rewrites. `lowered` is the
/// phrase being expanded; `original` keeps the pre-lowercase casing that
/// camel-case detection needs.
pub fn separator_forms(lowered: &str, original: &str) -> Vec<String> {
    let mut out = vec![lowered.to_string()];
    if lowered.contains(['-', '_']) {
        push_unique(&mut out, lowered.replace(['-', '_'], " "));
    }
    if lowered.contains(' ') {
        push_unique(&mut out, lowered.replace(' ', "-"));
        push_unique(&mut out, lowered.replace(' ', "_"));
    }
    if original.chars().skip(1).any(|c| c.is_ascii_uppercase()) {
        let mut spaced = String::with_capacity(original.len() + 4);
        for (i, c) in original.chars().enumerate() {
            if i > 0 && c.is_ascii_uppercase() && !spaced.ends_with(' ') {
                spaced.push(' ');
            }
            spaced.extend(c.to_lowercase());
        }
        push_unique(&mut out, spaced);
    }
    out
}

/// Every way of removing a subset of the internal spaces, the unchanged
/// phrase first. Phrases with more than 16 gaps are passed through alone.
pub fn concat_forms(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split(' ').collect();
    let gaps = words.len() - 1;
    if gaps == 0 || gaps > 16 {
        return vec![text.to_string()];
    }
    let mut out = Vec::with_capacity(1 << gaps);
    for mask in (0..1u32 << gaps).rev() {
        let mut phrase = String::with_capacity(text.len());
        phrase.push_str(words[0]);
        for (i, word) in words[1..].iter().enumerate() {
            if mask & (1 << i) != 0 {
                phrase.push(' ');
            }
            phrase.push_str(word);
        }
        out.push(phrase);
    }
    out
}

/// Contiguous sub-phrases: the head run of up to five words first, then
/// every run of two to five words in reading order. One- and two-word
/// phrases yield their trivial cases directly.
pub fn extract_forms(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split(' ').collect();
    match words.len() {
        0 => Vec::new(),
        1 => vec![text.to_string()],
        2 => vec![
            text.to_string(),
            words[0].to_string(),
            words[1].to_string(),
        ],
        n => {
            let mut out = vec![words[..n.min(5)].join(" ")];
            for start in 0..n {
                for len in 2..=5 {
                    if start + len > n {
                        break;
                    }
                    push_unique(&mut out, words[start..start + len].join(" "));
                }
            }
            out
        }
    }
}

/// Prepositions that trigger the paraphrase templates.
pub const PREPOSITIONS: &[&str] = &[
    "about", "above", "across", "after", "against", "ahead", "along", "amid", "among", "apart",
    "around", "aside", "at", "away", "back", "before", "behind", "below", "beside", "between",
    "beyond", "by", "down", "downward", "during", "except", "for", "forward", "from", "in",
    "inside", "into", "like", "near", "of", "off", "on", "onto", "out", "outside", "over", "past",
    "round", "thought", "through", "throughout", "to", "together", "toward", "towards", "under",
    "underneath", "until", "up", "upon", "via", "with", "within", "without",
];

/// Phrasal-verb paraphrases: a phrase of two to six words ending in a
/// preposition, with an alphabetic lead word, has its filler span replaced
/// by each of six placeholder templates.
pub fn paraphrase_forms(text: &str) -> Vec<String> {
    let words: Vec<&str> = text.split(' ').collect();
    let n = words.len();
    if !(2..=6).contains(&n) {
        return Vec::new();
    }
    let lead = words[0];
    let prep = words[n - 1];
    if !PREPOSITIONS.contains(&prep)
        || lead.is_empty()
        || !lead.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Vec::new();
    }
    let forms = [
        format!("{lead} a {prep} b"),
        format!("{lead} a {prep}"),
        format!("{lead} {prep} a"),
        format!("{lead} ~ {prep} ~"),
        format!("{lead} ~ {prep}"),
        format!("{lead} {prep} ~"),
    ];
    forms.into_iter().filter(|form| form != text).collect()
}

/// Every single-space insertion into a lone word of at most 15 characters.
pub fn split_forms(text: &str) -> Vec<String> {
    if text.contains(' ') {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    let n = chars.len();
    if !(2..=15).contains(&n) {
        return Vec::new();
    }
    (1..n)
        .map(|i| {
            let mut phrase: String = chars[..i].iter().collect();
            phrase.push(' ');
            phrase.extend(&chars[i..]);
            phrase
        })
        .collect()
}
