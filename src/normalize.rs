//! Tweet text normalization.
//!
//! Used for topic-model input. Display metrics keep measuring the raw body.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url regex"));
// `@#foo` counts as a mention so that stripping the hashtag marker cannot
// expose a fresh `@foo` afterwards.
static RE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\B@+#*\w+").expect("mention regex"));
static RE_HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\B#+(\w)").expect("hashtag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Strip URLs, then @-mentions, then hashtag markers (keeping the word),
/// then collapse whitespace and trim.
///
/// Removals can splice new matches together (`http:@x//y`), so the passes
/// repeat until the text settles. The result is a fixed point, which makes
/// the function idempotent.
pub fn normalize(text: &str) -> String {
    let mut current = one_pass(text);
    loop {
        let next = one_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn one_pass(s: &str) -> String {
    let out = RE_URL.replace_all(s, "");
    let out = RE_MENTION.replace_all(&out, "");
    let out = RE_HASHTAG.replace_all(&out, "$1");
    let out = RE_WS.replace_all(&out, " ");
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_urls_mentions_and_hash_markers() {
        let s = "@SpaceX launch at https://x.com/abc?x=1 tonight #Starship   #go!";
        assert_eq!(normalize(s), "launch at tonight Starship go!");
    }

    #[test]
    fn keeps_email_like_and_mid_word_symbols() {
        assert_eq!(normalize("mail me a@b.com"), "mail me a@b.com");
        assert_eq!(normalize("C# and F#"), "C# and F#");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t\n "), "");
        assert_eq!(normalize("https://t.co/xyz @someone"), "");
    }

    #[test]
    fn spliced_matches_are_removed_too() {
        let once = normalize("see http:@x//example.com now");
        assert_eq!(once, "see now");
        assert_eq!(normalize("@#tag"), "");
    }
}
