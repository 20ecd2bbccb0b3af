// tests/normalize.rs
use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use tweet_insights::normalize::normalize;

#[test]
fn empty_is_ok() {
    assert_eq!(normalize(""), "");
    assert_eq!(normalize("   \n\t"), "");
}

#[test]
fn order_url_then_mention_then_hashtag() {
    let s = "Big day! @nasa #Artemis launch: https://nasa.gov/artemis?utm=1   www.example.com/x";
    assert_eq!(normalize(s), "Big day! Artemis launch:");
}

#[test]
fn keeps_hashtag_word() {
    assert_eq!(normalize("#AI and #Robotics"), "AI and Robotics");
}

#[test]
fn idempotent_on_handpicked_samples() {
    for s in [
        "plain text",
        "  lots   of\tspace \n here ",
        "@a @b @c",
        "##double #@mixed @#other",
        "http:@x//example.com",
        "ht#tp://nope",
        "email me at a@b.com #now",
        "https://t.co/abc",
        "🚀 to the moon #DOGE @elonmusk",
    ] {
        let once = normalize(s);
        assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
    }
}

/// Randomly spliced fragments of URLs, mentions, hashtags and whitespace.
#[test]
fn idempotent_on_synthetic_fragments() {
    let parts = [
        "@", "#", "http", "://", "www.", "x", "yz", " ", "\t", "\n", ".com", "/", ":", "_", "é",
        "@user", "#tag", "https://t.co/q", "word", "!", "(", ")",
    ];
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2_000 {
        let n = rng.random_range(1..12);
        let s: String = (0..n)
            .map(|_| *parts.choose(&mut rng).expect("non-empty parts"))
            .collect();
        let once = normalize(&s);
        assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
    }
}
