//! Text normalization: Unicode/HTML/whitespace cleanup, signature removal,
//! PII masking and a lightweight language identifier.
//!
//! Pure functions only -- no I/O, no async. Grounded on
//! `original_source/src/utils/text_processing.py`'s `TextProcessor`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    pub remove_html: bool,
    pub remove_signatures: bool,
    pub mask_pii: bool,
    pub preserve_native_script: bool,
}

impl CleanOptions {
    pub fn full_pipeline() -> Self {
        Self {
            remove_html: true,
            remove_signatures: true,
            mask_pii: false,
            preserve_native_script: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PiiMappings {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub urls: Vec<String>,
}

static BLOCK_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</li>").unwrap());
static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static MULTI_NEWLINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static MULTI_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap());
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[a-zA-Z0-9$\-_.+!*'(),%]+").unwrap()
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\+?\(?[0-9]{1,3}\)?[-\s.]?[0-9]{1,4}[-\s.]?[0-9]{1,4}[-\s.]?[0-9]{1,9}").unwrap()
});

static SIGNATURE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)--\s*\n.*",
        r"(?is)Best regards?,?.*",
        r"(?is)Kind regards?,?.*",
        r"(?is)Regards?,?.*",
        r"(?is)Thanks?,?.*",
        r"(?is)Saygılarımla.*",
        r"(?is)İyi günler.*",
        r"(?is)Sent from my (?:iPhone|iPad|Android).*",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static TURKISH_FOLD: LazyLock<HashMap<char, char>> = LazyLock::new(|| {
    [
        ('ı', 'i'),
        ('İ', 'I'),
        ('ğ', 'g'),
        ('Ğ', 'G'),
        ('ü', 'u'),
        ('Ü', 'U'),
        ('ş', 's'),
        ('Ş', 'S'),
        ('ö', 'o'),
        ('Ö', 'O'),
        ('ç', 'c'),
        ('Ç', 'C'),
    ]
    .into_iter()
    .collect()
});

pub fn normalize_unicode(text: &str) -> String {
    text.nfc().collect()
}

/// Folds Turkish-specific characters down to their ASCII counterparts.
/// A no-op when `preserve_native_script` is true.
pub fn fold_native_script(text: &str, preserve_native_script: bool) -> String {
    if preserve_native_script {
        return text.to_string();
    }
    text.chars()
        .map(|c| *TURKISH_FOLD.get(&c).unwrap_or(&c))
        .collect()
}

pub fn remove_html(text: &str) -> String {
    let text = BLOCK_TAG_RE.replace_all(text, "\n");
    let text = HTML_TAG_RE.replace_all(&text, "");
    decode_html_entities(&text)
}

/// Decodes the small set of entities support-ticket HTML actually contains.
fn decode_html_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace('\t', " ");
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = MULTI_NEWLINE_RE.replace_all(&text, "\n\n");
    let text = MULTI_SPACE_RE.replace_all(&text, " ");
    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();
    lines.join("\n").trim().to_string()
}

pub fn remove_signatures(text: &str) -> String {
    let mut text = text.to_string();
    for pattern in SIGNATURE_PATTERNS.iter() {
        text = pattern.replace(&text, "").to_string();
    }
    text.trim().to_string()
}

/// Replaces emails, phones (7+ digits, to avoid masking stray numbers) and
/// URLs with positionally indexed tokens, returning the originals.
pub fn mask_pii(text: &str) -> (String, PiiMappings) {
    let mut mappings = PiiMappings::default();
    let mut text = text.to_string();

    for (i, m) in EMAIL_RE.find_iter(&text.clone()).enumerate() {
        let matched = m.as_str().to_string();
        mappings.emails.push(matched.clone());
        text = text.replacen(&matched, &format!("[EMAIL_{i}]"), 1);
    }
    for (i, m) in PHONE_RE.find_iter(&text.clone()).enumerate() {
        let matched = m.as_str().to_string();
        if matched.chars().filter(|c| c.is_ascii_digit()).count() < 7 {
            continue;
        }
        mappings.phones.push(matched.clone());
        text = text.replacen(&matched, &format!("[PHONE_{i}]"), 1);
    }
    for (i, m) in URL_RE.find_iter(&text.clone()).enumerate() {
        let matched = m.as_str().to_string();
        mappings.urls.push(matched.clone());
        text = text.replacen(&matched, &format!("[URL_{i}]"), 1);
    }

    (text, mappings)
}

/// Full cleaning pipeline in the order: Unicode NFC -> HTML stripping ->
/// native-script folding -> whitespace normalization -> signature removal ->
/// PII masking.
pub fn clean(text: &str, options: &CleanOptions) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = normalize_unicode(text);
    if options.remove_html {
        text = remove_html(&text);
    }
    text = fold_native_script(&text, options.preserve_native_script);
    text = normalize_whitespace(&text);
    if options.remove_signatures {
        text = remove_signatures(&text);
    }
    if options.mask_pii {
        text = mask_pii(&text).0;
    }
    text.trim().to_string()
}

/// A lightweight n-gram-frequency language identifier distinguishing the
/// languages this service actually routes: English and Turkish, with a
/// handful of stopword hints for the others `original_source` enumerated.
/// Not a general-purpose detector -- the corpus carries no dedicated crate
/// for this, so it stays a pure function rather than fabricating a
/// dependency.
pub fn detect_language(text: &str) -> (String, f64) {
    if text.trim().is_empty() {
        return ("en".to_string(), 0.5);
    }

    const TURKISH_STOPWORDS: &[&str] = &[
        "ve", "bir", "bu", "için", "ile", "de", "da", "çok", "ben", "sen", "değil", "evet",
        "hayır", "merhaba", "teşekkür",
    ];
    const ENGLISH_STOPWORDS: &[&str] = &[
        "the", "and", "is", "are", "for", "with", "this", "that", "please", "thanks", "hello",
    ];

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let has_turkish_chars = text.chars().any(|c| TURKISH_FOLD.contains_key(&c));

    let tr_hits = words.iter().filter(|w| TURKISH_STOPWORDS.contains(w)).count();
    let en_hits = words.iter().filter(|w| ENGLISH_STOPWORDS.contains(w)).count();

    let lang = if has_turkish_chars || tr_hits > en_hits {
        "tr"
    } else {
        "en"
    };

    let confidence = (0.5 + text.chars().count() as f64 / 1000.0).min(0.95);
    (lang.to_string(), confidence)
}

pub fn truncate(text: &str, max_len: usize, suffix: &str) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(suffix.chars().count());
    let truncated: String = text.chars().take(keep).collect();
    format!("{truncated}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_collapses_whitespace_and_strips_html() {
        let input = "Hello<br>World</p>\n\n\n\nToo   many   spaces";
        let cleaned = clean(input, &CleanOptions::full_pipeline());
        assert!(!cleaned.contains("<br>"));
        assert!(!cleaned.contains("   "));
        assert!(!cleaned.contains("\n\n\n"));
    }

    #[test]
    fn clean_removes_signature_block() {
        let input = "Please fix my issue.\n\nBest regards,\nJohn Doe";
        let cleaned = clean(input, &CleanOptions::full_pipeline());
        assert!(!cleaned.contains("Best regards"));
        assert!(cleaned.contains("Please fix my issue"));
    }

    #[test]
    fn mask_pii_replaces_email_and_url() {
        let input = "Contact me at jane@example.com or visit https://example.com/help";
        let (masked, mappings) = mask_pii(input);
        assert!(masked.contains("[EMAIL_0]"));
        assert!(masked.contains("[URL_0]"));
        assert_eq!(mappings.emails, vec!["jane@example.com".to_string()]);
    }

    #[test]
    fn detect_language_defaults_to_english_on_empty() {
        assert_eq!(detect_language(""), ("en".to_string(), 0.5));
    }

    #[test]
    fn detect_language_picks_turkish_on_native_chars() {
        let (lang, _) = detect_language("Merhaba, ürünüm çalışmıyor");
        assert_eq!(lang, "tr");
    }

    #[test]
    fn truncate_preserves_short_text() {
        assert_eq!(truncate("short", 10, "..."), "short");
    }

    #[test]
    fn truncate_cuts_and_appends_suffix() {
        let result = truncate("abcdefghij", 5, "...");
        assert_eq!(result, "ab...");
    }
}
