//! Text normalization shared by the extractors, the reconciler and the
//! filename builder: transliteration to ASCII, case repair for all-caps
//! metadata, and filename sanitization.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Returned by [`sanitize_for_filename`] when nothing survives sanitization.
pub const UNKNOWN_FILE: &str = "UnknownFile";

/// Words kept lowercase by [`fix_case`] unless they start the string.
const MINOR_WORDS: &[&str] = &[
    "of", "the", "and", "in", "on", "a", "an", "to", "for", "with", "at", "by", "from",
];

/// Letters that survive NFD decomposition as single non-ASCII codepoints.
///
/// Accented Latin letters (ř, ň, ż, ...) decompose to base letter + combining
/// mark and never reach this table.
static TRANSLITERATIONS: &[(char, &str)] = &[
    // Latin letters without a decomposition
    ('ß', "ss"),
    ('ẞ', "SS"),
    ('ł', "l"),
    ('Ł', "L"),
    ('ø', "o"),
    ('Ø', "O"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ð', "d"),
    ('Ð', "D"),
    ('þ', "th"),
    ('Þ', "Th"),
    ('ı', "i"),
    ('ħ', "h"),
    ('Ħ', "H"),
    ('ŧ', "t"),
    ('Ŧ', "T"),
    // Cyrillic
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "g"),
    ('д', "d"),
    ('е', "e"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "i"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "sch"),
    ('ъ', ""),
    ('ы', "y"),
    ('ь', ""),
    ('э', "e"),
    ('ю', "yu"),
    ('я', "ya"),
    ('є', "ye"),
    ('і', "i"),
    ('А', "A"),
    ('Б', "B"),
    ('В', "V"),
    ('Г', "G"),
    ('Д', "D"),
    ('Е', "E"),
    ('Ж', "Zh"),
    ('З', "Z"),
    ('И', "I"),
    ('К', "K"),
    ('Л', "L"),
    ('М', "M"),
    ('Н', "N"),
    ('О', "O"),
    ('П', "P"),
    ('Р', "R"),
    ('С', "S"),
    ('Т', "T"),
    ('У', "U"),
    ('Ф', "F"),
    ('Х', "Kh"),
    ('Ц', "Ts"),
    ('Ч', "Ch"),
    ('Ш', "Sh"),
    ('Щ', "Sch"),
    ('Ъ', ""),
    ('Ы', "Y"),
    ('Ь', ""),
    ('Э', "E"),
    ('Ю', "Yu"),
    ('Я', "Ya"),
    ('Є', "Ye"),
    ('І', "I"),
];

/// Convert text to plain ASCII.
///
/// Order matters: NFD decomposition, then combining marks are dropped, then
/// the supplementary table handles letters NFD leaves intact, and finally any
/// codepoint still outside ASCII is removed.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii() {
            out.push(c);
        } else if let Some((_, replacement)) = TRANSLITERATIONS.iter().find(|(k, _)| *k == c) {
            out.push_str(replacement);
        }
    }
    out
}

/// True when the text has at least one cased letter and no lowercase ones.
fn is_all_caps(text: &str) -> bool {
    let mut has_cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// Uppercase the first letter of every letter run, lowercase the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}

/// Repair ALL-CAPS text into title case.
///
/// Mixed-case input is returned unchanged. Minor words ("of", "the", ...) are
/// lowercased except in first position, and the first letter of the result is
/// always uppercase.
pub fn fix_case(text: &str) -> String {
    if !is_all_caps(text) {
        return text.to_string();
    }

    let titled = title_case(text);
    let mut first_word_seen = false;
    let words: Vec<String> = titled
        .split(' ')
        .map(|word| {
            if word.is_empty() {
                return String::new();
            }
            let is_first = !first_word_seen;
            first_word_seen = true;
            let lower = word.to_lowercase();
            if !is_first && MINOR_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                word.to_string()
            }
        })
        .collect();
    let result = words.join(" ");

    let mut chars = result.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => result,
    }
}

/// Collapse runs of whitespace to a single space and trim both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

static FORBIDDEN_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

static CONTROL_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x1f\x7f-\u{9f}]").unwrap());

/// Make a metadata field safe to embed in a filename.
///
/// Colons become `colon_replacement`; `<>"/\|?*` become spaces. The
/// replacement itself goes through the same filter, so the result never
/// contains any of `<>:"/\|?*` or control characters. Returns
/// [`UNKNOWN_FILE`] if nothing is left.
pub fn sanitize_for_filename(text: &str, colon_replacement: &str) -> String {
    let ascii = transliterate(text);
    let replaced = ascii.replace(':', colon_replacement);
    let spaced = FORBIDDEN_CHARS_RE.replace_all(&replaced, " ");
    let stripped = CONTROL_CHARS_RE.replace_all(&spaced, "");
    let collapsed = collapse_whitespace(&stripped);
    let trimmed = collapsed.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        UNKNOWN_FILE.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterate_strips_accents() {
        assert_eq!(transliterate("Rényi Ångström Müller"), "Renyi Angstrom Muller");
    }

    #[test]
    fn transliterate_uses_table_for_undecomposable_letters() {
        assert_eq!(transliterate("Straße Łódź Søren Æsir"), "Strasse Lodz Soren AEsir");
    }

    #[test]
    fn transliterate_cyrillic() {
        assert_eq!(transliterate("Толстой"), "Tolstoi");
        assert_eq!(transliterate("Чехов"), "Chekhov");
    }

    #[test]
    fn transliterate_drops_unmapped() {
        assert_eq!(transliterate("深度 learning"), " learning");
        assert_eq!(transliterate("日本"), "");
    }

    #[test]
    fn fix_case_all_caps_title() {
        assert_eq!(
            fix_case("MACHINE LEARNING FOR SYSTEMS"),
            "Machine Learning for Systems"
        );
    }

    #[test]
    fn fix_case_first_minor_word_capitalized() {
        assert_eq!(fix_case("THE ART OF WAR"), "The Art of War");
        assert_eq!(fix_case("A STUDY IN SCARLET"), "A Study in Scarlet");
    }

    #[test]
    fn fix_case_mixed_case_unchanged() {
        assert_eq!(fix_case("Deep Learning with GPUs"), "Deep Learning with GPUs");
        assert_eq!(fix_case("already lower"), "already lower");
    }

    #[test]
    fn fix_case_hyphenated_and_digits() {
        assert_eq!(fix_case("SELF-SUPERVISED 3D VISION"), "Self-Supervised 3D Vision");
        assert_eq!(fix_case("2020"), "2020");
    }

    #[test]
    fn sanitize_replaces_forbidden_chars() {
        assert_eq!(
            sanitize_for_filename("What? A <Study> of \"AI\" / ML|DL*", " -"),
            "What A Study of AI ML DL"
        );
    }

    #[test]
    fn sanitize_colon_replacement() {
        assert_eq!(
            sanitize_for_filename("Attention: All You Need", " -"),
            "Attention - All You Need"
        );
        assert_eq!(
            sanitize_for_filename("Attention: All You Need", "_"),
            "Attention_ All You Need"
        );
    }

    #[test]
    fn sanitize_hostile_colon_replacement_is_filtered() {
        let out = sanitize_for_filename("a:b", ":?");
        assert!(!out.contains(':'));
        assert!(!out.contains('?'));
    }

    #[test]
    fn sanitize_strips_controls_and_trims_dots() {
        assert_eq!(sanitize_for_filename("..\u{7}Title  Here .", " -"), "Title Here");
        assert_eq!(sanitize_for_filename("Tab\tJoined", " -"), "TabJoined");
    }

    #[test]
    fn sanitize_empty_yields_unknown_file() {
        assert_eq!(sanitize_for_filename("", " -"), UNKNOWN_FILE);
        assert_eq!(sanitize_for_filename(" ... ", " -"), UNKNOWN_FILE);
        assert_eq!(sanitize_for_filename("日本語", " -"), UNKNOWN_FILE);
    }

    #[test]
    fn sanitize_never_emits_forbidden_chars() {
        let inputs = [
            "a<b>c:d\"e/f\\g|h?i*j",
            "\u{0}\u{1f}\u{7f}\u{85}\u{9f}x",
            "Über: «Grüße» — Ωmega",
            "::::",
        ];
        for input in inputs {
            let out = sanitize_for_filename(input, " -");
            assert!(
                !out.chars().any(|c| "<>:\"/\\|?*".contains(c) || c.is_control()),
                "{input:?} -> {out:?}"
            );
        }
    }
}
