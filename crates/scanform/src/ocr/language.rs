//! ISO 639-1 language codes and their engine-native equivalents.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageInfo {
    /// ISO 639-1 code, e.g. `de`.
    pub code: &'static str,
    pub name: &'static str,
    /// Tesseract traineddata name, e.g. `deu`.
    pub tesseract: &'static str,
}

const SUPPORTED: [LanguageInfo; 8] = [
    LanguageInfo {
        code: "en",
        name: "English",
        tesseract: "eng",
    },
    LanguageInfo {
        code: "de",
        name: "German (Deutsch)",
        tesseract: "deu",
    },
    LanguageInfo {
        code: "fr",
        name: "French (Français)",
        tesseract: "fra",
    },
    LanguageInfo {
        code: "es",
        name: "Spanish (Español)",
        tesseract: "spa",
    },
    LanguageInfo {
        code: "it",
        name: "Italian (Italiano)",
        tesseract: "ita",
    },
    LanguageInfo {
        code: "pt",
        name: "Portuguese (Português)",
        tesseract: "por",
    },
    LanguageInfo {
        code: "nl",
        name: "Dutch (Nederlands)",
        tesseract: "nld",
    },
    LanguageInfo {
        code: "ru",
        name: "Russian (Русский)",
        tesseract: "rus",
    },
];

pub fn supported_languages() -> &'static [LanguageInfo] {
    &SUPPORTED
}

fn lookup(code: &str) -> Option<&'static LanguageInfo> {
    let code = code.trim();
    SUPPORTED.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}

pub fn is_language_supported(code: &str) -> bool {
    lookup(code).is_some()
}

/// Tesseract code for an ISO code. Unknown codes pass through unchanged.
pub fn to_tesseract(code: &str) -> String {
    lookup(code)
        .map(|l| l.tesseract.to_string())
        .unwrap_or_else(|| code.trim().to_string())
}

/// Remote-engine hint for an ISO code. The remote engine speaks ISO codes,
/// so known codes are normalized to lower case and unknown ones pass through.
pub fn to_remote_hint(code: &str) -> String {
    lookup(code)
        .map(|l| l.code.to_string())
        .unwrap_or_else(|| code.trim().to_string())
}

/// Builds Tesseract's `primary+second+third` tag from native codes.
///
/// Additional codes keep their order; empties, repeats and the primary
/// itself are skipped.
pub fn tesseract_language_tag(primary: &str, additional: &[String]) -> String {
    let mut parts: Vec<&str> = vec![primary.trim()];
    for lang in additional {
        let lang = lang.trim();
        if !lang.is_empty() && !parts.contains(&lang) {
            parts.push(lang);
        }
    }
    parts.join("+")
}

/// Engine-native language settings derived from ISO codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelection {
    pub tesseract_primary: String,
    pub tesseract_additional: Vec<String>,
    pub remote_hints: Vec<String>,
}

/// Maps a primary ISO code plus extras onto both engines.
pub fn resolve(primary: &str, additional: &[String]) -> LanguageSelection {
    let tesseract_primary = to_tesseract(primary);
    let mut tesseract_additional: Vec<String> = Vec::new();
    let mut remote_hints = vec![to_remote_hint(primary)];

    for code in additional.iter().filter(|c| !c.trim().is_empty()) {
        let native = to_tesseract(code);
        if native != tesseract_primary && !tesseract_additional.contains(&native) {
            tesseract_additional.push(native);
        }
        let hint = to_remote_hint(code);
        if !remote_hints.contains(&hint) {
            remote_hints.push(hint);
        }
    }

    LanguageSelection {
        tesseract_primary,
        tesseract_additional,
        remote_hints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_known_codes_map_to_tesseract() {
        assert_eq!(to_tesseract("en"), "eng");
        assert_eq!(to_tesseract("DE"), "deu");
        assert_eq!(to_tesseract("nl"), "nld");
    }

    #[test]
    fn test_unknown_codes_pass_through() {
        assert_eq!(to_tesseract("pol"), "pol");
        assert_eq!(to_remote_hint("ja"), "ja");
    }

    #[test]
    fn test_resolve_primary_with_additional() {
        let selection = resolve("de", &strings(&["en", "fr"]));
        assert_eq!(selection.tesseract_primary, "deu");
        assert_eq!(selection.tesseract_additional, strings(&["eng", "fra"]));
        assert_eq!(selection.remote_hints, strings(&["de", "en", "fr"]));
    }

    #[test]
    fn test_resolve_dedups_and_skips_primary() {
        let selection = resolve("en", &strings(&["en", "de", "de", ""]));
        assert_eq!(selection.tesseract_additional, strings(&["deu"]));
        assert_eq!(selection.remote_hints, strings(&["en", "de"]));
    }

    #[test]
    fn test_tag_joins_in_order() {
        assert_eq!(tesseract_language_tag("eng", &[]), "eng");
        assert_eq!(
            tesseract_language_tag("deu", &strings(&["eng", "deu", "fra", "eng"])),
            "deu+eng+fra"
        );
    }

    #[test]
    fn test_supported_languages() {
        assert_eq!(supported_languages().len(), 8);
        assert!(is_language_supported("ru"));
        assert!(!is_language_supported("xx"));
        let german = supported_languages().iter().find(|l| l.code == "de").unwrap();
        assert_eq!(german.name, "German (Deutsch)");
    }
}
