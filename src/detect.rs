use crate::error::AppError;

/// Language identification for arbitrary text. Returns ISO-639-1 style
/// codes where one exists ("en", "tr", "zh"), ISO-639-3 otherwise.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Result<String, AppError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Result<String, AppError> {
        let info = whatlang::detect(text)
            .ok_or_else(|| AppError::Detection("no language features found in text".to_string()))?;
        Ok(to_iso639_1(info.lang()))
    }
}

fn to_iso639_1(lang: whatlang::Lang) -> String {
    // isolang has no 639-1 code for Mandarin, only for the "zho" macrolanguage.
    if lang == whatlang::Lang::Cmn {
        return "zh".to_string();
    }
    let code3 = lang.code();
    isolang::Language::from_639_3(code3)
        .and_then(|l| l.to_639_1())
        .unwrap_or(code3)
        .to_string()
}

fn primary_subtag(code: &str) -> String {
    code.split(['-', '_']).next().unwrap_or(code).to_ascii_lowercase()
}

/// "zh-CN" and "zh-cn" and "zh" all name the same language here.
pub fn same_language(a: &str, b: &str) -> bool {
    primary_subtag(a) == primary_subtag(b)
}

/// English name for a language code, for use in prompts.
pub fn language_name(code: &str) -> Option<&'static str> {
    let primary = primary_subtag(code);
    isolang::Language::from_639_1(&primary)
        .or_else(|| isolang::Language::from_639_3(&primary))
        .map(|l| l.to_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_and_case_are_ignored() {
        assert!(same_language("zh-CN", "zh"));
        assert!(same_language("EN", "en"));
        assert!(same_language("pt_BR", "pt"));
        assert!(!same_language("tr", "en"));
    }

    #[test]
    fn names_known_codes() {
        assert_eq!(language_name("tr"), Some("Turkish"));
        assert_eq!(language_name("de"), Some("German"));
        assert_eq!(language_name("xx-YY"), None);
    }

    #[test]
    fn whatlang_codes_are_shortened() {
        assert_eq!(to_iso639_1(whatlang::Lang::Eng), "en");
        assert_eq!(to_iso639_1(whatlang::Lang::Tur), "tr");
        assert_eq!(to_iso639_1(whatlang::Lang::Cmn), "zh");
    }

    #[test]
    fn detects_a_clear_sentence() {
        let lang = WhatlangDetector
            .detect("Der schnelle braune Fuchs springt über den faulen Hund und läuft davon.")
            .unwrap();
        assert_eq!(lang, "de");
    }

    #[test]
    fn empty_text_is_a_detection_error() {
        assert!(matches!(WhatlangDetector.detect("   "), Err(AppError::Detection(_))));
    }
}
