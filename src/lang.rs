use crate::storage::KeyValueStore;
use std::rc::Rc;

pub const DEFAULT_LANG_CODE: &str = "en";

/// UI languages the shell ships translations for.
pub const SUPPORTED_LANG_CODES: &[&str] = &[
    "ar-SA", "bg-BG", "ca-ES", "cs-CZ", "de-DE", "el-GR", "en", "es-ES", "fa-IR", "fi-FI",
    "fr-FR", "he-IL", "hi-IN", "hu-HU", "id-ID", "it-IT", "ja-JP", "ko-KR", "nb-NO", "nl-NL",
    "pl-PL", "pt-BR", "pt-PT", "ro-RO", "ru-RU", "sk-SK", "sv-SE", "tr-TR", "uk-UA", "zh-CN",
    "zh-TW",
];

/// Best supported match for `requested`: exact code first, then same
/// primary language.
pub fn match_supported(requested: &str) -> Option<&'static str> {
    let requested = requested.trim();
    if requested.is_empty() {
        return None;
    }
    if let Some(code) = SUPPORTED_LANG_CODES
        .iter()
        .copied()
        .find(|code| code.eq_ignore_ascii_case(requested))
    {
        return Some(code);
    }
    let primary = requested.split(['-', '_']).next()?;
    SUPPORTED_LANG_CODES
        .iter()
        .find(|code| {
            code.split('-')
                .next()
                .is_some_and(|p| p.eq_ignore_ascii_case(primary))
        })
        .copied()
}

/// Picks the UI language: cached choice, then browser preference, then the default.
pub struct LanguageDetector {
    store: Rc<dyn KeyValueStore>,
    key: String,
}

impl LanguageDetector {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn detect(&self, navigator_languages: &[String]) -> String {
        let cached = match self.store.get(&self.key) {
            Ok(cached) => cached,
            Err(err) => {
                log::warn!("{err}");
                None
            }
        };
        cached
            .iter()
            .chain(navigator_languages)
            .find_map(|code| match_supported(code))
            .unwrap_or(DEFAULT_LANG_CODE)
            .to_string()
    }

    pub fn cache_user_language(&self, code: &str) {
        if let Err(err) = self.store.set(&self.key, code) {
            log::warn!("{err}");
        }
    }
}

/// Languages preferred by the browser, most preferred first.
pub fn navigator_languages() -> Vec<String> {
    gloo_utils::window().navigator().language().into_iter().collect()
}
