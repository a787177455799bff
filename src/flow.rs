//! Translation and improvement request flows.
//!
//! Translation is split in three steps so the cache never leaves the UI
//! thread: [`plan_translation`] (detect + cache check, UI thread),
//! [`fetch_missing`] (network, runtime) and [`TranslationJob::complete`]
//! (cache insert + render, UI thread). Improvement is not cached and runs
//! entirely off the UI thread through [`improve`].

use futures_util::future::try_join_all;
use std::collections::HashSet;

use crate::cache::TranslationCache;
use crate::detect::{language_name, same_language, LanguageDetector};
use crate::error::AppError;
use crate::providers::{TextImprover, Translator};
use crate::settings::{WritingStyle, WritingTone};

pub const DETAIL_CHUNK_WORDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Detecting,
    CacheCheck,
    Calling,
    Done,
    ErrorReported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub source: String,
    pub translation: Option<String>,
}

/// One clipboard translation, from planning to rendering.
#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: u64,
    pub detailed: bool,
    pub target_lang: String,
    pub segments: Vec<Segment>,
}

/// (source, translation) pairs returned by the provider.
pub type Fetched = Vec<(String, String)>;

pub fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size.max(1)).map(|c| c.join(" ")).collect()
}

/// Detects the input language and resolves whatever the cache (or the
/// "already in target language" rule) can answer.
pub fn plan_translation(
    id: u64,
    text: &str,
    target_lang: &str,
    detailed: bool,
    detector: &dyn LanguageDetector,
    cache: &TranslationCache,
) -> Result<TranslationJob, AppError> {
    tracing::debug!(job = id, "flow: {:?}", FlowState::Detecting);
    let detected = detector.detect(text)?;

    tracing::debug!(job = id, detected = %detected, "flow: {:?}", FlowState::CacheCheck);
    let segments = if detailed {
        chunk_words(text, DETAIL_CHUNK_WORDS)
            .into_iter()
            .map(|chunk| {
                let translation = cache.lookup(&chunk).map(str::to_string).or_else(|| {
                    // Best effort: a chunk we can't classify still gets translated.
                    match detector.detect(&chunk) {
                        Ok(lang) if same_language(&lang, target_lang) => Some(chunk.clone()),
                        _ => None,
                    }
                });
                Segment { source: chunk, translation }
            })
            .collect()
    } else {
        let translation = cache.lookup(text).map(str::to_string).or_else(|| {
            same_language(&detected, target_lang).then(|| text.to_string())
        });
        vec![Segment { source: text.to_string(), translation }]
    };

    Ok(TranslationJob {
        id,
        detailed,
        target_lang: target_lang.to_string(),
        segments,
    })
}

impl TranslationJob {
    /// Distinct sources still waiting for a provider answer, in order.
    pub fn pending(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.segments
            .iter()
            .filter(|s| s.translation.is_none())
            .filter(|s| seen.insert(s.source.as_str()))
            .map(|s| s.source.clone())
            .collect()
    }

    pub fn is_resolved(&self) -> bool {
        self.segments.iter().all(|s| s.translation.is_some())
    }

    /// Stores fresh translations in the cache and fills the matching segments.
    pub fn complete(&mut self, fetched: Fetched, cache: &mut TranslationCache) {
        for (source, translation) in fetched {
            for seg in self.segments.iter_mut().filter(|s| s.source == source && s.translation.is_none()) {
                seg.translation = Some(translation.clone());
            }
            cache.insert(source, translation);
        }
    }

    /// Popup text. Detailed mode is one `chunk → translation` line per chunk.
    pub fn render(&self) -> String {
        if self.detailed {
            self.segments
                .iter()
                .filter_map(|s| s.translation.as_ref().map(|t| format!("{} → {}", s.source, t)))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            self.segments
                .iter()
                .filter_map(|s| s.translation.clone())
                .collect::<Vec<_>>()
                .join(" ")
        }
    }
}

/// Translates every pending source concurrently. Any failure fails the lot,
/// so nothing from a failed request reaches the cache.
pub async fn fetch_missing(
    pending: Vec<String>,
    target_lang: String,
    translator: &dyn Translator,
) -> Result<Fetched, AppError> {
    let target = target_lang.as_str();
    let calls = pending.into_iter().map(|source| async move {
        let translation = translator.translate(&source, "auto", target).await?;
        Ok::<_, AppError>((source, translation))
    });
    try_join_all(calls).await
}

/// Where an improvement result should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImproveTarget {
    ResultWindow,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ImproveRequest {
    pub text: String,
    pub style: WritingStyle,
    pub tone: WritingTone,
    pub model: String,
    pub target: ImproveTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Improvement {
    pub original: String,
    pub improved: String,
}

pub fn system_prompt(language: &str, style: WritingStyle, tone: WritingTone) -> String {
    let mut prompt = format!(
        "You are an AI writing assistant. Please improve the given text while keeping it in {}. ",
        language
    );
    prompt.push_str(&format!(
        "Rewrite the text in a {} style with a {} tone. ",
        style.as_str().to_lowercase(),
        tone.as_str().to_lowercase()
    ));
    prompt.push_str("DO NOT translate the text, only improve its writing style and clarity in the same language. ");

    match style {
        WritingStyle::Corporate => prompt.push_str(&format!(
            "Use professional business language and formal expressions in {}. ",
            language
        )),
        WritingStyle::Academic => prompt.push_str(&format!(
            "Use scholarly language, technical terms, and formal academic writing conventions in {}. ",
            language
        )),
        WritingStyle::Friendly => prompt.push_str(&format!(
            "Use casual, warm, and approachable language in {}. ",
            language
        )),
        WritingStyle::Normal => {}
    }

    match tone {
        WritingTone::Enthusiastic => prompt.push_str("Express excitement and positivity in the writing."),
        WritingTone::Confident => prompt.push_str("Use assertive and authoritative language."),
        WritingTone::Diplomatic => prompt.push_str("Use tactful, balanced, and considerate language."),
        WritingTone::Friendly => {}
    }
    prompt
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        s[1..s.len() - 1].trim()
    } else {
        s
    }
}

/// Rewrites `req.text` and checks the answer is still in the input language.
pub async fn improve(
    req: &ImproveRequest,
    detector: &dyn LanguageDetector,
    improver: &dyn TextImprover,
) -> Result<Improvement, AppError> {
    let detected = detector.detect(&req.text)?;
    let language = language_name(&detected).unwrap_or("the original language");
    let system = system_prompt(language, req.style, req.tone);
    let user = format!(
        "Please improve this text while keeping it in the same language:\n\n{}",
        req.text
    );

    tracing::debug!(model = %req.model, lang = %detected, "flow: {:?}", FlowState::Calling);
    let raw = improver.complete(&req.model, &system, &user).await?;
    let improved = strip_quotes(&raw).to_string();
    if improved.is_empty() {
        return Err(AppError::Provider("Couldn't get a proper response from AI".to_string()));
    }

    let improved_lang = detector.detect(&improved)?;
    if !same_language(&improved_lang, &detected) {
        return Err(AppError::LanguageMismatch { expected: detected, found: improved_lang });
    }

    Ok(Improvement { original: req.text.clone(), improved })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Looks answers up in a table; anything else is "en".
    pub struct TableDetector(pub HashMap<String, String>);

    impl TableDetector {
        pub fn new(pairs: &[(&str, &str)]) -> Self {
            Self(pairs.iter().map(|(t, l)| (t.to_string(), l.to_string())).collect())
        }
    }

    impl LanguageDetector for TableDetector {
        fn detect(&self, text: &str) -> Result<String, AppError> {
            if text.trim().is_empty() {
                return Err(AppError::Detection("empty".into()));
            }
            Ok(self.0.get(text).cloned().unwrap_or_else(|| "en".to_string()))
        }
    }

    #[derive(Default)]
    pub struct MockTranslator {
        pub answers: HashMap<String, String>,
        pub calls: AtomicUsize,
        pub seen_targets: Mutex<Vec<String>>,
    }

    impl MockTranslator {
        pub fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                answers: pairs.iter().map(|(s, t)| (s.to_string(), t.to_string())).collect(),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Translator for MockTranslator {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_targets.lock().unwrap().push(target.to_string());
            self.answers
                .get(text)
                .cloned()
                .ok_or_else(|| AppError::Provider(format!("no answer for {:?}", text)))
        }
    }

    pub struct MockImprover {
        pub answer: Result<String, AppError>,
        pub last_system: Mutex<Option<String>>,
    }

    impl MockImprover {
        pub fn new(answer: Result<String, AppError>) -> Self {
            Self { answer, last_system: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl TextImprover for MockImprover {
        async fn complete(&self, _model: &str, system: &str, _user: &str) -> Result<String, AppError> {
            *self.last_system.lock().unwrap() = Some(system.to_string());
            self.answer.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn req(text: &str) -> ImproveRequest {
        ImproveRequest {
            text: text.to_string(),
            style: WritingStyle::Academic,
            tone: WritingTone::Confident,
            model: "m".to_string(),
            target: ImproveTarget::ResultWindow,
        }
    }

    #[test]
    fn chunks_of_five_words() {
        let chunks = chunk_words("one two three four five six seven", 5);
        assert_eq!(chunks, vec!["one two three four five", "six seven"]);
        assert!(chunk_words("   ", 5).is_empty());
    }

    #[test]
    fn plan_uses_cache_and_skips_target_language_text() {
        let detector = TableDetector::new(&[("Merhaba", "tr")]);
        let mut cache = TranslationCache::new(10);
        cache.insert("Hello world".into(), "Merhaba dünya".into());

        let job = plan_translation(1, "Hello world", "tr", false, &detector, &cache).unwrap();
        assert!(job.is_resolved());
        assert_eq!(job.render(), "Merhaba dünya");

        let job = plan_translation(2, "Merhaba", "tr", false, &detector, &cache).unwrap();
        assert!(job.is_resolved());
        assert_eq!(job.render(), "Merhaba");

        let job = plan_translation(3, "Good night", "tr", false, &detector, &cache).unwrap();
        assert_eq!(job.pending(), vec!["Good night".to_string()]);
    }

    #[test]
    fn detection_failure_is_reported() {
        let detector = TableDetector::new(&[]);
        let cache = TranslationCache::new(10);
        let err = plan_translation(1, "  ", "tr", false, &detector, &cache).unwrap_err();
        assert!(matches!(err, AppError::Detection(_)));
    }

    #[tokio::test]
    async fn detailed_job_fetches_each_chunk_and_caches_results() {
        let detector = TableDetector::new(&[]);
        let translator = MockTranslator::new(&[
            ("the cat sat on the", "kedi üstüne oturdu"),
            ("mat", "paspas"),
        ]);
        let mut cache = TranslationCache::new(10);

        let mut job = plan_translation(7, "the cat sat on the mat", "tr", true, &detector, &cache).unwrap();
        let pending = job.pending();
        assert_eq!(pending.len(), 2);

        let fetched = fetch_missing(pending, job.target_lang.clone(), &translator).await.unwrap();
        job.complete(fetched, &mut cache);

        assert!(job.is_resolved());
        assert_eq!(job.render(), "the cat sat on the → kedi üstüne oturdu\nmat → paspas");
        assert_eq!(cache.lookup("mat"), Some("paspas"));
        assert_eq!(translator.seen_targets.lock().unwrap().as_slice(), ["tr", "tr"]);
    }

    #[tokio::test]
    async fn a_failed_chunk_fails_the_whole_fetch() {
        let translator = MockTranslator::new(&[("ok chunk", "tamam")]);
        let res = fetch_missing(vec!["ok chunk".into(), "unknown".into()], "tr".into(), &translator).await;
        assert!(matches!(res, Err(AppError::Provider(_))));
    }

    #[test]
    fn pending_deduplicates_repeated_chunks() {
        let detector = TableDetector::new(&[]);
        let cache = TranslationCache::new(10);
        let job = plan_translation(1, "a b c d e a b c d e", "tr", true, &detector, &cache).unwrap();
        assert_eq!(job.segments.len(), 2);
        assert_eq!(job.pending(), vec!["a b c d e".to_string()]);
    }

    #[tokio::test]
    async fn improvement_in_another_language_is_a_mismatch() {
        let detector = TableDetector::new(&[("Bu metin kötü yazılmış.", "tr"), ("This text is well written.", "en")]);
        let improver = MockImprover::new(Ok("This text is well written.".into()));

        let err = improve(&req("Bu metin kötü yazılmış."), &detector, &improver).await.unwrap_err();
        assert_eq!(err, AppError::LanguageMismatch { expected: "tr".into(), found: "en".into() });
    }

    #[tokio::test]
    async fn improvement_strips_quotes_and_names_language() {
        let detector = TableDetector::new(&[("Bu metin kötü.", "tr"), ("Bu metin daha iyi.", "tr")]);
        let improver = MockImprover::new(Ok("\"Bu metin daha iyi.\"".into()));

        let out = improve(&req("Bu metin kötü."), &detector, &improver).await.unwrap();
        assert_eq!(out.improved, "Bu metin daha iyi.");
        assert_eq!(out.original, "Bu metin kötü.");

        let system = improver.last_system.lock().unwrap().clone().unwrap();
        assert!(system.contains("keeping it in Turkish"));
        assert!(system.contains("academic style with a confident tone"));
    }

    #[tokio::test]
    async fn provider_error_passes_through() {
        let detector = TableDetector::new(&[]);
        let improver = MockImprover::new(Err(AppError::Network("timed out".into())));
        let err = improve(&req("Some text"), &detector, &improver).await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }

    #[test]
    fn prompt_variants() {
        let p = system_prompt("English", WritingStyle::Normal, WritingTone::Friendly);
        assert!(p.ends_with("same language. "));
        let p = system_prompt("German", WritingStyle::Corporate, WritingTone::Diplomatic);
        assert!(p.contains("formal expressions in German"));
        assert!(p.ends_with("considerate language."));
    }
}
