use std::sync::Arc;
use std::time::Duration;

use crate::cache::TranslationCache;
use crate::detect::LanguageDetector;
use crate::dispatch::DispatchHandle;
use crate::error::AppError;
use crate::flow::{self, FlowState, Fetched, ImproveRequest, ImproveTarget, Improvement, TranslationJob};
use crate::providers::ProviderFactory;
use crate::settings::{SettingsStore, WritingStyle, WritingTone};

const ERROR_DISPLAY: Duration = Duration::from_millis(5000);

/// Everything the UI thread can be asked to do.
pub enum UiAction {
    ClipboardChanged(String),
    /// Improve hotkey pressed; carries the current clipboard text.
    ImproveHotkey(String),
    ShowWindow,
    ShowAssistant,
    Quit,
    TranslationFetched {
        job: TranslationJob,
        result: Result<Fetched, AppError>,
    },
    ImprovementFinished {
        job: u64,
        target: ImproveTarget,
        result: Result<Improvement, AppError>,
    },
}

/// What the UI should put on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Popup { text: String, duration: Duration },
    Result { original: String, improved: String },
    Assistant { improved: String },
    /// `improve` is set when the error ends an improvement shown in that target.
    Error { message: String, duration: Duration, improve: Option<ImproveTarget> },
    ShowWindow,
    ShowAssistant,
    Quit,
}

/// Lives on the UI thread. Owns the settings store and the cache, starts
/// network work on the runtime and turns finished work into notifications.
pub struct Controller {
    store: SettingsStore,
    cache: TranslationCache,
    detector: Arc<dyn LanguageDetector>,
    providers: Box<dyn ProviderFactory>,
    runtime: tokio::runtime::Handle,
    dispatch: DispatchHandle<UiAction>,
    last_copied: String,
    next_job: u64,
    in_flight: usize,
}

impl Controller {
    pub fn new(
        store: SettingsStore,
        detector: Arc<dyn LanguageDetector>,
        providers: Box<dyn ProviderFactory>,
        runtime: tokio::runtime::Handle,
        dispatch: DispatchHandle<UiAction>,
    ) -> Self {
        Self {
            store,
            cache: TranslationCache::default(),
            detector,
            providers,
            runtime,
            dispatch,
            last_copied: String::new(),
            next_job: 0,
            in_flight: 0,
        }
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Provider calls started but not yet reported back.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    fn job_id(&mut self) -> u64 {
        self.next_job += 1;
        self.next_job
    }

    fn transition(job: u64, next: FlowState) {
        tracing::debug!(job, "flow: {:?}", next);
    }

    /// Terminal states notify and go back to idle.
    fn finish(job: u64, terminal: FlowState, n: Notification) -> Option<Notification> {
        Self::transition(job, terminal);
        Self::transition(job, FlowState::Idle);
        Some(n)
    }

    /// Runs `work` on the runtime and posts its result to the UI thread.
    /// The post may block on a full queue, so it happens on the blocking pool.
    fn spawn_job<F>(&mut self, work: F)
    where
        F: std::future::Future<Output = UiAction> + Send + 'static,
    {
        self.in_flight += 1;
        let dispatch = self.dispatch.clone();
        self.runtime.spawn(async move {
            let action = work.await;
            let posted = tokio::task::spawn_blocking(move || dispatch.request_action(action)).await;
            if posted.is_err() {
                tracing::warn!("failed to post a finished job to the UI thread");
            }
        });
    }

    fn job_returned(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub fn handle(&mut self, action: UiAction) -> Option<Notification> {
        match action {
            UiAction::ClipboardChanged(text) => self.on_clipboard(text),
            UiAction::ImproveHotkey(text) => self.on_improve_hotkey(text),
            UiAction::ShowWindow => Some(Notification::ShowWindow),
            UiAction::ShowAssistant => Some(Notification::ShowAssistant),
            UiAction::Quit => Some(Notification::Quit),
            UiAction::TranslationFetched { job, result } => {
                self.job_returned();
                self.on_translation_fetched(job, result)
            }
            UiAction::ImprovementFinished { job, target, result } => {
                self.job_returned();
                self.on_improvement_finished(job, target, result)
            }
        }
    }

    fn on_clipboard(&mut self, text: String) -> Option<Notification> {
        if text.trim().is_empty() || text == self.last_copied {
            return None;
        }
        self.last_copied = text.clone();
        self.translate(&text)
    }

    fn translation_error(job: u64, e: AppError) -> Option<Notification> {
        tracing::error!(job, "translation failed: {}", e);
        Self::finish(
            job,
            FlowState::ErrorReported,
            Notification::Error { message: format!("Error: {}", e), duration: ERROR_DISPLAY, improve: None },
        )
    }

    fn popup(&self, job: u64, text: String) -> Option<Notification> {
        let duration = Duration::from_millis(self.store.settings().display_time);
        Self::finish(job, FlowState::Done, Notification::Popup { text, duration })
    }

    /// Answers from cache when it can, otherwise starts a provider call and
    /// returns `None`; the result comes back as [`UiAction::TranslationFetched`].
    pub fn translate(&mut self, text: &str) -> Option<Notification> {
        let settings = self.store.settings().clone();
        let id = self.job_id();
        Self::transition(id, FlowState::Detecting);

        let job = match flow::plan_translation(
            id,
            text,
            &settings.target_lang,
            settings.show_translation_details,
            self.detector.as_ref(),
            &self.cache,
        ) {
            Ok(job) => job,
            Err(e) => return Self::translation_error(id, e),
        };
        Self::transition(id, FlowState::CacheCheck);

        if job.is_resolved() {
            tracing::debug!(job = id, "cache hit");
            return self.popup(id, job.render());
        }

        let translator = match self.providers.translator(&settings) {
            Ok(t) => t,
            Err(e) => return Self::translation_error(id, e),
        };

        Self::transition(id, FlowState::Calling);
        let pending = job.pending();
        tracing::info!(
            job = job.id,
            segments = pending.len(),
            "translating {} chars to {} via {}",
            text.len(),
            job.target_lang,
            translator.name()
        );
        let target_lang = job.target_lang.clone();
        self.spawn_job(async move {
            let result = flow::fetch_missing(pending, target_lang, translator.as_ref()).await;
            UiAction::TranslationFetched { job, result }
        });
        None
    }

    fn on_translation_fetched(&mut self, mut job: TranslationJob, result: Result<Fetched, AppError>) -> Option<Notification> {
        match result {
            Ok(fetched) => {
                if job.target_lang != self.store.settings().target_lang {
                    // Target changed mid-flight; show it but keep it out of the cache.
                    let mut scratch = TranslationCache::new(0);
                    job.complete(fetched, &mut scratch);
                } else {
                    job.complete(fetched, &mut self.cache);
                }
                tracing::info!(job = job.id, "translation done");
                self.popup(job.id, job.render())
            }
            Err(e) => Self::translation_error(job.id, e),
        }
    }

    fn on_improve_hotkey(&mut self, text: String) -> Option<Notification> {
        let text = text.trim().to_string();
        if text.is_empty() {
            let id = self.job_id();
            return Self::improvement_error(
                id,
                ImproveTarget::ResultWindow,
                AppError::Configuration("Please select some text first!".to_string()),
            );
        }
        // The hotkey always means an academic rewrite.
        let style = WritingStyle::Academic;
        let tone = WritingTone::Confident;
        let model = self.store.settings().improver_model.clone();
        self.improve(ImproveRequest { text, style, tone, model, target: ImproveTarget::ResultWindow })
    }

    fn improvement_error(job: u64, target: ImproveTarget, e: AppError) -> Option<Notification> {
        tracing::error!(job, "improvement failed: {}", e);
        Self::finish(
            job,
            FlowState::ErrorReported,
            Notification::Error {
                message: format!("Error improving text: {}", e),
                duration: ERROR_DISPLAY,
                improve: Some(target),
            },
        )
    }

    /// Persists the chosen style, tone and model, then starts the LLM call.
    pub fn improve(&mut self, req: ImproveRequest) -> Option<Notification> {
        let id = self.job_id();
        if !self.store.settings().use_improver {
            return Self::improvement_error(id, req.target, AppError::Configuration(
                "AI Writing Assistant is disabled. Enable it in settings.".to_string(),
            ));
        }
        let (style, tone, model) = (req.style, req.tone, req.model.clone());
        if let Err(e) = self.store.update(|s| {
            s.writing_style = style.as_str().to_string();
            s.writing_tone = tone.as_str().to_string();
            s.improver_model = model;
        }) {
            tracing::warn!("failed to save settings: {}", e);
        }

        let improver = match self.providers.improver(self.store.settings()) {
            Ok(i) => i,
            Err(e) => return Self::improvement_error(id, req.target, e),
        };

        // Detection and the LLM call both happen in the job; flow::improve logs them.
        tracing::info!(job = id, "improving {} chars with {}", req.text.len(), req.model);
        let detector = Arc::clone(&self.detector);
        self.spawn_job(async move {
            let result = flow::improve(&req, detector.as_ref(), improver.as_ref()).await;
            UiAction::ImprovementFinished { job: id, target: req.target, result }
        });
        None
    }

    fn on_improvement_finished(
        &mut self,
        job: u64,
        target: ImproveTarget,
        result: Result<Improvement, AppError>,
    ) -> Option<Notification> {
        match result {
            Ok(Improvement { original, improved }) => {
                tracing::info!(job, "improvement done");
                let n = match target {
                    ImproveTarget::ResultWindow => Notification::Result { original, improved },
                    ImproveTarget::Assistant => Notification::Assistant { improved },
                };
                Self::finish(job, FlowState::Done, n)
            }
            Err(e) => Self::improvement_error(job, target, e),
        }
    }

    /// Text we put on the clipboard ourselves; the watcher will see it next.
    pub fn note_own_copy(&mut self, text: &str) {
        self.last_copied = text.to_string();
    }

    /// Cached translations are keyed by source text only, so a new target
    /// language invalidates all of them.
    pub fn set_target_lang(&mut self, code: &str) {
        if self.store.settings().target_lang == code {
            return;
        }
        if let Err(e) = self.store.update(|s| s.target_lang = code.to_string()) {
            tracing::warn!("failed to save settings: {}", e);
        }
        self.cache.clear();
        self.last_copied.clear();
    }

    pub fn set_show_details(&mut self, on: bool) {
        if let Err(e) = self.store.update(|s| s.show_translation_details = on) {
            tracing::warn!("failed to save settings: {}", e);
        }
    }
}
