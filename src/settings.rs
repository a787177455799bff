use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_IMPROVER_MODEL: &str = "deepseek/deepseek-r1-distill-llama-70b";

/// Models offered in the assistant panel, as (label, OpenRouter model id).
pub const IMPROVER_MODELS: &[(&str, &str)] = &[
    ("DeepSeek 70B", DEFAULT_IMPROVER_MODEL),
    ("Gemini 2.0", "google/gemini-2.0-flash-lite-001"),
    ("Mistral Saba", "mistralai/mistral-saba"),
];

/// Target languages offered to the user, as (name, provider code).
pub const LANGUAGES: &[(&str, &str)] = &[
    ("Turkish", "tr"),
    ("English", "en"),
    ("German", "de"),
    ("French", "fr"),
    ("Spanish", "es"),
    ("Italian", "it"),
    ("Russian", "ru"),
    ("Japanese", "ja"),
    ("Korean", "ko"),
    ("Chinese", "zh-CN"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub show_translation_details: bool,
    pub text_color: String,
    pub font_family: String,
    pub font_size: u32,
    /// Popup lifetime in milliseconds.
    pub display_time: u64,
    pub target_lang: String,
    pub window_alpha: f32,
    pub frame_color: String,
    pub frame_alpha: f32,
    pub keyboard_shortcut: String,
    pub use_deepl: bool,
    pub deepl_api_key: String,
    /// Retry on Google when DeepL fails at the network or provider level.
    pub deepl_fallback: bool,
    pub openrouter_api_key: String,
    pub improve_shortcut: String,
    pub use_improver: bool,
    pub improver_model: String,
    pub writing_style: String,
    pub writing_tone: String,

    /// Keys we don't recognise. Kept so saving doesn't lose them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_translation_details: true,
            text_color: "#000000".to_string(),
            font_family: "Arial".to_string(),
            font_size: 12,
            display_time: 5000,
            target_lang: "tr".to_string(),
            window_alpha: 0.9,
            frame_color: "#F0F0F0".to_string(),
            frame_alpha: 0.9,
            keyboard_shortcut: "a".to_string(),
            use_deepl: false,
            deepl_api_key: String::new(),
            deepl_fallback: true,
            openrouter_api_key: String::new(),
            improve_shortcut: "f2".to_string(),
            use_improver: true,
            improver_model: DEFAULT_IMPROVER_MODEL.to_string(),
            writing_style: WritingStyle::Normal.as_str().to_string(),
            writing_tone: WritingTone::Friendly.as_str().to_string(),
            extra: Map::new(),
        }
    }
}

impl Settings {
    pub fn style(&self) -> WritingStyle {
        self.writing_style.parse().unwrap_or(WritingStyle::Normal)
    }

    pub fn tone(&self) -> WritingTone {
        self.writing_tone.parse().unwrap_or(WritingTone::Friendly)
    }

    /// Defaults overlaid with `file`, one key at a time. A recognised key
    /// whose value has the wrong type keeps its default; every other key,
    /// including unknown ones, survives.
    pub fn merged(file: Map<String, Value>) -> Self {
        let mut merged = match serde_json::to_value(Settings::default()) {
            Ok(Value::Object(m)) => m,
            _ => return Settings::default(),
        };
        for (key, value) in file {
            if merged.contains_key(&key) {
                let mut candidate = merged.clone();
                candidate.insert(key.clone(), value.clone());
                if let Err(e) = serde_json::from_value::<Settings>(Value::Object(candidate)) {
                    tracing::warn!("settings key {:?} has an unusable value {}, keeping default: {}", key, value, e);
                    continue;
                }
            }
            merged.insert(key, value);
        }
        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }

    /// Env vars win over the file, in memory only.
    pub fn apply_env_overrides(&mut self) {
        let vars = [
            ("OPENROUTER_API_KEY", &mut self.openrouter_api_key),
            ("DEEPL_API_KEY", &mut self.deepl_api_key),
            ("TARGET_LANG", &mut self.target_lang),
        ];
        for (name, slot) in vars {
            if let Ok(v) = std::env::var(name) {
                if !v.is_empty() {
                    *slot = v;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingStyle {
    Normal,
    Corporate,
    Academic,
    Friendly,
}

impl WritingStyle {
    pub const ALL: [WritingStyle; 4] = [
        WritingStyle::Normal,
        WritingStyle::Corporate,
        WritingStyle::Academic,
        WritingStyle::Friendly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WritingStyle::Normal => "Normal",
            WritingStyle::Corporate => "Corporate",
            WritingStyle::Academic => "Academic",
            WritingStyle::Friendly => "Friendly",
        }
    }
}

impl FromStr for WritingStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WritingStyle::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown writing style: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingTone {
    Enthusiastic,
    Friendly,
    Confident,
    Diplomatic,
}

impl WritingTone {
    pub const ALL: [WritingTone; 4] = [
        WritingTone::Enthusiastic,
        WritingTone::Friendly,
        WritingTone::Confident,
        WritingTone::Diplomatic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WritingTone::Enthusiastic => "Enthusiastic",
            WritingTone::Friendly => "Friendly",
            WritingTone::Confident => "Confident",
            WritingTone::Diplomatic => "Diplomatic",
        }
    }
}

impl FromStr for WritingTone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WritingTone::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown writing tone: {}", s))
    }
}

/// Owns the settings and the file they live in. Every change made through
/// [`SettingsStore::update`] is written back immediately.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    pub fn default_path() -> PathBuf {
        crate::logger::exe_dir().join("settings.json")
    }

    /// Missing file means defaults. A file that isn't a JSON object also
    /// means defaults, with a warning; the next save overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<Map<String, Value>>(&s) {
                Ok(map) => Settings::merged(map),
                Err(e) => {
                    tracing::warn!("settings file {} unreadable, using defaults: {}", path.display(), e);
                    Settings::default()
                }
            },
            Err(_) => Settings::default(),
        };
        Self { path, settings }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// For startup-only tweaks (env overrides) that must not be persisted.
    pub fn settings_mut_unsaved(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn update(&mut self, f: impl FnOnce(&mut Settings)) -> Result<()> {
        f(&mut self.settings);
        self.save()
    }

    pub fn save(&self) -> Result<()> {
        let s = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.path, s)?;
        Ok(())
    }
}
