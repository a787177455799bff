use crate::controller::{Controller, Notification, UiAction};
use crate::dispatch::Dispatcher;
use crate::flow::{ImproveRequest, ImproveTarget};
use crate::settings::{WritingStyle, WritingTone, IMPROVER_MODELS, LANGUAGES};
use crate::write_clipboard_string;
use eframe::egui;
use std::fs;
use std::time::{Duration, Instant};

const TITLE: &str = "cliptrans";

#[derive(Default)]
enum View {
    #[default]
    Idle,
    Popup(String),
    Result { original: String, improved: String },
    Error(String),
}

struct AssistantPanel {
    open: bool,
    input: String,
    output: String,
    style: WritingStyle,
    tone: WritingTone,
    model: String,
    busy: bool,
}

struct App {
    dispatcher: Dispatcher<UiAction>,
    controller: Controller,
    view: View,
    expires_at: Option<Instant>,
    assistant: AssistantPanel,
    fonts_set: bool,
}

impl App {
    fn new(controller: Controller, dispatcher: Dispatcher<UiAction>) -> Self {
        let s = controller.store().settings();
        let assistant = AssistantPanel {
            open: false,
            input: String::new(),
            output: String::new(),
            style: s.style(),
            tone: s.tone(),
            model: s.improver_model.clone(),
            busy: false,
        };
        Self { dispatcher, controller, view: View::Idle, expires_at: None, assistant, fonts_set: false }
    }

    fn apply(&mut self, ctx: &egui::Context, n: Notification) {
        match n {
            Notification::Popup { text, duration } => {
                self.view = View::Popup(text);
                self.expires_at = Some(Instant::now() + duration);
                bring_to_front(ctx);
            }
            Notification::Error { message, duration, improve } => {
                if improve == Some(ImproveTarget::Assistant) {
                    self.assistant.busy = false;
                }
                self.view = View::Error(message);
                self.expires_at = Some(Instant::now() + duration);
                bring_to_front(ctx);
            }
            Notification::Result { original, improved } => {
                self.view = View::Result { original, improved };
                self.expires_at = None;
                bring_to_front(ctx);
            }
            Notification::Assistant { improved } => {
                self.assistant.busy = false;
                self.assistant.output = improved;
                self.assistant.open = true;
                bring_to_front(ctx);
            }
            Notification::ShowWindow => bring_to_front(ctx),
            Notification::ShowAssistant => {
                self.assistant.open = true;
                bring_to_front(ctx);
            }
            Notification::Quit => {
                tracing::info!("quit requested");
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn copy(&mut self, text: &str) {
        if write_clipboard_string(text) {
            // Our own write must not come back as a clipboard translation.
            self.controller.note_own_copy(text);
        } else {
            tracing::warn!("failed to write clipboard");
        }
    }

    fn load_fonts(&mut self, ctx: &egui::Context) {
        if self.fonts_set {
            return;
        }
        self.fonts_set = true;
        let candidates = [
            r"C:\Windows\Fonts\msyh.ttc",
            r"C:\Windows\Fonts\simsun.ttc",
            r"C:\Windows\Fonts\malgun.ttf",
            r"C:\Windows\Fonts\YuGothM.ttc",
        ];
        let Some((path, bytes)) = candidates.iter().find_map(|p| fs::read(p).ok().map(|b| (*p, b))) else {
            tracing::debug!("no CJK font found; some scripts may render as squares");
            return;
        };
        let mut fonts = egui::FontDefinitions::default();
        fonts.font_data.insert("cjk".to_owned(), egui::FontData::from_owned(bytes));
        // Fallback only, after egui's own fonts.
        fonts.families.entry(egui::FontFamily::Proportional).or_default().push("cjk".to_owned());
        ctx.set_fonts(fonts);
        tracing::debug!("loaded fallback font {}", path);
    }

    fn show_view(&mut self, ui: &mut egui::Ui) {
        let s = self.controller.store().settings();
        let color = parse_hex_color(&s.text_color).unwrap_or(egui::Color32::BLACK);
        let size = s.font_size as f32;

        let mut to_copy = None;
        match &self.view {
            View::Idle => {
                ui.weak("Copy some text to translate it.");
            }
            View::Popup(text) => {
                ui.label(egui::RichText::new(text).size(size).color(color));
            }
            View::Error(message) => {
                ui.colored_label(egui::Color32::from_rgb(0xC0, 0x39, 0x2B), message);
            }
            View::Result { original, improved } => {
                ui.strong("Original Text:");
                ui.label(original);
                ui.separator();
                ui.strong("Improved Text:");
                ui.label(egui::RichText::new(improved).size(size).color(color));
                if ui.button("Copy").clicked() {
                    to_copy = Some(improved.clone());
                }
            }
        }
        if let Some(text) = to_copy {
            self.copy(&text);
        }
    }

    fn show_settings(&mut self, ui: &mut egui::Ui) {
        let s = self.controller.store().settings();
        let mut target = s.target_lang.clone();
        let mut details = s.show_translation_details;

        ui.horizontal(|ui| {
            let current = LANGUAGES
                .iter()
                .find(|(_, code)| *code == target)
                .map(|(name, _)| *name)
                .unwrap_or(target.as_str())
                .to_string();
            egui::ComboBox::from_label("Target language")
                .selected_text(current)
                .show_ui(ui, |ui| {
                    for (name, code) in LANGUAGES {
                        ui.selectable_value(&mut target, code.to_string(), *name);
                    }
                });
        });
        let details_changed = ui.checkbox(&mut details, "Show detailed translation").changed();
        ui.weak(format!("Cached translations: {}", self.controller.cache().len()));

        if target != self.controller.store().settings().target_lang {
            self.controller.set_target_lang(&target);
        }
        if details_changed {
            self.controller.set_show_details(details);
        }
    }

    fn show_assistant(&mut self, ui: &mut egui::Ui) {
        let a = &mut self.assistant;
        ui.heading("AI Writing Assistant");
        ui.add(egui::TextEdit::multiline(&mut a.input).desired_rows(5).desired_width(f32::INFINITY).hint_text("Text to improve"));
        ui.horizontal(|ui| {
            egui::ComboBox::from_label("Style").selected_text(a.style.as_str()).show_ui(ui, |ui| {
                for v in WritingStyle::ALL {
                    ui.selectable_value(&mut a.style, v, v.as_str());
                }
            });
            egui::ComboBox::from_label("Tone").selected_text(a.tone.as_str()).show_ui(ui, |ui| {
                for v in WritingTone::ALL {
                    ui.selectable_value(&mut a.tone, v, v.as_str());
                }
            });
        });
        let model_label = IMPROVER_MODELS
            .iter()
            .find(|(_, id)| *id == a.model)
            .map(|(label, _)| *label)
            .unwrap_or(a.model.as_str())
            .to_string();
        egui::ComboBox::from_label("Model").selected_text(model_label).show_ui(ui, |ui| {
            for (label, id) in IMPROVER_MODELS {
                ui.selectable_value(&mut a.model, id.to_string(), *label);
            }
        });

        let can_run = !a.busy && !a.input.trim().is_empty();
        let transform = ui.add_enabled(can_run, egui::Button::new(if a.busy { "Working..." } else { "Transform" })).clicked();

        ui.add(egui::TextEdit::multiline(&mut a.output).desired_rows(5).desired_width(f32::INFINITY));
        let copy = ui.button("Copy result").clicked();

        if transform {
            let req = ImproveRequest {
                text: a.input.trim().to_string(),
                style: a.style,
                tone: a.tone,
                model: a.model.clone(),
                target: ImproveTarget::Assistant,
            };
            a.busy = true;
            if let Some(n) = self.controller.improve(req) {
                self.apply(ui.ctx(), n);
            }
        }
        if copy {
            let text = self.assistant.output.clone();
            self.copy(&text);
        }
    }
}

fn bring_to_front(ctx: &egui::Context) {
    ctx.send_viewport_cmd(egui::ViewportCommand::Minimized(false));
    ctx.send_viewport_cmd(egui::ViewportCommand::Visible(true));
    ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
}

/// "#RRGGBB" -> color. Anything else is `None`.
pub fn parse_hex_color(s: &str) -> Option<egui::Color32> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(egui::Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Wake up periodically so popups expire even without user events
        ctx.request_repaint_after(Duration::from_millis(120));
        self.load_fonts(ctx);

        let mut notifications = Vec::new();
        let controller = &mut self.controller;
        self.dispatcher.drain(|action| {
            if let Some(n) = controller.handle(action) {
                notifications.push(n);
            }
        });
        for n in notifications {
            self.apply(ctx, n);
        }

        if self.expires_at.is_some_and(|t| Instant::now() >= t) {
            self.expires_at = None;
            self.view = View::Idle;
        }

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Translation");
                if self.controller.in_flight() > 0 {
                    ui.spinner();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = if self.assistant.open { "Hide assistant" } else { "AI assistant" };
                    if ui.button(label).clicked() {
                        self.assistant.open = !self.assistant.open;
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    self.show_view(ui);
                    ui.separator();
                    egui::CollapsingHeader::new("Settings").show(ui, |ui| self.show_settings(ui));
                    if self.assistant.open {
                        ui.separator();
                        self.show_assistant(ui);
                    }
                });
        });
    }
}

/// Runs the UI event loop on the calling thread until the window closes.
pub fn run(controller: Controller, dispatcher: Dispatcher<UiAction>) -> anyhow::Result<()> {
    tracing::info!("UI: starting event loop");
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size([560.0, 420.0])
            .with_always_on_top()
            .with_visible(true),
        ..Default::default()
    };
    eframe::run_native(
        TITLE,
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            dispatcher.set_waker(move || ctx.request_repaint());
            Box::new(App::new(controller, dispatcher))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;
    tracing::info!("UI: event loop exited");
    Ok(())
}
