#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

mod cache;
mod controller;
mod detect;
mod dispatch;
mod error;
mod flow;
mod logger;
mod providers;
mod settings;
mod ui;

use controller::{Controller, UiAction};
use detect::WhatlangDetector;
use dispatch::{DispatchHandle, Dispatcher};
use providers::HttpProviders;
use settings::SettingsStore;

const CLIPBOARD_POLL: Duration = Duration::from_millis(300);

/// "f1".."f12" -> 1..12.
#[cfg_attr(not(windows), allow(dead_code))]
fn function_key_number(shortcut: &str) -> Option<u32> {
    let n: u32 = shortcut.trim().to_ascii_lowercase().strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then_some(n)
}

#[cfg(windows)]
mod win_hotkey {
    use std::thread;
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging as wm;
    use windows::Win32::UI::Input::KeyboardAndMouse as km;

    use crate::controller::UiAction;
    use crate::dispatch::DispatchHandle;

    pub const HOTKEY_ID: i32 = 1;

    pub fn spawn_hotkey_listener(shortcut: &str, dispatch: DispatchHandle<UiAction>) {
        let Some(n) = crate::function_key_number(shortcut) else {
            tracing::warn!("improve shortcut {:?} is not F1-F12; hotkey disabled", shortcut);
            return;
        };
        let label = shortcut.to_ascii_uppercase();
        thread::spawn(move || unsafe {
            let vk = km::VK_F1.0 as u32 + (n - 1);
            if km::RegisterHotKey(HWND(std::ptr::null_mut()), HOTKEY_ID, km::HOT_KEY_MODIFIERS(0), vk).is_err() {
                tracing::error!("RegisterHotKey {} failed", label);
                crate::toast("cliptrans", &format!("Failed to register {} hotkey (in use?)", label));
                return;
            }
            tracing::info!("RegisterHotKey {} OK", label);
            loop {
                let mut msg = wm::MSG::default();
                let got = wm::GetMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0);
                if got.0 == -1 || got.0 == 0 {
                    tracing::warn!("GetMessageW returned {}, stopping hotkey loop", got.0);
                    break;
                }
                if msg.message == wm::WM_HOTKEY {
                    tracing::debug!("WM_HOTKEY received ({})", label);
                    let text = crate::read_clipboard_string().unwrap_or_default();
                    if !dispatch.request_action(UiAction::ImproveHotkey(text)) {
                        break;
                    }
                }
                let _ = wm::TranslateMessage(&msg);
                wm::DispatchMessageW(&msg);
            }
            let _ = km::UnregisterHotKey(HWND(std::ptr::null_mut()), HOTKEY_ID);
            tracing::info!("UnregisterHotKey {}", label);
        });
    }
}

#[cfg(not(windows))]
mod win_hotkey {
    use crate::controller::UiAction;
    use crate::dispatch::DispatchHandle;

    pub fn spawn_hotkey_listener(_shortcut: &str, _dispatch: DispatchHandle<UiAction>) {
        // No global hotkeys off Windows
    }
}

mod tray {
    use tray_icon::{Icon, TrayIcon, TrayIconBuilder};
    use tray_icon::menu::{Menu, MenuItem, MenuEvent, PredefinedMenuItem};
    use tray_icon as tri;
    use crossbeam_channel::Receiver;

    use crate::controller::UiAction;
    use crate::dispatch::DispatchHandle;

    pub struct TrayHandle {
        #[allow(dead_code)]
        tray: TrayIcon,
        menu_event_rx: Receiver<MenuEvent>,
        tray_event_rx: Receiver<tri::TrayIconEvent>,
        show_item: MenuItem,
        assistant_item: MenuItem,
        quit_item: MenuItem,
        dispatch: DispatchHandle<UiAction>,
    }

    impl TrayHandle {
        pub fn new(dispatch: DispatchHandle<UiAction>) -> anyhow::Result<Self> {
            let menu = Menu::new();
            let show = MenuItem::new("Show window", true, None);
            let assistant = MenuItem::new("AI Writing Assistant", true, None);
            let quit = MenuItem::new("Quit", true, None);
            let sep = PredefinedMenuItem::separator();
            menu.append_items(&[&show, &assistant, &sep, &quit])?;

            // 16x16 solid blue square
            let (icon_w, icon_h) = (16, 16);
            let rgba: Vec<u8> = std::iter::repeat([0x21, 0x96, 0xF3, 0xFF])
                .take(icon_w * icon_h)
                .flatten()
                .collect();
            let icon = Icon::from_rgba(rgba, icon_w as u32, icon_h as u32)?;

            let tray = TrayIconBuilder::new()
                .with_tooltip("cliptrans")
                .with_menu(Box::new(menu))
                .with_icon(icon)
                .build()?;

            Ok(Self {
                tray,
                menu_event_rx: MenuEvent::receiver().clone(),
                tray_event_rx: tri::TrayIconEvent::receiver().clone(),
                show_item: show,
                assistant_item: assistant,
                quit_item: quit,
                dispatch,
            })
        }

        /// Non-blocking poll of menu and icon events.
        pub fn pump(&self) {
            while let Ok(event) = self.menu_event_rx.try_recv() {
                let id = event.id;
                let action = if id == self.quit_item.id() {
                    UiAction::Quit
                } else if id == self.assistant_item.id() {
                    UiAction::ShowAssistant
                } else if id == self.show_item.id() {
                    UiAction::ShowWindow
                } else {
                    continue;
                };
                tracing::debug!("tray menu: {:?}", id);
                self.dispatch.request_action(action);
            }
            while let Ok(event) = self.tray_event_rx.try_recv() {
                match event.click_type {
                    tri::ClickType::Left | tri::ClickType::Double => {
                        self.dispatch.request_action(UiAction::ShowWindow);
                    }
                    _ => {}
                }
            }
        }
    }
}

fn read_clipboard_string() -> Option<String> {
    #[cfg(windows)]
    {
        clipboard_win::get_clipboard_string().ok()
    }
    #[cfg(not(windows))]
    {
        None
    }
}

pub(crate) fn write_clipboard_string(s: &str) -> bool {
    #[cfg(windows)]
    {
        clipboard_win::set_clipboard_string(s).is_ok()
    }
    #[cfg(not(windows))]
    {
        let _ = s;
        false
    }
}

fn toast(title: &str, body: &str) {
    #[cfg(windows)]
    {
        let _ = winrt_notification::Toast::new(winrt_notification::Toast::POWERSHELL_APP_ID)
                .title(title)
                .text1(body)
                .show();
    }
    #[cfg(not(windows))]
    {
        tracing::info!("{}: {}", title, body);
    }
}

/// Polls the clipboard and posts every new text. Stops once the UI is gone.
fn spawn_clipboard_watcher(dispatch: DispatchHandle<UiAction>) {
    if cfg!(not(windows)) {
        tracing::info!("clipboard watcher not available on this platform");
        return;
    }
    thread::spawn(move || {
        // Whatever is already on the clipboard at startup is not "new".
        let mut last = read_clipboard_string().unwrap_or_default();
        loop {
            thread::sleep(CLIPBOARD_POLL);
            let Some(text) = read_clipboard_string() else { continue };
            if text == last {
                continue;
            }
            last = text.clone();
            if !dispatch.request_action(UiAction::ClipboardChanged(text)) {
                tracing::debug!("clipboard watcher: UI gone, stopping");
                break;
            }
        }
    });
}

fn spawn_tray(dispatch: DispatchHandle<UiAction>) {
    thread::spawn(move || {
        let tray = match tray::TrayHandle::new(dispatch) {
            Ok(t) => t,
            Err(e) => {
                toast("cliptrans", &format!("Tray failed: {}", e));
                tracing::error!("tray failed: {}", e);
                return;
            }
        };
        tracing::info!("tray created");
        loop {
            // Windows message pump on the tray thread so clicks/menus work
            #[cfg(windows)]
            unsafe {
                use windows::Win32::Foundation::HWND;
                use windows::Win32::UI::WindowsAndMessaging as wm;
                let mut msg = wm::MSG::default();
                while wm::PeekMessageW(&mut msg, HWND(std::ptr::null_mut()), 0, 0, wm::PM_REMOVE).into() {
                    let _ = wm::TranslateMessage(&msg);
                    wm::DispatchMessageW(&msg);
                }
            }
            tray.pump();
            thread::sleep(Duration::from_millis(25));
        }
    });
}

fn run() -> anyhow::Result<()> {
    let mut store = SettingsStore::load(SettingsStore::default_path());
    store.settings_mut_unsaved().apply_env_overrides();
    tracing::info!("settings loaded from {}", store.path().display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let dispatcher = Dispatcher::<UiAction>::default();

    let settings = store.settings();
    if settings.use_improver {
        win_hotkey::spawn_hotkey_listener(&settings.improve_shortcut, dispatcher.handle());
    }
    spawn_tray(dispatcher.handle());
    spawn_clipboard_watcher(dispatcher.handle());

    if settings.use_improver && settings.openrouter_api_key.is_empty() {
        toast("cliptrans", "Set an OpenRouter API key to use the writing assistant.");
    } else {
        toast("cliptrans", "Ready. Copy text to translate it.");
    }

    let controller = Controller::new(
        store,
        Arc::new(WhatlangDetector),
        Box::new(HttpProviders),
        runtime.handle().clone(),
        dispatcher.handle(),
    );

    // Run UI on main thread (blocks)
    ui::run(controller, dispatcher)
}

fn main() {
    logger::init();
    tracing::info!("App starting");
    if let Err(e) = run() {
        tracing::error!("fatal: {:#}", e);
        toast("cliptrans", &format!("Error: {}", e));
    }
}
