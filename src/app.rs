//! Application state and egui UI.
//!
//! One thread, the egui event loop, owns all mutable state: settings, the
//! editor session, the staged new-script text, and the selection. The file
//! watcher and the remote trigger endpoint run on background threads and
//! only ever communicate through channels drained at the top of each frame,
//! so every mutation happens here and in order.

use crate::messages;
use crate::remote::{REMOTE_PORT, RemoteRequest, RemoteTrigger};
use autochanger_config::Settings;
use autochanger_vehicle::{
    EditorSession, ReprefixEntry, VehicleWatchEvent, VehicleWatcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

/// Where a confirmed save goes.
#[derive(Debug, Clone)]
enum SaveTarget {
    /// The session's current path.
    Current,
    /// A Save As target.
    Path(PathBuf),
}

/// A save waiting on the re-prefix confirmation modal.
#[derive(Debug)]
struct PendingSave {
    plan: Vec<ReprefixEntry>,
    target: SaveTarget,
    dont_ask_again: bool,
}

pub struct AutochangerApp {
    settings: Settings,
    settings_path: PathBuf,
    session: Option<EditorSession>,
    watcher: Option<VehicleWatcher>,
    /// Staged replacement text (the right-hand editor). Remote triggers
    /// replace the selected script with this buffer.
    new_script: String,
    /// Keeps the endpoint alive; `None` when the port was taken at startup.
    _remote: Option<RemoteTrigger>,
    remote_rx: Receiver<RemoteRequest>,
    pending_save: Option<PendingSave>,
    show_settings: bool,
    prefix_draft: String,
}

impl AutochangerApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        settings_path: PathBuf,
    ) -> Self {
        apply_theme(&cc.egui_ctx, settings.dark_theme);

        let (remote_tx, remote_rx) = channel::<RemoteRequest>();
        let wake_ctx = cc.egui_ctx.clone();
        let remote = match RemoteTrigger::start(REMOTE_PORT, remote_tx, move || {
            wake_ctx.request_repaint()
        }) {
            Ok(trigger) => Some(trigger),
            // Port in use: run without the remote trigger rather than fail.
            Err(e) => {
                log::warn!("Remote trigger disabled: {e:#}");
                None
            }
        };

        let prefix_draft = settings.detection_prefix.clone();
        Self {
            settings,
            settings_path,
            session: None,
            watcher: None,
            new_script: String::new(),
            _remote: remote,
            remote_rx,
            pending_save: None,
            show_settings: false,
            prefix_draft,
        }
    }

    // ------------------------------------------------------------------
    // Channel draining (watcher + remote), run at the top of every frame
    // ------------------------------------------------------------------

    fn drain_remote_requests(&mut self) {
        while let Ok(request) = self.remote_rx.try_recv() {
            let result = self.remote_replace_and_save();
            // The endpoint may have timed out already; a dead reply channel
            // is not an error here.
            let _ = request.reply.send(result);
        }
    }

    /// The remote-triggered mutation: replace the selected script with the
    /// staged text, then save with prompts suppressed. Failures come back as
    /// the localized message a dialog would have shown; the endpoint
    /// translates them.
    fn remote_replace_and_save(&mut self) -> Result<(), String> {
        let Some(session) = self.session.as_mut() else {
            return Err(messages::MSG_NO_DOCUMENT.to_string());
        };
        session
            .apply_replacement(&self.new_script)
            .map_err(|e| messages::for_replace_error(e).to_string())?;

        let prefix = self.settings.detection_prefix.clone();
        let plan = session.reprefix_plan(&prefix);
        session
            .save(&prefix, &plan)
            .map_err(|e| messages::save_failed(&e.to_string()))?;
        log::info!("Remote replace-and-save completed");
        Ok(())
    }

    fn drain_watcher_events(&mut self) {
        let mut events = Vec::new();
        if let Some(watcher) = &self.watcher {
            while let Some(event) = watcher.try_recv() {
                events.push(event);
            }
        }
        for event in events {
            match event {
                VehicleWatchEvent::Changed => self.reload_session(),
                VehicleWatchEvent::Removed => {
                    log::warn!("Vehicle file removed externally; clearing session");
                    self.session = None;
                    self.watcher = None;
                    show_warning(messages::MSG_VEHICLE_REMOVED);
                }
            }
        }
    }

    fn reload_session(&mut self) {
        let prefix = self.settings.detection_prefix.clone();
        if let Some(session) = self.session.as_mut()
            && let Err(e) = session.reload(&prefix)
        {
            show_error(&messages::reload_failed(&e.to_string()));
        }
    }

    // ------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------

    fn open_vehicle_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("XML files", &["xml"])
            .add_filter("All files", &["*"])
            .set_title("ビークルXMLファイルを選択")
            .pick_file();
        if let Some(path) = picked {
            self.open_vehicle(&path);
        }
    }

    fn open_vehicle(&mut self, path: &Path) {
        let prefix = self.settings.detection_prefix.clone();
        match EditorSession::open(path, &prefix) {
            Ok(session) => {
                let count = session.records().len();
                self.watcher = start_watcher(session.path());
                self.session = Some(session);
                self.settings.add_recent_file(&path.display().to_string());
                self.persist_settings();
                show_info(&messages::loaded_with_count(count));
            }
            Err(e) => show_error(&messages::load_failed(&e.to_string())),
        }
    }

    fn load_lua_dialog(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Lua files", &["lua"])
            .add_filter("Text files", &["txt"])
            .add_filter("All files", &["*"])
            .set_title("Luaスクリプトファイルを選択")
            .pick_file();
        if let Some(path) = picked {
            match std::fs::read_to_string(&path) {
                Ok(contents) => self.new_script = contents,
                Err(e) => show_error(&messages::lua_load_failed(&e.to_string())),
            }
        }
    }

    fn replace_clicked(&mut self) {
        let Some(session) = self.session.as_mut() else {
            show_warning(messages::MSG_NO_DOCUMENT);
            return;
        };
        match session.apply_replacement(&self.new_script) {
            Ok(()) => show_info(messages::MSG_REPLACED),
            Err(e) => show_warning(messages::for_replace_error(e)),
        }
    }

    fn save_clicked(&mut self) {
        if self.session.is_none() {
            show_warning(messages::MSG_NO_DOCUMENT);
            return;
        }
        self.begin_save(SaveTarget::Current);
    }

    fn save_as_clicked(&mut self) {
        let Some(session) = &self.session else {
            show_warning(messages::MSG_NO_DOCUMENT);
            return;
        };
        let file_name = session
            .path()
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vehicle.xml".to_string());
        let picked = rfd::FileDialog::new()
            .add_filter("XML files", &["xml"])
            .set_file_name(file_name)
            .set_title("XMLファイルを保存")
            .save_file();
        if let Some(path) = picked {
            self.begin_save(SaveTarget::Path(path));
        }
    }

    /// Compute the re-prefix plan and either ask for confirmation or save
    /// right away. Remote saves never come through here.
    fn begin_save(&mut self, target: SaveTarget) {
        let prefix = self.settings.detection_prefix.clone();
        let plan = self
            .session
            .as_ref()
            .map(|s| s.reprefix_plan(&prefix))
            .unwrap_or_default();

        if !plan.is_empty() && !self.settings.suppress_reprefix_prompt {
            self.pending_save = Some(PendingSave {
                plan,
                target,
                dont_ask_again: false,
            });
        } else {
            self.finish_save(target, &plan);
        }
    }

    fn finish_save(&mut self, target: SaveTarget, plan: &[ReprefixEntry]) {
        let prefix = self.settings.detection_prefix.clone();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = match &target {
            SaveTarget::Current => session.save(&prefix, plan),
            SaveTarget::Path(path) => session.save_as(path, &prefix, plan),
        };
        match result {
            Ok(()) => {
                if let SaveTarget::Path(path) = &target {
                    // The session follows the new file from now on.
                    self.watcher = start_watcher(path);
                    self.settings.add_recent_file(&path.display().to_string());
                    self.persist_settings();
                }
                show_info(messages::MSG_SAVED);
            }
            Err(e) => show_error(&messages::save_failed(&e.to_string())),
        }
    }

    fn select_script(&mut self, index: usize) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.select(index);
        if self.new_script.is_empty()
            && let Some(record) = session.selected_record()
        {
            self.new_script = record.content.clone();
        }
    }

    fn apply_prefix_draft(&mut self) {
        let draft = self.prefix_draft.trim().to_string();
        if draft.is_empty() {
            show_warning(messages::MSG_BLANK_PREFIX);
            return;
        }
        if draft == self.settings.detection_prefix {
            return;
        }

        self.settings.detection_prefix = draft.clone();
        self.persist_settings();

        // Deliberate user action: re-running detection here replaces the
        // record list (unsaved content already lives in the document).
        if let Some(session) = self.session.as_mut() {
            session.redetect(&draft);
            let count = session.records().len();
            show_info(&messages::detection_updated(count));
        }
    }

    fn persist_settings(&mut self) {
        if let Err(e) = self.settings.save(&self.settings_path) {
            log::error!("Failed to save settings: {e}");
        }
    }

    // ------------------------------------------------------------------
    // Panels
    // ------------------------------------------------------------------

    fn show_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("file_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.button("ビークルXMLを開く…").clicked() {
                    self.open_vehicle_dialog();
                }
                ui.menu_button("最近使ったファイル", |ui| {
                    if self.settings.recent_files.is_empty() {
                        ui.weak("(なし)");
                    }
                    let recent: Vec<String> = self.settings.recent_files.clone();
                    for path in recent {
                        if ui.button(&path).clicked() {
                            self.open_vehicle(Path::new(&path));
                        }
                    }
                });
                ui.separator();
                let label = self
                    .session
                    .as_ref()
                    .map(|s| format!("ファイル: {}", s.path().display()))
                    .unwrap_or_else(|| "ファイル: 未選択".to_string());
                ui.label(label);
            });
            ui.add_space(4.0);
        });
    }

    fn show_bottom_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("action_bar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui.button("Luaファイルを読み込む").clicked() {
                    self.load_lua_dialog();
                }
                if ui.button("置換").clicked() {
                    self.replace_clicked();
                }
                if ui.button("XMLを保存").clicked() {
                    self.save_clicked();
                }
                if ui.button("名前を付けて保存").clicked() {
                    self.save_as_clicked();
                }
                if ui.button("検出設定").clicked() {
                    self.prefix_draft = self.settings.detection_prefix.clone();
                    self.show_settings = true;
                }
            });
            ui.add_space(6.0);
        });
    }

    fn show_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            // Script list
            ui.group(|ui| {
                egui::ScrollArea::vertical()
                    .id_salt("script_list")
                    .max_height(150.0)
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        let mut clicked: Option<usize> = None;
                        match &self.session {
                            Some(session) => {
                                let selected = session.selected_index();
                                for (i, record) in session.records().iter().enumerate() {
                                    let text = format!("{}. {}", record.index, record.label);
                                    if ui.selectable_label(selected == Some(i), text).clicked() {
                                        clicked = Some(i);
                                    }
                                }
                            }
                            None => {
                                ui.weak("ビークルXMLが読み込まれていません");
                            }
                        }
                        if let Some(i) = clicked {
                            self.select_script(i);
                        }
                    });
            });

            ui.add_space(6.0);

            // Current / new script editors side by side
            ui.columns(2, |columns| {
                columns[0].group(|ui| {
                    ui.label("現在のスクリプト");
                    let current = self
                        .session
                        .as_ref()
                        .and_then(|s| s.selected_record())
                        .map(|r| r.content.clone())
                        .unwrap_or_default();
                    egui::ScrollArea::vertical()
                        .id_salt("current_script")
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            ui.add(
                                egui::TextEdit::multiline(&mut current.as_str())
                                    .code_editor()
                                    .desired_width(f32::INFINITY)
                                    .desired_rows(18),
                            );
                        });
                });
                columns[1].group(|ui| {
                    ui.label("新しいスクリプト");
                    egui::ScrollArea::vertical()
                        .id_salt("new_script")
                        .auto_shrink([false, false])
                        .show(ui, |ui| {
                            ui.add(
                                egui::TextEdit::multiline(&mut self.new_script)
                                    .code_editor()
                                    .desired_width(f32::INFINITY)
                                    .desired_rows(18),
                            );
                        });
                });
            });
        });
    }

    fn show_settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        let mut apply_clicked = false;
        let mut theme_changed = false;
        let mut flags_changed = false;

        egui::Window::new("スクリプト検出設定")
            .open(&mut open)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label("検出するスクリプトの先頭コメントプレフィックスを設定してください。");
                ui.horizontal(|ui| {
                    ui.label("検出プレフィックス:");
                    ui.add(
                        egui::TextEdit::singleline(&mut self.prefix_draft)
                            .font(egui::TextStyle::Monospace)
                            .desired_width(220.0),
                    );
                    if ui.button("適用").clicked() {
                        apply_clicked = true;
                    }
                });
                ui.separator();
                if ui
                    .checkbox(&mut self.settings.dark_theme, "ダークテーマ")
                    .changed()
                {
                    theme_changed = true;
                    flags_changed = true;
                }
                if ui
                    .checkbox(
                        &mut self.settings.suppress_reprefix_prompt,
                        "プレフィックス再追加の確認を表示しない",
                    )
                    .changed()
                {
                    flags_changed = true;
                }
                ui.separator();
                ui.weak(format!("設定ファイル: {}", self.settings_path.display()));
            });

        self.show_settings = open;
        if theme_changed {
            apply_theme(ctx, self.settings.dark_theme);
        }
        if flags_changed {
            self.persist_settings();
        }
        if apply_clicked {
            self.apply_prefix_draft();
        }
    }

    /// Confirmation modal listing the scripts a save would re-prefix.
    /// Declining aborts the save with nothing written.
    fn show_reprefix_modal(&mut self, ctx: &egui::Context) {
        let Some(mut pending) = self.pending_save.take() else {
            return;
        };
        let mut decision: Option<bool> = None;

        egui::Window::new("確認")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(messages::MSG_REPREFIX_PROMPT);
                ui.add_space(4.0);
                for entry in &pending.plan {
                    ui.monospace(format!("・{}", entry.label));
                }
                ui.add_space(4.0);
                ui.checkbox(&mut pending.dont_ask_again, messages::MSG_DONT_ASK_AGAIN);
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("保存").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("キャンセル").clicked() {
                        decision = Some(false);
                    }
                });
            });

        match decision {
            Some(true) => {
                if pending.dont_ask_again {
                    self.settings.suppress_reprefix_prompt = true;
                    self.persist_settings();
                }
                self.finish_save(pending.target, &pending.plan);
            }
            Some(false) => {
                log::info!("Save cancelled from the re-prefix confirmation");
            }
            None => self.pending_save = Some(pending),
        }
    }
}

impl eframe::App for AutochangerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_remote_requests();
        self.drain_watcher_events();

        self.show_top_panel(ctx);
        self.show_bottom_panel(ctx);
        self.show_central_panel(ctx);
        self.show_settings_window(ctx);
        self.show_reprefix_modal(ctx);

        // The watcher has no repaint hook; poll its channel a few times a
        // second even while idle.
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}

fn apply_theme(ctx: &egui::Context, dark: bool) {
    ctx.set_visuals(if dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    });
}

fn start_watcher(path: &Path) -> Option<VehicleWatcher> {
    match VehicleWatcher::new(path) {
        Ok(watcher) => Some(watcher),
        // Run without live reload until the next file is opened.
        Err(e) => {
            log::warn!("Vehicle watcher unavailable: {e:#}");
            None
        }
    }
}

fn show_error(message: &str) {
    log::error!("{message}");
    message_dialog(rfd::MessageLevel::Error, messages::TITLE_ERROR, message);
}

fn show_warning(message: &str) {
    log::warn!("{message}");
    message_dialog(rfd::MessageLevel::Warning, messages::TITLE_WARNING, message);
}

fn show_info(message: &str) {
    log::info!("{message}");
    message_dialog(rfd::MessageLevel::Info, messages::TITLE_SUCCESS, message);
}

fn message_dialog(level: rfd::MessageLevel, title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}
