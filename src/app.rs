use eframe::egui;
use std::path::Path;

use annotate_graph::cache::DisplayCache;
use annotate_graph::render::{arrowhead, dash_pattern};
use annotate_graph::sidecar::IMAGE_EXTENSIONS;
use annotate_graph::{
    ConnectPick, ConnectionKind, Document, Error, Rgb, Selection,
};

// ── Tool / Interaction State ────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq)]
enum Mode {
    Draw,
    Connect,
}

/// Pointer gesture in progress. Positions are canvas-local.
#[derive(Clone, Debug)]
enum DragState {
    None,
    Drawing { start: egui::Pos2 },
    Moving { index: usize },
    Resizing { index: usize },
}

#[derive(Clone, Debug)]
enum PromptTarget {
    NewNode { start: egui::Pos2, end: egui::Pos2 },
    NewConnection { from: usize, to: usize },
    EditSelected,
}

/// Modal multi-line text entry.
struct Prompt {
    title: String,
    target: PromptTarget,
    buf: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

struct Notice {
    level: NoticeLevel,
    title: String,
    message: String,
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct AnnotateApp {
    doc: Document,
    texture: Option<egui::TextureHandle>,
    cache: DisplayCache,

    mode: Mode,
    drag: DragState,
    hovered: Option<usize>,

    prompt: Option<Prompt>,
    notice: Option<Notice>,
    fit_pending: bool,
}

impl AnnotateApp {
    pub fn new(doc: Document) -> Self {
        let fit_pending = doc.image.is_some();
        Self {
            doc,
            texture: None,
            cache: DisplayCache::new(),
            mode: Mode::Draw,
            drag: DragState::None,
            hovered: None,
            prompt: None,
            notice: None,
            fit_pending,
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, title: &str, message: impl Into<String>) {
        let message = message.into();
        match level {
            NoticeLevel::Error => tracing::error!(%title, %message),
            NoticeLevel::Warning => tracing::warn!(%title, %message),
            NoticeLevel::Info => tracing::info!(%title, %message),
        }
        self.notice = Some(Notice {
            level,
            title: title.to_string(),
            message,
        });
    }

    fn reset_interaction(&mut self) {
        self.cache.invalidate();
        self.texture = None;
        self.drag = DragState::None;
        self.hovered = None;
        self.prompt = None;
        self.fit_pending = true;
    }

    // ── File commands ───────────────────────────────────────────────────────

    pub fn open_image_path(&mut self, path: &Path) {
        match self.doc.open_image(path) {
            Ok(()) => self.reset_interaction(),
            Err(e) => self.notify(NoticeLevel::Error, "Error", format!("Failed to open image: {e}")),
        }
    }

    pub fn load_json_path(&mut self, path: &Path) {
        match self.doc.load_json(path) {
            Ok(report) => {
                self.reset_interaction();
                if report.image.is_none() {
                    self.notify(
                        NoticeLevel::Warning,
                        "Image Missing",
                        format!(
                            "No image named like the annotation file was found ({}).",
                            IMAGE_EXTENSIONS.map(|e| format!(".{e}")).join(", ")
                        ),
                    );
                } else {
                    self.notify(
                        NoticeLevel::Info,
                        "Load Complete",
                        format!(
                            "Loaded {} nodes and {} connections.",
                            report.nodes, report.connections
                        ),
                    );
                }
            }
            Err(e) => self.notify(NoticeLevel::Error, "Error", format!("Failed to load JSON file: {e}")),
        }
    }

    fn pick_image(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &IMAGE_EXTENSIONS)
            .pick_file()
        {
            self.open_image_path(&path);
        }
    }

    fn pick_json(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON Files", &["json"])
            .pick_file()
        {
            self.load_json_path(&path);
        }
    }

    fn save_json(&mut self) {
        match self.doc.save_json() {
            Ok(path) => self.notify(
                NoticeLevel::Info,
                "Save JSON",
                format!("Saved to {}", path.display()),
            ),
            Err(Error::NoImage) => {
                self.notify(NoticeLevel::Warning, "Save Error", "Load an image first.")
            }
            Err(e) => self.notify(NoticeLevel::Error, "Save Error", e.to_string()),
        }
    }

    fn export_image(&mut self) {
        match self.doc.export_annotated() {
            Ok(path) => self.notify(
                NoticeLevel::Info,
                "Export",
                format!("Exported to {}", path.display()),
            ),
            Err(Error::NoImage) => {
                self.notify(NoticeLevel::Warning, "Export Error", "Load an image first.")
            }
            Err(e) => self.notify(NoticeLevel::Error, "Export Error", e.to_string()),
        }
    }

    // ── Selection commands ──────────────────────────────────────────────────

    fn delete_selected(&mut self) {
        match self.doc.scene.delete_selected() {
            Ok(()) => self.hovered = None,
            Err(Error::NothingSelected) => {
                self.notify(NoticeLevel::Info, "Info", "Select an item to delete.")
            }
            Err(e) => self.notify(NoticeLevel::Error, "Error", e.to_string()),
        }
    }

    fn edit_selected(&mut self) {
        let Some(text) = self.doc.scene.selected_text() else {
            self.notify(NoticeLevel::Info, "Info", "Select an item to edit.");
            return;
        };
        let title = match self.doc.scene.selection {
            Some(Selection::Connection(_)) => "Edit Connection Text",
            _ => "Edit Node Text",
        };
        self.prompt = Some(Prompt {
            title: title.to_string(),
            target: PromptTarget::EditSelected,
            buf: text.to_string(),
        });
    }

    fn toggle_direction(&mut self) {
        if self.doc.scene.toggle_direction().is_err() {
            self.notify(
                NoticeLevel::Info,
                "Info",
                "Select a connection to change its direction.",
            );
        }
    }

    fn apply_prompt(&mut self, prompt: Prompt) {
        let scene = &mut self.doc.scene;
        let result = match prompt.target {
            PromptTarget::NewNode { start, end } => {
                scene.create_node(start, end, &prompt.buf).map(|_| ())
            }
            PromptTarget::NewConnection { from, to } => scene
                .create_connection(from, to, Some(prompt.buf))
                .map(|_| ()),
            PromptTarget::EditSelected => scene.edit_text(&prompt.buf).map(|_| ()),
        };
        match result {
            Ok(()) | Err(Error::EmptyText) => {}
            Err(e) => self.notify(NoticeLevel::Error, "Error", e.to_string()),
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────────

    fn sync_texture(&mut self, ctx: &egui::Context) {
        let Some(img) = &self.doc.image else {
            self.texture = None;
            return;
        };
        let view = &self.doc.scene.view;
        let rebuilt = self.cache.refresh(img, view.scale_factor, view.opacity);
        if !rebuilt && self.texture.is_some() {
            return;
        }
        if let Some(bitmap) = self.cache.bitmap() {
            let size = [bitmap.width() as usize, bitmap.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, bitmap.as_raw());
            self.texture = Some(ctx.load_texture(
                "image",
                color_image,
                egui::TextureOptions::LINEAR,
            ));
        }
    }

    fn draw_scene(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        let scene = &self.doc.scene;
        let view = &scene.view;
        let origin = canvas_rect.min.to_vec2();

        if let (Some(tex), Some(size)) = (&self.texture, self.doc.image_size()) {
            let min = egui::Pos2::ZERO + view.offset + origin;
            let img_rect = egui::Rect::from_min_size(min, view.scaled_size(size));
            painter.image(
                tex.id(),
                img_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        for (i, node) in scene.nodes.iter().enumerate() {
            let rect = view.rect_to_screen(&node.coords).translate(origin);
            let selected = scene.selection == Some(Selection::Node(i));
            let (color, width) = if selected {
                (egui::Color32::YELLOW, 4.0)
            } else {
                (egui::Color32::RED, 3.0)
            };
            painter.rect_stroke(
                rect,
                0.0,
                egui::Stroke::new(width, color),
                egui::StrokeKind::Middle,
            );
            if self.hovered == Some(i) || scene.pending().contains(&i) {
                painter.rect_stroke(
                    rect.expand(3.0),
                    0.0,
                    egui::Stroke::new(2.0, egui::Color32::from_rgb(0, 120, 255)),
                    egui::StrokeKind::Middle,
                );
            }
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                &node.text,
                egui::FontId::proportional(12.0),
                egui::Color32::BLACK,
            );
        }

        for (i, conn) in scene.connections.iter().enumerate() {
            let Some((from, to)) = scene.endpoints(conn) else {
                continue;
            };
            let a = view.to_screen(from) + origin;
            let b = view.to_screen(to) + origin;
            let selected = scene.selection == Some(Selection::Connection(i));
            let (color, width) = if selected {
                (egui::Color32::GREEN, 4.0)
            } else {
                (conn.color.to_egui(), 2.0)
            };
            let stroke = egui::Stroke::new(width, color);
            match dash_pattern(conn.kind) {
                Some((dash, gap)) => painter.extend(egui::Shape::dashed_line(&[a, b], stroke, dash, gap)),
                None => {
                    painter.line_segment([a, b], stroke);
                }
            }
            if conn.direction {
                if let Some(head) = arrowhead(a, b, width) {
                    painter.add(egui::Shape::convex_polygon(
                        head.to_vec(),
                        color,
                        egui::Stroke::NONE,
                    ));
                }
            }
            if let Some(text) = conn.text.as_deref().filter(|t| !t.is_empty()) {
                painter.text(
                    a + (b - a) * 0.5,
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(12.0),
                    egui::Color32::BLUE,
                );
            }
        }
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image…").clicked() {
                        ui.close_menu();
                        self.pick_image();
                    }
                    if ui.button("Load JSON…").clicked() {
                        ui.close_menu();
                        self.pick_json();
                    }
                    if ui.button("Save Nodes and Connections as JSON").clicked() {
                        ui.close_menu();
                        self.save_json();
                    }
                    if ui.button("Export Annotated Image").clicked() {
                        ui.close_menu();
                        self.export_image();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Fit to Window").clicked() {
                        ui.close_menu();
                        self.fit_pending = true;
                    }
                });
            });
            ui.horizontal(|ui| {
                let view = &mut self.doc.scene.view;
                ui.add(egui::Slider::new(&mut view.opacity, 0..=255).text("Transparency"));
                ui.separator();
                if ui
                    .checkbox(&mut view.keep_aspect_ratio, "Keep Aspect Ratio")
                    .changed()
                {
                    self.fit_pending = true;
                }
                ui.separator();
                ui.label(format!("Zoom: {:.0}%", view.scale_factor * 100.0));
            });
        });
    }

    fn side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("items")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let before = self.mode;
                    ui.radio_value(&mut self.mode, Mode::Draw, "Draw Node");
                    ui.radio_value(&mut self.mode, Mode::Connect, "Connect Nodes");
                    if self.mode != before {
                        self.doc.scene.cancel_connect();
                    }
                });
                ui.separator();

                let entries = self.doc.scene.list_entries();
                egui::ScrollArea::vertical()
                    .max_height(ui.available_height() * 0.6)
                    .show(ui, |ui| {
                        for (sel, label) in entries {
                            let checked = self.doc.scene.selection == Some(sel);
                            if ui.selectable_label(checked, label).clicked() {
                                self.doc.scene.select(Some(sel));
                            }
                        }
                    });
                ui.separator();

                if ui.button("Delete Selected").clicked() {
                    self.delete_selected();
                }
                if ui.button("Edit Selected").clicked() {
                    self.edit_selected();
                }
                if ui.button("Toggle Direction").clicked() {
                    self.toggle_direction();
                }
                ui.separator();

                let scene = &mut self.doc.scene;
                let mut kind = scene.style.kind;
                egui::ComboBox::from_label("Connection Type")
                    .selected_text(kind.as_str())
                    .show_ui(ui, |ui| {
                        for k in ConnectionKind::ALL {
                            ui.selectable_value(&mut kind, k, k.as_str());
                        }
                    });
                if kind != scene.style.kind {
                    scene.style.kind = kind;
                    let _ = scene.set_connection_kind(kind);
                }

                ui.horizontal(|ui| {
                    ui.label("Connection Color:");
                    let mut rgb = scene.style.color.to_array();
                    if ui.color_edit_button_srgb(&mut rgb).changed() {
                        scene.style.color = Rgb::from_array(rgb);
                        let _ = scene.set_connection_color(scene.style.color);
                    }
                });
                ui.checkbox(&mut scene.style.direction, "New connections are directed");
            });
    }

    fn show_prompt(&mut self, ctx: &egui::Context) {
        let Some(prompt) = &mut self.prompt else {
            return;
        };
        let mut submit = ctx.input_mut(|i| {
            !i.modifiers.shift && i.consume_key(egui::Modifiers::NONE, egui::Key::Enter)
        });
        let mut cancel = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));

        egui::Window::new(prompt.title.clone())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                let te = ui.add(
                    egui::TextEdit::multiline(&mut prompt.buf)
                        .desired_rows(6)
                        .desired_width(320.0),
                );
                te.request_focus();
                ui.label("Enter to confirm, Shift+Enter for a new line.");
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        submit = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if cancel {
            self.prompt = None;
        } else if submit {
            if let Some(prompt) = self.prompt.take() {
                self.apply_prompt(prompt);
            }
        }
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else {
            return;
        };
        let mut close = false;
        egui::Window::new(notice.title.clone())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_TOP, [0.0, 40.0])
            .show(ctx, |ui| {
                let color = match notice.level {
                    NoticeLevel::Info => ui.visuals().text_color(),
                    NoticeLevel::Warning => ui.visuals().warn_fg_color,
                    NoticeLevel::Error => ui.visuals().error_fg_color,
                };
                ui.colored_label(color, &notice.message);
                if ui.button("OK").clicked() {
                    close = true;
                }
            });
        if close {
            self.notice = None;
        }
    }

    // ── Input ───────────────────────────────────────────────────────────────

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.prompt.is_some() || ctx.wants_keyboard_input() {
            return;
        }
        let step = self.doc.scene.settings().pan_step;
        let (save, delete, escape, pan) = ctx.input(|i| {
            let mut pan = egui::Vec2::ZERO;
            if i.key_pressed(egui::Key::ArrowUp) {
                pan.y -= step;
            }
            if i.key_pressed(egui::Key::ArrowDown) {
                pan.y += step;
            }
            if i.key_pressed(egui::Key::ArrowLeft) {
                pan.x -= step;
            }
            if i.key_pressed(egui::Key::ArrowRight) {
                pan.x += step;
            }
            (
                i.modifiers.ctrl && i.key_pressed(egui::Key::S),
                i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace),
                i.key_pressed(egui::Key::Escape),
                pan,
            )
        });
        if pan != egui::Vec2::ZERO {
            self.doc.scene.view.pan(pan);
        }
        if save {
            self.save_json();
        }
        if delete && self.doc.scene.selection.is_some() {
            self.delete_selected();
        }
        if escape {
            self.doc.scene.cancel_connect();
            self.doc.scene.select(None);
        }
    }

    fn handle_canvas(&mut self, ctx: &egui::Context, response: &egui::Response, canvas_rect: egui::Rect) {
        let to_local = |p: egui::Pos2| (p - canvas_rect.min).to_pos2();
        let scene = &mut self.doc.scene;

        self.hovered = response.hover_pos().and_then(|p| scene.node_at(to_local(p)));

        // Pan (middle mouse button)
        if ctx.input(|i| i.pointer.middle_down()) {
            let delta = ctx.input(|i| i.pointer.delta());
            scene.view.pan(delta);
        }

        // Zoom (ctrl + scroll), anchored at the image origin
        let zoom = ctx.input(|i| i.zoom_delta());
        if zoom != 1.0 && response.hovered() {
            scene.view.zoom(zoom - 1.0);
        }

        if self.prompt.is_some() {
            return;
        }

        // Primary button: draw, connect, select
        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos().map(to_local) {
                match self.mode {
                    Mode::Draw => {
                        let item = scene.item_at(pos);
                        scene.select(item);
                    }
                    Mode::Connect => {
                        if let Some(index) = scene.node_at(pos) {
                            if let Ok(ConnectPick::Pair { from, to }) = scene.pick_for_connection(index) {
                                self.prompt = Some(Prompt {
                                    title: "Enter text for this connection (optional)".to_string(),
                                    target: PromptTarget::NewConnection { from, to },
                                    buf: String::new(),
                                });
                            }
                        }
                    }
                }
            }
        }

        if self.mode == Mode::Draw && response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                self.drag = DragState::Drawing { start: to_local(pos) };
            }
        }

        // Secondary button: move or resize a node
        if response.drag_started_by(egui::PointerButton::Secondary) {
            if let Some(pos) = response.interact_pointer_pos().map(to_local) {
                // A handle anywhere beats the body of an enclosing node.
                let gesture = match scene.resize_handle_at(pos) {
                    Some(index) => Some((index, DragState::Resizing { index })),
                    None => scene.node_at(pos).map(|index| (index, DragState::Moving { index })),
                };
                if let Some((index, drag)) = gesture {
                    scene.select(Some(Selection::Node(index)));
                    self.drag = drag;
                }
            }
        }

        if response.dragged_by(egui::PointerButton::Secondary) {
            match self.drag {
                DragState::Moving { index } => {
                    let delta = response.drag_delta() / scene.view.scale_factor;
                    let _ = scene.translate_node(index, delta);
                }
                DragState::Resizing { index } => {
                    if let Some(pos) = response.interact_pointer_pos().map(to_local) {
                        let corner = scene.view.to_image(pos);
                        let _ = scene.resize_node(index, corner);
                    }
                }
                _ => {}
            }
        }

        if response.drag_stopped_by(egui::PointerButton::Secondary) {
            self.drag = DragState::None;
        }

        if response.drag_stopped_by(egui::PointerButton::Primary) {
            if let DragState::Drawing { start } = self.drag {
                let end = response
                    .interact_pointer_pos()
                    .or(ctx.input(|i| i.pointer.latest_pos()))
                    .map(to_local);
                if let Some(end) = end {
                    if scene.draw_extent_ok(start, end) {
                        self.prompt = Some(Prompt {
                            title: "Enter Text for Node".to_string(),
                            target: PromptTarget::NewNode { start, end },
                            buf: String::new(),
                        });
                    }
                }
            }
            self.drag = DragState::None;
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for AnnotateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);
        self.menu_bar(ctx);
        self.side_panel(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            if self.fit_pending {
                if let Some(size) = self.doc.image_size() {
                    self.doc.scene.view.fit_to_canvas(size, canvas_rect.size());
                }
                self.fit_pending = false;
            }

            self.handle_canvas(ctx, &response, canvas_rect);
            self.sync_texture(ctx);

            painter.rect_filled(canvas_rect, 0.0, egui::Color32::WHITE);
            self.draw_scene(&painter, canvas_rect);

            // In-progress node preview
            if let DragState::Drawing { start } = self.drag {
                if let Some(current) = response.hover_pos() {
                    let rect = egui::Rect::from_two_pos(canvas_rect.min + start.to_vec2(), current);
                    painter.rect_stroke(
                        rect,
                        0.0,
                        egui::Stroke::new(1.0, egui::Color32::RED),
                        egui::StrokeKind::Middle,
                    );
                }
            }
        });

        self.show_prompt(ctx);
        self.show_notice(ctx);
    }
}

/// Window title for an optional image path.
pub fn title_for(path: Option<&Path>) -> String {
    match path.and_then(|p| p.file_name()) {
        Some(name) => format!("annotate-graph - {}", name.to_string_lossy()),
        None => "annotate-graph".to_string(),
    }
}
