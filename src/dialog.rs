//! The trim dialog: a toolbar with trim/undo/redo actions, the embedded
//! canvas, and an OK/Cancel row. The dialog holds no image logic of its
//! own; it relays canvas notifications into toolbar state and forwards
//! every action back to the canvas.

use eframe::egui;
use egui::Color32;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;

use crate::canvas::{Canvas, CanvasEvent};
use crate::prefs::Prefs;

/// Preferences key holding the serialized window geometry.
pub const GEOMETRY_PREFS_KEY: &str = "image-trim-dialog-geometry";

const HINT_TEXT: &str =
    "Select a region by dragging with your mouse on the image, and then click trim";

// ============================================================================
// WINDOW GEOMETRY
// ============================================================================

/// Window position and size persisted across sessions. Stored in the
/// preferences as an opaque bincode blob under [`GEOMETRY_PREFS_KEY`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DialogGeometry {
    /// Outer window position; `None` leaves placement to the OS.
    pub pos: Option<(f32, f32)>,
    /// Inner window size in logical points.
    pub size: (f32, f32),
}

impl Default for DialogGeometry {
    fn default() -> Self {
        Self {
            pos: None,
            size: (800.0, 600.0),
        }
    }
}

impl DialogGeometry {
    /// Read the saved geometry from `prefs`. A missing key or a blob that
    /// does not decode falls back to the 800×600 default.
    pub fn restore(prefs: &Prefs) -> Self {
        prefs
            .get(GEOMETRY_PREFS_KEY)
            .and_then(|blob| bincode::deserialize(blob).ok())
            .unwrap_or_default()
    }

    pub fn to_blob(&self) -> Vec<u8> {
        bincode::serialize(self).unwrap_or_default()
    }
}

// ============================================================================
// TRIM DIALOG
// ============================================================================

/// How the dialog was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimOutcome {
    Accepted,
    Cancelled,
}

pub struct TrimDialog {
    canvas: Canvas,
    events: mpsc::Receiver<CanvasEvent>,

    trim_enabled: bool,
    hint_visible: bool,
    size_text: String,

    /// Guards the persist-geometry + release-canvas pair in [`Self::finish`].
    finished: bool,
}

impl TrimDialog {
    /// Build the dialog around `img_data` (raw encoded image bytes).
    /// Fails only when the canvas cannot decode the bytes.
    pub fn new(img_data: &[u8]) -> Result<Self, String> {
        let mut canvas = Canvas::new();
        let events = canvas.subscribe();
        canvas.load_image(img_data)?;

        let mut dialog = Self {
            canvas,
            events,
            trim_enabled: false,
            hint_visible: true,
            size_text: String::new(),
            finished: false,
        };
        // Pick up the ImageChanged emitted by the initial load so the size
        // label is right before the first frame.
        dialog.refresh();
        Ok(dialog)
    }

    // ------------------------------------------------------------------
    // Canvas notifications → toolbar state
    // ------------------------------------------------------------------

    /// Apply pending canvas notifications. Called at the top of every
    /// frame and after each forwarded action.
    pub fn refresh(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.on_canvas_event(event);
        }
    }

    pub fn on_canvas_event(&mut self, event: CanvasEvent) {
        match event {
            CanvasEvent::SelectionStateChanged(has_selection) => {
                self.trim_enabled = has_selection;
                self.hint_visible = !has_selection;
            }
            CanvasEvent::ImageChanged { width, height } => {
                self.size_text = format!("Size: {}x{}", width, height);
            }
        }
    }

    pub fn trim_enabled(&self) -> bool {
        self.trim_enabled
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn size_text(&self) -> &str {
        &self.size_text
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    // ------------------------------------------------------------------
    // Forwarded actions
    // ------------------------------------------------------------------

    /// Forward the trim action to the canvas. The enablement gate lives in
    /// the toolbar; the canvas itself ignores a trim without a selection.
    pub fn trim(&mut self) {
        self.canvas.trim_image();
        self.refresh();
    }

    pub fn undo(&mut self) {
        self.canvas.undo();
        self.refresh();
    }

    pub fn redo(&mut self) {
        self.canvas.redo();
        self.refresh();
    }

    // ------------------------------------------------------------------
    // Closing
    // ------------------------------------------------------------------

    /// Persist the window geometry and release the canvas. Both the accept
    /// and the cancel path go through here; only the first call has any
    /// effect, so closing twice cannot double-release or overwrite the
    /// saved geometry.
    pub fn finish(&mut self, prefs: &mut Prefs, geometry: DialogGeometry) {
        if self.finished {
            return;
        }
        self.finished = true;
        prefs.set(GEOMETRY_PREFS_KEY, geometry.to_blob());
        prefs.save();
        self.canvas.cleanup();
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    // ------------------------------------------------------------------
    // UI
    // ------------------------------------------------------------------

    /// Render the dialog into the window and report a close request.
    /// The caller is expected to `finish()` and close the window when this
    /// returns `Some`.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<TrimOutcome> {
        self.refresh();

        // Keyboard: Enter = OK, Esc = Cancel, Ctrl+T = trim, platform
        // undo/redo chords. Redo is matched before undo so Ctrl+Shift+Z
        // cannot fall through to plain Ctrl+Z.
        let accept = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));
        let cancel = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));
        let redo_chord = egui::Modifiers {
            shift: true,
            command: true,
            ..Default::default()
        };
        let redo_key = ctx.input_mut(|i| {
            i.consume_key(redo_chord, egui::Key::Z)
                || i.consume_key(egui::Modifiers::COMMAND, egui::Key::Y)
        });
        let undo_key = ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::Z));
        let trim_key = ctx.input_mut(|i| i.consume_key(egui::Modifiers::COMMAND, egui::Key::T));

        if trim_key && self.trim_enabled {
            self.trim();
        }
        if undo_key {
            self.undo();
        }
        if redo_key {
            self.redo();
        }

        let mut outcome = None;
        if accept {
            outcome = Some(TrimOutcome::Accepted);
        }
        if cancel {
            outcome = Some(TrimOutcome::Cancelled);
        }

        egui::TopBottomPanel::top("trim_toolbar").show(ctx, |ui| {
            ui.add_space(2.0);
            ui.horizontal(|ui| {
                let trim_btn = ui
                    .add_enabled(self.trim_enabled, egui::Button::new("\u{2702} Trim"))
                    .on_hover_text(
                        "Trim image by removing borders outside the selected region [Ctrl+T]",
                    );
                if trim_btn.clicked() {
                    self.trim();
                }
                ui.separator();
                if ui
                    .add_enabled(self.canvas.can_undo(), egui::Button::new("\u{21BA} Undo"))
                    .on_hover_text("Undo [Ctrl+Z]")
                    .clicked()
                {
                    self.undo();
                }
                if ui
                    .add_enabled(self.canvas.can_redo(), egui::Button::new("\u{21BB} Redo"))
                    .on_hover_text("Redo [Ctrl+Shift+Z]")
                    .clicked()
                {
                    self.redo();
                }
                ui.separator();
                if self.hint_visible {
                    ui.label(
                        egui::RichText::new(HINT_TEXT).color(ui.visuals().weak_text_color()),
                    );
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(&self.size_text);
                });
            });
            ui.add_space(2.0);
        });

        egui::TopBottomPanel::bottom("trim_buttons").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("  Cancel  ").clicked() {
                        outcome = Some(TrimOutcome::Cancelled);
                    }
                    let ok_btn = egui::Button::new(
                        egui::RichText::new("  OK  ").color(Color32::WHITE).strong(),
                    )
                    .fill(ui.visuals().selection.bg_fill);
                    if ui.add(ok_btn).clicked() {
                        outcome = Some(TrimOutcome::Accepted);
                    }
                });
            });
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas.show(ui);
        });

        outcome
    }
}

// ============================================================================
// TESTS
// ============================================================================
