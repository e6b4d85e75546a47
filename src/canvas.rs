//! The image-editing canvas embedded in the trim dialog.
//!
//! The canvas owns the decoded image, the drag-to-select rectangle, and a
//! snapshot-based undo/redo history. Everything the dialog needs to know
//! about it flows through [`CanvasEvent`] notifications: subscribers get a
//! `SelectionStateChanged` on every selection transition and an
//! `ImageChanged` whenever the pixel data (and possibly the dimensions)
//! changes.

use std::collections::VecDeque;
use std::sync::mpsc;

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Rect, Stroke, TextureHandle, TextureOptions};
use image::RgbaImage;

/// Snapshots kept for undo. The oldest snapshot is dropped beyond this.
const MAX_HISTORY: usize = 50;

/// Side length of the checkerboard cells drawn behind transparent pixels.
const CHECKER_SIZE: f32 = 8.0;

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Typed notifications sent to canvas subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CanvasEvent {
    /// A selection appeared (`true`) or disappeared (`false`).
    /// Sent on transitions only, never repeated for the same state.
    SelectionStateChanged(bool),
    /// The image pixels changed (load, trim, undo, redo).
    ImageChanged { width: u32, height: u32 },
}

// ============================================================================
// CANVAS
// ============================================================================

pub struct Canvas {
    image: Option<RgbaImage>,

    /// Active selection in image pixel coordinates, `None` when nothing is
    /// selected. Kept clamped to the image bounds.
    selection: Option<Rect>,
    /// Image-space position where the current drag began.
    drag_anchor: Option<Pos2>,

    undo_stack: VecDeque<RgbaImage>,
    redo_stack: Vec<RgbaImage>,

    subscribers: Vec<mpsc::Sender<CanvasEvent>>,

    texture: Option<TextureHandle>,
    texture_dirty: bool,

    /// Set by `cleanup()`; all operations are no-ops afterwards.
    released: bool,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            image: None,
            selection: None,
            drag_anchor: None,
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            subscribers: Vec::new(),
            texture: None,
            texture_dirty: false,
            released: false,
        }
    }

    // ------------------------------------------------------------------
    // Subscription
    // ------------------------------------------------------------------

    /// Register an observer. The returned receiver gets every subsequent
    /// [`CanvasEvent`]; dropping it (or calling [`Canvas::cleanup`])
    /// unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::Receiver<CanvasEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: CanvasEvent) {
        // Receivers that went away are pruned on the next send.
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }

    // ------------------------------------------------------------------
    // Image loading and queries
    // ------------------------------------------------------------------

    /// Decode `data` and make it the canvas image, resetting the selection
    /// and the undo/redo history.
    pub fn load_image(&mut self, data: &[u8]) -> Result<(), String> {
        if self.released {
            return Err("canvas already released".to_string());
        }
        let decoded = image::load_from_memory(data)
            .map_err(|e| format!("failed to decode image: {}", e))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();

        self.image = Some(decoded);
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.drag_anchor = None;
        self.texture_dirty = true;

        self.set_selection(None);
        self.emit(CanvasEvent::ImageChanged { width, height });
        Ok(())
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn selection_rect(&self) -> Option<Rect> {
        self.selection
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Set the selection to `rect` (image pixel coordinates), clamped to the
    /// image bounds. Rectangles smaller than one pixel clear the selection.
    pub fn select_region(&mut self, rect: Rect) {
        if self.released {
            return;
        }
        self.set_selection(self.clamp_to_image(rect));
    }

    pub fn clear_selection(&mut self) {
        if self.released {
            return;
        }
        self.set_selection(None);
    }

    /// Single point where the selection changes, so the transition
    /// notification can never be missed or duplicated.
    fn set_selection(&mut self, selection: Option<Rect>) {
        let had = self.selection.is_some();
        self.selection = selection;
        let has = self.selection.is_some();
        if had != has {
            self.emit(CanvasEvent::SelectionStateChanged(has));
        }
    }

    fn clamp_to_image(&self, rect: Rect) -> Option<Rect> {
        let (w, h) = self.dimensions()?;
        let clamped = rect.intersect(Rect::from_min_max(
            Pos2::ZERO,
            egui::pos2(w as f32, h as f32),
        ));
        if clamped.width() >= 1.0 && clamped.height() >= 1.0 {
            Some(clamped)
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Trim / undo / redo
    // ------------------------------------------------------------------

    /// Crop the image to the current selection. No-op without a selection.
    pub fn trim_image(&mut self) {
        if self.released {
            return;
        }
        let (Some(sel), Some(img)) = (self.selection, self.image.as_ref()) else {
            return;
        };
        let (x, y, w, h) = pixel_bounds(sel, img.width(), img.height());
        if w == 0 || h == 0 {
            return;
        }

        let cropped = image::imageops::crop_imm(img, x, y, w, h).to_image();
        let previous = self.image.replace(cropped);
        if let Some(previous) = previous {
            self.push_undo(previous);
        }
        self.texture_dirty = true;

        self.set_selection(None);
        self.emit(CanvasEvent::ImageChanged { width: w, height: h });
    }

    /// Revert to the snapshot taken before the most recent trim.
    pub fn undo(&mut self) {
        if self.released {
            return;
        }
        let Some(previous) = self.undo_stack.pop_back() else {
            return;
        };
        if let Some(current) = self.image.replace(previous) {
            self.redo_stack.push(current);
        }
        self.after_history_step();
    }

    /// Re-apply the most recently undone trim.
    pub fn redo(&mut self) {
        if self.released {
            return;
        }
        let Some(next) = self.redo_stack.pop() else {
            return;
        };
        if let Some(current) = self.image.replace(next) {
            self.undo_stack.push_back(current);
        }
        self.after_history_step();
    }

    fn push_undo(&mut self, snapshot: RgbaImage) {
        if self.undo_stack.len() == MAX_HISTORY {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(snapshot);
        self.redo_stack.clear();
    }

    fn after_history_step(&mut self) {
        self.texture_dirty = true;
        // The selection was made against the old dimensions.
        self.set_selection(None);
        if let Some((width, height)) = self.dimensions() {
            self.emit(CanvasEvent::ImageChanged { width, height });
        }
    }

    // ------------------------------------------------------------------
    // Cleanup
    // ------------------------------------------------------------------

    /// Release the decoded image, texture, history, and all subscribers.
    /// Safe to call more than once; only the first call does anything.
    pub fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.image = None;
        self.texture = None;
        self.selection = None;
        self.drag_anchor = None;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.subscribers.clear();
    }

    // ------------------------------------------------------------------
    // Rendering & interaction
    // ------------------------------------------------------------------

    /// Paint the canvas into the available space and handle selection drags.
    pub fn show(&mut self, ui: &mut egui::Ui) {
        let available = ui.available_size();
        let (response, painter) =
            ui.allocate_painter(available, egui::Sense::click_and_drag());
        let canvas_rect = response.rect;

        painter.rect_filled(canvas_rect, 0.0, ui.visuals().extreme_bg_color);

        if self.texture_dirty {
            self.upload_texture(ui.ctx());
        }
        let Some((img_w, img_h)) = self.dimensions() else {
            return;
        };

        // Fit the image into the panel, never upscaling past 1:1.
        let scale = (canvas_rect.width() / img_w as f32)
            .min(canvas_rect.height() / img_h as f32)
            .min(1.0);
        let display = egui::vec2(img_w as f32 * scale, img_h as f32 * scale);
        let image_rect =
            Rect::from_min_size(canvas_rect.min + (canvas_rect.size() - display) / 2.0, display);

        paint_checkerboard(&painter, image_rect);
        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                image_rect,
                Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        self.handle_pointer(&response, image_rect, scale, img_w, img_h);

        if let Some(sel) = self.selection {
            let sel_screen = Rect::from_min_max(
                image_rect.min + sel.min.to_vec2() * scale,
                image_rect.min + sel.max.to_vec2() * scale,
            );
            paint_selection(&painter, image_rect, sel_screen);
        }
    }

    fn upload_texture(&mut self, ctx: &egui::Context) {
        self.texture = self.image.as_ref().map(|img| {
            let size = [img.width() as usize, img.height() as usize];
            let pixels = ColorImage::from_rgba_unmultiplied(size, img.as_raw());
            ctx.load_texture("trim_canvas", pixels, TextureOptions::LINEAR)
        });
        self.texture_dirty = false;
    }

    fn handle_pointer(
        &mut self,
        response: &egui::Response,
        image_rect: Rect,
        scale: f32,
        img_w: u32,
        img_h: u32,
    ) {
        let to_image = |pos: Pos2| -> Pos2 {
            egui::pos2(
                ((pos.x - image_rect.min.x) / scale).clamp(0.0, img_w as f32),
                ((pos.y - image_rect.min.y) / scale).clamp(0.0, img_h as f32),
            )
        };

        if let Some(pointer) = response.interact_pointer_pos() {
            let img_pos = to_image(pointer);
            if response.drag_started_by(egui::PointerButton::Primary) {
                self.drag_anchor = Some(img_pos);
            }
            if response.dragged_by(egui::PointerButton::Primary)
                && let Some(anchor) = self.drag_anchor
            {
                self.set_selection(self.clamp_to_image(Rect::from_two_pos(anchor, img_pos)));
            }
        }
        if response.drag_released() {
            self.drag_anchor = None;
        }
        // A plain click (no drag) deselects.
        if response.clicked() {
            self.set_selection(None);
        }
    }
}

/// Round a selection rectangle out to whole pixels, clamped to the image.
fn pixel_bounds(sel: Rect, img_w: u32, img_h: u32) -> (u32, u32, u32, u32) {
    let x0 = (sel.min.x.max(0.0).floor() as u32).min(img_w);
    let y0 = (sel.min.y.max(0.0).floor() as u32).min(img_h);
    let x1 = (sel.max.x.max(0.0).ceil() as u32).min(img_w);
    let y1 = (sel.max.y.max(0.0).ceil() as u32).min(img_h);
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

fn paint_checkerboard(painter: &egui::Painter, rect: Rect) {
    let light = Color32::from_gray(200);
    let dark = Color32::from_gray(160);
    for y in 0..((rect.height() / CHECKER_SIZE).ceil() as i32) {
        for x in 0..((rect.width() / CHECKER_SIZE).ceil() as i32) {
            let color = if (x + y) % 2 == 0 { light } else { dark };
            let cell = Rect::from_min_size(
                rect.min + egui::vec2(x as f32 * CHECKER_SIZE, y as f32 * CHECKER_SIZE),
                egui::vec2(CHECKER_SIZE, CHECKER_SIZE),
            )
            .intersect(rect);
            painter.rect_filled(cell, 0.0, color);
        }
    }
}

/// Dim everything outside the selection and stroke its border.
fn paint_selection(painter: &egui::Painter, image_rect: Rect, sel: Rect) {
    let dim = Color32::from_black_alpha(100);
    let strips = [
        Rect::from_min_max(image_rect.min, egui::pos2(image_rect.max.x, sel.min.y)),
        Rect::from_min_max(egui::pos2(image_rect.min.x, sel.max.y), image_rect.max),
        Rect::from_min_max(egui::pos2(image_rect.min.x, sel.min.y), sel.left_bottom()),
        Rect::from_min_max(sel.right_top(), egui::pos2(image_rect.max.x, sel.max.y)),
    ];
    for strip in strips {
        if strip.width() > 0.0 && strip.height() > 0.0 {
            painter.rect_filled(strip.intersect(image_rect), 0.0, dim);
        }
    }
    painter.rect_stroke(sel, 0.0, Stroke::new(1.5, Color32::WHITE));
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([40, 80, 120, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    fn loaded_canvas(width: u32, height: u32) -> (Canvas, mpsc::Receiver<CanvasEvent>) {
        let mut canvas = Canvas::new();
        let events = canvas.subscribe();
        canvas.load_image(&png_bytes(width, height)).unwrap();
        (canvas, events)
    }

    fn drain(rx: &mpsc::Receiver<CanvasEvent>) -> Vec<CanvasEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[test]
    fn load_image_notifies_dimensions() {
        let (canvas, events) = loaded_canvas(64, 48);
        assert_eq!(canvas.dimensions(), Some((64, 48)));
        assert!(drain(&events).contains(&CanvasEvent::ImageChanged {
            width: 64,
            height: 48
        }));
    }

    #[test]
    fn load_image_rejects_garbage() {
        let mut canvas = Canvas::new();
        assert!(canvas.load_image(b"not an image at all").is_err());
        assert!(canvas.image().is_none());
    }

    #[test]
    fn selection_events_fire_on_transitions_only() {
        let (mut canvas, events) = loaded_canvas(100, 100);
        drain(&events);

        canvas.select_region(Rect::from_min_max(egui::pos2(10.0, 10.0), egui::pos2(50.0, 40.0)));
        assert_eq!(drain(&events), vec![CanvasEvent::SelectionStateChanged(true)]);

        // Growing an existing selection is not a state transition.
        canvas.select_region(Rect::from_min_max(egui::pos2(10.0, 10.0), egui::pos2(80.0, 90.0)));
        assert!(drain(&events).is_empty());

        canvas.clear_selection();
        assert_eq!(drain(&events), vec![CanvasEvent::SelectionStateChanged(false)]);

        // Already clear; nothing to report.
        canvas.clear_selection();
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn selection_is_clamped_and_degenerate_rects_clear() {
        let (mut canvas, _events) = loaded_canvas(20, 20);

        canvas.select_region(Rect::from_min_max(egui::pos2(-5.0, -5.0), egui::pos2(30.0, 10.0)));
        let sel = canvas.selection_rect().unwrap();
        assert_eq!(sel.min, egui::pos2(0.0, 0.0));
        assert_eq!(sel.max, egui::pos2(20.0, 10.0));

        // Sub-pixel rectangle counts as no selection.
        canvas.select_region(Rect::from_min_max(egui::pos2(5.0, 5.0), egui::pos2(5.4, 5.4)));
        assert!(!canvas.has_selection());
    }

    #[test]
    fn trim_crops_to_selection_and_clears_it() {
        let (mut canvas, events) = loaded_canvas(100, 80);
        canvas.select_region(Rect::from_min_max(egui::pos2(10.0, 20.0), egui::pos2(60.0, 50.0)));
        drain(&events);

        canvas.trim_image();

        assert_eq!(canvas.dimensions(), Some((50, 30)));
        assert!(!canvas.has_selection());
        assert!(canvas.can_undo());
        let evs = drain(&events);
        assert!(evs.contains(&CanvasEvent::SelectionStateChanged(false)));
        assert!(evs.contains(&CanvasEvent::ImageChanged {
            width: 50,
            height: 30
        }));
    }

    #[test]
    fn trim_without_selection_is_a_no_op() {
        let (mut canvas, events) = loaded_canvas(30, 30);
        drain(&events);

        canvas.trim_image();

        assert_eq!(canvas.dimensions(), Some((30, 30)));
        assert!(!canvas.can_undo());
        assert!(drain(&events).is_empty());
    }

    #[test]
    fn undo_restores_pretrim_image_and_redo_reapplies() {
        let (mut canvas, events) = loaded_canvas(100, 80);
        canvas.select_region(Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(40.0, 40.0)));
        canvas.trim_image();
        drain(&events);

        canvas.undo();
        assert_eq!(canvas.dimensions(), Some((100, 80)));
        assert!(!canvas.can_undo());
        assert!(canvas.can_redo());
        assert!(drain(&events).contains(&CanvasEvent::ImageChanged {
            width: 100,
            height: 80
        }));

        canvas.redo();
        assert_eq!(canvas.dimensions(), Some((40, 40)));
        assert!(canvas.can_undo());
        assert!(!canvas.can_redo());
    }

    #[test]
    fn new_trim_discards_redo_branch() {
        let (mut canvas, _events) = loaded_canvas(100, 100);
        canvas.select_region(Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(50.0, 50.0)));
        canvas.trim_image();
        canvas.undo();
        assert!(canvas.can_redo());

        canvas.select_region(Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(30.0, 30.0)));
        canvas.trim_image();
        assert!(!canvas.can_redo());
    }

    #[test]
    fn history_depth_is_bounded() {
        let (mut canvas, _events) = loaded_canvas(300, 300);
        // One more trim than the history holds.
        for _ in 0..(MAX_HISTORY + 1) {
            let (w, h) = canvas.dimensions().unwrap();
            canvas.select_region(Rect::from_min_max(
                egui::pos2(0.0, 0.0),
                egui::pos2((w - 1) as f32, (h - 1) as f32),
            ));
            canvas.trim_image();
        }

        let mut undos = 0;
        while canvas.can_undo() {
            canvas.undo();
            undos += 1;
        }
        assert_eq!(undos, MAX_HISTORY);
        // The original 300x300 snapshot was dropped from the front.
        assert_eq!(canvas.dimensions(), Some((299, 299)));
    }

    #[test]
    fn cleanup_releases_everything_and_is_idempotent() {
        let (mut canvas, events) = loaded_canvas(10, 10);
        canvas.select_region(Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(5.0, 5.0)));
        canvas.trim_image();
        drain(&events);

        canvas.cleanup();
        assert!(canvas.is_released());
        assert!(canvas.image().is_none());
        assert!(!canvas.can_undo());

        // Subscribers were dropped along with everything else.
        assert!(events.try_recv().is_err());

        // Further operations, including a second cleanup, are no-ops.
        canvas.cleanup();
        canvas.trim_image();
        canvas.undo();
        assert!(canvas.image().is_none());
    }
}
