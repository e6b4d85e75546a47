//! Standalone host for the trim dialog: one native window whose entire
//! content is the dialog. Tracks live window geometry for persistence and
//! turns the OS close button into a cancel.

use eframe::egui;
use std::path::PathBuf;

use crate::dialog::{DialogGeometry, TrimDialog, TrimOutcome};
use crate::prefs::Prefs;

pub struct TrimApp {
    dialog: TrimDialog,
    prefs: Prefs,
    /// Destination for the trimmed image on OK, when given on the CLI.
    output: Option<PathBuf>,
    /// Geometry as of the most recent frame; written to prefs on close.
    geometry: DialogGeometry,
    first_frame: bool,
    closing: bool,
}

impl TrimApp {
    pub fn new(
        dialog: TrimDialog,
        prefs: Prefs,
        geometry: DialogGeometry,
        output: Option<PathBuf>,
    ) -> Self {
        Self {
            dialog,
            prefs,
            output,
            geometry,
            first_frame: true,
            closing: false,
        }
    }

    fn close_with(&mut self, ctx: &egui::Context, outcome: TrimOutcome) {
        // Write the result while the canvas still holds the image.
        if outcome == TrimOutcome::Accepted
            && let Some(path) = self.output.clone()
        {
            self.write_output(&path);
        }
        self.dialog.finish(&mut self.prefs, self.geometry);
        crate::log_info!("dialog closed: {:?}", outcome);
        self.closing = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    fn write_output(&self, path: &PathBuf) {
        let Some(img) = self.dialog.canvas().image() else {
            return;
        };
        // Format is inferred from the extension by the image crate.
        match img.save(path) {
            Ok(()) => crate::log_info!("trimmed image written to {:?}", path),
            Err(e) => {
                eprintln!("error: could not write {:?}: {}", path, e);
                crate::log_err!("could not write {:?}: {}", path, e);
            }
        }
    }
}

impl eframe::App for TrimApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Restore the saved window position on the first frame (more
        // reliable than the viewport builder hint) ---
        if self.first_frame {
            self.first_frame = false;
            if let Some((x, y)) = self.geometry.pos {
                ctx.send_viewport_cmd(egui::ViewportCommand::OuterPosition(egui::pos2(x, y)));
            }
        }

        // --- Track the live window geometry ---
        let (outer, inner) = ctx.input(|i| {
            let viewport = i.viewport();
            (viewport.outer_rect, viewport.inner_rect)
        });
        if let Some(rect) = outer {
            self.geometry.pos = Some((rect.min.x, rect.min.y));
        }
        if let Some(rect) = inner {
            self.geometry.size = (rect.width(), rect.height());
        }

        // --- The OS window-close button counts as a cancel ---
        if !self.closing && ctx.input(|i| i.viewport().close_requested()) {
            self.dialog.finish(&mut self.prefs, self.geometry);
            crate::log_info!("dialog closed: Cancelled (window close)");
            self.closing = true;
        }
        if self.closing {
            return;
        }

        if let Some(outcome) = self.dialog.show(ctx) {
            self.close_with(ctx, outcome);
        }
    }
}
