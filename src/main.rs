use std::path::PathBuf;

use clap::Parser;
use eframe::egui;

use imagetrim::app::TrimApp;
use imagetrim::dialog::{DialogGeometry, TrimDialog};
use imagetrim::logger;
use imagetrim::prefs::Prefs;

/// Trim (crop) an image in a small dialog window.
///
/// Drag a rectangle on the image and click Trim; OK keeps the result,
/// Cancel discards it.
#[derive(Parser, Debug)]
#[command(name = "imagetrim", about = "Trim (crop) an image in a dialog window")]
struct CliArgs {
    /// Image file to open. A native file picker is shown when omitted.
    image: Option<PathBuf>,

    /// Write the trimmed image here when the dialog is confirmed
    /// (format inferred from the extension).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> Result<(), eframe::Error> {
    let args = CliArgs::parse();
    logger::init();

    let Some(path) = args.image.clone().or_else(pick_image) else {
        // Picker dismissed — nothing to open.
        return Ok(());
    };
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("error: cannot read {:?}: {}", path, e);
            std::process::exit(1);
        }
    };

    let prefs = Prefs::load();
    let geometry = DialogGeometry::restore(&prefs);
    let dialog = match TrimDialog::new(&data) {
        Ok(dialog) => dialog,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };
    imagetrim::log_info!("opened {:?} ({})", path, dialog.size_text());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([geometry.size.0, geometry.size.1])
            .with_min_inner_size([480.0, 320.0])
            .with_title("Trim Image"),
        ..Default::default()
    };
    let output = args.output;
    eframe::run_native(
        "ImageTrim",
        options,
        Box::new(move |_cc| Box::new(TrimApp::new(dialog, prefs, geometry, output))),
    )
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(
            "Images",
            &["png", "jpg", "jpeg", "webp", "bmp", "tga", "ico", "tiff", "tif"],
        )
        .pick_file()
}
