use eframe::egui;
use gmphoto::app::GMPhotoApp;
use gmphoto::settings::AppSettings;
use gmphoto::{cli, log_info, logger};

fn main() -> Result<(), eframe::Error> {
    // -- CLI / headless mode ---------------------------------------------
    if cli::CliArgs::is_cli_mode() {
        use clap::Parser;
        let args = cli::CliArgs::parse();
        let code = cli::run(args);
        std::process::exit(if code == std::process::ExitCode::SUCCESS {
            0
        } else {
            1
        });
    }

    // -- GUI mode -----------------------------------------------------
    logger::init();
    let settings = AppSettings::load();
    log_info!("settings: {:?}", settings);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([settings.window_width, settings.window_height])
            .with_title("GM Photo Editor"),
        ..Default::default()
    };

    eframe::run_native(
        "GM Photo Editor",
        options,
        Box::new(move |cc| Box::new(GMPhotoApp::new(cc, settings))),
    )
}
