fn main() -> Result<(), eframe::Error> {
    // Set up logging for development
    env_logger::init();

    // File dialogs and exports are spawned onto this runtime
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Could not start the async runtime: {e}");
            std::process::exit(1);
        }
    };
    let _guard = rt.enter();

    orgchart_tool::run_app()
}
