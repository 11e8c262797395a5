//! Read-only viewer for charts made with the editor.

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            log::error!("Could not start the async runtime: {e}");
            std::process::exit(1);
        }
    };
    let _guard = rt.enter();

    orgchart_tool::run_viewer()
}
