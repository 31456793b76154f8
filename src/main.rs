mod app;

use std::env;

use tiny_shadow_renderer::logging::{init_logging, LoggingConfig};

const WIDTH: u32  = 800;
const HEIGHT: u32 = 800;
const DEFAULT_MODEL: &str = "assets/cube/cube.obj";

#[show_image::main]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default());

    // Default values.
    let mut model_paths: Vec<String> = Vec::new();
    let mut output_path = None;
    let mut view = app::View::Shaded;
    let mut print_fps = false;

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1).cloned();
        match (args[i].as_str(), value) {
            ("-p", Some(path)) => { model_paths.push(path); i += 1; }
            ("-o", Some(path)) => { output_path = Some(path); i += 1; }
            ("-s", Some(name)) => {
                view = match name.as_str() {
                    "shadow" => app::View::Shadow,
                    _ => app::View::Shaded,
                };
                i += 1;
            }
            ("--fps", _) => { print_fps = true; }
            (arg, _) => { log::warn!("Ignoring argument {}", arg); }
        }
        i += 1;
    }
    if model_paths.is_empty() {
        model_paths.push(String::from(DEFAULT_MODEL));
    }

    let params = app::Params {
        width: WIDTH,
        height: HEIGHT,
        print_fps,
        model_paths,
        output_path,
        view,
    };

    app::run(params)?;

    return Ok(());
}
