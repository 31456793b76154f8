use std::time;

use show_image::{create_window, event, ImageInfo, ImageView, WindowOptions};

use tiny_shadow_renderer::framebuffer::Image;
use tiny_shadow_renderer::model::ObjModel;
use tiny_shadow_renderer::renderer::Renderer;

/// Execution parameters, filled from the command line.
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub print_fps: bool,
    pub model_paths: Vec<String>,
    pub output_path: Option<String>, // Render once and save instead of opening a window.
    pub view: View,
}

/// Which buffer ends up on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Shaded,
    Shadow,
}

/// What a key press does to the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Exit,
    MoveLight(f32, f32),
    MoveEye(f32, f32),
    MoveCenter(f32, f32),
}

fn key_action(key_code: event::VirtualKeyCode) -> Option<Action> {
    use event::VirtualKeyCode as Key;
    return match key_code {
        Key::Escape => Some(Action::Exit),
        Key::Left   => Some(Action::MoveLight(-1.0, 0.0)),
        Key::Right  => Some(Action::MoveLight(1.0, 0.0)),
        Key::Up     => Some(Action::MoveLight(0.0, 1.0)),
        Key::Down   => Some(Action::MoveLight(0.0, -1.0)),
        Key::A      => Some(Action::MoveEye(-1.0, 0.0)),
        Key::D      => Some(Action::MoveEye(1.0, 0.0)),
        Key::W      => Some(Action::MoveEye(0.0, 1.0)),
        Key::S      => Some(Action::MoveEye(0.0, -1.0)),
        Key::J      => Some(Action::MoveCenter(-1.0, 0.0)),
        Key::L      => Some(Action::MoveCenter(1.0, 0.0)),
        Key::I      => Some(Action::MoveCenter(0.0, 1.0)),
        Key::K      => Some(Action::MoveCenter(0.0, -1.0)),
        _ => None,
    };
}

/// Helper, maps a window event to an action. Only key presses do anything.
fn window_action(window_event: event::WindowEvent) -> Option<Action> {
    if let event::WindowEvent::KeyboardInput(event) = window_event {
        if event.input.state.is_pressed() {
            return event.input.key_code.and_then(key_action);
        }
    }

    return None;
}

fn render<'a>(renderer: &'a mut Renderer, view: View) -> &'a Image {
    renderer.render();
    return match view {
        View::Shaded => renderer.frame(),
        View::Shadow => renderer.shadow_frame(),
    };
}

/// Loads the models, then either saves a single frame or shows frames in a window until Escape.
pub fn run(params: Params) -> Result<(), Box<dyn std::error::Error>> {
    let mut renderer = Renderer::new(params.width, params.height);
    for path in &params.model_paths {
        renderer.add_model(Box::new(ObjModel::load(path)?));
    }

    if let Some(output_path) = &params.output_path {
        render(&mut renderer, params.view).save(output_path)?;
        log::info!("Frame saved to {}", output_path);
        return Ok(());
    }

    let window_options: WindowOptions = WindowOptions {
        size: Some([params.width, params.height]),
        ..Default::default()
    };
    let window = create_window("output", window_options)?;
    let event_channel = window.event_channel()?;

    let mut dirty = true;
    loop {
        if dirty {
            let time_begin = time::Instant::now();
            let frame = render(&mut renderer, params.view);
            let image_data = ImageView::new(ImageInfo::rgb8(frame.width, frame.height), frame.as_raw());
            window.set_image("image", image_data)?;
            if params.print_fps {
                log::info!("Frame time --- {:?}", time_begin.elapsed());
            }
            dirty = false;
        }

        // Waiting for input, there's nothing to redraw until the scene changes.
        let window_event = match event_channel.recv() {
            Ok(window_event) => window_event,
            Err(_) => break, // Window is gone.
        };
        match window_action(window_event) {
            Some(Action::Exit) => break,
            Some(Action::MoveLight(dx, dy)) => renderer.move_light(dx, dy),
            Some(Action::MoveEye(dx, dy)) => renderer.move_eye(dx, dy),
            Some(Action::MoveCenter(dx, dy)) => renderer.move_center(dx, dy),
            None => continue,
        }
        log::debug!("Camera is now {:?}", renderer.camera());
        dirty = true;
    }

    return Ok(());
}
