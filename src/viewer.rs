//! Interactive window around a [`Scene`]
//!
//! A/D rotate the models about Y, W/S about X, the mouse wheel dollies the
//! camera. Any change clears the buffers and re-renders.

use macroquad::prelude as mq;

use crate::rasterizer::{Mat4, Scene};

/// Radians per second while a rotate key is held
const ROTATE_SPEED: f32 = 1.5;
/// World units per wheel notch
const DOLLY_STEP: f32 = 0.25;

/// Open a window and run until it is closed or Escape is pressed
pub fn run(scene: Scene, title: &str) {
    let conf = mq::Conf {
        window_title: title.to_string(),
        window_width: scene.width() as i32,
        window_height: scene.height() as i32,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    };
    macroquad::Window::from_config(conf, view_loop(scene));
}

/// Rotation requested by held keys this frame
fn key_rotation(step: f32) -> Option<Mat4> {
    let mut m = Mat4::identity();
    let mut any = false;
    for (key, rot) in [
        (mq::KeyCode::A, Mat4::rotation_y(-step)),
        (mq::KeyCode::D, Mat4::rotation_y(step)),
        (mq::KeyCode::W, Mat4::rotation_x(-step)),
        (mq::KeyCode::S, Mat4::rotation_x(step)),
    ] {
        if mq::is_key_down(key) {
            m = rot * m;
            any = true;
        }
    }
    any.then_some(m)
}

async fn view_loop(mut scene: Scene) {
    let mut dirty = true;
    let mut texture = None;

    loop {
        if mq::is_key_pressed(mq::KeyCode::Escape) {
            break;
        }

        if let Some(rot) = key_rotation(ROTATE_SPEED * mq::get_frame_time()) {
            for model in &mut scene.models {
                model.apply(rot);
            }
            dirty = true;
        }
        let wheel = mq::mouse_wheel().1;
        if wheel != 0.0 {
            scene.camera.dolly(wheel.signum() * DOLLY_STEP);
            dirty = true;
        }

        if dirty {
            scene.clear();
            let start = std::time::Instant::now();
            let stats = scene.render();
            log::debug!("Rendered {} triangles in {:?}", stats.triangles, start.elapsed());

            let fb = scene.framebuffer();
            let tex = mq::Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.to_rgba8());
            tex.set_filter(mq::FilterMode::Nearest);
            texture = Some(tex);
            dirty = false;
        }

        mq::clear_background(mq::BLACK);
        if let Some(tex) = &texture {
            mq::draw_texture_ex(
                tex,
                0.0,
                0.0,
                mq::WHITE,
                mq::DrawTextureParams {
                    dest_size: Some(mq::vec2(mq::screen_width(), mq::screen_height())),
                    ..Default::default()
                },
            );
        }
        mq::draw_text(&format!("{} fps", mq::get_fps()), 8.0, 20.0, 20.0, mq::WHITE);

        mq::next_frame().await;
    }
}
