use std::time::{Duration, Instant};

use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, Texture};
use sdl2::video::Window;
use tracing::{debug, warn};

use crate::audio::NesAudio;
use crate::config::Config;
use crate::joypad::Button;
use crate::nes::Nes;
use crate::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::screen_buffer::ScreenBuffer;

/// EventLoop owns the SDL2 window and audio queue and drives the console
/// one frame at a time. It exits when Escape is pressed, the window is
/// closed or the frame budget runs out.
pub struct EventLoop {
    _sdl_context: sdl2::Sdl,
    canvas: Canvas<Window>,
    event_pump: sdl2::EventPump,
    audio: Option<NesAudio>,
    screen: ScreenBuffer,
}

impl EventLoop {
    const MIN_SCALE: f32 = 1.0;
    const MAX_SCALE: f32 = 5.0;
    const FRAME_TIME: Duration = Duration::from_nanos(1_000_000_000 / 60);

    /// Creates the window, scaled by `video_scale`, and the audio queue.
    ///
    /// `video_scale` is clamped to the range [1.0, 5.0] with a warning.
    /// A missing audio device is tolerated; the emulator then runs silent.
    ///
    /// # Errors
    ///
    /// Returns an error if SDL2 initialization fails, the event pump cannot
    /// be created, or the window cannot be created.
    pub fn new(config: &Config, video_scale: f32) -> Result<Self, String> {
        let scale = Self::clamp_scale(video_scale);

        let sdl_context = sdl2::init()?;
        let event_pump = sdl_context.event_pump()?;
        let canvas = Self::create_window_and_canvas(&sdl_context, scale)?;

        let audio = match NesAudio::new(&sdl_context, config) {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!("no audio: {}", e);
                None
            }
        };

        Ok(EventLoop {
            _sdl_context: sdl_context,
            canvas,
            event_pump,
            audio,
            screen: ScreenBuffer::new(),
        })
    }

    /// Clamps the video scaling factor to the valid range [1.0, 5.0].
    fn clamp_scale(scale: f32) -> f32 {
        if scale < Self::MIN_SCALE {
            warn!(
                "video scaling factor {} is below minimum {}, clamping",
                scale,
                Self::MIN_SCALE
            );
            Self::MIN_SCALE
        } else if scale > Self::MAX_SCALE {
            warn!(
                "video scaling factor {} is above maximum {}, clamping",
                scale,
                Self::MAX_SCALE
            );
            Self::MAX_SCALE
        } else {
            scale
        }
    }

    fn create_window_and_canvas(sdl_context: &sdl2::Sdl, scale: f32) -> Result<Canvas<Window>, String> {
        let scaled_width = (SCREEN_WIDTH as f32 * scale) as u32;
        let scaled_height = (SCREEN_HEIGHT as f32 * scale) as u32;
        let video_subsystem = sdl_context.video()?;

        let window = video_subsystem
            .window("nestep", scaled_width, scaled_height)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let mut canvas = window.into_canvas().build().map_err(|e| e.to_string())?;
        canvas.set_draw_color(sdl2::pixels::Color::RGB(0, 0, 0));
        canvas.clear();
        canvas.present();
        debug!("window {}x{}", scaled_width, scaled_height);

        Ok(canvas)
    }

    /// Copies the last frame into the streaming texture and presents it.
    fn render_frame(
        canvas: &mut Canvas<Window>,
        texture: &mut Texture,
        screen: &ScreenBuffer,
    ) -> Result<(), String> {
        texture
            .with_lock(None, |buffer: &mut [u8], pitch: usize| {
                if pitch == screen.pitch() {
                    screen.copy_buffer(buffer);
                } else {
                    // row by row for padded textures
                    for (y, row) in screen.as_bytes().chunks_exact(screen.pitch()).enumerate() {
                        let offset = y * pitch;
                        buffer[offset..offset + row.len()].copy_from_slice(row);
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        canvas.clear();
        canvas.copy(texture, None, None)?;
        canvas.present();

        Ok(())
    }

    /// Runs frames until the user quits, or until `frames` frames have been
    /// emulated when it is non-zero.
    pub fn run(&mut self, nes: &mut Nes, frames: u64) -> Result<(), String> {
        let texture_creator = self.canvas.texture_creator();
        let mut texture = texture_creator
            .create_texture_streaming(
                PixelFormatEnum::RGB24,
                SCREEN_WIDTH as u32,
                SCREEN_HEIGHT as u32,
            )
            .map_err(|e| e.to_string())?;

        if let Some(audio) = &self.audio {
            audio.resume();
        }

        let mut next_frame = Instant::now();
        loop {
            for event in self.event_pump.poll_iter() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => return Ok(()),
                    Event::KeyDown {
                        keycode: Some(key),
                        repeat: false,
                        ..
                    } => {
                        if let Some(button) = key_to_button(key) {
                            nes.pad_mut(0).set_button(button, true);
                        }
                    }
                    Event::KeyUp {
                        keycode: Some(key), ..
                    } => {
                        if let Some(button) = key_to_button(key) {
                            nes.pad_mut(0).set_button(button, false);
                        }
                    }
                    _ => {}
                }
            }

            nes.step();

            if let Some(audio) = &mut self.audio {
                audio.push(nes.output_samples())?;
            }
            self.screen.update(nes.output_pixels());
            Self::render_frame(&mut self.canvas, &mut texture, &self.screen)?;

            if frames > 0 && nes.frame() >= frames {
                return Ok(());
            }

            // Frame limiting at ~60 Hz; a late frame resets the schedule
            next_frame += Self::FRAME_TIME;
            let now = Instant::now();
            if next_frame > now {
                std::thread::sleep(next_frame - now);
            } else {
                next_frame = now;
            }
        }
    }
}

/// Keyboard layout of pad 0
pub fn key_to_button(key: Keycode) -> Option<Button> {
    match key {
        Keycode::Z => Some(Button::A),
        Keycode::X => Some(Button::B),
        Keycode::RShift | Keycode::Space => Some(Button::Select),
        Keycode::Return => Some(Button::Start),
        Keycode::Up => Some(Button::Up),
        Keycode::Down => Some(Button::Down),
        Keycode::Left => Some(Button::Left),
        Keycode::Right => Some(Button::Right),
        _ => None,
    }
}
