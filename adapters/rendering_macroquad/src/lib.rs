#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Botscope.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, so the adapter depends on macroquad without its default `audio`
//! feature.

use anyhow::Result;
use botscope_core::RobotId;
use botscope_rendering::{
    Color, Depth, FieldPresentation, Presentation, RenderingBackend, RobotMarker, Scene,
    TrailPolygon,
};
use glam::Vec2;
use macroquad::input::{is_key_pressed, KeyCode};
use std::time::{Duration, Instant};
use tracing::info;

const WINDOW_MARGIN: f32 = 24.0;
const FIELD_LINE_THICKNESS: f32 = 2.0;
const TRAIL_THICKNESS: f32 = 2.0;
const MARKER_RADIUS_M: f32 = 0.09;

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend logs frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

#[derive(Clone, Copy, Debug)]
struct FpsMetrics {
    per_second: f32,
    avg_update: Duration,
    avg_render: Duration,
}

/// Tracks the average frames-per-second produced by the render loop.
#[derive(Debug, Default)]
struct FpsCounter {
    elapsed: Duration,
    frames: u32,
    update_accum: Duration,
    render_accum: Duration,
}

impl FpsCounter {
    /// Records a rendered frame and returns the averages once one second has elapsed.
    fn record_frame(
        &mut self,
        frame: Duration,
        update: Duration,
        render: Duration,
    ) -> Option<FpsMetrics> {
        self.elapsed += frame;
        self.frames = self.frames.saturating_add(1);
        self.update_accum += update;
        self.render_accum += render;

        if self.elapsed < Duration::from_secs(1) {
            return None;
        }

        let seconds = self.elapsed.as_secs_f32();
        let frames = self.frames;
        let metrics = FpsMetrics {
            per_second: frames as f32 / seconds,
            avg_update: self.update_accum / frames,
            avg_render: self.render_accum / frames,
        };
        *self = Self::default();
        Some(metrics)
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Scene) + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 1080,
            window_height: 760,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let background = to_macroquad_color(clear_color);
            let mut fps_counter = FpsCounter::default();

            loop {
                if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q) {
                    break;
                }

                macroquad::window::clear_background(background);

                let dt_seconds = macroquad::time::get_frame_time();
                let frame_dt = Duration::from_secs_f32(dt_seconds.max(0.0));

                let update_start = Instant::now();
                update_scene(frame_dt, &mut scene);
                let update_duration = update_start.elapsed();

                let render_start = Instant::now();
                let metrics = FieldMetrics::new(
                    &scene.field,
                    macroquad::window::screen_width(),
                    macroquad::window::screen_height(),
                );
                draw_field(&scene.field, &metrics);
                draw_trails(&scene.trails, &metrics, Depth::Background);
                draw_trails(&scene.trails, &metrics, Depth::Foreground);
                draw_robots(&scene.robots, &metrics);
                let render_duration = render_start.elapsed();

                let fps_metrics =
                    fps_counter.record_frame(frame_dt, update_duration, render_duration);
                if show_fps {
                    if let Some(FpsMetrics {
                        per_second,
                        avg_update,
                        avg_render,
                    }) = fps_metrics
                    {
                        info!(
                            fps = format_args!("{per_second:.2}"),
                            update_ms = avg_update.as_secs_f64() * 1_000.0,
                            render_ms = avg_render.as_secs_f64() * 1_000.0,
                            "frame timing"
                        );
                    }
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

/// Maps world coordinates in metres onto the window, preserving aspect ratio.
///
/// The field is centred in the window and world `y` grows upwards.
#[derive(Clone, Copy, Debug, PartialEq)]
struct FieldMetrics {
    scale: f32,
    center: Vec2,
}

impl FieldMetrics {
    fn new(field: &FieldPresentation, screen_width: f32, screen_height: f32) -> Self {
        let available_width = (screen_width - 2.0 * WINDOW_MARGIN).max(0.0);
        let available_height = (screen_height - 2.0 * WINDOW_MARGIN).max(0.0);
        let scale = (available_width / field.length)
            .min(available_height / field.width)
            .max(0.0);

        Self {
            scale,
            center: Vec2::new(screen_width * 0.5, screen_height * 0.5),
        }
    }

    fn to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(
            self.center.x + world.x * self.scale,
            self.center.y - world.y * self.scale,
        )
    }
}

fn draw_field(field: &FieldPresentation, metrics: &FieldMetrics) {
    let top_left = metrics.to_screen(Vec2::new(field.min().x, field.max().y));
    let size = Vec2::new(field.length, field.width) * metrics.scale;
    let color = to_macroquad_color(field.line_color);

    macroquad::shapes::draw_rectangle_lines(
        top_left.x,
        top_left.y,
        size.x,
        size.y,
        FIELD_LINE_THICKNESS,
        color,
    );

    let halfway_top = metrics.to_screen(Vec2::new(0.0, field.max().y));
    let halfway_bottom = metrics.to_screen(Vec2::new(0.0, field.min().y));
    macroquad::shapes::draw_line(
        halfway_top.x,
        halfway_top.y,
        halfway_bottom.x,
        halfway_bottom.y,
        FIELD_LINE_THICKNESS,
        color,
    );
}

fn trail_segments<'a>(
    trail: &'a TrailPolygon,
    metrics: &'a FieldMetrics,
) -> impl Iterator<Item = (Vec2, Vec2)> + 'a {
    trail
        .points
        .windows(2)
        .map(move |pair| (metrics.to_screen(pair[0]), metrics.to_screen(pair[1])))
}

fn draw_trails(trails: &[TrailPolygon], metrics: &FieldMetrics, depth: Depth) {
    for trail in trails.iter().filter(|trail| trail.depth == depth) {
        let color = to_macroquad_color(trail.outline_color);
        for (start, end) in trail_segments(trail, metrics) {
            macroquad::shapes::draw_line(start.x, start.y, end.x, end.y, TRAIL_THICKNESS, color);
        }
    }
}

fn draw_robots(robots: &[RobotMarker], metrics: &FieldMetrics) {
    let radius = (MARKER_RADIUS_M * metrics.scale).max(2.0);
    for robot in robots {
        let center = metrics.to_screen(robot.position);
        let fill = to_macroquad_color(marker_color(robot.id));
        macroquad::shapes::draw_circle(center.x, center.y, radius, fill);
        macroquad::shapes::draw_circle_lines(
            center.x,
            center.y,
            radius,
            1.0,
            macroquad::color::BLACK,
        );
    }
}

fn marker_color(id: RobotId) -> Color {
    const PALETTE: [Color; 4] = [
        Color::from_rgb_u8(66, 135, 245),
        Color::from_rgb_u8(245, 197, 66),
        Color::from_rgb_u8(96, 200, 120),
        Color::from_rgb_u8(220, 90, 200),
    ];
    let base = PALETTE[id.get() as usize % PALETTE.len()];
    let shade = (id.get() as usize / PALETTE.len()) as f32 * 0.25;
    base.lighten(shade)
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
