#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Botscope adapters.

use std::{cell::Cell, error::Error, fmt, rc::Rc, time::Duration};

use anyhow::Result as AnyResult;
use botscope_core::{Position, RobotId, SnapshotSource, TeamSnapshot};
use botscope_system_trails::{GraphicsSet, TickOutcome, TrailCycle, TrailGraphic};
use glam::Vec2;
use tracing::debug;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Outline colour applied to graphics that carry no styling of their own.
    pub const DEFAULT_GRAPHICS: Color = Color::new(0.78, 0.78, 0.78, 0.8);

    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Draw order bucket; lower layers are drawn first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Depth {
    /// Drawn underneath everything else.
    Background,
    /// Drawn on top of background graphics.
    Foreground,
}

/// Open polyline tracing the recent positions of a robot.
#[derive(Clone, Debug, PartialEq)]
pub struct TrailPolygon {
    /// Colour of the line.
    pub outline_color: Color,
    /// Draw order bucket.
    pub depth: Depth,
    /// Points in world units, ordered from oldest to newest.
    pub points: Vec<Vec2>,
}

impl TrailPolygon {
    /// Creates an empty polyline with the provided styling.
    #[must_use]
    pub fn new(outline_color: Color, depth: Depth) -> Self {
        Self {
            outline_color,
            depth,
            points: Vec::new(),
        }
    }

    /// Creates an empty polyline using the default graphics styling.
    #[must_use]
    pub fn default_styled() -> Self {
        Self::new(Color::DEFAULT_GRAPHICS, Depth::Background)
    }
}

impl TrailGraphic for TrailPolygon {
    fn set_points(&mut self, points: &[Position]) {
        self.points.clear();
        self.points
            .extend(points.iter().map(|point| Vec2::new(point.x(), point.y())));
    }
}

/// Playing field outline, centred on the world origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldPresentation {
    /// Extent along the x axis in metres.
    pub length: f32,
    /// Extent along the y axis in metres.
    pub width: f32,
    /// Colour of the field lines.
    pub line_color: Color,
}

impl FieldPresentation {
    /// Length of a division B field in metres.
    pub const DEFAULT_LENGTH: f32 = 9.0;

    /// Width of a division B field in metres.
    pub const DEFAULT_WIDTH: f32 = 6.0;

    /// Creates a new field descriptor.
    ///
    /// Returns an error when either dimension is not a positive finite number.
    pub fn new(length: f32, width: f32, line_color: Color) -> Result<Self, RenderingError> {
        let valid = |value: f32| value.is_finite() && value > 0.0;
        if !valid(length) || !valid(width) {
            return Err(RenderingError::InvalidFieldDimensions { length, width });
        }

        Ok(Self {
            length,
            width,
            line_color,
        })
    }

    /// Lower-left corner of the field in world units.
    #[must_use]
    pub fn min(&self) -> Vec2 {
        Vec2::new(-self.length * 0.5, -self.width * 0.5)
    }

    /// Upper-right corner of the field in world units.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.length * 0.5, self.width * 0.5)
    }
}

/// Marker drawn at a robot's latest position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RobotMarker {
    /// Robot the marker belongs to.
    pub id: RobotId,
    /// Latest reported position in world units.
    pub position: Vec2,
}

/// Scene description combining the field, trails and robot markers.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Field drawn underneath the trails.
    pub field: FieldPresentation,
    /// Trails currently visible, one per tracked robot.
    pub trails: Vec<TrailPolygon>,
    /// Markers at the robots' latest positions.
    pub robots: Vec<RobotMarker>,
}

impl Scene {
    /// Creates a scene showing only the field.
    #[must_use]
    pub fn new(field: FieldPresentation) -> Self {
        Self {
            field,
            trails: Vec::new(),
            robots: Vec::new(),
        }
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            scene,
        }
    }
}

/// Rendering backend capable of presenting Botscope scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and may
    /// mutate the scene before it is rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, &mut Scene) + 'static;
}

/// Layer that keeps robot trails in a [`Scene`] up to date.
///
/// Each refresh polls the snapshot source once; when nothing new arrived the
/// scene keeps showing the previous trails.
#[derive(Debug)]
pub struct TrailLayer<S> {
    name: String,
    source: S,
    cycle: TrailCycle<TrailPolygon>,
    graphics_changes: Rc<Cell<u64>>,
}

impl<S> TrailLayer<S>
where
    S: SnapshotSource<TeamSnapshot>,
{
    /// Creates a layer that reads snapshots from `source`.
    #[must_use]
    pub fn new<T>(name: T, source: S, trail_length: usize) -> Self
    where
        T: Into<String>,
    {
        let graphics_changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&graphics_changes);
        let graphics = GraphicsSet::with_observer(move || counter.set(counter.get() + 1));

        Self {
            name: name.into(),
            source,
            cycle: TrailCycle::with_graphics(trail_length, graphics),
            graphics_changes,
        }
    }

    /// Display name of the layer.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of times the set of trail graphics changed size.
    #[must_use]
    pub fn graphics_changes(&self) -> u64 {
        self.graphics_changes.get()
    }

    /// Trail cycle driven by the layer.
    #[must_use]
    pub fn cycle(&self) -> &TrailCycle<TrailPolygon> {
        &self.cycle
    }

    /// Runs one refresh tick and mirrors the result into `scene`.
    pub fn refresh(&mut self, scene: &mut Scene) -> TickOutcome {
        let changes_before = self.graphics_changes.get();
        let outcome = self.cycle.tick(&mut self.source, TrailPolygon::default_styled);
        if outcome == TickOutcome::Skipped {
            return outcome;
        }

        if self.graphics_changes.get() != changes_before {
            debug!(
                layer = %self.name,
                trails = self.cycle.graphics().len(),
                "trail graphics resized"
            );
        }

        scene.trails.clear();
        scene
            .trails
            .extend(self.cycle.graphics().iter().cloned());

        scene.robots.clear();
        scene
            .robots
            .extend(self.cycle.histories().iter().filter_map(|history| {
                history.positions().newest().map(|position| RobotMarker {
                    id: history.robot(),
                    position: Vec2::new(position.x(), position.y()),
                })
            }));

        outcome
    }
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq)]
pub enum RenderingError {
    /// Field dimensions must be positive finite numbers.
    InvalidFieldDimensions {
        /// Provided length that failed validation.
        length: f32,
        /// Provided width that failed validation.
        width: f32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFieldDimensions { length, width } => {
                write!(
                    f,
                    "field dimensions must be positive (received {length} x {width})"
                )
            }
        }
    }
}

impl Error for RenderingError {}

#[cfg(test)]
mod tests {
    use super::*;
    use botscope_core::{RobotState, SnapshotBuffer};

    fn field() -> FieldPresentation {
        FieldPresentation::new(9.0, 6.0, Color::from_rgb_u8(255, 255, 255)).expect("valid field")
    }

    fn team(robots: &[(u32, f32, f32)]) -> TeamSnapshot {
        TeamSnapshot::new(
            robots
                .iter()
                .map(|&(id, x, y)| RobotState::new(RobotId::new(id), Position::new(x, y)))
                .collect(),
        )
    }

    #[test]
    fn field_creation_rejects_non_positive_dimensions() {
        let error = FieldPresentation::new(0.0, 6.0, Color::DEFAULT_GRAPHICS)
            .expect_err("zero length must be rejected");

        assert!(matches!(
            error,
            RenderingError::InvalidFieldDimensions { length, .. } if length == 0.0
        ));
        assert!(FieldPresentation::new(9.0, f32::NAN, Color::DEFAULT_GRAPHICS).is_err());
    }

    #[test]
    fn field_bounds_are_centred_on_origin() {
        let field = field();

        assert_eq!(field.min(), Vec2::new(-4.5, -3.0));
        assert_eq!(field.max(), Vec2::new(4.5, 3.0));
    }

    #[test]
    fn default_trail_uses_default_styling() {
        let trail = TrailPolygon::default_styled();

        assert_eq!(trail.outline_color, Color::DEFAULT_GRAPHICS);
        assert_eq!(trail.depth, Depth::Background);
        assert!(trail.points.is_empty());
    }

    #[test]
    fn trail_points_replace_previous_outline() {
        let mut trail = TrailPolygon::default_styled();
        trail.set_points(&[Position::new(1.0, 2.0), Position::new(3.0, 4.0)]);
        trail.set_points(&[Position::new(5.0, 6.0)]);

        assert_eq!(trail.points, vec![Vec2::new(5.0, 6.0)]);
    }

    #[test]
    fn refresh_mirrors_trails_and_markers_into_scene() {
        let mut buffer = SnapshotBuffer::new(5);
        let publisher = buffer.publisher();
        let mut layer = TrailLayer::new("Trails", buffer, 60);
        let mut scene = Scene::new(field());

        publisher.publish(team(&[(1, 0.0, 0.0), (2, 1.0, 1.0)]));
        let _ = layer.refresh(&mut scene);
        publisher.publish(team(&[(1, 0.5, 0.0), (2, 1.0, 1.5)]));
        let outcome = layer.refresh(&mut scene);

        assert_eq!(outcome, TickOutcome::Updated { robots: 2 });
        assert_eq!(scene.trails.len(), 2);
        assert_eq!(
            scene.trails[0].points,
            vec![Vec2::new(0.0, 0.0), Vec2::new(0.5, 0.0)]
        );
        assert_eq!(
            scene.robots,
            vec![
                RobotMarker {
                    id: RobotId::new(1),
                    position: Vec2::new(0.5, 0.0),
                },
                RobotMarker {
                    id: RobotId::new(2),
                    position: Vec2::new(1.0, 1.5),
                },
            ]
        );
        assert_eq!(layer.graphics_changes(), 1);
    }

    #[test]
    fn idle_refresh_leaves_scene_untouched() {
        let mut layer = TrailLayer::new("Trails", Some(team(&[(4, 2.0, 2.0)])), 60);
        let mut scene = Scene::new(field());
        let _ = layer.refresh(&mut scene);
        let before = scene.clone();

        assert_eq!(layer.refresh(&mut scene), TickOutcome::Skipped);
        assert_eq!(scene, before);
        assert_eq!(layer.name(), "Trails");
    }
}
