pub mod config;
pub mod coords;
pub mod error;
pub mod intervals;
pub mod io;
pub mod markers;
pub mod plot;
pub mod resolver;
pub mod session;
pub mod signal;
pub mod viewport;

pub use config::EditorConfig;
pub use error::{AnnotateError, Result};
pub use intervals::{IntervalPoint, IntervalSeries, IntervalStats};
pub use markers::{MarkerEdit, MarkerSet, Nearest, Placement};
pub use resolver::{Input, InteractionResolver, Outcome, Surface, SurfaceLayout};
pub use session::{Change, RenderFrame, Session};
pub use signal::Signal;
pub use viewport::{PanDirection, SampleWindow, ViewPreferences, Viewport};
