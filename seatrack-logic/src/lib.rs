mod heading;
mod location;
mod session;
mod settings;
mod tracking;
mod units;
mod view;

pub use heading::{
    Heading, HeadingFusion, HeadingSourceKind, OrientationEvent, OrientationService,
    OrientationSink, OrientationSubscription,
};
pub use location::{
    Location, LocationError, LocationEvent, LocationSample, LocationService, LocationSink,
    WatchId, WatchOptions, WatchToken,
};
pub use session::{MapSession, UiSender};
pub use settings::{MapSettings, TileLayer};
pub use tracking::{TrackingState, Transition};
pub use units::{Knots, MPS_TO_KNOTS};
pub use view::{InfoPanel, Marker, MarkerIcon, RenderedView, ToggleButton, Viewport};

pub mod prelude {
    use anyhow::Error as AnyhowError;
    use std::result::Result as StdResult;
    pub type Result<T = (), E = AnyhowError> = StdResult<T, E>;
    pub use anyhow::Context;
}
