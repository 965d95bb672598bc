use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, specta::Type,
)]
/// Compass direction in whole degrees clockwise from north, always in `0..360`
pub struct Heading(u16);

impl Heading {
    pub const NORTH: Self = Self(0);

    /// Round a raw compass angle to the nearest degree and wrap it into `0..360`,
    /// so 359.6 becomes 0 and -90 becomes 270. Returns `None` for NaN or infinite angles.
    pub fn from_degrees(angle: f64) -> Option<Self> {
        if !angle.is_finite() {
            return None;
        }
        let rounded = angle.round().rem_euclid(360.0);
        Some(Self(rounded as u16))
    }

    pub fn degrees(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, specta::Type)]
/// Which orientation feed produced a heading
pub enum HeadingSourceKind {
    /// Referenced to magnetic/true north (`deviceorientationabsolute`)
    Absolute,
    /// Referenced to an arbitrary starting frame (`deviceorientation`)
    Relative,
}

impl HeadingSourceKind {
    pub const ALL: [Self; 2] = [Self::Absolute, Self::Relative];
}

/// One reading from an orientation feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, specta::Type)]
pub struct OrientationEvent {
    pub kind: HeadingSourceKind,
    /// Rotation about the z axis in degrees, `None` when the device can't tell
    pub alpha: Option<f64>,
}

/// Where an orientation subscription delivers its events
#[derive(Debug, Clone)]
pub struct OrientationSink {
    kind: HeadingSourceKind,
    tx: mpsc::UnboundedSender<OrientationEvent>,
}

impl OrientationSink {
    pub(crate) fn new(
        kind: HeadingSourceKind,
        tx: mpsc::UnboundedSender<OrientationEvent>,
    ) -> Self {
        Self { kind, tx }
    }

    pub fn kind(&self) -> HeadingSourceKind {
        self.kind
    }

    /// Push a reading, the kind is always the one this sink was subscribed for
    pub fn send(&self, alpha: Option<f64>) {
        self.tx
            .send(OrientationEvent {
                kind: self.kind,
                alpha,
            })
            .ok();
    }
}

/// Handle for a live orientation subscription, hand it back to
/// [OrientationService::unsubscribe] to stop the feed.
#[derive(Debug, PartialEq, Eq)]
pub struct OrientationSubscription {
    pub kind: HeadingSourceKind,
    pub id: u32,
}

pub trait OrientationService {
    fn subscribe(&self, sink: OrientationSink) -> OrientationSubscription;
    fn unsubscribe(&self, subscription: OrientationSubscription);
}

/// Folds both orientation feeds into one heading. Absolute readings win: once one has been
/// applied, relative readings are ignored.
#[derive(Debug, Clone, Default)]
pub struct HeadingFusion {
    heading: Heading,
    source: Option<HeadingSourceKind>,
}

impl HeadingFusion {
    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn source(&self) -> Option<HeadingSourceKind> {
        self.source
    }

    /// Apply a reading, returns whether the displayed heading or its source changed
    pub fn apply(&mut self, event: OrientationEvent) -> bool {
        if event.kind == HeadingSourceKind::Relative
            && self.source == Some(HeadingSourceKind::Absolute)
        {
            return false;
        }

        let Some(heading) = event.alpha.and_then(Heading::from_degrees) else {
            return false;
        };

        let changed = heading != self.heading || self.source != Some(event.kind);
        self.source = Some(event.kind);
        self.heading = heading;
        changed
    }
}
