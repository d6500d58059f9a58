//! Diagnostics emitted while decoding, and the listeners receiving them.
//!
//! When no listener is registered, events are logged through `tracing`.

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Severity of a decoder event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
}

/// A diagnostic about the content of a file.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderEvent {
    /// An attribute value cannot be parsed; the attribute is treated as absent.
    IllegalAttributeValue {
        variable: String,
        attribute: String,
        value: String,
        cause: String,
    },
    /// The longitude span of a localization grid is wide enough to make universal
    /// projections unstable.
    GridSpanTooWide {
        variable: String,
        span: f64,
        projection: String,
    },
    /// The `positive` attribute, axis type and unit of an axis disagree on its direction.
    AmbiguousAxisDirection {
        variable: String,
        declared: String,
        inferred: String,
    },
    /// A dimension of a variable has no counterpart in its grid.
    CannotRelateDimension { variable: String, dimension: String },
    /// A variable dimension differs in size from its grid dimension and no resampling
    /// interval tells how to relate them.
    ResamplingIntervalNotFound { variable: String, dimension: String },
    /// A grid mapping variable describes a CRS that cannot be built.
    UnsupportedGridMapping {
        variable: String,
        mapping: String,
        reason: String,
    },
    /// The grid geometry of a variable cannot be created.
    CannotCreateGridGeometry { variable: String, message: String },
}

impl DecoderEvent {
    pub fn level(&self) -> EventLevel {
        match self {
            DecoderEvent::GridSpanTooWide { .. } => EventLevel::Info,
            _ => EventLevel::Warning,
        }
    }

    /// Name of the variable this event is about.
    pub fn variable(&self) -> &str {
        match self {
            DecoderEvent::IllegalAttributeValue { variable, .. }
            | DecoderEvent::GridSpanTooWide { variable, .. }
            | DecoderEvent::AmbiguousAxisDirection { variable, .. }
            | DecoderEvent::CannotRelateDimension { variable, .. }
            | DecoderEvent::ResamplingIntervalNotFound { variable, .. }
            | DecoderEvent::UnsupportedGridMapping { variable, .. }
            | DecoderEvent::CannotCreateGridGeometry { variable, .. } => variable,
        }
    }
}

impl fmt::Display for DecoderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderEvent::IllegalAttributeValue {
                variable,
                attribute,
                value,
                cause,
            } => write!(
                f,
                "Illegal value \"{}\" for attribute \"{}\" of variable \"{}\": {}",
                value, attribute, variable, cause
            ),
            DecoderEvent::GridSpanTooWide {
                variable,
                span,
                projection,
            } => write!(
                f,
                "Longitude span of {:.1}° in the grid of \"{}\" may be too wide for {}",
                span, variable, projection
            ),
            DecoderEvent::AmbiguousAxisDirection {
                variable,
                declared,
                inferred,
            } => write!(
                f,
                "Axis \"{}\" is declared {} but attributes suggest {}",
                variable, declared, inferred
            ),
            DecoderEvent::CannotRelateDimension {
                variable,
                dimension,
            } => write!(
                f,
                "Dimension \"{}\" of variable \"{}\" has no counterpart in its grid",
                dimension, variable
            ),
            DecoderEvent::ResamplingIntervalNotFound {
                variable,
                dimension,
            } => write!(
                f,
                "No resampling interval relates dimension \"{}\" of variable \"{}\" to its grid",
                dimension, variable
            ),
            DecoderEvent::UnsupportedGridMapping {
                variable,
                mapping,
                reason,
            } => write!(
                f,
                "Grid mapping \"{}\" of variable \"{}\" is not supported: {}",
                mapping, variable, reason
            ),
            DecoderEvent::CannotCreateGridGeometry { variable, message } => write!(
                f,
                "Cannot create the grid geometry of variable \"{}\": {}",
                variable, message
            ),
        }
    }
}

/// Receiver of decoder events.
pub trait WarningListener: Send + Sync {
    fn on_event(&self, event: &DecoderEvent);
}

/// The listeners registered on a decoder.
#[derive(Clone, Default)]
pub struct Listeners {
    listeners: Vec<Arc<dyn WarningListener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Arc<dyn WarningListener>) {
        self.listeners.push(listener);
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver an event to all listeners, or log it if there is none.
    pub fn report(&self, event: DecoderEvent) {
        if self.listeners.is_empty() {
            match event.level() {
                EventLevel::Info => info!(variable = event.variable(), "{}", event),
                EventLevel::Warning => warn!(variable = event.variable(), "{}", event),
            }
            return;
        }
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

/// A listener keeping all events in memory.
#[derive(Debug, Default)]
pub struct CollectingListener {
    events: Mutex<Vec<DecoderEvent>>,
}

impl CollectingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A copy of the events received so far.
    pub fn events(&self) -> Vec<DecoderEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl WarningListener for CollectingListener {
    fn on_event(&self, event: &DecoderEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_listeners() {
        let collector = CollectingListener::new();
        let mut listeners = Listeners::new();
        listeners.add(collector.clone());
        listeners.report(DecoderEvent::CannotRelateDimension {
            variable: "sst".into(),
            dimension: "depth".into(),
        });
        let events = collector.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].variable(), "sst");
        assert_eq!(events[0].level(), EventLevel::Warning);
    }

    #[test]
    fn test_span_event_is_informational() {
        let event = DecoderEvent::GridSpanTooWide {
            variable: "lon".into(),
            span: 178.0,
            projection: "UTM zone 31N".into(),
        };
        assert_eq!(event.level(), EventLevel::Info);
        assert!(event.to_string().contains("178.0°"));
    }
}
