/*!
Notification sinks.

Fire-and-forget events consumed by animation/audio/VFX systems outside this
core. Nothing here feeds back into the simulation; a sink that drops every
event is a valid consumer.
*/

/// Why a slide session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideEndReason {
    /// Fell under the useful-speed threshold on walkable ground.
    TooSlow,
    /// Lost ground contact beyond the grace window.
    LostGround,
    /// Duration budget elapsed off-slope at low speed.
    TimedOut,
    /// Player jumped out of the slide.
    Jumped,
    /// Voluntary exit (crouch released / stand requested).
    Exited,
    /// Forced reset or component disable.
    Forced,
}

/// Locomotion notifications, in the order the core emits them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LocomotionEvent {
    SlideStarted { speed: f32 },
    SlideEnded { reason: SlideEndReason },
    DiveStarted,
    DiveLanded { speed: f32 },
    SlamStarted,
    SlamLanded { boost_speed: f32 },
}

/// Fire-and-forget event consumer. No return value is ever consumed.
pub trait EventSink {
    fn emit(&mut self, event: LocomotionEvent);
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: LocomotionEvent) {}
}

/// Records everything; used by tests and debug overlays.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<LocomotionEvent>,
}

impl RecordingSink {
    pub fn contains(&self, event: &LocomotionEvent) -> bool {
        self.events.iter().any(|e| e == event)
    }

    pub fn count_slide_starts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, LocomotionEvent::SlideStarted { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: LocomotionEvent) {
        self.events.push(event);
    }
}
