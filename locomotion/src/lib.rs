pub mod body;
pub mod collision;
pub mod controller;
pub mod dive;
pub mod events;
pub mod ground;
pub mod input;
pub mod momentum;
pub mod overrides;
pub mod slam;
pub mod slide;
pub mod spring;
pub mod utils;

pub use body::{BodyTuning, KinematicBody, VelocityOverride};
pub use collision::{
    CapsuleSpec, PhysicsQuery, QueryFilter, RayHit, ResolverTuning, SlideResolution, StaticBody,
    StaticShape, StaticWorld, SweepHit, Vec3, resolve_slide,
};
pub use controller::{ControllerTuning, LocomotionController, LocomotionState};
pub use dive::{DivePhase, DiveSession, DiveTuning};
pub use events::{EventSink, LocomotionEvent, NullSink, RecordingSink, SlideEndReason};
pub use ground::{GroundHit, GroundProbeTuning, probe_ground};
pub use input::{ButtonFrame, InputFrame, InputTracker, OrientationFrame};
pub use momentum::PendingMomentum;
pub use overrides::{OverrideLedger, RequesterId, ShapeParam, ShapeParams};
pub use slam::{Slam, SlamTuning};
pub use slide::{SlideSession, SlideTick, SlideTuning};
pub use spring::DampedSpring;
