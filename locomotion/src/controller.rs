/*!
Locomotion state machine.

Owns the Standing/Crouching/Sliding/Diving/Prone states and supervises every
subsystem once per simulation step, in a fixed order: the jump-while-sliding
priority check first, then slam trigger/landing, dive trigger/landing, the
crouch/slide trigger with its input buffer, physics integration for whichever
session is active, and finally posture interpolation with the landing springs.

Shared collider parameters are only ever touched through the override ledger,
and `force_reset` unwinds everything synchronously: sessions, overrides,
pending momentum, velocity overrides.
*/

use crate::body::KinematicBody;
use crate::collision::{
    PhysicsQuery, ResolverTuning, Vec3, settings::GRAVITY_MPS2,
};
use crate::dive::{DivePhase, DiveSession, DiveTuning};
use crate::events::{EventSink, LocomotionEvent, SlideEndReason};
use crate::ground::{GroundHit, GroundProbeTuning, probe_ground};
use crate::input::{InputFrame, OrientationFrame};
use crate::momentum::PendingMomentum;
use crate::overrides::{OverrideLedger, RequesterId, ShapeParam};
use crate::slam::Slam;
use crate::slide::{SlideSession, SlideTuning};
use crate::spring::DampedSpring;
use crate::utils::{exp_blend, horizontal, lerp, normalize_or_zero, up};

/// Requester identity for slide-held collider overrides.
const SLIDE_REQUESTER: RequesterId = 1;

/// Exactly one is active per entity at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocomotionState {
    Standing,
    Crouching,
    Sliding,
    Diving,
    Prone,
}

/// Controller-level tunables: posture, basic movement, jumping, buffers,
/// slide collider overrides, landing springs.
#[derive(Clone, Copy, Debug)]
pub struct ControllerTuning {
    pub stand_height: f32,
    pub crouch_height: f32,
    /// Exponential rate for posture height interpolation.
    pub posture_rate: f32,

    pub run_speed: f32,
    pub sprint_speed: f32,
    pub crouch_speed: f32,
    pub ground_accel: f32,
    pub air_accel: f32,

    pub jump_speed: f32,
    /// Fraction of upward speed kept on jump release.
    pub jump_cut_factor: f32,

    /// A crouch press this long before landing still triggers a slide.
    pub crouch_buffer: f32,
    /// TTL of momentum captured on a jump-out or ground loss.
    pub momentum_resume_ttl: f32,

    /// Step height while sliding (hugs ramps instead of stepping).
    pub slide_step_height: f32,
    /// Minimum move distance while sliding (zero: slow scrubs still move).
    pub slide_min_move: f32,

    pub landing_spring_stiffness: f32,
    pub landing_spring_damping: f32,
    /// Compression impulse per m/s of landing fall speed.
    pub landing_impulse_scale: f32,
    /// Tilt impulse per m/s of landing horizontal speed.
    pub tilt_impulse_scale: f32,
}

impl Default for ControllerTuning {
    fn default() -> Self {
        Self {
            stand_height: 1.8,
            crouch_height: 0.9,
            posture_rate: 12.0,
            run_speed: 5.0,
            sprint_speed: 8.0,
            crouch_speed: 2.5,
            ground_accel: 35.0,
            air_accel: 10.0,
            jump_speed: 7.0,
            jump_cut_factor: 0.5,
            crouch_buffer: 0.2,
            momentum_resume_ttl: 0.5,
            slide_step_height: 0.05,
            slide_min_move: 0.0,
            // Over-damped: landing compression recovers without bouncing.
            landing_spring_stiffness: 90.0,
            landing_spring_damping: 21.0,
            landing_impulse_scale: 0.04,
            tilt_impulse_scale: 0.02,
        }
    }
}

/// The locomotion supervisor. One per entity, ticked once per frame.
pub struct LocomotionController {
    state: LocomotionState,
    slide: Option<SlideSession>,
    dive: Option<DiveSession>,
    slam: Slam,
    pending: PendingMomentum,
    ledger: OverrideLedger,
    landing_compression: DampedSpring,
    landing_tilt: DampedSpring,
    crouch_buffer_remaining: f32,
    dive_cooldown_remaining: f32,
    was_grounded: bool,
    tuning: ControllerTuning,
    slide_tuning: SlideTuning,
    dive_tuning: DiveTuning,
    probe_tuning: GroundProbeTuning,
    resolver_tuning: ResolverTuning,
}

impl LocomotionController {
    pub fn new(tuning: ControllerTuning) -> Self {
        Self {
            state: LocomotionState::Standing,
            slide: None,
            dive: None,
            slam: Slam::default(),
            pending: PendingMomentum::default(),
            ledger: OverrideLedger::default(),
            landing_compression: DampedSpring::new(
                tuning.landing_spring_stiffness,
                tuning.landing_spring_damping,
            ),
            landing_tilt: DampedSpring::new(
                tuning.landing_spring_stiffness,
                tuning.landing_spring_damping,
            ),
            crouch_buffer_remaining: 0.0,
            dive_cooldown_remaining: 0.0,
            was_grounded: false,
            tuning,
            slide_tuning: SlideTuning::default(),
            dive_tuning: DiveTuning::default(),
            probe_tuning: GroundProbeTuning::default(),
            resolver_tuning: ResolverTuning::default(),
        }
    }

    pub fn with_slide_tuning(mut self, tuning: SlideTuning) -> Self {
        self.slide_tuning = tuning;
        self
    }

    #[inline]
    pub fn state(&self) -> LocomotionState {
        self.state
    }

    #[inline]
    pub fn slide_speed(&self) -> Option<f32> {
        self.slide.as_ref().map(|s| s.speed())
    }

    /// Unclaimed pending momentum, if any.
    #[inline]
    pub fn pending_momentum(&self) -> Option<Vec3> {
        self.pending.peek()
    }

    /// Current landing compression offset (negative while compressed).
    #[inline]
    pub fn landing_offset(&self) -> f32 {
        self.landing_compression.offset
    }

    /// Current forward landing tilt offset.
    #[inline]
    pub fn landing_tilt(&self) -> f32 {
        self.landing_tilt.offset
    }

    /// Advance the whole locomotion core by one frame.
    pub fn tick(
        &mut self,
        dt: f32,
        input: &InputFrame,
        orientation: Option<&OrientationFrame>,
        query: &impl PhysicsQuery,
        body: &mut KinematicBody,
        events: &mut dyn EventSink,
    ) {
        if dt <= 0.0 {
            return;
        }

        let impact_velocity = body.velocity();
        let fall_speed = (-impact_velocity.y).max(0.0);
        let hit = probe_ground(
            query,
            body.position,
            body.capsule(),
            impact_velocity,
            &self.probe_tuning,
        );
        body.update_ground(hit, dt);
        // The body applies its snap-distance filter; everything below works
        // from its view of the ground.
        let hit = body.ground().copied();
        let just_landed = body.grounded() && !self.was_grounded;

        self.pending.tick(dt);
        if input.crouch.pressed {
            self.crouch_buffer_remaining = self.tuning.crouch_buffer;
        } else {
            self.crouch_buffer_remaining = (self.crouch_buffer_remaining - dt).max(0.0);
        }
        self.dive_cooldown_remaining = (self.dive_cooldown_remaining - dt).max(0.0);

        // (1) Jump-while-sliding wins over everything else.
        if self.state == LocomotionState::Sliding && input.jump.pressed {
            if let Some(session) = self.slide.take() {
                let momentum = session.capture_momentum();
                self.pending.deposit(momentum, self.tuning.momentum_resume_ttl);
                self.release_slide_overrides(body);
                events.emit(LocomotionEvent::SlideEnded {
                    reason: SlideEndReason::Jumped,
                });
                body.set_velocity(momentum + up() * self.tuning.jump_speed);
                body.update_ground(None, 0.0);
                self.state = LocomotionState::Standing;
            }
        }

        // (2) Slam: timeout, landing conversion, trigger.
        if self.slam.tick(dt) {
            body.clear_velocity_override();
        }
        if just_landed && self.slam.is_active() {
            let intent = self.slam_intent_dir(input, orientation, impact_velocity);
            body.clear_velocity_override();
            body.set_velocity(horizontal(body.velocity()));
            if let Some(boost) = self.slam.on_landing(hit.as_ref(), fall_speed, intent) {
                events.emit(LocomotionEvent::SlamLanded {
                    boost_speed: boost.norm(),
                });
                self.pending.deposit(boost, self.slam.tuning().momentum_ttl);
            }
        }
        if input.crouch.pressed
            && !body.grounded()
            && !matches!(self.state, LocomotionState::Sliding | LocomotionState::Prone)
        {
            if self.slam.try_trigger(true, body.velocity().y) {
                if self.state == LocomotionState::Diving {
                    // Slam cancels a dive, keeping its velocity. A trigger
                    // that fails (too slow a fall, cooldown) leaves the dive
                    // untouched.
                    self.dive = None;
                    self.state = LocomotionState::Standing;
                }
                body.set_velocity_override(
                    self.slam.descent_velocity(),
                    self.slam.tuning().max_duration,
                    true,
                );
                events.emit(LocomotionEvent::SlamStarted);
            }
        }

        // (3) Dive trigger and landing.
        if self.state == LocomotionState::Diving && just_landed {
            if let Some(d) = self.dive.as_mut() {
                let speed = d.land(impact_velocity);
                events.emit(LocomotionEvent::DiveLanded { speed });
                self.state = LocomotionState::Prone;
            }
        } else if self.state == LocomotionState::Standing
            && input.dive.pressed
            && input.sprint.held
            && body.grounded()
            && self.dive_cooldown_remaining <= 0.0
        {
            let facing = orientation
                .map(|o| o.flat_forward())
                .filter(|f| f.norm_squared() > 0.5)
                .unwrap_or_else(|| normalize_or_zero(horizontal(body.velocity())));
            if facing.norm_squared() > 0.5 {
                let d = DiveSession::launch(facing, body.velocity(), &self.dive_tuning);
                body.set_velocity(d.velocity());
                body.update_ground(None, 0.0);
                self.dive = Some(d);
                self.dive_cooldown_remaining = self.dive_tuning.cooldown;
                self.state = LocomotionState::Diving;
                events.emit(LocomotionEvent::DiveStarted);
            }
        }

        // (4) Crouch / slide trigger with the buffered press window.
        let crouch_intent = input.crouch.held || self.crouch_buffer_remaining > 0.0;
        if matches!(self.state, LocomotionState::Standing | LocomotionState::Crouching)
            && body.grounded()
            && crouch_intent
        {
            let speed = horizontal(body.velocity()).norm();
            let slope_deg = hit.map_or(0.0, |h| h.slope_deg);
            if self
                .slide_tuning
                .allows_start(speed, slope_deg, self.pending.is_pending())
            {
                let mut entry = body.velocity();
                if let Some(m) = self.pending.claim() {
                    if m.norm() > horizontal(entry).norm() {
                        entry = m;
                    }
                }
                self.begin_slide(entry, hit.as_ref(), body, events);
            } else if self.state == LocomotionState::Standing && input.crouch.held {
                self.state = LocomotionState::Crouching;
            }
        }
        if self.state == LocomotionState::Crouching
            && !input.crouch.held
            && self.can_stand(query, body)
        {
            self.state = LocomotionState::Standing;
        }

        // (5) Physics integration for the active session.
        match self.state {
            LocomotionState::Sliding => {
                self.tick_slide(dt, input, orientation, hit.as_ref(), body, events);
            }
            LocomotionState::Diving => {
                if let Some(d) = self.dive.as_mut() {
                    d.tick(dt, &self.dive_tuning);
                }
            }
            LocomotionState::Prone => self.tick_prone(dt, input, body),
            LocomotionState::Standing | LocomotionState::Crouching => {
                self.tick_basic_movement(dt, input, orientation, body);
            }
        }
        body.integrate(dt, query, self.probe_tuning.filter, &self.resolver_tuning);

        // (6) Posture interpolation and landing springs.
        self.tick_posture(dt, query, body);
        if just_landed {
            self.landing_compression
                .impulse(-fall_speed * self.tuning.landing_impulse_scale);
            self.landing_tilt
                .impulse(horizontal(impact_velocity).norm() * self.tuning.tilt_impulse_scale);
        }
        self.landing_compression.tick(dt);
        self.landing_tilt.tick(dt);

        self.was_grounded = body.grounded();
    }

    /// Synchronously stop every active session and unwind all shared state.
    /// The disable path: nothing may linger past this call.
    pub fn force_reset(&mut self, body: &mut KinematicBody, events: &mut dyn EventSink) {
        if self.slide.take().is_some() {
            events.emit(LocomotionEvent::SlideEnded {
                reason: SlideEndReason::Forced,
            });
        }
        self.dive = None;
        self.slam.cancel();
        self.ledger.release_all(body.shape_params_mut(), SLIDE_REQUESTER);
        self.pending.cancel();
        body.clear_velocity_override();
        self.landing_compression.reset();
        self.landing_tilt.reset();
        self.crouch_buffer_remaining = 0.0;
        self.state = LocomotionState::Standing;
    }

    fn begin_slide(
        &mut self,
        entry_velocity: Vec3,
        ground: Option<&GroundHit>,
        body: &mut KinematicBody,
        events: &mut dyn EventSink,
    ) {
        self.ledger.request(
            body.shape_params_mut(),
            SLIDE_REQUESTER,
            ShapeParam::StepHeight,
            self.tuning.slide_step_height,
        );
        self.ledger.request(
            body.shape_params_mut(),
            SLIDE_REQUESTER,
            ShapeParam::MinMoveDistance,
            self.tuning.slide_min_move,
        );
        let session = SlideSession::start(entry_velocity, ground, &self.slide_tuning);
        events.emit(LocomotionEvent::SlideStarted {
            speed: session.speed(),
        });
        self.slide = Some(session);
        self.crouch_buffer_remaining = 0.0;
        self.state = LocomotionState::Sliding;
    }

    fn end_slide(
        &mut self,
        reason: SlideEndReason,
        crouch_held: bool,
        body: &mut KinematicBody,
        events: &mut dyn EventSink,
    ) {
        self.slide = None;
        self.release_slide_overrides(body);
        events.emit(LocomotionEvent::SlideEnded { reason });
        self.state = if crouch_held && body.grounded() {
            LocomotionState::Crouching
        } else {
            LocomotionState::Standing
        };
    }

    fn release_slide_overrides(&mut self, body: &mut KinematicBody) {
        self.ledger.release_all(body.shape_params_mut(), SLIDE_REQUESTER);
    }

    fn tick_slide(
        &mut self,
        dt: f32,
        input: &InputFrame,
        orientation: Option<&OrientationFrame>,
        hit: Option<&GroundHit>,
        body: &mut KinematicBody,
        events: &mut dyn EventSink,
    ) {
        if self.slide.is_none() {
            self.state = LocomotionState::Standing;
            return;
        }

        // Voluntary exit: crouch released.
        if !input.crouch.held {
            let exit = self
                .slide
                .as_ref()
                .map(|s| s.exit_velocity(&self.slide_tuning))
                .unwrap_or_else(Vec3::zeros);
            body.set_horizontal_velocity(exit);
            self.end_slide(SlideEndReason::Exited, false, body, events);
            return;
        }

        let wish = orientation
            .map(|o| o.wish_direction(input.strafe, input.forward))
            .unwrap_or_else(Vec3::zeros);

        let (result, slide_velocity, exit_velocity) = match self.slide.as_mut() {
            Some(session) => {
                let result = session.tick(hit, wish, GRAVITY_MPS2, dt, &self.slide_tuning);
                (result, session.velocity(), session.exit_velocity(&self.slide_tuning))
            }
            None => return,
        };

        // The session owns horizontal motion; on the ground it owns the full
        // vector (tangent to the surface), airborne the body keeps vertical.
        if hit.is_some() {
            body.set_velocity(slide_velocity);
        } else {
            body.set_horizontal_velocity(slide_velocity);
        }

        if let Some(reason) = result.end {
            if let Some(momentum) = result.captured_momentum {
                self.pending.deposit(momentum, self.tuning.momentum_resume_ttl);
            } else {
                body.set_horizontal_velocity(exit_velocity);
            }
            self.end_slide(reason, input.crouch.held, body, events);
        }
    }

    fn tick_prone(&mut self, dt: f32, input: &InputFrame, body: &mut KinematicBody) {
        let Some(d) = self.dive.as_mut() else {
            self.state = LocomotionState::Standing;
            return;
        };
        debug_assert_eq!(d.phase(), DivePhase::Prone);
        let alive = d.tick(dt, &self.dive_tuning);
        body.set_horizontal_velocity(d.velocity());

        let wants_out = input.jump.pressed || input.crouch.pressed || input.has_move_intent();
        if !alive || wants_out {
            self.dive = None;
            self.state = if input.crouch.held {
                LocomotionState::Crouching
            } else {
                LocomotionState::Standing
            };
        }
    }

    fn tick_basic_movement(
        &mut self,
        dt: f32,
        input: &InputFrame,
        orientation: Option<&OrientationFrame>,
        body: &mut KinematicBody,
    ) {
        let wish = orientation
            .map(|o| o.wish_direction(input.strafe, input.forward))
            .unwrap_or_else(Vec3::zeros);
        let target_speed = if self.state == LocomotionState::Crouching {
            self.tuning.crouch_speed
        } else if input.sprint.held {
            self.tuning.sprint_speed
        } else {
            self.tuning.run_speed
        };

        let current = horizontal(body.velocity());
        if body.grounded() {
            let target = wish * target_speed;
            let delta = target - current;
            let max_step = self.tuning.ground_accel * dt;
            let step = if delta.norm() > max_step {
                normalize_or_zero(delta) * max_step
            } else {
                delta
            };
            body.set_horizontal_velocity(current + step);
        } else if wish.norm_squared() > 0.5 {
            // Air control adds along the wish but never strips momentum.
            let next = current + wish * (self.tuning.air_accel * dt);
            let cap = current.norm().max(target_speed);
            let next = if next.norm() > cap {
                normalize_or_zero(next) * cap
            } else {
                next
            };
            body.set_horizontal_velocity(next);
        }

        if input.jump.pressed
            && (body.grounded() || (body.grounded_within_coyote() && body.velocity().y <= 0.0))
        {
            let mut v = body.velocity();
            v.y = self.tuning.jump_speed;
            body.set_velocity(v);
            body.update_ground(None, 0.0);
            self.state = LocomotionState::Standing;
        }
        if input.jump.released {
            body.cut_vertical(self.tuning.jump_cut_factor);
        }
    }

    fn tick_posture(&mut self, dt: f32, query: &impl PhysicsQuery, body: &mut KinematicBody) {
        let mut target = match self.state {
            LocomotionState::Standing => self.tuning.stand_height,
            _ => self.tuning.crouch_height,
        };
        if target > body.height() && !self.can_stand(query, body) {
            target = body.height();
        }
        let blended = lerp(body.height(), target, exp_blend(self.tuning.posture_rate, dt));
        if (blended - body.height()).abs() > 1.0e-4 {
            body.set_height(blended);
        }
    }

    /// Overhead clearance check: is there room to raise the capsule to the
    /// standing height?
    fn can_stand(&self, query: &impl PhysicsQuery, body: &KinematicBody) -> bool {
        let rise = self.tuning.stand_height - body.height();
        if rise <= 1.0e-3 {
            return true;
        }
        query
            .capsule_cast(body.position, body.capsule(), up() * rise, self.probe_tuning.filter)
            .is_none()
    }

    fn slam_intent_dir(
        &self,
        input: &InputFrame,
        orientation: Option<&OrientationFrame>,
        impact_velocity: Vec3,
    ) -> Vec3 {
        if let Some(o) = orientation {
            let wish = o.wish_direction(input.strafe, input.forward);
            if wish.norm_squared() > 0.5 {
                return wish;
            }
            let fwd = o.flat_forward();
            if fwd.norm_squared() > 0.5 {
                return fwd;
            }
        }
        normalize_or_zero(horizontal(impact_velocity))
    }
}

impl Default for LocomotionController {
    fn default() -> Self {
        Self::new(ControllerTuning::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{StaticBody, StaticWorld};
    use crate::events::RecordingSink;
    use crate::input::ButtonFrame;

    const DT: f32 = 1.0 / 120.0;

    fn flat_world() -> StaticWorld {
        StaticWorld::new(vec![StaticBody::plane(Vec3::new(0.0, 1.0, 0.0), 0.0)])
    }

    fn body_on_ground() -> KinematicBody {
        KinematicBody::new(Vec3::new(0.0, 0.91, 0.0), 0.4, 1.8)
    }

    fn forward_orient() -> OrientationFrame {
        OrientationFrame::from_forward(Vec3::new(1.0, 0.0, 0.0))
    }

    fn crouch_held() -> InputFrame {
        InputFrame {
            crouch: ButtonFrame::HELD,
            ..InputFrame::default()
        }
    }

    fn settle(
        ctrl: &mut LocomotionController,
        world: &StaticWorld,
        body: &mut KinematicBody,
        ticks: usize,
    ) {
        let idle = InputFrame::default();
        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        for _ in 0..ticks {
            ctrl.tick(DT, &idle, Some(&orient), world, body, &mut sink);
        }
    }

    /// Grounded at rest, crouch pressed on flat ground: crouch, never slide.
    #[test]
    fn crouch_at_rest_does_not_slide() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        let mut sink = RecordingSink::default();
        settle(&mut ctrl, &world, &mut body, 5);

        let input = InputFrame {
            crouch: ButtonFrame::PRESSED,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &input, Some(&forward_orient()), &world, &mut body, &mut sink);

        assert_eq!(ctrl.state(), LocomotionState::Crouching);
        assert_eq!(sink.count_slide_starts(), 0);
    }

    #[test]
    fn fast_crouch_starts_slide_with_overrides() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);
        body.set_velocity(Vec3::new(10.0, 0.0, 0.0));

        let mut sink = RecordingSink::default();
        ctrl.tick(DT, &crouch_held(), Some(&forward_orient()), &world, &mut body, &mut sink);

        assert_eq!(ctrl.state(), LocomotionState::Sliding);
        assert_eq!(sink.count_slide_starts(), 1);
        // Slide holds collider overrides while active.
        assert_eq!(body.shape_params().step_height, 0.05);
        assert_eq!(body.shape_params().min_move_distance, 0.0);
    }

    #[test]
    fn slide_entry_boundary_at_min_start_speed() {
        let world = flat_world();
        let tuning = SlideTuning::default();
        let orient = forward_orient();

        for (speed, expect_slide) in [
            (tuning.min_start_speed, true),
            (tuning.min_start_speed - 1.0, false),
        ] {
            let mut ctrl = LocomotionController::default();
            let mut body = body_on_ground();
            settle(&mut ctrl, &world, &mut body, 5);
            body.set_velocity(Vec3::new(speed, 0.0, 0.0));

            let mut sink = RecordingSink::default();
            ctrl.tick(DT, &crouch_held(), Some(&orient), &world, &mut body, &mut sink);
            assert_eq!(
                ctrl.state() == LocomotionState::Sliding,
                expect_slide,
                "entry speed {speed}"
            );
        }
    }

    /// Jump during a slide: session ends this frame, its horizontal velocity
    /// is captured as pending momentum, and the entity leaves the ground.
    #[test]
    fn jump_while_sliding_captures_momentum() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);
        body.set_velocity(Vec3::new(12.0, 0.0, 0.0));

        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        ctrl.tick(DT, &crouch_held(), Some(&orient), &world, &mut body, &mut sink);
        assert_eq!(ctrl.state(), LocomotionState::Sliding);
        let slide_speed = ctrl.slide_speed().unwrap();

        let input = InputFrame {
            crouch: ButtonFrame::HELD,
            jump: ButtonFrame::PRESSED,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);

        assert_eq!(ctrl.state(), LocomotionState::Standing);
        assert!(sink.contains(&LocomotionEvent::SlideEnded {
            reason: SlideEndReason::Jumped
        }));
        let pending = ctrl.pending_momentum().expect("momentum captured");
        assert!((pending.norm() - slide_speed).abs() < 0.5);
        assert_eq!(pending.y, 0.0);
        assert!(body.velocity().y > 0.0, "airborne after the jump");
        // Overrides are gone the moment the slide ends.
        assert_eq!(*body.shape_params(), Default::default());
    }

    #[test]
    fn voluntary_exit_transfers_most_speed() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);
        body.set_velocity(Vec3::new(12.0, 0.0, 0.0));

        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        ctrl.tick(DT, &crouch_held(), Some(&orient), &world, &mut body, &mut sink);
        let speed_in_slide = ctrl.slide_speed().unwrap();

        ctrl.tick(DT, &InputFrame::default(), Some(&orient), &world, &mut body, &mut sink);
        assert_eq!(ctrl.state(), LocomotionState::Standing);
        assert!(sink.contains(&LocomotionEvent::SlideEnded {
            reason: SlideEndReason::Exited
        }));
        let out = horizontal(body.velocity()).norm();
        assert!((out - speed_in_slide * 0.85).abs() < 0.5, "out {out}");
    }

    /// Slam from altitude: on landing the pending momentum lands inside the
    /// configured boost clamps.
    #[test]
    fn slam_landing_deposits_clamped_momentum() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = KinematicBody::new(Vec3::new(0.0, 30.0, 0.0), 0.4, 1.8);
        let orient = forward_orient();
        let mut sink = RecordingSink::default();

        // Free fall until fast enough to slam.
        let idle = InputFrame::default();
        while -body.velocity().y < 9.0 {
            ctrl.tick(DT, &idle, Some(&orient), &world, &mut body, &mut sink);
        }
        let input = InputFrame {
            crouch: ButtonFrame::PRESSED,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);
        assert!(sink.contains(&LocomotionEvent::SlamStarted));
        assert!(body.has_velocity_override());

        // Ride the slam down to the ground.
        let mut guard = 0;
        while ctrl.pending_momentum().is_none() {
            ctrl.tick(DT, &idle, Some(&orient), &world, &mut body, &mut sink);
            guard += 1;
            assert!(guard < 2000, "slam never landed");
        }

        let boost = ctrl.pending_momentum().unwrap();
        let slam_tuning = crate::slam::SlamTuning::default();
        assert!(boost.norm() >= slam_tuning.min_boost);
        assert!(boost.norm() <= slam_tuning.max_boost);
        assert!(!body.has_velocity_override());
    }

    #[test]
    fn buffered_crouch_slides_on_landing() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        // Barely airborne, moving fast, about to land.
        let mut body = KinematicBody::new(Vec3::new(0.0, 1.3, 0.0), 0.4, 1.8);
        body.set_velocity(Vec3::new(10.0, -2.0, 0.0));
        let orient = forward_orient();
        let mut sink = RecordingSink::default();

        // Press shortly before touchdown, keep holding.
        let mut input = InputFrame {
            crouch: ButtonFrame::PRESSED,
            ..InputFrame::default()
        };
        let mut guard = 0;
        while ctrl.state() != LocomotionState::Sliding {
            ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);
            input.crouch = ButtonFrame::HELD;
            guard += 1;
            assert!(guard < 200, "buffered crouch never became a slide");
        }
        assert_eq!(sink.count_slide_starts(), 1);
    }

    #[test]
    fn dive_lands_prone_and_exits_on_input() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);
        body.set_velocity(Vec3::new(6.0, 0.0, 0.0));

        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        let input = InputFrame {
            dive: ButtonFrame::PRESSED,
            sprint: ButtonFrame::HELD,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);
        assert_eq!(ctrl.state(), LocomotionState::Diving);
        assert!(sink.contains(&LocomotionEvent::DiveStarted));
        assert!(body.velocity().y > 0.0);

        let idle = InputFrame::default();
        let mut guard = 0;
        while ctrl.state() == LocomotionState::Diving {
            ctrl.tick(DT, &idle, Some(&orient), &world, &mut body, &mut sink);
            guard += 1;
            assert!(guard < 2000, "dive never landed");
        }
        assert_eq!(ctrl.state(), LocomotionState::Prone);

        let moving = InputFrame {
            forward: 1.0,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &moving, Some(&orient), &world, &mut body, &mut sink);
        assert_eq!(ctrl.state(), LocomotionState::Standing);
    }

    /// Crouch during the ascending arc of a dive falls short of the slam's
    /// minimum fall speed; the rejected trigger must leave the dive running.
    #[test]
    fn rejected_slam_trigger_keeps_dive_alive() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);
        body.set_velocity(Vec3::new(6.0, 0.0, 0.0));

        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        let input = InputFrame {
            dive: ButtonFrame::PRESSED,
            sprint: ButtonFrame::HELD,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);
        assert_eq!(ctrl.state(), LocomotionState::Diving);

        // Climb clear of the ground-snap range while still on the way up.
        let idle = InputFrame::default();
        let mut guard = 0;
        while body.grounded() {
            ctrl.tick(DT, &idle, Some(&orient), &world, &mut body, &mut sink);
            guard += 1;
            assert!(guard < 200, "dive never left the ground");
        }
        assert!(body.velocity().y > 0.0, "still on the way up");

        let input = InputFrame {
            crouch: ButtonFrame::PRESSED,
            ..InputFrame::default()
        };
        ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);

        assert_eq!(ctrl.state(), LocomotionState::Diving);
        assert!(ctrl.dive.is_some(), "dive session must survive");
        assert!(!sink.contains(&LocomotionEvent::SlamStarted));
        assert!(!body.has_velocity_override());
    }

    #[test]
    fn landing_spring_compresses_and_recovers() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = KinematicBody::new(Vec3::new(0.0, 8.0, 0.0), 0.4, 1.8);
        let orient = forward_orient();
        let idle = InputFrame::default();
        let mut sink = RecordingSink::default();

        let mut max_compression: f32 = 0.0;
        for _ in 0..(4.0 / DT) as usize {
            ctrl.tick(DT, &idle, Some(&orient), &world, &mut body, &mut sink);
            max_compression = max_compression.max(-ctrl.landing_offset());
        }
        assert!(max_compression > 0.0, "landing never compressed the spring");
        assert!(ctrl.landing_offset().abs() < 1.0e-2, "spring failed to settle");
    }

    #[test]
    fn posture_lowers_when_crouched_and_restores() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);

        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        let mut input = InputFrame {
            crouch: ButtonFrame::PRESSED,
            ..InputFrame::default()
        };
        for _ in 0..120 {
            ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);
            input.crouch = ButtonFrame::HELD;
        }
        assert_eq!(ctrl.state(), LocomotionState::Crouching);
        assert!((body.height() - 0.9).abs() < 0.05);

        let idle = InputFrame::default();
        for _ in 0..120 {
            ctrl.tick(DT, &idle, Some(&orient), &world, &mut body, &mut sink);
        }
        assert_eq!(ctrl.state(), LocomotionState::Standing);
        assert!((body.height() - 1.8).abs() < 0.05);
    }

    #[test]
    fn force_reset_unwinds_everything() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        settle(&mut ctrl, &world, &mut body, 5);
        body.set_velocity(Vec3::new(12.0, 0.0, 0.0));

        let orient = forward_orient();
        let mut sink = RecordingSink::default();
        ctrl.tick(DT, &crouch_held(), Some(&orient), &world, &mut body, &mut sink);
        assert_eq!(ctrl.state(), LocomotionState::Sliding);

        ctrl.force_reset(&mut body, &mut sink);

        assert_eq!(ctrl.state(), LocomotionState::Standing);
        assert!(sink.contains(&LocomotionEvent::SlideEnded {
            reason: SlideEndReason::Forced
        }));
        assert_eq!(*body.shape_params(), Default::default());
        assert!(ctrl.pending_momentum().is_none());
        assert!(!body.has_velocity_override());
    }

    /// The state/session pairing invariant: Sliding iff a slide session
    /// exists, Diving/Prone iff a dive session exists.
    #[test]
    fn state_and_sessions_stay_paired() {
        let world = flat_world();
        let mut ctrl = LocomotionController::default();
        let mut body = body_on_ground();
        let orient = forward_orient();
        let mut sink = RecordingSink::default();

        body.set_velocity(Vec3::new(10.0, 0.0, 0.0));
        let mut input = crouch_held();
        for i in 0..600 {
            ctrl.tick(DT, &input, Some(&orient), &world, &mut body, &mut sink);
            assert_eq!(
                ctrl.state() == LocomotionState::Sliding,
                ctrl.slide.is_some(),
                "tick {i}"
            );
            assert_eq!(
                matches!(ctrl.state(), LocomotionState::Diving | LocomotionState::Prone),
                ctrl.dive.is_some(),
                "tick {i}"
            );
            if i == 300 {
                input = InputFrame::default();
            }
        }
    }
}
