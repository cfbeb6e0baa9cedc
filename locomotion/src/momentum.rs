/*!
Pending momentum: a short-lived, ownerless velocity record handed between
subsystems across a state transition (a jump taken mid-slide, a slam landing).
Whichever subsystem next claims ownership of ground velocity consumes it; if
nothing claims it before expiry it is discarded.
*/

use crate::collision::Vec3;
use crate::utils::sanitize;

/// Single-slot deferred momentum handoff with a time-to-live.
#[derive(Clone, Copy, Debug, Default)]
pub struct PendingMomentum {
    slot: Option<(Vec3, f32)>,
}

impl PendingMomentum {
    /// Deposit a velocity with `ttl` seconds to live, replacing any previous
    /// unclaimed record.
    pub fn deposit(&mut self, vector: Vec3, ttl: f32) {
        let vector = sanitize(vector);
        if ttl <= 0.0 || vector.norm_squared() <= 1.0e-6 {
            return;
        }
        log::debug!("pending momentum deposited: {:.2} m/s", vector.norm());
        self.slot = Some((vector, ttl));
    }

    /// Advance time; expired records are dropped.
    pub fn tick(&mut self, dt: f32) {
        if let Some((_, remaining)) = &mut self.slot {
            *remaining -= dt;
            if *remaining <= 0.0 {
                log::debug!("pending momentum expired unclaimed");
                self.slot = None;
            }
        }
    }

    /// Claim and consume the record, if one is still live.
    pub fn claim(&mut self) -> Option<Vec3> {
        self.slot.take().map(|(v, _)| v)
    }

    /// Peek without consuming.
    #[inline]
    pub fn peek(&self) -> Option<Vec3> {
        self.slot.map(|(v, _)| v)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Explicit cancellation (forced reset path).
    #[inline]
    pub fn cancel(&mut self) {
        self.slot = None;
    }
}
