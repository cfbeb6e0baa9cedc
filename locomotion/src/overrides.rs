/*!
Shape-override protocol for the shared kinematic collider.

Several subsystems want to retune the collider while they own a session (a
slide drops the step height so the capsule hugs ramps; it zeroes the minimum
move distance so slow scrubbing still moves). The collider is shared state, so
overrides go through a ledger keyed by requester identity: the first request
records the original value, repeated requests from the same requester are
idempotent, and release restores the original exactly once. `release_all` is
the forced-cleanup path; after it runs, no override from that requester can
linger.
*/

/// Overridable collider movement parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeParam {
    /// Maximum ledge height the controller steps over (meters).
    StepHeight,
    /// Motion shorter than this per tick is dropped (meters).
    MinMoveDistance,
}

/// Identity of an override requester.
pub type RequesterId = u32;

/// The live, overridable parameter set of the shared collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShapeParams {
    pub step_height: f32,
    pub min_move_distance: f32,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            step_height: 0.35,
            min_move_distance: 1.0e-3,
        }
    }
}

impl ShapeParams {
    #[inline]
    fn get(&self, param: ShapeParam) -> f32 {
        match param {
            ShapeParam::StepHeight => self.step_height,
            ShapeParam::MinMoveDistance => self.min_move_distance,
        }
    }

    #[inline]
    fn set(&mut self, param: ShapeParam, value: f32) {
        match param {
            ShapeParam::StepHeight => self.step_height = value,
            ShapeParam::MinMoveDistance => self.min_move_distance = value,
        }
    }
}

/// Requester-keyed override ledger with guaranteed restoration.
#[derive(Clone, Debug, Default)]
pub struct OverrideLedger {
    // (requester, param) -> value before the first override. The set stays
    // tiny (a handful of entries), so a Vec beats a map.
    originals: Vec<(RequesterId, ShapeParam, f32)>,
}

impl OverrideLedger {
    /// Apply an override. The original value is recorded on the first request
    /// from this requester; repeats just update the live value.
    pub fn request(
        &mut self,
        params: &mut ShapeParams,
        requester: RequesterId,
        param: ShapeParam,
        value: f32,
    ) {
        if !self
            .originals
            .iter()
            .any(|&(r, p, _)| r == requester && p == param)
        {
            self.originals.push((requester, param, params.get(param)));
        }
        params.set(param, value);
    }

    /// Release one override, restoring the recorded original. When a later
    /// override of the same parameter is still outstanding, the original is
    /// handed down to that entry instead of clobbering the live value, so
    /// releases out of acquisition order cannot resurrect a stale
    /// intermediate. Releasing an override that was never requested is a
    /// no-op.
    pub fn release(&mut self, params: &mut ShapeParams, requester: RequesterId, param: ShapeParam) {
        if let Some(idx) = self
            .originals
            .iter()
            .position(|&(r, p, _)| r == requester && p == param)
        {
            let (_, _, original) = self.originals.remove(idx);
            match self.originals[idx..].iter_mut().find(|e| e.1 == param) {
                Some(later) => later.2 = original,
                None => params.set(param, original),
            }
        }
    }

    /// Release everything held by `requester`. Used on session end and on
    /// forced termination.
    pub fn release_all(&mut self, params: &mut ShapeParams, requester: RequesterId) {
        while let Some(&(_, param, _)) =
            self.originals.iter().find(|&&(r, _, _)| r == requester)
        {
            self.release(params, requester, param);
        }
    }

    /// True when no override is outstanding.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_request_single_release_restores_original() {
        let mut params = ShapeParams::default();
        let original = params.step_height;
        let mut ledger = OverrideLedger::default();

        ledger.request(&mut params, 7, ShapeParam::StepHeight, 0.05);
        ledger.request(&mut params, 7, ShapeParam::StepHeight, 0.02);
        assert_eq!(params.step_height, 0.02);

        ledger.release(&mut params, 7, ShapeParam::StepHeight);
        assert_eq!(params.step_height, original);
        assert!(ledger.is_empty());

        // A second release must not disturb anything.
        ledger.release(&mut params, 7, ShapeParam::StepHeight);
        assert_eq!(params.step_height, original);
    }

    #[test]
    fn release_all_unwinds_every_param_for_requester() {
        let mut params = ShapeParams::default();
        let baseline = params;
        let mut ledger = OverrideLedger::default();

        ledger.request(&mut params, 1, ShapeParam::StepHeight, 0.05);
        ledger.request(&mut params, 1, ShapeParam::MinMoveDistance, 0.0);
        ledger.request(&mut params, 2, ShapeParam::StepHeight, 0.5);

        // Overrides stack per requester; unwind in reverse acquisition order.
        ledger.release_all(&mut params, 2);
        assert_eq!(params.step_height, 0.05);
        assert!(!ledger.is_empty());

        ledger.release_all(&mut params, 1);
        assert_eq!(params, baseline);
        assert!(ledger.is_empty());
    }

    #[test]
    fn out_of_order_release_hands_original_down() {
        let mut params = ShapeParams::default();
        let baseline = params.step_height;
        let mut ledger = OverrideLedger::default();

        ledger.request(&mut params, 1, ShapeParam::StepHeight, 0.05);
        ledger.request(&mut params, 2, ShapeParam::StepHeight, 0.5);

        // The first requester leaves before the second; the second's override
        // must stay live, not get clobbered back to the baseline.
        ledger.release(&mut params, 1, ShapeParam::StepHeight);
        assert_eq!(params.step_height, 0.5);

        // And when the second releases, it restores the true baseline, not
        // the first requester's intermediate value.
        ledger.release(&mut params, 2, ShapeParam::StepHeight);
        assert_eq!(params.step_height, baseline);
        assert!(ledger.is_empty());
    }
}
