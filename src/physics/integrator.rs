//! Classical 4th-order Runge-Kutta integration over a fixed set of state slots.
//!
//! The integrator is agnostic to physical meaning: a slot can hold
//! position/velocity/acceleration, or rotation and angular velocity riding
//! in the x components, or anything else. Semantics come entirely from the
//! [`Derivatives`] implementation driving the step.

use crate::math::Vec2;

use itertools::izip;

/// Number of derivative orders carried per state slot.
pub const ORDER_COUNT: usize = 3;

/// One integrated quantity and its stored derivatives.
///
/// `orders[0]` is the value itself, `orders[1]` its first and `orders[2]`
/// its second derivative. The same aggregate also serves as the per-slot
/// derivative bundle inside the solver: `orders[n]` then holds the
/// derivative that advances order `n`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateSlot {
    pub orders: [Vec2; ORDER_COUNT],
}

impl StateSlot {
    /// A slot holding a vector quantity and its rate of change.
    pub fn linear(value: Vec2, derivative: Vec2) -> Self {
        StateSlot {
            orders: [value, derivative, Vec2::zero()],
        }
    }

    /// A slot holding a scalar quantity and its rate of change,
    /// carried in the x components.
    pub fn scalar(value: f64, derivative: f64) -> Self {
        StateSlot {
            orders: [
                Vec2::new(value, 0.0),
                Vec2::new(derivative, 0.0),
                Vec2::zero(),
            ],
        }
    }
}

/// Supplies the derivative of each stored order for every slot.
///
/// Orders without an override integrate with a zero derivative, so unused
/// orders are inert rather than undefined. Methods take `&mut self` because
/// a source may flip its own state mid-step (spring joints break inside a
/// derivative evaluation).
pub trait Derivatives<const N: usize> {
    /// Derivative of each slot's value.
    fn order0(&mut self, _slots: &[StateSlot; N], _t: f64) -> [Vec2; N] {
        [Vec2::zero(); N]
    }

    /// Derivative of each slot's first derivative.
    fn order1(&mut self, _slots: &[StateSlot; N], _t: f64) -> [Vec2; N] {
        [Vec2::zero(); N]
    }

    /// Derivative of each slot's second derivative.
    fn order2(&mut self, _slots: &[StateSlot; N], _t: f64) -> [Vec2; N] {
        [Vec2::zero(); N]
    }
}

/// A single RK4 integrator with its own monotone clock.
///
/// Create one per integrated object and feed it every simulation step;
/// the clock advances by `dt` on every [`integrate`][Self::integrate] call
/// and is never shared between instances.
#[derive(Clone, Copy, Debug, Default)]
pub struct Rk4<const N: usize> {
    t: f64,
}

impl<const N: usize> Rk4<N> {
    pub fn new() -> Self {
        Rk4 { t: 0.0 }
    }

    /// Time accumulated over every step taken so far.
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Advance every slot by `dt`.
    ///
    /// Derivative estimates are sampled at `t` from the current state, twice
    /// at `t + dt/2` from states advanced along the previous estimate, and at
    /// `t + dt` from the third; the estimates combine to
    /// `(k1 + 2k2 + 2k3 + k4) / 6 · dt` applied to every stored order.
    pub fn integrate(
        &mut self,
        slots: &mut [StateSlot; N],
        source: &mut impl Derivatives<N>,
        dt: f64,
    ) {
        let at_rest = [StateSlot::default(); N];
        let k1 = evaluate(slots, self.t, 0.0, &at_rest, source);
        let k2 = evaluate(slots, self.t + dt * 0.5, dt * 0.5, &k1, source);
        let k3 = evaluate(slots, self.t + dt * 0.5, dt * 0.5, &k2, source);
        let k4 = evaluate(slots, self.t + dt, dt, &k3, source);

        for (slot, a, b, c, d) in izip!(slots.iter_mut(), &k1, &k2, &k3, &k4) {
            for order in 0..ORDER_COUNT {
                let combined =
                    (a.orders[order] + (b.orders[order] + c.orders[order]) * 2.0 + d.orders[order])
                        / 6.0;
                slot.orders[order] += combined * dt;
            }
        }
        self.t += dt;
    }
}

/// Sample the derivative source at `sample_t`, from a copy of the slots
/// advanced by `advance_dt` along a previous derivative estimate.
fn evaluate<const N: usize>(
    slots: &[StateSlot; N],
    sample_t: f64,
    advance_dt: f64,
    estimate: &[StateSlot; N],
    source: &mut impl Derivatives<N>,
) -> [StateSlot; N] {
    let mut advanced = *slots;
    for (slot, est) in izip!(&mut advanced, estimate) {
        for (value, derivative) in izip!(&mut slot.orders, &est.orders) {
            *value += *derivative * advance_dt;
        }
    }

    let order0 = source.order0(&advanced, sample_t);
    let order1 = source.order1(&advanced, sample_t);
    let order2 = source.order2(&advanced, sample_t);

    let mut out = [StateSlot::default(); N];
    for (slot, o0, o1, o2) in izip!(&mut out, order0, order1, order2) {
        slot.orders = [o0, o1, o2];
    }
    out
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    /// position <- velocity, velocity <- a constant pull.
    struct ConstantAccel(Vec2);

    impl Derivatives<1> for ConstantAccel {
        fn order0(&mut self, slots: &[StateSlot; 1], _t: f64) -> [Vec2; 1] {
            [slots[0].orders[1]]
        }

        fn order1(&mut self, _slots: &[StateSlot; 1], _t: f64) -> [Vec2; 1] {
            [self.0]
        }
    }

    #[test]
    fn matches_closed_form_under_constant_acceleration() {
        let x0 = Vec2::new(2.0, -1.0);
        let v0 = Vec2::new(3.0, 5.0);
        let a = Vec2::new(0.0, 400.0);

        for dt in [0.001, 0.01, 0.1, 0.5, 1.0] {
            let mut integrator = Rk4::new();
            let mut slots = [StateSlot::linear(x0, v0)];
            let mut source = ConstantAccel(a);

            let steps = (10.0 / dt) as usize;
            for _ in 0..steps {
                integrator.integrate(&mut slots, &mut source, dt);
            }

            let t = steps as f64 * dt;
            let expected = x0 + v0 * t + a * (0.5 * t * t);
            let error = (slots[0].orders[0] - expected).mag();
            assert!(
                error < 1e-6 * expected.mag().max(1.0),
                "dt {dt}: error {error}"
            );
            assert!((integrator.time() - t).abs() < 1e-9);
        }
    }

    /// A source with no overrides leaves every order untouched.
    struct Inert;
    impl Derivatives<3> for Inert {}

    #[test]
    fn default_derivatives_are_inert() {
        let mut integrator = Rk4::new();
        let mut slots = [
            StateSlot::linear(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)),
            StateSlot::scalar(0.5, -0.25),
            StateSlot::default(),
        ];
        let before = slots;
        let mut source = Inert;

        integrator.integrate(&mut slots, &mut source, 0.1);

        for (slot, orig) in slots.iter().zip(&before) {
            for order in 0..ORDER_COUNT {
                assert!((slot.orders[order] - orig.orders[order]).mag() == 0.0);
            }
        }
        assert!((integrator.time() - 0.1).abs() < 1e-12);
    }
}
