use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderStatus, OrderType};

// ============================================================================
// Progress Strategies
// ============================================================================
//
// Progress is 0 at CREATED and 100 at COMPLETED. PREPARING and
// OUT_FOR_DELIVERY are ranges filled by the kitchen completion ratio and the
// share of route covered; the strategy decides how a ratio maps into them.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressBreakpoints {
    pub confirmed: u8,
    pub preparing_from: u8,
    pub preparing_to: u8,
    pub ready: u8,
    pub delivery_from: u8,
    pub delivery_to: u8,
}

impl Default for ProgressBreakpoints {
    fn default() -> Self {
        Self {
            confirmed: 10,
            preparing_from: 10,
            preparing_to: 70,
            ready: 75,
            delivery_from: 75,
            delivery_to: 99,
        }
    }
}

impl ProgressBreakpoints {
    /// Breakpoints must not decrease along the forward path and stay below 100
    pub fn is_monotonic(&self) -> bool {
        let path = [
            self.confirmed,
            self.preparing_from,
            self.preparing_to,
            self.ready,
            self.delivery_from,
            self.delivery_to,
        ];
        path.windows(2).all(|w| w[0] <= w[1]) && self.delivery_to < 100
    }
}

/// Everything a strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct ProgressInput {
    pub status: OrderStatus,
    pub order_type: OrderType,
    /// Kitchen items DONE / total, in [0, 1]
    pub kitchen_ratio: f64,
    /// Route covered, in [0, 1]
    pub delivery_ratio: f64,
}

pub trait ProgressStrategy: Send + Sync {
    fn percentage(&self, input: &ProgressInput) -> u8;
}

/// Interpolates linearly inside the PREPARING and OUT_FOR_DELIVERY ranges
#[derive(Debug, Clone, Default)]
pub struct LinearProgress {
    pub breakpoints: ProgressBreakpoints,
}

impl LinearProgress {
    pub fn new(breakpoints: ProgressBreakpoints) -> Self {
        Self { breakpoints }
    }
}

impl ProgressStrategy for LinearProgress {
    fn percentage(&self, input: &ProgressInput) -> u8 {
        let b = &self.breakpoints;
        match input.status {
            OrderStatus::Preparing => interpolate(b.preparing_from, b.preparing_to, input.kitchen_ratio),
            OrderStatus::OutForDelivery => interpolate(b.delivery_from, b.delivery_to, input.delivery_ratio),
            status => fixed(b, status),
        }
    }
}

/// Reports the lower bound of each range until the order moves on
#[derive(Debug, Clone, Default)]
pub struct SteppedProgress {
    pub breakpoints: ProgressBreakpoints,
}

impl ProgressStrategy for SteppedProgress {
    fn percentage(&self, input: &ProgressInput) -> u8 {
        let b = &self.breakpoints;
        match input.status {
            OrderStatus::Preparing => b.preparing_from,
            OrderStatus::OutForDelivery => b.delivery_from,
            status => fixed(b, status),
        }
    }
}

fn fixed(b: &ProgressBreakpoints, status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Created | OrderStatus::Cancelled => 0,
        OrderStatus::Confirmed => b.confirmed,
        OrderStatus::Preparing => b.preparing_from,
        OrderStatus::Ready => b.ready,
        OrderStatus::OutForDelivery => b.delivery_from,
        OrderStatus::Completed => 100,
    }
}

fn interpolate(from: u8, to: u8, ratio: f64) -> u8 {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let span = f64::from(to.saturating_sub(from));
    from.saturating_add((span * ratio).floor() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(status: OrderStatus, kitchen_ratio: f64, delivery_ratio: f64) -> ProgressInput {
        ProgressInput { status, order_type: OrderType::Delivery, kitchen_ratio, delivery_ratio }
    }

    #[test]
    fn test_linear_breakpoints() {
        let p = LinearProgress::default();

        assert_eq!(p.percentage(&input(OrderStatus::Created, 0.0, 0.0)), 0);
        assert_eq!(p.percentage(&input(OrderStatus::Confirmed, 0.0, 0.0)), 10);
        assert_eq!(p.percentage(&input(OrderStatus::Preparing, 0.0, 0.0)), 10);
        assert_eq!(p.percentage(&input(OrderStatus::Preparing, 0.5, 0.0)), 40);
        assert_eq!(p.percentage(&input(OrderStatus::Preparing, 1.0, 0.0)), 70);
        assert_eq!(p.percentage(&input(OrderStatus::Ready, 1.0, 0.0)), 75);
        assert_eq!(p.percentage(&input(OrderStatus::OutForDelivery, 1.0, 0.5)), 87);
        assert_eq!(p.percentage(&input(OrderStatus::OutForDelivery, 1.0, 1.0)), 99);
        assert_eq!(p.percentage(&input(OrderStatus::Completed, 1.0, 1.0)), 100);
        assert_eq!(p.percentage(&input(OrderStatus::Cancelled, 1.0, 0.3)), 0);
    }

    #[test]
    fn test_linear_never_regresses_along_forward_path() {
        let p = LinearProgress::default();
        let mut path = vec![input(OrderStatus::Created, 0.0, 0.0), input(OrderStatus::Confirmed, 0.0, 0.0)];
        path.extend((0..=4).map(|n| input(OrderStatus::Preparing, n as f64 / 4.0, 0.0)));
        path.push(input(OrderStatus::Ready, 1.0, 0.0));
        path.extend((0..=4).map(|n| input(OrderStatus::OutForDelivery, 1.0, n as f64 / 4.0)));
        path.push(input(OrderStatus::Completed, 1.0, 1.0));

        let values: Vec<u8> = path.iter().map(|i| p.percentage(i)).collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    }

    #[test]
    fn test_ratio_outside_unit_range_is_clamped() {
        let p = LinearProgress::default();
        assert_eq!(p.percentage(&input(OrderStatus::Preparing, 3.0, 0.0)), 70);
        assert_eq!(p.percentage(&input(OrderStatus::Preparing, f64::NAN, 0.0)), 10);
    }

    #[test]
    fn test_stepped_uses_lower_bounds() {
        let p = SteppedProgress::default();
        assert_eq!(p.percentage(&input(OrderStatus::Preparing, 0.9, 0.0)), 10);
        assert_eq!(p.percentage(&input(OrderStatus::OutForDelivery, 1.0, 0.9)), 75);
    }

    #[test]
    fn test_default_breakpoints_are_monotonic() {
        assert!(ProgressBreakpoints::default().is_monotonic());
        let broken = ProgressBreakpoints { ready: 5, ..Default::default() };
        assert!(!broken.is_monotonic());
    }
}
