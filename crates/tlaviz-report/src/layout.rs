//! Circular layout for state graphs.
//!
//! States are spaced evenly on a circle, starting on the positive x axis.
//! Past ten states the radius grows logarithmically so that larger graphs
//! stay readable:
//!
//! ```text
//! r(n) = base                      n <= 10
//! r(n) = base * (1 + ln(n / 10))   n > 10
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default circle radius for graphs of up to ten states.
pub const DEFAULT_BASE_RADIUS: f64 = 200.0;

/// Number of states above which the radius starts to grow.
const GROWTH_THRESHOLD: usize = 10;

/// Configuration for [`CircularLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Radius used for up to ten states.
    pub base_radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_radius: DEFAULT_BASE_RADIUS,
        }
    }
}

/// A 2-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    /// Horizontal offset from the layout centre.
    pub x: f64,
    /// Vertical offset from the layout centre.
    pub y: f64,
}

/// Deterministic circular layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularLayout {
    config: LayoutConfig,
}

impl CircularLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Circle radius used for `n` states.
    pub fn radius_for(&self, n: usize) -> f64 {
        if n > GROWTH_THRESHOLD {
            self.config.base_radius * (1.0 + (n as f64 / GROWTH_THRESHOLD as f64).ln())
        } else {
            self.config.base_radius
        }
    }

    /// One position per item, in input order.
    pub fn layout<T>(&self, items: &[T]) -> Vec<Position> {
        self.positions(items.len())
    }

    /// Positions for `n` items.
    pub fn positions(&self, n: usize) -> Vec<Position> {
        if n == 0 {
            return Vec::new();
        }

        let radius = self.radius_for(n);
        let angle_step = 2.0 * PI / n as f64;

        (0..n)
            .map(|i| {
                let angle = i as f64 * angle_step;
                Position {
                    x: radius * angle.cos(),
                    y: radius * angle.sin(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        let layout = CircularLayout::default();
        assert!(layout.positions(0).is_empty());
        assert!(layout.layout::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_single_state_on_positive_x_axis() {
        let positions = CircularLayout::default().positions(1);
        assert_eq!(positions, vec![Position { x: 200.0, y: 0.0 }]);
    }

    #[test]
    fn test_four_states_on_axes() {
        let positions = CircularLayout::default().positions(4);
        let expected = [(200.0, 0.0), (0.0, 200.0), (-200.0, 0.0), (0.0, -200.0)];
        for (p, (x, y)) in positions.iter().zip(expected) {
            assert!((p.x - x).abs() < 1e-9, "{p:?}");
            assert!((p.y - y).abs() < 1e-9, "{p:?}");
        }
    }

    #[test]
    fn test_radius_growth() {
        let layout = CircularLayout::new(LayoutConfig { base_radius: 100.0 });
        assert_eq!(layout.radius_for(10), 100.0);
        assert!((layout.radius_for(100) - 100.0 * (1.0 + 10f64.ln())).abs() < 1e-9);
        // Continuous at the threshold.
        assert!((layout.radius_for(11) - layout.radius_for(10)).abs() < 10.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Layout is a pure function of its input size
        #[test]
        fn prop_layout_idempotent(n in 0usize..500) {
            let layout = CircularLayout::default();
            prop_assert_eq!(layout.positions(n), layout.positions(n));
        }

        /// One position per input item
        #[test]
        fn prop_layout_length(items in prop::collection::vec(any::<u32>(), 0..200)) {
            let positions = CircularLayout::default().layout(&items);
            prop_assert_eq!(positions.len(), items.len());
        }

        /// Radius strictly increases past the threshold
        #[test]
        fn prop_radius_monotonic(n in 11usize..100_000) {
            let layout = CircularLayout::default();
            prop_assert!(layout.radius_for(n + 1) > layout.radius_for(n));
        }

        /// Every position lies on the circle
        #[test]
        fn prop_positions_on_circle(n in 1usize..300, base in 1.0f64..1000.0) {
            let layout = CircularLayout::new(LayoutConfig { base_radius: base });
            let radius = layout.radius_for(n);
            for p in layout.positions(n) {
                let distance = (p.x * p.x + p.y * p.y).sqrt();
                prop_assert!((distance - radius).abs() < 1e-6 * radius);
            }
        }
    }
}
