//! Rising-edge detection with hysteresis for triggers and momentary buttons.

/// Default low threshold (volts). Input must fall below this to re-arm.
pub const TRIGGER_LOW_V: f32 = 0.1;
/// Default high threshold (volts). Crossing it from low fires an edge.
pub const TRIGGER_HIGH_V: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchmittState {
    Uninitialized,
    Low,
    High,
}

#[derive(Debug, Clone, Copy)]
pub struct SchmittTrigger {
    state: SchmittState,
    low_threshold: f32,
    high_threshold: f32,
}

impl SchmittTrigger {
    pub fn new(low_threshold: f32, high_threshold: f32) -> Self {
        Self {
            state: SchmittState::Uninitialized,
            low_threshold,
            high_threshold,
        }
    }

    /// Process one sample. Returns true only on a low-to-high transition.
    ///
    /// The first sample only initializes the state, so an input that is
    /// already high at startup does not count as an edge.
    #[inline]
    pub fn process(&mut self, input: f32) -> bool {
        match self.state {
            SchmittState::Uninitialized => {
                self.state = if input >= self.high_threshold {
                    SchmittState::High
                } else {
                    SchmittState::Low
                };
            }
            SchmittState::High => {
                if input <= self.low_threshold {
                    self.state = SchmittState::Low;
                }
            }
            SchmittState::Low => {
                if input >= self.high_threshold {
                    self.state = SchmittState::High;
                    return true;
                }
            }
        }

        false
    }

    pub fn is_high(&self) -> bool {
        self.state == SchmittState::High
    }

    pub fn reset(&mut self) {
        self.state = SchmittState::Uninitialized;
    }
}

impl Default for SchmittTrigger {
    fn default() -> Self {
        Self::new(TRIGGER_LOW_V, TRIGGER_HIGH_V)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_rising_edge() {
        let mut trig = SchmittTrigger::default();
        let input = [0.0, 0.0, 5.0, 5.0, 5.0, 0.0, 5.0];
        let edges: Vec<bool> = input.iter().map(|&v| trig.process(v)).collect();
        assert_eq!(edges, [false, false, true, false, false, false, true]);
    }

    #[test]
    fn hysteresis_ignores_chatter() {
        let mut trig = SchmittTrigger::default();
        trig.process(0.0);
        assert!(trig.process(2.0));
        // Dips that stay above the low threshold do not re-arm.
        assert!(!trig.process(0.5));
        assert!(!trig.process(2.0));
        assert!(!trig.process(0.05));
        assert!(trig.process(2.0));
    }

    #[test]
    fn high_at_startup_is_not_an_edge() {
        let mut trig = SchmittTrigger::default();
        assert!(!trig.process(10.0));
        assert!(trig.is_high());
    }
}
