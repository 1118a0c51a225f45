use serde::{Deserialize, Serialize};

/// Stake-sizing parameters, carried in the configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MartingaleConfig {
    pub enabled: bool,
    pub multiplier: f64,
    pub max_steps: u32,
    /// Absolute ceiling no stake may exceed, whatever the step says.
    pub hard_cap: f64,
}

impl Default for MartingaleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            multiplier: 2.0,
            max_steps: 3,
            hard_cap: 25.0,
        }
    }
}

/// Stake sizing over trade outcomes.
///
/// The step persists across calls until a win or an explicit reset; each
/// losing call advances it (capped at `max_steps`) before sizing.
#[derive(Debug, Default)]
pub struct MartingaleManager {
    current_step: u32,
}

impl MartingaleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_stake(&mut self, cfg: &MartingaleConfig, base_stake: f64, won_last: bool) -> f64 {
        if !cfg.enabled {
            return base_stake;
        }
        if won_last {
            self.current_step = 0;
            return base_stake;
        }
        self.current_step = (self.current_step + 1).min(cfg.max_steps);
        (base_stake * cfg.multiplier.powi(self.current_step as i32)).min(cfg.hard_cap)
    }

    pub fn reset(&mut self) {
        self.current_step = 0;
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> MartingaleConfig {
        MartingaleConfig {
            enabled: true,
            multiplier: 2.0,
            max_steps: 3,
            hard_cap: 100.0,
        }
    }

    #[test]
    fn test_disabled_passes_base_stake_through() {
        let cfg = MartingaleConfig::default();
        let mut m = MartingaleManager::new();

        assert_eq!(m.next_stake(&cfg, 5.0, false), 5.0);
        assert_eq!(m.current_step(), 0);
    }

    #[test]
    fn test_loss_progression_and_win_reset() {
        let cfg = enabled();
        let mut m = MartingaleManager::new();

        assert_eq!(m.next_stake(&cfg, 10.0, false), 20.0);
        assert_eq!(m.next_stake(&cfg, 10.0, false), 40.0);
        assert_eq!(m.next_stake(&cfg, 10.0, true), 10.0);
        assert_eq!(m.current_step(), 0);
    }

    #[test]
    fn test_step_caps_at_max_steps() {
        let cfg = enabled();
        let mut m = MartingaleManager::new();
        for _ in 0..6 {
            m.next_stake(&cfg, 10.0, false);
        }

        assert_eq!(m.current_step(), cfg.max_steps);
        assert_eq!(m.next_stake(&cfg, 10.0, false), 80.0);
    }

    #[test]
    fn test_hard_cap_bounds_the_stake() {
        let cfg = MartingaleConfig {
            hard_cap: 25.0,
            ..enabled()
        };
        let mut m = MartingaleManager::new();

        assert_eq!(m.next_stake(&cfg, 10.0, false), 20.0);
        assert_eq!(m.next_stake(&cfg, 10.0, false), 25.0);
        assert_eq!(m.next_stake(&cfg, 10.0, false), 25.0);
    }

    #[test]
    fn test_explicit_reset() {
        let cfg = enabled();
        let mut m = MartingaleManager::new();
        m.next_stake(&cfg, 10.0, false);
        m.reset();

        assert_eq!(m.current_step(), 0);
        assert_eq!(m.next_stake(&cfg, 10.0, false), 20.0);
    }
}
