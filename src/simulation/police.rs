use super::GameEconomy;
use crate::config::GameplayParams;
use rand::Rng;
use rand_distr::{Bernoulli, BernoulliError, Distribution};

#[derive(Debug, Clone, PartialEq)]
pub struct PoliceEncounter {
    pub reason: String,
    pub fine: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoliceDecision {
    Pay,
    Deny,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoliceOutcome {
    BribePaid { amount: f64 },
    LetGo,
    Detained { penalty: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncounterResolution {
    pub encounter: PoliceEncounter,
    pub decision: PoliceDecision,
    /// Set when `Pay` could not cover the fine and fell through to `Deny`.
    pub insufficient_funds: bool,
    pub outcome: PoliceOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EncounterState {
    Clear,
    Pending(PoliceEncounter),
    /// Decision taken; driving stays frozen until `release_at`.
    Resolving {
        resolution: EncounterResolution,
        release_at: f64,
    },
}

/// Police encounter sub-machine: Clear → Pending → Resolving → Clear.
pub struct PoliceCheckpoint {
    state: EncounterState,
    let_go: Bernoulli,
    detention_multiplier: f64,
    resolution_delay: f64,
    detention_delay: f64,
    base_fine: u32,
    fine_spread: u32,
}

impl PoliceCheckpoint {
    pub fn new(params: &GameplayParams) -> Result<Self, BernoulliError> {
        Ok(Self {
            state: EncounterState::Clear,
            let_go: Bernoulli::new(params.let_go_probability)?,
            detention_multiplier: params.detention_multiplier,
            resolution_delay: params.resolution_delay as f64,
            detention_delay: params.detention_delay as f64,
            base_fine: params.base_fine,
            fine_spread: params.fine_spread,
        })
    }

    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    /// Pending and resolving encounters both hold the modal open.
    pub fn is_modal_open(&self) -> bool {
        !matches!(self.state, EncounterState::Clear)
    }

    pub fn pending(&self) -> Option<&PoliceEncounter> {
        match &self.state {
            EncounterState::Pending(encounter) => Some(encounter),
            _ => None,
        }
    }

    pub fn draw_fine<R: Rng>(&self, rng: &mut R) -> u32 {
        if self.fine_spread == 0 {
            self.base_fine
        } else {
            self.base_fine + rng.gen_range(0..self.fine_spread)
        }
    }

    /// Open an encounter. Refused while another one is in progress.
    pub fn open(&mut self, encounter: PoliceEncounter) -> bool {
        if self.is_modal_open() {
            return false;
        }

        log::info!("Police encounter: {} (fine KSh {})", encounter.reason, encounter.fine);
        self.state = EncounterState::Pending(encounter);
        true
    }

    /// Apply the player's decision to the pending encounter. Returns `None`
    /// when nothing is pending, so each encounter resolves exactly once.
    pub fn resolve<R: Rng>(
        &mut self,
        decision: PoliceDecision,
        economy: &mut GameEconomy,
        now: f64,
        rng: &mut R,
    ) -> Option<EncounterResolution> {
        let encounter = match &self.state {
            EncounterState::Pending(encounter) => encounter.clone(),
            _ => return None,
        };

        let fine = encounter.fine as f64;
        let mut insufficient_funds = false;

        let outcome = match decision {
            PoliceDecision::Pay if economy.try_debit(fine) => {
                PoliceOutcome::BribePaid { amount: fine }
            }
            PoliceDecision::Pay => {
                log::warn!(
                    "Not enough cash for a KSh {} bribe (have {:.0})",
                    encounter.fine,
                    economy.cash()
                );
                insufficient_funds = true;
                self.deny(fine, economy, rng)
            }
            PoliceDecision::Deny => self.deny(fine, economy, rng),
        };

        let delay = match outcome {
            PoliceOutcome::Detained { .. } => self.detention_delay,
            _ => self.resolution_delay,
        };

        let resolution = EncounterResolution {
            encounter,
            decision,
            insufficient_funds,
            outcome,
        };

        log::info!("Encounter resolved: {:?}", resolution.outcome);
        self.state = EncounterState::Resolving {
            resolution: resolution.clone(),
            release_at: now + delay,
        };

        Some(resolution)
    }

    fn deny<R: Rng>(&self, fine: f64, economy: &mut GameEconomy, rng: &mut R) -> PoliceOutcome {
        if self.let_go.sample(rng) {
            PoliceOutcome::LetGo
        } else {
            let penalty = economy.debit_clamped(fine * self.detention_multiplier);
            PoliceOutcome::Detained { penalty }
        }
    }

    /// Release the modal once the resolution deadline has passed. Returns
    /// true on the tick that clears it.
    pub fn tick(&mut self, now: f64) -> bool {
        match &self.state {
            EncounterState::Resolving { release_at, .. } if now >= *release_at => {
                self.state = EncounterState::Clear;
                true
            }
            _ => false,
        }
    }
}
