//! Tournament data models.

use super::errors::{TournamentError, TournamentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament status, driven by staff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    /// Scheduled, not started
    Pending,
    /// Cards in the air
    Active,
    /// Finished
    Completed,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Pending => "pending",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TournamentStatus {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TournamentStatus::Pending),
            "active" => Ok(TournamentStatus::Active),
            "completed" => Ok(TournamentStatus::Completed),
            other => Err(TournamentError::InvalidInput(format!(
                "unknown tournament status '{other}'"
            ))),
        }
    }
}

/// One level of the blind structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindLevel {
    /// Level number (1-indexed)
    pub level: u32,
    /// Small blind amount
    pub small_blind: i64,
    /// Big blind amount
    pub big_blind: i64,
    /// Duration of this level in minutes
    pub duration_minutes: u32,
}

impl BlindLevel {
    /// Create a new blind level
    pub fn new(level: u32, small_blind: i64, big_blind: i64, duration_minutes: u32) -> Self {
        Self {
            level,
            small_blind,
            big_blind,
            duration_minutes,
        }
    }
}

/// Chips granted on top of a bonus when bought at add-on time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusAddon {
    pub stack: i64,
    pub price: i64,
}

/// Named chip grant tied to an eligibility condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonus {
    pub name: String,
    /// Chips granted
    pub stack: i64,
    pub price: i64,
    /// Free-text eligibility rule shown to staff (e.g. "arrive before 19:00")
    pub condition: String,
    #[serde(default)]
    pub addon: Option<BonusAddon>,
}

/// One-time add-on purchase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonConfig {
    pub allowed: bool,
    pub stack: i64,
    pub price: i64,
}

/// Chips and price of one rebuy tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuyTier {
    pub stack: i64,
    pub price: i64,
}

/// Rebuy tier selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuyKind {
    Single,
    Double,
}

impl std::fmt::Display for RebuyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RebuyKind::Single => write!(f, "single"),
            RebuyKind::Double => write!(f, "double"),
        }
    }
}

/// Rebuy rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuyConfig {
    pub allowed: bool,
    pub single: RebuyTier,
    pub double: RebuyTier,
}

impl RebuyConfig {
    /// Tier for the given rebuy kind
    pub fn tier(&self, kind: RebuyKind) -> &RebuyTier {
        match kind {
            RebuyKind::Single => &self.single,
            RebuyKind::Double => &self.double,
        }
    }
}

/// Tournament configuration, as submitted by staff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Tournament name
    pub name: String,
    /// Scheduled start time
    pub start_time: DateTime<Utc>,
    /// Starting chip stack for each player
    pub starting_stack: i64,
    /// Blind level structure
    pub blind_structure: Vec<BlindLevel>,
    /// Buy-in amount
    pub buy_in: i64,
    #[serde(default)]
    pub bonuses: Vec<Bonus>,
    #[serde(default)]
    pub addon: AddonConfig,
    #[serde(default)]
    pub rebuy: RebuyConfig,
}

impl TournamentConfig {
    /// Create a configuration with the house blind structure and no optional features
    pub fn new(name: String, start_time: DateTime<Utc>, starting_stack: i64, buy_in: i64) -> Self {
        // Blinds roughly double every two levels
        let blind_structure = vec![
            BlindLevel::new(1, 25, 50, 20),
            BlindLevel::new(2, 50, 100, 20),
            BlindLevel::new(3, 75, 150, 20),
            BlindLevel::new(4, 100, 200, 20),
            BlindLevel::new(5, 150, 300, 20),
            BlindLevel::new(6, 200, 400, 20),
            BlindLevel::new(7, 300, 600, 20),
            BlindLevel::new(8, 400, 800, 20),
            BlindLevel::new(9, 600, 1200, 20),
            BlindLevel::new(10, 800, 1600, 20),
        ];

        Self {
            name,
            start_time,
            starting_stack,
            blind_structure,
            buy_in,
            bonuses: Vec::new(),
            addon: AddonConfig::default(),
            rebuy: RebuyConfig::default(),
        }
    }

    /// Enable rebuys with the given single and double tiers
    pub fn with_rebuys(mut self, single: RebuyTier, double: RebuyTier) -> Self {
        self.rebuy = RebuyConfig {
            allowed: true,
            single,
            double,
        };
        self
    }

    /// Enable the add-on
    pub fn with_addon(mut self, stack: i64, price: i64) -> Self {
        self.addon = AddonConfig {
            allowed: true,
            stack,
            price,
        };
        self
    }

    /// Add a bonus
    pub fn with_bonus(mut self, bonus: Bonus) -> Self {
        self.bonuses.push(bonus);
        self
    }

    /// Get blind level by number
    pub fn get_blind_level(&self, level: u32) -> Option<&BlindLevel> {
        self.blind_structure.iter().find(|bl| bl.level == level)
    }

    /// Look up a bonus by name
    pub fn bonus(&self, name: &str) -> Option<&Bonus> {
        self.bonuses.iter().find(|b| b.name == name)
    }

    /// Check the configuration before it reaches the core
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidBlindStructure` - Levels not 1..n, or small blind above big blind
    /// * `TournamentError::InvalidInput` - Blank name, non-positive stack, negative prices, bad bonuses
    pub fn validate(&self) -> TournamentResult<()> {
        if self.name.trim().is_empty() {
            return Err(TournamentError::InvalidInput(
                "tournament name must not be blank".to_string(),
            ));
        }

        if self.starting_stack <= 0 {
            return Err(TournamentError::InvalidInput(
                "starting stack must be positive".to_string(),
            ));
        }

        if self.buy_in < 0 {
            return Err(TournamentError::InvalidInput(
                "buy-in must not be negative".to_string(),
            ));
        }

        self.validate_blind_structure()?;

        let mut names = HashSet::new();
        for bonus in &self.bonuses {
            if bonus.name.trim().is_empty() {
                return Err(TournamentError::InvalidInput(
                    "bonus name must not be blank".to_string(),
                ));
            }
            if !names.insert(bonus.name.as_str()) {
                return Err(TournamentError::InvalidInput(format!(
                    "duplicate bonus '{}'",
                    bonus.name
                )));
            }
            if bonus.stack <= 0 || bonus.price < 0 {
                return Err(TournamentError::InvalidInput(format!(
                    "bonus '{}' needs a positive stack and a non-negative price",
                    bonus.name
                )));
            }
            if let Some(addon) = &bonus.addon {
                if addon.stack <= 0 || addon.price < 0 {
                    return Err(TournamentError::InvalidInput(format!(
                        "add-on of bonus '{}' needs a positive stack and a non-negative price",
                        bonus.name
                    )));
                }
            }
        }

        if self.addon.allowed && (self.addon.stack <= 0 || self.addon.price < 0) {
            return Err(TournamentError::InvalidInput(
                "add-on needs a positive stack and a non-negative price".to_string(),
            ));
        }

        if self.rebuy.allowed {
            for (kind, tier) in [
                (RebuyKind::Single, &self.rebuy.single),
                (RebuyKind::Double, &self.rebuy.double),
            ] {
                if tier.stack <= 0 || tier.price < 0 {
                    return Err(TournamentError::InvalidInput(format!(
                        "{kind} rebuy needs a positive stack and a non-negative price"
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_blind_structure(&self) -> TournamentResult<()> {
        if self.blind_structure.is_empty() {
            return Err(TournamentError::InvalidBlindStructure(
                "at least one level is required".to_string(),
            ));
        }

        for (idx, level) in self.blind_structure.iter().enumerate() {
            let expected = idx as u32 + 1;
            if level.level != expected {
                return Err(TournamentError::InvalidBlindStructure(format!(
                    "expected level {expected}, found level {}",
                    level.level
                )));
            }
            if level.small_blind <= 0 || level.duration_minutes == 0 {
                return Err(TournamentError::InvalidBlindStructure(format!(
                    "level {} needs positive blinds and duration",
                    level.level
                )));
            }
            if level.small_blind > level.big_blind {
                return Err(TournamentError::InvalidBlindStructure(format!(
                    "level {}: small blind {} exceeds big blind {}",
                    level.level, level.small_blind, level.big_blind
                )));
            }
        }

        Ok(())
    }
}

/// Stored tournament
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    /// Tournament ID
    pub id: TournamentId,
    /// Tournament configuration
    #[serde(flatten)]
    pub config: TournamentConfig,
    /// Current status
    pub status: TournamentStatus,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// Look up a bonus by name
    pub fn bonus(&self, name: &str) -> Option<&Bonus> {
        self.config.bonus(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TournamentConfig {
        TournamentConfig::new("Friday Deepstack".to_string(), Utc::now(), 10_000, 50)
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = config();
        assert!(config.validate().is_ok());
        assert_eq!(config.blind_structure.len(), 10);
        assert!(!config.rebuy.allowed);
        assert!(!config.addon.allowed);
    }

    #[test]
    fn test_get_blind_level() {
        let config = config();
        let level_1 = config.get_blind_level(1).unwrap();
        assert_eq!(level_1.small_blind, 25);
        assert_eq!(level_1.big_blind, 50);
        assert!(config.get_blind_level(99).is_none());
    }

    #[test]
    fn test_blind_levels_must_start_at_one() {
        let mut config = config();
        config.blind_structure.remove(0);
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidBlindStructure(_))
        ));
    }

    #[test]
    fn test_blind_levels_must_not_skip() {
        let mut config = config();
        config.blind_structure[3].level = 7;
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidBlindStructure(_))
        ));
    }

    #[test]
    fn test_small_blind_above_big_blind_rejected() {
        let mut config = config();
        config.blind_structure[0] = BlindLevel::new(1, 100, 50, 20);
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidBlindStructure(_))
        ));
    }

    #[test]
    fn test_empty_blind_structure_rejected() {
        let mut config = config();
        config.blind_structure.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_starting_stack_rejected() {
        let mut config = config();
        config.starting_stack = 0;
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_bonus_names_rejected() {
        let bonus = Bonus {
            name: "Early Bird".to_string(),
            stack: 2_000,
            price: 0,
            condition: "seated before start".to_string(),
            addon: None,
        };
        let config = config().with_bonus(bonus.clone()).with_bonus(bonus);
        assert!(matches!(
            config.validate(),
            Err(TournamentError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_enabled_rebuy_requires_stacks() {
        let config = config().with_rebuys(
            RebuyTier {
                stack: 10_000,
                price: 50,
            },
            RebuyTier { stack: 0, price: 90 },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rebuy_tier_lookup() {
        let config = config().with_rebuys(
            RebuyTier {
                stack: 10_000,
                price: 50,
            },
            RebuyTier {
                stack: 20_000,
                price: 90,
            },
        );
        assert_eq!(config.rebuy.tier(RebuyKind::Single).stack, 10_000);
        assert_eq!(config.rebuy.tier(RebuyKind::Double).price, 90);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            TournamentStatus::Pending,
            TournamentStatus::Active,
            TournamentStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<TournamentStatus>().unwrap(), status);
        }
        assert!("running".parse::<TournamentStatus>().is_err());
    }

    #[test]
    fn test_config_json_defaults_optional_features() {
        let json = serde_json::json!({
            "name": "Sunday",
            "start_time": "2026-10-18T18:00:00Z",
            "starting_stack": 20000,
            "blind_structure": [
                {"level": 1, "small_blind": 100, "big_blind": 200, "duration_minutes": 30}
            ],
            "buy_in": 100
        });
        let config: TournamentConfig = serde_json::from_value(json).unwrap();
        assert!(config.bonuses.is_empty());
        assert!(!config.addon.allowed);
        assert!(!config.rebuy.allowed);
        assert!(config.validate().is_ok());
    }
}
