//! Configuration types for coverage search runs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Wall-clock budget for the whole run.
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Adaptive grid archive settings.
    #[serde(default)]
    pub grid: GridConfig,
    /// Target scheduling settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Search driver to use.
    #[serde(default)]
    pub strategy: SearchStrategy,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Population settings for the generational driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of candidates per generation (mutants per step when hill climbing).
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Best candidates carried over unchanged.
    #[serde(default = "default_elitism")]
    pub elitism: usize,
    /// Tournament size for parent selection.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Optional hard cap on generations.
    #[serde(default)]
    pub max_generations: Option<usize>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            elitism: default_elitism(),
            tournament_size: default_tournament_size(),
            crossover_rate: default_crossover_rate(),
            max_generations: None,
        }
    }
}

fn default_population_size() -> usize {
    50
}
fn default_elitism() -> usize {
    1
}
fn default_tournament_size() -> usize {
    5
}
fn default_crossover_rate() -> f64 {
    0.75
}

/// Global time budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Search budget in milliseconds.
    #[serde(default = "default_search_budget_ms")]
    pub search_budget_ms: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            search_budget_ms: default_search_budget_ms(),
        }
    }
}

fn default_search_budget_ms() -> u64 {
    60_000
}

/// Adaptive grid archive settings.
///
/// The same `[lower_bound, upper_bound]` interval is used for every tracked
/// objective; fitness values outside it are clamped onto the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Maximum number of archived candidates.
    #[serde(default = "default_grid_capacity")]
    pub capacity: usize,
    /// Number of bisections from the root region down to a leaf.
    #[serde(default = "default_grid_depth")]
    pub depth: usize,
    #[serde(default = "default_lower_bound")]
    pub lower_bound: f64,
    #[serde(default = "default_upper_bound")]
    pub upper_bound: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            capacity: default_grid_capacity(),
            depth: default_grid_depth(),
            lower_bound: default_lower_bound(),
            upper_bound: default_upper_bound(),
        }
    }
}

fn default_grid_capacity() -> usize {
    100
}
fn default_grid_depth() -> usize {
    5
}
fn default_lower_bound() -> f64 {
    0.0
}
fn default_upper_bound() -> f64 {
    1.0
}

/// Target scheduling settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SchedulerConfig {
    /// Where newly unlocked goals enter the worklist.
    #[serde(default)]
    pub insertion: InsertionPolicy,
}

/// Worklist insertion policy for goals unlocked by new coverage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum InsertionPolicy {
    /// Most recently unlocked goal is tried next.
    #[default]
    DepthFirst,
    /// Unlocked goals wait behind everything already queued.
    BreadthFirst,
}

/// Search driver selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type")]
pub enum SearchStrategy {
    /// Generational GA optimizing the current target.
    #[default]
    Generational,
    /// (1+1) hill climbing with grid-archive acceptance.
    HillClimb,
}

impl SearchConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let population = &self.population;
        if population.size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if population.elitism >= population.size && self.strategy == SearchStrategy::Generational {
            return Err(ConfigError::InvalidElitism {
                elitism: population.elitism,
                size: population.size,
            });
        }
        if population.tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }
        if !(0.0..=1.0).contains(&population.crossover_rate) {
            return Err(ConfigError::InvalidRate(population.crossover_rate));
        }
        if self.budget.search_budget_ms == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        if self.grid.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let (lower, upper) = (self.grid.lower_bound, self.grid.upper_bound);
        if !lower.is_finite() || !upper.is_finite() || lower >= upper {
            return Err(ConfigError::InvalidGridBounds { lower, upper });
        }
        Ok(())
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be non-zero")]
    EmptyPopulation,
    #[error("Elitism ({elitism}) must be smaller than the population size ({size})")]
    InvalidElitism { elitism: usize, size: usize },
    #[error("Tournament size must be non-zero")]
    InvalidTournamentSize,
    #[error("Crossover rate {0} must lie in [0, 1]")]
    InvalidRate(f64),
    #[error("Search budget must be positive")]
    ZeroBudget,
    #[error("Grid archive capacity must be non-zero")]
    ZeroCapacity,
    #[error("Grid bounds [{lower}, {upper}] must be finite with lower < upper")]
    InvalidGridBounds { lower: f64, upper: f64 },
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
