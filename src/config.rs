use crate::constants::*;
use std::env;

/// What to do when a leg has no path that avoids already used edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Route the leg on the full graph and mark the candidate as degraded
    #[default]
    Unrestricted,
    /// Fail the whole candidate
    FailCandidate,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unrestricted" | "fallback" => Ok(FallbackPolicy::Unrestricted),
            "fail" | "fail_candidate" | "strict" => Ok(FallbackPolicy::FailCandidate),
            _ => Err(format!(
                "Invalid fallback policy: {}. Use 'unrestricted' or 'fail'",
                s
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub route_generator: RouteGeneratorConfig,
    pub cleaner: CleanerConfig,
}

#[derive(Debug, Clone)]
pub struct RouteGeneratorConfig {
    /// Ratio denominators evaluated by the sweep, in order.
    /// Earlier entries win ties on deviation.
    pub ratio_denominators: Vec<f64>,

    /// Behaviour for legs without an edge-disjoint path
    pub fallback_policy: FallbackPolicy,

    /// Corner-to-node snapping distance (meters) that triggers a warning
    pub snap_warn_distance_m: f64,
}

impl Default for RouteGeneratorConfig {
    fn default() -> Self {
        Self {
            ratio_denominators: DEFAULT_RATIO_DENOMINATORS.to_vec(),
            fallback_policy: FallbackPolicy::default(),
            snap_warn_distance_m: DEFAULT_SNAP_WARN_DISTANCE_M,
        }
    }
}

impl RouteGeneratorConfig {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let ratio_denominators = match env::var("SQUARELOOP_RATIOS") {
            Ok(raw) => parse_ratio_list(&raw)?,
            Err(_) => defaults.ratio_denominators,
        };

        Ok(Self {
            ratio_denominators,

            fallback_policy: env::var("SQUARELOOP_FALLBACK_POLICY")
                .unwrap_or_else(|_| "unrestricted".to_string())
                .parse()?,

            snap_warn_distance_m: env::var("SQUARELOOP_SNAP_WARN_DISTANCE_M")
                .unwrap_or_else(|_| defaults.snap_warn_distance_m.to_string())
                .parse()
                .map_err(|_| "Invalid SQUARELOOP_SNAP_WARN_DISTANCE_M")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanerConfig {
    /// Backtrack look-ahead window (see [`crate::services::cleaner`])
    pub backtrack_window: usize,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            backtrack_window: DEFAULT_BACKTRACK_WINDOW,
        }
    }
}

impl CleanerConfig {
    pub fn from_env() -> Result<Self, String> {
        let backtrack_window: usize = env::var("SQUARELOOP_BACKTRACK_WINDOW")
            .unwrap_or_else(|_| DEFAULT_BACKTRACK_WINDOW.to_string())
            .parse()
            .map_err(|_| "Invalid SQUARELOOP_BACKTRACK_WINDOW")?;

        validate_window(backtrack_window)?;
        Ok(Self { backtrack_window })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        Ok(Config {
            route_generator: RouteGeneratorConfig::from_env()?,
            cleaner: CleanerConfig::from_env()?,
        })
    }
}

/// Parse a comma-separated list of positive ratio denominators ("7,6.5,6").
pub fn parse_ratio_list(raw: &str) -> Result<Vec<f64>, String> {
    let ratios = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| format!("Invalid ratio denominator: '{}'", s))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ratios.is_empty() {
        return Err("At least one ratio denominator is required".to_string());
    }
    if let Some(bad) = ratios.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(format!("Ratio denominator must be positive: {}", bad));
    }
    Ok(ratios)
}

pub fn validate_window(window: usize) -> Result<(), String> {
    if window < MIN_BACKTRACK_WINDOW {
        return Err(format!(
            "Backtrack window must be at least {} (got {})",
            MIN_BACKTRACK_WINDOW, window
        ));
    }
    Ok(())
}
