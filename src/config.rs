use config::{Config, Environment, File};
use serde::Deserialize;

/// Grid shape used by the `grid` command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub min_price: f64,
    pub max_price: f64,
    pub count: usize,
    pub profit_pct: f64,
    pub qty: f64,
    pub loop_trade: bool,
    /// "linear" spreads entries evenly, "normal" samples a Gaussian
    /// around the midpoint.
    pub distribution: String,
    pub sigma_factor: f64,
    pub seed: u64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            min_price: 90.0,
            max_price: 110.0,
            count: 10,
            profit_pct: 1.0,
            qty: 0.01,
            loop_trade: true,
            distribution: "linear".to_string(),
            sigma_factor: 4.0,
            seed: 42,
        }
    }
}

/// Runtime settings, read from `gridbot.toml` (optional) with
/// `GRIDBOT_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub state_path: String,
    pub poll_interval_secs: u64,
    pub initial_balance: f64,
    pub fee_rate: f64,
    pub leverage: u32,
    pub maker_offset_buy: f64,
    pub maker_offset_sell: f64,
    pub grid: GridSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            state_path: "gridbot_state.json".to_string(),
            poll_interval_secs: 5,
            initial_balance: 10_000.0,
            fee_rate: 0.00055,
            leverage: 1,
            maker_offset_buy: 0.05,
            maker_offset_sell: 0.05,
            grid: GridSettings::default(),
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = Config::builder()
            .add_source(File::with_name("gridbot").required(false))
            .add_source(Environment::with_prefix("GRIDBOT").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }
}
