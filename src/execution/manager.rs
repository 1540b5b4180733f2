use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::exchange::precision::round_to;
use crate::exchange::ExchangeClient;
use crate::execution::{ExecutorRecord, ExecutorState, PositionExecutor, TickSnapshot};
use crate::persistence;

/// Bounded history window fetched once per tick and shared by every
/// executor, so exchange request cost stays flat as the grid grows.
const HISTORY_WINDOW: usize = 200;

/// Startup outcome after comparing persisted intent with the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Exchange shows an open position; persisted executors resumed.
    ResumedWithPosition,
    /// Nothing persisted and the exchange is flat.
    ColdStart,
    /// Persisted intent implied a position but the exchange is flat;
    /// the position closed while the process was down, so stale state
    /// was cleared.
    ClearedStale,
}

/// Orchestrates a set of [`PositionExecutor`]s over one exchange client:
/// one snapshot per tick, one cycle per executor, one persist per tick.
pub struct TradeManager<C: ExchangeClient> {
    client: C,
    state_path: PathBuf,
    maker_offset_buy: f64,
    maker_offset_sell: f64,
    executors: Vec<PositionExecutor>,
}

impl<C: ExchangeClient> TradeManager<C> {
    pub fn new(
        client: C,
        state_path: impl Into<PathBuf>,
        maker_offset_buy: f64,
        maker_offset_sell: f64,
    ) -> Self {
        Self {
            client,
            state_path: state_path.into(),
            maker_offset_buy,
            maker_offset_sell,
            executors: Vec::new(),
        }
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    pub fn executor_count(&self) -> usize {
        self.executors.len()
    }

    pub fn has_active_trades(&self) -> bool {
        !self.executors.is_empty()
    }

    pub fn add_trade(&mut self, target_entry: f64, target_exit: f64, qty: f64, loop_trade: bool) {
        tracing::info!(
            "Trade added | entry: {} | exit: {} | qty: {}",
            target_entry,
            target_exit,
            qty
        );
        self.executors.push(PositionExecutor::new(
            target_entry,
            target_exit,
            qty,
            self.maker_offset_buy,
            self.maker_offset_sell,
            loop_trade,
        ));
    }

    /// Spread `count` entry prices evenly across [min_price, max_price],
    /// each paired with an exit `profit_pct` percent above it.
    pub fn create_linear_traders(
        &mut self,
        min_price: f64,
        max_price: f64,
        count: usize,
        profit_pct: f64,
        qty: f64,
        loop_trade: bool,
    ) {
        if count == 0 {
            return;
        }
        let step = if count > 1 {
            (max_price - min_price) / (count - 1) as f64
        } else {
            0.0
        };
        for i in 0..count {
            let entry = round_to(min_price + step * i as f64, 5);
            let exit = round_to(entry * (1.0 + profit_pct / 100.0), 5);
            self.add_trade(entry, exit, qty, loop_trade);
        }
    }

    /// Sample `count` entry prices from a Gaussian with std dev = range /
    /// sigma_factor, clipped to [min_price, max_price]. The mean defaults
    /// to the interval midpoint. Seeded so grids are reproducible.
    #[allow(clippy::too_many_arguments)]
    pub fn create_normal_traders(
        &mut self,
        min_price: f64,
        max_price: f64,
        count: usize,
        profit_pct: f64,
        qty: f64,
        loop_trade: bool,
        mean: Option<f64>,
        sigma_factor: f64,
        seed: u64,
    ) -> crate::Result<()> {
        let mean = mean.unwrap_or((min_price + max_price) / 2.0);
        let std_dev = (max_price - min_price) / sigma_factor;
        let normal = Normal::new(mean, std_dev)?;
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..count {
            let entry = round_to(normal.sample(&mut rng).clamp(min_price, max_price), 5);
            let exit = round_to(entry * (1.0 + profit_pct / 100.0), 5);
            self.add_trade(entry, exit, qty, loop_trade);
        }
        Ok(())
    }

    /// One polling cycle: capture a consistent exchange snapshot, advance
    /// every executor against it, drop completed ones, persist.
    ///
    /// Snapshot failure skips the whole tick before any executor mutates;
    /// the next scheduled tick retries. A persist failure is logged and
    /// in-memory state stays authoritative until the next write succeeds.
    pub fn process_tick(&mut self) {
        let snapshot = match TickSnapshot::capture(&mut self.client, HISTORY_WINDOW) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Tick skipped, snapshot failed: {}", e);
                return;
            }
        };

        for executor in &mut self.executors {
            executor.execute_cycle(&mut self.client, &snapshot);
        }
        self.executors.retain(|e| !e.is_completed());

        if let Err(e) = self.save_to_disk() {
            tracing::error!("State persist failed: {}", e);
        }
    }

    /// Shutdown: cancel resting entries and complete idle executors.
    /// Executors holding a position keep running until their exit fills.
    pub fn stop_all_entries(&mut self) {
        for executor in &mut self.executors {
            executor.abort_entry(&mut self.client);
        }
        self.executors.retain(|e| !e.is_completed());

        if let Err(e) = self.save_to_disk() {
            tracing::error!("State persist failed during shutdown: {}", e);
        }
    }

    pub fn save_to_disk(&self) -> crate::Result<()> {
        let records: Vec<ExecutorRecord> =
            self.executors.iter().map(|e| e.to_record()).collect();
        persistence::save_executors(&self.state_path, &records)
    }

    pub fn load_from_disk(&mut self) -> crate::Result<bool> {
        match persistence::load_executors(&self.state_path)? {
            Some(records) => {
                tracing::info!("Restored {} executors from {:?}", records.len(), self.state_path);
                self.executors = records.into_iter().map(PositionExecutor::from_record).collect();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn clear_state(&mut self) -> crate::Result<()> {
        self.executors.clear();
        persistence::clear_state(&self.state_path)
    }

    /// Startup reconciliation of persisted intent against the exchange.
    ///
    /// The exchange is ground truth for the position. Persisted executors
    /// are resumed only when a position actually exists; persisted intent
    /// implying a position on a flat exchange means it closed while the
    /// process was down, so the stale records are discarded.
    pub fn reconcile_after_crash(&mut self) -> crate::Result<Recovery> {
        let had_state = self.load_from_disk()?;
        let position = self
            .client
            .get_open_position()
            .map_err(|e| format!("Reconciliation position query failed: {}", e))?;

        match (had_state, position) {
            (_, Some(position)) => {
                tracing::info!(
                    "Reconciled: exchange holds {} {} @ {} | resuming {} executors",
                    position.side,
                    position.qty,
                    position.entry_price,
                    self.executors.len()
                );
                Ok(Recovery::ResumedWithPosition)
            }
            (false, None) => {
                tracing::info!("Reconciled: no persisted state, no position, cold start");
                Ok(Recovery::ColdStart)
            }
            (true, None) => {
                let implies_position = self.executors.iter().any(|e| {
                    matches!(
                        e.state(),
                        ExecutorState::FilledWait | ExecutorState::PlacedExit
                    )
                });
                if implies_position {
                    tracing::warn!(
                        "Reconciled: persisted state implies a position but exchange is flat, clearing stale state"
                    );
                    self.clear_state()?;
                    Ok(Recovery::ClearedStale)
                } else {
                    // Persisted executors were still hunting entries;
                    // resuming them on a flat book is safe
                    tracing::info!(
                        "Reconciled: resuming {} entry-side executors on flat exchange",
                        self.executors.len()
                    );
                    Ok(Recovery::ColdStart)
                }
            }
        }
    }
}
