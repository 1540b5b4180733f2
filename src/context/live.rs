use crate::context::{ExecutionContext, OrderOptions, PendingOrder};
use crate::exchange::{ExchangeClient, ExchangeError};
use crate::models::{OrderType, PositionInfo, Side};

/// Forwards context calls to the exchange access layer.
///
/// Order rejections (post-only collision, reduce-only violation,
/// insufficient balance, venue refusal) are logged and mapped to
/// `Ok(None)`; only transport failures propagate as errors.
pub struct LiveContext<C: ExchangeClient> {
    client: C,
}

impl<C: ExchangeClient> LiveContext<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    fn place(
        &mut self,
        side: Side,
        qty: f64,
        price: Option<f64>,
        opts: OrderOptions,
    ) -> crate::Result<Option<String>> {
        let result = match price {
            Some(price) => {
                self.client
                    .place_limit_order(side, qty, price, opts.reduce_only, opts.post_only)
            }
            None => self.client.place_market_order(side, qty, opts.reduce_only),
        };

        match result {
            Ok(order_id) => Ok(Some(order_id)),
            Err(ExchangeError::Transport(msg)) => Err(ExchangeError::Transport(msg).into()),
            Err(rejection) => {
                tracing::warn!("{} order refused: {}", side, rejection);
                Ok(None)
            }
        }
    }
}

impl<C: ExchangeClient> ExecutionContext for LiveContext<C> {
    fn set_leverage(&mut self, leverage: u32) -> crate::Result<()> {
        self.client.set_leverage(leverage)?;
        Ok(())
    }

    fn buy(
        &mut self,
        qty: f64,
        price: Option<f64>,
        opts: OrderOptions,
    ) -> crate::Result<Option<String>> {
        self.place(Side::Buy, qty, price, opts)
    }

    fn sell(
        &mut self,
        qty: f64,
        price: Option<f64>,
        opts: OrderOptions,
    ) -> crate::Result<Option<String>> {
        self.place(Side::Sell, qty, price, opts)
    }

    fn balance(&mut self) -> crate::Result<f64> {
        Ok(self.client.get_balance()?)
    }

    fn position(&mut self) -> crate::Result<Option<PositionInfo>> {
        Ok(self.client.get_open_position()?)
    }

    fn pending_orders(&mut self) -> crate::Result<Vec<PendingOrder>> {
        let orders = self.client.get_open_orders()?;
        Ok(orders
            .into_iter()
            .filter(|o| o.order_type == OrderType::Limit)
            .map(|o| PendingOrder {
                order_id: o.order_id,
                side: o.side,
                qty: o.qty,
                price: o.price,
                post_only: false,
                reduce_only: false,
            })
            .collect())
    }

    fn log(&mut self, message: &str) {
        tracing::info!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::PaperExchange;

    #[test]
    fn test_limit_price_routes_to_limit_order() {
        let mut ctx = LiveContext::new(PaperExchange::new(100.0, 10_000.0));
        let id = ctx
            .buy(1.0, Some(99.0), OrderOptions::post_only())
            .unwrap();
        assert!(id.is_some());
        assert_eq!(ctx.pending_orders().unwrap().len(), 1);
    }

    #[test]
    fn test_no_price_routes_to_market_order() {
        let mut ctx = LiveContext::new(PaperExchange::new(100.0, 10_000.0));
        let id = ctx.buy(1.0, None, OrderOptions::default()).unwrap();
        assert!(id.is_some());
        assert_eq!(ctx.pending_orders().unwrap().len(), 0);
        let position = ctx.position().unwrap().unwrap();
        assert_eq!(position.qty, 1.0);
    }

    #[test]
    fn test_rejection_maps_to_none() {
        let mut ctx = LiveContext::new(PaperExchange::new(100.0, 10_000.0));
        // Post-only buy at market price would cross: refused, not an error
        let id = ctx
            .buy(1.0, Some(100.0), OrderOptions::post_only())
            .unwrap();
        assert!(id.is_none());
    }

    #[test]
    fn test_transport_failure_propagates() {
        let mut venue = PaperExchange::new(100.0, 10_000.0);
        venue.fail_next_calls(1);
        let mut ctx = LiveContext::new(venue);
        assert!(ctx.buy(1.0, None, OrderOptions::default()).is_err());
    }
}
