use rapido_core::{DeliveryQuote, DeliveryType, Order};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Business constants used to price a delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingRules {
    /// Fraction of the base charge added to urgent deliveries
    pub urgent_surcharge_rate: Decimal,

    /// Cargo strictly heavier than this pays `heavy_cargo_fee`
    pub heavy_cargo_threshold_kg: Decimal,

    pub heavy_cargo_fee: Decimal,

    /// Subtotals strictly above this get `discount_rate` off
    pub discount_threshold: Decimal,

    pub discount_rate: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            urgent_surcharge_rate: Decimal::new(20, 2),
            heavy_cargo_threshold_kg: Decimal::new(5000, 2),
            heavy_cargo_fee: Decimal::new(1500, 2),
            discount_threshold: Decimal::new(50000, 2),
            discount_rate: Decimal::new(10, 2),
        }
    }
}

/// Delivery pricing engine
///
/// Pure function of the order's fields: the same order always yields the
/// same quote.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    rules: PricingRules,
}

impl PricingEngine {
    pub fn new(rules: PricingRules) -> Self {
        Self { rules }
    }

    /// Compute the monetary breakdown for an order.
    ///
    /// The urgency surcharge applies to the base charge only; the heavy-cargo
    /// fee is added afterwards, and the discount is taken from the resulting
    /// subtotal.
    pub fn quote(&self, order: &Order) -> DeliveryQuote {
        let distance_charge = order.distance * order.rate_per_km;
        let weight_charge = order.weight * order.rate_per_kg;
        let base = distance_charge + weight_charge;

        let surcharge = match order.delivery_type {
            DeliveryType::Urgent => base * self.rules.urgent_surcharge_rate,
            DeliveryType::Normal => Decimal::ZERO,
        };

        let extra_fee = if order.weight > self.rules.heavy_cargo_threshold_kg {
            self.rules.heavy_cargo_fee
        } else {
            Decimal::ZERO
        };

        let subtotal = base + surcharge + extra_fee;

        let discount = if subtotal > self.rules.discount_threshold {
            subtotal * self.rules.discount_rate
        } else {
            Decimal::ZERO
        };

        let final_charge = subtotal - discount;

        // Products of 2-place inputs grow their scale; strip the trailing zeros
        DeliveryQuote {
            distance_charge: distance_charge.normalize(),
            weight_charge: weight_charge.normalize(),
            base: base.normalize(),
            surcharge: surcharge.normalize(),
            extra_fee: extra_fee.normalize(),
            subtotal: subtotal.normalize(),
            discount: discount.normalize(),
            final_charge: final_charge.normalize(),
        }
    }
}
