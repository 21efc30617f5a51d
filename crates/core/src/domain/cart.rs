use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// One product's aggregated demand. The unit price is captured when the line is first added.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    /// `None` when price times quantity does not fit in a `Decimal`.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Canonical cart. At most one line per product name; `total` always equals the
/// sum of line subtotals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cart {
    lines: Vec<CartLine>,
    total: Decimal,
}

impl Cart {
    /// Builds a cart from caller-supplied lines, merging duplicates by name.
    pub fn from_lines(lines: Vec<CartLine>) -> Result<Self, DomainError> {
        let mut cart = Self::default();
        for line in lines {
            if line.quantity == 0 {
                return Err(DomainError::InvalidCartLine {
                    name: line.name,
                    reason: "quantity must be positive".to_string(),
                });
            }
            if line.price <= Decimal::ZERO {
                return Err(DomainError::InvalidCartLine {
                    name: line.name,
                    reason: "price must be positive".to_string(),
                });
            }
            cart.upsert(&line.name, line.price, line.quantity)?;
        }
        Ok(cart)
    }

    /// Accumulates quantity on an existing line or inserts a new one, then recomputes
    /// the total from every line.
    ///
    /// Leaves the cart untouched when the quantity or any amount would overflow.
    pub fn upsert(&mut self, name: &str, price: Decimal, quantity: u32) -> Result<(), DomainError> {
        let overflow = |reason: &str| DomainError::InvalidCartLine {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|line| line.name == name) {
            Some(line) => {
                line.quantity =
                    line.quantity.checked_add(quantity).ok_or_else(|| overflow("quantity is too large"))?;
            }
            None => lines.push(CartLine { name: name.to_string(), price, quantity }),
        }
        let total = total_of(&lines).ok_or_else(|| overflow("cart total is too large"))?;

        self.lines = lines;
        self.total = total;
        Ok(())
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<CartLine> {
        self.lines
    }
}

fn total_of(lines: &[CartLine]) -> Option<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |total, line| total.checked_add(line.subtotal()?))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Cart, CartLine};
    use crate::errors::DomainError;

    fn line(name: &str, price: Decimal, quantity: u32) -> CartLine {
        CartLine { name: name.to_string(), price, quantity }
    }

    #[test]
    fn repeated_adds_accumulate_into_one_line() {
        let mut cart = Cart::default();
        cart.upsert("Calabresa", Decimal::new(3990, 2), 1).expect("first add");
        cart.upsert("Calabresa", Decimal::new(3990, 2), 2).expect("second add");

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.total(), Decimal::new(11970, 2));
    }

    #[test]
    fn total_is_exact_sum_of_subtotals() {
        let cart = Cart::from_lines(vec![
            line("Calabresa", Decimal::new(3990, 2), 3),
            line("Margherita", Decimal::new(3590, 2), 1),
            line("Portuguesa", Decimal::new(4290, 2), 7),
        ])
        .expect("valid lines");

        let expected: Decimal =
            cart.lines().iter().map(|line| line.subtotal().expect("subtotal")).sum();
        assert_eq!(cart.total(), expected);
        assert_eq!(cart.total(), Decimal::new(45560, 2));
    }

    #[test]
    fn duplicate_caller_lines_are_merged() {
        let cart = Cart::from_lines(vec![
            line("Calabresa", Decimal::new(3990, 2), 1),
            line("Calabresa", Decimal::new(3990, 2), 1),
        ])
        .expect("valid lines");

        assert_eq!(cart.lines(), &[line("Calabresa", Decimal::new(3990, 2), 2)]);
    }

    #[test]
    fn zero_quantity_line_is_rejected() {
        let error = Cart::from_lines(vec![line("Calabresa", Decimal::new(3990, 2), 0)])
            .expect_err("zero quantity should fail");

        assert!(matches!(error, DomainError::InvalidCartLine { ref name, .. } if name == "Calabresa"));
    }

    #[test]
    fn oversized_caller_line_is_rejected_instead_of_overflowing() {
        let huge: CartLine =
            serde_json::from_str(r#"{"name":"Calabresa","price":7.9e28,"quantity":2}"#).expect("decode");

        let error = Cart::from_lines(vec![huge]).expect_err("subtotal overflow should fail");

        assert!(matches!(
            error,
            DomainError::InvalidCartLine { ref name, ref reason }
                if name == "Calabresa" && reason == "cart total is too large"
        ));
    }

    #[test]
    fn overflowing_add_leaves_cart_unchanged() {
        let mut cart = Cart::from_lines(vec![
            line("Calabresa", Decimal::new(3990, 2), u32::MAX),
            line("Margherita", Decimal::new(3590, 2), 1),
        ])
        .expect("valid lines");
        let before = cart.clone();

        let quantity = cart.upsert("Calabresa", Decimal::new(3990, 2), 1);
        let total = cart.upsert("Portuguesa", Decimal::MAX, 1);

        assert!(matches!(
            quantity,
            Err(DomainError::InvalidCartLine { ref reason, .. }) if reason == "quantity is too large"
        ));
        assert!(matches!(
            total,
            Err(DomainError::InvalidCartLine { ref reason, .. }) if reason == "cart total is too large"
        ));
        assert_eq!(cart, before);
    }

    #[test]
    fn cart_line_serializes_prices_as_numbers() {
        let json = serde_json::to_value(line("Calabresa", Decimal::new(3990, 2), 2))
            .expect("serialize");

        assert_eq!(json, serde_json::json!({"name": "Calabresa", "price": 39.9, "quantity": 2}));
    }
}
