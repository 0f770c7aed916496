//! Bill Model
//!
//! 账单不落库，由会话内的已点菜品实时汇总。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::Product;

/// One bill line: all ordered units of a single product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillItem {
    pub product: Product,
    pub quantity: u32,
    /// `quantity × product.price`
    pub total_price: Decimal,
}

impl BillItem {
    pub fn new(product: Product, quantity: u32) -> Self {
        let total_price = product.price * Decimal::from(quantity);
        Self {
            product,
            quantity,
            total_price,
        }
    }
}

/// Itemized bill of a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub items: Vec<BillItem>,
    /// Sum of the item totals
    pub total_price: Decimal,
}

impl Bill {
    pub fn new(items: Vec<BillItem>) -> Self {
        let total_price = items.iter().map(|item| item.total_price).sum();
        Self { items, total_price }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn product(name: &str, price: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category_id: Uuid::nil(),
            price: Decimal::from_str(price).unwrap(),
        }
    }

    #[test]
    fn test_bill_totals_are_exact() {
        // 0.1 + 0.2 style drift must not appear
        let items = vec![
            BillItem::new(product("Tea", "0.10"), 3),
            BillItem::new(product("Cake", "0.20"), 1),
        ];
        let bill = Bill::new(items);
        assert_eq!(bill.items[0].total_price, Decimal::from_str("0.30").unwrap());
        assert_eq!(bill.total_price, Decimal::from_str("0.50").unwrap());
    }

    #[test]
    fn test_empty_bill() {
        let bill = Bill::new(Vec::new());
        assert!(bill.is_empty());
        assert_eq!(bill.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_price_serializes_as_string() {
        let item = BillItem::new(product("Soup", "4.50"), 2);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["totalPrice"], "9.00");
        assert_eq!(json["quantity"], 2);
    }
}
