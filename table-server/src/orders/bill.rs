//! 账单汇总
//!
//! Groups a session's ordered products by product and prices each line with
//! exact decimal arithmetic.

use std::collections::HashMap;

use shared::models::{Bill, BillItem, OrderedProduct, Product};
use uuid::Uuid;

use super::error::OrderResult;

/// Build the itemized bill for a set of ordered products
///
/// `lookup` resolves a product id to its catalog entry (unit price).
/// Lines are ordered by product name, then id, so repeated calls agree.
pub fn aggregate<F>(ordered: &[OrderedProduct], mut lookup: F) -> OrderResult<Bill>
where
    F: FnMut(Uuid) -> OrderResult<Product>,
{
    let mut quantities: HashMap<Uuid, u32> = HashMap::new();
    for item in ordered {
        *quantities.entry(item.product_id).or_default() += 1;
    }

    let mut items = Vec::with_capacity(quantities.len());
    for (product_id, quantity) in quantities {
        let product = lookup(product_id)?;
        items.push(BillItem::new(product, quantity));
    }
    items.sort_by(|a, b| {
        a.product
            .name
            .cmp(&b.product.name)
            .then_with(|| a.product.id.cmp(&b.product.id))
    });

    Ok(Bill::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::error::OrderError;
    use rust_decimal::Decimal;
    use shared::models::OrderedProductStatus;
    use std::str::FromStr;

    fn product(name: &str, price: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            category_id: Uuid::nil(),
            price: Decimal::from_str(price).unwrap(),
        }
    }

    fn done(product_id: Uuid, session_id: Uuid) -> OrderedProduct {
        let mut item = OrderedProduct::new(product_id, session_id);
        item.status = OrderedProductStatus::Done;
        item
    }

    #[test]
    fn test_groups_by_product() {
        let session_id = Uuid::new_v4();
        let burger = product("Burger", "12.90");
        let fries = product("Fries", "3.45");
        let ordered = vec![
            done(burger.id, session_id),
            done(fries.id, session_id),
            done(burger.id, session_id),
        ];

        let catalog = [burger.clone(), fries.clone()];
        let bill = aggregate(&ordered, |id| {
            Ok(catalog.iter().find(|p| p.id == id).cloned().unwrap())
        })
        .unwrap();

        assert_eq!(bill.items.len(), 2);
        assert_eq!(bill.items[0].product.name, "Burger");
        assert_eq!(bill.items[0].quantity, 2);
        assert_eq!(bill.items[0].total_price, Decimal::from_str("25.80").unwrap());
        assert_eq!(bill.items[1].quantity, 1);
        assert_eq!(bill.total_price, Decimal::from_str("29.25").unwrap());
    }

    #[test]
    fn test_empty_session_bill() {
        let bill = aggregate(&[], |_| unreachable!()).unwrap();
        assert!(bill.is_empty());
        assert_eq!(bill.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_missing_product_propagates() {
        let ordered = vec![done(Uuid::new_v4(), Uuid::new_v4())];
        let result = aggregate(&ordered, |id| Err(OrderError::ProductNotFound(id.to_string())));
        assert!(matches!(result, Err(OrderError::ProductNotFound(_))));
    }
}
