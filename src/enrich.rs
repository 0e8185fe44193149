//! Transaction enrichment: join a stored transaction with its referenced
//! item and customer into the denormalized projection the API returns. Both
//! the list and create paths go through `enrich`, so the two response shapes
//! cannot drift apart.

use crate::error::AppError;
use crate::model::{Customer, EnrichedTransaction, Item, Transaction};
use crate::storage::Store;

/// Resolve the transaction's item and customer and build the projection.
/// A reference to a missing row is a data-integrity failure and yields
/// `DanglingRef`; the result never carries a placeholder name.
pub fn enrich(store: &Store, tx: &Transaction) -> Result<EnrichedTransaction, AppError> {
    let item = store.find_by_id::<Item>(tx.item_id)?.ok_or_else(|| {
        AppError::dangling(
            "dangling_item",
            format!("transaction {} references missing item {}", tx.id, tx.item_id),
        )
    })?;
    let customer = store.find_by_id::<Customer>(tx.customer_id)?.ok_or_else(|| {
        AppError::dangling(
            "dangling_customer",
            format!("transaction {} references missing customer {}", tx.id, tx.customer_id),
        )
    })?;
    Ok(EnrichedTransaction {
        id: tx.id,
        item_id: tx.item_id,
        item_name: item.name,
        customer_id: tx.customer_id,
        customer_name: customer.name,
        date: tx.date,
        qty: tx.qty,
        total_price: tx.total_price,
        discount: tx.discount,
        price_after_discount: tx.price_after_discount,
    })
}

/// Enrich every transaction, failing the whole batch on the first dangling
/// reference.
pub fn enrich_all(store: &Store, txs: &[Transaction]) -> Result<Vec<EnrichedTransaction>, AppError> {
    txs.iter().map(|tx| enrich(store, tx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn seed(store: &Store) -> (Item, Customer) {
        let item = store
            .create(Item { id: 0, code: "I-1".into(), name: "widget".into(), price: 12.5 })
            .unwrap();
        let customer = store
            .create(Customer { id: 0, code: "C-1".into(), name: "Acme".into(), address: "1 Main St".into() })
            .unwrap();
        (item, customer)
    }

    fn tx(item_id: i64, customer_id: i64) -> Transaction {
        Transaction {
            id: 1,
            item_id,
            customer_id,
            date: Utc::now(),
            qty: 3,
            total_price: 37.5,
            discount: 2.5,
            price_after_discount: 35.0,
        }
    }

    #[test]
    fn enrich_joins_both_names() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let (item, customer) = seed(&store);

        let enriched = enrich(&store, &tx(item.id, customer.id)).unwrap();
        assert_eq!(enriched.item_name, "widget");
        assert_eq!(enriched.customer_name, "Acme");
        assert_eq!(enriched.qty, 3);
        assert_eq!(enriched.price_after_discount, 35.0);
    }

    #[test]
    fn missing_item_is_a_dangling_reference() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let (_, customer) = seed(&store);

        let err = enrich(&store, &tx(999, customer.id)).unwrap_err();
        assert_eq!(err.code_str(), "dangling_item");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn missing_customer_is_a_dangling_reference() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let (item, _) = seed(&store);

        let err = enrich(&store, &tx(item.id, 999)).unwrap_err();
        assert_eq!(err.code_str(), "dangling_customer");
    }

    #[test]
    fn enrich_all_fails_batch_on_first_dangle() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let (item, customer) = seed(&store);

        let good = tx(item.id, customer.id);
        let bad = tx(item.id, 999);
        assert_eq!(enrich_all(&store, &[good.clone()]).unwrap().len(), 1);
        assert!(enrich_all(&store, &[good, bad]).is_err());
    }
}
