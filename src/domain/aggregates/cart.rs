//! Cart Aggregate

use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::order::LineItem;
use crate::domain::value_objects::{MoneyError, Rupiah};

#[derive(Clone, Debug, Default)]
pub struct Cart {
    buyer_id: Uuid,
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub store_id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Rupiah,
    pub stock: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Result<Rupiah, MoneyError> { self.unit_price.multiply(self.quantity) }
}

impl Cart {
    pub fn for_buyer(buyer_id: Uuid) -> Self { Self { buyer_id, items: vec![] } }

    pub fn buyer_id(&self) -> Uuid { self.buyer_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn subtotal(&self) -> Result<Rupiah, MoneyError> {
        self.items.iter().try_fold(Rupiah::ZERO, |acc, i| acc.add(i.line_total()?))
    }

    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if item.seller_id == self.buyer_id { return Err(CartError::OwnProduct); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        let pos = self.items.iter().position(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.remove(pos); }
        else { self.items[pos].quantity = quantity; }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    /// Freezes the cart into order line items, checking stock as it goes.
    pub fn to_line_items(&self) -> Result<Vec<LineItem>, CartError> {
        if self.items.is_empty() { return Err(CartError::Empty); }
        self.items.iter().map(|i| {
            if i.quantity > i.stock { return Err(CartError::InsufficientStock { product_id: i.product_id, available: i.stock }); }
            let subtotal = i.line_total().map_err(|_| CartError::InvalidQuantity)?;
            Ok(LineItem {
                id: Uuid::now_v7(), product_id: i.product_id, store_id: i.store_id, seller_id: i.seller_id,
                name: i.name.clone(), quantity: i.quantity, unit_price: i.unit_price, subtotal,
            })
        }).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartError { ItemNotFound, Empty, InvalidQuantity, OwnProduct, InsufficientStock { product_id: Uuid, available: u32 } }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound => write!(f, "Item not found"),
            Self::Empty => write!(f, "Cart is empty"),
            Self::InvalidQuantity => write!(f, "Invalid quantity"),
            Self::OwnProduct => write!(f, "Cannot buy from your own store"),
            Self::InsufficientStock { product_id, available } => write!(f, "Only {} left in stock for product {}", available, product_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(product_id: Uuid, qty: u32) -> CartItem {
        CartItem { product_id, store_id: Uuid::nil(), seller_id: Uuid::nil(), name: "Sepatu".into(), quantity: qty, unit_price: Rupiah::new(10_000), stock: 5 }
    }

    #[test]
    fn test_cart_operations() {
        let mut cart = Cart::for_buyer(Uuid::new_v4());
        let p1 = Uuid::new_v4();
        cart.add_item(widget(p1, 2)).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal().unwrap(), Rupiah::new(20_000));
        cart.add_item(widget(p1, 1)).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        cart.update_quantity(p1, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_to_line_items_checks_stock() {
        let mut cart = Cart::for_buyer(Uuid::new_v4());
        let p1 = Uuid::new_v4();
        cart.add_item(widget(p1, 6)).unwrap();
        assert_eq!(cart.to_line_items().unwrap_err(), CartError::InsufficientStock { product_id: p1, available: 5 });
        cart.update_quantity(p1, 4).unwrap();
        let items = cart.to_line_items().unwrap();
        assert_eq!(items[0].subtotal, Rupiah::new(40_000));
    }

    #[test]
    fn test_cannot_buy_own_product() {
        let buyer = Uuid::new_v4();
        let mut cart = Cart::for_buyer(buyer);
        let mut item = widget(Uuid::new_v4(), 1);
        item.seller_id = buyer;
        assert_eq!(cart.add_item(item), Err(CartError::OwnProduct));
        assert_eq!(Cart::for_buyer(buyer).to_line_items(), Err(CartError::Empty));
    }
}
