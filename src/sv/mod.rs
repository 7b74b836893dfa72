pub mod address;
pub mod attachment;
pub mod cart;
pub mod chat;
pub mod checkout;
pub mod discount;
pub mod discount_usage;
pub mod distance;
pub mod order;
pub mod product;
pub mod shipping;
#[cfg(test)]
pub mod test_utils;
pub mod user;

pub use address::Address;
pub use cart::Cart;
pub use chat::Chat;
pub use checkout::Checkout;
pub use discount::Discount;
pub use discount_usage::DiscountUsage;
pub use order::Order;
pub use product::Product;
pub use shipping::Shipping;
pub use user::User;
