pub mod cart;
pub mod chat;
pub mod discounts;
pub mod orders;
pub mod products;
pub mod shipping;
pub mod users;
pub mod ws;

pub async fn health() -> &'static str {
  "OK"
}
