pub mod address;
pub mod attachment;
pub mod cart_item;
pub mod conversation;
pub mod discount;
pub mod discount_usage;
pub mod message;
pub mod message_read;
pub mod order;
pub mod order_item;
pub mod participant;
pub mod product;
pub mod shipping_fee;
pub mod user;

pub use attachment::Kind as AttachmentKind;
pub use discount::DiscountType;
pub use message::MessageType;
pub use order::{OrderStatus, ShippingMethod};
pub use shipping_fee::FeeStatus;
