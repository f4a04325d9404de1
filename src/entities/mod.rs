pub mod book;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod payment_method;
pub mod rating;
pub mod rating_vote;
pub mod user;

pub use order::OrderStatus;
pub use payment::PaymentStatus;
pub use user::UserRole;
