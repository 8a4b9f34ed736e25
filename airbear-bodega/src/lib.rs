pub mod item;
pub mod cart;
pub mod order;

pub use item::BodegaItem;
pub use cart::{price_cart, CartError, CartLine, PricedCart, PricedLine, MAX_LINE_QUANTITY};
pub use order::{BodegaOrder, OrderError, OrderStatus};
