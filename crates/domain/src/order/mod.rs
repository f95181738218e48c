//! Order model, status machine and checkout inputs.

mod model;
mod requests;
mod status;
mod value_objects;

pub use model::{NewOrder, Order, OrderItem, generate_order_number};
pub use requests::{CreateOrderRequest, OrderDetailsUpdate, OrderLine, Page, PaymentRequest};
pub use status::{OrderStatus, ParseStatusError, PaymentMethod, PaymentStatus};
pub use value_objects::{Address, Money};
