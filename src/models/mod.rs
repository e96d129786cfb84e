pub mod error;
pub mod user;
pub mod product;
pub mod order;
pub mod admin;
pub mod affiliate;
pub mod referral;
pub mod payment;

pub use error::ApiError;
pub use user::{User, DeliveryInfo, CartData};
pub use product::Product;
pub use order::{Order, OrderItem, ShippingInfo, PaymentMethod};
pub use admin::{Admin, AdminRole, Permission};
pub use affiliate::{Affiliate, AffiliateStatus};
pub use referral::{Referral, ReferralType, ReferralStatus};
pub use payment::MesombError;
