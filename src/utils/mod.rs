pub mod affiliate_code;
pub mod commission;
pub mod html;
pub mod pricing;
pub mod shipping;
pub mod variant;
