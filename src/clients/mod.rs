pub mod email;
pub mod images;
pub mod payments;
