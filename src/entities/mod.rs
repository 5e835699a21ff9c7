pub mod chat;
pub mod item;
pub mod item_image;
pub mod message;
pub mod outfit;
pub mod reservation;
pub mod review;
pub mod store;
pub mod user;
