pub mod user;
pub mod hall;
pub mod movie;
pub mod session;
pub mod booking;
pub mod catalog;

pub use user::User;
pub use hall::Hall;
pub use movie::Movie;
pub use session::{Session, SessionStatus};
pub use booking::Booking;
pub use catalog::{AgeRate, Genre, SessionType};
