pub mod user;
pub mod movie;
pub mod theater;
pub mod screening;
pub mod booking;

pub use user::{User, UserSummary};
pub use movie::Movie;
pub use theater::Theater;
pub use screening::{Screening, ScreeningDetail};
pub use booking::{Booking, BookingDetail, BookingStatus};
