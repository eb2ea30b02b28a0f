//! Admin workflows
//!
//! Write paths of the dashboard: application review, video moderation and
//! menu management. Each takes a [`Fetcher`](crate::fetch::Fetcher) bound
//! to the signed-in session.

pub mod applications;
pub mod menu;
pub mod moderation;

pub use applications::{
    accept_application, list_applications, set_application_status, AcceptOutcome,
};
pub use menu::{add_dish, list_menu, DishImage, MenuEntry, NewDish, MAX_IMAGE_BYTES};
pub use moderation::{delete_video, reported_videos, ReportedVideo};
