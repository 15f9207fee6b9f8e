pub mod contact;
pub mod location;
pub mod notification;
pub mod profile;
pub mod safe_zone;
pub mod trip;

pub use contact::{ContactPriority, EmergencyContact};
pub use location::LocationSample;
pub use notification::{Notification, NotificationKind};
pub use profile::{SafetySettings, UserProfile};
pub use safe_zone::SafeZone;
pub use trip::{TravelMode, Trip, TripStatus};
