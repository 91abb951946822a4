pub mod access;
pub mod appointment_store;
pub mod booking;
pub mod cancellation;
pub mod consistency;
pub mod lifecycle;
pub mod slot_store;
