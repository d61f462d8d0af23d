//! Maud components shared by the route's views.
pub mod components;
pub mod layout;
