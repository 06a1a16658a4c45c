//! Session-authenticated web pages.
//!
//! GET routes answer with a [`page::Page`] document for the front end to
//! mount. Form actions flash their outcome into the session and redirect.

pub mod auth;
pub mod dashboard;
pub mod images;
pub mod page;
pub mod servers;
pub mod services;
pub mod settings;

#[cfg(test)]
mod auth_test;
#[cfg(test)]
mod pages_test;
#[cfg(test)]
pub(crate) mod test_support;
