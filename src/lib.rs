//! rotina, a personal desktop-automation toolkit.
//!
//! One binary covers the whole flow: a web configurator collects the sites
//! and credentials a user wants opened every morning and exports a
//! self-contained package; the same binary later runs that routine, either
//! directly (`rotina run`) or when the voice listener hears the trigger
//! phrase (`rotina listen`).
//!
//! The routine itself is deliberately dumb: open the site in the default
//! browser, wait a fixed delay, paste the login and senha through the
//! clipboard. Sites that need real GUI navigation are driven by step
//! scripts and on-screen template images instead.

pub mod automation;
pub mod config;
pub mod package;
pub mod sites;
pub mod store;
pub mod voice;
pub mod webui;
