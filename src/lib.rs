//! Decoder for the SEGA Mega Drive six-button pad.
//!
//! [`sega_pad`] holds the strobe state machine and report mapping,
//! [`scheduler`] runs it off two timers on a host thread, and
//! [`virtual_pad`] models a pad for running without hardware.

pub mod config;
pub mod scheduler;
pub mod sega_pad;
pub mod virtual_pad;
