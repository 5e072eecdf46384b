//! Application layer of the braille daemon.
//!
//! # What lives here? (for beginners)
//!
//! Everything that decides *what* the daemon does, independent of how a
//! device is physically opened:
//!
//! - **`activation`** – the driver registry and the candidate-selection
//!   rules that pick one driver per class (`auto`, explicit lists, the
//!   no-op fallback, verification).
//!
//! - **`alarm`** – a time-ordered queue of one-shot alarms.  Retries are
//!   scheduled here instead of on timer threads.
//!
//! - **`supervisor`** – keeps one driver class running: start, retry after
//!   a failed start, restart on request or link loss.
//!
//! - **`drivers`** – the braille, speech and screen driver interfaces and
//!   their no-op implementations.
//!
//! - **`braille`** – the Alva braille driver, a `brl_core::Connection`
//!   behind the braille driver interface.
//!
//! - **`control`** – the poll loop tying the three classes together.
//!
//! Opening serial ports and USB devices happens in `infrastructure`, which
//! registers loaders with the registries built here.

pub mod activation;
pub mod alarm;
pub mod braille;
pub mod control;
pub mod drivers;
pub mod supervisor;
