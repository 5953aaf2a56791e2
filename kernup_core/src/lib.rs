/*============================================================
  Synavera Project: Kernup
  Module: kernup_core
  Etiquette: Synavera Script Etiquette - Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Kernel version ordering, support classification and
    upgrade recommendation for the update manager.

  Security / Safety Notes:
    The decision modules are pure. Network, process and
    cache IO live in `client`, `helper` and `catalog`.

  Dependencies:
    See Cargo.toml.

  Operational Scope:
    Library behind the `kernup-core` binary and the update
    manager's kernel views.

  Revision History:
    2026-03-10 COD  Split library from the Kernup-Core binary.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Small modules with one concern each
    - IO at the edges
============================================================*/

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod helper;
pub mod inventory;
pub mod kernel;
pub mod logger;
pub mod mainline;
pub mod packages;
pub mod protocol;
pub mod report;
pub mod selector;
pub mod support;
pub mod version;

pub use error::{KernupError, Result};
pub use selector::{ActiveKernel, KernelSelector, MainlineTarget, Recommendation, SelectorConfig};
pub use version::VersionKey;
