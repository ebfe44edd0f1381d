//! Rampart authorization gateway - integration test support.
//!
//! This crate re-exports the workspace crates so integration tests can use
//! `rampart_test::component::` paths.

pub mod component {
    pub use rampart_security::*;

    pub mod config {
        pub use rampart_core::config::*;
    }

    pub mod constants {
        pub use rampart_core::constants::*;
    }

    // Application wiring: router, settings translation and handlers
    pub mod app {
        pub use rampart_app::app::*;
        pub use rampart_app::security::*;
    }
}
