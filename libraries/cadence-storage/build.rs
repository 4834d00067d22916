//! Build script for cadence-storage.
//!
//! `sqlx::migrate!` embeds the migrations at compile time, so the crate must
//! be rebuilt whenever one changes.

fn main() {
    // Trigger rebuild when migrations change
    println!("cargo:rerun-if-changed=migrations");
}
