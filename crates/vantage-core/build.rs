//! Build script for vantage-core
//!
//! Checks system requirements before compilation:
//! - Minimum Rust version (1.70.0, for `let ... else` and `OnceCell`-era std)
//! - Whether the direct fs/gs-base read (`PTRACE_ARCH_PRCTL`) is available
//!   on this target (Linux x86-64 only)
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer
//! - **Linux x86-64**: needed for segment-base reads of local i386 targets;
//!   every other host reports zero bases instead

fn main()
{
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        if rustc_version < min_rust_version {
            panic!(
                "vantage-core requires Rust {} or newer, found {}",
                min_rust_version, rustc_version
            );
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }

    let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    if os != "linux" || arch != "x86_64" {
        println!(
            "cargo:warning=PTRACE_ARCH_PRCTL unavailable on {os}/{arch}; fsbase/gsbase of local i386 targets read as 0"
        );
    }
}
