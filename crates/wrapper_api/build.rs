use std::env;
use std::process::Command;

// Extensions are loaded as trait objects, so the compiler that built them
// has to match the host's. Bake its version into the ABI string.
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=RUSTC");

    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = match Command::new(&rustc).arg("--version").output() {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            println!("cargo:warning={} --version exited with {}", rustc, output.status);
            "rustc unknown".to_string()
        }
        Err(e) => {
            println!("cargo:warning=Failed to run {} --version: {}", rustc, e);
            "rustc unknown".to_string()
        }
    };

    println!("cargo:rustc-env=WRAPPER_API_RUSTC_VERSION={}", version);
}
