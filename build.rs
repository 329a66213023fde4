use std::{env, path::PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // Only Windows builds need help finding FFmpeg, and only without FFMPEG_DIR.
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" && env::var_os("FFMPEG_DIR").is_none() {
        hint_vcpkg_ffmpeg();
    }
}

fn hint_vcpkg_ffmpeg() {
    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=scrollframe needs FFmpeg development libraries; set FFMPEG_DIR (or install FFmpeg with vcpkg and set VCPKG_ROOT)."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let install_dir: PathBuf = [vcpkg_root.as_str(), "installed", triplet.as_str()].iter().collect();

    if !install_dir.exists() {
        println!(
            "cargo:warning=No vcpkg FFmpeg install under {}; set FFMPEG_DIR explicitly.",
            install_dir.display()
        );
        return;
    }

    println!(
        "cargo:warning=Found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to use it deterministically.",
        install_dir.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 if that FFmpeg build is dynamic.");
    }
}
