use std::env;
use std::path::PathBuf;

// FFmpeg discovery on Windows goes through vcpkg; elsewhere pkg-config
// inside ffmpeg-sys-next does the work.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=subplace needs FFmpeg: set FFMPEG_DIR, or install FFmpeg with vcpkg and set VCPKG_ROOT."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let ffmpeg_dir = PathBuf::from(&vcpkg_root).join("installed").join(&triplet);

    if !ffmpeg_dir.exists() {
        println!(
            "cargo:warning=No vcpkg FFmpeg install under {}.",
            ffmpeg_dir.display()
        );
        return;
    }

    println!(
        "cargo:warning=Using vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to silence this.",
        ffmpeg_dir.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Set VCPKGRS_DYNAMIC=1 for dynamic vcpkg FFmpeg builds.");
    }
}
