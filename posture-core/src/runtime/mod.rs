use std::path::{Path, PathBuf};

/// Resolve and set ORT_DYLIB_PATH at runtime when it is missing or invalid.
///
/// Priority order:
/// 1) Existing ORT_DYLIB_PATH (if file exists)
/// 2) models/onnxruntime*/lib/libonnxruntime.{so,dylib} near current exe/cwd
/// 3) system library locations (last-resort fallback)
pub fn configure_ort_dylib() {
    if let Some(existing) = std::env::var_os("ORT_DYLIB_PATH") {
        let existing_path = PathBuf::from(existing);
        if existing_path.is_file() {
            tracing::info!(path = %existing_path.display(), "using ORT_DYLIB_PATH from environment");
            return;
        }
        tracing::warn!(
            path = %existing_path.display(),
            "ORT_DYLIB_PATH is set but file does not exist; attempting auto-discovery"
        );
    }

    for candidate in ort_candidates() {
        if candidate.is_file() {
            // SAFETY: this is called before any ORT sessions are created and
            // from the single startup thread, so no concurrent env mutation.
            unsafe {
                std::env::set_var("ORT_DYLIB_PATH", &candidate);
            }
            tracing::info!(path = %candidate.display(), "configured ORT_DYLIB_PATH");
            return;
        }
    }

    tracing::warn!(
        "could not locate the ONNX Runtime library; set ORT_DYLIB_PATH to an official ONNX Runtime build"
    );
}

fn ort_candidates() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd);
    }

    if let Ok(exe) = std::env::current_exe() {
        let mut dir = exe.parent().map(Path::to_path_buf);
        for _ in 0..7 {
            let Some(d) = dir else {
                break;
            };
            roots.push(d.clone());
            dir = d.parent().map(Path::to_path_buf);
        }
    }

    let names = ["libonnxruntime.so", "libonnxruntime.dylib"];
    let mut candidates = Vec::new();
    for root in roots {
        for name in names {
            candidates.push(root.join("models/onnxruntime/lib").join(name));
            candidates.push(root.join("models").join(name));
        }
    }

    candidates.push(PathBuf::from("/usr/lib/libonnxruntime.so"));
    candidates.push(PathBuf::from("/usr/local/lib/libonnxruntime.so"));
    candidates.push(PathBuf::from("/opt/homebrew/lib/libonnxruntime.dylib"));
    candidates
}
