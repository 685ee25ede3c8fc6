use std::path::PathBuf;

/// Look for a file in the current directory and all its ancestors. Allows
/// running the binary from a workspace subdirectory during development.
pub fn find_file_upwards(file_name: &str) -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;

    for dir in current_dir.ancestors() {
        let file_path = dir.join(file_name);
        if file_path.exists() {
            return Some(file_path);
        }
    }

    None
}
