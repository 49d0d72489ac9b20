/// Sanitizes a string for use as a single path component.
///
/// Replaces path traversal sequences and characters that are unsafe in file
/// names across platforms.
pub fn sanitize_path_component(value: &str) -> String {
    value
        .replace("..", "_")
        .replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}
