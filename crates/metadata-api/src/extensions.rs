//! File extensions the CDN accepts for hosted package files.

/// Allowed file extensions, without the leading dot, served by `/extensions`.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "avif", "cjs", "css", "cur", "eot", "gif", "htc", "ico", "jpeg", "jpg", "js", "json", "less",
    "map", "mjs", "otf", "png", "scss", "svg", "swf", "ttf", "txt", "wasm", "webp", "woff",
    "woff2", "xml",
];
