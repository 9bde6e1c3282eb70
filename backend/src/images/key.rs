//! Mapping between plate numbers and cached image file names.
//!
//! Both the cache writer and the sweeper go through these two functions, so
//! a file written for a plate is always recognized as that plate when swept.

const IMAGE_EXTENSION: &str = ".jpg";

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || (c.is_ascii_punctuation() && !matches!(c, '/' | '\\' | '.'))
}

fn is_key_plate(plate: &str) -> bool {
    !plate.is_empty() && plate.chars().all(is_key_char)
}

/// File name for `plate`, or None if the plate cannot be a file name
pub fn image_key(plate: &str) -> Option<String> {
    is_key_plate(plate).then(|| format!("{}{}", plate, IMAGE_EXTENSION))
}

/// Plate a file name was written for, or None for files the cache did not write
pub fn plate_from_key(file_name: &str) -> Option<String> {
    let plate = file_name.strip_suffix(IMAGE_EXTENSION)?;
    is_key_plate(plate).then(|| plate.to_string())
}
