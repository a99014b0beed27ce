use alloc::string::String;

use bsp_driver_api::DriverError;
use log::warn;

use crate::config::CALLBACK_NAME_MAX;

/// Validates a callback name and truncates it to [`CALLBACK_NAME_MAX`] bytes
/// on a character boundary.
pub(crate) fn callback_name(name: &str) -> Result<String, DriverError> {
    if name.is_empty() {
        return Err(DriverError::InvalidArgument);
    }
    if name.len() <= CALLBACK_NAME_MAX {
        return Ok(String::from(name));
    }
    let mut end = CALLBACK_NAME_MAX;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    warn!("callback name '{name}' truncated to '{}'", &name[..end]);
    Ok(String::from(&name[..end]))
}
