//! Shallow merge of update objects into a profile.

use serde_json::{Map, Value};

use super::model::Profile;
use crate::error::UpdateError;

/// Overlay the top-level keys of `update` onto `current`.
///
/// Each key in `update` replaces the profile's value for that key wholesale;
/// nested objects are not combined. Keys absent from `update` are untouched.
/// Fails with [`UpdateError::InvalidShape`] if the overlaid document is no
/// longer a valid profile (for example `"calendar": null`).
pub fn shallow_merge(current: &Profile, update: &Map<String, Value>) -> Result<Profile, UpdateError> {
    let mut doc = match serde_json::to_value(current) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(UpdateError::InvalidShape(format!(
                "profile serialized to a non-object: {other}"
            )));
        }
        Err(e) => return Err(UpdateError::InvalidShape(e.to_string())),
    };

    for (key, value) in update {
        doc.insert(key.clone(), value.clone());
    }

    serde_json::from_value(Value::Object(doc)).map_err(|e| UpdateError::InvalidShape(e.to_string()))
}
