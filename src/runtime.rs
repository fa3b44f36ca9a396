//! Shared runtime records for generated code.

use serde::{Deserialize, Serialize};

use crate::wire::{ttype, WireError, WireReader, WireWriter};

/// A resolved target reference as generated code sees it: the target name
/// plus the path the build host resolved it to. The `path` arrives via the
/// `$(location ...)` indirection emitted by the resolve serialization
/// policy; this crate never computes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRef {
    pub name: String,
    pub path: String,
}

impl TargetRef {
    pub fn wire_write(&self, w: &mut WireWriter) -> Result<(), WireError> {
        w.write_field_begin(ttype::STRING, 1);
        w.write_string(&self.name)?;
        w.write_field_begin(ttype::STRING, 2);
        w.write_string(&self.path)?;
        w.write_stop();
        Ok(())
    }

    pub fn wire_read(r: &mut WireReader) -> Result<Self, WireError> {
        let mut name: Option<String> = None;
        let mut path: Option<String> = None;
        loop {
            match r.read_field_begin()? {
                None => break,
                Some((ty, 1)) if ty == ttype::STRING => name = Some(r.read_string()?),
                Some((ty, 2)) if ty == ttype::STRING => path = Some(r.read_string()?),
                Some((ty, _)) => r.skip(ty)?,
            }
        }
        Ok(Self {
            name: name.ok_or(WireError::MissingRequiredField { field: "name", id: 1 })?,
            path: path.ok_or(WireError::MissingRequiredField { field: "path", id: 2 })?,
        })
    }
}
