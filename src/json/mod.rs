//! Purpose: Internal JSON decoding boundary for record files.
//! Exports: `parse` module with decode helpers used by the envelope codec.
//! Role: Single seam for parser implementation so callsites avoid ad hoc decode logic.
//! Invariants: Record files are decoded through this module only.

pub(crate) mod parse;
